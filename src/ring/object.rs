/*!
 * Object Ring
 * Fixed-capacity FIFO of arbitrary values with the byte rings' slot arithmetic
 */

use crate::core::errors::{BufferError, BufferResult};
use crate::core::types::Size;

/// Ring of `capacity` slots holding at most `capacity - 1` values
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    read: Size,
    write: Size,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: Size) -> BufferResult<Self> {
        if capacity < 2 {
            return Err(BufferError::InvalidConfiguration(format!(
                "ring capacity {} leaves no usable slot",
                capacity
            )));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            read: 0,
            write: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.slots.len()
    }

    /// Stored values
    #[inline]
    pub fn len(&self) -> Size {
        if self.write >= self.read {
            self.write - self.read
        } else {
            self.capacity() - self.read + self.write
        }
    }

    #[inline]
    pub fn available(&self) -> Size {
        self.capacity() - self.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        (self.write + 1) % self.capacity() == self.read
    }

    /// Append, handing the value back when full
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.slots[self.write] = Some(value);
        self.write = (self.write + 1) % self.capacity();
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.read].take();
        self.read = (self.read + 1) % self.capacity();
        if self.is_empty() {
            self.read = 0;
            self.write = 0;
        }
        value
    }

    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// Value `offset` places behind the head
    pub fn get(&self, offset: Size) -> Option<&T> {
        if offset >= self.len() {
            return None;
        }
        self.slots[(self.read + offset) % self.capacity()].as_ref()
    }

    /// Drop `n` values from the head; false if fewer are stored
    pub fn skip(&mut self, n: Size) -> bool {
        if n > self.len() {
            return false;
        }
        for _ in 0..n {
            self.pop();
        }
        true
    }

    /// Pop up to `max` values
    pub fn drain(&mut self, max: Size) -> Vec<T> {
        let count = max.min(self.len());
        (0..count).filter_map(|_| self.pop()).collect()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.read = 0;
        self.write = 0;
    }

    /// Values from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Append as many of `values` as fit; returns the count appended
    pub fn push_slice(&mut self, values: &[T]) -> Size {
        let count = values.len().min(self.available());
        for value in &values[..count] {
            let _ = self.push(value.clone());
        }
        count
    }
}
