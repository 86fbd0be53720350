/*!
 * Byte Ring
 *
 * Fixed-capacity circular byte buffer. One slot is always left empty, so a
 * ring of capacity N holds at most N-1 bytes: empty is `read == write`,
 * full is `(write + 1) % N == read`. Whenever the ring drains, both
 * cursors snap back to 0.
 *
 * Single producer, single consumer: mutation goes through `&mut self`, so
 * sharing a ring across threads needs an outer lock.
 */

use super::storage::{RingMemory, RingStorage};
use crate::buffer::direct::DirectBuffer;
use crate::buffer::dump::FileDump;
use crate::buffer::search;
use crate::core::config::WaitConfig;
use crate::core::errors::{BufferError, BufferResult};
use crate::core::limits::FILE_DUMP_CHUNK;
use crate::core::sync::wait_until;
use crate::core::types::{Address, Size};
use crate::memory::arena::Arena;
use crate::memory::native::NativeRegion;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Ring over its own memory: a private native region or an arena block
pub type DirectRingBuffer = ByteRing<RingMemory>;

/// Ring over a caller-supplied direct buffer
pub type RingDirectBuffer = ByteRing<DirectBuffer>;

pub struct ByteRing<S: RingStorage> {
    storage: S,
    capacity: Size,
    read: Size,
    write: Size,
    wait: WaitConfig,
}

impl ByteRing<RingMemory> {
    /// Ring over a private zeroed region of `capacity` bytes
    pub fn new(capacity: Size) -> BufferResult<Self> {
        Self::check_capacity(capacity)?;
        Self::with_storage(RingMemory::Private(NativeRegion::allocate(capacity)?))
    }

    /// Ring over a block taken from `arena`; the block returns on release
    pub fn in_arena(arena: &Arc<Arena>, capacity: Size) -> BufferResult<Self> {
        Self::check_capacity(capacity)?;
        let block = arena.allocate_block(capacity)?;
        Self::with_storage(RingMemory::Arena {
            block,
            len: capacity,
        })
    }
}

impl ByteRing<DirectBuffer> {
    /// Ring over the whole capacity of `buffer`
    pub fn wrap(buffer: DirectBuffer) -> BufferResult<Self> {
        if buffer.is_released() {
            return Err(BufferError::released("direct buffer"));
        }
        Self::with_storage(buffer)
    }

    /// Give the wrapped buffer back, cursors reset
    pub fn into_inner(self) -> DirectBuffer {
        let mut buffer = self.storage;
        buffer.clear();
        buffer
    }
}

impl<S: RingStorage> ByteRing<S> {
    pub fn with_storage(storage: S) -> BufferResult<Self> {
        let capacity = storage.bytes().len();
        Self::check_capacity(capacity)?;
        Ok(Self {
            storage,
            capacity,
            read: 0,
            write: 0,
            wait: WaitConfig::default(),
        })
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    fn check_capacity(capacity: Size) -> BufferResult<()> {
        if capacity < 2 {
            return Err(BufferError::InvalidConfiguration(format!(
                "ring capacity {} leaves no usable slot",
                capacity
            )));
        }
        Ok(())
    }

    fn ensure_live(&self) -> BufferResult<()> {
        if self.storage.is_released() {
            return Err(BufferError::released("ring buffer"));
        }
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.capacity
    }

    #[inline]
    pub fn read_position(&self) -> Size {
        self.read
    }

    #[inline]
    pub fn write_position(&self) -> Size {
        self.write
    }

    pub fn address(&self) -> Address {
        self.storage.address()
    }

    pub fn is_released(&self) -> bool {
        self.storage.is_released()
    }

    /// Readable bytes
    #[inline]
    pub fn remaining(&self) -> Size {
        if self.write >= self.read {
            self.write - self.read
        } else {
            self.capacity - self.read + self.write
        }
    }

    /// Writable bytes
    #[inline]
    pub fn available(&self) -> Size {
        self.capacity - self.remaining() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        (self.write + 1) % self.capacity == self.read
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    #[inline]
    fn byte_at(&self, offset: Size) -> u8 {
        self.storage.bytes()[(self.read + offset) % self.capacity]
    }

    fn advance_read(&mut self, n: Size) {
        self.read = (self.read + n) % self.capacity;
        if self.is_empty() {
            self.clear();
        }
    }

    /// Copy the first `dst.len()` readable bytes without consuming them
    fn copy_out(&self, dst: &mut [u8]) {
        let bytes = self.storage.bytes();
        let first = dst.len().min(self.capacity - self.read);
        dst[..first].copy_from_slice(&bytes[self.read..self.read + first]);
        let rest = dst.len() - first;
        dst[first..].copy_from_slice(&bytes[..rest]);
    }

    /// Byte at `offset` past the read position, without consuming
    pub fn get(&self, offset: Size) -> BufferResult<u8> {
        self.ensure_live()?;
        if offset >= self.remaining() {
            return Err(BufferError::OutOfBounds {
                offset,
                length: 1,
                size: self.remaining(),
            });
        }
        Ok(self.byte_at(offset))
    }

    /// Copy up to `dst.len()` readable bytes without consuming them
    pub fn peek(&self, dst: &mut [u8]) -> BufferResult<Size> {
        self.ensure_live()?;
        let count = dst.len().min(self.remaining());
        self.copy_out(&mut dst[..count]);
        Ok(count)
    }

    /// All readable bytes, in order
    pub fn to_vec(&self) -> BufferResult<Vec<u8>> {
        let mut out = vec![0u8; self.remaining()];
        self.peek(&mut out)?;
        Ok(out)
    }

    pub fn write_byte(&mut self, byte: u8) -> BufferResult<()> {
        self.ensure_live()?;
        if self.is_full() {
            return Err(BufferError::Overflow {
                requested: 1,
                available: 0,
            });
        }
        if self.is_empty() {
            self.clear();
        }
        let write = self.write;
        self.storage.bytes_mut()[write] = byte;
        self.write = (write + 1) % self.capacity;
        Ok(())
    }

    /// Append all of `src`, or nothing if it does not fit
    pub fn write(&mut self, src: &[u8]) -> BufferResult<Size> {
        self.ensure_live()?;
        if src.len() > self.available() {
            return Err(BufferError::Overflow {
                requested: src.len(),
                available: self.available(),
            });
        }
        if self.is_empty() {
            self.clear();
        }

        let write = self.write;
        let first = src.len().min(self.capacity - write);
        let bytes = self.storage.bytes_mut();
        bytes[write..write + first].copy_from_slice(&src[..first]);
        bytes[..src.len() - first].copy_from_slice(&src[first..]);
        self.write = (write + src.len()) % self.capacity;
        Ok(src.len())
    }

    /// Append the readable bytes of `buffer`, advancing its position
    pub fn write_buffer(&mut self, buffer: &mut DirectBuffer) -> BufferResult<Size> {
        let written = self.write(buffer.as_slice())?;
        buffer.set_position(buffer.position() + written)?;
        Ok(written)
    }

    pub fn read_byte(&mut self) -> BufferResult<u8> {
        self.ensure_live()?;
        if self.is_empty() {
            return Err(BufferError::Underflow {
                requested: 1,
                remaining: 0,
            });
        }
        let byte = self.byte_at(0);
        self.advance_read(1);
        Ok(byte)
    }

    /// Consume up to `dst.len()` bytes
    pub fn read(&mut self, dst: &mut [u8]) -> BufferResult<Size> {
        self.ensure_live()?;
        if dst.is_empty() {
            return Ok(0);
        }
        if self.is_empty() {
            return Err(BufferError::Underflow {
                requested: dst.len(),
                remaining: 0,
            });
        }
        let count = dst.len().min(self.remaining());
        self.copy_out(&mut dst[..count]);
        self.advance_read(count);
        Ok(count)
    }

    /// Consume into the free space of `buffer`, advancing its position
    pub fn read_buffer(&mut self, buffer: &mut DirectBuffer) -> BufferResult<Size> {
        let count = self.read(buffer.as_mut_slice())?;
        buffer.set_position(buffer.position() + count)?;
        Ok(count)
    }

    /// Drop `n` readable bytes
    pub fn skip(&mut self, n: Size) -> BufferResult<()> {
        self.ensure_live()?;
        if n > self.remaining() {
            return Err(BufferError::Underflow {
                requested: n,
                remaining: self.remaining(),
            });
        }
        self.advance_read(n);
        Ok(())
    }

    /// Search the readable bytes; callers check liveness first
    fn find(&self, mark: &[u8]) -> Option<Size> {
        search::index_of_by(self.remaining(), |i| self.byte_at(i), mark)
    }

    /// Offset of `mark` past the read position
    pub fn position_of(&self, mark: &[u8]) -> BufferResult<Option<Size>> {
        self.ensure_live()?;
        Ok(self.find(mark))
    }

    /// Storage index of `mark`: `(offset + read_position) % capacity`
    pub fn index_of(&self, mark: &[u8]) -> BufferResult<Option<Size>> {
        Ok(self
            .position_of(mark)?
            .map(|offset| (offset + self.read) % self.capacity))
    }

    pub fn starts_with(&self, mark: &[u8]) -> BufferResult<bool> {
        self.ensure_live()?;
        Ok(!mark.is_empty()
            && mark.len() <= self.remaining()
            && mark.iter().enumerate().all(|(i, &b)| self.byte_at(i) == b))
    }

    /// Make the readable bytes contiguous and return them
    ///
    /// A wrapped ring is rotated so the data starts at offset 0. Consume
    /// with `skip` afterwards.
    pub fn linearize(&mut self) -> BufferResult<&[u8]> {
        self.ensure_live()?;
        if self.write < self.read {
            let remaining = self.remaining();
            let read = self.read;
            self.storage.bytes_mut().rotate_left(read);
            self.read = 0;
            self.write = remaining;
            debug!(remaining = remaining, capacity = self.capacity, "Linearized ring buffer");
        }
        Ok(&self.storage.bytes()[self.read..self.write])
    }

    fn spare_end(&self) -> Size {
        if self.write >= self.read {
            if self.read == 0 {
                self.capacity - 1
            } else {
                self.capacity
            }
        } else {
            self.read - 1
        }
    }

    /// Contiguous free space starting at the write position
    pub fn spare_mut(&mut self) -> BufferResult<&mut [u8]> {
        self.ensure_live()?;
        if self.is_empty() {
            self.clear();
        }
        let (start, end) = (self.write, self.spare_end());
        Ok(&mut self.storage.bytes_mut()[start..end])
    }

    /// Publish `n` bytes written into `spare_mut()`
    pub fn commit(&mut self, n: Size) -> BufferResult<()> {
        self.ensure_live()?;
        let spare = self.spare_end() - self.write;
        if n > spare {
            return Err(BufferError::Overflow {
                requested: n,
                available: spare,
            });
        }
        self.write = (self.write + n) % self.capacity;
        Ok(())
    }

    /// Wait until at least `length` bytes are readable
    ///
    /// `poll` is invoked between checks and may fill the ring. Returns
    /// `Ok(false)` on timeout.
    pub fn wait_data<F>(&mut self, length: Size, timeout: Duration, poll: F) -> BufferResult<bool>
    where
        F: FnMut(&mut Self),
    {
        self.wait_for(timeout, poll, |ring| ring.remaining() >= length)
    }

    /// Wait until `mark` is readable
    pub fn wait_for_mark<F>(&mut self, mark: &[u8], timeout: Duration, poll: F) -> BufferResult<bool>
    where
        F: FnMut(&mut Self),
    {
        self.wait_for(timeout, poll, |ring| ring.find(mark).is_some())
    }

    fn wait_for<F, C>(&mut self, timeout: Duration, mut poll: F, ready: C) -> BufferResult<bool>
    where
        F: FnMut(&mut Self),
        C: Fn(&Self) -> bool,
    {
        self.ensure_live()?;
        let wait = self.wait;
        let ring = &mut *self;
        let outcome = wait_until(&wait, timeout, || {
            if ring.is_released() || ready(&*ring) {
                return true;
            }
            poll(&mut *ring);
            ring.is_released() || ready(&*ring)
        });
        self.ensure_live()?;
        Ok(outcome)
    }

    /// Consume through the first `'\n'` and return the line including it
    pub fn read_line(&mut self) -> BufferResult<Option<String>> {
        self.ensure_live()?;
        if self.is_empty() {
            return Ok(None);
        }
        let length = self
            .find(b"\n")
            .map_or(self.remaining(), |i| i + 1);
        let mut line = vec![0u8; length];
        self.read(&mut line)?;
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Drain up to `length` bytes into `path`, appending
    pub fn save_to_file(&mut self, path: impl AsRef<Path>, length: Size) -> BufferResult<Size> {
        self.ensure_live()?;
        let mut dump = FileDump::open(path)?;
        let mut left = length.min(self.remaining());
        let mut chunk = vec![0u8; left.min(FILE_DUMP_CHUNK)];
        while left > 0 {
            let n = self.read(&mut chunk[..left.min(FILE_DUMP_CHUNK)])?;
            dump.write_chunk(&chunk[..n])?;
            left -= n;
        }
        dump.finish()
    }

    /// Return the storage to its owner; idempotent
    pub fn release(&mut self) {
        if self.storage.is_released() {
            return;
        }
        self.storage.release();
        self.clear();
        debug!(capacity = self.capacity, "Released ring buffer");
    }
}

impl<S: RingStorage> fmt::Display for ByteRing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{read={}, write={}, remaining={}, capacity={}, released={}}}",
            self.read,
            self.write,
            self.remaining(),
            self.capacity,
            self.is_released()
        )
    }
}

impl<S: RingStorage> fmt::Debug for ByteRing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRing{}", self)
    }
}
