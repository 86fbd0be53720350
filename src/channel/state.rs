/*!
 * Channel State
 * Lock-free helpers that run with the channel lock already held
 */

use crate::buffer::direct::DirectBuffer;
use crate::buffer::{ops, search};
use crate::core::errors::{BufferError, BufferResult};
use crate::core::types::Size;
use tracing::{debug, warn};

/// Content lives in `[0, limit)` of the buffer; position is 0 between calls
pub(super) struct ChannelState {
    pub buffer: DirectBuffer,
    pub max_size: Size,
}

impl ChannelState {
    pub fn new(buffer: DirectBuffer, max_size: Size) -> Self {
        Self { buffer, max_size }
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.buffer.limit()
    }

    #[inline]
    pub fn available(&self) -> Size {
        self.buffer.capacity() - self.buffer.limit()
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.buffer.storage()[..self.size()]
    }

    pub fn ensure_live(&self) -> BufferResult<()> {
        if self.buffer.is_released() {
            return Err(BufferError::released("byte channel"));
        }
        Ok(())
    }

    /// Search the content; callers check liveness first
    pub fn find(&self, mark: &[u8]) -> Option<Size> {
        search::index_of(self.content(), mark)
    }

    pub fn index_of(&self, mark: &[u8]) -> BufferResult<Option<Size>> {
        self.ensure_live()?;
        Ok(self.find(mark))
    }

    /// Grow capacity to `new_size`, bounded by `max_size`
    pub fn grow(&mut self, new_size: Size) -> BufferResult<()> {
        self.ensure_live()?;
        if new_size <= self.buffer.capacity() {
            return Ok(());
        }
        if new_size > self.max_size {
            warn!(
                requested = new_size,
                max_size = self.max_size,
                "Byte channel growth rejected"
            );
            return Err(BufferError::CapacityExceeded {
                requested: new_size,
                max: self.max_size,
            });
        }

        let old_capacity = self.buffer.capacity();
        ops::reallocate(&mut self.buffer, new_size)?;
        debug!(
            old_capacity = old_capacity,
            new_capacity = new_size,
            size = self.size(),
            "Byte channel grown"
        );
        Ok(())
    }

    pub fn write_at(&mut self, pos: Size, src: &[u8]) -> BufferResult<Size> {
        self.ensure_live()?;
        let size = self.size();
        if pos > size {
            return Err(BufferError::OutOfBounds {
                offset: pos,
                length: src.len(),
                size,
            });
        }
        if src.is_empty() {
            return Ok(0);
        }

        let len = src.len();
        if self.available() < len {
            let target = self.buffer.capacity() + len;
            self.grow(target)?;
        }

        // Shift [pos, size) right by len
        self.buffer.set_position(pos)?;
        ops::move_data(&mut self.buffer, len as isize)?;
        self.buffer.set_limit(size + len)?;
        self.buffer.storage_mut()[pos..pos + len].copy_from_slice(src);
        self.buffer.set_position(0)?;
        Ok(len)
    }

    pub fn read_at(&mut self, pos: Size, dst: &mut [u8]) -> BufferResult<Size> {
        self.ensure_live()?;
        let size = self.size();
        if pos > size {
            return Err(BufferError::OutOfBounds {
                offset: pos,
                length: dst.len(),
                size,
            });
        }

        let count = dst.len().min(size - pos);
        dst[..count].copy_from_slice(&self.content()[pos..pos + count]);
        self.remove(pos, count)?;
        Ok(count)
    }

    /// Delete `[pos, pos + len)`, shifting the tail left
    pub fn remove(&mut self, pos: Size, len: Size) -> BufferResult<()> {
        if len == 0 {
            return Ok(());
        }
        let size = self.size();
        self.buffer.set_position(pos + len)?;
        ops::move_data(&mut self.buffer, -(len as isize))?;
        self.buffer.set_position(0)?;
        self.buffer.set_limit(size - len)
    }

    pub fn shrink(&mut self, pos: Size, len: isize) -> BufferResult<()> {
        self.ensure_live()?;
        let size = self.size();
        if size == 0 || len == 0 {
            return Ok(());
        }
        if pos > size {
            return Err(BufferError::OutOfBounds {
                offset: pos,
                length: len.unsigned_abs(),
                size,
            });
        }

        if len < 0 {
            let count = len.unsigned_abs().min(pos);
            self.remove(pos - count, count)
        } else {
            let count = (len as Size).min(size - pos);
            self.remove(pos, count)
        }
    }
}
