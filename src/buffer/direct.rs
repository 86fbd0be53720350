/*!
 * Direct Buffer
 *
 * Handle over native memory with NIO-style cursors:
 * `0 <= position <= limit <= capacity`. Readable bytes are `[position, limit)`.
 */

use crate::core::errors::{BufferError, BufferResult};
use crate::core::types::{Address, Size};
use crate::memory::native::NativeRegion;
use crate::memory::stats::BufferAnalysis;
use std::ptr::NonNull;
use std::slice;

/// Who frees the memory behind a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOwner {
    /// Allocated by this crate; freed on release or drop
    Native,
    /// Supplied by the caller; never freed by the buffer
    External,
}

enum Backing {
    Owned(NativeRegion),
    External { ptr: NonNull<u8>, capacity: Size },
    Released,
}

/// Owned or borrowed native byte buffer
pub struct DirectBuffer {
    backing: Backing,
    limit: Size,
    position: Size,
}

// SAFETY: the buffer has exclusive use of its memory; external memory is
// required by `from_raw_parts` to stay valid and unaliased
unsafe impl Send for DirectBuffer {}
unsafe impl Sync for DirectBuffer {}

impl DirectBuffer {
    /// Allocate a zeroed buffer; `limit == capacity`, `position == 0`
    pub fn allocate(capacity: Size) -> BufferResult<Self> {
        let region = NativeRegion::allocate(capacity)?;
        BufferAnalysis::buffer_opened();
        Ok(Self {
            backing: Backing::Owned(region),
            limit: capacity,
            position: 0,
        })
    }

    /// Wrap memory owned elsewhere
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `capacity` bytes for the
    /// whole lifetime of the buffer, and must not be accessed through any
    /// other path meanwhile.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, capacity: Size) -> Self {
        Self {
            backing: Backing::External { ptr, capacity },
            limit: capacity,
            position: 0,
        }
    }

    /// `None` once released
    pub fn owner(&self) -> Option<BufferOwner> {
        match self.backing {
            Backing::Owned(_) => Some(BufferOwner::Native),
            Backing::External { .. } => Some(BufferOwner::External),
            Backing::Released => None,
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        matches!(self.backing, Backing::Released)
    }

    /// Address of the first byte, or 0 once released
    pub fn address(&self) -> Address {
        self.base_ptr().map_or(0, |p| p.as_ptr() as Address)
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        match &self.backing {
            Backing::Owned(region) => region.capacity(),
            Backing::External { capacity, .. } => *capacity,
            Backing::Released => 0,
        }
    }

    #[inline]
    pub fn limit(&self) -> Size {
        self.limit
    }

    #[inline]
    pub fn position(&self) -> Size {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> Size {
        self.limit - self.position
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Set the limit, pulling the position back if it lies beyond it
    pub fn set_limit(&mut self, limit: Size) -> BufferResult<()> {
        if limit > self.capacity() {
            return Err(BufferError::OutOfBounds {
                offset: limit,
                length: 0,
                size: self.capacity(),
            });
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    pub fn set_position(&mut self, position: Size) -> BufferResult<()> {
        if position > self.limit {
            return Err(BufferError::OutOfBounds {
                offset: position,
                length: 0,
                size: self.limit,
            });
        }
        self.position = position;
        Ok(())
    }

    /// `position = 0`, `limit = capacity`; contents are untouched
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
    }

    /// `limit = position`, `position = 0`
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Readable bytes `[position, limit)`
    pub fn as_slice(&self) -> &[u8] {
        &self.storage()[self.position..self.limit]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let (position, limit) = (self.position, self.limit);
        &mut self.storage_mut()[position..limit]
    }

    /// Copy `src` to `position` and advance it
    pub fn put_slice(&mut self, src: &[u8]) -> BufferResult<()> {
        if src.len() > self.remaining() {
            return Err(BufferError::Overflow {
                requested: src.len(),
                available: self.remaining(),
            });
        }
        let position = self.position;
        self.storage_mut()[position..position + src.len()].copy_from_slice(src);
        self.position += src.len();
        Ok(())
    }

    /// Copy up to `dst.len()` readable bytes out and advance the position
    pub fn get_slice(&mut self, dst: &mut [u8]) -> Size {
        let count = dst.len().min(self.remaining());
        dst[..count].copy_from_slice(&self.as_slice()[..count]);
        self.position += count;
        count
    }

    pub(crate) fn base_ptr(&self) -> Option<NonNull<u8>> {
        match &self.backing {
            Backing::Owned(region) => Some(region.as_ptr()),
            Backing::External { ptr, .. } => Some(*ptr),
            Backing::Released => None,
        }
    }

    /// Whole backing store `[0, capacity)`
    pub(crate) fn storage(&self) -> &[u8] {
        match &self.backing {
            Backing::Owned(region) => region.as_slice(),
            // SAFETY: validity guaranteed by the from_raw_parts contract
            Backing::External { ptr, capacity } => unsafe {
                slice::from_raw_parts(ptr.as_ptr(), *capacity)
            },
            Backing::Released => &[],
        }
    }

    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::Owned(region) => region.as_mut_slice(),
            // SAFETY: validity and exclusivity guaranteed by the from_raw_parts contract
            Backing::External { ptr, capacity } => unsafe {
                slice::from_raw_parts_mut(ptr.as_ptr(), *capacity)
            },
            Backing::Released => &mut [],
        }
    }

    pub(crate) fn region_mut(&mut self) -> Option<&mut NativeRegion> {
        match &mut self.backing {
            Backing::Owned(region) => Some(region),
            _ => None,
        }
    }

    /// Drop the backing store; frees it only when owned
    pub(crate) fn release_storage(&mut self) -> bool {
        let backing = std::mem::replace(&mut self.backing, Backing::Released);
        self.limit = 0;
        self.position = 0;
        match backing {
            Backing::Owned(region) => {
                drop(region);
                BufferAnalysis::buffer_closed();
                true
            }
            Backing::External { .. } => true,
            Backing::Released => false,
        }
    }
}

impl Drop for DirectBuffer {
    fn drop(&mut self) {
        self.release_storage();
    }
}

impl std::fmt::Debug for DirectBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectBuffer")
            .field("address", &format_args!("0x{:x}", self.address()))
            .field("capacity", &self.capacity())
            .field("limit", &self.limit)
            .field("position", &self.position)
            .field("owner", &self.owner())
            .finish()
    }
}
