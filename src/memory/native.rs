/*!
 * Native Memory
 * Raw allocation, reallocation and byte access outside the managed heap
 */

use super::stats::BufferAnalysis;
use crate::core::errors::{BufferError, BufferResult};
use crate::core::limits::NATIVE_ALIGNMENT;
use crate::core::types::{Address, Size};
use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::slice;

/// An owned, zero-initialized native memory region
///
/// Zero-sized regions hold a dangling pointer and never touch the allocator.
pub struct NativeRegion {
    ptr: NonNull<u8>,
    capacity: Size,
}

// SAFETY: NativeRegion owns its memory exclusively; shared access is read-only
unsafe impl Send for NativeRegion {}
unsafe impl Sync for NativeRegion {}

fn layout(capacity: Size) -> BufferResult<Layout> {
    Layout::from_size_align(capacity, NATIVE_ALIGNMENT)
        .map_err(|_| BufferError::AllocationFailed { size: capacity })
}

fn dangling() -> NonNull<u8> {
    // Aligned dangling pointer for zero-sized regions
    NonNull::new(NATIVE_ALIGNMENT as *mut u8).unwrap_or(NonNull::dangling())
}

impl NativeRegion {
    /// Allocate `capacity` zeroed bytes
    pub fn allocate(capacity: Size) -> BufferResult<Self> {
        if capacity == 0 {
            return Ok(Self {
                ptr: dangling(),
                capacity: 0,
            });
        }

        let layout = layout(capacity)?;
        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(BufferError::AllocationFailed { size: capacity })?;

        BufferAnalysis::record_malloc(capacity);
        Ok(Self { ptr, capacity })
    }

    /// Resize in place or move, preserving `min(old, new)` leading bytes
    ///
    /// Newly exposed bytes are zeroed.
    pub fn reallocate(&mut self, new_capacity: Size) -> BufferResult<()> {
        if new_capacity == self.capacity {
            return Ok(());
        }
        if self.capacity == 0 {
            *self = Self::allocate(new_capacity)?;
            return Ok(());
        }
        if new_capacity == 0 {
            let old = std::mem::replace(self, Self::allocate(0)?);
            drop(old);
            return Ok(());
        }

        let old_layout = layout(self.capacity)?;
        layout(new_capacity)?;
        // SAFETY: ptr was allocated with old_layout, new size is non-zero and valid for the alignment
        let raw = unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_capacity) };
        let ptr = NonNull::new(raw).ok_or(BufferError::AllocationFailed { size: new_capacity })?;

        if new_capacity > self.capacity {
            // SAFETY: the tail lies within the new allocation
            unsafe {
                ptr::write_bytes(ptr.as_ptr().add(self.capacity), 0, new_capacity - self.capacity);
            }
        }

        BufferAnalysis::record_realloc(self.capacity, new_capacity);
        self.ptr = ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.capacity
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.ptr.as_ptr() as Address
    }

    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for capacity bytes (or dangling with capacity 0)
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for capacity bytes and we have exclusive access
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }
}

impl Drop for NativeRegion {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(layout) = layout(self.capacity) {
            // SAFETY: ptr was allocated with this layout and is freed exactly once
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
            BufferAnalysis::record_free(self.capacity);
        }
    }
}

impl std::fmt::Debug for NativeRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegion")
            .field("address", &format_args!("0x{:x}", self.address()))
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Copy `len` bytes between possibly overlapping regions
///
/// # Safety
///
/// Both `src` and `dst` must be valid for `len` bytes.
#[inline]
pub unsafe fn copy_memory(src: *const u8, dst: *mut u8, len: Size) {
    ptr::copy(src, dst, len);
}

/// Fill `len` bytes at `dst` with `value`
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub unsafe fn set_memory(dst: *mut u8, len: Size, value: u8) {
    ptr::write_bytes(dst, value, len);
}

/// Read one byte at a raw address
///
/// # Safety
///
/// `address` must point into a live allocation.
#[inline]
pub unsafe fn get_byte(address: Address) -> u8 {
    ptr::read(address as *const u8)
}

/// Write one byte at a raw address
///
/// # Safety
///
/// `address` must point into a live allocation with no outstanding borrows.
#[inline]
pub unsafe fn put_byte(address: Address, value: u8) {
    ptr::write(address as *mut u8, value);
}
