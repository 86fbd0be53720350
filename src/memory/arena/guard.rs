/*!
 * Arena Block Guard
 *
 * RAII view over one arena block with automatic release
 */

use super::Arena;
use crate::core::types::{Address, Size};
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

/// Scoped arena block, released back to its arena on drop
///
/// The view never frees memory itself; it keeps its arena alive through
/// the `Arc` back-reference.
///
/// # Example
///
/// ```ignore
/// let arena = Arc::new(Arena::new(65536)?);
/// let mut block = arena.allocate_block(100)?;
/// block.as_mut_slice()[0] = 1;
/// // Returned to the arena on drop
/// ```
pub struct ArenaBlock {
    arena: Arc<Arena>,
    ptr: NonNull<u8>,
    size: Size,
}

// SAFETY: the block is exclusively owned by this view until it drops
unsafe impl Send for ArenaBlock {}
unsafe impl Sync for ArenaBlock {}

impl ArenaBlock {
    /// `ptr` must be derived from the arena region and cover `size` bytes
    pub(super) fn new(arena: Arc<Arena>, ptr: NonNull<u8>, size: Size) -> Self {
        Self { arena, ptr, size }
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.ptr.as_ptr() as Address
    }

    /// Block size (power of two, at least the requested size)
    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the arena keeps the region mapped while this view exists
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and the block is not shared with any other view
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }
}

impl Drop for ArenaBlock {
    fn drop(&mut self) {
        self.arena.release_view(self.address());
    }
}

impl std::fmt::Debug for ArenaBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaBlock")
            .field("address", &format_args!("0x{:x}", self.address()))
            .field("size", &self.size)
            .finish()
    }
}
