/*!
 * Memory Traits
 * Allocator abstractions implemented by the arena
 */

use super::arena::{ArenaStats, MemoryPressure};
use crate::core::errors::BufferResult;
use crate::core::types::{Address, Size};

/// Block allocator interface
pub trait Allocator: Send + Sync {
    /// Allocate a block of at least `size` bytes
    fn allocate(&self, size: Size) -> BufferResult<Address>;

    /// Return a block to the allocator
    fn release(&self, address: Address) -> BufferResult<()>;

    /// Check if an address is the start of a live block
    fn is_valid(&self, address: Address) -> bool;

    /// Get the size of an allocated block
    fn block_size(&self, address: Address) -> Option<Size>;
}

/// Memory statistics provider
pub trait MemoryInfo: Send + Sync {
    fn stats(&self) -> ArenaStats;

    /// Memory info as (total, used, available)
    fn info(&self) -> (Size, Size, Size);

    fn pressure(&self) -> MemoryPressure {
        self.stats().memory_pressure()
    }
}
