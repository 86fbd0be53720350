/*!
 * Ring Storage
 * Backing memory for byte rings: a private region, an arena block, or a
 * caller-supplied direct buffer
 */

use crate::buffer::direct::DirectBuffer;
use crate::buffer::ops;
use crate::core::types::{Address, Size};
use crate::memory::arena::ArenaBlock;
use crate::memory::native::NativeRegion;

/// Fixed-size byte storage a ring can run over
pub trait RingStorage: Send {
    /// Whole storage; empty once released
    fn bytes(&self) -> &[u8];

    fn bytes_mut(&mut self) -> &mut [u8];

    fn is_released(&self) -> bool;

    /// Give the memory back to whoever owns it; idempotent
    fn release(&mut self);

    /// Address of the first byte, or 0 once released
    fn address(&self) -> Address {
        if self.is_released() {
            0
        } else {
            self.bytes().as_ptr() as Address
        }
    }
}

/// Memory owned by a `DirectRingBuffer`
pub enum RingMemory {
    Private(NativeRegion),
    /// First `len` bytes of an arena block
    Arena { block: ArenaBlock, len: Size },
    Released,
}

impl RingStorage for RingMemory {
    fn bytes(&self) -> &[u8] {
        match self {
            RingMemory::Private(region) => region.as_slice(),
            RingMemory::Arena { block, len } => &block.as_slice()[..*len],
            RingMemory::Released => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            RingMemory::Private(region) => region.as_mut_slice(),
            RingMemory::Arena { block, len } => &mut block.as_mut_slice()[..*len],
            RingMemory::Released => &mut [],
        }
    }

    fn is_released(&self) -> bool {
        matches!(self, RingMemory::Released)
    }

    fn release(&mut self) {
        // Dropping the region frees it; dropping the block returns it to its arena
        *self = RingMemory::Released;
    }
}

impl RingStorage for DirectBuffer {
    fn bytes(&self) -> &[u8] {
        self.storage()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.storage_mut()
    }

    fn is_released(&self) -> bool {
        DirectBuffer::is_released(self)
    }

    fn release(&mut self) {
        ops::release(self);
    }
}
