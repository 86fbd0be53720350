/*!
 * Ring Buffers
 * Fixed-capacity circular buffers over native bytes and over values
 */

mod byte_ring;
mod object;
mod storage;

pub use byte_ring::{ByteRing, DirectRingBuffer, RingDirectBuffer};
pub use object::RingBuffer;
pub use storage::{RingMemory, RingStorage};
