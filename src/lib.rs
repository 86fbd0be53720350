/*!
 * Native Buffers Library
 *
 * Off-heap memory services for network I/O: a buddy arena allocator,
 * direct buffer handles, a growable byte channel and fixed ring buffers.
 */

pub mod buffer;
pub mod channel;
pub mod core;
pub mod memory;
pub mod ring;

// Re-exports
pub use buffer::{BufferOwner, DirectBuffer};
pub use channel::{BufferCheckout, ByteChannel};
pub use crate::core::{ArenaConfig, BufferConfig, BufferError, BufferResult, ChannelConfig, WaitConfig};
pub use memory::{Arena, ArenaBlock, ArenaStats, BufferAnalysis};
pub use ring::{ByteRing, DirectRingBuffer, RingBuffer, RingDirectBuffer};
