/*!
 * Limits and Constants
 *
 * Centralized location for sizes, thresholds and timings used by the
 * arena, the growable channel and the ring buffers.
 */

use std::time::Duration;

// =============================================================================
// ARENA
// =============================================================================

/// Smallest block the arena hands out (1KB)
/// Every arena capacity must be a power of two at least this large
pub const ARENA_MIN_BLOCK: usize = 1024;

/// log2(ARENA_MIN_BLOCK), the offset between a block's log2 size and its bucket index
pub const ARENA_MIN_BLOCK_SHIFT: u32 = ARENA_MIN_BLOCK.trailing_zeros();

/// Usage percentage above which the arena reports high memory pressure
pub const ARENA_HIGH_PRESSURE_PERCENT: f64 = 80.0;

// =============================================================================
// NATIVE MEMORY
// =============================================================================

/// Alignment of every native region handed out by this crate
pub const NATIVE_ALIGNMENT: usize = 16;

/// Default size of a freshly allocated direct buffer (8KB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

// =============================================================================
// CHANNEL
// =============================================================================

/// Initial capacity of a growable channel (1KB)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Upper bound on channel growth (2MB)
pub const DEFAULT_CHANNEL_MAX_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Chunk size used when draining buffered bytes into a file (1MB)
pub const FILE_DUMP_CHUNK: usize = 1024 * 1024;

// =============================================================================
// WAITING
// =============================================================================

/// Time spent busy-spinning before a waiter starts sleeping
pub const WAIT_SPIN_DURATION: Duration = Duration::from_micros(50);

/// Maximum spin iterations before a waiter starts sleeping
pub const WAIT_MAX_SPINS: u32 = 500;

/// Interval between poll-callback invocations while waiting for data
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Cap on the exponential sleep of the backoff phase
pub const WAIT_MAX_BACKOFF: Duration = Duration::from_millis(1);
