/*!
 * Memory Module
 * Native regions, allocation accounting and the arena allocator
 */

pub mod arena;
pub mod native;
pub mod stats;
pub mod traits;

pub use arena::{Arena, ArenaBlock, ArenaStats, Block, MemoryPressure};
pub use native::NativeRegion;
pub use stats::{AnalysisSnapshot, BufferAnalysis};
pub use traits::{Allocator, MemoryInfo};
