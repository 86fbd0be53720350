/*!
 * Core Module
 * Shared types, limits, errors, configuration and wait helpers
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod sync;
pub mod types;

pub use config::{ArenaConfig, BufferConfig, ChannelConfig, WaitConfig};
pub use errors::{BufferError, BufferResult};
pub use types::{Address, Size};
