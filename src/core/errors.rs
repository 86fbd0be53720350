/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use super::types::{Address, Size};
use miette::Diagnostic;
use thiserror::Error;

/// Result type for every buffer, arena and ring operation
pub type BufferResult<T> = Result<T, BufferError>;

/// Buffer subsystem errors
#[derive(Error, Debug, Diagnostic)]
pub enum BufferError {
    #[error("{resource} has been released")]
    #[diagnostic(
        code(buffer::released),
        help("The underlying native memory was freed. Allocate a new buffer.")
    )]
    Released { resource: &'static str },

    #[error("Offset {offset} with length {length} is outside of {size} readable bytes")]
    #[diagnostic(
        code(buffer::out_of_bounds),
        help("Check the position against size() before accessing the buffer.")
    )]
    OutOfBounds {
        offset: Size,
        length: Size,
        size: Size,
    },

    #[error("Buffer overflow: writing {requested} bytes, {available} available")]
    #[diagnostic(
        code(buffer::overflow),
        help("Drain the buffer or check available() before writing.")
    )]
    Overflow { requested: Size, available: Size },

    #[error("Buffer underflow: reading {requested} bytes, {remaining} remaining")]
    #[diagnostic(
        code(buffer::underflow),
        help("Check remaining() or wait for data before reading.")
    )]
    Underflow { requested: Size, remaining: Size },

    #[error("Internal move failed: position {position} shifted by {offset}")]
    #[diagnostic(
        code(buffer::move_failed),
        help("The buffer's bookkeeping is inconsistent. This is not recoverable.")
    )]
    MoveFailed { position: Size, offset: isize },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(buffer::invalid_configuration))]
    InvalidConfiguration(String),

    #[error("Arena exhausted: no free block for {requested} bytes in a {capacity} byte arena")]
    #[diagnostic(
        code(arena::exhausted),
        help("Release blocks, use allocate_timeout(), or size the arena larger.")
    )]
    ArenaExhausted { requested: Size, capacity: Size },

    #[error("Request of {requested} bytes exceeds arena capacity of {capacity} bytes")]
    #[diagnostic(code(arena::request_too_large))]
    RequestTooLarge { requested: Size, capacity: Size },

    #[error("Invalid arena address: 0x{0:x}")]
    #[diagnostic(
        code(arena::invalid_address),
        help("The address was never allocated by this arena or is already free.")
    )]
    InvalidAddress(Address),

    #[error("Channel growth to {requested} bytes exceeds max size {max}")]
    #[diagnostic(
        code(channel::capacity_exceeded),
        help("Consume data before writing more, or raise the channel's max size.")
    )]
    CapacityExceeded { requested: Size, max: Size },

    #[error("Native allocation of {size} bytes failed")]
    #[diagnostic(code(memory::allocation_failed))]
    AllocationFailed { size: Size },

    #[error("Unsupported operation: {0}")]
    #[diagnostic(code(buffer::unsupported))]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    #[diagnostic(code(buffer::io))]
    Io(#[from] std::io::Error),
}

impl BufferError {
    /// Shorthand for a released-resource error
    pub(crate) fn released(resource: &'static str) -> Self {
        BufferError::Released { resource }
    }

    /// True for the errors a caller can resolve by waiting for space or data
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BufferError::Overflow { .. }
                | BufferError::Underflow { .. }
                | BufferError::ArenaExhausted { .. }
        )
    }
}
