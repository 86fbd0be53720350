/*!
 * Core Types
 * Common types used across the buffer subsystems
 */

/// Address type for memory operations (raw pointer value or arena offset)
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;
