/*!
 * Buffer Module
 * Direct buffer handles and the helpers that operate on them
 */

pub mod direct;
pub mod dump;
pub mod ops;
pub mod search;

pub use direct::{BufferOwner, DirectBuffer};
pub use dump::FileDump;
