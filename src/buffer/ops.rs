/*!
 * Buffer Helpers
 * Stateless operations over `DirectBuffer` handles
 */

use super::direct::{BufferOwner, DirectBuffer};
use super::search;
use crate::core::errors::{BufferError, BufferResult};
use crate::core::limits::DEFAULT_BUFFER_SIZE;
use crate::core::types::Size;
use crate::memory::native::copy_memory;
use crate::memory::stats::BufferAnalysis;
use tracing::debug;

/// Allocate an owned, zeroed buffer of `capacity` bytes
pub fn allocate_direct(capacity: Size) -> BufferResult<DirectBuffer> {
    DirectBuffer::allocate(capacity)
}

/// Allocate an owned buffer of the default size
pub fn allocate_default() -> BufferResult<DirectBuffer> {
    DirectBuffer::allocate(DEFAULT_BUFFER_SIZE)
}

/// Copy of the readable bytes `[position, limit)`
pub fn to_vec(buf: &DirectBuffer) -> BufferResult<Vec<u8>> {
    ensure_live(buf)?;
    Ok(buf.as_slice().to_vec())
}

/// Readable bytes decoded as UTF-8, replacing invalid sequences
pub fn to_string(buf: &DirectBuffer) -> BufferResult<String> {
    ensure_live(buf)?;
    Ok(String::from_utf8_lossy(buf.as_slice()).into_owned())
}

/// Offset of `mark` within the readable bytes, relative to `position`
pub fn index_of(buf: &DirectBuffer, mark: &[u8]) -> Option<Size> {
    if buf.is_released() {
        return None;
    }
    search::index_of(buf.as_slice(), mark)
}

/// Grow the backing store to `new_size`, preserving `[0, limit)`
///
/// A size at or below the current capacity never shrinks the allocation;
/// it only truncates the limit when the limit lies beyond `new_size`.
pub fn reallocate(buf: &mut DirectBuffer, new_size: Size) -> BufferResult<()> {
    ensure_live(buf)?;
    let capacity = buf.capacity();

    if new_size <= capacity {
        if buf.limit() > new_size {
            buf.set_limit(new_size)?;
        }
        return Ok(());
    }

    let region = buf
        .region_mut()
        .ok_or(BufferError::Unsupported("cannot reallocate externally owned memory"))?;
    region.reallocate(new_size)?;

    debug!(old_capacity = capacity, new_capacity = new_size, "Reallocated direct buffer");
    Ok(())
}

/// Shift the readable bytes by `offset`, moving `position` and `limit` with them
///
/// Grows the buffer when the new limit exceeds capacity. With nothing to
/// read, position and limit both reset to zero.
pub fn move_data(buf: &mut DirectBuffer, offset: isize) -> BufferResult<()> {
    ensure_live(buf)?;

    if buf.remaining() == 0 {
        buf.set_position(0)?;
        buf.set_limit(0)?;
        return Ok(());
    }
    if offset == 0 {
        return Ok(());
    }

    let position = buf.position();
    let length = buf.remaining();
    let failed = BufferError::MoveFailed { position, offset };

    let new_position = position.checked_add_signed(offset).ok_or(failed)?;
    let new_limit = new_position + length;
    if new_limit > buf.capacity() {
        reallocate(buf, new_limit)?;
    }

    let base = buf
        .base_ptr()
        .ok_or(BufferError::released("direct buffer"))?
        .as_ptr();
    // SAFETY: both ranges lie within [0, capacity) of the live backing store
    unsafe { copy_memory(base.add(position), base.add(new_position), length) };

    // Order matters: widen the limit before moving the position past the old one
    buf.set_limit(new_limit.max(buf.limit()))?;
    buf.set_position(new_position)?;
    buf.set_limit(new_limit)?;
    Ok(())
}

/// Free the backing store of an owned buffer; idempotent
///
/// Externally owned memory is detached but never freed.
pub fn release(buf: &mut DirectBuffer) {
    let owner = buf.owner();
    if buf.release_storage() {
        debug!(owner = ?owner, "Released direct buffer");
    }
}

#[inline]
pub fn is_released(buf: &DirectBuffer) -> bool {
    buf.is_released()
}

/// True if `buf` owns its memory
pub fn is_owned(buf: &DirectBuffer) -> bool {
    buf.owner() == Some(BufferOwner::Native)
}

/// Current global allocation counters, as a one-line summary
pub fn analysis() -> String {
    BufferAnalysis::snapshot().to_string()
}

fn ensure_live(buf: &DirectBuffer) -> BufferResult<()> {
    if buf.is_released() {
        return Err(BufferError::released("direct buffer"));
    }
    Ok(())
}
