/*!
 * Buffer Checkout
 *
 * Scoped, locked access to a channel's buffer. Reconciles the buffer's
 * cursors back into channel content when it goes out of scope.
 */

use super::state::ChannelState;
use crate::buffer::ops;
use crate::core::errors::{BufferError, BufferResult};
use crate::core::types::Size;
use parking_lot::{Condvar, MutexGuard};
use tracing::warn;

/// Exclusive view of a channel's buffer
///
/// Readable bytes are `[position, limit)`; free space is `[limit, capacity)`.
/// On drop, the readable bytes move to offset 0 and become the channel content.
///
/// # Example
///
/// ```ignore
/// let mut checkout = channel.checkout()?;
/// let n = socket.read(checkout.spare_mut())?;
/// checkout.commit(n)?;
/// // Compacted on drop
/// ```
pub struct BufferCheckout<'a> {
    state: MutexGuard<'a, ChannelState>,
    data_ready: &'a Condvar,
}

impl<'a> BufferCheckout<'a> {
    pub(super) fn new(state: MutexGuard<'a, ChannelState>, data_ready: &'a Condvar) -> Self {
        Self { state, data_ready }
    }

    #[inline]
    pub fn position(&self) -> Size {
        self.state.buffer.position()
    }

    #[inline]
    pub fn limit(&self) -> Size {
        self.state.buffer.limit()
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.state.buffer.capacity()
    }

    /// Readable bytes
    pub fn filled(&self) -> &[u8] {
        self.state.buffer.as_slice()
    }

    /// Mark `n` readable bytes as consumed
    pub fn advance(&mut self, n: Size) -> BufferResult<()> {
        let position = self.position();
        if n > self.limit() - position {
            return Err(BufferError::Underflow {
                requested: n,
                remaining: self.limit() - position,
            });
        }
        self.state.buffer.set_position(position + n)
    }

    /// Free space after the readable bytes
    pub fn spare_mut(&mut self) -> &mut [u8] {
        let limit = self.limit();
        &mut self.state.buffer.storage_mut()[limit..]
    }

    /// Publish `n` bytes written into `spare_mut()`
    pub fn commit(&mut self, n: Size) -> BufferResult<()> {
        let spare = self.capacity() - self.limit();
        if n > spare {
            return Err(BufferError::Overflow {
                requested: n,
                available: spare,
            });
        }
        let limit = self.limit();
        self.state.buffer.set_limit(limit + n)
    }

    /// Ensure at least `additional` bytes of free space, within the max size
    pub fn reserve(&mut self, additional: Size) -> BufferResult<()> {
        let spare = self.capacity() - self.limit();
        if spare >= additional {
            return Ok(());
        }
        let target = self.capacity() + (additional - spare);
        self.state.grow(target)
    }

    /// Move the read cursor; must not pass the limit
    pub fn set_position(&mut self, position: Size) -> BufferResult<()> {
        self.state.buffer.set_position(position)
    }

    /// Move the end of the readable bytes; must not pass the capacity
    pub fn set_limit(&mut self, limit: Size) -> BufferResult<()> {
        self.state.buffer.set_limit(limit)
    }

    fn compact(&mut self) -> BufferResult<()> {
        let position = self.position();
        if position > 0 {
            ops::move_data(&mut self.state.buffer, -(position as isize))?;
        }
        self.state.buffer.set_position(0)
    }
}

impl Drop for BufferCheckout<'_> {
    fn drop(&mut self) {
        if self.state.buffer.is_released() {
            return;
        }
        if let Err(e) = self.compact() {
            warn!(error = %e, "Failed to compact byte channel after checkout");
        }
        self.data_ready.notify_all();
    }
}
