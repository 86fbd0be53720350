/*!
 * Byte Channel
 *
 * Growable byte queue over a single direct buffer. Data always occupies
 * `[0, size)`; writes at an interior position shift the tail right, reads
 * shift it left. The buffer grows on demand up to a configured max size.
 *
 * Every public method takes the channel lock exactly once. The lock is not
 * reentrant: calling back into the same channel while a `BufferCheckout`
 * is alive on the same thread deadlocks.
 */

mod checkout;
mod state;

pub use checkout::BufferCheckout;

use self::state::ChannelState;
use crate::buffer::direct::DirectBuffer;
use crate::buffer::dump::FileDump;
use crate::buffer::ops;
use crate::core::config::{BufferConfig, ChannelConfig, WaitConfig};
use crate::core::errors::{BufferError, BufferResult};
use crate::core::limits::FILE_DUMP_CHUNK;
use crate::core::types::Size;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Thread-safe growable byte channel
pub struct ByteChannel {
    state: Mutex<ChannelState>,
    /// Signalled on every write, checkout return and release
    data_ready: Condvar,
    wait: WaitConfig,
}

impl ByteChannel {
    /// Channel with `capacity` initial bytes and the default max size
    pub fn new(capacity: Size) -> BufferResult<Self> {
        Self::with_config(ChannelConfig {
            initial_capacity: capacity,
            ..Default::default()
        })
    }

    /// Channel with the default initial capacity (1KB) and max size (2MB)
    pub fn with_defaults() -> BufferResult<Self> {
        Self::with_config(ChannelConfig::default())
    }

    pub fn with_config(config: ChannelConfig) -> BufferResult<Self> {
        config.validate()?;
        let mut buffer = DirectBuffer::allocate(config.initial_capacity)?;
        buffer.set_limit(0)?;
        Ok(Self::from_parts(buffer, config.max_size, WaitConfig::default()))
    }

    pub fn from_config(config: &BufferConfig) -> BufferResult<Self> {
        config.validate()?;
        let mut channel = Self::with_config(config.channel)?;
        channel.wait = config.wait;
        Ok(channel)
    }

    /// Adopt an existing buffer; its readable bytes become the channel's content
    pub fn from_buffer(mut buffer: DirectBuffer) -> BufferResult<Self> {
        if buffer.is_released() {
            return Err(BufferError::released("direct buffer"));
        }
        if buffer.position() > 0 {
            let position = buffer.position() as isize;
            ops::move_data(&mut buffer, -position)?;
        }
        let max_size = ChannelConfig::default().max_size.max(buffer.capacity());
        Ok(Self::from_parts(buffer, max_size, WaitConfig::default()))
    }

    fn from_parts(buffer: DirectBuffer, max_size: Size, wait: WaitConfig) -> Self {
        Self {
            state: Mutex::new(ChannelState::new(buffer, max_size)),
            data_ready: Condvar::new(),
            wait,
        }
    }

    /// Current backing capacity; 0 once released
    pub fn capacity(&self) -> Size {
        self.state.lock().buffer.capacity()
    }

    /// Bytes currently held
    pub fn size(&self) -> Size {
        self.state.lock().size()
    }

    /// Free bytes before the next growth
    pub fn available(&self) -> Size {
        self.state.lock().available()
    }

    pub fn max_size(&self) -> Size {
        self.state.lock().max_size
    }

    pub fn set_max_size(&self, max_size: Size) {
        self.state.lock().max_size = max_size;
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().size() == 0
    }

    /// True once the content has reached the max size
    pub fn is_full(&self) -> bool {
        let state = self.state.lock();
        state.max_size <= state.size()
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().buffer.is_released()
    }

    /// Copy of the whole content
    pub fn array(&self) -> BufferResult<Vec<u8>> {
        let state = self.state.lock();
        state.ensure_live()?;
        Ok(state.content().to_vec())
    }

    /// Drop all content, keeping the capacity
    pub fn clear(&self) -> BufferResult<()> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.buffer.set_position(0)?;
        state.buffer.set_limit(0)
    }

    /// Byte at `pos`, without consuming
    pub fn get(&self, pos: Size) -> BufferResult<u8> {
        let state = self.state.lock();
        state.ensure_live()?;
        state
            .content()
            .get(pos)
            .copied()
            .ok_or(BufferError::OutOfBounds {
                offset: pos,
                length: 1,
                size: state.size(),
            })
    }

    /// Copy up to `dst.len()` bytes starting at `pos`, without consuming
    pub fn get_into(&self, pos: Size, dst: &mut [u8]) -> BufferResult<Size> {
        let state = self.state.lock();
        state.ensure_live()?;
        let content = state.content();
        if pos > content.len() {
            return Err(BufferError::OutOfBounds {
                offset: pos,
                length: dst.len(),
                size: content.len(),
            });
        }
        let count = dst.len().min(content.len() - pos);
        dst[..count].copy_from_slice(&content[pos..pos + count]);
        Ok(count)
    }

    /// Insert `src` at `pos`, shifting the bytes after it right
    pub fn write(&self, pos: Size, src: &[u8]) -> BufferResult<Size> {
        let mut state = self.state.lock();
        let written = state.write_at(pos, src)?;
        drop(state);
        self.data_ready.notify_all();
        Ok(written)
    }

    pub fn write_head(&self, src: &[u8]) -> BufferResult<Size> {
        self.write(0, src)
    }

    pub fn write_end(&self, src: &[u8]) -> BufferResult<Size> {
        let mut state = self.state.lock();
        let size = state.size();
        let written = state.write_at(size, src)?;
        drop(state);
        self.data_ready.notify_all();
        Ok(written)
    }

    /// Consume up to `dst.len()` bytes starting at `pos`
    pub fn read(&self, pos: Size, dst: &mut [u8]) -> BufferResult<Size> {
        self.state.lock().read_at(pos, dst)
    }

    pub fn read_head(&self, dst: &mut [u8]) -> BufferResult<Size> {
        self.read(0, dst)
    }

    /// Consume the last `dst.len()` bytes (or everything, if fewer)
    pub fn read_end(&self, dst: &mut [u8]) -> BufferResult<Size> {
        let mut state = self.state.lock();
        let pos = state.size().saturating_sub(dst.len());
        state.read_at(pos, dst)
    }

    /// Offset of the first occurrence of `mark`
    pub fn index_of(&self, mark: &[u8]) -> BufferResult<Option<Size>> {
        self.state.lock().index_of(mark)
    }

    pub fn starts_with(&self, mark: &[u8]) -> BufferResult<bool> {
        let state = self.state.lock();
        state.ensure_live()?;
        Ok(!mark.is_empty() && state.content().starts_with(mark))
    }

    /// Consume through the first `'\n'` and return the line including it
    ///
    /// Without a newline the whole content is returned; `None` when empty.
    pub fn read_line(&self) -> BufferResult<Option<String>> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        if state.size() == 0 {
            return Ok(None);
        }

        let length = state.find(b"\n").map_or(state.size(), |i| i + 1);
        let mut line = vec![0u8; length];
        state.read_at(0, &mut line)?;
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Consume up to the next `marker` and return the bytes before it
    ///
    /// A marker at the very start is skipped first. The marker itself is
    /// consumed; without one the whole content is returned.
    pub fn read_with_split(&self, marker: &[u8]) -> BufferResult<Bytes> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        if state.size() == 0 {
            return Ok(Bytes::new());
        }

        let mut index = state.find(marker);
        if index == Some(0) {
            state.remove(0, marker.len())?;
            index = state.find(marker);
        }

        let length = index.unwrap_or(state.size());
        let mut chunk = vec![0u8; length];
        state.read_at(0, &mut chunk)?;
        let tail = marker.len().min(state.size());
        state.remove(0, tail)?;
        Ok(Bytes::from(chunk))
    }

    /// Remove bytes around `pos`
    ///
    /// Positive `len` removes `[pos, pos + len)`, negative removes
    /// `[pos + len, pos)`; both clamp to the content.
    pub fn shrink(&self, pos: Size, len: isize) -> BufferResult<()> {
        self.state.lock().shrink(pos, len)
    }

    /// Positive `len` trims from the head, negative from the tail
    pub fn discard(&self, len: isize) -> BufferResult<()> {
        let mut state = self.state.lock();
        if len >= 0 {
            state.shrink(0, len)
        } else {
            let size = state.size();
            state.shrink(size, len)
        }
    }

    /// Grow the backing capacity to `new_size`; never shrinks
    pub fn reallocate(&self, new_size: Size) -> BufferResult<()> {
        self.state.lock().grow(new_size)
    }

    /// Drain up to `length` bytes from the head into `path`, appending
    ///
    /// Parent directories are created. Returns the number of bytes written.
    pub fn save_to_file(&self, path: impl AsRef<Path>, length: Size) -> BufferResult<Size> {
        let mut state = self.state.lock();
        state.ensure_live()?;

        let mut dump = FileDump::open(path)?;
        let mut left = length.min(state.size());
        let mut chunk = vec![0u8; left.min(FILE_DUMP_CHUNK)];
        while left > 0 {
            let n = state.read_at(0, &mut chunk[..left.min(FILE_DUMP_CHUNK)])?;
            dump.write_chunk(&chunk[..n])?;
            left -= n;
        }
        dump.finish()
    }

    /// Wait until at least `length` bytes are buffered
    ///
    /// `poll` runs between checks, outside the lock, so it may feed this
    /// channel. Returns `Ok(false)` on timeout.
    pub fn wait_data<F>(&self, length: Size, timeout: Duration, poll: F) -> BufferResult<bool>
    where
        F: FnMut(),
    {
        self.wait_for(timeout, poll, |state| state.size() >= length)
    }

    /// Wait until `mark` appears in the content
    pub fn wait_for_mark<F>(&self, mark: &[u8], timeout: Duration, poll: F) -> BufferResult<bool>
    where
        F: FnMut(),
    {
        self.wait_for(timeout, poll, |state| state.find(mark).is_some())
    }

    fn wait_for<F, C>(&self, timeout: Duration, mut poll: F, ready: C) -> BufferResult<bool>
    where
        F: FnMut(),
        C: Fn(&ChannelState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let state = self.state.lock();
                state.ensure_live()?;
                if ready(&state) {
                    return Ok(true);
                }
            }

            poll();

            let mut state = self.state.lock();
            state.ensure_live()?;
            if ready(&state) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let slice = (deadline - now).min(self.wait.poll_interval());
            self.data_ready.wait_for(&mut state, slice);
        }
    }

    /// Lock the channel and expose its buffer for direct I/O
    ///
    /// Dropping the checkout compacts the readable region back to offset 0
    /// and makes its length the new size.
    pub fn checkout(&self) -> BufferResult<BufferCheckout<'_>> {
        let state = self.state.lock();
        state.ensure_live()?;
        Ok(BufferCheckout::new(state, &self.data_ready))
    }

    /// Free the backing buffer; idempotent
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.buffer.is_released() {
            return;
        }
        let capacity = state.buffer.capacity();
        ops::release(&mut state.buffer);
        drop(state);

        debug!(capacity = capacity, "Released byte channel");
        self.data_ready.notify_all();
    }
}

impl fmt::Display for ByteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "{{size={}, capacity={}, max_size={}, released={}}}",
            state.size(),
            state.buffer.capacity(),
            state.max_size,
            state.buffer.is_released()
        )
    }
}

impl fmt::Debug for ByteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteChannel{}", self)
    }
}
