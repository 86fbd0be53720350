/*!
 * Arena Allocator
 *
 * Binary buddy allocator over one native region. Blocks are powers of two
 * between 1KB and the arena capacity; a request is served from the smallest
 * bucket that fits, splitting larger free blocks in halves on the way down.
 *
 * All bookkeeping lives behind a single lock, so the bucket search and the
 * claim of the chosen block are atomic. Released blocks go to the back of
 * their bucket; merging with a free buddy only happens when
 * `ArenaConfig::coalesce` is set.
 */

mod free_list;
mod guard;
mod types;

pub use guard::ArenaBlock;
pub use types::{ArenaStats, Block, MemoryPressure};

use self::free_list::FreeLists;
use super::native::{set_memory, NativeRegion};
use super::traits::{Allocator, MemoryInfo};
use crate::core::config::ArenaConfig;
use crate::core::errors::{BufferError, BufferResult};
use crate::core::limits::{ARENA_HIGH_PRESSURE_PERCENT, ARENA_MIN_BLOCK};
use crate::core::types::{Address, Size};
use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct ArenaState {
    /// None once the arena has been freed
    region: Option<NativeRegion>,
    closed: bool,
    /// Blocks keyed by start offset
    blocks: HashMap<Size, Block, RandomState>,
    /// Start offset keyed by end offset
    ends: HashMap<Size, Size, RandomState>,
    free: FreeLists,
    /// Start offsets of blocks handed out as `ArenaBlock` views
    views: HashSet<Size, RandomState>,
    used_bytes: Size,
    used_blocks: usize,
}

/// Buddy allocator over a private native region
pub struct Arena {
    config: ArenaConfig,
    base: Address,
    state: Mutex<ArenaState>,
    block_released: Condvar,
}

impl Arena {
    /// Create an arena of `capacity` bytes (power of two, at least 1KB)
    pub fn new(capacity: Size) -> BufferResult<Self> {
        Self::with_config(ArenaConfig::new(capacity))
    }

    pub fn with_config(config: ArenaConfig) -> BufferResult<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let region = NativeRegion::allocate(capacity)?;
        let base = region.address();

        let mut blocks = HashMap::with_hasher(RandomState::new());
        let mut ends = HashMap::with_hasher(RandomState::new());
        let mut free = FreeLists::new(capacity);
        blocks.insert(0, Block::free(0, capacity));
        ends.insert(capacity, 0);
        free.push(capacity, 0);

        info!(
            capacity = capacity,
            coalesce = config.coalesce,
            base = format!("0x{:x}", base),
            "Arena initialized"
        );

        Ok(Self {
            config,
            base,
            state: Mutex::new(ArenaState {
                region: Some(region),
                closed: false,
                blocks,
                ends,
                free,
                views: HashSet::with_hasher(RandomState::new()),
                used_bytes: 0,
                used_blocks: 0,
            }),
            block_released: Condvar::new(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.config.capacity
    }

    /// Address of the first byte of the arena
    #[inline]
    pub fn base_address(&self) -> Address {
        self.base
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Allocate the smallest block of at least `size` bytes
    ///
    /// Returns the absolute address of a zeroed block, or `ArenaExhausted`
    /// when no free block at or above the needed size exists.
    pub fn allocate(&self, size: Size) -> BufferResult<Address> {
        let mut state = self.state.lock();
        self.allocate_locked(&mut state, size)
    }

    /// Like `allocate`, but waits up to `timeout` for a block to be released
    pub fn allocate_timeout(&self, size: Size, timeout: Duration) -> BufferResult<Address> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            match self.allocate_locked(&mut state, size) {
                Err(BufferError::ArenaExhausted { .. }) => {
                    if self
                        .block_released
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return self.allocate_locked(&mut state, size);
                    }
                }
                other => return other,
            }
        }
    }

    /// Allocate a block wrapped in an RAII view that releases it on drop
    pub fn allocate_block(self: &Arc<Self>, size: Size) -> BufferResult<ArenaBlock> {
        let mut state = self.state.lock();
        let address = self.allocate_locked(&mut state, size)?;
        let offset = address - self.base;
        let block_size = state.blocks.get(&offset).map_or(0, |b| b.size);
        let ptr = state
            .region
            .as_ref()
            // SAFETY: offset is the start of a block inside the region
            .and_then(|region| NonNull::new(unsafe { region.as_ptr().as_ptr().add(offset) }))
            .ok_or(BufferError::released("arena"))?;
        state.views.insert(offset);
        drop(state);

        Ok(ArenaBlock::new(Arc::clone(self), ptr, block_size))
    }

    /// Return a block to its free list
    pub fn release(&self, address: Address) -> BufferResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BufferError::released("arena"));
        }
        let offset = self.offset_of(address)?;
        if state.views.contains(&offset) {
            return Err(BufferError::Unsupported(
                "block is owned by an ArenaBlock and is released when it drops",
            ));
        }
        self.release_locked(&mut state, offset)
    }

    /// Free the whole arena
    ///
    /// Idempotent. Outstanding `ArenaBlock` views keep the memory mapped
    /// until the last of them drops; no new allocations succeed either way.
    pub fn free(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        if state.views.is_empty() {
            state.region = None;
            info!(capacity = self.capacity(), "Arena freed");
        } else {
            debug!(
                live_views = state.views.len(),
                "Arena closed, deallocation deferred until views drop"
            );
        }
        drop(state);
        self.block_released.notify_all();
    }

    pub fn is_freed(&self) -> bool {
        self.state.lock().closed
    }

    /// Size of the used block starting at `address`
    pub fn block_size(&self, address: Address) -> Option<Size> {
        let offset = self.offset_of(address).ok()?;
        let state = self.state.lock();
        state
            .blocks
            .get(&offset)
            .filter(|b| b.used && !state.closed)
            .map(|b| b.size)
    }

    /// True if `address` is the start of a used block
    pub fn is_valid(&self, address: Address) -> bool {
        self.block_size(address).is_some()
    }

    /// Number of free blocks of exactly `size` bytes
    pub fn free_count(&self, size: Size) -> usize {
        if !size.is_power_of_two() || size < ARENA_MIN_BLOCK || size > self.capacity() {
            return 0;
        }
        self.state.lock().free.len(size)
    }

    /// Snapshot of every block, ordered by start offset
    pub fn blocks(&self) -> Vec<Block> {
        let state = self.state.lock();
        let mut blocks: Vec<Block> = state.blocks.values().copied().collect();
        blocks.sort_by_key(|b| b.start);
        blocks
    }

    /// Check that the blocks tile `[0, capacity)` exactly and that the
    /// free lists hold precisely the unused blocks
    pub fn verify_tiling(&self) -> bool {
        let state = self.state.lock();
        let capacity = self.capacity();
        let mut cursor = 0;
        let mut visited = 0;

        while cursor < capacity {
            let Some(block) = state.blocks.get(&cursor) else {
                return false;
            };
            if !block.size.is_power_of_two()
                || block.start % block.size != 0
                || block.end != block.start + block.size
                || state.ends.get(&block.end) != Some(&block.start)
            {
                return false;
            }
            cursor = block.end;
            visited += 1;
        }

        let free_blocks = state.blocks.values().filter(|b| !b.used).count();
        cursor == capacity
            && visited == state.blocks.len()
            && free_blocks == state.free.total()
    }

    pub fn stats(&self) -> ArenaStats {
        let state = self.state.lock();
        let capacity = self.capacity();
        ArenaStats {
            capacity,
            used_bytes: state.used_bytes,
            free_bytes: capacity - state.used_bytes,
            used_blocks: state.used_blocks,
            free_blocks: state.free.total(),
            free_by_size: state.free.occupancy(),
            usage_percentage: state.used_bytes as f64 / capacity as f64 * 100.0,
        }
    }

    fn offset_of(&self, address: Address) -> BufferResult<Size> {
        match address.checked_sub(self.base) {
            Some(offset) if offset < self.capacity() => Ok(offset),
            _ => Err(BufferError::InvalidAddress(address)),
        }
    }

    fn allocate_locked(&self, state: &mut ArenaState, size: Size) -> BufferResult<Address> {
        if state.closed {
            return Err(BufferError::released("arena"));
        }
        let capacity = self.capacity();
        if size > capacity {
            return Err(BufferError::RequestTooLarge {
                requested: size,
                capacity,
            });
        }

        let wanted = size.max(ARENA_MIN_BLOCK).next_power_of_two();
        let Some(mut current) = state.free.first_available(wanted) else {
            warn!(
                requested = size,
                block_size = wanted,
                used_bytes = state.used_bytes,
                "Arena exhausted"
            );
            return Err(BufferError::ArenaExhausted {
                requested: size,
                capacity,
            });
        };

        let start = state
            .free
            .pop(current)
            .ok_or(BufferError::ArenaExhausted {
                requested: size,
                capacity,
            })?;

        // Split down, keeping the lower half and freeing the upper one
        while current > wanted {
            let half = current / 2;
            let upper = start + half;
            state.blocks.insert(start, Block::free(start, half));
            state.blocks.insert(upper, Block::free(upper, half));
            state.ends.insert(upper, start);
            state.ends.insert(upper + half, upper);
            state.free.push(half, upper);
            debug!(start = start, size = current, half = half, "Split arena block");
            current = half;
        }

        if let Some(block) = state.blocks.get_mut(&start) {
            block.used = true;
        }
        state.used_bytes += wanted;
        state.used_blocks += 1;

        if let Some(region) = state.region.as_ref() {
            // SAFETY: [start, start + wanted) lies inside the region and no
            // view references this block until it is handed out
            unsafe { set_memory(region.as_ptr().as_ptr().add(start), wanted, 0) };
        }

        let usage = state.used_bytes as f64 / capacity as f64 * 100.0;
        if usage >= ARENA_HIGH_PRESSURE_PERCENT {
            warn!(
                used_bytes = state.used_bytes,
                capacity = capacity,
                "High arena memory pressure"
            );
        }

        Ok(self.base + start)
    }

    fn release_locked(&self, state: &mut ArenaState, offset: Size) -> BufferResult<()> {
        let address = self.base + offset;
        let size = match state.blocks.get_mut(&offset) {
            Some(block) if block.used => {
                block.used = false;
                block.size
            }
            _ => return Err(BufferError::InvalidAddress(address)),
        };

        state.used_bytes -= size;
        state.used_blocks -= 1;
        state.free.push(size, offset);

        if self.config.coalesce {
            self.coalesce(state, offset, size);
        }

        debug!(address = format!("0x{:x}", address), size = size, "Released arena block");
        self.block_released.notify_all();
        Ok(())
    }

    /// Merge a free block with its free buddy until the buddy is busy or split
    fn coalesce(&self, state: &mut ArenaState, mut start: Size, mut size: Size) {
        while size < self.capacity() {
            let buddy_start = start ^ size;
            let buddy = if buddy_start < start {
                state.ends.get(&start).and_then(|s| state.blocks.get(s))
            } else {
                state.blocks.get(&(start + size))
            };
            match buddy {
                Some(b) if b.start == buddy_start && b.size == size && !b.used => {}
                _ => break,
            }

            state.free.remove(size, start);
            state.free.remove(size, buddy_start);
            let merged = start.min(buddy_start);
            let upper = merged + size;
            state.blocks.remove(&upper);
            state.ends.remove(&upper);
            state.blocks.insert(merged, Block::free(merged, size * 2));
            state.ends.insert(merged + size * 2, merged);
            state.free.push(size * 2, merged);

            debug!(start = merged, size = size * 2, "Merged arena buddies");
            start = merged;
            size *= 2;
        }
    }

    /// Called by `ArenaBlock` on drop
    pub(super) fn release_view(&self, address: Address) {
        let mut state = self.state.lock();
        let Ok(offset) = self.offset_of(address) else {
            return;
        };
        state.views.remove(&offset);

        if state.closed {
            if state.views.is_empty() && state.region.is_some() {
                state.region = None;
                info!(capacity = self.capacity(), "Arena freed after last view dropped");
            }
            return;
        }
        if let Err(e) = self.release_locked(&mut state, offset) {
            warn!(error = %e, "Failed to release arena block view");
        }
    }
}

impl Allocator for Arena {
    fn allocate(&self, size: Size) -> BufferResult<Address> {
        Arena::allocate(self, size)
    }

    fn release(&self, address: Address) -> BufferResult<()> {
        Arena::release(self, address)
    }

    fn is_valid(&self, address: Address) -> bool {
        Arena::is_valid(self, address)
    }

    fn block_size(&self, address: Address) -> Option<Size> {
        Arena::block_size(self, address)
    }
}

impl MemoryInfo for Arena {
    fn stats(&self) -> ArenaStats {
        Arena::stats(self)
    }

    fn info(&self) -> (Size, Size, Size) {
        let stats = Arena::stats(self);
        (stats.capacity, stats.used_bytes, stats.free_bytes)
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("base", &format_args!("0x{:x}", self.base))
            .field("capacity", &self.capacity())
            .field("coalesce", &self.config.coalesce)
            .finish()
    }
}
