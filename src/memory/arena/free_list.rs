/*!
 * Power-of-Two Free Lists
 * One FIFO list of free block offsets per block size, indexed by log2
 */

use crate::core::limits::ARENA_MIN_BLOCK_SHIFT;
use crate::core::types::Size;
use std::collections::VecDeque;

#[derive(Debug)]
pub(super) struct FreeLists {
    /// buckets[i] holds start offsets of free blocks of size 1024 << i
    buckets: Vec<VecDeque<Size>>,
}

impl FreeLists {
    pub fn new(capacity: Size) -> Self {
        let count = (capacity.trailing_zeros() - ARENA_MIN_BLOCK_SHIFT + 1) as usize;
        Self {
            buckets: vec![VecDeque::new(); count],
        }
    }

    #[inline]
    pub fn bucket_index(size: Size) -> usize {
        (size.trailing_zeros() - ARENA_MIN_BLOCK_SHIFT) as usize
    }

    #[inline]
    pub fn bucket_size(index: usize) -> Size {
        1 << (index as u32 + ARENA_MIN_BLOCK_SHIFT)
    }

    pub fn push(&mut self, size: Size, start: Size) {
        self.buckets[Self::bucket_index(size)].push_back(start);
    }

    pub fn pop(&mut self, size: Size) -> Option<Size> {
        self.buckets[Self::bucket_index(size)].pop_front()
    }

    /// Remove a specific block from its list
    pub fn remove(&mut self, size: Size, start: Size) -> bool {
        let bucket = &mut self.buckets[Self::bucket_index(size)];
        match bucket.iter().position(|&s| s == start) {
            Some(pos) => {
                bucket.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Smallest non-empty bucket at or above `size`
    pub fn first_available(&self, size: Size) -> Option<Size> {
        (Self::bucket_index(size)..self.buckets.len())
            .find(|&i| !self.buckets[i].is_empty())
            .map(Self::bucket_size)
    }

    pub fn len(&self, size: Size) -> usize {
        self.buckets
            .get(Self::bucket_index(size))
            .map_or(0, |b| b.len())
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    /// (block size, free count) for every bucket, smallest first
    pub fn occupancy(&self) -> Vec<(Size, usize)> {
        self.buckets
            .iter()
            .enumerate()
            .map(|(i, b)| (Self::bucket_size(i), b.len()))
            .collect()
    }
}
