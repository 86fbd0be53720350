/*!
 * Arena Concurrency Tests
 * Concurrent allocations never hand out the same block twice
 */

use native_buffers::memory::Arena;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_allocations_are_disjoint() {
    let arena = Arc::new(Arena::new(1024 * 1024).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|seed| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut held = Vec::new();
                for _ in 0..40 {
                    let size = rng.gen_range(1..8192);
                    if let Ok(address) = arena.allocate(size) {
                        held.push((address, arena.block_size(address).unwrap()));
                    }
                }
                held
            })
        })
        .collect();

    let mut ranges: Vec<(usize, usize)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ranges.sort();

    let starts: HashSet<usize> = ranges.iter().map(|(a, _)| *a).collect();
    assert_eq!(starts.len(), ranges.len());
    for pair in ranges.windows(2) {
        assert!(pair[0].0 + pair[0].1 <= pair[1].0, "blocks overlap");
    }
    assert!(arena.verify_tiling());
}

#[test]
fn test_blocks_written_concurrently_keep_their_contents() {
    let arena = Arc::new(Arena::new(64 * 1024).unwrap());
    let handles: Vec<_> = (0u8..8)
        .map(|tag| {
            let arena = Arc::clone(&arena);
            thread::spawn(move || {
                let mut block = arena.allocate_block(2048).unwrap();
                block.as_mut_slice().fill(tag);
                thread::yield_now();
                block.as_slice().iter().all(|&b| b == tag)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(arena.stats().used_blocks, 0);
}
