/*!
 * Arena Property Tests
 * Random allocate/release sequences always leave a consistent tiling
 */

use native_buffers::memory::Arena;
use native_buffers::ArenaConfig;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Release(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..20_000).prop_map(Op::Allocate),
        (0usize..64).prop_map(Op::Release),
    ]
}

fn run(arena: &Arena, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut live: Vec<(usize, usize)> = Vec::new();

    for op in ops {
        match op {
            Op::Allocate(size) => {
                if let Ok(address) = arena.allocate(*size) {
                    let block = arena.block_size(address).unwrap();
                    prop_assert!(block >= *size && block >= 1024);
                    prop_assert!(block.is_power_of_two());
                    live.push((address, block));
                }
            }
            Op::Release(index) if !live.is_empty() => {
                let (address, _) = live.swap_remove(index % live.len());
                prop_assert!(arena.release(address).is_ok());
            }
            Op::Release(_) => {}
        }

        prop_assert!(arena.verify_tiling());
        let blocks = arena.blocks();
        let total: usize = blocks.iter().map(|b| b.size).sum();
        prop_assert_eq!(total, arena.capacity());

        let used: usize = live.iter().map(|(_, size)| size).sum();
        prop_assert_eq!(arena.stats().used_bytes, used);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tiling_without_coalescing(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let arena = Arena::new(65536).unwrap();
        run(&arena, &ops)?;
    }

    #[test]
    fn prop_tiling_with_coalescing(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let arena = Arena::with_config(ArenaConfig::new(65536).with_coalescing(true)).unwrap();
        run(&arena, &ops)?;
    }
}
