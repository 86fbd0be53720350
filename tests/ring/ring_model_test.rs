/*!
 * Ring Model Tests
 * Random operation sequences checked against a VecDeque reference
 */

use native_buffers::DirectRingBuffer;
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
    Skip(usize),
    Linearize,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..12).prop_map(Op::Write),
        (0usize..12).prop_map(Op::Read),
        (0usize..12).prop_map(Op::Skip),
        Just(Op::Linearize),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_ring_matches_fifo(
        capacity in 2usize..24,
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let mut ring = DirectRingBuffer::new(capacity).unwrap();
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Write(data) => {
                    let fits = data.len() <= capacity - 1 - model.len();
                    prop_assert_eq!(ring.write(&data).is_ok(), fits);
                    if fits {
                        model.extend(data);
                    }
                }
                Op::Read(n) => {
                    let before = model.len();
                    let mut dst = vec![0u8; n];
                    match ring.read(&mut dst) {
                        Ok(count) => {
                            prop_assert_eq!(count, n.min(before));
                            let expected: Vec<u8> = model.drain(..count).collect();
                            prop_assert_eq!(&dst[..count], expected.as_slice());
                        }
                        Err(_) => prop_assert!(before == 0 && n > 0),
                    }
                }
                Op::Skip(n) => {
                    let ok = ring.skip(n).is_ok();
                    prop_assert_eq!(ok, n <= model.len());
                    if ok {
                        model.drain(..n);
                    }
                }
                Op::Linearize => {
                    let expected: Vec<u8> = model.iter().copied().collect();
                    prop_assert_eq!(ring.linearize().unwrap(), expected.as_slice());
                }
            }

            prop_assert_eq!(ring.remaining(), model.len());
            prop_assert_eq!(ring.available(), capacity - 1 - model.len());
            prop_assert_eq!(ring.is_empty(), model.is_empty());
            prop_assert_eq!(ring.is_full(), model.len() == capacity - 1);
            let contents: Vec<u8> = model.iter().copied().collect();
            prop_assert_eq!(ring.to_vec().unwrap(), contents);
        }
    }
}
