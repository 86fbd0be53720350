/*!
 * Buffer Helper Tests
 * Growth, movement, search and release over direct buffer handles
 */

use native_buffers::buffer::{ops, BufferOwner, DirectBuffer};
use native_buffers::BufferError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::ptr::NonNull;

fn filled(data: &[u8]) -> DirectBuffer {
    let mut buf = ops::allocate_direct(data.len()).unwrap();
    buf.put_slice(data).unwrap();
    buf.flip();
    buf
}

#[test]
fn test_default_allocation() {
    let buf = ops::allocate_default().unwrap();
    assert_eq!(buf.capacity(), 8192);
    assert_eq!(buf.owner(), Some(BufferOwner::Native));
    assert!(buf.as_slice().iter().all(|&b| b == 0));
}

#[test]
fn test_grow_then_shift_right() {
    let mut buf = filled(b"frame");
    ops::move_data(&mut buf, 10).unwrap();

    assert_eq!(buf.capacity(), 15);
    assert_eq!(buf.position(), 10);
    assert_eq!(ops::to_string(&buf).unwrap(), "frame");
}

#[test]
fn test_external_buffer_cannot_grow() {
    let mut backing = [0u8; 8];
    let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
    let mut buf = unsafe { DirectBuffer::from_raw_parts(ptr, backing.len()) };

    assert!(!ops::is_owned(&buf));
    assert!(matches!(
        ops::reallocate(&mut buf, 64),
        Err(BufferError::Unsupported(_))
    ));
    ops::reallocate(&mut buf, 4).unwrap();
    assert_eq!(buf.limit(), 4);
    ops::release(&mut buf);
    assert!(ops::is_released(&buf));
}

#[test]
fn test_index_of_finds_delimiters() {
    let buf = filled(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    assert_eq!(ops::index_of(&buf, b"\r\n"), Some(15));
    assert_eq!(ops::index_of(&buf, b"\r\n\r\n"), Some(34));
    assert_eq!(ops::index_of(&buf, b"404"), None);
}

proptest! {
    #[test]
    fn prop_reallocate_preserves_content(
        data in proptest::collection::vec(any::<u8>(), 1..256),
        extra in 1usize..4096,
    ) {
        let mut buf = filled(&data);
        ops::reallocate(&mut buf, data.len() + extra).unwrap();
        prop_assert_eq!(buf.capacity(), data.len() + extra);
        prop_assert_eq!(ops::to_vec(&buf).unwrap(), data);
    }

    #[test]
    fn prop_move_round_trip(
        data in proptest::collection::vec(any::<u8>(), 1..128),
        shift in 1isize..64,
    ) {
        let mut buf = filled(&data);
        ops::move_data(&mut buf, shift).unwrap();
        prop_assert_eq!(buf.as_slice(), data.as_slice());
        ops::move_data(&mut buf, -shift).unwrap();
        prop_assert_eq!(buf.position(), 0);
        prop_assert_eq!(buf.as_slice(), data.as_slice());
    }
}
