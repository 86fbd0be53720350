/*!
 * Ring Buffer Tests
 * Wrap-around behaviour, storage variants and persistence
 */

use native_buffers::memory::Arena;
use native_buffers::{BufferError, DirectBuffer, DirectRingBuffer, RingBuffer, RingDirectBuffer, WaitConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_wrapped_buffer_of_eight() {
    let buffer = DirectBuffer::allocate(8).unwrap();
    let mut ring = RingDirectBuffer::wrap(buffer).unwrap();

    assert_eq!(ring.write(b"1234567").unwrap(), 7);
    assert!(ring.is_full());

    let mut head = [0u8; 3];
    assert_eq!(ring.read(&mut head).unwrap(), 3);
    assert_eq!(&head, b"123");

    ring.write(b"abc").unwrap();
    assert_eq!(ring.remaining(), 7);
    assert!(ring.is_full());
    assert_eq!(ring.to_vec().unwrap(), b"4567abc");

    let mut all = [0u8; 7];
    ring.read(&mut all).unwrap();
    assert_eq!(&all, b"4567abc");
    assert!(ring.is_empty());
}

#[test]
fn test_overflow_is_all_or_nothing() {
    let mut ring = DirectRingBuffer::new(8).unwrap();
    ring.write(b"12345").unwrap();
    assert!(matches!(
        ring.write(b"abc"),
        Err(BufferError::Overflow { requested: 3, available: 2 })
    ));
    assert_eq!(ring.to_vec().unwrap(), b"12345");
}

#[test]
fn test_index_of_wrapped_marker() {
    let mut ring = DirectRingBuffer::new(16).unwrap();
    ring.write(&[b'.'; 14]).unwrap();
    ring.skip(12).unwrap();
    // read=12, write=14; "\r\n" lands on 14 and 15, "END" wraps to 0..3
    ring.write(b"\r\nEND").unwrap();

    assert!(ring.write_position() < ring.read_position());
    assert_eq!(ring.position_of(b"\r\nE").unwrap(), Some(2));
    assert_eq!(ring.index_of(b"\r\nE").unwrap(), Some(14));
    assert_eq!(ring.position_of(b"ND").unwrap(), Some(5));
    assert_eq!(ring.index_of(b"ND").unwrap(), Some(1));
    assert_eq!(ring.index_of(b"\n\r").unwrap(), None);
}

#[test]
fn test_save_to_file_consumes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ring/out.log");
    let mut ring = DirectRingBuffer::new(32).unwrap();
    ring.write(b"line one\nline two\n").unwrap();

    assert_eq!(ring.save_to_file(&path, 9).unwrap(), 9);
    assert_eq!(ring.to_vec().unwrap(), b"line two\n");
    assert_eq!(ring.save_to_file(&path, 1000).unwrap(), 9);
    assert!(ring.is_empty());
    assert_eq!(fs::read(&path).unwrap(), b"line one\nline two\n");
}

#[test]
fn test_arena_rings_share_one_arena() {
    let arena = Arc::new(Arena::new(8192).unwrap());
    let mut rings: Vec<_> = (0..4)
        .map(|_| DirectRingBuffer::in_arena(&arena, 2048).unwrap())
        .collect();
    assert!(DirectRingBuffer::in_arena(&arena, 16).is_err());

    for (i, ring) in rings.iter_mut().enumerate() {
        ring.write(&[i as u8; 100]).unwrap();
    }
    for (i, ring) in rings.iter().enumerate() {
        assert!(ring.to_vec().unwrap().iter().all(|&b| b == i as u8));
    }

    drop(rings);
    assert_eq!(arena.stats().used_bytes, 0);
}

#[test]
fn test_producer_consumer_with_outer_lock() {
    let ring = Arc::new(Mutex::new(DirectRingBuffer::new(64).unwrap()));
    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            let mut sent = 0u32;
            while sent < 1000 {
                let mut ring = ring.lock().unwrap();
                while sent < 1000 && ring.write_byte((sent % 256) as u8).is_ok() {
                    sent += 1;
                }
            }
        })
    };

    let mut expected = 0u32;
    while expected < 1000 {
        let mut ring = ring.lock().unwrap();
        while let Ok(byte) = ring.read_byte() {
            assert_eq!(byte, (expected % 256) as u8);
            expected += 1;
        }
    }
    producer.join().unwrap();
}

#[test]
fn test_wait_data_low_latency_config() {
    let mut ring = DirectRingBuffer::new(8)
        .unwrap()
        .with_wait_config(WaitConfig::low_latency());
    let mut feed = b"abc".iter();

    let ready = ring
        .wait_data(3, Duration::from_secs(1), |r| {
            if let Some(&b) = feed.next() {
                r.write_byte(b).unwrap();
            }
        })
        .unwrap();
    assert!(ready);
    assert_eq!(ring.read_line().unwrap().as_deref(), Some("abc"));
}

#[test]
fn test_released_ring_rejects_everything() {
    let mut ring = DirectRingBuffer::new(8).unwrap();
    ring.write(b"x").unwrap();
    ring.release();

    assert!(ring.is_released());
    assert!(matches!(ring.read_byte(), Err(BufferError::Released { .. })));
    assert!(matches!(ring.get(0), Err(BufferError::Released { .. })));
    assert!(ring.linearize().is_err());
    assert!(ring.spare_mut().is_err());
    assert!(matches!(ring.index_of(b"x"), Err(BufferError::Released { .. })));
    assert!(matches!(ring.position_of(b"x"), Err(BufferError::Released { .. })));
    assert!(matches!(ring.starts_with(b"x"), Err(BufferError::Released { .. })));
    assert!(matches!(
        ring.wait_data(1, Duration::from_millis(5), |_| {}),
        Err(BufferError::Released { .. })
    ));
}

#[test]
fn test_object_ring() {
    let mut ring: RingBuffer<String> = RingBuffer::new(3).unwrap();
    ring.push("a".into()).unwrap();
    ring.push("b".into()).unwrap();
    assert_eq!(ring.push("c".into()), Err("c".to_string()));
    assert_eq!(ring.pop().as_deref(), Some("a"));
    ring.push("c".into()).unwrap();
    assert_eq!(ring.drain(5), vec!["b".to_string(), "c".to_string()]);
}
