/*!
 * Byte Channel Concurrency Tests
 * Writers and waiting readers on a shared channel
 */

use native_buffers::ByteChannel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_wait_data_woken_by_writer() {
    let channel = Arc::new(ByteChannel::with_defaults().unwrap());
    let writer = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            for _ in 0..4 {
                thread::sleep(Duration::from_millis(5));
                channel.write_end(b"ping").unwrap();
            }
        })
    };

    assert!(channel.wait_data(16, Duration::from_secs(5), || {}).unwrap());
    writer.join().unwrap();
    assert_eq!(channel.array().unwrap(), b"pingpingpingping");
}

#[test]
fn test_wait_for_mark_with_poll_feeder() {
    let channel = ByteChannel::with_defaults().unwrap();
    let mut polls = 0;

    let found = channel
        .wait_for_mark(b"\r\n", Duration::from_secs(1), || {
            polls += 1;
            let piece: &[u8] = if polls < 3 { b"abc" } else { b"\r\n" };
            channel.write_end(piece).unwrap();
        })
        .unwrap();

    assert!(found);
    assert_eq!(polls, 3);
    assert_eq!(channel.index_of(b"\r\n").unwrap(), Some(6));
}

#[test]
fn test_wait_data_times_out() {
    let channel = ByteChannel::with_defaults().unwrap();
    assert!(!channel
        .wait_data(1, Duration::from_millis(30), || {})
        .unwrap());
}

#[test]
fn test_concurrent_writers_and_reader() {
    let channel = Arc::new(ByteChannel::with_defaults().unwrap());
    let writers: Vec<_> = (0..4u8)
        .map(|tag| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for _ in 0..100 {
                    channel.write_end(&[tag; 8]).unwrap();
                }
            })
        })
        .collect();

    let mut received = 0;
    let mut chunk = [0u8; 8];
    while received < 4 * 100 * 8 {
        if channel.wait_data(8, Duration::from_secs(5), || {}).unwrap() {
            let n = channel.read_head(&mut chunk).unwrap();
            assert_eq!(n, 8);
            // Writes are atomic, so each 8-byte record is homogeneous
            assert!(chunk.iter().all(|&b| b == chunk[0]));
            received += n;
        }
    }

    for writer in writers {
        writer.join().unwrap();
    }
    assert!(channel.is_empty());
}
