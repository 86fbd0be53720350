/*!
 * Byte Channel Tests
 * Content operations, persistence and configuration
 */

use native_buffers::{BufferConfig, BufferError, ByteChannel, ChannelConfig, DirectBuffer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn channel_with(data: &[u8]) -> ByteChannel {
    let channel = ByteChannel::with_defaults().unwrap();
    channel.write_end(data).unwrap();
    channel
}

#[test]
fn test_default_channel_grows_past_initial_capacity() {
    let channel = ByteChannel::with_defaults().unwrap();
    let data: Vec<u8> = (0..2000).map(|i| (i % 251) as u8).collect();

    channel.write_end(&data).unwrap();
    assert!(channel.capacity() >= 2000);
    assert_eq!(channel.size(), 2000);
    assert_eq!(channel.available(), channel.capacity() - 2000);
    assert_eq!(channel.array().unwrap(), data);
}

#[test]
fn test_http_request_parsing() {
    let channel = channel_with(b"GET /index HTTP/1.1\r\nHost: example\r\n\r\nbody");

    assert_eq!(channel.read_line().unwrap().as_deref(), Some("GET /index HTTP/1.1\r\n"));
    assert_eq!(&channel.read_with_split(b"\r\n").unwrap()[..], b"Host: example");
    assert!(channel.starts_with(b"\r\n").unwrap());
    channel.discard(2).unwrap();
    assert_eq!(channel.array().unwrap(), b"body");
}

#[test]
fn test_save_to_file_drains_head() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dumps/channel.bin");
    let channel = channel_with(b"0123456789");

    assert_eq!(channel.save_to_file(&path, 4).unwrap(), 4);
    assert_eq!(channel.save_to_file(&path, 100).unwrap(), 6);
    assert!(channel.is_empty());
    assert_eq!(fs::read(&path).unwrap(), b"0123456789");
}

#[test]
fn test_save_large_content_in_chunks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.bin");
    let channel = ByteChannel::with_config(ChannelConfig {
        initial_capacity: 1024,
        max_size: 4 * 1024 * 1024,
    })
    .unwrap();
    let data = vec![0x5au8; 3 * 1024 * 1024 / 2];
    channel.write_end(&data).unwrap();

    assert_eq!(channel.save_to_file(&path, data.len()).unwrap(), data.len());
    assert_eq!(fs::metadata(&path).unwrap().len(), data.len() as u64);
}

#[test]
fn test_default_max_size_is_enforced() {
    let channel = ByteChannel::with_defaults().unwrap();
    let chunk = vec![0u8; 1024 * 1024];
    channel.write_end(&chunk).unwrap();
    assert!(matches!(
        channel.write_end(&chunk),
        Err(BufferError::CapacityExceeded { .. })
    ));
    assert!(!channel.is_full());
    assert_eq!(channel.max_size(), 2 * 1024 * 1024);
}

#[test]
fn test_from_config() {
    let config = BufferConfig::from_json(r#"{"channel": {"initial_capacity": 64, "max_size": 128}}"#)
        .unwrap();
    let channel = ByteChannel::from_config(&config).unwrap();
    assert_eq!(channel.capacity(), 64);
    assert!(channel.write_end(&[0u8; 129]).is_err());
}

#[test]
fn test_checkout_round_trip() {
    let channel = channel_with(b"abc");
    {
        let mut checkout = channel.checkout().unwrap();
        checkout.reserve(5).unwrap();
        checkout.spare_mut()[..5].copy_from_slice(b"defgh");
        checkout.commit(5).unwrap();
        checkout.advance(2).unwrap();
    }
    assert_eq!(channel.array().unwrap(), b"cdefgh");

    {
        let mut checkout = channel.checkout().unwrap();
        assert_eq!(checkout.filled(), b"cdefgh");
        checkout.set_position(3).unwrap();
        assert!(checkout.set_limit(checkout.capacity() + 1).is_err());
    }
    assert_eq!(channel.array().unwrap(), b"fgh");
}

#[test]
fn test_adopted_buffer() {
    let mut buffer = DirectBuffer::allocate(8).unwrap();
    buffer.put_slice(b"seed").unwrap();
    buffer.flip();

    let channel = ByteChannel::from_buffer(buffer).unwrap();
    channel.write_end(b" data").unwrap();
    assert_eq!(channel.array().unwrap(), b"seed data");
}

#[test]
fn test_wait_on_released_channel() {
    let channel = channel_with(b"x");
    channel.release();
    assert!(matches!(
        channel.wait_data(1, Duration::from_millis(10), || {}),
        Err(BufferError::Released { .. })
    ));
}

#[test]
fn test_search_on_released_channel() {
    let channel = channel_with(b"abc");
    channel.release();
    assert!(matches!(channel.index_of(b"b"), Err(BufferError::Released { .. })));
    assert!(matches!(channel.starts_with(b"a"), Err(BufferError::Released { .. })));
    assert!(matches!(
        channel.wait_for_mark(b"b", Duration::from_millis(10), || {}),
        Err(BufferError::Released { .. })
    ));
}

proptest! {
    #[test]
    fn prop_shrink_removes_clamped_range(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        pos in 0usize..64,
        len in -80isize..80,
    ) {
        let channel = ByteChannel::new(16).unwrap();
        channel.write_end(&data).unwrap();
        let result = channel.shrink(pos, len);

        if data.is_empty() || len == 0 {
            prop_assert!(result.is_ok());
            prop_assert_eq!(channel.array().unwrap(), data);
        } else if pos > data.len() {
            prop_assert!(result.is_err());
            prop_assert_eq!(channel.array().unwrap(), data);
        } else {
            prop_assert!(result.is_ok());
            let (start, end) = if len < 0 {
                (pos.saturating_sub(len.unsigned_abs()), pos)
            } else {
                (pos, (pos + len as usize).min(data.len()))
            };
            let mut expected = data.clone();
            expected.drain(start..end);
            prop_assert_eq!(channel.size(), data.len() - (end - start));
            prop_assert_eq!(channel.array().unwrap(), expected);
        }
    }

    #[test]
    fn prop_interior_write_then_read_restores(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        insert in proptest::collection::vec(any::<u8>(), 1..32),
        pos_seed in any::<usize>(),
    ) {
        let channel = ByteChannel::new(8).unwrap();
        channel.write_end(&data).unwrap();
        let pos = pos_seed % (data.len() + 1);

        channel.write(pos, &insert).unwrap();
        let mut taken = vec![0u8; insert.len()];
        prop_assert_eq!(channel.read(pos, &mut taken).unwrap(), insert.len());
        prop_assert_eq!(taken, insert);
        prop_assert_eq!(channel.array().unwrap(), data);
    }
}
