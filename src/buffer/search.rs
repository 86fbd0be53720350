/*!
 * Byte Search
 *
 * Quick-search (Sunday) scan over any indexable byte source. On a mismatch
 * the window jumps past the byte that follows it, aligned to that byte's
 * last occurrence in the pattern. Ring buffers supply a wrapping accessor;
 * flat buffers supply a slice.
 */

use crate::core::types::Size;

/// First offset in `[0, len)` where `mark` occurs, reading bytes through `byte_at`
///
/// An empty `mark` never matches.
pub fn index_of_by<F>(len: Size, byte_at: F, mark: &[u8]) -> Option<Size>
where
    F: Fn(Size) -> u8,
{
    let m = mark.len();
    if m == 0 || m > len {
        return None;
    }

    let mut start = 0;
    while start + m <= len {
        let mut matched = 0;
        while matched < m && byte_at(start + matched) == mark[matched] {
            matched += 1;
        }
        if matched == m {
            return Some(start);
        }
        if start + m == len {
            return None;
        }

        let next = byte_at(start + m);
        start += match mark.iter().rposition(|&b| b == next) {
            Some(pos) => m - pos,
            None => m + 1,
        };
    }
    None
}

/// First offset of `mark` in `haystack`
#[inline]
pub fn index_of(haystack: &[u8], mark: &[u8]) -> Option<Size> {
    index_of_by(haystack.len(), |i| haystack[i], mark)
}
