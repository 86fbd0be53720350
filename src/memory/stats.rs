/*!
 * Allocation Accounting
 * Process-wide counters for native memory handed out by this crate
 */

use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static MALLOC_SIZE: AtomicU64 = AtomicU64::new(0);
static MALLOC_COUNT: AtomicU64 = AtomicU64::new(0);
static BUFFER_COUNT: AtomicU64 = AtomicU64::new(0);

/// Global accounting of native allocations and live buffer handles
pub struct BufferAnalysis;

impl BufferAnalysis {
    pub(crate) fn record_malloc(size: Size) {
        MALLOC_SIZE.fetch_add(size as u64, Ordering::Relaxed);
        MALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_realloc(old_size: Size, new_size: Size) {
        if new_size >= old_size {
            MALLOC_SIZE.fetch_add((new_size - old_size) as u64, Ordering::Relaxed);
        } else {
            MALLOC_SIZE.fetch_sub((old_size - new_size) as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_free(size: Size) {
        MALLOC_SIZE.fetch_sub(size as u64, Ordering::Relaxed);
        MALLOC_COUNT.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn buffer_opened() {
        BUFFER_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn buffer_closed() {
        BUFFER_COUNT.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current counter values
    pub fn snapshot() -> AnalysisSnapshot {
        AnalysisSnapshot {
            malloc_size: MALLOC_SIZE.load(Ordering::Relaxed),
            malloc_count: MALLOC_COUNT.load(Ordering::Relaxed),
            buffer_count: BUFFER_COUNT.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the global counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Bytes currently held by native allocations
    pub malloc_size: u64,
    /// Live native allocations
    pub malloc_count: u64,
    /// Live owned direct buffer handles
    pub buffer_count: u64,
}

impl AnalysisSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for AnalysisSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{Time: {:?}, MallocSize: {}, MallocCount: {}, BufferCount: {}}}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            format_bytes(self.malloc_size),
            self.malloc_count,
            self.buffer_count
        )
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{}{}", bytes, UNITS[0])
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}
