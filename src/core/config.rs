/*!
 * Configuration
 * Serializable settings for channels, arenas and waiting behaviour
 */

use super::errors::{BufferError, BufferResult};
use super::limits::*;
use super::types::Size;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Capacity of a direct buffer allocated without an explicit size
    pub default_buffer_size: Size,
    pub channel: ChannelConfig,
    pub wait: WaitConfig,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            channel: ChannelConfig::default(),
            wait: WaitConfig::default(),
        }
    }
}

impl BufferConfig {
    /// Parse a JSON document; missing fields fall back to their defaults
    pub fn from_json(json: &str) -> BufferResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BufferError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BufferResult<()> {
        if self.default_buffer_size == 0 {
            return Err(BufferError::InvalidConfiguration(
                "default_buffer_size must be greater than zero".into(),
            ));
        }
        self.channel.validate()?;
        self.wait.validate()
    }
}

/// Growable channel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub initial_capacity: Size,
    /// Growth beyond this size fails with `CapacityExceeded`
    pub max_size: Size,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_size: DEFAULT_CHANNEL_MAX_SIZE,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> BufferResult<()> {
        if self.initial_capacity > self.max_size {
            return Err(BufferError::InvalidConfiguration(format!(
                "initial_capacity {} exceeds max_size {}",
                self.initial_capacity, self.max_size
            )));
        }
        Ok(())
    }
}

/// Arena settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Total arena size; a power of two of at least 1KB
    pub capacity: Size,
    /// Merge released blocks with their free buddy
    pub coalesce: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: 1024 * 1024,
            coalesce: false,
        }
    }
}

impl ArenaConfig {
    pub fn new(capacity: Size) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_coalescing(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    pub fn validate(&self) -> BufferResult<()> {
        if self.capacity < ARENA_MIN_BLOCK {
            return Err(BufferError::InvalidConfiguration(format!(
                "arena capacity {} is below the {} byte minimum block",
                self.capacity, ARENA_MIN_BLOCK
            )));
        }
        if !self.capacity.is_power_of_two() {
            return Err(BufferError::InvalidConfiguration(format!(
                "arena capacity {} is not a power of two",
                self.capacity
            )));
        }
        Ok(())
    }
}

/// Waiting behaviour for `wait_data` style operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Busy-spin budget before the waiter starts sleeping
    pub spin_micros: u64,
    pub max_spins: u32,
    /// Interval between poll-callback invocations
    pub poll_interval_millis: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            spin_micros: WAIT_SPIN_DURATION.as_micros() as u64,
            max_spins: WAIT_MAX_SPINS,
            poll_interval_millis: WAIT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl WaitConfig {
    /// Short spin, frequent polling
    pub fn low_latency() -> Self {
        Self {
            spin_micros: 10,
            max_spins: 100,
            poll_interval_millis: 1,
        }
    }

    /// Skip spinning, poll rarely
    pub fn long_wait() -> Self {
        Self {
            spin_micros: 0,
            max_spins: 0,
            poll_interval_millis: 10,
        }
    }

    pub fn spin_duration(&self) -> Duration {
        Duration::from_micros(self.spin_micros)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn validate(&self) -> BufferResult<()> {
        if self.poll_interval_millis == 0 {
            return Err(BufferError::InvalidConfiguration(
                "poll_interval_millis must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
