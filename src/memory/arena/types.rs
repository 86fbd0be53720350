/*!
 * Arena Types
 * Block metadata, statistics and pressure levels
 */

use crate::core::limits::ARENA_HIGH_PRESSURE_PERCENT;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};

/// A contiguous power-of-two region of the arena, tracked by offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub start: Size,
    pub end: Size,
    pub size: Size,
    pub used: bool,
}

impl Block {
    pub(super) fn free(start: Size, size: Size) -> Self {
        Self {
            start,
            end: start + size,
            size,
            used: false,
        }
    }
}

/// Arena statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaStats {
    pub capacity: Size,
    pub used_bytes: Size,
    pub free_bytes: Size,
    pub used_blocks: usize,
    pub free_blocks: usize,
    /// (block size, free blocks of that size), smallest first
    pub free_by_size: Vec<(Size, usize)>,
    pub usage_percentage: f64,
}

impl ArenaStats {
    pub fn memory_pressure(&self) -> MemoryPressure {
        if self.usage_percentage >= 95.0 {
            MemoryPressure::Critical
        } else if self.usage_percentage >= ARENA_HIGH_PRESSURE_PERCENT {
            MemoryPressure::High
        } else if self.usage_percentage >= 60.0 {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
