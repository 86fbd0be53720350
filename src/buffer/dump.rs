/*!
 * File Dump
 * Append-only writer used to persist drained buffer bytes
 */

use crate::core::errors::BufferResult;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Append handle that creates missing parent directories on open
pub struct FileDump {
    file: File,
    written: usize,
}

impl FileDump {
    pub fn open(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "Opened buffer dump file");
        Ok(Self { file, written: 0 })
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> BufferResult<()> {
        self.file.write_all(chunk)?;
        self.written += chunk.len();
        Ok(())
    }

    /// Bytes appended through this handle
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> BufferResult<usize> {
        self.file.flush()?;
        Ok(self.written)
    }
}
