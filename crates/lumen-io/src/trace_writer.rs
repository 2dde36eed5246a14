// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A [`TraceSink`] that records into a buffered file.

use crate::trace_format::{MAGIC, TAG_COMMANDS, TAG_RESET, VERSION};
use lumen_core::{TraceError, TraceSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

struct OpenTrace {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Writes command traces to disk using the layout in [`crate::trace_format`].
#[derive(Default)]
pub struct FileTraceWriter {
    current: Option<OpenTrace>,
}

impl FileTraceWriter {
    /// Creates a writer with no file open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path of the open trace, if any.
    pub fn path(&self) -> Option<&Path> {
        self.current.as_ref().map(|t| t.path.as_path())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TraceError> {
        let trace = self.current.as_mut().ok_or(TraceError::NotOpen)?;
        trace.writer.write_all(bytes).map_err(|source| TraceError::Io {
            path: trace.path.clone(),
            source,
        })
    }
}

impl std::fmt::Debug for FileTraceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTraceWriter")
            .field("path", &self.path())
            .finish()
    }
}

impl TraceSink for FileTraceWriter {
    fn open(&mut self, path: &Path) -> Result<(), TraceError> {
        if let Some(trace) = &self.current {
            return Err(TraceError::AlreadyOpen(trace.path.clone()));
        }
        let file = File::create(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("FileTraceWriter: Opened '{}'", path.display());
        self.current = Some(OpenTrace {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.current.is_some()
    }

    fn write_header(&mut self, shared_memory_size: u32) -> Result<(), TraceError> {
        let mut header = Vec::with_capacity(crate::trace_format::HEADER_LEN);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&shared_memory_size.to_le_bytes());
        self.write_bytes(&header)
    }

    fn write_reset(&mut self) -> Result<(), TraceError> {
        self.write_bytes(&[TAG_RESET])
    }

    fn write_commands(&mut self, words: &[u64]) -> Result<(), TraceError> {
        // The count field is 32 bits wide; oversized batches span several records.
        for chunk in words.chunks(u32::MAX as usize) {
            let mut record = Vec::with_capacity(5 + chunk.len() * 8);
            record.push(TAG_COMMANDS);
            record.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
            for word in chunk {
                record.extend_from_slice(&word.to_le_bytes());
            }
            self.write_bytes(&record)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TraceError> {
        let Some(mut trace) = self.current.take() else {
            return Ok(());
        };
        trace.writer.flush().map_err(|source| TraceError::Io {
            path: trace.path.clone(),
            source,
        })?;
        log::debug!("FileTraceWriter: Closed '{}'", trace.path.display());
        Ok(())
    }
}

impl Drop for FileTraceWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("FileTraceWriter: Flush on drop failed: {e}");
        }
    }
}
