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

//! Traits for trace recording and trace output paths.

use crate::error::{PathError, TraceError};
use std::path::{Path, PathBuf};

/// File extension used for command traces.
pub const TRACE_EXTENSION: &str = "dpt";

/// A destination for recorded rendering commands.
///
/// Implementations live outside the core (see `lumen-io`). The core only
/// opens, closes, and frames the stream; the record layout belongs to the sink.
pub trait TraceSink: Send {
    /// Opens a new trace at `path`.
    fn open(&mut self, path: &Path) -> Result<(), TraceError>;

    /// Returns true while a trace is open.
    fn is_open(&self) -> bool;

    /// Writes the stream header describing the shared memory size.
    fn write_header(&mut self, shared_memory_size: u32) -> Result<(), TraceError>;

    /// Writes a reset marker. Replay starts from a clean state at this point.
    fn write_reset(&mut self) -> Result<(), TraceError>;

    /// Appends a batch of raw command words.
    fn write_commands(&mut self, words: &[u64]) -> Result<(), TraceError>;

    /// Flushes and closes the trace. Closing a closed sink is a no-op.
    fn close(&mut self) -> Result<(), TraceError>;
}

/// Generates collision-free, indexed output paths.
pub trait PathGenerator: Send {
    /// Returns `<directory>/<stem>_<index>.<extension>` for the first index,
    /// starting at `*index`, whose path is not taken yet.
    ///
    /// On success `*index` is left one past the index that was used, so the
    /// next call continues from there.
    fn indexed_path(
        &self,
        directory: &Path,
        stem: &str,
        extension: &str,
        index: &mut u32,
    ) -> Result<PathBuf, PathError>;
}
