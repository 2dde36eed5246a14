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

//! Defines the error types shared by the core and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// An error raised by a trace sink or reader.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The underlying file could not be created, written, or read.
    #[error("Trace I/O error on '{}': {source}", .path.display())]
    Io {
        /// The trace file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A write was attempted while no trace file is open.
    #[error("No trace file is open")]
    NotOpen,
    /// An open was attempted while another trace file is still open.
    #[error("A trace file is already open at '{}'", .0.display())]
    AlreadyOpen(PathBuf),
    /// The file does not start with a valid trace header.
    #[error("Invalid trace header: {0}")]
    InvalidHeader(String),
    /// The stream contains a record tag this reader does not know.
    #[error("Unknown trace record tag 0x{0:02x}")]
    UnknownRecord(u8),
}

/// An error raised while generating an indexed output path.
#[derive(Debug, Error)]
pub enum PathError {
    /// Every index up to the maximum is already taken.
    #[error("No free index left for '{stem}' in '{}'", .directory.display())]
    IndexExhausted {
        /// The directory that was searched.
        directory: PathBuf,
        /// The file stem that was requested.
        stem: String,
    },
    /// The directory could not be inspected.
    #[error("Failed to inspect '{}': {source}", .path.display())]
    Io {
        /// The path being inspected.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// An error raised by a worker pool implementation.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker thread could not be spawned.
    #[error("Failed to spawn worker {index}: {source}")]
    Spawn {
        /// Index of the worker that failed to start.
        index: usize,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A worker exited without acknowledging its task.
    #[error("Worker pool channel disconnected")]
    Disconnected,
}
