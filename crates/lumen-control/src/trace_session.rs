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

//! Opens and closes command trace sessions in step with the configuration.

use crate::sanitizer;
use lumen_core::trace::TRACE_EXTENSION;
use lumen_core::{CoreConfig, PathGenerator, TraceError, TraceSink};
use std::path::{Path, PathBuf};

/// Name used for trace files when the ROM header yields no usable name.
pub const FALLBACK_TRACE_NAME: &str = "trace";

/// Capacity handed to the sanitizer when naming trace files.
const NAME_CAPACITY: usize = 32;

/// The observable outcome of a trace session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceTransition {
    /// Nothing to do.
    Unchanged,
    /// A session was opened. The caller must force serial execution and keep
    /// `saved_parallel` for the matching close.
    Opened {
        /// The `parallel` flag in effect before tracing started.
        saved_parallel: bool,
    },
    /// The session was closed. The caller should restore this flag.
    Closed {
        /// The `parallel` flag saved when the session opened.
        restored_parallel: bool,
    },
    /// Opening was requested but failed. Tracing stays off.
    Failed,
}

/// Result of [`TraceSessionManager::record_commands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The batch was written.
    Recorded,
    /// No session is open.
    NotRecording,
    /// The write failed and the session was closed.
    Abandoned {
        /// The `parallel` flag saved when the session opened.
        restored_parallel: bool,
    },
}

#[derive(Debug)]
enum SessionState {
    Closed,
    Open { path: PathBuf, saved_parallel: bool },
}

/// Owns the trace sink and the session index.
///
/// The index starts at zero and only grows for the lifetime of the manager,
/// so successive sessions never overwrite each other.
pub struct TraceSessionManager {
    sink: Box<dyn TraceSink>,
    paths: Box<dyn PathGenerator>,
    state: SessionState,
    index: u32,
}

impl TraceSessionManager {
    /// Creates a manager with no session open.
    pub fn new(sink: Box<dyn TraceSink>, paths: Box<dyn PathGenerator>) -> Self {
        Self {
            sink,
            paths,
            state: SessionState::Closed,
            index: 0,
        }
    }

    /// Returns true while a session is open.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// Path of the open session, if any.
    pub fn current_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Open { path, .. } => Some(path),
            SessionState::Closed => None,
        }
    }

    /// Index the next session will start searching from.
    pub fn next_index(&self) -> u32 {
        self.index
    }

    /// Restarts session numbering at zero.
    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    /// Opens a session if `config` requests tracing and none is open.
    ///
    /// `header` is the raw ROM header used to name the file and
    /// `shared_memory_size` is recorded in the trace header.
    pub fn maybe_open(
        &mut self,
        config: &CoreConfig,
        header: Option<&[u8]>,
        shared_memory_size: u32,
    ) -> TraceTransition {
        if !config.dp.trace_record || self.is_open() {
            return TraceTransition::Unchanged;
        }

        let name = sanitizer::derive(header, NAME_CAPACITY);
        let stem = name
            .as_ref()
            .map_or(FALLBACK_TRACE_NAME, |n| n.as_str());

        let first_index = self.index;
        let path = match self.paths.indexed_path(
            &config.dp.trace_directory,
            stem,
            TRACE_EXTENSION,
            &mut self.index,
        ) {
            Ok(path) => path,
            Err(e) => {
                log::error!("TraceSession: Cannot allocate trace path: {e}");
                return TraceTransition::Failed;
            }
        };

        if let Err(e) = self.start_stream(&path, shared_memory_size) {
            log::error!(
                "TraceSession: Failed to open '{}', tracing disabled: {e}",
                path.display()
            );
            if let Err(e) = self.sink.close() {
                log::warn!("TraceSession: Closing abandoned trace failed: {e}");
            }
            self.index = first_index;
            return TraceTransition::Failed;
        }
        debug_assert!(self.sink.is_open());

        log::info!("TraceSession: Recording to '{}'", path.display());
        let saved_parallel = config.parallel;
        self.state = SessionState::Open {
            path,
            saved_parallel,
        };
        TraceTransition::Opened { saved_parallel }
    }

    /// Closes the session if `config` no longer requests tracing.
    pub fn maybe_close(&mut self, config: &CoreConfig) -> TraceTransition {
        if config.dp.trace_record || !self.is_open() {
            return TraceTransition::Unchanged;
        }
        match self.force_close() {
            Some(restored_parallel) => TraceTransition::Closed { restored_parallel },
            None => TraceTransition::Unchanged,
        }
    }

    /// Closes any open session regardless of configuration and returns the
    /// saved `parallel` flag.
    pub fn force_close(&mut self) -> Option<bool> {
        let SessionState::Open {
            path,
            saved_parallel,
        } = std::mem::replace(&mut self.state, SessionState::Closed)
        else {
            return None;
        };

        match self.sink.close() {
            Ok(()) => log::info!("TraceSession: Closed '{}'", path.display()),
            Err(e) => log::error!(
                "TraceSession: Error while closing '{}': {e}",
                path.display()
            ),
        }
        Some(saved_parallel)
    }

    /// Appends a batch of commands to the open session.
    ///
    /// A write error abandons the session.
    pub fn record_commands(&mut self, words: &[u64]) -> RecordOutcome {
        if !self.is_open() {
            return RecordOutcome::NotRecording;
        }
        match self.sink.write_commands(words) {
            Ok(()) => RecordOutcome::Recorded,
            Err(e) => {
                log::error!("TraceSession: Write failed, abandoning session: {e}");
                RecordOutcome::Abandoned {
                    restored_parallel: self.force_close().unwrap_or(false),
                }
            }
        }
    }

    fn start_stream(&mut self, path: &Path, shared_memory_size: u32) -> Result<(), TraceError> {
        self.sink.open(path)?;
        self.sink.write_header(shared_memory_size)?;
        self.sink.write_reset()
    }
}

impl std::fmt::Debug for TraceSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceSessionManager")
            .field("state", &self.state)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lumen_core::PathError;
    use std::sync::{Arc, Mutex};

    /// Everything a [`MemorySink`] has seen.
    #[derive(Debug, Default)]
    pub(crate) struct SinkLog {
        pub opened: Vec<PathBuf>,
        pub headers: Vec<u32>,
        pub resets: usize,
        pub commands: Vec<Vec<u64>>,
        pub closes: usize,
        pub open: bool,
        pub fail_open: bool,
        pub fail_writes: bool,
    }

    /// An in-memory sink whose log stays inspectable after it is boxed.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct MemorySink(pub Arc<Mutex<SinkLog>>);

    impl TraceSink for MemorySink {
        fn open(&mut self, path: &Path) -> Result<(), TraceError> {
            let mut log = self.0.lock().unwrap();
            if log.fail_open {
                return Err(TraceError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("denied"),
                });
            }
            log.opened.push(path.to_path_buf());
            log.open = true;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.0.lock().unwrap().open
        }

        fn write_header(&mut self, shared_memory_size: u32) -> Result<(), TraceError> {
            self.0.lock().unwrap().headers.push(shared_memory_size);
            Ok(())
        }

        fn write_reset(&mut self) -> Result<(), TraceError> {
            self.0.lock().unwrap().resets += 1;
            Ok(())
        }

        fn write_commands(&mut self, words: &[u64]) -> Result<(), TraceError> {
            let mut log = self.0.lock().unwrap();
            if log.fail_writes {
                return Err(TraceError::NotOpen);
            }
            log.commands.push(words.to_vec());
            Ok(())
        }

        fn close(&mut self) -> Result<(), TraceError> {
            let mut log = self.0.lock().unwrap();
            if log.open {
                log.closes += 1;
            }
            log.open = false;
            Ok(())
        }
    }

    /// A path generator that never touches the filesystem.
    #[derive(Debug, Default)]
    pub(crate) struct FakePaths;

    impl PathGenerator for FakePaths {
        fn indexed_path(
            &self,
            directory: &Path,
            stem: &str,
            extension: &str,
            index: &mut u32,
        ) -> Result<PathBuf, PathError> {
            let path = directory.join(format!("{stem}_{index}.{extension}"));
            *index += 1;
            Ok(path)
        }
    }

    fn manager() -> (TraceSessionManager, MemorySink) {
        let sink = MemorySink::default();
        let manager = TraceSessionManager::new(Box::new(sink.clone()), Box::new(FakePaths));
        (manager, sink)
    }

    fn tracing(parallel: bool) -> CoreConfig {
        let mut config = CoreConfig {
            parallel,
            ..Default::default()
        };
        config.dp.trace_record = true;
        config
    }

    #[test]
    fn test_open_writes_header_and_reset() {
        let (mut manager, sink) = manager();
        let transition = manager.maybe_open(&tracing(true), None, 0x40_0000);

        assert_eq!(
            transition,
            TraceTransition::Opened {
                saved_parallel: true
            }
        );
        assert!(manager.is_open());
        let log = sink.0.lock().unwrap();
        assert_eq!(log.opened, vec![PathBuf::from("./trace_0.dpt")]);
        assert_eq!(log.headers, vec![0x40_0000]);
        assert_eq!(log.resets, 1);
    }

    #[test]
    fn test_open_is_noop_when_not_requested_or_already_open() {
        let (mut manager, sink) = manager();
        assert_eq!(
            manager.maybe_open(&CoreConfig::default(), None, 0),
            TraceTransition::Unchanged
        );
        manager.maybe_open(&tracing(false), None, 0);
        assert_eq!(
            manager.maybe_open(&tracing(false), None, 0),
            TraceTransition::Unchanged
        );
        assert_eq!(sink.0.lock().unwrap().opened.len(), 1);
    }

    #[test]
    fn test_close_restores_saved_flag() {
        let (mut manager, sink) = manager();
        manager.maybe_open(&tracing(true), None, 0);

        assert_eq!(manager.maybe_close(&tracing(false)), TraceTransition::Unchanged);
        let transition = manager.maybe_close(&CoreConfig::default());
        assert_eq!(
            transition,
            TraceTransition::Closed {
                restored_parallel: true
            }
        );
        assert!(!manager.is_open());
        assert_eq!(sink.0.lock().unwrap().closes, 1);
        assert_eq!(
            manager.maybe_close(&CoreConfig::default()),
            TraceTransition::Unchanged
        );
    }

    #[test]
    fn test_index_increments_across_sessions() {
        let (mut manager, sink) = manager();
        manager.maybe_open(&tracing(true), None, 0);
        manager.maybe_close(&CoreConfig::default());
        manager.maybe_open(&tracing(true), None, 0);

        let log = sink.0.lock().unwrap();
        assert_eq!(
            log.opened,
            vec![
                PathBuf::from("./trace_0.dpt"),
                PathBuf::from("./trace_1.dpt")
            ]
        );
        assert_eq!(manager.next_index(), 2);
    }

    #[test]
    fn test_open_failure_leaves_session_closed() {
        let (mut manager, sink) = manager();
        sink.0.lock().unwrap().fail_open = true;

        assert_eq!(
            manager.maybe_open(&tracing(true), None, 0),
            TraceTransition::Failed
        );
        assert!(!manager.is_open());
        assert!(manager.current_path().is_none());
        assert_eq!(manager.next_index(), 0);
    }

    #[test]
    fn test_failed_open_does_not_consume_index() {
        let (mut manager, sink) = manager();
        sink.0.lock().unwrap().fail_open = true;
        manager.maybe_open(&tracing(true), None, 0);

        sink.0.lock().unwrap().fail_open = false;
        manager.maybe_open(&tracing(true), None, 0);
        assert!(sink.is_open());
        assert_eq!(manager.current_path(), Some(Path::new("./trace_0.dpt")));
        assert_eq!(manager.next_index(), 1);
    }

    #[test]
    fn test_write_failure_abandons_session() {
        let (mut manager, sink) = manager();
        manager.maybe_open(&tracing(true), None, 0);
        assert_eq!(manager.record_commands(&[1, 2]), RecordOutcome::Recorded);

        sink.0.lock().unwrap().fail_writes = true;
        assert_eq!(
            manager.record_commands(&[3]),
            RecordOutcome::Abandoned {
                restored_parallel: true
            }
        );
        assert!(!manager.is_open());
        assert_eq!(manager.record_commands(&[4]), RecordOutcome::NotRecording);
        assert_eq!(sink.0.lock().unwrap().commands, vec![vec![1, 2]]);
    }
}
