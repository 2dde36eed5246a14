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

//! Reads command traces back for offline replay.

use crate::trace_format::{HEADER_LEN, MAGIC, TAG_COMMANDS, TAG_RESET, VERSION};
use lumen_core::TraceError;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// One record of a trace stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceRecord {
    /// Replay must reset its state here.
    Reset,
    /// A batch of raw command words.
    Commands(Vec<u64>),
}

/// Sequential reader over a trace file.
#[derive(Debug)]
pub struct TraceReader<R: Read = BufReader<File>> {
    source: R,
    path: PathBuf,
    shared_memory_size: u32,
}

impl TraceReader {
    /// Opens the trace at `path` and validates its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }
}

impl<R: Read> TraceReader<R> {
    /// Wraps an arbitrary byte source. `path` is only used in error messages.
    pub fn from_reader(mut source: R, path: impl Into<PathBuf>) -> Result<Self, TraceError> {
        let path = path.into();
        let mut header = [0u8; HEADER_LEN];
        source.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => TraceError::InvalidHeader("file too short".to_string()),
            _ => TraceError::Io {
                path: path.clone(),
                source: e,
            },
        })?;

        if &header[..MAGIC.len()] != MAGIC {
            return Err(TraceError::InvalidHeader("bad magic".to_string()));
        }
        let version = u16::from_le_bytes([header[8], header[9]]);
        if version != VERSION {
            return Err(TraceError::InvalidHeader(format!(
                "unsupported version {version}"
            )));
        }
        let shared_memory_size =
            u32::from_le_bytes([header[10], header[11], header[12], header[13]]);

        Ok(Self {
            source,
            path,
            shared_memory_size,
        })
    }

    /// Shared memory size recorded in the header.
    pub fn shared_memory_size(&self) -> u32 {
        self.shared_memory_size
    }

    /// Reads the next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        let mut tag = [0u8; 1];
        match self.source.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(source) => return Err(self.io_error(source)),
        }

        match tag[0] {
            TAG_RESET => Ok(Some(TraceRecord::Reset)),
            TAG_COMMANDS => {
                let mut count = [0u8; 4];
                self.read_exact(&mut count)?;
                let count = u32::from_le_bytes(count) as usize;
                let mut words = Vec::with_capacity(count.min(4096));
                let mut word = [0u8; 8];
                for _ in 0..count {
                    self.read_exact(&mut word)?;
                    words.push(u64::from_le_bytes(word));
                }
                Ok(Some(TraceRecord::Commands(words)))
            }
            other => Err(TraceError::UnknownRecord(other)),
        }
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> Result<Vec<TraceRecord>, TraceError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TraceError> {
        self.source
            .read_exact(buf)
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> TraceError {
        TraceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(size: u32) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes
    }

    #[test]
    fn test_reads_records() {
        let mut bytes = header(4096);
        bytes.push(TAG_RESET);
        bytes.push(TAG_COMMANDS);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0xdead_beefu64.to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());

        let mut reader = TraceReader::from_reader(Cursor::new(bytes), "mem").unwrap();
        assert_eq!(reader.shared_memory_size(), 4096);
        assert_eq!(
            reader.read_all().unwrap(),
            vec![
                TraceRecord::Reset,
                TraceRecord::Commands(vec![0xdead_beef, 7])
            ]
        );
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = header(0);
        bytes[0] = b'X';
        let err = TraceReader::from_reader(Cursor::new(bytes), "mem").unwrap_err();
        assert!(matches!(err, TraceError::InvalidHeader(_)));
    }

    #[test]
    fn test_rejects_short_file() {
        let err = TraceReader::from_reader(Cursor::new(b"LMN".to_vec()), "mem").unwrap_err();
        assert!(matches!(err, TraceError::InvalidHeader(_)));
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let mut bytes = header(0);
        bytes.push(0x7f);
        let mut reader = TraceReader::from_reader(Cursor::new(bytes), "mem").unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(TraceError::UnknownRecord(0x7f))
        ));
    }

    #[test]
    fn test_truncated_batch_is_an_error() {
        let mut bytes = header(0);
        bytes.push(TAG_COMMANDS);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        let mut reader = TraceReader::from_reader(Cursor::new(bytes), "mem").unwrap();
        assert!(matches!(reader.next_record(), Err(TraceError::Io { .. })));
    }
}
