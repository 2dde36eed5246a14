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

//! On-disk layout of a command trace.
//!
//! | Field | Size | Notes |
//! |---|---|---|
//! | magic | 8 | `LMNTRACE` |
//! | version | 2 | little-endian |
//! | shared memory size | 4 | little-endian |
//!
//! The header is followed by tagged records until end of file. All integers
//! are little-endian.

/// Magic bytes at the start of every trace.
pub const MAGIC: &[u8; 8] = b"LMNTRACE";

/// Current format version.
pub const VERSION: u16 = 1;

/// Total header length in bytes.
pub const HEADER_LEN: usize = MAGIC.len() + 2 + 4;

/// Record tag for a reset marker (no payload).
pub const TAG_RESET: u8 = 0x01;

/// Record tag for a command batch: `count: u32`, then `count` words of `u64`.
pub const TAG_COMMANDS: u8 = 0x02;
