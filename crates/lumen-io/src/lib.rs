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

//! File-backed I/O services: command trace files and indexed output paths.

#![warn(missing_docs)]

pub mod paths;
pub mod trace_format;
pub mod trace_reader;
pub mod trace_writer;

pub use paths::IndexedPaths;
pub use trace_reader::{TraceReader, TraceRecord};
pub use trace_writer::FileTraceWriter;
