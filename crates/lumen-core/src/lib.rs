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

//! # Lumen Core
//!
//! Foundational crate containing the configuration record, the interface
//! contracts of the collaborators driven by the sync-point coordinator, and
//! the shared error types.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod trace;

pub use backend::{Backend, CommandProcessor, HostPlugin, Scanout, Screen, SharedMemory};
pub use config::{CoreConfig, DpConfig, ViConfig};
pub use error::{PathError, PoolError, TraceError};
pub use pool::{WorkerPool, WorkerTask};
pub use trace::{PathGenerator, TraceSink};
