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

//! # Lumen Control
//!
//! Runtime reconfiguration for the renderer. Configuration changes staged by
//! the host are applied at the sync point, where the [`Coordinator`] also
//! opens or closes trace sessions and rebuilds the worker pool.

#![warn(missing_docs)]

pub mod coordinator;
pub mod sanitizer;
pub mod trace_session;
pub mod worker_pool;

pub use coordinator::{ConfigHandle, Coordinator, CoordinatorState, SyncReport};
pub use sanitizer::SanitizedName;
pub use trace_session::{RecordOutcome, TraceSessionManager, TraceTransition};
pub use worker_pool::{PoolAction, PoolState, WorkerPoolController};
