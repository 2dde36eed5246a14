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

//! The worker pool contract.

use crate::error::PoolError;
use std::sync::Arc;

/// A unit of rendering work. Each worker calls it once with its own index.
pub type WorkerTask = Arc<dyn Fn(usize) + Send + Sync>;

/// A parallel execution resource with a fixed number of workers.
///
/// Pools are never resized in place: a change of worker count is a full
/// `stop` followed by a fresh `start`.
pub trait WorkerPool: Send {
    /// Starts `num_workers` workers and returns how many were started.
    ///
    /// A request for zero workers lets the implementation choose a count,
    /// typically one per available CPU.
    fn start(&mut self, num_workers: u32) -> Result<usize, PoolError>;

    /// Stops and joins every worker. Stopping a stopped pool is a no-op.
    fn stop(&mut self);

    /// Returns the number of running workers, zero when stopped.
    fn worker_count(&self) -> usize;

    /// Runs `task` once on every worker and blocks until all of them returned.
    fn run(&self, task: WorkerTask) -> Result<(), PoolError>;
}
