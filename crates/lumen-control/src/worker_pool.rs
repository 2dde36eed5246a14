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

//! Lifecycle control of the parallel worker pool.

use lumen_core::{WorkerPool, WorkerTask};

/// What [`WorkerPoolController::reconcile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolAction {
    /// The committed mode already matched.
    None,
    /// The pool was torn down and, if parallel, started again.
    Rebuild,
}

/// Observable state of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// No workers; rendering runs serially.
    Stopped,
    /// Rendering is dispatched to this many workers.
    Running(usize),
}

/// Exclusive owner of the worker pool.
///
/// Keeps the committed `(parallel, num_workers)` pair and rebuilds the pool
/// whenever it changes. Only call mutating methods between command batches.
pub struct WorkerPoolController {
    pool: Box<dyn WorkerPool>,
    parallel: bool,
    num_workers: u32,
}

impl WorkerPoolController {
    /// Wraps a stopped pool. The committed mode starts out serial.
    pub fn new(pool: Box<dyn WorkerPool>) -> Self {
        Self {
            pool,
            parallel: false,
            num_workers: 0,
        }
    }

    /// Commits an initial mode and starts the pool if `parallel`.
    pub fn start(&mut self, parallel: bool, num_workers: u32) {
        self.rebuild(parallel, num_workers);
    }

    /// Brings the pool in line with `(new_parallel, new_n)`.
    pub fn reconcile(&mut self, new_parallel: bool, new_n: u32) -> PoolAction {
        if new_parallel == self.parallel && new_n == self.num_workers {
            return PoolAction::None;
        }
        log::info!(
            "WorkerPool: Reconfiguring ({}, {}) -> ({}, {})",
            mode_name(self.parallel),
            self.num_workers,
            mode_name(new_parallel),
            new_n
        );
        self.rebuild(new_parallel, new_n);
        PoolAction::Rebuild
    }

    /// Stops every worker. Safe to call on a stopped pool.
    pub fn shutdown(&mut self) {
        self.pool.stop();
    }

    /// The committed `(parallel, num_workers)` pair.
    pub fn committed(&self) -> (bool, u32) {
        (self.parallel, self.num_workers)
    }

    /// The live state of the pool.
    pub fn state(&self) -> PoolState {
        match self.pool.worker_count() {
            0 => PoolState::Stopped,
            n => PoolState::Running(n),
        }
    }

    /// Runs `task` on every worker, or once inline as worker 0 when stopped.
    pub fn dispatch(&self, task: WorkerTask) {
        if self.pool.worker_count() == 0 {
            task(0);
            return;
        }
        if let Err(e) = self.pool.run(task) {
            log::error!("WorkerPool: Dispatch failed: {e}");
        }
    }

    fn rebuild(&mut self, parallel: bool, num_workers: u32) {
        // Never resize in place.
        self.pool.stop();
        self.parallel = parallel;
        self.num_workers = num_workers;

        if !parallel {
            return;
        }
        match self.pool.start(num_workers) {
            Ok(0) => {
                log::warn!("WorkerPool: Pool started with no workers, running serially");
                self.pool.stop();
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("WorkerPool: Failed to start workers, running serially: {e}");
                self.pool.stop();
            }
        }
    }
}

fn mode_name(parallel: bool) -> &'static str {
    if parallel {
        "parallel"
    } else {
        "serial"
    }
}

impl std::fmt::Debug for WorkerPoolController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPoolController")
            .field("parallel", &self.parallel)
            .field("num_workers", &self.num_workers)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lumen_core::PoolError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub(crate) struct PoolLog {
        pub starts: Vec<u32>,
        pub stops: usize,
        pub running: usize,
        pub fail_start: bool,
    }

    /// A pool that runs tasks inline and records its lifecycle.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct FakePool(pub Arc<Mutex<PoolLog>>);

    impl WorkerPool for FakePool {
        fn start(&mut self, num_workers: u32) -> Result<usize, PoolError> {
            let mut log = self.0.lock().unwrap();
            log.starts.push(num_workers);
            if log.fail_start {
                return Err(PoolError::Disconnected);
            }
            log.running = num_workers as usize;
            Ok(log.running)
        }

        fn stop(&mut self) {
            let mut log = self.0.lock().unwrap();
            log.stops += 1;
            log.running = 0;
        }

        fn worker_count(&self) -> usize {
            self.0.lock().unwrap().running
        }

        fn run(&self, task: WorkerTask) -> Result<(), PoolError> {
            let n = self.worker_count();
            for i in 0..n {
                task(i);
            }
            Ok(())
        }
    }

    fn controller() -> (WorkerPoolController, FakePool) {
        let pool = FakePool::default();
        (WorkerPoolController::new(Box::new(pool.clone())), pool)
    }

    #[test]
    fn test_unchanged_mode_is_noop() {
        let (mut controller, pool) = controller();
        controller.start(true, 4);
        assert_eq!(controller.reconcile(true, 4), PoolAction::None);
        assert_eq!(pool.0.lock().unwrap().starts, vec![4]);
    }

    #[test]
    fn test_worker_count_change_rebuilds() {
        let (mut controller, pool) = controller();
        controller.start(true, 4);
        assert_eq!(controller.reconcile(true, 2), PoolAction::Rebuild);
        assert_eq!(controller.state(), PoolState::Running(2));
        let log = pool.0.lock().unwrap();
        assert_eq!(log.starts, vec![4, 2]);
        // One stop per rebuild, including the initial start.
        assert_eq!(log.stops, 2);
    }

    #[test]
    fn test_switch_to_serial_stops_pool() {
        let (mut controller, _pool) = controller();
        controller.start(true, 4);
        assert_eq!(controller.reconcile(false, 4), PoolAction::Rebuild);
        assert_eq!(controller.state(), PoolState::Stopped);
        assert_eq!(controller.committed(), (false, 4));
    }

    #[test]
    fn test_failed_start_falls_back_to_serial() {
        let (mut controller, pool) = controller();
        pool.0.lock().unwrap().fail_start = true;
        controller.start(true, 8);
        assert_eq!(controller.state(), PoolState::Stopped);
        assert_eq!(controller.committed(), (true, 8));
        // The committed pair matches, so no retry storm.
        assert_eq!(controller.reconcile(true, 8), PoolAction::None);
    }

    #[test]
    fn test_zero_workers_reported_runs_serially() {
        let (mut controller, _pool) = controller();
        controller.start(true, 0);
        assert_eq!(controller.state(), PoolState::Stopped);
    }

    #[test]
    fn test_dispatch_serial_runs_once_inline() {
        let (controller, _pool) = controller();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        controller.dispatch(Arc::new(move |index| {
            assert_eq!(index, 0);
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_parallel_reaches_every_worker() {
        let (mut controller, _pool) = controller();
        controller.start(true, 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        controller.dispatch(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
