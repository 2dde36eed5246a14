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

//! A [`WorkerPool`] backed by OS threads.

use crossbeam_channel::{Receiver, Sender};
use lumen_core::{PoolError, WorkerPool, WorkerTask};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

enum Message {
    Run(WorkerTask),
    Shutdown,
}

struct Worker {
    tx: Sender<Message>,
    handle: Option<thread::JoinHandle<()>>,
}

/// A fixed-size set of worker threads.
///
/// Every [`run`](WorkerPool::run) hands the same task to all workers and waits
/// for each of them to acknowledge, so no work is in flight once it returns.
pub struct ThreadWorkerPool {
    workers: Vec<Worker>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl ThreadWorkerPool {
    /// Creates a stopped pool.
    pub fn new() -> Self {
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        Self {
            workers: Vec::new(),
            done_tx,
            done_rx,
        }
    }

    /// Resolves a requested worker count. Zero means one per available CPU.
    pub fn resolve_worker_count(requested: u32) -> usize {
        if requested > 0 {
            return requested as usize;
        }
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn spawn_worker(&self, index: usize) -> Result<Worker, PoolError> {
        let (tx, rx) = crossbeam_channel::unbounded::<Message>();
        let done_tx = self.done_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("lumen-worker-{index}"))
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Run(task) => {
                            if panic::catch_unwind(AssertUnwindSafe(|| task(index))).is_err() {
                                log::error!("ThreadWorkerPool: Worker {index} panicked in task");
                            }
                            if done_tx.send(()).is_err() {
                                break;
                            }
                        }
                        Message::Shutdown => break,
                    }
                }
                log::trace!("ThreadWorkerPool: Worker {index} exiting");
            })
            .map_err(|source| PoolError::Spawn { index, source })?;

        Ok(Worker {
            tx,
            handle: Some(handle),
        })
    }
}

impl Default for ThreadWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadWorkerPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl WorkerPool for ThreadWorkerPool {
    fn start(&mut self, num_workers: u32) -> Result<usize, PoolError> {
        self.stop();

        let count = Self::resolve_worker_count(num_workers);
        for index in 0..count {
            match self.spawn_worker(index) {
                Ok(worker) => self.workers.push(worker),
                Err(e) => {
                    self.stop();
                    return Err(e);
                }
            }
        }
        log::info!("ThreadWorkerPool: Started {count} workers");
        Ok(count)
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in &self.workers {
            let _ = worker.tx.send(Message::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        log::info!("ThreadWorkerPool: Stopped {} workers", self.workers.len());
        self.workers.clear();
        // Drop acknowledgements left behind by a failed run.
        while self.done_rx.try_recv().is_ok() {}
    }

    fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn run(&self, task: WorkerTask) -> Result<(), PoolError> {
        let mut dispatched = 0;
        for worker in &self.workers {
            if worker.tx.send(Message::Run(task.clone())).is_err() {
                break;
            }
            dispatched += 1;
        }
        for _ in 0..dispatched {
            self.done_rx.recv().map_err(|_| PoolError::Disconnected)?;
        }
        if dispatched < self.workers.len() {
            return Err(PoolError::Disconnected);
        }
        Ok(())
    }
}

impl Drop for ThreadWorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
