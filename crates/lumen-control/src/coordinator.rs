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

//! The configuration coordinator: the single place where configuration,
//! trace sessions, and the worker pool change state.

use crate::trace_session::{RecordOutcome, TraceSessionManager, TraceTransition};
use crate::worker_pool::{PoolAction, PoolState, WorkerPoolController};
use lumen_core::{Backend, CoreConfig, PathGenerator, TraceSink, WorkerPool, WorkerTask};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// A cloneable handle for staging configuration updates from any thread.
///
/// The slot holds at most one configuration: the last write wins and the
/// next sync consumes it exactly once.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    slot: Arc<Mutex<Option<CoreConfig>>>,
}

impl ConfigHandle {
    /// Stages `config` for the next sync, replacing anything staged before.
    pub fn request_update(&self, config: CoreConfig) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.replace(config).is_some() {
            log::debug!("Coordinator: Superseded a pending configuration");
        }
    }

    /// Returns true if a configuration is waiting for the next sync.
    pub fn has_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn take(&self) -> Option<CoreConfig> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Lifecycle state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Constructed, `init` not called yet.
    Uninit,
    /// Initialized and accepting syncs.
    Ready,
    /// Closed. Terminal.
    Closed,
}

/// What a single [`Coordinator::sync`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// A pending configuration was promoted to active.
    pub applied: bool,
    /// The trace session transition, if any.
    pub trace: TraceTransition,
    /// The worker pool action.
    pub pool: PoolAction,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            applied: false,
            trace: TraceTransition::Unchanged,
            pool: PoolAction::None,
        }
    }
}

/// Owns the active and pending configuration and every stateful subsystem
/// that depends on it.
///
/// Host entry points never fail. Problems are logged and the coordinator
/// degrades: tracing turns off, the pool falls back to serial.
pub struct Coordinator {
    backend: Backend,
    traces: TraceSessionManager,
    pool: WorkerPoolController,
    active: CoreConfig,
    pending: ConfigHandle,
    state: CoordinatorState,
    /// Set when trace and pool transitions must be evaluated at the next sync
    /// even without a pending configuration.
    transitions_due: bool,
}

impl Coordinator {
    /// Creates an uninitialized coordinator around its collaborators.
    pub fn new(
        backend: Backend,
        trace_sink: Box<dyn TraceSink>,
        trace_paths: Box<dyn PathGenerator>,
        pool: Box<dyn WorkerPool>,
    ) -> Self {
        Self {
            backend,
            traces: TraceSessionManager::new(trace_sink, trace_paths),
            pool: WorkerPoolController::new(pool),
            active: CoreConfig::default(),
            pending: ConfigHandle::default(),
            state: CoordinatorState::Uninit,
            transitions_due: false,
        }
    }

    /// Makes `config` active, initializes the collaborators, and starts the
    /// pool if parallel. Only the first call has an effect.
    pub fn init(&mut self, config: CoreConfig) {
        if self.state != CoordinatorState::Uninit {
            log::warn!("Coordinator: init called in state {:?}, ignored", self.state);
            return;
        }
        self.active = config;

        self.backend.screen.init();
        self.backend.plugin.init();
        self.backend.memory.init();
        self.backend.processor.init(&self.active);
        self.backend.scanout.init(&self.active);

        self.pool
            .start(self.active.parallel, self.active.num_workers);
        self.traces.reset_index();
        // A trace requested by the initial configuration opens at the first sync.
        self.transitions_due = self.active.dp.trace_record;
        self.state = CoordinatorState::Ready;

        log::info!(
            "Coordinator: Initialized (parallel={}, workers={})",
            self.active.parallel,
            self.active.num_workers
        );
    }

    /// Stages `config` to take effect at the next [`sync`](Self::sync).
    pub fn request_update(&self, config: CoreConfig) {
        self.pending.request_update(config);
    }

    /// Returns a handle other threads can use to stage updates.
    pub fn update_handle(&self) -> ConfigHandle {
        self.pending.clone()
    }

    /// The sync point. Promotes a pending configuration, then drives the
    /// trace session and the worker pool, then signals the host.
    pub fn sync(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        if self.state != CoordinatorState::Ready {
            log::warn!("Coordinator: sync called in state {:?}, ignored", self.state);
            return report;
        }

        if let Some(next) = self.pending.take() {
            self.active = next;
            report.applied = true;
        }

        if report.applied || self.transitions_due {
            self.transitions_due = false;
            report.trace = self.apply_trace_transition();
            report.pool = self
                .pool
                .reconcile(self.active.parallel, self.active.num_workers);
        }

        self.backend.plugin.sync_dp();
        report
    }

    fn apply_trace_transition(&mut self) -> TraceTransition {
        let shared_memory_size = self.backend.memory.size();
        let header = self.backend.plugin.rom_header();
        let mut transition = self
            .traces
            .maybe_open(&self.active, header, shared_memory_size);

        match transition {
            TraceTransition::Opened { .. } => {
                // Tracing requires strictly ordered command emission.
                self.active.parallel = false;
            }
            TraceTransition::Failed => {
                self.active.dp.trace_record = false;
            }
            TraceTransition::Unchanged | TraceTransition::Closed { .. } => {
                transition = self.traces.maybe_close(&self.active);
                if let TraceTransition::Closed { restored_parallel } = transition {
                    self.active.parallel = restored_parallel;
                }
            }
        }

        // An update staged mid-session must not re-enable parallelism.
        if self.traces.is_open() {
            self.active.parallel = false;
        }
        transition
    }

    /// Forwards a command batch to the open trace session, if any.
    ///
    /// A write failure closes the session. The restored parallel mode takes
    /// effect at the next sync.
    pub fn record_commands(&mut self, words: &[u64]) -> bool {
        match self.traces.record_commands(words) {
            RecordOutcome::Recorded => true,
            RecordOutcome::NotRecording => false,
            RecordOutcome::Abandoned { restored_parallel } => {
                self.active.dp.trace_record = false;
                self.active.parallel = restored_parallel;
                self.transitions_due = true;
                false
            }
        }
    }

    /// Runs `task` on the worker pool, or inline when serial.
    pub fn dispatch(&self, task: WorkerTask) {
        self.pool.dispatch(task);
    }

    /// Lets the command processor work through pending commands.
    pub fn dp_update(&mut self) {
        if self.state == CoordinatorState::Ready {
            self.backend.processor.update();
        }
    }

    /// Lets scanout present the current frame.
    pub fn vi_update(&mut self) {
        if self.state == CoordinatorState::Ready {
            self.backend.scanout.update();
        }
    }

    /// Screenshots are not implemented.
    pub fn screenshot(&mut self, directory: &Path) {
        log::debug!(
            "Coordinator: Screenshot to '{}' not supported",
            directory.display()
        );
    }

    /// Stops the pool, releases the collaborators, and closes any trace.
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == CoordinatorState::Closed {
            return;
        }
        self.pool.shutdown();
        if self.state == CoordinatorState::Ready {
            self.backend.scanout.close();
            self.backend.plugin.close();
            self.backend.screen.close();
        }
        self.traces.force_close();
        self.state = CoordinatorState::Closed;
        log::info!("Coordinator: Closed");
    }

    /// The configuration currently in effect.
    pub fn active_config(&self) -> &CoreConfig {
        &self.active
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Returns true while a trace session is open.
    pub fn trace_is_open(&self) -> bool {
        self.traces.is_open()
    }

    /// Path of the open trace, if any.
    pub fn trace_path(&self) -> Option<&Path> {
        self.traces.current_path()
    }

    /// Live state of the worker pool.
    pub fn pool_state(&self) -> PoolState {
        self.pool.state()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("active", &self.active)
            .field("traces", &self.traces)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.close();
    }
}
