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

//! Headless host for the Lumen core.
//!
//! Drives `init`, per-frame updates and syncs, scheduled trace toggles, and
//! `close`, then prints a JSON summary of what happened.

mod headless;

use anyhow::{Context as _, Result};
use clap::Parser;
use lumen_control::{Coordinator, PoolAction, PoolState, TraceTransition};
use lumen_core::CoreConfig;
use lumen_infra::ThreadWorkerPool;
use lumen_io::{FileTraceWriter, IndexedPaths};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "lumen-runtime", version, about = "Drive the Lumen core headlessly")]
struct Cli {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ROM image (`.z64`) whose header names trace files.
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Number of frames to run.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Frame at which trace recording is switched on.
    #[arg(long)]
    trace_from: Option<u32>,

    /// Frame at which trace recording is switched off again.
    #[arg(long)]
    trace_until: Option<u32>,

    /// Override the number of workers.
    #[arg(long)]
    workers: Option<u32>,

    /// Force serial execution.
    #[arg(long)]
    serial: bool,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    frames: u32,
    pool_rebuilds: u32,
    traces_opened: u32,
    trace_failures: u32,
    batches_recorded: u64,
    dp_syncs: u64,
    dp_updates: u64,
    vi_updates: u64,
    final_workers: usize,
}

/// Synthetic command words emitted each frame: sync-load, then sync-full.
const FRAME_COMMANDS: [u64; 2] = [0x2600_0000_0000_0000, 0x2900_0000_0000_0000];

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.num_workers = workers;
    }
    if cli.serial {
        config.parallel = false;
    }

    let header = cli
        .rom
        .as_deref()
        .map(headless::load_rom_header)
        .transpose()?;

    let stats = Arc::new(headless::HeadlessStats::default());
    let mut core = Coordinator::new(
        headless::backend(header, Arc::clone(&stats)),
        Box::new(FileTraceWriter::new()),
        Box::new(IndexedPaths::new()),
        Box::new(ThreadWorkerPool::new()),
    );
    core.init(config.clone());

    let mut summary = RunSummary {
        frames: cli.frames,
        ..Default::default()
    };

    for frame in 0..cli.frames {
        if cli.trace_from == Some(frame) || cli.trace_until == Some(frame) {
            let mut next = config.clone();
            next.dp.trace_record = cli.trace_from == Some(frame);
            core.request_update(next);
        }

        core.dp_update();
        core.dispatch(Arc::new(move |worker| {
            log::trace!("frame {frame}: worker {worker} rendering");
        }));
        if core.record_commands(&FRAME_COMMANDS) {
            summary.batches_recorded += 1;
        }
        core.vi_update();

        let report = core.sync();
        if report.pool == PoolAction::Rebuild {
            summary.pool_rebuilds += 1;
        }
        match report.trace {
            TraceTransition::Opened { .. } => summary.traces_opened += 1,
            TraceTransition::Failed => summary.trace_failures += 1,
            TraceTransition::Unchanged | TraceTransition::Closed { .. } => {}
        }
    }

    summary.final_workers = match core.pool_state() {
        PoolState::Stopped => 0,
        PoolState::Running(n) => n,
    };
    core.close();

    summary.dp_syncs = stats.dp_syncs.load(Ordering::Relaxed);
    summary.dp_updates = stats.dp_updates.load(Ordering::Relaxed);
    summary.vi_updates = stats.vi_updates.load(Ordering::Relaxed);

    let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
    println!("{json}");
    Ok(())
}
