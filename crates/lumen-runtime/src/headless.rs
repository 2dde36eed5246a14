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

//! Collaborators for running the core without a host emulator or a window.

use anyhow::{Context as _, Result};
use lumen_core::{Backend, CommandProcessor, CoreConfig, HostPlugin, Scanout, Screen, SharedMemory};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Size of the ROM header block handed to the core.
const ROM_HEADER_LEN: usize = 64;

/// Default shared memory size: 8 MiB with the expansion pak.
const DEFAULT_MEMORY_SIZE: u32 = 0x80_0000;

/// Counters shared between the headless collaborators and the runtime.
#[derive(Debug, Default)]
pub struct HeadlessStats {
    /// Host interrupts signalled by the core.
    pub dp_syncs: AtomicU64,
    /// Command processor updates.
    pub dp_updates: AtomicU64,
    /// Scanout updates.
    pub vi_updates: AtomicU64,
}

/// Reads a ROM header from a big-endian (`.z64`) image and converts it to the
/// word-swapped layout the core expects from the host.
pub fn load_rom_header(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read ROM '{}'", path.display()))?;
    anyhow::ensure!(
        bytes.len() >= ROM_HEADER_LEN,
        "ROM '{}' is shorter than its header",
        path.display()
    );
    let mut header = vec![0u8; ROM_HEADER_LEN];
    for (i, byte) in bytes[..ROM_HEADER_LEN].iter().enumerate() {
        header[lumen_control::sanitizer::byte_addr(i)] = *byte;
    }
    Ok(header)
}

struct HeadlessPlugin {
    header: Option<Vec<u8>>,
    stats: Arc<HeadlessStats>,
}

impl HostPlugin for HeadlessPlugin {
    fn init(&mut self) {
        log::debug!("HeadlessPlugin: init");
    }

    fn rom_header(&self) -> Option<&[u8]> {
        self.header.as_deref()
    }

    fn sync_dp(&mut self) {
        self.stats.dp_syncs.fetch_add(1, Ordering::Relaxed);
    }

    fn close(&mut self) {
        log::debug!("HeadlessPlugin: close");
    }
}

struct HeadlessScreen;

impl Screen for HeadlessScreen {
    fn init(&mut self) {}
    fn close(&mut self) {}
}

struct HeadlessMemory(u32);

impl SharedMemory for HeadlessMemory {
    fn init(&mut self) {}

    fn size(&self) -> u32 {
        self.0
    }
}

struct HeadlessProcessor(Arc<HeadlessStats>);

impl CommandProcessor for HeadlessProcessor {
    fn init(&mut self, config: &CoreConfig) {
        log::debug!("HeadlessProcessor: compat = {}", config.dp.compat);
    }

    fn update(&mut self) {
        self.0.dp_updates.fetch_add(1, Ordering::Relaxed);
    }
}

struct HeadlessScanout(Arc<HeadlessStats>);

impl Scanout for HeadlessScanout {
    fn init(&mut self, config: &CoreConfig) {
        log::debug!("HeadlessScanout: options = {}", config.vi.options);
    }

    fn update(&mut self) {
        self.0.vi_updates.fetch_add(1, Ordering::Relaxed);
    }

    fn close(&mut self) {}
}

/// Builds a backend that only counts what the core asks of it.
pub fn backend(header: Option<Vec<u8>>, stats: Arc<HeadlessStats>) -> Backend {
    Backend {
        plugin: Box::new(HeadlessPlugin {
            header,
            stats: Arc::clone(&stats),
        }),
        screen: Box::new(HeadlessScreen),
        memory: Box::new(HeadlessMemory(DEFAULT_MEMORY_SIZE)),
        processor: Box::new(HeadlessProcessor(Arc::clone(&stats))),
        scanout: Box::new(HeadlessScanout(stats)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_header_is_word_swapped() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("game.z64");
        let mut image = vec![0u8; 128];
        image[32..36].copy_from_slice(b"WAVE");
        std::fs::write(&rom, &image).unwrap();

        let header = load_rom_header(&rom).unwrap();
        let name = lumen_control::sanitizer::derive(Some(&header), 32).unwrap();
        assert_eq!(name.as_str(), "WAVE");
    }

    #[test]
    fn test_truncated_rom_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("short.z64");
        std::fs::write(&rom, [0u8; 16]).unwrap();
        assert!(load_rom_header(&rom).is_err());
    }
}
