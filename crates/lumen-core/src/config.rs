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

//! The configuration record exchanged between the host and the core.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Command processor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpConfig {
    /// Whether a command trace should be recorded.
    ///
    /// Recording forces serial execution while the session is open.
    pub trace_record: bool,
    /// Directory that receives trace files.
    pub trace_directory: PathBuf,
    /// Rendering tunables, passed through to the command processor untouched.
    pub compat: serde_json::Value,
}

impl Default for DpConfig {
    fn default() -> Self {
        Self {
            trace_record: false,
            trace_directory: PathBuf::from("."),
            compat: serde_json::Value::Null,
        }
    }
}

/// Scanout settings, passed through to the scanout collaborator untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViConfig {
    /// Opaque scanout tunables.
    pub options: serde_json::Value,
}

/// The complete configuration of the core.
///
/// Two instances exist at runtime: the active one, and an optional pending
/// one staged by the host and promoted at the next sync point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Whether rendering work is dispatched to the worker pool.
    pub parallel: bool,
    /// Number of workers in the pool. Zero lets the pool pick one per CPU.
    pub num_workers: u32,
    /// Command processor settings.
    pub dp: DpConfig,
    /// Scanout settings.
    pub vi: ViConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            num_workers: 0,
            dp: DpConfig::default(),
            vi: ViConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parses a configuration from a JSON document. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid core configuration document")
    }

    /// Loads a configuration from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration '{}'", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse configuration '{}'", path.display()))?;
        log::debug!("Loaded core configuration from '{}'", path.display());
        Ok(config)
    }
}
