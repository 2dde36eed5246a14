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

//! Interface contracts of the rendering collaborators driven by the core.
//!
//! The core never rasterizes or presents anything itself. It initializes,
//! notifies, and tears down the collaborators below at well-defined points
//! of the host lifecycle.

use crate::config::CoreConfig;

/// The host plugin glue: metadata access and interrupt signalling.
pub trait HostPlugin: Send {
    /// Prepares the plugin for use.
    fn init(&mut self);

    /// Returns the raw ROM header block, if the host exposes one.
    fn rom_header(&self) -> Option<&[u8]>;

    /// Signals the host that a command processor sync boundary was reached.
    fn sync_dp(&mut self);

    /// Releases plugin resources.
    fn close(&mut self);
}

/// The presentation surface.
pub trait Screen: Send {
    /// Opens the surface.
    fn init(&mut self);

    /// Closes the surface.
    fn close(&mut self);
}

/// A view over the emulated machine's shared memory.
pub trait SharedMemory: Send {
    /// Prepares the memory view.
    fn init(&mut self);

    /// Returns the size of the shared memory region in bytes.
    fn size(&self) -> u32;
}

/// The command processor that executes rendering commands.
pub trait CommandProcessor: Send {
    /// Initializes the processor with the active configuration.
    fn init(&mut self, config: &CoreConfig);

    /// Processes pending commands.
    fn update(&mut self);
}

/// The video scanout path.
pub trait Scanout: Send {
    /// Initializes scanout with the active configuration.
    fn init(&mut self, config: &CoreConfig);

    /// Scans out the current frame.
    fn update(&mut self);

    /// Releases scanout resources.
    fn close(&mut self);
}

/// The complete set of rendering collaborators owned by the coordinator.
pub struct Backend {
    /// Host plugin glue.
    pub plugin: Box<dyn HostPlugin>,
    /// Presentation surface.
    pub screen: Box<dyn Screen>,
    /// Shared memory view.
    pub memory: Box<dyn SharedMemory>,
    /// Command processor.
    pub processor: Box<dyn CommandProcessor>,
    /// Video scanout.
    pub scanout: Box<dyn Scanout>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("memory_size", &self.memory.size())
            .finish_non_exhaustive()
    }
}
