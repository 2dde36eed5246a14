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

//! Collision-free output path generation.

use lumen_core::{PathError, PathGenerator};
use std::path::{Path, PathBuf};

/// Generates `<directory>/<stem>_<index>.<extension>` paths, skipping
/// indices whose file already exists on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedPaths;

impl IndexedPaths {
    /// Creates a new generator.
    pub fn new() -> Self {
        Self
    }
}

impl PathGenerator for IndexedPaths {
    fn indexed_path(
        &self,
        directory: &Path,
        stem: &str,
        extension: &str,
        index: &mut u32,
    ) -> Result<PathBuf, PathError> {
        while *index < u32::MAX {
            let candidate = directory.join(format!("{stem}_{}.{extension}", *index));
            *index += 1;
            let taken = candidate.try_exists().map_err(|source| PathError::Io {
                path: candidate.clone(),
                source,
            })?;
            if !taken {
                return Ok(candidate);
            }
            log::trace!("IndexedPaths: '{}' exists, skipping", candidate.display());
        }

        Err(PathError::IndexExhausted {
            directory: directory.to_path_buf(),
            stem: stem.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_path_uses_starting_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = 0;
        let path = IndexedPaths
            .indexed_path(dir.path(), "GAME", "dpt", &mut index)
            .unwrap();
        assert_eq!(path, dir.path().join("GAME_0.dpt"));
        assert_eq!(index, 1);
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GAME_0.dpt"), b"").unwrap();
        std::fs::write(dir.path().join("GAME_1.dpt"), b"").unwrap();

        let mut index = 0;
        let path = IndexedPaths
            .indexed_path(dir.path(), "GAME", "dpt", &mut index)
            .unwrap();
        assert_eq!(path, dir.path().join("GAME_2.dpt"));
        assert_eq!(index, 3);
    }

    #[test]
    fn test_index_persists_between_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = 5;
        let first = IndexedPaths
            .indexed_path(dir.path(), "trace", "dpt", &mut index)
            .unwrap();
        let second = IndexedPaths
            .indexed_path(dir.path(), "trace", "dpt", &mut index)
            .unwrap();
        assert_eq!(first, dir.path().join("trace_5.dpt"));
        assert_eq!(second, dir.path().join("trace_6.dpt"));
    }

    #[test]
    fn test_exhausted_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = u32::MAX;
        let err = IndexedPaths
            .indexed_path(dir.path(), "trace", "dpt", &mut index)
            .unwrap_err();
        assert!(matches!(err, PathError::IndexExhausted { .. }));
    }
}
