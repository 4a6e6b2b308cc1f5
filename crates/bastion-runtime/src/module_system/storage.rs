// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Read-only file access rooted at the anchor directory

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Reasons a storage read fails
#[derive(Debug, Error)]
pub enum StorageError {
    /// The path is not plain or resolves outside of the root
    #[error("{} is outside of the storage root", .0.display())]
    OutsideRoot(PathBuf),

    /// The file is larger than the configured limit
    #[error("{} exceeds {limit} bytes", path.display())]
    TooLarge { path: PathBuf, limit: u64 },

    /// Any other filesystem failure, including OS permission errors
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Read-only view of the filesystem below a root directory.
///
/// Reads are checked after symlink resolution: a path that lexically stays
/// inside the root but points outside it through a link is refused.
#[derive(Debug, Clone)]
pub struct ReadOnlyStorage {
    root: PathBuf,
    max_bytes: u64,
}

impl ReadOnlyStorage {
    /// Open storage rooted at `root`, which should already be absolute
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a UTF-8 file given as a path relative to the root.
    pub fn read_to_string(&self, relative: &Path) -> Result<String, StorageError> {
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::OutsideRoot(relative.to_path_buf()));
        }

        let root = self.root.canonicalize()?;
        let target = root.join(relative).canonicalize()?;
        if !target.starts_with(&root) {
            return Err(StorageError::OutsideRoot(relative.to_path_buf()));
        }

        let file = File::open(&target)?;
        let mut source = String::new();
        // Read one byte past the limit to detect oversized files
        let read = file.take(self.max_bytes + 1).read_to_string(&mut source)?;
        if read as u64 > self.max_bytes {
            return Err(StorageError::TooLarge {
                path: relative.to_path_buf(),
                limit: self.max_bytes,
            });
        }
        Ok(source)
    }
}
