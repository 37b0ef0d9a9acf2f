// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Output directory that receives regenerated metadata files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::metadata::MetadataFile;

pub type StagingResult<T> = std::result::Result<T, StagingError>;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to create staging directory: {path:?}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write staging file: {path:?}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Create `dir` (and its parents) if needed.
    ///
    /// # Errors
    /// Returns `CreateFailed` if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> StagingResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StagingError::CreateFailed {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_of(&self, file: MetadataFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    /// Append `lines` to `file`, one per line. Existing content is never truncated.
    ///
    /// # Errors
    /// Returns `WriteFailed` if the file cannot be opened or written.
    pub fn append(&self, file: MetadataFile, lines: &[String]) -> StagingResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let path = self.path_of(file);
        let write_failed = |source| StagingError::WriteFailed {
            path: path.clone(),
            source,
        };
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_failed)?;
        let mut buffer = String::new();
        for line in lines {
            buffer.push_str(line);
            buffer.push('\n');
        }
        handle.write_all(buffer.as_bytes()).map_err(write_failed)?;
        debug!("Appended to staging file: file={}, lines={}", path.display(), lines.len());
        Ok(())
    }

    /// Replace `file` with `content`.
    ///
    /// # Errors
    /// Returns `WriteFailed` if the file cannot be written.
    pub fn write(&self, file: MetadataFile, content: &str) -> StagingResult<()> {
        let path = self.path_of(file);
        fs::write(&path, content).map_err(|e| StagingError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;
        debug!("Wrote staging file: file={}", path.display());
        Ok(())
    }
}
