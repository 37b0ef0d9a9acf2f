// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Read-only access to the installed-package database (VDB). Locates the database root,
//! enumerates package records and exposes their `CONTENTS` and metadata files.

mod contents;
mod cpv;
mod exclusions;

pub use contents::{is_shared_object_name, parse_contents, ContentsEntry, EntryKind};
pub use cpv::{Cpv, CpvError};
pub use exclusions::{Exclusions, ExclusionsError};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::command;
use crate::metadata::MetadataFile;

/// Conventional location of the VDB when the package manager cannot be asked.
pub const DEFAULT_VDB_PATH: &str = "/var/db/pkg";

const CONTENTS: &str = "CONTENTS";

pub type VdbResult<T> = std::result::Result<T, VdbError>;

#[derive(Debug, Error)]
pub enum VdbError {
    #[error("Unable to determine the package database root (portageq failed and /var/db/pkg does not exist)")]
    UnresolvedRoot,
    #[error("Package database root is not an accessible directory: {path:?}")]
    NotADirectory {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("Failed to walk package database: {path:?}")]
    WalkFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("{cpv} has no CONTENTS file")]
    MissingContents { cpv: Cpv },
    #[error("Failed to read {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Determine the VDB root.
///
/// An explicit path wins. Otherwise the package manager is asked (`portageq vdb_path`),
/// and finally the conventional `/var/db/pkg` is used if it exists.
///
/// # Errors
/// Returns `UnresolvedRoot` if no candidate is found.
pub fn resolve_root(explicit: Option<&Path>, timeout: Duration) -> VdbResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match query_portageq(timeout) {
        Some(path) => {
            debug!("Package database root from portageq: path={}", path.display());
            Ok(path)
        }
        None if Path::new(DEFAULT_VDB_PATH).is_dir() => Ok(PathBuf::from(DEFAULT_VDB_PATH)),
        None => Err(VdbError::UnresolvedRoot),
    }
}

fn query_portageq(timeout: Duration) -> Option<PathBuf> {
    let output = command::run("portageq", ["vdb_path"], timeout)
        .and_then(|output| output.success("portageq"));
    match output {
        Ok(output) => {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!path.is_empty()).then(|| PathBuf::from(path))
        }
        Err(e) => {
            debug!("portageq unavailable: {e}");
            None
        }
    }
}

/// An opened package database.
#[derive(Debug, Clone)]
pub struct Vdb {
    root: PathBuf,
}

impl Vdb {
    /// Open the database at `root`.
    ///
    /// # Errors
    /// Returns an error if `root` is not a readable directory.
    pub fn open(root: impl Into<PathBuf>) -> VdbResult<Self> {
        let root = root.into();
        match fs::read_dir(&root) {
            Ok(_) => Ok(Self { root }),
            Err(e) => Err(VdbError::NotADirectory {
                path: root,
                source: Some(e),
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All package records, sorted by category then `PF`.
    ///
    /// Virtuals, `acct-*` categories, in-progress merges and lock files are skipped.
    ///
    /// # Errors
    /// Returns an error if the database cannot be walked.
    pub fn packages(&self) -> VdbResult<Vec<InstalledPackage>> {
        let mut packages = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| VdbError::WalkFailed {
                path: self.root.clone(),
                source: e,
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(cpv) = Self::cpv_of(entry.path()) else {
                continue;
            };
            if Self::is_skipped(&cpv) {
                debug!("Skipping package record: package={cpv}");
                continue;
            }
            packages.push(InstalledPackage::new(cpv, entry.into_path()));
        }
        info!(
            "Enumerated package database: root={}, packages={}",
            self.root.display(),
            packages.len()
        );
        Ok(packages)
    }

    /// The record of `cpv`, whether or not it exists.
    #[must_use]
    pub fn package(&self, cpv: &Cpv) -> InstalledPackage {
        let dir = self.root.join(cpv.category()).join(cpv.pf());
        InstalledPackage::new(cpv.clone(), dir)
    }

    fn cpv_of(path: &Path) -> Option<Cpv> {
        let pf = path.file_name()?.to_str()?;
        let category = path.parent()?.file_name()?.to_str()?;
        Some(Cpv::new(category, pf))
    }

    fn is_skipped(cpv: &Cpv) -> bool {
        cpv.category() == "virtual"
            || cpv.category().starts_with("acct-")
            || cpv.pf().starts_with("-MERGING-")
            || cpv.pf().contains(".portage_lockfile")
    }
}

/// One package record in the database.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    cpv: Cpv,
    dir: PathBuf,
}

impl InstalledPackage {
    #[must_use]
    pub fn new(cpv: Cpv, dir: PathBuf) -> Self {
        Self { cpv, dir }
    }

    #[must_use]
    pub fn cpv(&self) -> &Cpv {
        &self.cpv
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the given metadata file is present in the record.
    #[must_use]
    pub fn has(&self, file: MetadataFile) -> bool {
        self.dir.join(file.file_name()).exists()
    }

    /// The metadata files from `required` that are absent, in the given order.
    #[must_use]
    pub fn missing(&self, required: &[MetadataFile]) -> Vec<MetadataFile> {
        required.iter().copied().filter(|f| !self.has(*f)).collect()
    }

    /// Parse the `CONTENTS` manifest.
    ///
    /// # Errors
    /// Returns `MissingContents` if the manifest does not exist, or `ReadFailed` if it cannot be read.
    pub fn contents(&self) -> VdbResult<Vec<ContentsEntry>> {
        let path = self.dir.join(CONTENTS);
        let text = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VdbError::MissingContents {
                    cpv: self.cpv.clone(),
                });
            }
            Err(e) => return Err(VdbError::ReadFailed { path, source: e }),
        };
        Ok(parse_contents(&text))
    }
}
