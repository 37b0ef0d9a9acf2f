// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Detects packages whose ELF metadata files are missing from the VDB.

use path_clean::PathClean;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::inspect::{InspectError, Inspector, ObjectKind};
use crate::metadata::MetadataFile;
use crate::vdb::{ContentsEntry, Cpv, Exclusions, InstalledPackage, Vdb, VdbError};

/// Files a package installing a shared object must carry.
pub const SHARED_OBJECT_FILES: [MetadataFile; 3] = [
    MetadataFile::Provides,
    MetadataFile::Needed,
    MetadataFile::NeededElf2,
];

/// Files a package installing a dynamically linked executable must carry.
pub const EXECUTABLE_FILES: [MetadataFile; 2] = [MetadataFile::Needed, MetadataFile::NeededElf2];

pub type ScanResult<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Vdb(#[from] VdbError),
    #[error("Failed to inspect objects of {cpv}")]
    Inspect {
        cpv: Cpv,
        #[source]
        source: InspectError,
    },
}

/// How strictly metadata presence is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPolicy {
    /// Shared objects need PROVIDES, NEEDED and NEEDED.ELF.2; dynamic executables need
    /// NEEDED and NEEDED.ELF.2.
    #[default]
    Strict,
    /// Legacy check: any one metadata file is enough, executables are ignored.
    Loose,
}

/// Why a package was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakReason {
    SharedObjectMissing {
        object: PathBuf,
        missing: Vec<MetadataFile>,
    },
    ExecutableMissing {
        object: PathBuf,
        missing: Vec<MetadataFile>,
    },
}

impl BreakReason {
    #[must_use]
    pub fn object(&self) -> &Path {
        match self {
            Self::SharedObjectMissing { object, .. } | Self::ExecutableMissing { object, .. } => object,
        }
    }

    #[must_use]
    pub fn missing(&self) -> &[MetadataFile] {
        match self {
            Self::SharedObjectMissing { missing, .. } | Self::ExecutableMissing { missing, .. } => {
                missing
            }
        }
    }
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::SharedObjectMissing { .. } => "shared object",
            Self::ExecutableMissing { .. } => "dynamically linked executable",
        };
        let missing: Vec<&str> = self.missing().iter().map(|m| m.file_name()).collect();
        write!(
            f,
            "{what} {} installed without {}",
            self.object().display(),
            missing.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenPackage {
    pub package: Cpv,
    pub reason: BreakReason,
}

impl BrokenPackage {
    #[must_use]
    pub fn installs_shared_object(&self) -> bool {
        matches!(self.reason, BreakReason::SharedObjectMissing { .. })
    }
}

/// Outcome of a full database scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub vdb: PathBuf,
    pub policy: DetectionPolicy,
    pub scanned: usize,
    pub broken: Vec<BrokenPackage>,
}

impl ScanReport {
    /// Package manager atoms (`=category/pf`) of the broken packages, in scan order.
    pub fn atoms(&self) -> impl Iterator<Item = String> + '_ {
        self.broken.iter().map(|b| b.package.atom())
    }
}

/// Scan settings.
#[derive(Debug)]
pub struct ScanOptions {
    pub policy: DetectionPolicy,
    /// Inspect every `obj` entry instead of only `.so`-like names and `bin` directories.
    pub deep: bool,
    /// Installation root the `CONTENTS` paths are relative to.
    pub root: PathBuf,
    pub exclusions: Exclusions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::default(),
            deep: false,
            root: PathBuf::from("/"),
            exclusions: Exclusions::empty(),
        }
    }
}

/// An installed ELF object that matters for dynamic linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfObject {
    /// Path as recorded in `CONTENTS`.
    pub installed: PathBuf,
    /// Path on the inspected filesystem (`installed` below the scan root).
    pub on_disk: PathBuf,
    pub kind: ObjectKind,
}

pub struct Scanner<'a, I: Inspector> {
    vdb: &'a Vdb,
    inspector: I,
    options: ScanOptions,
}

impl<'a, I: Inspector> Scanner<'a, I> {
    pub fn new(vdb: &'a Vdb, inspector: I, options: ScanOptions) -> Self {
        Self {
            vdb,
            inspector,
            options,
        }
    }

    #[must_use]
    pub fn vdb(&self) -> &Vdb {
        self.vdb
    }

    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    #[must_use]
    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    /// Check every package in the database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be read or an object cannot be inspected.
    pub fn scan(&self) -> ScanResult<ScanReport> {
        let mut scanned = 0;
        let mut broken = Vec::new();
        for package in self.vdb.packages()? {
            if self.options.exclusions.excludes_package(package.cpv()) {
                debug!("Excluded package: package={}", package.cpv());
                continue;
            }
            scanned += 1;
            if let Some(reason) = self.check(&package)? {
                info!("Package is broken: package={}, reason={}", package.cpv(), reason);
                broken.push(BrokenPackage {
                    package: package.cpv().clone(),
                    reason,
                });
            }
        }
        info!("Scan completed: scanned={}, broken={}", scanned, broken.len());
        Ok(ScanReport {
            vdb: self.vdb.root().to_path_buf(),
            policy: self.options.policy,
            scanned,
            broken,
        })
    }

    /// Check a single package. `Ok(None)` means its metadata is complete.
    ///
    /// # Errors
    /// Returns an error if `CONTENTS` cannot be read or an object cannot be inspected.
    pub fn check(&self, package: &InstalledPackage) -> ScanResult<Option<BreakReason>> {
        let missing = package.missing(&SHARED_OBJECT_FILES);
        let complete = match self.options.policy {
            DetectionPolicy::Strict => missing.is_empty(),
            DetectionPolicy::Loose => missing.len() < SHARED_OBJECT_FILES.len(),
        };
        if complete {
            debug!("Metadata present, skipping: package={}", package.cpv());
            return Ok(None);
        }

        for entry in self.candidates(package)? {
            let kind = self.classify(package, entry.path())?;
            match (kind, self.options.policy) {
                (ObjectKind::SharedObject, _) => {
                    return Ok(Some(BreakReason::SharedObjectMissing {
                        object: entry.path().to_path_buf(),
                        missing,
                    }));
                }
                (ObjectKind::DynamicExecutable, DetectionPolicy::Strict) => {
                    let missing = package.missing(&EXECUTABLE_FILES);
                    if !missing.is_empty() {
                        return Ok(Some(BreakReason::ExecutableMissing {
                            object: entry.path().to_path_buf(),
                            missing,
                        }));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Every candidate object of the package that classifies as a shared object or a
    /// dynamically linked executable.
    ///
    /// # Errors
    /// Returns an error if `CONTENTS` cannot be read or an object cannot be inspected.
    pub fn elf_objects(&self, package: &InstalledPackage) -> ScanResult<Vec<ElfObject>> {
        let mut objects = Vec::new();
        for entry in self.candidates(package)? {
            let kind = self.classify(package, entry.path())?;
            if kind.is_elf_dynamic() {
                objects.push(ElfObject {
                    installed: entry.path().to_path_buf(),
                    on_disk: self.on_disk(entry.path()),
                    kind,
                });
            }
        }
        Ok(objects)
    }

    /// Map an installed path onto the scanned filesystem.
    #[must_use]
    pub fn on_disk(&self, installed: &Path) -> PathBuf {
        let relative = installed.strip_prefix("/").unwrap_or(installed);
        self.options.root.join(relative).clean()
    }

    fn candidates(&self, package: &InstalledPackage) -> ScanResult<Vec<ContentsEntry>> {
        let deep = self.options.deep;
        Ok(package
            .contents()?
            .into_iter()
            .filter(|entry| entry.is_candidate(deep))
            .filter(|entry| !self.options.exclusions.excludes_path(entry.path()))
            .collect())
    }

    fn classify(&self, package: &InstalledPackage, installed: &Path) -> ScanResult<ObjectKind> {
        self.inspector
            .classify(&self.on_disk(installed))
            .map_err(|e| ScanError::Inspect {
                cpv: package.cpv().clone(),
                source: e,
            })
    }
}
