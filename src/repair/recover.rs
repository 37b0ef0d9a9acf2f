// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Scan, then regenerate the full metadata set of every broken package into a staging tree
//! laid out like the VDB (`<output>/<category>/<pf>/`).

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::{write_needed, RepairError, Repairer, StagingArea, StagingError};
use crate::inspect::{Inspector, ObjectKind};
use crate::metadata::{ElfMetadata, MetadataFile, SonameDeps};
use crate::scan::{BrokenPackage, ScanError, ScanReport, Scanner};
use crate::vdb::Cpv;

pub type RecoverResult<T> = std::result::Result<T, RecoverError>;

#[derive(Debug, Error)]
pub enum RecoverError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to regenerate metadata for {cpv}")]
    Repair {
        cpv: Cpv,
        #[source]
        source: RepairError,
    },
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("{cpv} installs shared libraries but no PROVIDES was generated")]
    NoProvidesGenerated { cpv: Cpv },
}

/// Metadata written for one broken package.
#[derive(Debug, Clone)]
pub struct RecoveredPackage {
    pub cpv: Cpv,
    pub dir: PathBuf,
    pub records: usize,
    pub written: Vec<MetadataFile>,
    pub installs_shared_object: bool,
}

#[derive(Debug, Clone)]
pub struct RecoverOutcome {
    pub report: ScanReport,
    pub output: PathBuf,
    pub packages: Vec<RecoveredPackage>,
}

impl RecoverOutcome {
    /// Whether any broken package installs a shared library. If none does, re-emerging the
    /// broken packages is enough; nothing else links against them.
    #[must_use]
    pub fn libraries_affected(&self) -> bool {
        self.packages.iter().any(|p| p.installs_shared_object)
            || self.report.broken.iter().any(BrokenPackage::installs_shared_object)
    }
}

/// Scan the database and write regenerated `NEEDED`, `NEEDED.ELF.2`, `PROVIDES` and
/// `REQUIRES` for every broken package below `output`.
///
/// # Errors
/// Returns an error if the scan fails, an object cannot be inspected, the output cannot be
/// written, or a package with shared libraries yields no `PROVIDES`.
pub fn recover<I: Inspector>(scanner: &Scanner<'_, I>, output: &Path) -> RecoverResult<RecoverOutcome> {
    let report = scanner.scan()?;
    let repairer = Repairer::new(scanner.inspector());
    let mut packages = Vec::new();
    for broken in &report.broken {
        if let Some(recovered) = recover_package(scanner, &repairer, &broken.package, output)? {
            packages.push(recovered);
        }
    }
    info!(
        "Recover completed: output={}, broken={}, written={}",
        output.display(),
        report.broken.len(),
        packages.len()
    );
    Ok(RecoverOutcome {
        report,
        output: output.to_path_buf(),
        packages,
    })
}

fn recover_package<I: Inspector>(
    scanner: &Scanner<'_, I>,
    repairer: &Repairer<&I>,
    cpv: &Cpv,
    output: &Path,
) -> RecoverResult<Option<RecoveredPackage>> {
    info!("Fixing package metadata: package={cpv}");
    let package = scanner.vdb().package(cpv);
    let objects = scanner.elf_objects(&package)?;
    let installs_shared_object = objects.iter().any(|o| o.kind == ObjectKind::SharedObject);
    let on_disk: Vec<PathBuf> = objects.iter().map(|o| o.on_disk.clone()).collect();

    let root = &scanner.options().root;
    let records: Vec<ElfMetadata> = repairer
        .regenerate(&on_disk)
        .map_err(|e| RecoverError::Repair {
            cpv: cpv.clone(),
            source: e,
        })?
        .into_iter()
        .map(|record| record.relative_to(root))
        .collect();
    if records.is_empty() {
        warn!("Nothing to fix, no ELF records: package={cpv}");
        return Ok(None);
    }

    let staging = StagingArea::create(output.join(cpv.category()).join(cpv.pf()))?;
    write_needed(&staging, &records, |staging, file, lines| {
        staging.write(file, &render_lines(lines))
    })?;
    let mut written = vec![MetadataFile::Needed, MetadataFile::NeededElf2];

    let mut deps = SonameDeps::new();
    for record in records.iter().cloned() {
        deps.add(record);
    }
    let provides = deps.provides();
    if provides.is_empty() {
        if installs_shared_object {
            return Err(RecoverError::NoProvidesGenerated { cpv: cpv.clone() });
        }
    } else {
        staging.write(MetadataFile::Provides, &provides)?;
        written.push(MetadataFile::Provides);
    }
    let requires = deps.requires();
    if !requires.is_empty() {
        staging.write(MetadataFile::Requires, &requires)?;
        written.push(MetadataFile::Requires);
    }

    info!(
        "Generated package metadata: package={}, dir={}, records={}",
        cpv,
        staging.dir().display(),
        records.len()
    );
    Ok(Some(RecoveredPackage {
        cpv: cpv.clone(),
        dir: staging.dir().to_path_buf(),
        records: records.len(),
        written,
        installs_shared_object,
    }))
}

fn render_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}
