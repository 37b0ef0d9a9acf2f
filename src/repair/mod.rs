// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Regenerates `NEEDED` and `NEEDED.ELF.2` records for installed objects.

mod recover;
mod staging;

pub use recover::{recover, RecoverError, RecoverOutcome, RecoverResult, RecoveredPackage};
pub use staging::{StagingArea, StagingError, StagingResult};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::inspect::{InspectError, Inspector, ObjectKind};
use crate::metadata::{ElfMetadata, MetadataFile};

/// Directory below the output root that receives `repair` results.
pub const BUILD_INFO_DIR: &str = "build-info";

pub type RepairResult<T> = std::result::Result<T, RepairError>;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Staging(#[from] StagingError),
}

pub struct Repairer<I: Inspector> {
    inspector: I,
}

impl<I: Inspector> Repairer<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }

    /// Inspect `objects` in one batch and fill in missing sonames of shared objects with
    /// their file name.
    ///
    /// # Errors
    /// Returns an error if the inspector fails.
    pub fn regenerate(&self, objects: &[PathBuf]) -> RepairResult<Vec<ElfMetadata>> {
        let mut records = self.inspector.inspect_batch(objects)?;
        for record in &mut records {
            if record.soname.is_empty()
                && self.inspector.classify(&record.object)? == ObjectKind::SharedObject
            {
                if let Some(name) = record.object.file_name() {
                    record.soname = name.to_string_lossy().into_owned();
                    debug!(
                        "Using file name as soname: object={}, soname={}",
                        record.object.display(),
                        record.soname
                    );
                }
            }
        }
        Ok(records)
    }

    /// Append regenerated records for `objects` to `<output>/build-info/NEEDED` and
    /// `<output>/build-info/NEEDED.ELF.2`.
    ///
    /// # Errors
    /// Returns an error if the inspector fails or the output cannot be written.
    pub fn repair(&self, output: &Path, objects: &[PathBuf]) -> RepairResult<Vec<ElfMetadata>> {
        let staging = StagingArea::create(output.join(BUILD_INFO_DIR))?;
        let records = self.regenerate(objects)?;
        write_needed(&staging, &records, StagingArea::append)?;
        info!(
            "Repair completed: output={}, objects={}, records={}",
            staging.dir().display(),
            objects.len(),
            records.len()
        );
        Ok(records)
    }
}

type Writer = fn(&StagingArea, MetadataFile, &[String]) -> StagingResult<()>;

fn write_needed(staging: &StagingArea, records: &[ElfMetadata], write: Writer) -> StagingResult<()> {
    let needed: Vec<String> = records.iter().map(ElfMetadata::needed_line).collect();
    let needed_elf2: Vec<String> = records.iter().map(ElfMetadata::needed_elf2_line).collect();
    write(staging, MetadataFile::Needed, &needed)?;
    write(staging, MetadataFile::NeededElf2, &needed_elf2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::fake::FakeInspector;
    use std::fs;
    use tempfile::TempDir;

    fn record(object: &str, soname: &str, needed: &[&str]) -> ElfMetadata {
        ElfMetadata {
            arch: "EM_X86_64".to_string(),
            object: PathBuf::from(object),
            soname: soname.to_string(),
            rpath: String::new(),
            needed: needed.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_repair_writes_build_info() {
        let temp = TempDir::new().unwrap();
        let inspector = FakeInspector::new()
            .with_metadata(record("/usr/lib/libbar.so", "libbar.so", &["libc.so.6"]));
        let repairer = Repairer::new(&inspector);

        repairer
            .repair(temp.path(), &[PathBuf::from("/usr/lib/libbar.so")])
            .unwrap();

        let build_info = temp.path().join("build-info");
        assert_eq!(
            fs::read_to_string(build_info.join("NEEDED")).unwrap(),
            "/usr/lib/libbar.so libc.so.6\n"
        );
        assert_eq!(
            fs::read_to_string(build_info.join("NEEDED.ELF.2")).unwrap(),
            "X86_64;/usr/lib/libbar.so;libbar.so;;libc.so.6\n"
        );
    }

    #[test]
    fn test_repeated_repair_appends() {
        let temp = TempDir::new().unwrap();
        let inspector = FakeInspector::new()
            .with_metadata(record("/usr/bin/foo", "", &["libbar.so", "libc.so.6"]));
        let repairer = Repairer::new(&inspector);
        let objects = [PathBuf::from("/usr/bin/foo")];

        repairer.repair(temp.path(), &objects).unwrap();
        repairer.repair(temp.path(), &objects).unwrap();

        let needed = fs::read_to_string(temp.path().join("build-info/NEEDED")).unwrap();
        assert_eq!(needed.lines().collect::<Vec<_>>(), ["/usr/bin/foo libbar.so,libc.so.6"; 2]);
    }

    #[test]
    fn test_soname_falls_back_to_file_name_for_shared_objects() {
        let inspector = FakeInspector::new()
            .with_metadata(record("/usr/lib/libnoname.so.3", "", &[]))
            .with_metadata(record("/usr/bin/tool", "", &["libc.so.6"]))
            .with_kind("/usr/lib/libnoname.so.3", ObjectKind::SharedObject)
            .with_kind("/usr/bin/tool", ObjectKind::DynamicExecutable);
        let repairer = Repairer::new(&inspector);

        let records = repairer
            .regenerate(&[PathBuf::from("/usr/lib/libnoname.so.3"), PathBuf::from("/usr/bin/tool")])
            .unwrap();
        assert_eq!(records[0].soname, "libnoname.so.3");
        assert_eq!(records[1].soname, "");
    }

    #[test]
    fn test_existing_soname_is_not_classified() {
        let inspector =
            FakeInspector::new().with_metadata(record("/usr/lib/libz.so.1.3", "libz.so.1", &[]));
        let records = Repairer::new(&inspector)
            .regenerate(&[PathBuf::from("/usr/lib/libz.so.1.3")])
            .unwrap();
        assert_eq!(records[0].soname, "libz.so.1");
        assert!(inspector.classified.borrow().is_empty());
    }

    #[test]
    fn test_non_elf_objects_write_nothing() {
        let temp = TempDir::new().unwrap();
        let inspector = FakeInspector::new();
        let records = Repairer::new(&inspector)
            .repair(temp.path(), &[PathBuf::from("/usr/share/doc/README")])
            .unwrap();
        assert!(records.is_empty());
        assert!(temp.path().join("build-info").is_dir());
        assert!(!temp.path().join("build-info/NEEDED").exists());
    }
}
