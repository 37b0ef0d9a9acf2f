// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Shared fixtures: a package database built in a temporary directory and a map-backed
//! inspector.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vdb_recover::inspect::{InspectError, InspectResult};
use vdb_recover::{ElfMetadata, Inspector, MetadataFile, ObjectKind, Vdb};

pub struct TestVdb {
    temp: TempDir,
}

impl TestVdb {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Add `category/pf` with one `obj` line per path and empty metadata `files`.
    pub fn package(&self, cpv: &str, objects: &[&str], files: &[MetadataFile]) -> &Self {
        let dir = self.temp.path().join(cpv);
        fs::create_dir_all(&dir).unwrap();
        let contents: String = objects
            .iter()
            .map(|object| format!("obj {object} d41d8cd98f00b204e9800998ecf8427e 1700000000\n"))
            .collect();
        fs::write(dir.join("CONTENTS"), contents).unwrap();
        for file in files {
            fs::write(dir.join(file.file_name()), "").unwrap();
        }
        self
    }

    pub fn open(&self) -> Vdb {
        Vdb::open(self.temp.path()).unwrap()
    }
}

pub fn record(object: &str, soname: &str, needed: &[&str]) -> ElfMetadata {
    ElfMetadata {
        arch: "EM_X86_64".to_string(),
        object: PathBuf::from(object),
        soname: soname.to_string(),
        rpath: String::new(),
        needed: needed.iter().map(ToString::to_string).collect(),
    }
}

#[derive(Default)]
pub struct MapInspector {
    kinds: HashMap<PathBuf, ObjectKind>,
    records: HashMap<PathBuf, ElfMetadata>,
    unclassifiable: Vec<PathBuf>,
}

impl MapInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared_object(mut self, meta: ElfMetadata) -> Self {
        self.kinds.insert(meta.object.clone(), ObjectKind::SharedObject);
        self.records.insert(meta.object.clone(), meta);
        self
    }

    pub fn executable(mut self, meta: ElfMetadata) -> Self {
        self.kinds.insert(meta.object.clone(), ObjectKind::DynamicExecutable);
        self.records.insert(meta.object.clone(), meta);
        self
    }

    /// Make `classify` fail for `path` the way an empty `file` description does.
    pub fn unclassifiable(mut self, path: &str) -> Self {
        self.unclassifiable.push(PathBuf::from(path));
        self
    }
}

impl Inspector for MapInspector {
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind> {
        if self.unclassifiable.iter().any(|p| p == path) {
            return Err(InspectError::EmptyClassification {
                path: path.to_path_buf(),
            });
        }
        Ok(self.kinds.get(path).copied().unwrap_or(ObjectKind::Other))
    }

    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>> {
        Ok(paths
            .iter()
            .filter_map(|p| self.records.get(p).cloned())
            .collect())
    }
}
