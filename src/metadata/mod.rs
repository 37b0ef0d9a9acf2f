// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! ELF dynamic-linking metadata records and the VDB file formats they are stored in.

mod soname_deps;

pub use soname_deps::{multilib_category, SonameDeps};

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Per-package metadata files derived from the installed ELF objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MetadataFile {
    #[serde(rename = "PROVIDES")]
    Provides,
    #[serde(rename = "NEEDED")]
    Needed,
    #[serde(rename = "NEEDED.ELF.2")]
    NeededElf2,
    #[serde(rename = "REQUIRES")]
    Requires,
}

impl MetadataFile {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Provides => "PROVIDES",
            Self::Needed => "NEEDED",
            Self::NeededElf2 => "NEEDED.ELF.2",
            Self::Requires => "REQUIRES",
        }
    }
}

impl fmt::Display for MetadataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

// Separator of the needed-library list inside NEEDED and NEEDED.ELF.2.
const NEEDED_SEPARATOR: &str = ",";

/// Dynamic-linking facts about one installed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElfMetadata {
    /// Machine as reported by the inspector, e.g. `EM_X86_64`.
    pub arch: String,
    pub object: PathBuf,
    pub soname: String,
    pub rpath: String,
    pub needed: Vec<String>,
}

impl ElfMetadata {
    /// Machine without the `EM_` prefix, as stored in `NEEDED.ELF.2`.
    #[must_use]
    pub fn short_arch(&self) -> &str {
        self.arch.strip_prefix("EM_").unwrap_or(&self.arch)
    }

    /// `NEEDED` line: `<object> <needed,...>`.
    #[must_use]
    pub fn needed_line(&self) -> String {
        format!(
            "{} {}",
            self.object.display(),
            self.needed.join(NEEDED_SEPARATOR)
        )
    }

    /// `NEEDED.ELF.2` line: `<arch>;<object>;<soname>;<rpath>;<needed,...>`.
    #[must_use]
    pub fn needed_elf2_line(&self) -> String {
        format!(
            "{};{};{};{};{}",
            self.short_arch(),
            self.object.display(),
            self.soname,
            self.rpath,
            self.needed.join(NEEDED_SEPARATOR)
        )
    }

    /// Parse a `NEEDED.ELF.2` line back into a record (the arch gets its `EM_` prefix back).
    #[must_use]
    pub fn parse_needed_elf2(line: &str) -> Option<Self> {
        let mut fields = line.split(';');
        let arch = fields.next()?;
        let object = fields.next()?;
        let soname = fields.next()?;
        let rpath = fields.next()?;
        let needed = fields.next()?;
        if arch.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self {
            arch: format!("EM_{arch}"),
            object: PathBuf::from(object),
            soname: soname.to_string(),
            rpath: rpath.to_string(),
            needed: split_needed(needed),
        })
    }

    /// Rewrite the object path relative to an installation root (keeping it absolute).
    #[must_use]
    pub fn relative_to(mut self, root: &Path) -> Self {
        if let Ok(stripped) = self.object.strip_prefix(root) {
            self.object = Path::new("/").join(stripped);
        }
        self
    }

    /// Directories the dynamic linker searches for this object's dependencies, with
    /// `$ORIGIN` expanded. Relative entries without `$ORIGIN` are dropped.
    #[must_use]
    pub fn runpath_dirs(&self) -> Vec<PathBuf> {
        let origin = self.object.parent().unwrap_or_else(|| Path::new("/"));
        self.rpath
            .split(':')
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| soname_deps::normalize_runpath(origin, entry))
            .collect()
    }
}

/// Split a needed-library field, accepting both `,` and whitespace separators.
#[must_use]
pub fn split_needed(field: &str) -> Vec<String> {
    field
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|lib| !lib.is_empty())
        .map(str::to_string)
        .collect()
}
