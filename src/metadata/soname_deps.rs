// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Derives `PROVIDES` and `REQUIRES` from a package's `NEEDED.ELF.2` records.
//!
//! Both files hold one line per multilib category, e.g. `x86_64: libfoo.so.1 libbar.so.2`.
//! A needed soname is left out of `REQUIRES` when the same package provides it, for the same
//! category, from a directory on the needing object's runpath.

use path_clean::PathClean;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::ElfMetadata;

/// Approximate multilib category for a machine name (without `EM_`).
///
/// The mapping mirrors the one the package manager falls back on when the category
/// is not recorded alongside the object.
#[must_use]
pub fn multilib_category(arch: &str) -> &str {
    match arch {
        "386" => "x86_32",
        "68K" => "m68k_32",
        "AARCH64" => "arm_64",
        "ALPHA" => "alpha_64",
        "ARM" => "arm_32",
        "IA_64" => "ia64_64",
        "MIPS" => "mips_o32",
        "PARISC" => "hppa_64",
        "PPC" => "ppc_32",
        "PPC64" => "ppc_64",
        "S390" => "s390_64",
        "SH" => "sh_32",
        "SPARC" | "SPARC32PLUS" => "sparc_32",
        "SPARCV9" => "sparc_64",
        "X86_64" => "x86_64",
        other => other,
    }
}

type CategoryMap = BTreeMap<String, BTreeSet<String>>;

/// Accumulates records for one package.
#[derive(Debug, Default)]
pub struct SonameDeps {
    entries: Vec<ElfMetadata>,
}

impl SonameDeps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ElfMetadata) {
        self.entries.push(entry);
    }

    /// Contents of `PROVIDES` (empty if no object declares a soname).
    #[must_use]
    pub fn provides(&self) -> String {
        let mut provides = CategoryMap::new();
        for entry in self.entries.iter().filter(|e| !e.soname.is_empty()) {
            provides
                .entry(Self::category(entry).to_string())
                .or_default()
                .insert(entry.soname.clone());
        }
        render(&provides)
    }

    /// Contents of `REQUIRES` (empty if every dependency is satisfied internally).
    #[must_use]
    pub fn requires(&self) -> String {
        let mut requires = CategoryMap::new();
        for entry in &self.entries {
            let category = Self::category(entry);
            let runpath = entry.runpath_dirs();
            for soname in &entry.needed {
                if !self.provided_internally(category, soname, &runpath) {
                    requires
                        .entry(category.to_string())
                        .or_default()
                        .insert(soname.clone());
                }
            }
        }
        render(&requires)
    }

    fn provided_internally(&self, category: &str, soname: &str, runpath: &[PathBuf]) -> bool {
        self.entries.iter().any(|provider| {
            provider.soname == soname
                && Self::category(provider) == category
                && provider
                    .object
                    .parent()
                    .is_some_and(|dir| runpath.iter().any(|p| p == dir))
        })
    }

    fn category(entry: &ElfMetadata) -> &str {
        multilib_category(entry.short_arch())
    }
}

fn render(map: &CategoryMap) -> String {
    map.iter()
        .filter(|(_, sonames)| !sonames.is_empty())
        .map(|(category, sonames)| {
            let sonames: Vec<&str> = sonames.iter().map(String::as_str).collect();
            format!("{category}: {}\n", sonames.join(" "))
        })
        .collect()
}

/// Resolve one runpath entry against the object's directory.
///
/// `$ORIGIN` (or `${ORIGIN}`) is only honoured at the very start of a relative entry;
/// anything else that is still relative after substitution is rejected.
pub(crate) fn normalize_runpath(origin: &Path, entry: &str) -> Option<PathBuf> {
    if !entry.starts_with('/') && !entry.starts_with("$ORIGIN") && !entry.starts_with("${ORIGIN}") {
        return None;
    }
    let resolved = if entry.contains("${ORIGIN}") {
        entry.replace("${ORIGIN}", &origin.to_string_lossy())
    } else if entry.contains("$ORIGIN") {
        entry.replace("$ORIGIN", &origin.to_string_lossy())
    } else {
        entry.to_string()
    };
    resolved
        .starts_with('/')
        .then(|| PathBuf::from(resolved).clean())
}
