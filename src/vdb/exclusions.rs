// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Operator-supplied list of packages and object paths the scan must leave alone.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::cpv::{Cpv, CpvError};

#[derive(Debug, Error)]
pub enum ExclusionsError {
    #[error("Failed to read exclusions file: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid entry on line {line} of {path:?}")]
    InvalidEntry {
        path: PathBuf,
        line: usize,
        #[source]
        source: CpvError,
    },
}

/// Packages (`cat/pf`) and path prefixes (`/opt/...`) excluded from scanning.
#[derive(Debug, Default)]
pub struct Exclusions {
    packages: HashSet<Cpv>,
    path_prefixes: Vec<PathBuf>,
}

impl Exclusions {
    /// No exclusions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read exclusions from a file.
    ///
    /// Each line is either an absolute path prefix (starting with `/`) or a package identifier
    /// (`cat/pf`, optionally prefixed with `=`). Empty lines and lines starting with `#` are ignored.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a package identifier is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ExclusionsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ExclusionsError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut exclusions = Self::default();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('/') {
                exclusions.path_prefixes.push(PathBuf::from(line));
            } else {
                let cpv = line
                    .parse::<Cpv>()
                    .map_err(|e| ExclusionsError::InvalidEntry {
                        path: path.to_path_buf(),
                        line: index + 1,
                        source: e,
                    })?;
                exclusions.packages.insert(cpv);
            }
        }
        Ok(exclusions)
    }

    #[must_use]
    pub fn excludes_package(&self, cpv: &Cpv) -> bool {
        self.packages.contains(cpv)
    }

    /// Prefix matching is done per path component, so `/opt/foo` does not cover `/opt/foobar`.
    #[must_use]
    pub fn excludes_path(&self, path: &Path) -> bool {
        self.path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.path_prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn exclusions_from(lines: &[&str]) -> Exclusions {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        Exclusions::from_file(file.path()).unwrap()
    }

    #[test]
    fn test_empty() {
        let exclusions = Exclusions::empty();
        assert!(exclusions.is_empty());
        assert!(!exclusions.excludes_package(&Cpv::new("cat", "foo-1")));
        assert!(!exclusions.excludes_path(Path::new("/usr/lib/libfoo.so")));
    }

    #[test]
    fn test_packages_and_paths() {
        let exclusions = exclusions_from(&["dev-libs/foo-1.0", "=sys-apps/bar-2-r1", "/opt/vendor"]);
        assert!(exclusions.excludes_package(&Cpv::new("dev-libs", "foo-1.0")));
        assert!(exclusions.excludes_package(&Cpv::new("sys-apps", "bar-2-r1")));
        assert!(!exclusions.excludes_package(&Cpv::new("dev-libs", "foo-1.1")));
        assert!(exclusions.excludes_path(Path::new("/opt/vendor/lib/libx.so")));
        assert!(!exclusions.excludes_path(Path::new("/opt/vendorized/lib/libx.so")));
    }

    #[test]
    fn test_ignore_comments_and_empty_lines() {
        let exclusions = exclusions_from(&["# comment", "", "  # indented comment", "  cat/foo-1  "]);
        assert!(exclusions.excludes_package(&Cpv::new("cat", "foo-1")));
        assert!(!exclusions.is_empty());
    }

    #[test]
    fn test_invalid_entry_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file, "not-a-package").unwrap();
        file.flush().unwrap();

        let err = Exclusions::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ExclusionsError::InvalidEntry { line: 2, .. }));
    }

    #[test]
    fn test_file_not_found() {
        let result = Exclusions::from_file("/nonexistent/exclusions.txt");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }
}
