// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses `CONTENTS` manifests and selects the installed paths worth inspecting.

use std::path::{Component, Path, PathBuf};

/// Kind tag of a `CONTENTS` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Obj,
    Dir,
    Sym,
    Dev,
    Fif,
    Unknown(String),
}

impl EntryKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "obj" => Self::Obj,
            "dir" => Self::Dir,
            "sym" => Self::Sym,
            "dev" => Self::Dev,
            "fif" => Self::Fif,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A single installed filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    kind: EntryKind,
    path: PathBuf,
}

// Directories whose executables are worth inspecting even without a `.so`-like name.
const EXECUTABLE_DIRS: [&str; 3] = ["bin", "sbin", "libexec"];

// Trees that only ever hold data or headers.
const IGNORED_PREFIXES: [&str; 2] = ["/usr/share/", "/usr/include/"];

impl ContentsEntry {
    /// Parse one manifest line. Returns `None` for blank lines.
    ///
    /// `obj` lines carry `<path> <md5> <mtime>`, `sym` lines carry `<path> -> <target> <mtime>`.
    /// The trailing fields are stripped from the right so paths containing spaces survive.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }
        let (tag, residue) = line.split_once(' ').unwrap_or((line, ""));
        let kind = EntryKind::from_tag(tag);
        let path = match kind {
            EntryKind::Obj => strip_obj_suffix(residue),
            EntryKind::Sym => residue.split_once(" -> ").map_or(residue, |(link, _)| link),
            _ => residue,
        };
        Some(Self {
            kind,
            path: PathBuf::from(path),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the entry is a plain object that may be an ELF shared object or executable.
    ///
    /// Without `deep`, only `.so`-like names and files under `bin`/`sbin`/`libexec` qualify.
    #[must_use]
    pub fn is_candidate(&self, deep: bool) -> bool {
        if self.kind != EntryKind::Obj {
            return false;
        }
        let path = self.path.to_string_lossy();
        if IGNORED_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return false;
        }
        deep || is_shared_object_name(&self.path) || is_under_executable_dir(&self.path)
    }
}

/// Parse a whole manifest, skipping blank lines.
#[must_use]
pub fn parse_contents(text: &str) -> Vec<ContentsEntry> {
    text.lines().filter_map(ContentsEntry::parse).collect()
}

/// Matches `libfoo.so` and `libfoo.so.<anything>`, e.g. `libz.so.1.3.1.zlib-ng`.
///
/// Names that only look like libraries are rejected later by the classifier.
#[must_use]
pub fn is_shared_object_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.ends_with(".so")
                || name
                    .split_once(".so.")
                    .is_some_and(|(stem, suffix)| !stem.is_empty() && !suffix.is_empty())
        })
}

fn is_under_executable_dir(path: &Path) -> bool {
    path.parent().is_some_and(|parent| {
        parent.components().any(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| EXECUTABLE_DIRS.contains(&name)),
            _ => false,
        })
    })
}

fn strip_obj_suffix(residue: &str) -> &str {
    let mut fields = residue.rsplitn(3, ' ');
    let mtime = fields.next().unwrap_or_default();
    let md5 = fields.next().unwrap_or_default();
    match fields.next() {
        Some(path) if is_mtime(mtime) && is_md5(md5) => path,
        _ => residue,
    }
}

fn is_md5(field: &str) -> bool {
    field.len() == 32 && field.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_mtime(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obj_with_checksum_and_mtime() {
        let entry =
            ContentsEntry::parse("obj /usr/lib64/libz.so.1.3 0123456789abcdef0123456789abcdef 1700000000")
                .unwrap();
        assert_eq!(entry.kind(), &EntryKind::Obj);
        assert_eq!(entry.path(), Path::new("/usr/lib64/libz.so.1.3"));
    }

    #[test]
    fn test_parse_obj_without_trailing_fields() {
        let entry = ContentsEntry::parse("obj /usr/lib/libfoo.so.1.2").unwrap();
        assert_eq!(entry.path(), Path::new("/usr/lib/libfoo.so.1.2"));
    }

    #[test]
    fn test_parse_obj_path_with_spaces() {
        let entry = ContentsEntry::parse(
            "obj /opt/My App/bin/tool 0123456789abcdef0123456789abcdef 1700000000",
        )
        .unwrap();
        assert_eq!(entry.path(), Path::new("/opt/My App/bin/tool"));
    }

    #[test]
    fn test_parse_sym_keeps_link_path() {
        let entry = ContentsEntry::parse("sym /usr/lib/libz.so -> libz.so.1.3 1700000000").unwrap();
        assert_eq!(entry.kind(), &EntryKind::Sym);
        assert_eq!(entry.path(), Path::new("/usr/lib/libz.so"));
        assert!(!entry.is_candidate(true));
    }

    #[test]
    fn test_parse_other_kinds() {
        assert_eq!(ContentsEntry::parse("dir /usr/lib").unwrap().kind(), &EntryKind::Dir);
        assert_eq!(ContentsEntry::parse("fif /run/x").unwrap().kind(), &EntryKind::Fif);
        assert_eq!(ContentsEntry::parse("dev /dev/x").unwrap().kind(), &EntryKind::Dev);
        assert_eq!(
            ContentsEntry::parse("weird /x").unwrap().kind(),
            &EntryKind::Unknown("weird".to_string())
        );
        assert!(ContentsEntry::parse("   ").is_none());
    }

    #[test]
    fn test_parse_contents_skips_blank_lines() {
        let entries = parse_contents("dir /usr\n\nobj /usr/bin/foo\n");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_shared_object_names() {
        assert!(is_shared_object_name(Path::new("/usr/lib/libfoo.so")));
        assert!(is_shared_object_name(Path::new("/usr/lib/libfoo.so.1")));
        assert!(is_shared_object_name(Path::new("/usr/lib/libfoo.so.1.2.3")));
        assert!(!is_shared_object_name(Path::new("/usr/lib/libfoo.a")));
        assert!(!is_shared_object_name(Path::new("/usr/lib/libfoo.sox")));
        assert!(is_shared_object_name(Path::new("/usr/lib64/libz.so.1.3.1.zlib-ng")));
        assert!(is_shared_object_name(Path::new("/usr/lib/libfoo.so.1.debug-only")));
        assert!(!is_shared_object_name(Path::new("/usr/lib/libfoo.so.")));
    }

    #[test]
    fn test_candidates() {
        let candidate = |line: &str, deep: bool| ContentsEntry::parse(line).unwrap().is_candidate(deep);

        assert!(candidate("obj /usr/lib/libfoo.so.1.2", false));
        assert!(candidate(
            "obj /usr/lib64/libz.so.1.3.1.zlib-ng d41d8cd98f00b204e9800998ecf8427e 1700000000",
            false
        ));
        assert!(candidate("obj /usr/bin/foo", false));
        assert!(candidate("obj /usr/sbin/food", false));
        assert!(candidate("obj /usr/libexec/foo/helper", false));
        assert!(candidate("obj /usr/lib/foo/bin/helper", false));
        assert!(!candidate("obj /usr/lib/binutils/readme", false));
        assert!(!candidate("obj /etc/foo.conf", false));
        assert!(candidate("obj /etc/foo.conf", true));
        assert!(!candidate("obj /usr/share/foo/libfoo.so", true));
        assert!(!candidate("obj /usr/include/bin/foo.h", true));
        assert!(!candidate("dir /usr/bin", false));
    }
}
