// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Interprets the human-readable descriptions printed by `file -b`.

use super::ObjectKind;

/// Classify a `file -b` description.
///
/// Shared objects must carry the full `ELF <class> <byte order> ... shared object` signature,
/// e.g. `ELF 64-bit LSB shared object, x86-64, version 1 (SYSV), dynamically linked, ...`.
/// Executables count only when `file` reports them as dynamically linked; this includes
/// `pie executable`.
#[must_use]
pub fn classify_description(description: &str) -> ObjectKind {
    if !description.contains("ELF") {
        return ObjectKind::Other;
    }
    if has_shared_object_signature(description) {
        ObjectKind::SharedObject
    } else if description.contains("executable") && description.contains("dynamically linked") {
        ObjectKind::DynamicExecutable
    } else {
        ObjectKind::Other
    }
}

fn has_shared_object_signature(description: &str) -> bool {
    let Some(rest) = description
        .split_once("ELF ")
        .map(|(_, rest)| rest)
    else {
        return false;
    };
    let mut words = rest.split_whitespace();
    let class = words.next().unwrap_or_default();
    let byte_order = words.next().unwrap_or_default();
    matches!(class, "32-bit" | "64-bit")
        && matches!(byte_order, "LSB" | "MSB")
        && rest.contains("shared object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_objects() {
        assert_eq!(
            classify_description(
                "ELF 64-bit LSB shared object, x86-64, version 1 (SYSV), dynamically linked, \
                 BuildID[sha1]=abc, stripped"
            ),
            ObjectKind::SharedObject
        );
        assert_eq!(
            classify_description("ELF 32-bit MSB shared object, PowerPC or cisco 4500, version 1 (SYSV)"),
            ObjectKind::SharedObject
        );
    }

    #[test]
    fn test_dynamic_executables() {
        assert_eq!(
            classify_description(
                "ELF 64-bit LSB pie executable, x86-64, version 1 (SYSV), dynamically linked, \
                 interpreter /lib64/ld-linux-x86-64.so.2, for GNU/Linux 3.2.0, stripped"
            ),
            ObjectKind::DynamicExecutable
        );
        assert_eq!(
            classify_description("ELF 32-bit LSB executable, Intel 80386, dynamically linked"),
            ObjectKind::DynamicExecutable
        );
    }

    #[test]
    fn test_other_objects() {
        assert_eq!(
            classify_description("ELF 64-bit LSB executable, x86-64, statically linked, stripped"),
            ObjectKind::Other
        );
        assert_eq!(
            classify_description("ELF 64-bit LSB relocatable, x86-64, version 1 (SYSV), not stripped"),
            ObjectKind::Other
        );
        assert_eq!(
            classify_description("POSIX shell script, ASCII text executable"),
            ObjectKind::Other
        );
        assert_eq!(classify_description("cannot open `/nope' (No such file or directory)"), ObjectKind::Other);
    }

    #[test]
    fn test_shared_object_needs_full_signature() {
        // Mentions both words but lacks the class/byte-order signature.
        assert_eq!(
            classify_description("ELF shared object fragment, dynamically linked executable"),
            ObjectKind::DynamicExecutable
        );
    }
}
