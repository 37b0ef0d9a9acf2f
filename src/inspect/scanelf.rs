// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses `scanelf -F '%a;%F;%S;%r;%n'` output.

use std::path::PathBuf;

use super::{InspectError, InspectResult};
use crate::metadata::{split_needed, ElfMetadata};

/// Placeholder `scanelf` prints for an absent field.
pub const EMPTY_SENTINEL: &str = "  -  ";

/// Format string handed to `scanelf -F`.
pub(crate) const FORMAT: &str = "%a;%F;%S;%r;%n";

/// Parse every non-blank line of a batch.
///
/// # Errors
/// Returns an error on the first malformed line.
pub fn parse_scanelf_output(output: &str) -> InspectResult<Vec<ElfMetadata>> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_scanelf_line)
        .collect()
}

/// Parse one record: `arch;path;soname;rpath;needed`.
///
/// Lines without any `;` are read as whitespace-delimited fields, where a lone `-` marks an
/// empty field.
///
/// # Errors
/// Returns `MalformedOutput` if the arch or path is missing.
pub fn parse_scanelf_line(line: &str) -> InspectResult<ElfMetadata> {
    let malformed = || InspectError::MalformedOutput {
        line: line.to_string(),
    };

    let fields: Vec<&str> = if line.contains(';') {
        line.splitn(5, ';').collect()
    } else {
        line.split_whitespace().collect()
    };
    if fields.len() < 2 {
        return Err(malformed());
    }

    let field = |index: usize| fields.get(index).map_or("", |value| sanitize(*value));
    let arch = field(0);
    let object = field(1);
    if arch.is_empty() || object.is_empty() {
        return Err(malformed());
    }
    let needed = if line.contains(';') {
        split_needed(field(4))
    } else {
        fields
            .iter()
            .skip(4)
            .copied()
            .map(sanitize)
            .flat_map(split_needed)
            .collect()
    };

    Ok(ElfMetadata {
        arch: arch.to_string(),
        object: PathBuf::from(object),
        soname: field(2).to_string(),
        rpath: field(3).to_string(),
        needed,
    })
}

/// Map the empty-field sentinel to an empty string.
fn sanitize(value: &str) -> &str {
    if value == EMPTY_SENTINEL || value.trim() == "-" {
        ""
    } else {
        value.trim()
    }
}
