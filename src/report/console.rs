// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Formats scan and recover summaries as tables for stderr.

use comfy_table::{Attribute, Cell, Table};

use crate::metadata::MetadataFile;
use crate::repair::RecoveredPackage;
use crate::scan::{BreakReason, ScanReport};

/// Print the scan summary to stderr.
pub fn summarize_scan(report: &ScanReport) {
    eprintln!("Package database: {}", report.vdb.display());
    eprintln!(
        "Scanned packages: {}, broken: {}\n",
        report.scanned,
        report.broken.len()
    );
    if !report.broken.is_empty() {
        eprintln!("{}", broken_table(report));
    }
}

/// Print the files written by a recover run to stderr.
pub fn summarize_recover(packages: &[RecoveredPackage]) {
    if !packages.is_empty() {
        eprintln!("{}", recovered_table(packages));
    }
}

/// Create a table with the default preset styling.
fn default_table_preset() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

fn join_files(files: &[MetadataFile]) -> String {
    files
        .iter()
        .map(|file| file.file_name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn broken_table(report: &ScanReport) -> Table {
    let mut table = default_table_preset();
    table.set_header(header(&["Package", "Object", "Kind", "Missing"]));
    for broken in &report.broken {
        let kind = match broken.reason {
            BreakReason::SharedObjectMissing { .. } => "shared object",
            BreakReason::ExecutableMissing { .. } => "executable",
        };
        table.add_row(vec![
            Cell::new(&broken.package),
            Cell::new(broken.reason.object().display()),
            Cell::new(kind),
            Cell::new(join_files(broken.reason.missing())),
        ]);
    }
    table
}

pub(crate) fn recovered_table(packages: &[RecoveredPackage]) -> Table {
    let mut table = default_table_preset();
    table.set_header(header(&["Package", "Records", "Written"]));
    for package in packages {
        table.add_row(vec![
            Cell::new(&package.cpv),
            Cell::new(package.records),
            Cell::new(join_files(&package.written)),
        ]);
    }
    table
}
