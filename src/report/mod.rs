// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Human and machine readable renderings of scan results.

mod console;

pub use console::{summarize_recover, summarize_scan};

use std::io::Write;

use crate::scan::ScanReport;

/// Serialize the report as pretty JSON: `{vdb, policy, scanned, broken: [{package, reason}]}`.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_json<W: Write>(report: &ScanReport, writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, report)
}
