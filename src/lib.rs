// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! A tool for finding and repairing missing ELF metadata in Portage's installed-package
//! database (VDB).
//!
//! This crate provides functionality to:
//! - Enumerate installed packages and their `CONTENTS` manifests
//! - Flag packages whose shared objects or dynamic executables lack `PROVIDES`, `NEEDED`
//!   or `NEEDED.ELF.2`
//! - Regenerate `NEEDED` / `NEEDED.ELF.2` records, and `PROVIDES` / `REQUIRES` from them
//! - Summarize scan results as tables or JSON

pub mod command;
pub mod inspect;
pub mod metadata;
pub mod repair;
pub mod report;
pub mod scan;
pub mod vdb;

pub use inspect::{Backend, Inspector, ObjectKind};
pub use metadata::{ElfMetadata, MetadataFile};
pub use repair::{recover, Repairer};
pub use scan::{DetectionPolicy, ScanOptions, ScanReport, Scanner};
pub use vdb::{InstalledPackage, Vdb};
