// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Object inspection behind a narrow trait, with an external-tool backend (`file` + `scanelf`)
//! and a native backend built on `goblin`.

mod file;
mod native;
mod scanelf;
mod tools;

pub use file::classify_description;
pub use native::NativeInspector;
pub use scanelf::{parse_scanelf_line, parse_scanelf_output, EMPTY_SENTINEL};
pub use tools::ToolInspector;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::command::CommandError;
use crate::metadata::ElfMetadata;

pub type InspectResult<T> = std::result::Result<T, InspectError>;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("File-type inspection returned nothing for {path:?}")]
    EmptyClassification { path: PathBuf },
    #[error("Malformed inspector output: {line:?}")]
    MalformedOutput { line: String },
    #[error("Failed to read object: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse ELF object: {path:?}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
}

/// What an installed object is, as far as dynamic linking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    SharedObject,
    DynamicExecutable,
    Other,
}

impl ObjectKind {
    #[must_use]
    pub fn is_elf_dynamic(self) -> bool {
        matches!(self, Self::SharedObject | Self::DynamicExecutable)
    }
}

/// Classifies objects and extracts their dynamic-linking metadata.
pub trait Inspector {
    /// Classify a single object.
    ///
    /// # Errors
    /// Returns an error if the object cannot be inspected at all.
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind>;

    /// Extract metadata for every ELF object among `paths`, in input order.
    /// Non-ELF paths produce no record.
    ///
    /// # Errors
    /// Returns an error if the inspection fails or its output cannot be understood.
    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>>;
}

impl<T: Inspector + ?Sized> Inspector for &T {
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind> {
        (**self).classify(path)
    }

    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>> {
        (**self).inspect_batch(paths)
    }
}

impl<T: Inspector + ?Sized> Inspector for Box<T> {
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind> {
        (**self).classify(path)
    }

    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>> {
        (**self).inspect_batch(paths)
    }
}

/// Which inspector implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shell out to `file` and `scanelf`.
    #[default]
    Tools,
    /// Parse objects in-process.
    Native,
}

impl Backend {
    #[must_use]
    pub fn inspector(self, timeout: Duration) -> Box<dyn Inspector> {
        match self {
            Self::Tools => Box::new(ToolInspector::new(timeout)),
            Self::Native => Box::new(NativeInspector),
        }
    }
}
