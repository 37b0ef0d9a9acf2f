// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Inspector backed by the `file` and `scanelf` command line tools.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::file::classify_description;
use super::scanelf::{parse_scanelf_output, FORMAT};
use super::{InspectError, InspectResult, Inspector, ObjectKind};
use crate::command;
use crate::metadata::ElfMetadata;

// Keeps a single scanelf command line well below ARG_MAX.
const SCANELF_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct ToolInspector {
    timeout: Duration,
}

impl ToolInspector {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ToolInspector {
    fn default() -> Self {
        Self::new(command::DEFAULT_TOOL_TIMEOUT)
    }
}

impl Inspector for ToolInspector {
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind> {
        let args: [OsString; 3] = ["-b".into(), "--".into(), path.into()];
        let output = command::run("file", args, self.timeout)?.success("file")?;

        let Ok(description) = String::from_utf8(output.stdout) else {
            // Not going to be a dynamically linked ELF object if `file` cannot describe it in UTF-8.
            debug!("Non UTF-8 file description, skipping: path={}", path.display());
            return Ok(ObjectKind::Other);
        };
        let description = description.trim();
        if description.is_empty() {
            return Err(InspectError::EmptyClassification {
                path: path.to_path_buf(),
            });
        }

        let kind = classify_description(description);
        debug!(
            "Classified object: path={}, kind={:?}, description={}",
            path.display(),
            kind,
            description
        );
        Ok(kind)
    }

    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>> {
        let mut records = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(SCANELF_CHUNK_SIZE) {
            let args = ["-qyBF", FORMAT, "--"]
                .into_iter()
                .map(OsString::from)
                .chain(chunk.iter().map(|p| p.as_os_str().to_os_string()));
            let output = command::run("scanelf", args, self.timeout)?.success("scanelf")?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            records.extend(parse_scanelf_output(&stdout)?);
        }
        debug!("Inspected objects: requested={}, records={}", paths.len(), records.len());
        Ok(records)
    }
}
