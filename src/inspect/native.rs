// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads ELF objects in-process with the `goblin` crate, for hosts without `file`/`scanelf`.

use goblin::elf::dynamic::{DF_1_PIE, DT_FLAGS_1};
use goblin::elf::header::{machine_to_str, ET_DYN, ET_EXEC};
use goblin::elf::Elf as GoblinElf;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{InspectError, InspectResult, Inspector, ObjectKind};
use crate::metadata::ElfMetadata;

// ELF magic bytes: 0x7f followed by ASCII "ELF" (e_ident[EI_MAG0..EI_MAG3]).
const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

// Smallest possible ELF header.
const MIN_ELF_SIZE: u64 = 52;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeInspector;

impl NativeInspector {
    /// Read the whole object if it looks like ELF. `Ok(None)` means "not an ELF object":
    /// missing, too small, or wrong magic.
    fn read(path: &Path) -> InspectResult<Option<Vec<u8>>> {
        let read_failed = |source: io::Error| InspectError::ReadFailed {
            path: path.to_path_buf(),
            source,
        };

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Object missing on disk: path={}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(read_failed(e)),
        };
        if !metadata.is_file() || metadata.len() < MIN_ELF_SIZE {
            return Ok(None);
        }

        let mut file = fs::File::open(path).map_err(read_failed)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).map_err(read_failed)?;
        if magic != ELF_MAGIC {
            return Ok(None);
        }

        // goblin needs the full image.
        let mut bytes = magic.to_vec();
        file.read_to_end(&mut bytes).map_err(read_failed)?;
        Ok(Some(bytes))
    }

    fn parse<'a>(path: &Path, bytes: &'a [u8]) -> InspectResult<GoblinElf<'a>> {
        GoblinElf::parse(bytes).map_err(|e| InspectError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn kind_of(elf: &GoblinElf<'_>) -> ObjectKind {
        let Some(dynamic) = &elf.dynamic else {
            return ObjectKind::Other;
        };
        match elf.header.e_type {
            ET_DYN => {
                let pie = dynamic
                    .dyns
                    .iter()
                    .any(|d| d.d_tag == DT_FLAGS_1 && d.d_val & DF_1_PIE != 0);
                if pie && elf.interpreter.is_some() {
                    ObjectKind::DynamicExecutable
                } else if pie {
                    // static-pie
                    ObjectKind::Other
                } else {
                    ObjectKind::SharedObject
                }
            }
            ET_EXEC => ObjectKind::DynamicExecutable,
            _ => ObjectKind::Other,
        }
    }

    fn metadata_of(path: &Path, elf: &GoblinElf<'_>) -> ElfMetadata {
        let rpath = if elf.runpaths.is_empty() {
            elf.rpaths.join(":")
        } else {
            elf.runpaths.join(":")
        };
        ElfMetadata {
            arch: format!("EM_{}", machine_to_str(elf.header.e_machine)),
            object: path.to_path_buf(),
            soname: elf.soname.unwrap_or_default().to_string(),
            rpath,
            needed: elf.libraries.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Inspector for NativeInspector {
    fn classify(&self, path: &Path) -> InspectResult<ObjectKind> {
        let Some(bytes) = Self::read(path)? else {
            return Ok(ObjectKind::Other);
        };
        let kind = Self::kind_of(&Self::parse(path, &bytes)?);
        debug!("Classified object: path={}, kind={:?}", path.display(), kind);
        Ok(kind)
    }

    fn inspect_batch(&self, paths: &[PathBuf]) -> InspectResult<Vec<ElfMetadata>> {
        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(bytes) = Self::read(path)? else {
                continue;
            };
            let elf = Self::parse(path, &bytes)?;
            if elf.dynamic.is_none() {
                continue;
            }
            records.push(Self::metadata_of(path, &elf));
        }
        Ok(records)
    }
}
