// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use vdb_recover::command::DEFAULT_TOOL_TIMEOUT;
use vdb_recover::{Backend, DetectionPolicy};

#[derive(Parser)]
#[command(name = "vdb_recover")]
#[command(version)]
#[command(about = "Finds and repairs missing ELF metadata in Portage's installed-package database")]
pub(crate) struct Args {
    /// Increase log verbosity (-v: info, -vv: debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List packages with missing ELF metadata, one `=category/pf` per line.
    Scan(ScanArgs),
    /// Append regenerated NEEDED / NEEDED.ELF.2 lines for OBJECTs to OUTPUT/build-info.
    Repair(RepairArgs),
    /// Scan, then write regenerated metadata for every broken package.
    Recover(RecoverArgs),
}

#[derive(clap::Args)]
pub(crate) struct ScanArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(clap::Args)]
pub(crate) struct RepairArgs {
    /// Directory receiving build-info/NEEDED and build-info/NEEDED.ELF.2.
    pub output: PathBuf,

    /// Installed objects to inspect.
    #[arg(required = true)]
    pub objects: Vec<PathBuf>,

    #[command(flatten)]
    pub inspector: InspectorArgs,
}

#[derive(clap::Args)]
pub(crate) struct RecoverArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Where to write the regenerated files (default: a new temporary directory that is kept).
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(clap::Args)]
pub(crate) struct DatabaseArgs {
    /// Path to the package database (default: `portageq vdb_path`, then /var/db/pkg).
    #[arg(long, env = "VDB_RECOVER_VDB")]
    pub vdb: Option<PathBuf>,

    /// Root the installed paths are relative to.
    #[arg(long, env = "VDB_RECOVER_ROOT", default_value = "/")]
    pub root: PathBuf,

    #[arg(long, env = "VDB_RECOVER_POLICY", value_enum, default_value_t)]
    pub policy: DetectionPolicy,

    /// Inspect every installed file, not only shared-object names and bin/sbin/libexec.
    #[arg(long)]
    pub deep: bool,

    #[arg(
        long,
        long_help = "Path to a text file of packages and paths to leave alone.\n\
                Lines starting with / are path prefixes, other lines are category/pf.\n\
                Empty lines and lines starting with # are ignored."
    )]
    pub exclude_file: Option<PathBuf>,

    #[command(flatten)]
    pub inspector: InspectorArgs,
}

#[derive(clap::Args)]
pub(crate) struct InspectorArgs {
    #[arg(long, env = "VDB_RECOVER_BACKEND", value_enum, default_value_t)]
    pub backend: Backend,

    /// Seconds an external tool may run before it is killed.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TOOL_TIMEOUT.as_secs())]
    pub tool_timeout: u64,
}

impl InspectorArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout)
    }
}

#[derive(clap::Args)]
pub(crate) struct ReportArgs {
    /// Print a table of broken packages to stderr.
    #[arg(long)]
    pub summary: bool,

    /// Path to write the scan results to in JSON format.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let args = Args::try_parse_from(["vdb_recover", "scan"]).unwrap();
        let Command::Scan(scan) = args.command else {
            panic!("expected scan");
        };
        assert_eq!(scan.database.root, PathBuf::from("/"));
        assert_eq!(scan.database.inspector.timeout(), DEFAULT_TOOL_TIMEOUT);
        assert!(!scan.database.deep);
        assert!(!scan.report.summary);
    }

    #[test]
    fn test_repair_requires_output_and_objects() {
        assert!(Args::try_parse_from(["vdb_recover", "repair"]).is_err());
        assert!(Args::try_parse_from(["vdb_recover", "repair", "/tmp/out"]).is_err());
        let args =
            Args::try_parse_from(["vdb_recover", "repair", "/tmp/out", "/usr/lib/libfoo.so"]).unwrap();
        let Command::Repair(repair) = args.command else {
            panic!("expected repair");
        };
        assert_eq!(repair.objects, [PathBuf::from("/usr/lib/libfoo.so")]);
    }

    #[test]
    fn test_recover_output_is_optional() {
        let args = Args::try_parse_from(["vdb_recover", "recover"]).unwrap();
        let Command::Recover(recover) = args.command else {
            panic!("expected recover");
        };
        assert!(recover.output.is_none());

        let args = Args::try_parse_from(["vdb_recover", "recover", "--output", "/tmp/out"]).unwrap();
        let Command::Recover(recover) = args.command else {
            panic!("expected recover");
        };
        assert_eq!(recover.output, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["vdb_recover", "-v", "-q", "scan"]).is_err());
        let args = Args::try_parse_from(["vdb_recover", "scan", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
