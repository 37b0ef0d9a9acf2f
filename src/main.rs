// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
mod args;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use args::{Args, Command, DatabaseArgs, RecoverArgs, RepairArgs, ReportArgs, ScanArgs};
use vdb_recover::report::{summarize_recover, summarize_scan, write_json};
use vdb_recover::vdb::{self, Exclusions};
use vdb_recover::{recover, Repairer, ScanOptions, ScanReport, Scanner, Vdb};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    match args.command {
        Command::Scan(args) => scan(&args),
        Command::Repair(args) => repair(&args),
        Command::Recover(args) => recover_packages(&args),
    }
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, _) => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn scan(args: &ScanArgs) -> Result<()> {
    let vdb = open_vdb(&args.database)?;
    let inspector = args.database.inspector.backend.inspector(args.database.inspector.timeout());
    let scanner = Scanner::new(&vdb, inspector, scan_options(&args.database)?);
    let report = scanner
        .scan()
        .with_context(|| format!("Failed to scan package database: {}", vdb.root().display()))?;

    print_atoms(&report);
    finish_report(&report, &args.report)
}

fn repair(args: &RepairArgs) -> Result<()> {
    let inspector = args.inspector.backend.inspector(args.inspector.timeout());
    let records = Repairer::new(inspector)
        .repair(&args.output, &args.objects)
        .with_context(|| format!("Failed to repair objects into: {}", args.output.display()))?;
    info!(
        "Regenerated records: output={}, records={}",
        args.output.display(),
        records.len()
    );
    Ok(())
}

fn recover_packages(args: &RecoverArgs) -> Result<()> {
    let vdb = open_vdb(&args.database)?;
    let inspector = args.database.inspector.backend.inspector(args.database.inspector.timeout());
    let scanner = Scanner::new(&vdb, inspector, scan_options(&args.database)?);
    let output = match &args.output {
        Some(output) => output.clone(),
        None => create_output_dir()?,
    };

    let outcome = recover(&scanner, &output)
        .with_context(|| format!("Failed to recover package metadata into: {}", output.display()))?;

    print_atoms(&outcome.report);
    if outcome.report.broken.is_empty() {
        eprintln!("No broken packages found");
    } else {
        if !outcome.libraries_affected() {
            eprintln!(
                "No broken libraries found, re-emerging the listed packages should be sufficient \
                 (no need to rebuild @world)"
            );
        }
        println!("{}", output.display());
    }
    finish_report(&outcome.report, &args.report)?;
    if args.report.summary {
        summarize_recover(&outcome.packages);
    }
    Ok(())
}

/// Locate and open the package database.
///
/// # Errors
/// Returns an error if no database root can be determined or it cannot be read.
fn open_vdb(args: &DatabaseArgs) -> Result<Vdb> {
    let root = vdb::resolve_root(args.vdb.as_deref(), args.inspector.timeout())
        .context("Failed to locate the package database")?;
    info!("Opening package database: path={}", root.display());
    Vdb::open(&root).with_context(|| format!("Failed to open package database: {}", root.display()))
}

fn scan_options(args: &DatabaseArgs) -> Result<ScanOptions> {
    Ok(ScanOptions {
        policy: args.policy,
        deep: args.deep,
        root: args.root.clone(),
        exclusions: create_exclusions(args.exclude_file.as_deref())?,
    })
}

fn create_exclusions(path: Option<&Path>) -> Result<Exclusions> {
    if let Some(exclusions) = path {
        Ok(Exclusions::from_file(exclusions)
            .with_context(|| format!("Failed to read exclusions file: {}", exclusions.display()))?)
    } else {
        Ok(Exclusions::empty())
    }
}

fn create_output_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("vdb_recover-")
        .tempdir()
        .context("Failed to create temporary output directory")?;
    Ok(dir.keep())
}

fn print_atoms(report: &ScanReport) {
    for atom in report.atoms() {
        println!("{atom}");
    }
}

fn finish_report(report: &ScanReport, args: &ReportArgs) -> Result<()> {
    if let Some(dest) = &args.report {
        write_report_to_file(report, dest)?;
    }
    if args.summary {
        summarize_scan(report);
    }
    Ok(())
}

/// Write the report to a file.
///
/// # Errors
/// Returns an error if the report cannot be serialized to JSON or if the file cannot be created.
fn write_report_to_file(report: &ScanReport, dest: &Path) -> Result<()> {
    info!("Writing report to file: file={}", dest.display());
    let file = File::create(dest)
        .with_context(|| format!("Failed to create JSON output file: {}", dest.display()))?;
    write_json(report, file)
        .with_context(|| format!("Failed to serialize report to JSON: {}", dest.display()))?;
    Ok(())
}
