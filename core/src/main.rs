use clap::Parser;
use dicompack_core::cli::{Cli, Command};
use dicompack_core::package::{self, PackageOptions};
use dicompack_core::report::LogReporter;
use dicompack_core::{extract, sort, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    let mut reporter = LogReporter;
    match command {
        Command::Sort { path, sort_path } => {
            run_sort(&path, &sort_path, &mut reporter)?;
        }
        Command::Tar {
            sort_path,
            tar_path,
            force,
        } => {
            run_tar(&sort_path, &tar_path, force, &mut reporter)?;
        }
        Command::Tarsort {
            path,
            sort_path,
            tar_path,
            force,
        } => {
            run_sort(&path, &sort_path, &mut reporter)?;
            run_tar(&sort_path, &tar_path, force, &mut reporter)?;
        }
        Command::Repackage {
            target,
            output_dir,
            group,
            project,
            force,
        } => {
            for archive in repackage_targets(&target)? {
                extract::repackage(
                    &archive,
                    output_dir.as_deref(),
                    group.as_deref(),
                    project.as_deref(),
                    force,
                )?;
            }
        }
    }
    Ok(())
}

fn run_sort(path: &Path, sort_path: &Path, reporter: &mut LogReporter) -> Result<()> {
    let summary = sort::sort_tree(path, sort_path, reporter)?;
    info!(
        "sorted {} files, removed {} duplicates, retained {} conflicts, skipped {} non-DICOM, {} I/O errors",
        summary.sorted,
        summary.duplicates_removed,
        summary.conflicts_retained,
        summary.skipped,
        summary.io_errors
    );
    Ok(())
}

fn run_tar(sort_path: &Path, tar_path: &Path, force: bool, reporter: &mut LogReporter) -> Result<()> {
    let options = PackageOptions {
        overwrite: force,
        ..PackageOptions::default()
    };
    let archives = package::package_tree(sort_path, tar_path, &options, reporter)?;
    info!("wrote {} archives to {}", archives.len(), tar_path.display());
    Ok(())
}

/// A single .tgz target, or every .tgz directly inside a directory target
fn repackage_targets(target: &Path) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }
    let entries = std::fs::read_dir(target)
        .map_err(|e| dicompack_core::DicompackError::io(target, e))?;
    let mut archives: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "tgz").unwrap_or(false))
        .collect();
    archives.sort();
    Ok(archives)
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}
