//! DICOM tree sorting
//!
//! Walks an unsorted source tree and moves every parseable DICOM file into
//! its acquisition directory under the sort root. Files are fully placed
//! one at a time so each dedup decision sees the results of every prior
//! one; the run is restartable and idempotent.

pub mod dedup;

use crate::classify::{acquisition_dir, AcquisitionKey};
use crate::error::{DicompackError, Result};
use crate::header::read_header;
use crate::report::Reporter;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-file decision of the dedup mover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Moved into its acquisition directory
    Sorted,
    /// Verified byte-identical to the already-placed namesake; source deleted
    DuplicateRemoved,
    /// Namesake with differing content; both files left untouched
    ConflictRetained,
}

/// Tallies of one sorting run, enough to reconstruct what happened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSummary {
    pub sorted: usize,
    pub duplicates_removed: usize,
    pub conflicts_retained: usize,
    pub skipped: usize,
    pub io_errors: usize,
}

impl SortSummary {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Sorted => self.sorted += 1,
            FileOutcome::DuplicateRemoved => self.duplicates_removed += 1,
            FileOutcome::ConflictRetained => self.conflicts_retained += 1,
        }
    }
}

/// Sorts every DICOM file under `source_root` into acquisition directories
/// under `sort_root`
///
/// Hidden files, symlinks and non-regular files are ignored. Files that do
/// not parse as DICOM (or lack grouping fields) are reported and left in
/// place. A single file's I/O error is reported and the walk continues;
/// only a directory-creation failure is fatal for that file.
///
/// The candidate list is collected before any file is moved, so acquisition
/// directories created during the run are never revisited.
pub fn sort_tree(
    source_root: &Path,
    sort_root: &Path,
    reporter: &mut dyn Reporter,
) -> Result<SortSummary> {
    fs::create_dir_all(sort_root).map_err(|e| DicompackError::io(sort_root, e))?;
    // Canonical roots: the placed-file filter below compares path
    // prefixes, which only works when relative segments and symlinks
    // have been resolved on both sides.
    let source_root =
        fs::canonicalize(source_root).map_err(|e| DicompackError::io(source_root, e))?;
    let sort_root = fs::canonicalize(sort_root).map_err(|e| DicompackError::io(sort_root, e))?;

    // Files already under the sort root are placed; walking them again
    // would dedup a file against itself.
    let files: Vec<PathBuf> = collect_candidates(&source_root)
        .into_iter()
        .filter(|path| !path.starts_with(&sort_root))
        .collect();
    info!(
        "found {} files to sort under {} (ignoring symlinks and dotfiles)",
        files.len(),
        source_root.display()
    );

    let mut summary = SortSummary::default();
    for path in files {
        match sort_one(&path, &sort_root) {
            Ok((target, outcome)) => {
                summary.record(outcome);
                reporter.file_outcome(&path, &target, outcome);
            }
            Err(err) if err.is_per_file() => {
                summary.skipped += 1;
                reporter.file_skipped(&path, &err.to_string());
            }
            Err(err) => {
                summary.io_errors += 1;
                reporter.file_error(&path, &err);
            }
        }
    }
    Ok(summary)
}

/// Classifies and places one file; returns its acquisition target path and
/// the mover's decision
fn sort_one(path: &Path, sort_root: &Path) -> Result<(PathBuf, FileOutcome)> {
    let fields = read_header(path)?;
    let key = AcquisitionKey::from_header(&fields);
    let acq_dir = acquisition_dir(sort_root, &fields, &key);
    fs::create_dir_all(&acq_dir).map_err(|e| DicompackError::io(&acq_dir, e))?;
    let outcome = dedup::place_file(path, &acq_dir)?;
    Ok((acq_dir, outcome))
}

/// Regular, non-hidden, non-symlink files under `root`, collected up front
fn collect_candidates(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .collect()
}
