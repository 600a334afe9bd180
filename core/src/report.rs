//! Outcome reporting
//!
//! The sort engine and packager emit structured per-file and per-archive
//! outcomes through an explicitly passed [`Reporter`] rather than a
//! process-wide logger, so batch runs are observable in tests.

use crate::sort::FileOutcome;
use log::{info, warn};
use std::path::Path;

/// Observer for per-file and per-archive outcomes
pub trait Reporter {
    /// A file was classified and placed (or deduplicated, or retained as a
    /// conflict)
    fn file_outcome(&mut self, source: &Path, target: &Path, outcome: FileOutcome);

    /// A file could not be classified and was left untouched
    fn file_skipped(&mut self, source: &Path, reason: &str);

    /// A file hit an I/O error; the walk continues
    fn file_error(&mut self, source: &Path, error: &crate::error::DicompackError);

    /// An archive was written for an acquisition directory
    fn archive_written(&mut self, dir: &Path, archive: &Path);
}

/// Reporter that emits through the `log` crate
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn file_outcome(&mut self, source: &Path, target: &Path, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Sorted => {
                info!("sorted {} -> {}", source.display(), target.display())
            }
            FileOutcome::DuplicateRemoved => {
                info!("deleted duplicate {}", source.display())
            }
            FileOutcome::ConflictRetained => warn!(
                "retaining non-identical duplicate {} of {}",
                source.display(),
                target.display()
            ),
        }
    }

    fn file_skipped(&mut self, source: &Path, reason: &str) {
        info!("skipping {}: {}", source.display(), reason);
    }

    fn file_error(&mut self, source: &Path, error: &crate::error::DicompackError) {
        warn!("error on {}: {}", source.display(), error);
    }

    fn archive_written(&mut self, dir: &Path, archive: &Path) {
        info!("compressed {} -> {}", dir.display(), archive.display());
    }
}
