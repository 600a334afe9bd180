//! Duplicate-aware file placement
//!
//! Decides, for one source file and its target acquisition directory,
//! whether to move the file, delete it as a verified duplicate, or retain
//! it alongside a conflicting namesake. Non-identical content is never
//! overwritten or deleted.

use crate::checksum::file_checksum;
use crate::error::{DicompackError, Result};
use crate::sort::FileOutcome;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Places `source` into `acq_dir` under its own basename
///
/// - Target absent: the file is moved (rename, with copy+delete fallback
///   across filesystems).
/// - Target present with identical checksum: the source is deleted.
/// - Target present with differing checksum: both files are left in place.
///
/// The decision is idempotent: re-running over already-placed identical
/// content deletes the straggler instead of re-moving it.
pub fn place_file(source: &Path, acq_dir: &Path) -> Result<FileOutcome> {
    let name = source
        .file_name()
        .ok_or_else(|| DicompackError::io(source, ErrorKind::InvalidInput.into()))?;
    let target = acq_dir.join(name);

    if !target.exists() {
        move_file(source, &target)?;
        return Ok(FileOutcome::Sorted);
    }

    // A source that already is its own target (re-walked placed file,
    // or a path spelled differently) must never be deleted as its own
    // duplicate.
    let source_real = fs::canonicalize(source).map_err(|e| DicompackError::io(source, e))?;
    let target_real = fs::canonicalize(&target).map_err(|e| DicompackError::io(&target, e))?;
    if source_real == target_real {
        return Ok(FileOutcome::Sorted);
    }

    let source_sum = file_checksum(source)?;
    let target_sum = file_checksum(&target)?;
    if source_sum == target_sum {
        fs::remove_file(source).map_err(|e| DicompackError::io(source, e))?;
        Ok(FileOutcome::DuplicateRemoved)
    } else {
        debug!(
            "checksum mismatch: {} vs {}",
            source_sum.to_hex(),
            target_sum.to_hex()
        );
        Ok(FileOutcome::ConflictRetained)
    }
}

/// Moves a file, falling back to copy+delete when rename cannot cross a
/// filesystem boundary
fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Rename cannot cross mount points; EXDEV has no stable
            // ErrorKind on all toolchains, so any rename failure falls
            // back before giving up.
            fs::copy(source, target).map_err(|_| DicompackError::io(source, rename_err))?;
            fs::remove_file(source).map_err(|e| DicompackError::io(source, e))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_is_moved() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("inbox/f1.dcm");
        let acq = dir.path().join("acq");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::create_dir_all(&acq).unwrap();
        fs::write(&source, b"payload").unwrap();

        let outcome = place_file(&source, &acq).unwrap();
        assert_eq!(outcome, FileOutcome::Sorted);
        assert!(!source.exists());
        assert_eq!(fs::read(acq.join("f1.dcm")).unwrap(), b"payload");
    }

    #[test]
    fn test_identical_duplicate_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("f1.dcm");
        let acq = dir.path().join("acq");
        fs::create_dir_all(&acq).unwrap();
        fs::write(&source, b"payload").unwrap();
        fs::write(acq.join("f1.dcm"), b"payload").unwrap();

        let outcome = place_file(&source, &acq).unwrap();
        assert_eq!(outcome, FileOutcome::DuplicateRemoved);
        assert!(!source.exists());
        assert!(acq.join("f1.dcm").exists());
    }

    #[test]
    fn test_source_already_at_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let acq = dir.path().join("acq");
        fs::create_dir_all(&acq).unwrap();
        let placed = acq.join("f1.dcm");
        fs::write(&placed, b"payload").unwrap();

        // The placed file classified back to its own directory must not
        // be removed as a duplicate of itself.
        let outcome = place_file(&placed, &acq).unwrap();
        assert_eq!(outcome, FileOutcome::Sorted);
        assert_eq!(fs::read(&placed).unwrap(), b"payload");
    }

    #[test]
    fn test_conflicting_namesake_is_retained() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("f1.dcm");
        let acq = dir.path().join("acq");
        fs::create_dir_all(&acq).unwrap();
        fs::write(&source, b"one payload").unwrap();
        fs::write(acq.join("f1.dcm"), b"another payload").unwrap();

        let outcome = place_file(&source, &acq).unwrap();
        assert_eq!(outcome, FileOutcome::ConflictRetained);
        assert_eq!(fs::read(&source).unwrap(), b"one payload");
        assert_eq!(fs::read(acq.join("f1.dcm")).unwrap(), b"another payload");
    }
}
