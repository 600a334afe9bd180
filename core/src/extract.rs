//! Safe archive extraction and repackaging
//!
//! Extraction validates every member name before anything is written: one
//! member that would resolve outside the destination invalidates the whole
//! archive.

use crate::error::{DicompackError, Result};
use crate::package::{self, PackageOptions};
use flate2::read::GzDecoder;
use log::info;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Extracts a gzip tar archive into `dest`
///
/// Every member name is checked first; an absolute path or a `..` segment
/// anywhere in the archive aborts with [`DicompackError::PathTraversal`]
/// before a single file is written. Unpacking additionally refuses
/// symlink-mediated escapes out of `dest`.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| DicompackError::io(dest, e))?;

    // First pass: validate all member names before touching the destination.
    let file = File::open(archive_path).map_err(|e| DicompackError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive
        .entries()
        .map_err(|e| DicompackError::io(archive_path, e))?
    {
        let entry = entry.map_err(|e| DicompackError::io(archive_path, e))?;
        let path = entry
            .path()
            .map_err(|e| DicompackError::io(archive_path, e))?;
        check_member_path(&path)?;
    }

    // Second pass: unpack. unpack_in re-checks containment per entry,
    // covering symlink targets created by earlier entries.
    let file = File::open(archive_path).map_err(|e| DicompackError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive
        .entries()
        .map_err(|e| DicompackError::io(archive_path, e))?
    {
        let mut entry = entry.map_err(|e| DicompackError::io(archive_path, e))?;
        let member = entry
            .path()
            .map_err(|e| DicompackError::io(archive_path, e))?
            .to_string_lossy()
            .into_owned();
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| DicompackError::io(archive_path, e))?;
        if !unpacked {
            return Err(DicompackError::PathTraversal { member });
        }
    }
    Ok(())
}

/// Rejects member paths that could resolve outside the destination
fn check_member_path(path: &Path) -> Result<()> {
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes {
        return Err(DicompackError::PathTraversal {
            member: path.to_string_lossy().into_owned(),
        });
    }
    Ok(())
}

/// Repackages an existing acquisition archive with fresh metadata
///
/// The archive is safely extracted into a temporary directory; its single
/// top-level acquisition directory is re-packaged under the same basename
/// into `out_dir` (the current directory when `None`). When `group` is
/// given, an
/// `overwrite` routing hint is added to the metadata defaults; keys the
/// archived metadata document already records still win.
pub fn repackage(
    archive_path: &Path,
    out_dir: Option<&Path>,
    group: Option<&str>,
    project: Option<&str>,
    overwrite: bool,
) -> Result<PathBuf> {
    let out_dir = out_dir.unwrap_or(Path::new("."));
    fs::create_dir_all(out_dir).map_err(|e| DicompackError::io(out_dir, e))?;
    let out_path = out_dir.join(
        archive_path
            .file_name()
            .ok_or_else(|| DicompackError::io(archive_path, std::io::ErrorKind::InvalidInput.into()))?,
    );

    let tempdir = tempfile::tempdir().map_err(|e| DicompackError::io(out_dir, e))?;
    extract_archive(archive_path, tempdir.path())?;
    let content = single_top_level_dir(tempdir.path())?;
    let arcname = content
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut defaults = package::metadata::dicom_defaults();
    if let Some(group) = group {
        defaults.insert(
            "overwrite".to_string(),
            package::metadata::overwrite_hints(group, project),
        );
    }

    info!(
        "repackaging {} to {}",
        archive_path.display(),
        out_path.display()
    );
    let options = PackageOptions {
        metadata_defaults: defaults,
        overwrite,
    };
    package::create_archive(&out_path, &content, &arcname, &options)?;
    Ok(out_path)
}

/// The single top-level directory an acquisition archive must contain
fn single_top_level_dir(dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DicompackError::io(dir, e))? {
        let entry = entry.map_err(|e| DicompackError::io(dir, e))?;
        if entry
            .file_type()
            .map_err(|e| DicompackError::io(entry.path(), e))?
            .is_dir()
        {
            dirs.push(entry.path());
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        n => Err(DicompackError::BadArchiveLayout(format!(
            "expected one top-level directory, found {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{create_archive, PackageOptions};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tar::{EntryType, Header};

    fn fill_acquisition(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("001.dcm"), b"scan one").unwrap();
        fs::write(dir.join("002.dcm"), b"scan two").unwrap();
    }

    /// Builds an archive with a raw member name the tar writer would
    /// refuse, e.g. one containing `..`
    fn write_hostile_archive(path: &Path, member: &str) {
        let mut header = Header::new_gnu();
        header.as_old_mut().name[..member.len()].copy_from_slice(member.as_bytes());
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(4);
        header.set_mtime(0);
        header.set_cksum();

        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(header.as_bytes()).unwrap();
        let mut block = [0u8; 512];
        block[..4].copy_from_slice(b"evil");
        encoder.write_all(&block).unwrap();
        // End-of-archive marker
        encoder.write_all(&[0u8; 1024]).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let acq = dir.path().join("1_1_1_dicoms");
        fill_acquisition(&acq);
        let tgz = dir.path().join("out.tgz");
        create_archive(&tgz, &acq, "1_1_1_dicoms", &PackageOptions::default()).unwrap();

        let dest = dir.path().join("extracted");
        extract_archive(&tgz, &dest).unwrap();

        let unpacked = dest.join("1_1_1_dicoms");
        assert_eq!(fs::read(unpacked.join("001.dcm")).unwrap(), b"scan one");
        assert_eq!(fs::read(unpacked.join("002.dcm")).unwrap(), b"scan two");
        assert!(unpacked.join("METADATA.json").exists());
        assert!(unpacked.join("DIGEST.txt").exists());
    }

    #[test]
    fn test_traversal_member_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let tgz = dir.path().join("hostile.tgz");
        write_hostile_archive(&tgz, "../../etc/passwd");

        let dest = dir.path().join("dest");
        let err = extract_archive(&tgz, &dest).expect_err("must refuse traversal");
        assert!(matches!(err, DicompackError::PathTraversal { .. }));
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_absolute_member_rejected() {
        assert!(check_member_path(Path::new("/etc/passwd")).is_err());
        assert!(check_member_path(Path::new("a/../../b")).is_err());
        assert!(check_member_path(Path::new("acq/001.dcm")).is_ok());
    }

    #[test]
    fn test_repackage_injects_overwrite_hints() {
        let dir = tempfile::tempdir().unwrap();
        let acq = dir.path().join("1_1_1_dicoms");
        fill_acquisition(&acq);
        let tgz = dir.path().join("1_1_1_dicoms.tgz");
        create_archive(&tgz, &acq, "1_1_1_dicoms", &PackageOptions::default()).unwrap();

        let out_dir = dir.path().join("repackaged");
        let out = repackage(&tgz, Some(&out_dir), Some("neuro"), None, false).unwrap();
        assert_eq!(out, out_dir.join("1_1_1_dicoms.tgz"));

        let dest = dir.path().join("check");
        extract_archive(&out, &dest).unwrap();
        let body = fs::read_to_string(dest.join("1_1_1_dicoms/METADATA.json")).unwrap();
        let doc: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(doc["filetype"], "dicom");
        assert_eq!(doc["overwrite"]["group_name"], "neuro");
        assert_eq!(doc["overwrite"]["project_name"], "unknown");
    }

    #[test]
    fn test_repackage_preserves_recorded_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let acq = dir.path().join("1_1_1_dicoms");
        fill_acquisition(&acq);
        fs::write(
            acq.join("METADATA.json"),
            br#"{"filetype": "dicom", "overwrite": {"group_name": "archived", "project_name": "p0"}}"#,
        )
        .unwrap();
        let tgz = dir.path().join("1_1_1_dicoms.tgz");
        create_archive(&tgz, &acq, "1_1_1_dicoms", &PackageOptions::default()).unwrap();

        let out_dir = dir.path().join("repackaged");
        let out = repackage(&tgz, Some(&out_dir), Some("neuro"), Some("pilot"), false).unwrap();

        let dest = dir.path().join("check");
        extract_archive(&out, &dest).unwrap();
        let body = fs::read_to_string(dest.join("1_1_1_dicoms/METADATA.json")).unwrap();
        let doc: Value = serde_json::from_str(&body).unwrap();
        // The document recorded inside the archive is authoritative
        assert_eq!(doc["overwrite"]["group_name"], "archived");
    }
}
