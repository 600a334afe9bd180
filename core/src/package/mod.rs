//! Reproducible archive packaging
//!
//! Turns a finalized acquisition directory into a gzip-compressed tar
//! stream with a deterministic member order and pinned timestamps, so
//! identical directory contents always produce identical archives.

pub mod digest;
pub mod metadata;

use crate::error::{DicompackError, Result};
use crate::report::Reporter;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use walkdir::WalkDir;

/// Compression level for all archives; pinned so identical content gives
/// identical bytes
const COMPRESSION_LEVEL: u32 = 6;

/// Entry mtime for all archive members; pinned so archive bytes do not
/// depend on filesystem timestamps
const ENTRY_MTIME: u64 = 0;

/// Packaging options
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Caller-supplied metadata defaults; keys already recorded in the
    /// directory's metadata document win conflicts
    pub metadata_defaults: Map<String, Value>,

    /// Replace an existing archive instead of failing with
    /// [`DicompackError::ArchiveExists`]
    pub overwrite: bool,
}

impl Default for PackageOptions {
    fn default() -> Self {
        PackageOptions {
            metadata_defaults: metadata::dicom_defaults(),
            overwrite: false,
        }
    }
}

/// Packages directory `content` into a gzip tar at `path`
///
/// The metadata and digest members are refreshed inside `content` first.
/// The archive's first entry is the directory itself under `arcname`
/// (non-recursive), followed by one entry per digest line at
/// `arcname/name`.
///
/// # Errors
///
/// Fails with [`DicompackError::ArchiveExists`] when `path` exists and
/// overwrite was not requested.
pub fn create_archive(
    path: &Path,
    content: &Path,
    arcname: &str,
    options: &PackageOptions,
) -> Result<()> {
    if path.exists() && !options.overwrite {
        return Err(DicompackError::ArchiveExists(path.to_path_buf()));
    }

    metadata::merge_and_write(content, &options.metadata_defaults)?;
    let members = digest::write_digest(content)?;

    let file = File::create(path).map_err(|e| DicompackError::io(path, e))?;
    let encoder = GzEncoder::new(file, Compression::new(COMPRESSION_LEVEL));
    let mut archive = Builder::new(encoder);

    append_dir(&mut archive, path, arcname)?;
    for name in &members {
        let member_path = content.join(name);
        let arc_path = format!("{arcname}/{name}");
        append_file(&mut archive, path, &member_path, &arc_path)?;
    }

    let encoder = archive
        .into_inner()
        .map_err(|e| DicompackError::io(path, e))?;
    encoder.finish().map_err(|e| DicompackError::io(path, e))?;
    Ok(())
}

/// Appends a directory entry with pinned mode and mtime
fn append_dir(archive: &mut Builder<GzEncoder<File>>, path: &Path, arcname: &str) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    header.set_mtime(ENTRY_MTIME);
    archive
        .append_data(&mut header, format!("{arcname}/"), std::io::empty())
        .map_err(|e| DicompackError::io(path, e))
}

/// Appends a file entry with pinned mode and mtime
fn append_file(
    archive: &mut Builder<GzEncoder<File>>,
    path: &Path,
    member: &Path,
    arc_path: &str,
) -> Result<()> {
    let file = File::open(member).map_err(|e| DicompackError::io(member, e))?;
    let size = file
        .metadata()
        .map_err(|e| DicompackError::io(member, e))?
        .len();
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(size);
    header.set_mtime(ENTRY_MTIME);
    archive
        .append_data(&mut header, arc_path, file)
        .map_err(|e| DicompackError::io(path, e))
}

/// Packages every leaf directory under `sort_root` into `tar_root`
///
/// A leaf directory has no subdirectories, is not hidden and is not a
/// symlink — exactly the acquisition directories a sorting run produces.
/// The archive name is the directory's path relative to `sort_root` with
/// separators replaced by underscores, plus `.tgz`.
pub fn package_tree(
    sort_root: &Path,
    tar_root: &Path,
    options: &PackageOptions,
    reporter: &mut dyn Reporter,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(tar_root).map_err(|e| DicompackError::io(tar_root, e))?;

    let dirs = collect_leaf_dirs(sort_root);
    info!(
        "found {} directories to compress under {} (ignoring symlinks and dotfiles)",
        dirs.len(),
        sort_root.display()
    );

    let mut archives = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let relpath = dir.strip_prefix(sort_root).unwrap_or(&dir);
        let basename = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut flat_name = relpath
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("_");
        if flat_name.is_empty() {
            // The sort root itself is the leaf; name the archive after it
            flat_name = basename.clone();
        }
        let archive_path = tar_root.join(format!("{flat_name}.tgz"));
        let arcname = basename;

        create_archive(&archive_path, &dir, &arcname, options)?;
        reporter.archive_written(&dir, &archive_path);
        archives.push(archive_path);
    }
    Ok(archives)
}

/// Non-hidden, non-symlink directories with no subdirectories
fn collect_leaf_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .filter(|dir| !has_subdirectory(dir))
        .collect();
    dirs.sort();
    dirs
}

fn has_subdirectory(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        })
        .unwrap_or(false)
}
