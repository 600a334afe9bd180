//! Deterministic member manifests
//!
//! The digest lists every member of a directory about to be archived, one
//! name per line. Its ordering depends only on the member names, never on
//! the filesystem's native listing order: JSON documents first, text/log
//! files second, everything else lexical.

use crate::error::{DicompackError, Result};
use std::fs;
use std::path::Path;

/// File name of the digest member inside an acquisition directory
pub const DIGEST_NAME: &str = "DIGEST.txt";

fn rank(name: &str) -> u8 {
    if name.ends_with(".json") {
        0
    } else if name.ends_with(".txt") || name.ends_with(".log") {
        1
    } else {
        2
    }
}

/// Member names of `dir` in digest order
pub fn member_order(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| DicompackError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DicompackError::io(dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    Ok(names)
}

/// Writes the digest member of `dir` and returns the listed names
///
/// The digest file is created before the directory is listed so that it
/// names itself. One name per line, trailing newline.
pub fn write_digest(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(DIGEST_NAME);
    fs::write(&path, b"").map_err(|e| DicompackError::io(&path, e))?;
    let names = member_order(dir)?;
    let mut body = names.join("\n");
    body.push('\n');
    fs::write(&path, body).map_err(|e| DicompackError::io(&path, e))?;
    Ok(names)
}
