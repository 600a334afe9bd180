//! Streaming content checksums
//!
//! Used only to compare a candidate file against an already-placed file of
//! the same target name, never persisted beyond the pipeline run.

use crate::error::{DicompackError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer size for checksum streaming
const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(pub [u8; 32]);

impl Checksum {
    /// Hex rendering, used in conflict reports
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Computes the checksum of a file by streaming it in fixed-size chunks
///
/// Large files are never loaded into memory at once.
pub fn file_checksum(path: &Path) -> Result<Checksum> {
    let mut file = File::open(path).map_err(|e| DicompackError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| DicompackError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Checksum(hasher.finalize().into()))
}
