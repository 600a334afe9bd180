use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for dicompack operations
pub type Result<T> = std::result::Result<T, DicompackError>;

/// Error types for dicompack operations
#[derive(Error, Debug)]
pub enum DicompackError {
    /// The file is not parseable as a DICOM instance.
    ///
    /// Expected for arbitrary directory trees; callers skip and log.
    #[error("not a DICOM file: {}", .path.display())]
    NotDicom { path: PathBuf },

    /// A structurally valid DICOM file lacks a field needed for grouping
    #[error("missing {} in {}", .field, .path.display())]
    MissingField { field: &'static str, path: PathBuf },

    /// Target archive path already exists and overwrite was not requested
    #[error("archive already exists: {}", .0.display())]
    ArchiveExists(PathBuf),

    /// An archive member would resolve outside the extraction destination
    #[error("archive member escapes destination: {member}")]
    PathTraversal { member: String },

    /// An extracted archive does not contain exactly one top-level directory
    #[error("unexpected archive layout: {0}")]
    BadArchiveLayout(String),

    /// I/O error, carrying the offending path
    #[error("{}: {}", .path.display(), .source)]
    Io { path: PathBuf, source: io::Error },

    /// Metadata document encoding/decoding error
    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DicompackError {
    /// Wraps an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DicompackError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only invalidates a single file of a batch walk
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            DicompackError::NotDicom { .. } | DicompackError::MissingField { .. }
        )
    }
}
