//! DICOM header reading for acquisition grouping
//!
//! Reads just enough of a candidate file to decide where it belongs:
//! the identity fields used by [`crate::classify::AcquisitionKey`].
//! Bulk pixel data is never loaded.

use crate::error::{DicompackError, Result};
use dicom_core::Tag;
use dicom_object::{InMemDicomObject, OpenFileOptions};
use std::path::Path;

// Identification tags
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const ACQUISITION_NUMBER: Tag = Tag(0x0020, 0x0012);
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Helper to get integer value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to i32
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// The subset of header fields needed to classify a file into an
/// acquisition directory
///
/// Derived once per file and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    /// Opaque identifier of the imaging session
    pub study_instance_uid: String,

    /// Human-facing session code
    pub study_id: String,

    /// Series number within the study
    pub series_number: i32,

    /// Acquisition number within the series; DICOM files commonly omit
    /// it, in which case it reads as 1
    pub acquisition_number: i32,

    /// Scanner manufacturer, if recorded
    pub manufacturer: Option<String>,
}

/// Reads the grouping fields from a DICOM file without loading pixel data
///
/// # Errors
///
/// Returns [`DicompackError::NotDicom`] when the file is not structured as
/// a DICOM instance, and [`DicompackError::MissingField`] when a required
/// identity field is absent. Both are per-file outcomes: batch callers log
/// them and move on.
pub fn read_header(path: &Path) -> Result<HeaderFields> {
    let dcm = OpenFileOptions::new()
        .read_until(PIXEL_DATA)
        .open_file(path)
        .map_err(|_| DicompackError::NotDicom {
            path: path.to_path_buf(),
        })?;

    let missing = |field: &'static str| DicompackError::MissingField {
        field,
        path: path.to_path_buf(),
    };

    Ok(HeaderFields {
        study_instance_uid: get_string_value(&dcm, STUDY_INSTANCE_UID)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("StudyInstanceUID"))?,
        study_id: get_string_value(&dcm, STUDY_ID).ok_or_else(|| missing("StudyID"))?,
        series_number: get_int_value(&dcm, SERIES_NUMBER).ok_or_else(|| missing("SeriesNumber"))?,
        acquisition_number: get_int_value(&dcm, ACQUISITION_NUMBER).unwrap_or(1),
        manufacturer: get_string_value(&dcm, MANUFACTURER),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_header_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dcm");
        test_support::write_dicom(&path, "1.2.3.4", "42", 3, Some(7), Some("GE"));

        let fields = read_header(&path).unwrap();
        assert_eq!(fields.study_instance_uid, "1.2.3.4");
        assert_eq!(fields.study_id, "42");
        assert_eq!(fields.series_number, 3);
        assert_eq!(fields.acquisition_number, 7);
        assert_eq!(fields.manufacturer.as_deref(), Some("GE"));
    }

    #[test]
    fn test_acquisition_number_defaults_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dcm");
        test_support::write_dicom(&path, "1.2.3.4", "42", 3, None, Some("GE"));

        let fields = read_header(&path).unwrap();
        assert_eq!(fields.acquisition_number, 1);
    }

    #[test]
    fn test_missing_study_id_is_a_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dcm");
        test_support::write_dicom_without_study_id(&path, "1.2.3.4");

        match read_header(&path) {
            Err(err @ DicompackError::MissingField { field, .. }) if field == "StudyID" => {
                assert!(err.is_per_file());
            }
            other => panic!("expected MissingField for StudyID, got {:?}", other),
        }
    }

    #[test]
    fn test_non_dicom_file_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"just some text").unwrap();

        match read_header(&path) {
            Err(DicompackError::NotDicom { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotDicom, got {:?}", other),
        }
    }
}
