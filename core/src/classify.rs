//! Acquisition classification
//!
//! Maps the header fields of a DICOM file to the acquisition directory it
//! belongs in. The key is a value type built by one pure function so the
//! naming policy lives in exactly one place.

use crate::header::HeaderFields;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name suffix for acquisition directories
pub const ACQ_DIR_SUFFIX: &str = "_dicoms";

/// Composite identifier of one acquisition within a study
///
/// Two files with equal `StudyInstanceUID` and equal `AcquisitionKey`
/// always land in the same acquisition directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcquisitionKey {
    /// Human-facing session code
    pub study_id: String,

    /// Series number within the study
    pub series_number: i32,

    /// Acquisition number; `None` for Siemens scanners, whose multi-file
    /// series do not vary meaningfully by acquisition number
    pub acquisition_number: Option<i32>,
}

impl AcquisitionKey {
    /// Derives the key from parsed header fields
    ///
    /// The acquisition number is included exactly when the manufacturer is
    /// not `"SIEMENS"` (case-insensitive).
    pub fn from_header(fields: &HeaderFields) -> Self {
        let siemens = fields
            .manufacturer
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("SIEMENS"))
            .unwrap_or(false);

        AcquisitionKey {
            study_id: fields.study_id.clone(),
            series_number: fields.series_number,
            acquisition_number: if siemens {
                None
            } else {
                Some(fields.acquisition_number)
            },
        }
    }

    /// Renders the acquisition directory name, e.g. `42_3_7_dicoms`
    pub fn dir_name(&self) -> String {
        match self.acquisition_number {
            Some(acq) => format!(
                "{}_{}_{}{}",
                self.study_id, self.series_number, acq, ACQ_DIR_SUFFIX
            ),
            None => format!("{}_{}{}", self.study_id, self.series_number, ACQ_DIR_SUFFIX),
        }
    }
}

impl fmt::Display for AcquisitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}

/// Computes the acquisition directory for a classified file:
/// `sort_root/StudyInstanceUID/key.dir_name()`
pub fn acquisition_dir(sort_root: &Path, fields: &HeaderFields, key: &AcquisitionKey) -> PathBuf {
    sort_root
        .join(&fields.study_instance_uid)
        .join(key.dir_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fields(manufacturer: Option<&str>) -> HeaderFields {
        HeaderFields {
            study_instance_uid: "1.2.3.4".to_string(),
            study_id: "42".to_string(),
            series_number: 3,
            acquisition_number: 7,
            manufacturer: manufacturer.map(str::to_string),
        }
    }

    #[rstest]
    #[case(Some("SIEMENS"), "42_3_dicoms")]
    #[case(Some("Siemens"), "42_3_dicoms")]
    #[case(Some("siemens"), "42_3_dicoms")]
    #[case(Some("GE"), "42_3_7_dicoms")]
    #[case(Some("Philips"), "42_3_7_dicoms")]
    #[case(None, "42_3_7_dicoms")]
    fn test_manufacturer_rule(#[case] manufacturer: Option<&str>, #[case] expected: &str) {
        let key = AcquisitionKey::from_header(&fields(manufacturer));
        assert_eq!(key.dir_name(), expected);
    }

    #[test]
    fn test_key_is_stable_per_study() {
        let a = AcquisitionKey::from_header(&fields(Some("GE")));
        let b = AcquisitionKey::from_header(&fields(Some("GE")));
        assert_eq!(a, b);
        assert_eq!(
            acquisition_dir(Path::new("/sorted"), &fields(Some("GE")), &a),
            acquisition_dir(Path::new("/sorted"), &fields(Some("GE")), &b),
        );
    }

    #[test]
    fn test_acquisition_dir_layout() {
        let f = fields(Some("GE"));
        let key = AcquisitionKey::from_header(&f);
        assert_eq!(
            acquisition_dir(Path::new("/sorted"), &f, &key),
            Path::new("/sorted/1.2.3.4/42_3_7_dicoms")
        );
    }
}
