//! Archive metadata documents
//!
//! A metadata document is a JSON object stored inside the acquisition
//! directory. When packaging, caller-supplied defaults are merged with any
//! document already on disk; what is already recorded on disk wins key
//! conflicts. Timestamps use the extended-JSON `{"$date": millis}` shape.

use crate::error::{DicompackError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// File name of the metadata member inside an acquisition directory
pub const METADATA_NAME: &str = "METADATA.json";

/// Encodes a UTC timestamp as `{"$date": <milliseconds-since-epoch>}`
pub fn encode_datetime(dt: DateTime<Utc>) -> Value {
    json!({ "$date": dt.timestamp_millis() })
}

/// Decodes the `{"$date": millis}` shape back to a UTC timestamp
///
/// Any other value, including objects without a `$date` key, yields `None`
/// and should be treated as an ordinary JSON value.
pub fn decode_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value.as_object()?.get("$date")?.as_i64()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Default metadata for DICOM-origin archives
pub fn dicom_defaults() -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert("filetype".to_string(), Value::String("dicom".to_string()));
    defaults
}

/// Routing hints for downstream ingestion, nested under `overwrite`
///
/// A missing project defaults to `"unknown"`.
pub fn overwrite_hints(group: &str, project: Option<&str>) -> Value {
    json!({
        "group_name": group,
        "project_name": project.unwrap_or("unknown"),
    })
}

/// Merges `defaults` with the metadata document already inside `dir`, the
/// on-disk document winning conflicts, and persists the result
///
/// Returns the merged document. The file is written with a trailing
/// newline.
pub fn merge_and_write(dir: &Path, defaults: &Map<String, Value>) -> Result<Map<String, Value>> {
    let path = dir.join(METADATA_NAME);
    let mut merged = defaults.clone();

    if path.exists() {
        let raw = fs::read_to_string(&path).map_err(|e| DicompackError::io(&path, e))?;
        let existing: Map<String, Value> = serde_json::from_str(&raw)?;
        for (key, value) in existing {
            merged.insert(key, value);
        }
    }

    let mut body = serde_json::to_string(&Value::Object(merged.clone()))?;
    body.push('\n');
    fs::write(&path, body).map_err(|e| DicompackError::io(&path, e))?;
    Ok(merged)
}
