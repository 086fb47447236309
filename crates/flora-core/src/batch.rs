//! Batches of mapped records and their JSON interchange file.
//!
//! A harvest run writes its batch as a UTF-8 JSON array of objects; a
//! separate load run reads it back and hands it to the persister.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::record::SparseRecord;

/// An ordered batch of sparse records produced by one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesBatch {
    records: Vec<SparseRecord>,
}

impl SpeciesBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SparseRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SparseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse a batch from interchange JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            Error::Serialization(format!("batch is not a JSON array of objects: {}", e))
        })
    }

    /// Render the batch as pretty-printed interchange JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a batch file. A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "batch file '{}' not found",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        let batch = Self::from_json(&text)?;
        info!(
            subsystem = "core",
            component = "batch",
            op = "load",
            record_count = batch.len(),
            path = %path.display(),
            "Loaded species batch"
        );
        Ok(batch)
    }

    /// Write the batch to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!(
            subsystem = "core",
            component = "batch",
            op = "save",
            record_count = self.len(),
            path = %path.display(),
            "Saved species batch"
        );
        Ok(())
    }
}

impl From<Vec<SparseRecord>> for SpeciesBatch {
    fn from(records: Vec<SparseRecord>) -> Self {
        Self { records }
    }
}

impl IntoIterator for SpeciesBatch {
    type Item = SparseRecord;
    type IntoIter = std::vec::IntoIter<SparseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn apple() -> SparseRecord {
        let mut record = SparseRecord::new();
        record.insert("id", FieldValue::Int(1)).unwrap();
        record
            .insert("scientific_name", FieldValue::Text("Malus domestica".into()))
            .unwrap();
        record
            .insert("edible_part", FieldValue::Text(r#"["fruit"]"#.into()))
            .unwrap();
        record
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");

        let batch = SpeciesBatch::from(vec![apple()]);
        batch.save(&path).unwrap();
        let loaded = SpeciesBatch::load(&path).unwrap();

        assert_eq!(loaded, batch);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SpeciesBatch::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        let err = SpeciesBatch::from_json(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_json_accepts_php_style_output() {
        let text = r#"[
            {"id": 5, "common_name": "Garlic", "edible": 1, "status": null,
             "duration": "[\"Perennial\"]", "last_updated": "2023-05-01"}
        ]"#;
        let batch = SpeciesBatch::from_json(text).unwrap();
        let record = &batch.records()[0];
        assert_eq!(record.id(), Some(5));
        assert_eq!(record.get("status"), Some(&FieldValue::Null));
        assert!(!record.contains("last_updated"));
    }
}
