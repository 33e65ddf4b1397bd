//! Selection configuration: persisting per-row version choices across sessions
//!
//! The JSON file records which documents were loaded and, for every row, the chosen
//! version. On import rows are matched by source text first and by row id second, so a
//! configuration survives re-exports that renumber ids.

use super::align::ComparisonRow;
use crate::error::{XliffError, XliffResult};
use crate::model::{Document, VersionSlot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Format tag written into every exported configuration
pub const SELECTION_FORMAT_VERSION: &str = "1.0";

/// One loaded document as recorded in a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFile {
    pub slot: VersionSlot,
    pub filename: String,
    pub label: String,
}

/// The version chosen for one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSelection {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub selected_version: Option<VersionSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionConfig {
    pub version: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<LoadedFile>,
    pub selections: Vec<RowSelection>,
}

impl SelectionConfig {
    /// Capture the loaded documents and the current selection of every row
    pub fn capture(
        documents: &BTreeMap<VersionSlot, Document>,
        rows: &[ComparisonRow],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let files = documents
            .iter()
            .map(|(slot, doc)| LoadedFile {
                slot: *slot,
                filename: doc.original_filename.clone(),
                label: doc.version_label.clone(),
            })
            .collect();
        let selections = rows
            .iter()
            .map(|row| RowSelection {
                id: row.row_id.clone(),
                source: row.source.clone(),
                selected_version: row.selected_version,
            })
            .collect();

        SelectionConfig {
            version: SELECTION_FORMAT_VERSION.to_string(),
            timestamp: Some(timestamp),
            files,
            selections,
        }
    }

    pub fn to_json(&self) -> XliffResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| XliffError::SelectionConfig(format!("failed to encode: {}", e)))
    }

    /// Read a configuration, rejecting it whole unless it has a version tag and a
    /// selections list of the expected shape
    pub fn from_json(text: &str) -> XliffResult<Self> {
        let config: SelectionConfig = serde_json::from_str(text)
            .map_err(|e| XliffError::SelectionConfig(format!("not a selection config: {}", e)))?;
        if config.version.trim().is_empty() {
            return Err(XliffError::SelectionConfig("missing version tag".to_string()));
        }
        Ok(config)
    }

    /// Apply the recorded selections to `rows`
    ///
    /// Entries without a selection, entries whose row no longer exists and selections of a
    /// version that does not contain the row are skipped silently.
    ///
    /// # Returns
    /// The number of rows whose selection was set
    pub fn apply(&self, rows: &mut [ComparisonRow]) -> usize {
        let mut by_source: HashMap<String, usize> = HashMap::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            by_source.entry(row.source.clone()).or_insert(index);
            by_id.entry(row.row_id.clone()).or_insert(index);
        }

        let mut applied = 0;
        for entry in &self.selections {
            let Some(version) = entry.selected_version else {
                continue;
            };
            let Some(&index) = by_source.get(&entry.source).or_else(|| by_id.get(&entry.id)) else {
                debug!(id = %entry.id, "selection refers to a row that no longer exists");
                continue;
            };
            let row = &mut rows[index];
            if row.is_present_in(version) {
                row.selected_version = Some(version);
                applied += 1;
            }
        }

        info!(applied, entries = self.selections.len(), "imported version selections");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::align::align;
    use crate::model::Segment;
    use chrono::TimeZone;

    fn slot(n: u8) -> VersionSlot {
        VersionSlot::new(n).unwrap()
    }

    fn documents() -> BTreeMap<VersionSlot, Document> {
        let mut first = Document::new("100");
        first.original_filename = "app (100).xlf".to_string();
        first.segments.push(Segment::new("1", "Hello", "Bonjour"));
        first.segments.push(Segment::new("2", "Bye", "Au revoir"));
        let mut second = Document::new("LATEST");
        second.original_filename = "app (latest).xlf".to_string();
        second.segments.push(Segment::new("7", "Hello", "Salut"));
        second.segments.push(Segment::new("8", "Bye", "Au revoir"));

        BTreeMap::from([(slot(1), first), (slot(2), second)])
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_capture_records_files_and_rows() {
        let docs = documents();
        let rows = align(&docs);
        let config = SelectionConfig::capture(&docs, &rows, timestamp());

        assert_eq!(config.version, SELECTION_FORMAT_VERSION);
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[1].label, "LATEST");
        assert_eq!(config.selections[0].selected_version, None);
        assert_eq!(config.selections[1].selected_version, Some(slot(1)));
    }

    #[test]
    fn test_json_shape() {
        let docs = documents();
        let config = SelectionConfig::capture(&docs, &align(&docs), timestamp());
        let json = config.to_json().unwrap();

        assert!(json.contains("\"selectedVersion\": 1"));
        assert!(json.contains("\"timestamp\": \"2024-05-01T12:30:00Z\""));
        assert_eq!(SelectionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_foreign_json_is_rejected() {
        assert!(SelectionConfig::from_json("{\"foo\": 1}").is_err());
        assert!(SelectionConfig::from_json("[]").is_err());
        assert!(SelectionConfig::from_json("{\"version\": \"\", \"selections\": []}").is_err());
        assert!(
            SelectionConfig::from_json(
                "{\"version\": \"1.0\", \"selections\": [{\"id\": \"1\", \"source\": \"a\", \"selectedVersion\": 99}]}"
            )
            .is_err()
        );
    }

    #[test]
    fn test_apply_matches_source_then_id() {
        let docs = documents();
        let mut rows = align(&docs);
        let config = SelectionConfig::from_json(
            r#"{
                "version": "1.0",
                "selections": [
                    {"id": "x", "source": "Hello", "selectedVersion": 2},
                    {"id": "2", "source": "Renamed source", "selectedVersion": 2},
                    {"id": "zz", "source": "Gone", "selectedVersion": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.apply(&mut rows), 2);
        assert_eq!(rows[0].selected_version, Some(slot(2)));
        assert_eq!(rows[1].selected_version, Some(slot(2)));
    }

    #[test]
    fn test_apply_skips_missing_selection_and_absent_version() {
        let docs = documents();
        let mut rows = align(&docs);
        rows[0].selected_version = Some(slot(1));
        let config = SelectionConfig::from_json(
            r#"{"version": "1.0", "selections": [
                {"id": "1", "source": "Hello"},
                {"id": "2", "source": "Bye", "selectedVersion": 3}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.apply(&mut rows), 0);
        assert_eq!(rows[0].selected_version, Some(slot(1)));
        assert_eq!(rows[1].selected_version, Some(slot(1)));
    }
}
