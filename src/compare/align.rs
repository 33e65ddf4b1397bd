//! Alignment Engine
//!
//! Builds the cross-version comparison table. Segments are matched on their plain-text
//! source, never on their id: independently exported versions of the same file routinely
//! give the same string different ids.

use super::pattern::{ChangePattern, detect_patterns};
use crate::model::{Document, Segment, VersionSlot};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One distinct source text and what every loaded version did with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    /// Id of the first segment that supplied this source, for display only
    pub row_id: String,
    /// Plain-text source used as the alignment key
    pub source: String,
    /// Plain-text target for every version that contains this source
    pub targets: BTreeMap<VersionSlot, String>,
    /// At least two non-empty targets exist and they are not all the same
    pub is_different: bool,
    /// Set when exactly one version contains this source
    pub only_in: Option<VersionSlot>,
    /// Versions containing this source, in ascending slot order; never empty
    pub present_in: Vec<VersionSlot>,
    pub selected_version: Option<VersionSlot>,
    /// Change-pattern labels, only computed for differing rows
    pub patterns: BTreeMap<VersionSlot, ChangePattern>,
}

impl ComparisonRow {
    /// Target text recorded for `slot`, if that version contains this source
    pub fn target(&self, slot: VersionSlot) -> Option<&str> {
        self.targets.get(&slot).map(String::as_str)
    }

    pub fn is_present_in(&self, slot: VersionSlot) -> bool {
        self.present_in.contains(&slot)
    }

    pub fn is_singleton(&self) -> bool {
        self.only_in.is_some()
    }

    pub fn pattern(&self, slot: VersionSlot) -> Option<ChangePattern> {
        self.patterns.get(&slot).copied()
    }
}

/// First segment per source text, since duplicates inside one document are not distinguished
fn index_by_source(doc: &Document) -> HashMap<&str, &Segment> {
    let mut index = HashMap::with_capacity(doc.segments.len());
    for segment in &doc.segments {
        index.entry(segment.source_text()).or_insert(segment);
    }
    index
}

/// True when at least two non-empty targets exist and they are not all equal
pub fn targets_differ<'a>(targets: impl IntoIterator<Item = &'a str>) -> bool {
    let mut present = targets.into_iter().filter(|t| !t.is_empty());
    let Some(first) = present.next() else {
        return false;
    };
    present.any(|t| t != first)
}

/// Align the loaded documents into one comparison row per distinct source text
///
/// Rows appear in first-seen order: all sources of the lowest slot in document order, then
/// the sources only the next slot adds, and so on. With fewer than two documents there is
/// nothing to compare and no rows are produced.
pub fn align(documents: &BTreeMap<VersionSlot, Document>) -> Vec<ComparisonRow> {
    if documents.len() < 2 {
        return Vec::new();
    }

    let indexes: Vec<(VersionSlot, HashMap<&str, &Segment>)> = documents
        .iter()
        .map(|(slot, doc)| (*slot, index_by_source(doc)))
        .collect();

    let mut sources: IndexMap<&str, &str> = IndexMap::new();
    for doc in documents.values() {
        for segment in &doc.segments {
            sources.entry(segment.source_text()).or_insert(segment.id());
        }
    }

    let rows: Vec<ComparisonRow> = sources
        .iter()
        .map(|(source, row_id)| build_row(source, row_id, &indexes))
        .collect();

    debug!(
        documents = documents.len(),
        rows = rows.len(),
        different = rows.iter().filter(|r| r.is_different).count(),
        "aligned documents"
    );

    rows
}

fn build_row(
    source: &str,
    row_id: &str,
    indexes: &[(VersionSlot, HashMap<&str, &Segment>)],
) -> ComparisonRow {
    let mut targets = BTreeMap::new();
    let mut present_in = Vec::new();
    for (slot, index) in indexes {
        if let Some(segment) = index.get(source) {
            present_in.push(*slot);
            targets.insert(*slot, segment.target_text().to_string());
        }
    }

    let is_different = targets_differ(targets.values().map(String::as_str));
    let only_in = match present_in.as_slice() {
        [single] => Some(*single),
        _ => None,
    };

    // Versions that agree need no decision; the lowest slot speaks for them
    let selected_version = if present_in.len() > 1 && !is_different {
        present_in.first().copied()
    } else {
        None
    };

    let patterns = if is_different {
        detect_patterns(&targets)
    } else {
        BTreeMap::new()
    };

    ComparisonRow {
        row_id: row_id.to_string(),
        source: source.to_string(),
        targets,
        is_different,
        only_in,
        present_in,
        selected_version,
        patterns,
    }
}
