//! Merge Engine
//!
//! Rebuilds one document from the comparison table. The output always has the shape of the
//! base document: same segments, same order, same source markup. Only targets are taken
//! from other versions, one row at a time.

use super::align::ComparisonRow;
use crate::error::{XliffError, XliffResult};
use crate::model::{Document, Segment, VersionSlot};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Slot of the first document labelled `LATEST`, if any
pub fn latest_slot(documents: &BTreeMap<VersionSlot, Document>) -> Option<VersionSlot> {
    documents
        .iter()
        .find(|(_, doc)| doc.is_latest())
        .map(|(slot, _)| *slot)
}

/// The document whose structure the merged output follows: `LATEST`, else the lowest slot
pub fn base_slot(documents: &BTreeMap<VersionSlot, Document>) -> Option<VersionSlot> {
    latest_slot(documents).or_else(|| documents.keys().next().copied())
}

/// Version whose target a row contributes to the merged output
///
/// An explicit selection wins. Without one the base keeps its own translation when it has
/// this source; otherwise `LATEST` is preferred, then the highest slot containing it.
pub fn effective_version(
    row: &ComparisonRow,
    base: VersionSlot,
    latest: Option<VersionSlot>,
) -> Option<VersionSlot> {
    if let Some(selected) = row.selected_version {
        return Some(selected);
    }
    if row.is_present_in(base) {
        return Some(base);
    }
    if let Some(latest) = latest.filter(|l| row.is_present_in(*l)) {
        return Some(latest);
    }
    row.present_in.last().copied()
}

/// Merge the loaded documents into a new document following the base document
///
/// Base segments without a comparison row pass through unchanged, as do segments whose
/// effective version is the base itself. Sources that only exist in other versions are not
/// represented in the output.
///
/// # Errors
/// [`XliffError::NoDocuments`] when `documents` is empty
pub fn merge(
    documents: &BTreeMap<VersionSlot, Document>,
    rows: &[ComparisonRow],
) -> XliffResult<Document> {
    let base = base_slot(documents)
        .ok_or_else(|| XliffError::NoDocuments("merge needs at least one document".to_string()))?;
    let base_doc = &documents[&base];
    let latest = latest_slot(documents);

    let rows_by_source: HashMap<&str, &ComparisonRow> =
        rows.iter().map(|row| (row.source.as_str(), row)).collect();
    let mut indexes: HashMap<VersionSlot, HashMap<&str, &Segment>> = HashMap::new();

    let mut substituted = 0usize;
    let mut synthesized = 0usize;
    let mut segments = Vec::with_capacity(base_doc.segments.len());

    for segment in &base_doc.segments {
        let Some(row) = rows_by_source.get(segment.source_text()) else {
            segments.push(segment.clone());
            continue;
        };
        let effective = match effective_version(row, base, latest) {
            Some(slot) if slot != base => slot,
            _ => {
                segments.push(segment.clone());
                continue;
            }
        };

        let donor = documents.get(&effective).and_then(|doc| {
            indexes
                .entry(effective)
                .or_insert_with(|| first_by_source(doc))
                .get(segment.source_text())
                .copied()
        });

        match donor {
            Some(donor) => {
                segments.push(segment.clone().with_target_from(donor));
                substituted += 1;
            }
            None => {
                let target = row.target(effective).unwrap_or_default();
                segments.push(
                    Segment::with_plain_target(segment.id(), segment.source_markup(), target)
                        .with_note(segment.note().map(str::to_string)),
                );
                synthesized += 1;
            }
        }
    }

    info!(
        base = %base,
        segments = segments.len(),
        substituted,
        synthesized,
        "merged documents"
    );

    Ok(Document {
        segments,
        ..base_doc.clone_metadata()
    })
}

fn first_by_source(doc: &Document) -> HashMap<&str, &Segment> {
    let mut index = HashMap::with_capacity(doc.segments.len());
    for segment in &doc.segments {
        index.entry(segment.source_text()).or_insert(segment);
    }
    index
}
