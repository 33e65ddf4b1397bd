use chrono::{DateTime, Utc};
use icu_locale::Locale;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub mod compare;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod serializer;
pub mod xml;

// Re-export the main types for convenient access
pub use compare::{
    ChangePattern, ComparisonRow, DiffKind, DiffPart, SelectionConfig, align, diff_words, merge,
};
pub use error::{XliffError, XliffResult};
pub use loader::{infer_version_label, load_document_from_file, merge_file_name};
pub use model::{Document, LATEST_LABEL, MAX_VERSIONS, Segment, VersionSlot};
pub use parser::{parse_document, repair_entities};
pub use serializer::serialize_document;

/// Counts describing the current comparison table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub documents: usize,
    pub rows: usize,
    pub different: usize,
    pub singletons: usize,
    pub selected: usize,
}

/// The loaded documents and the comparison table derived from them
///
/// Every change to the loaded set recomputes the table from scratch; selections made on
/// the previous table are dropped. The table is handed out as an [`Arc`] snapshot, and
/// selection changes copy it rather than touching a snapshot someone else still holds.
pub struct Session {
    // Keyed by slot, iterated in ascending slot order
    documents: BTreeMap<VersionSlot, Document>,
    rows: Arc<Vec<ComparisonRow>>,
    warnings: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            documents: BTreeMap::new(),
            rows: Arc::new(Vec::new()),
            warnings: Vec::new(),
        }
    }

    /// Load a document into the lowest free slot
    pub fn load(&mut self, document: Document) -> XliffResult<VersionSlot> {
        let slot = VersionSlot::all()
            .find(|slot| !self.documents.contains_key(slot))
            .ok_or_else(|| {
                XliffError::SlotOutOfRange(format!("all {} version slots are in use", MAX_VERSIONS))
            })?;
        self.load_into(slot, document)?;
        Ok(slot)
    }

    /// Parse `text` and load it into the lowest free slot
    ///
    /// A parse failure leaves the session untouched.
    pub fn load_str(&mut self, text: &str, version_label: &str) -> XliffResult<VersionSlot> {
        let document = parse_document(text)?.with_version_label(version_label);
        self.load(document)
    }

    /// Load a document into a specific, currently empty slot
    pub fn load_into(&mut self, slot: VersionSlot, document: Document) -> XliffResult<()> {
        if self.documents.contains_key(&slot) {
            return Err(XliffError::SlotOccupied(slot));
        }
        info!(
            slot = %slot,
            label = %document.version_label,
            segments = document.segments.len(),
            "loaded document"
        );
        self.documents.insert(slot, document);
        self.realign();
        Ok(())
    }

    /// Swap the document in `slot`, returning the previous one
    pub fn replace(&mut self, slot: VersionSlot, document: Document) -> XliffResult<Document> {
        let entry = self
            .documents
            .get_mut(&slot)
            .ok_or(XliffError::UnknownSlot(slot))?;
        let previous = std::mem::replace(entry, document);
        info!(slot = %slot, "replaced document");
        self.realign();
        Ok(previous)
    }

    /// Unload the document in `slot`, freeing the slot
    pub fn remove(&mut self, slot: VersionSlot) -> XliffResult<Document> {
        let removed = self
            .documents
            .remove(&slot)
            .ok_or(XliffError::UnknownSlot(slot))?;
        info!(slot = %slot, "removed document");
        self.realign();
        Ok(removed)
    }

    /// Unload everything
    pub fn reset(&mut self) {
        self.documents.clear();
        self.realign();
    }

    fn realign(&mut self) {
        self.rows = Arc::new(align(&self.documents));
        self.warnings = load_warnings(&self.documents);
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }

    pub fn documents(&self) -> &BTreeMap<VersionSlot, Document> {
        &self.documents
    }

    pub fn document(&self, slot: VersionSlot) -> Option<&Document> {
        self.documents.get(&slot)
    }

    /// Snapshot of the comparison table
    pub fn rows(&self) -> Arc<Vec<ComparisonRow>> {
        Arc::clone(&self.rows)
    }

    pub fn row(&self, source: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|row| row.source == source)
    }

    /// Anomalies noticed in the loaded set, such as two documents labelled `LATEST`
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Slot of the document the merged output follows
    pub fn base_slot(&self) -> Option<VersionSlot> {
        compare::base_slot(&self.documents)
    }

    /// Choose which version's target the row for `source` contributes to the merge
    pub fn select_version(&mut self, source: &str, version: VersionSlot) -> XliffResult<()> {
        let index = self.row_index(source)?;
        if !self.rows[index].is_present_in(version) {
            return Err(XliffError::SlotOutOfRange(format!(
                "version {} does not contain source {:?}",
                version, source
            )));
        }
        Arc::make_mut(&mut self.rows)[index].selected_version = Some(version);
        Ok(())
    }

    /// Drop the selection for the row of `source`, falling back to the merge defaults
    pub fn clear_selection(&mut self, source: &str) -> XliffResult<()> {
        let index = self.row_index(source)?;
        Arc::make_mut(&mut self.rows)[index].selected_version = None;
        Ok(())
    }

    fn row_index(&self, source: &str) -> XliffResult<usize> {
        self.rows
            .iter()
            .position(|row| row.source == source)
            .ok_or_else(|| XliffError::UnknownRow(source.to_string()))
    }

    pub fn merge(&self) -> XliffResult<Document> {
        merge(&self.documents, &self.rows)
    }

    /// Merge and serialize in one step
    pub fn merge_to_string(&self) -> XliffResult<String> {
        Ok(serialize_document(&self.merge()?))
    }

    pub fn export_selections(&self, timestamp: DateTime<Utc>) -> SelectionConfig {
        SelectionConfig::capture(&self.documents, &self.rows, timestamp)
    }

    /// Apply a previously exported configuration, returning how many rows it changed
    pub fn import_selections(&mut self, config: &SelectionConfig) -> usize {
        config.apply(Arc::make_mut(&mut self.rows).as_mut_slice())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            documents: self.documents.len(),
            rows: self.rows.len(),
            different: self.rows.iter().filter(|r| r.is_different).count(),
            singletons: self.rows.iter().filter(|r| r.is_singleton()).count(),
            selected: self.rows.iter().filter(|r| r.selected_version.is_some()).count(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical BCP-47 form of a language code, e.g. `fr_fr` becomes `fr-FR`
///
/// Codes that are not valid language tags are only lowercased.
pub fn canonical_language(code: &str) -> String {
    let normalized = code.trim().replace('_', "-");
    match normalized.parse::<Locale>() {
        Ok(locale) => locale.to_string(),
        Err(_) => normalized.to_lowercase(),
    }
}

fn load_warnings(documents: &BTreeMap<VersionSlot, Document>) -> Vec<String> {
    let mut warnings = Vec::new();

    let latest: Vec<String> = documents
        .iter()
        .filter(|(_, doc)| doc.is_latest())
        .map(|(slot, _)| slot.to_string())
        .collect();
    if latest.len() > 1 {
        warnings.push(format!(
            "{} is claimed by slots {}; slot {} is used as the baseline",
            LATEST_LABEL,
            latest.join(", "),
            latest[0]
        ));
    }

    let mut languages: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (slot, doc) in documents {
        if !doc.target_language.trim().is_empty() {
            languages
                .entry(canonical_language(&doc.target_language))
                .or_default()
                .push(slot.to_string());
        }
    }
    if languages.len() > 1 {
        let described: Vec<String> = languages
            .iter()
            .map(|(language, slots)| format!("{} (slots {})", language, slots.join(", ")))
            .collect();
        warnings.push(format!(
            "loaded documents have different target languages: {}",
            described.join(", ")
        ));
    }

    warnings
}
