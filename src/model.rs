//! Core data structures for XLIFF comparison
//!
//! A [`Document`] is one parsed XLIFF file: language metadata plus an ordered list of
//! [`Segment`]s. Every segment keeps two views of its source and target: the markup
//! view with inline tags exactly as they appeared in the file, and the plain-text view
//! used for alignment and display.

use crate::xml::{escape_text, strip_markup};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved version label marking the authoritative baseline document
pub const LATEST_LABEL: &str = "LATEST";

/// Schema version assumed when a file does not declare one
pub const DEFAULT_FORMAT_VERSION: &str = "1.2";

/// Maximum number of documents that can be loaded side by side
pub const MAX_VERSIONS: u8 = 15;

/// Ordinal identifying one loaded document in a comparison session (1..=15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VersionSlot(u8);

impl VersionSlot {
    /// Create a slot, returning `None` outside 1..=15
    pub fn new(ordinal: u8) -> Option<Self> {
        if (1..=MAX_VERSIONS).contains(&ordinal) {
            Some(VersionSlot(ordinal))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All valid slots in ascending order
    pub fn all() -> impl Iterator<Item = VersionSlot> {
        (1..=MAX_VERSIONS).map(VersionSlot)
    }
}

impl TryFrom<u8> for VersionSlot {
    type Error = String;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        VersionSlot::new(ordinal)
            .ok_or_else(|| format!("version slot {} is outside 1..={}", ordinal, MAX_VERSIONS))
    }
}

impl From<VersionSlot> for u8 {
    fn from(slot: VersionSlot) -> u8 {
        slot.0
    }
}

impl fmt::Display for VersionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One translatable unit
///
/// The plain-text fields are always derived from the markup fields, so the two views
/// can never disagree. Construct with [`Segment::new`] and refine with the `with_*`
/// builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    id: String,
    source_markup: String,
    source_text: String,
    target_markup: String,
    target_text: String,
    note: Option<String>,
    state: Option<String>,
    approved: bool,
    raw_serialized: String,
}

impl Segment {
    /// Create a segment from the markup views of its source and target
    pub fn new(id: &str, source_markup: &str, target_markup: &str) -> Self {
        Segment {
            id: id.to_string(),
            source_markup: source_markup.to_string(),
            source_text: strip_markup(source_markup),
            target_markup: target_markup.to_string(),
            target_text: strip_markup(target_markup),
            note: None,
            state: None,
            approved: false,
            raw_serialized: String::new(),
        }
    }

    /// Create a segment whose target is plain text, escaping it into markup
    pub fn with_plain_target(id: &str, source_markup: &str, target_text: &str) -> Self {
        Segment::new(id, source_markup, &escape_text(target_text))
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    pub fn with_approved(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }

    pub fn with_raw_serialized(mut self, raw: &str) -> Self {
        self.raw_serialized = raw.to_string();
        self
    }

    /// Replace the target with another segment's target, state and approval
    ///
    /// Identity, source and note stay with `self`. The result no longer matches any unit
    /// in an input file, so its raw serialized form is cleared.
    pub fn with_target_from(mut self, other: &Segment) -> Self {
        self.raw_serialized.clear();
        self.target_markup = other.target_markup.clone();
        self.target_text = other.target_text.clone();
        self.state = other.state.clone();
        self.approved = other.approved;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_markup(&self) -> &str {
        &self.source_markup
    }

    /// Plain-text source, the cross-document alignment key
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn target_markup(&self) -> &str {
        &self.target_markup
    }

    pub fn target_text(&self) -> &str {
        &self.target_text
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    /// The unit exactly as it appeared in the input file (empty for synthesized segments)
    pub fn raw_serialized(&self) -> &str {
        &self.raw_serialized
    }

    /// A segment only counts as translated when its target has visible content
    pub fn has_translation(&self) -> bool {
        !self.target_markup.trim().is_empty()
    }
}

/// One parsed XLIFF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub format_version: String,
    pub source_language: String,
    pub target_language: String,
    pub original_filename: String,
    /// Short human identifier such as a build number, or [`LATEST_LABEL`]
    pub version_label: String,
    pub segments: Vec<Segment>,
}

impl Document {
    pub fn new(version_label: &str) -> Self {
        Document {
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            source_language: String::new(),
            target_language: String::new(),
            original_filename: String::new(),
            version_label: version_label.to_string(),
            segments: Vec::new(),
        }
    }

    /// Copy of the envelope metadata with no segments
    pub fn clone_metadata(&self) -> Document {
        Document {
            format_version: self.format_version.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            original_filename: self.original_filename.clone(),
            version_label: self.version_label.clone(),
            segments: Vec::new(),
        }
    }

    pub fn with_version_label(mut self, label: &str) -> Self {
        self.version_label = label.to_string();
        self
    }

    pub fn is_latest(&self) -> bool {
        self.version_label == LATEST_LABEL
    }

    /// First segment whose plain-text source equals `source_text`
    pub fn find_by_source(&self, source_text: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.source_text() == source_text)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn translated_count(&self) -> usize {
        self.segments.iter().filter(|s| s.has_translation()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_slot_range() {
        assert!(VersionSlot::new(0).is_none());
        assert_eq!(VersionSlot::new(1).map(VersionSlot::get), Some(1));
        assert_eq!(VersionSlot::new(15).map(VersionSlot::get), Some(15));
        assert!(VersionSlot::new(16).is_none());
        assert_eq!(VersionSlot::all().count(), 15);
    }

    #[test]
    fn test_version_slot_serde_validates() {
        let slot: VersionSlot = serde_json::from_str("3").unwrap();
        assert_eq!(slot.get(), 3);
        assert_eq!(serde_json::to_string(&slot).unwrap(), "3");
        assert!(serde_json::from_str::<VersionSlot>("0").is_err());
        assert!(serde_json::from_str::<VersionSlot>("16").is_err());
    }

    #[test]
    fn test_segment_derives_plain_text() {
        let segment = Segment::new("1", "Click <g id=\"1\">here</g> &amp; go", "Cliquez <g id=\"1\">ici</g>");

        assert_eq!(segment.source_text(), "Click here & go");
        assert_eq!(segment.target_text(), "Cliquez ici");
        assert_eq!(segment.source_markup(), "Click <g id=\"1\">here</g> &amp; go");
    }

    #[test]
    fn test_plain_target_is_escaped() {
        let segment = Segment::with_plain_target("7", "Fish", "Poisson & <frites>");

        assert_eq!(segment.target_markup(), "Poisson &amp; &lt;frites&gt;");
        assert_eq!(segment.target_text(), "Poisson & <frites>");
    }

    #[test]
    fn test_has_translation_ignores_whitespace() {
        assert!(!Segment::new("1", "Hello", "   ").has_translation());
        assert!(!Segment::new("1", "Hello", "").has_translation());
        assert!(Segment::new("1", "Hello", "Bonjour").has_translation());
    }

    #[test]
    fn test_with_target_from_keeps_identity() {
        let base = Segment::new("a", "Hello", "Bonjour").with_note(Some("greeting".to_string()));
        let other = Segment::new("b", "Hello", "Salut")
            .with_state(Some("final".to_string()))
            .with_approved(true);

        let merged = base.with_target_from(&other);
        assert_eq!(merged.id(), "a");
        assert_eq!(merged.target_text(), "Salut");
        assert_eq!(merged.state(), Some("final"));
        assert!(merged.approved());
        assert_eq!(merged.note(), Some("greeting"));
        assert_eq!(merged.raw_serialized(), "");
    }

    #[test]
    fn test_find_by_source_first_match_wins() {
        let mut doc = Document::new("1");
        doc.segments.push(Segment::new("1", "Save", "Enregistrer"));
        doc.segments.push(Segment::new("2", "Save", "Sauver"));

        assert_eq!(doc.find_by_source("Save").map(Segment::id), Some("1"));
        assert!(doc.find_by_source("Cancel").is_none());
    }
}
