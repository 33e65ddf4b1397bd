use crate::model::VersionSlot;

/// Error types for loading, aligning and merging XLIFF documents
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XliffError {
    /// The input could not be read as well-formed XML, even after entity repair
    #[error("Parse error: {0}")]
    Parse(String),
    /// An operation that needs at least one loaded document was called on an empty session
    #[error("No documents loaded: {0}")]
    NoDocuments(String),
    /// A version slot outside 1..=15 was requested, or every slot is taken
    #[error("Version slot out of range: {0}")]
    SlotOutOfRange(String),
    /// A document is already loaded in the requested slot
    #[error("Version slot {0} is already occupied")]
    SlotOccupied(VersionSlot),
    /// No document is loaded in the requested slot
    #[error("No document loaded in version slot {0}")]
    UnknownSlot(VersionSlot),
    /// No comparison row carries the requested source text
    #[error("No comparison row for source {0:?}")]
    UnknownRow(String),
    /// A selection configuration was rejected as a whole
    #[error("Selection config error: {0}")]
    SelectionConfig(String),
    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for XLIFF operations
pub type XliffResult<T> = Result<T, XliffError>;
