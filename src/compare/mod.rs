/// Multi-version comparison and merge
///
/// Takes several independently parsed versions of the same XLIFF file, lines them up by
/// source text and produces one merged document.
///
/// # Overview
///
/// 1. **Alignment** - one [`ComparisonRow`] per distinct source text, with every version's
///    target, a difference flag and singleton flags
/// 2. **Change patterns** - labels showing where an edit was introduced, kept or reverted
/// 3. **Merge** - rebuilds the base (`LATEST` or first) document with the chosen targets
/// 4. **Selection config** - saves and restores per-row choices as JSON
/// 5. **Word diff** - renders the difference between two targets
///
/// # Example
///
/// ```ignore
/// use std::collections::BTreeMap;
/// use xliff_merge::compare::{align, merge};
/// use xliff_merge::{VersionSlot, parse_document, serialize_document};
///
/// let mut documents = BTreeMap::new();
/// documents.insert(VersionSlot::new(1).unwrap(), parse_document(&old_text)?);
/// documents.insert(VersionSlot::new(2).unwrap(), parse_document(&new_text)?);
///
/// let mut rows = align(&documents);
/// rows[0].selected_version = VersionSlot::new(1);
/// let merged = merge(&documents, &rows)?;
/// println!("{}", serialize_document(&merged));
/// ```
pub mod align;
pub mod diff;
pub mod merge;
pub mod pattern;
pub mod selection;


pub use align::{ComparisonRow, align, targets_differ};
pub use diff::{DiffKind, DiffPart, diff_words, tokenize};
pub use merge::{base_slot, effective_version, latest_slot, merge};
pub use pattern::{ChangePattern, detect_patterns};
pub use selection::{LoadedFile, RowSelection, SELECTION_FORMAT_VERSION, SelectionConfig};
