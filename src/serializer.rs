//! XLIFF 1.2 writer
//!
//! Source and target markup are written verbatim: they were captured from a well-formed
//! file (or escaped on construction) and must not be escaped a second time.

use crate::model::{Document, Segment};
use crate::xml::{escape_attribute, escape_text};

const XMLNS_PREFIX: &str = "urn:oasis:names:tc:xliff:document:";
const DATATYPE: &str = "plaintext";

/// Serialize a document to XLIFF text
///
/// Segments without a translation (empty or whitespace-only target markup) are left out
/// so that importing the output never blanks an existing translation.
pub fn serialize_document(doc: &Document) -> String {
    let version = escape_attribute(&doc.format_version);
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<xliff version=\"{}\" xmlns=\"{}{}\">\n",
        version, XMLNS_PREFIX, version
    ));

    out.push_str("  <file");
    out.push_str(&attribute("source-language", &doc.source_language));
    out.push_str(&attribute("target-language", &doc.target_language));
    out.push_str(&attribute("datatype", DATATYPE));
    out.push_str(&attribute("original", &doc.original_filename));
    out.push_str(">\n    <body>\n");

    for segment in doc.segments.iter().filter(|s| s.has_translation()) {
        out.push_str(&render_unit(segment, "      "));
    }

    out.push_str("    </body>\n  </file>\n</xliff>\n");
    out
}

/// Render one `trans-unit` element, each line prefixed with `indent`
pub fn render_unit(segment: &Segment, indent: &str) -> String {
    let approved = if segment.approved() { " approved=\"yes\"" } else { "" };
    let state = segment
        .state()
        .map(|state| format!(" state=\"{}\"", escape_attribute(state)))
        .unwrap_or_default();

    let mut out = format!(
        "{indent}<trans-unit id=\"{}\"{}>\n",
        escape_attribute(segment.id()),
        approved
    );
    out.push_str(&format!("{indent}  <source>{}</source>\n", segment.source_markup()));
    out.push_str(&format!(
        "{indent}  <target{}>{}</target>\n",
        state,
        segment.target_markup()
    ));
    if let Some(note) = segment.note() {
        out.push_str(&format!("{indent}  <note>{}</note>\n", escape_text(note)));
    }
    out.push_str(&format!("{indent}</trans-unit>\n"));
    out
}

/// ` name="value"`, or nothing for an empty value
fn attribute(name: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(" {}=\"{}\"", name, escape_attribute(value))
    }
}
