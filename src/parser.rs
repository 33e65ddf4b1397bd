//! XLIFF 1.2 document parser
//!
//! Real-world exports are often not quite well-formed: the most common defect is a bare
//! `&` in source text. [`repair_entities`] escapes those before the text reaches the XML
//! reader; anything still broken after that is reported as [`XliffError::Parse`].

use crate::error::{XliffError, XliffResult};
use crate::model::{DEFAULT_FORMAT_VERSION, Document, Segment};
use crate::xml::{XmlElement, parse_tree};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static AMPERSAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(amp;|lt;|gt;|quot;|apos;|#[0-9]+;|#[xX][0-9a-fA-F]+;)?").expect("valid regex")
});

static CDATA_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>").expect("valid regex"));

const UNIT_TAG: &str = "trans-unit";
const FILE_TAG: &str = "file";
const SOURCE_TAG: &str = "source";
const TARGET_TAG: &str = "target";
const NOTE_TAG: &str = "note";

/// Escape every `&` that does not start a predefined XML entity or a numeric character
/// reference
///
/// CDATA sections are left untouched since a literal `&` is legal there.
///
/// # Returns
/// The repaired text and the number of ampersands that were escaped
pub fn repair_entities(text: &str) -> (String, usize) {
    let mut repaired = String::with_capacity(text.len());
    let mut count = 0;
    let mut last = 0;

    for cdata in CDATA_SECTION.find_iter(text) {
        count += repair_span(&text[last..cdata.start()], &mut repaired);
        repaired.push_str(cdata.as_str());
        last = cdata.end();
    }
    count += repair_span(&text[last..], &mut repaired);

    (repaired, count)
}

fn repair_span(span: &str, out: &mut String) -> usize {
    let mut count = 0;
    let replaced = AMPERSAND.replace_all(span, |caps: &regex::Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            count += 1;
            "&amp;".to_string()
        }
    });
    out.push_str(&replaced);
    count
}

/// Parse XLIFF text into a [`Document`]
///
/// Every `trans-unit` in the file is collected into one flat list in document order,
/// whether it sits directly in a `body`, inside nested `group`s or in a later `file`
/// section. Metadata comes from the root element and the first `file` element. Units
/// without a target are kept with an empty target.
///
/// The returned document has an empty version label; callers assign one.
///
/// # Errors
/// [`XliffError::Parse`] when the text is not well-formed XML after entity repair. No
/// partial document is ever returned.
pub fn parse_document(text: &str) -> XliffResult<Document> {
    let (repaired, repairs) = repair_entities(text);
    if repairs > 0 {
        warn!(repairs, "escaped unencoded ampersands before parsing");
    }

    let root = parse_tree(&repaired)?;
    let file = root.find_first(FILE_TAG);

    let mut document = Document::new("");
    document.format_version = root
        .attribute("version")
        .or_else(|| file.and_then(|f| f.attribute("version")))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_FORMAT_VERSION)
        .to_string();
    if let Some(file) = file {
        document.source_language = file.attribute("source-language").unwrap_or_default().to_string();
        document.target_language = file.attribute("target-language").unwrap_or_default().to_string();
        document.original_filename = file.attribute("original").unwrap_or_default().to_string();
    }

    let mut units = Vec::new();
    root.collect(UNIT_TAG, &mut units);
    document.segments = units
        .iter()
        .enumerate()
        .map(|(index, unit)| parse_unit(&repaired, unit, index))
        .collect();

    debug!(
        segments = document.segments.len(),
        translated = document.translated_count(),
        source_language = %document.source_language,
        target_language = %document.target_language,
        "parsed XLIFF document"
    );

    Ok(document)
}

fn parse_unit(text: &str, unit: &XmlElement, index: usize) -> Segment {
    // Units without an id get their 1-based position so rows still have a handle
    let id = match unit.attribute("id") {
        Some(id) => id.to_string(),
        None => (index + 1).to_string(),
    };
    let source = unit.child(SOURCE_TAG);
    let target = unit.child(TARGET_TAG);
    let note = unit.child(NOTE_TAG).map(XmlElement::text);
    let state = target.and_then(|t| t.attribute("state")).map(str::to_string);
    let approved = unit
        .attribute("approved")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("yes"));

    Segment::new(&id, inner_markup(text, source), inner_markup(text, target))
        .with_note(note)
        .with_state(state)
        .with_approved(approved)
        .with_raw_serialized(&text[unit.span.clone()])
}

fn inner_markup<'a>(text: &'a str, element: Option<&XmlElement>) -> &'a str {
    element.map(|e| &text[e.inner.clone()]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file source-language="en" target-language="fr" datatype="plaintext" original="messages.xlf">
    <body>
      <trans-unit id="greeting" approved="yes">
        <source>Hello <g id="1">world</g></source>
        <target state="translated">Bonjour <g id="1">le monde</g></target>
        <note>Shown on the home page</note>
      </trans-unit>
      <group id="menu">
        <trans-unit id="save">
          <source>Save</source>
        </trans-unit>
      </group>
    </body>
  </file>
</xliff>"#;

    #[test]
    fn test_parse_metadata() {
        let doc = parse_document(SAMPLE).unwrap();

        assert_eq!(doc.format_version, "1.2");
        assert_eq!(doc.source_language, "en");
        assert_eq!(doc.target_language, "fr");
        assert_eq!(doc.original_filename, "messages.xlf");
        assert_eq!(doc.version_label, "");
    }

    #[test]
    fn test_parse_segment_views() {
        let doc = parse_document(SAMPLE).unwrap();
        let greeting = &doc.segments[0];

        assert_eq!(greeting.id(), "greeting");
        assert_eq!(greeting.source_markup(), r#"Hello <g id="1">world</g>"#);
        assert_eq!(greeting.source_text(), "Hello world");
        assert_eq!(greeting.target_markup(), r#"Bonjour <g id="1">le monde</g>"#);
        assert_eq!(greeting.target_text(), "Bonjour le monde");
        assert_eq!(greeting.note(), Some("Shown on the home page"));
        assert_eq!(greeting.state(), Some("translated"));
        assert!(greeting.approved());
        assert!(greeting.raw_serialized().starts_with(r#"<trans-unit id="greeting" approved="yes">"#));
        assert!(greeting.raw_serialized().ends_with("</trans-unit>"));
    }

    #[test]
    fn test_grouped_unit_without_target_is_kept() {
        let doc = parse_document(SAMPLE).unwrap();

        assert_eq!(doc.segments.len(), 2);
        let save = &doc.segments[1];
        assert_eq!(save.id(), "save");
        assert_eq!(save.target_markup(), "");
        assert!(!save.approved());
        assert!(save.state().is_none());
    }

    #[test]
    fn test_units_across_file_sections() {
        let text = r#"<xliff version="1.2">
  <file source-language="en" target-language="de" original="a.xlf"><body>
    <trans-unit id="1"><source>One</source><target>Eins</target></trans-unit>
  </body></file>
  <file source-language="en" target-language="nl" original="b.xlf"><body>
    <trans-unit id="2"><source>Two</source><target>Zwei</target></trans-unit>
  </body></file>
</xliff>"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.target_language, "de");
        assert_eq!(doc.original_filename, "a.xlf");
        let ids: Vec<&str> = doc.segments.iter().map(Segment::id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_default_format_version() {
        let doc = parse_document("<xliff><file><body/></file></xliff>").unwrap();
        assert_eq!(doc.format_version, "1.2");
        assert!(doc.segments.is_empty());
    }

    #[test]
    fn test_repair_entities() {
        let (fixed, count) = repair_entities("Tom & Jerry &amp; &lt;b&gt; &#169; &#xA9; &nbsp;");
        assert_eq!(fixed, "Tom &amp; Jerry &amp; &lt;b&gt; &#169; &#xA9; &amp;nbsp;");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_repair_skips_cdata() {
        let (fixed, count) = repair_entities("<s><![CDATA[R&D]]> & co</s>");
        assert_eq!(fixed, "<s><![CDATA[R&D]]> &amp; co</s>");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_bare_ampersand_is_parsed_literally() {
        let text = r#"<xliff><file><body>
  <trans-unit id="1"><source>Salt & Pepper</source><target>Sel & Poivre</target></trans-unit>
</body></file></xliff>"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.segments[0].source_text(), "Salt & Pepper");
        assert_eq!(doc.segments[0].target_text(), "Sel & Poivre");
        assert_eq!(doc.segments[0].source_markup(), "Salt &amp; Pepper");
    }

    #[test]
    fn test_structural_error_is_reported() {
        let text = "<xliff><file><body><trans-unit id=\"1\"><source>A</target></trans-unit></body></file></xliff>";
        assert!(matches!(parse_document(text), Err(XliffError::Parse(_))));
    }

    #[test]
    fn test_missing_id_uses_position() {
        let text = "<xliff><file><body><trans-unit><source>A</source></trans-unit><trans-unit><source>B</source></trans-unit></body></file></xliff>";
        let doc = parse_document(text).unwrap();
        assert_eq!(doc.segments[1].id(), "2");
    }
}
