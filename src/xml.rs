//! Lightweight XML tree built on quick-xml
//!
//! The tree remembers, for every element, the byte span it occupied in the input text and
//! the span of its inner content. This lets callers hand out inline markup and whole units
//! exactly as they were written instead of re-serializing them.

use crate::error::{XliffError, XliffResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>|<[^>]*>").expect("valid regex"));

/// A node in the parsed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data
    Text(String),
}

/// An element with its attributes, children and location in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// Unescaped attribute values in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Byte range of the whole element, tags included
    pub span: Range<usize>,
    /// Byte range between the start and end tags (empty for self-closing elements)
    pub inner: Range<usize>,
}

impl XmlElement {
    fn open(start: &BytesStart, span_start: usize, inner_start: usize) -> XliffResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                XliffError::Parse(format!("invalid attribute on <{}>: {}", name, e))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| {
                    XliffError::Parse(format!("invalid value for attribute '{}': {}", key, e))
                })?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
            span: span_start..inner_start,
            inner: inner_start..inner_start,
        })
    }

    /// Element name without any namespace prefix
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Attribute value by name, matching either the full or the prefix-less name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| self.attributes.iter().find(|(key, _)| local_name(key) == name))
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|c| c.local_name() == local)
    }

    /// First element with the given local name in document order, `self` included
    pub fn find_first(&self, local: &str) -> Option<&XmlElement> {
        if self.local_name() == local {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find_first(local))
    }

    /// Every element with the given local name in document order
    ///
    /// Matches are not searched for nested matches.
    pub fn collect<'a>(&'a self, local: &str, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.local_name() == local {
                out.push(child);
            } else {
                child.collect(local, out);
            }
        }
    }

    /// Concatenated character data of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.push_text(out),
            }
        }
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Position of the `<` that opens the tag ending right before `tag_end`
fn tag_start(text: &str, tag_end: usize) -> usize {
    text[..tag_end].rfind('<').unwrap_or(tag_end)
}

fn attach(stack: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => roots.push(element),
    }
}

/// Parse `text` into a tree and return its root element
///
/// Fails on anything quick-xml rejects, on end tags that do not match their start tag and
/// on elements left open at the end of input.
pub fn parse_tree(text: &str) -> XliffResult<XmlElement> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut roots: Vec<XmlElement> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            XliffError::Parse(format!("malformed XML near byte {}: {}", reader.buffer_position(), e))
        })?;
        let position = reader.buffer_position() as usize;

        match event {
            Event::Start(start) => {
                let element = XmlElement::open(&start, tag_start(text, position), position)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = XmlElement::open(&start, tag_start(text, position), position)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(end) => {
                let mut element = stack.pop().ok_or_else(|| {
                    XliffError::Parse(format!(
                        "unexpected closing tag </{}> near byte {}",
                        String::from_utf8_lossy(end.name().as_ref()),
                        position
                    ))
                })?;
                element.inner.end = tag_start(text, position);
                element.span.end = position;
                attach(&mut stack, &mut roots, element);
            }
            Event::Text(content) => {
                if let Some(parent) = stack.last_mut() {
                    let value = content.unescape().map_err(|e| {
                        XliffError::Parse(format!("invalid character data near byte {}: {}", position, e))
                    })?;
                    parent.children.push(XmlNode::Text(value.into_owned()));
                }
            }
            Event::CData(content) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&content.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XliffError::Parse(format!(
            "element <{}> opened at byte {} is never closed",
            open.name, open.span.start
        )));
    }

    roots
        .into_iter()
        .next()
        .ok_or_else(|| XliffError::Parse("document has no root element".to_string()))
}

/// Plain-text content of an inline markup fragment
///
/// Tags are dropped, entities decoded and CDATA sections unwrapped. Fragments that
/// quick-xml cannot read fall back to a tag-stripping regex so the result is always
/// defined.
pub fn strip_markup(markup: &str) -> String {
    if !markup.contains(['<', '&']) {
        return markup.to_string();
    }

    let mut reader = Reader::from_str(markup);
    let mut out = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(content)) => match content.unescape() {
                Ok(value) => out.push_str(&value),
                Err(_) => return strip_markup_lenient(markup),
            },
            Ok(Event::CData(content)) => out.push_str(&String::from_utf8_lossy(&content.into_inner())),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return strip_markup_lenient(markup),
        }
    }
    out
}

fn strip_markup_lenient(markup: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in TAG_PATTERN.captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&unescape_lenient(&markup[last..whole.start()]));
        if let Some(cdata) = caps.get(1) {
            out.push_str(cdata.as_str());
        }
        last = whole.end();
    }
    out.push_str(&unescape_lenient(&markup[last..]));
    out
}

fn unescape_lenient(text: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(text).unwrap_or(Cow::Borrowed(text))
}

/// Escape character data for use between tags
pub fn escape_text(text: &str) -> String {
    quick_xml::escape::partial_escape(text).into_owned()
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
