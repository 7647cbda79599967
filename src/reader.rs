//! Namespace-aware streaming event reader.
//!
//! This module wraps `quick-xml`'s [`NsReader`] and pushes [`ParseEvent`]s to a
//! consumer callback, one at a time and in document order. The consumer runs
//! inline on the reader's call stack.
//!
//! Opening a reader scans the whole buffer for well-formedness first, so a
//! document with a syntax error is rejected before a single event is delivered.
//! Documents are decoded according to their XML declaration, and general
//! entities declared in the internal DTD subset are expanded.
//!
//! # Example
//!
//! ```rust
//! use xml_crosswalk::reader::{EventReader, ParseEvent, ReaderConfig};
//!
//! let xml = br#"<record id="7"><title>Hello</title></record>"#;
//! let reader = EventReader::open(xml, ReaderConfig::default()).unwrap();
//!
//! let mut names = Vec::new();
//! reader
//!     .parse(|event| {
//!         if let ParseEvent::StartElement { name, .. } = &event {
//!             names.push(name.local.clone());
//!         }
//!         Ok::<(), ()>(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(names, vec!["record", "title"]);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;

use crate::diagnostics::Location;
use crate::error::MalformedInput;

/// A namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix as written in the document, if any
    pub prefix: Option<String>,
    /// Local part of the name
    pub local: String,
    /// Resolved namespace URI, if the name is in a namespace
    pub namespace: Option<String>,
}

impl QName {
    /// Creates a name in no namespace.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    /// Creates a name in the given namespace.
    pub fn with_namespace(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Returns the name as written in the document (`prefix:local`).
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// Displays the name in Clark notation (`{uri}local`).
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Structural events pushed to a consumer.
///
/// An element produces a `StartElement`, one `Attribute` per attribute, its
/// content, and finally an `EndElement`. Text content may arrive split across
/// several `Characters` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// An element was opened
    StartElement {
        /// Element name
        name: QName,
        /// Position of the start tag
        location: Location,
    },
    /// An element was closed
    EndElement {
        /// Element name
        name: QName,
        /// All character content directly inside the element, concatenated
        text: String,
        /// Position of the end tag
        location: Location,
    },
    /// A chunk of character content
    Characters {
        /// Unescaped text
        text: String,
        /// Position of the chunk
        location: Location,
    },
    /// An attribute of the element that was just opened
    Attribute {
        /// Attribute name
        name: QName,
        /// Unescaped value
        value: String,
        /// Position of the owning start tag
        location: Location,
    },
}

impl ParseEvent {
    /// Returns the element or attribute name, if this event carries one.
    pub fn name(&self) -> Option<&QName> {
        match self {
            ParseEvent::StartElement { name, .. }
            | ParseEvent::EndElement { name, .. }
            | ParseEvent::Attribute { name, .. } => Some(name),
            ParseEvent::Characters { .. } => None,
        }
    }

    /// Returns the text of a `Characters` or `EndElement` event, or the value of
    /// an `Attribute`.
    pub fn text(&self) -> Option<&str> {
        match self {
            ParseEvent::Characters { text, .. } | ParseEvent::EndElement { text, .. } => {
                Some(text)
            }
            ParseEvent::Attribute { value, .. } => Some(value),
            ParseEvent::StartElement { .. } => None,
        }
    }

    /// Returns where the event occurred.
    pub fn location(&self) -> Location {
        match self {
            ParseEvent::StartElement { location, .. }
            | ParseEvent::EndElement { location, .. }
            | ParseEvent::Characters { location, .. }
            | ParseEvent::Attribute { location, .. } => *location,
        }
    }
}

/// Configuration options for the event reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Skip whitespace-only text that separates child elements.
    ///
    /// Whitespace between text, CDATA or comment chunks, and the whitespace
    /// content of a text-only element, is always delivered.
    pub ignore_whitespace: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            ignore_whitespace: true,
        }
    }
}

impl ReaderConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether whitespace between child elements is skipped.
    pub fn with_ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }
}

/// Why [`EventReader::parse`] stopped early.
#[derive(Error, Debug)]
pub enum ReadError<E> {
    /// The document is not well-formed
    #[error(transparent)]
    Malformed(MalformedInput),
    /// The consumer returned an error
    #[error("consumer aborted")]
    Consumer(E),
}

/// Maps byte offsets to line and column numbers.
#[derive(Debug)]
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(bytes: &[u8]) -> Self {
        let newlines = bytes
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| (b == b'\n').then_some(i))
            .collect();
        Self { newlines }
    }

    fn locate(&self, offset: usize) -> Location {
        let line = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = if line == 0 { 0 } else { self.newlines[line - 1] + 1 };
        Location::new(line + 1, offset.saturating_sub(line_start) + 1)
    }
}

/// A forward-only, single-pass event reader over a buffered document.
pub struct EventReader<'a> {
    bytes: &'a [u8],
    config: ReaderConfig,
    lines: LineIndex,
}

impl<'a> EventReader<'a> {
    /// Opens a reader, rejecting documents that are not well-formed.
    ///
    /// No event is delivered for a rejected document.
    pub fn open(bytes: &'a [u8], config: ReaderConfig) -> Result<Self, MalformedInput> {
        let reader = Self {
            bytes,
            config,
            lines: LineIndex::new(bytes),
        };
        reader
            .drive(|_| Ok::<(), Infallible>(()))
            .map_err(|e| match e {
                ReadError::Malformed(m) => m,
                ReadError::Consumer(never) => match never {},
            })?;
        Ok(reader)
    }

    /// Pushes every event to `consumer`, in document order.
    ///
    /// Stops at the first consumer error. The reader is consumed, so a document
    /// can only be read once per reader.
    pub fn parse<E, F>(self, consumer: F) -> Result<(), ReadError<E>>
    where
        F: FnMut(ParseEvent) -> Result<(), E>,
    {
        self.drive(consumer)
    }

    fn drive<E, F>(&self, mut consumer: F) -> Result<(), ReadError<E>>
    where
        F: FnMut(ParseEvent) -> Result<(), E>,
    {
        let mut reader = NsReader::from_reader(self.bytes);
        reader.config_mut().check_end_names = true;

        let mut open: Vec<ElementContext> = Vec::new();
        let mut entities: HashMap<String, String> = HashMap::new();
        let mut seen_root = false;

        loop {
            let offset = reader.buffer_position() as usize;
            let location = self.lines.locate(offset);

            // Resolve the namespace into owned data before touching the reader again
            let step = reader
                .read_resolved_event()
                .map(|(resolved, event)| (resolved_namespace(resolved), event));
            let (namespace, event) = match step {
                Ok(step) => step,
                Err(e) => {
                    let at = reader.error_position() as usize;
                    return Err(self.malformed(e.to_string(), at));
                }
            };
            let decoder = reader.decoder();

            // `<a/>` is reported as a start tag immediately followed by its end tag
            let (event, empty) = match event {
                XmlEvent::Empty(start) => (XmlEvent::Start(start), true),
                other => (other, false),
            };

            match event {
                XmlEvent::Start(start) => {
                    if open.is_empty() && seen_root {
                        return Err(self.malformed("document has more than one root element", offset));
                    }
                    seen_root = true;

                    let name = namespace
                        .and_then(|ns| element_name(decoder, &start, ns))
                        .map_err(|m| self.malformed(m, offset))?;
                    let attributes = attributes(&reader, &start, &entities)
                        .map_err(|m| self.malformed(m, offset))?;

                    if let Some(parent) = open.last_mut() {
                        // Whitespace next to a child element is layout, not content
                        parent.has_children = true;
                        parent.pending.clear();
                    }

                    consumer(ParseEvent::StartElement {
                        name: name.clone(),
                        location,
                    })
                    .map_err(ReadError::Consumer)?;
                    for (name, value) in attributes {
                        consumer(ParseEvent::Attribute {
                            name,
                            value,
                            location,
                        })
                        .map_err(ReadError::Consumer)?;
                    }

                    if empty {
                        consumer(ParseEvent::EndElement {
                            name,
                            text: String::new(),
                            location,
                        })
                        .map_err(ReadError::Consumer)?;
                    } else {
                        open.push(ElementContext::new(name));
                    }
                }
                XmlEvent::End(_) => {
                    // quick-xml has already matched the end tag against the open one
                    let Some(element) = open.pop() else {
                        return Err(self.malformed("unexpected end tag", offset));
                    };
                    if !element.has_children {
                        for (text, at) in element.pending {
                            self.deliver(text, at, &mut consumer)?;
                        }
                    }
                    consumer(ParseEvent::EndElement {
                        name: element.name,
                        text: element.text,
                        location,
                    })
                    .map_err(ReadError::Consumer)?;
                }
                XmlEvent::Text(text) => {
                    let text = text
                        .unescape_with(|name| entities.get(name).map(String::as_str))
                        .map_err(|e| self.malformed(e.to_string(), offset))?
                        .into_owned();
                    self.characters(text, false, offset, &mut open, &mut consumer)?;
                }
                XmlEvent::CData(cdata) => {
                    let text = decoder
                        .decode(&cdata)
                        .map_err(|e| self.malformed(e.to_string(), offset))?
                        .into_owned();
                    self.characters(text, true, offset, &mut open, &mut consumer)?;
                }
                XmlEvent::DocType(doctype) => {
                    let doctype = decoder
                        .decode(&doctype)
                        .map_err(|e| self.malformed(e.to_string(), offset))?;
                    entities = internal_entities(&doctype);
                }
                XmlEvent::Eof => {
                    if let Some(element) = open.last() {
                        return Err(self.malformed(
                            format!(
                                "unexpected end of document, <{}> is not closed",
                                element.name.qualified()
                            ),
                            offset,
                        ));
                    }
                    if !seen_root {
                        return Err(self.malformed("document has no root element", offset));
                    }
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    fn characters<E, F>(
        &self,
        text: String,
        cdata: bool,
        offset: usize,
        open: &mut [ElementContext],
        consumer: &mut F,
    ) -> Result<(), ReadError<E>>
    where
        F: FnMut(ParseEvent) -> Result<(), E>,
    {
        let blank = !cdata && text.trim_start_matches('\u{feff}').trim().is_empty();
        let Some(element) = open.last_mut() else {
            if blank {
                return Ok(());
            }
            return Err(self.malformed("character data outside the root element", offset));
        };
        element.text.push_str(&text);

        if !self.config.ignore_whitespace {
            return self.deliver(text, offset, consumer);
        }
        if blank {
            // Held until the next text chunk or the end tag shows it is content
            element.pending.push((text, offset));
            return Ok(());
        }
        for (pending, at) in std::mem::take(&mut element.pending) {
            self.deliver(pending, at, consumer)?;
        }
        self.deliver(text, offset, consumer)
    }

    fn deliver<E, F>(&self, text: String, offset: usize, consumer: &mut F) -> Result<(), ReadError<E>>
    where
        F: FnMut(ParseEvent) -> Result<(), E>,
    {
        consumer(ParseEvent::Characters {
            text,
            location: self.lines.locate(offset),
        })
        .map_err(ReadError::Consumer)
    }

    fn malformed<E>(&self, message: impl Into<String>, offset: usize) -> ReadError<E> {
        ReadError::Malformed(MalformedInput::new(message, self.lines.locate(offset)))
    }
}

/// An open element with the character data seen so far.
struct ElementContext {
    name: QName,
    text: String,
    has_children: bool,
    /// Whitespace-only chunks not yet known to be content
    pending: Vec<(String, usize)>,
}

impl ElementContext {
    fn new(name: QName) -> Self {
        Self {
            name,
            text: String::new(),
            has_children: false,
            pending: Vec::new(),
        }
    }
}

/// Converts a namespace resolution into owned data.
fn resolved_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, String> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        )),
    }
}

fn decode(decoder: Decoder, bytes: &[u8]) -> Result<String, String> {
    decoder
        .decode(bytes)
        .map(Cow::into_owned)
        .map_err(|e| e.to_string())
}

fn element_name(
    decoder: Decoder,
    start: &BytesStart<'_>,
    namespace: Option<String>,
) -> Result<QName, String> {
    let name = start.name();
    let prefix = match name.prefix() {
        Some(p) => Some(decode(decoder, p.as_ref())?),
        None => None,
    };
    Ok(QName {
        prefix,
        local: decode(decoder, name.local_name().as_ref())?,
        namespace,
    })
}

/// Extracts attributes as owned data, skipping namespace declarations.
fn attributes(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
) -> Result<Vec<(QName, String)>, String> {
    let decoder = reader.decoder();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = resolved_namespace(resolved)?;
        let prefix = match attr.key.prefix() {
            Some(p) => Some(decode(decoder, p.as_ref())?),
            None => None,
        };
        let value = attr
            .decode_and_unescape_value_with(decoder, |name| entities.get(name).map(String::as_str))
            .map_err(|e| e.to_string())?
            .into_owned();
        attrs.push((
            QName {
                prefix,
                local: decode(decoder, local.as_ref())?,
                namespace,
            },
            value,
        ));
    }
    Ok(attrs)
}

/// Collects the general entities declared in a DOCTYPE internal subset.
///
/// Parameter entities and external entities are skipped. The first
/// declaration of a name wins.
fn internal_entities(doctype: &str) -> HashMap<String, String> {
    const DECL: &str = "<!ENTITY";

    let mut entities = HashMap::new();
    let mut rest = doctype;
    while let Some(pos) = rest.find(DECL) {
        rest = rest[pos + DECL.len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') else {
            continue;
        };
        let body = &rest[1..];
        let Some(close) = body.find(quote) else {
            break;
        };
        if !name.is_empty() {
            entities
                .entry(name.to_string())
                .or_insert_with(|| body[..close].to_string());
        }
        rest = &body[close + 1..];
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://purl.org/dc/elements/1.1/";

    fn read_events(bytes: &[u8], config: ReaderConfig) -> Result<Vec<ParseEvent>, MalformedInput> {
        let mut events = Vec::new();
        EventReader::open(bytes, config)?
            .parse(|event| {
                events.push(event);
                Ok::<(), Infallible>(())
            })
            .map_err(|e| match e {
                ReadError::Malformed(m) => m,
                ReadError::Consumer(never) => match never {},
            })?;
        Ok(events)
    }

    fn events(xml: &str) -> Vec<ParseEvent> {
        read_events(xml.as_bytes(), ReaderConfig::default()).unwrap()
    }

    fn malformed(xml: &str) -> MalformedInput {
        match EventReader::open(xml.as_bytes(), ReaderConfig::default()) {
            Ok(_) => panic!("expected {:?} to be rejected", xml),
            Err(e) => e,
        }
    }

    #[test]
    fn test_event_order() {
        let evs = events(r#"<record id="7"><title>Hello</title></record>"#);

        let kinds: Vec<_> = evs
            .iter()
            .map(|e| match e {
                ParseEvent::StartElement { name, .. } => format!("start {}", name.local),
                ParseEvent::EndElement { name, .. } => format!("end {}", name.local),
                ParseEvent::Characters { text, .. } => format!("text {}", text),
                ParseEvent::Attribute { name, value, .. } => format!("attr {}={}", name.local, value),
            })
            .collect();

        assert_eq!(
            kinds,
            vec![
                "start record",
                "attr id=7",
                "start title",
                "text Hello",
                "end title",
                "end record",
            ]
        );
    }

    #[test]
    fn test_namespaces_resolved() {
        let xml = format!(
            r#"<record xmlns:dc="{NS}" xmlns="urn:example"><dc:title dc:lang="en">T</dc:title></record>"#
        );
        let evs = events(&xml);

        let root = evs[0].name().unwrap();
        assert_eq!(root.namespace.as_deref(), Some("urn:example"));
        assert_eq!(root.prefix, None);

        let title = evs[1].name().unwrap();
        assert_eq!(title.local, "title");
        assert_eq!(title.prefix.as_deref(), Some("dc"));
        assert_eq!(title.namespace.as_deref(), Some(NS));
        assert_eq!(title.qualified(), "dc:title");
        assert_eq!(title.to_string(), format!("{{{}}}title", NS));

        // Namespace declarations are not reported as attributes
        let attrs: Vec<_> = evs
            .iter()
            .filter(|e| matches!(e, ParseEvent::Attribute { .. }))
            .collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name().unwrap().namespace.as_deref(), Some(NS));
        assert_eq!(attrs[0].text(), Some("en"));
    }

    #[test]
    fn test_unprefixed_attribute_has_no_namespace() {
        let evs = events(r#"<record xmlns="urn:example" id="1"/>"#);
        let attr = evs
            .iter()
            .find(|e| matches!(e, ParseEvent::Attribute { .. }))
            .unwrap();
        assert_eq!(attr.name().unwrap().namespace, None);
    }

    #[test]
    fn test_empty_element_expanded() {
        let evs = events("<record><empty/></record>");
        assert!(matches!(&evs[1], ParseEvent::StartElement { name, .. } if name.local == "empty"));
        assert!(matches!(&evs[2], ParseEvent::EndElement { name, text, .. } if name.local == "empty" && text.is_empty()));
    }

    #[test]
    fn test_split_characters_accumulate_on_end() {
        let evs = events("<title>Hel<!-- split -->lo &amp; <![CDATA[bye]]></title>");

        let chunks: Vec<_> = evs
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Characters { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), "Hello & bye");

        match evs.last().unwrap() {
            ParseEvent::EndElement { text, .. } => assert_eq!(text, "Hello & bye"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_handling() {
        let xml = "<record>\n  <title>T</title>\n</record>";
        let skipped = events(xml);
        assert!(!skipped
            .iter()
            .any(|e| matches!(e, ParseEvent::Characters { text, .. } if text.trim().is_empty())));

        let kept = read_events(xml.as_bytes(), ReaderConfig::new().with_ignore_whitespace(false)).unwrap();
        assert!(kept
            .iter()
            .any(|e| matches!(e, ParseEvent::Characters { text, .. } if text.trim().is_empty())));
    }

    fn characters(evs: &[ParseEvent]) -> String {
        evs.iter()
            .filter_map(|e| match e {
                ParseEvent::Characters { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn end_text(evs: &[ParseEvent], local: &str) -> String {
        evs.iter()
            .find_map(|e| match e {
                ParseEvent::EndElement { name, text, .. } if name.local == local => Some(text.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_whitespace_between_text_chunks_is_content() {
        let evs = events("<t><![CDATA[a]]> <![CDATA[b]]></t>");
        assert_eq!(characters(&evs), "a b");
        assert_eq!(end_text(&evs, "t"), "a b");

        let evs = events("<t>a<!-- note -->\n<?pi?> b</t>");
        assert_eq!(characters(&evs), "a\n b");
        assert_eq!(end_text(&evs, "t"), "a\n b");
    }

    #[test]
    fn test_whitespace_only_element_keeps_its_text() {
        let evs = events("<record><title> </title></record>");
        assert_eq!(characters(&evs), " ");
        assert_eq!(end_text(&evs, "title"), " ");
    }

    #[test]
    fn test_declared_encoding_is_decoded() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<caf\xe9 note=\"na\xefve\">cr\xe8me</caf\xe9>";
        let evs = read_events(xml, ReaderConfig::default()).unwrap();

        assert_eq!(evs[0].name().unwrap().local, "caf\u{e9}");
        assert_eq!(evs[1].text(), Some("na\u{ef}ve"));
        assert_eq!(characters(&evs), "cr\u{e8}me");
    }

    #[test]
    fn test_internal_entities_expanded() {
        let xml = r#"<!DOCTYPE record [
  <!ENTITY % param "ignored">
  <!ENTITY org "DANS">
  <!ENTITY org "shadowed">
  <!ENTITY logo SYSTEM "logo.png">
]>
<record by="&org;"><title>&org; &amp; partners</title></record>"#;
        let evs = events(xml);

        let by = evs
            .iter()
            .find(|e| matches!(e, ParseEvent::Attribute { .. }))
            .unwrap();
        assert_eq!(by.text(), Some("DANS"));
        assert_eq!(end_text(&evs, "title"), "DANS & partners");
    }

    #[test]
    fn test_undeclared_entity_rejected() {
        malformed("<record><title>&missing;</title></record>");
    }

    #[test]
    fn test_internal_entity_scan() {
        let entities = internal_entities(r#"r [<!ENTITY a "1"><!ENTITY b 'two words'><!ENTITY c>]"#);
        assert_eq!(entities.get("a").map(String::as_str), Some("1"));
        assert_eq!(entities.get("b").map(String::as_str), Some("two words"));
        assert!(!entities.contains_key("c"));
    }

    #[test]
    fn test_empty_element_end_points_at_tag() {
        let evs = events("<record>\n  <empty/>\n</record>");
        let locations: Vec<_> = evs
            .iter()
            .filter(|e| e.name().map_or(false, |n| n.local == "empty"))
            .map(ParseEvent::location)
            .collect();
        assert_eq!(locations, vec![Location::new(2, 3), Location::new(2, 3)]);
    }

    #[test]
    fn test_locations() {
        let evs = events("<record>\n  <title>T</title>\n</record>");
        let title = evs
            .iter()
            .find(|e| matches!(e, ParseEvent::StartElement { name, .. } if name.local == "title"))
            .unwrap();
        assert_eq!(title.location(), Location::new(2, 3));
    }

    #[test]
    fn test_truncated_document_rejected() {
        let err = malformed("<record><title>Hello");
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_mismatched_end_tag_rejected() {
        malformed("<record><title>Hello</record>");
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let err = malformed("<a/><b/>");
        assert!(err.message.contains("more than one root"));
    }

    #[test]
    fn test_text_outside_root_rejected() {
        malformed("<a/>trailing");
    }

    #[test]
    fn test_empty_document_rejected() {
        let err = malformed("  ");
        assert!(err.message.contains("no root"));
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let err = malformed("<x:record/>");
        assert!(err.message.contains("unknown namespace prefix"));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        malformed(r#"<record id="1" id="2"/>"#);
    }

    #[test]
    fn test_malformed_document_delivers_no_events() {
        let mut delivered = 0;
        let result = EventReader::open(b"<record><title>Hello", ReaderConfig::default()).map(|r| {
            r.parse(|_| {
                delivered += 1;
                Ok::<(), ()>(())
            })
        });
        assert!(result.is_err());
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_consumer_error_stops_reading() {
        let reader = EventReader::open(b"<a><b/><c/></a>", ReaderConfig::default()).unwrap();
        let mut seen = Vec::new();
        let result = reader.parse(|event| {
            if let ParseEvent::StartElement { name, .. } = &event {
                if name.local == "b" {
                    return Err("stop");
                }
                seen.push(name.local.clone());
            }
            Ok(())
        });

        assert!(matches!(result, Err(ReadError::Consumer("stop"))));
        assert_eq!(seen, vec!["a"]);
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new(b"ab\ncd\n\nef");
        assert_eq!(index.locate(0), Location::new(1, 1));
        assert_eq!(index.locate(2), Location::new(1, 3));
        assert_eq!(index.locate(3), Location::new(2, 1));
        assert_eq!(index.locate(7), Location::new(4, 1));
    }
}
