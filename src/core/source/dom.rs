//! Arena DOM for parsed metadata records.
//!
//! Elements live in a flat `Vec` and reference each other through
//! `NodeId` indices, so the tree is cheap to walk and trivially
//! `Send + Sync`. Element and attribute names are resolved to
//! `(namespace URI, local name)` while parsing; prefixes are not kept.

use encoding_rs::{Encoding, UTF_8};
use quick_xml::encoding::detect_encoding;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

use crate::core::error::{Result, StrataError};

/// Compact element identifier (index into the arena, in document order)
pub type NodeId = u32;

const XML_PREFIX: &str = "xml";
const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// A resolved attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

/// Element content in document order
#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Element(NodeId),
}

/// A resolved element
#[derive(Debug, Clone)]
pub struct Element {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub parent: Option<NodeId>,
    pub content: Vec<Content>,
}

impl Element {
    /// Child element ids in document order
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.content.iter().filter_map(|c| match c {
            Content::Element(id) => Some(*id),
            Content::Text(_) => None,
        })
    }

    /// Direct text children, concatenated
    pub fn own_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }
}

/// Parsed, namespace-resolved XML document
#[derive(Debug, Clone)]
pub struct XmlDocument {
    elements: Vec<Element>,
    root: NodeId,
}

/// Prefix bindings declared on one element
type Scope = Vec<(Option<String>, String)>;

impl XmlDocument {
    /// Parse raw bytes in the encoding named by their BOM or XML declaration
    ///
    /// Without either the input must be UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = decode(bytes)?;
        Self::parse(&xml)
    }

    /// Parse a complete XML document
    ///
    /// Fails with `ParseError` when the input is not well-formed:
    /// mismatched or unclosed tags, text or elements outside the
    /// single root, bad attributes, or unbound namespace prefixes.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| {
                StrataError::ParseError(format!("at byte {position}: {e}"))
            })?;

            match event {
                Event::Start(start) => {
                    let id = open_element(&reader, &start, &mut elements, &stack, &mut scopes, &mut root)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    open_element(&reader, &start, &mut elements, &stack, &mut scopes, &mut root)?;
                    scopes.pop();
                }
                Event::End(_) => {
                    // quick-xml already verified the end name matches
                    stack.pop();
                    scopes.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    push_text(&mut elements, &stack, &text)?;
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    let text = String::from_utf8_lossy(&bytes);
                    push_text(&mut elements, &stack, &text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(&open) = stack.last() {
            return Err(StrataError::ParseError(format!(
                "unexpected end of document: <{}> is not closed",
                elements[open as usize].local_name
            )));
        }

        let root = root.ok_or_else(|| {
            StrataError::ParseError("document has no root element".to_string())
        })?;

        Ok(Self { elements, root })
    }

    /// The document element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get an element by id
    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id as usize]
    }

    /// Number of elements in the document
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements (never true for a parsed document)
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Concatenated text of the element and all its descendants
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for content in &self.element(id).content {
            match content {
                Content::Text(t) => out.push_str(t),
                Content::Element(child) => self.collect_text(*child, out),
            }
        }
    }

    /// Descendants of `id` (excluding `id`) in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self.element(id).child_ids().collect();
        pending.reverse();
        while let Some(next) = pending.pop() {
            out.push(next);
            let before = pending.len();
            pending.extend(self.element(next).child_ids());
            pending[before..].reverse();
        }
        out
    }

    /// Find the first attribute value by namespace and local name
    pub fn attribute(&self, id: NodeId, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.element(id)
            .attributes
            .iter()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }
}

fn push_text(elements: &mut [Element], stack: &[NodeId], text: &str) -> Result<()> {
    match stack.last() {
        Some(&current) => {
            if !text.is_empty() {
                elements[current as usize]
                    .content
                    .push(Content::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(StrataError::ParseError(
            "text content outside the root element".to_string(),
        )),
    }
}

fn open_element(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
    elements: &mut Vec<Element>,
    stack: &[NodeId],
    scopes: &mut Vec<Scope>,
    root: &mut Option<NodeId>,
) -> Result<NodeId> {
    if stack.is_empty() && root.is_some() {
        return Err(StrataError::ParseError(
            "document has more than one root element".to_string(),
        ));
    }

    // First pass: namespace declarations, so they apply to this element
    // and its own attributes.
    let mut scope: Scope = Vec::new();
    let mut raw_attributes: Vec<(String, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| StrataError::ParseError(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.decode_and_unescape_value(reader)?.into_owned();
        if key == "xmlns" {
            scope.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.push((Some(prefix.to_string()), value));
        } else {
            raw_attributes.push((key, value));
        }
    }
    scopes.push(scope);

    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, local_name) = split_qname(&qname);
    let namespace = match prefix {
        Some(p) => Some(resolve_prefix(scopes, p)?),
        None => resolve_default(scopes),
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (prefix, local) = split_qname(&key);
        // Unprefixed attributes are never in a namespace
        let namespace = match prefix {
            Some(p) => Some(resolve_prefix(scopes, p)?),
            None => None,
        };
        attributes.push(Attribute {
            namespace,
            local_name: local.to_string(),
            value,
        });
    }

    let id = elements.len() as NodeId;
    let parent = stack.last().copied();
    elements.push(Element {
        namespace,
        local_name: local_name.to_string(),
        attributes,
        parent,
        content: Vec::new(),
    });

    match parent {
        Some(p) => elements[p as usize].content.push(Content::Element(id)),
        None => *root = Some(id),
    }

    Ok(id)
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn resolve_prefix(scopes: &[Scope], prefix: &str) -> Result<String> {
    if prefix == XML_PREFIX {
        return Ok(XML_URI.to_string());
    }
    for scope in scopes.iter().rev() {
        for (p, uri) in scope.iter().rev() {
            if p.as_deref() == Some(prefix) {
                return Ok(uri.clone());
            }
        }
    }
    Err(StrataError::ParseError(format!(
        "unbound namespace prefix '{prefix}'"
    )))
}

fn resolve_default(scopes: &[Scope]) -> Option<String> {
    for scope in scopes.iter().rev() {
        for (p, uri) in scope.iter().rev() {
            if p.is_none() {
                // xmlns="" undeclares the default namespace
                return if uri.is_empty() { None } else { Some(uri.clone()) };
            }
        }
    }
    None
}

/// Decode a document to UTF-8, dropping any byte order mark
fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (detected, bom) = detect_encoding(bytes).unwrap_or((UTF_8, 0));
    let body = &bytes[bom..];
    let encoding = match declared_encoding(body) {
        Some(declared) if detected.is_ascii_compatible() && declared.is_ascii_compatible() => {
            declared
        }
        _ => detected,
    };
    quick_xml::encoding::decode(body, encoding).map_err(|_| {
        StrataError::ParseError(format!("input is not valid {}", encoding.name()))
    })
}

/// Encoding named in the XML declaration, if the document has one
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let mut reader = Reader::from_reader(bytes);
    loop {
        match reader.read_event() {
            Ok(Event::Decl(decl)) => return decl.encoder(),
            Ok(Event::Start(_) | Event::Empty(_) | Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
