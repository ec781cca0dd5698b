//! Content tree for the primary document part
//!
//! The tree keeps the raw markup of every node so that serialising an
//! unmodified tree reproduces the input text. Only the node kinds the field
//! engine cares about are classified; everything else is `NodeKind::Other`
//! and passes through untouched.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while building a tree from XML text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("closing tag '{name}' has no matching opening tag")]
    UnexpectedEnd { name: String },

    #[error("element '{name}' is never closed")]
    Unclosed { name: String },

    #[error("markup is not valid UTF-8")]
    Encoding,
}

/// Node kinds meaningful to field extraction and substitution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Paragraph,
    Run,
    FieldBegin,
    FieldSeparator,
    FieldEnd,
    InstrText,
    LiteralText,
    Other,
}

impl NodeKind {
    fn classify(start: &BytesStart<'_>) -> Self {
        match start.local_name().as_ref() {
            b"p" => NodeKind::Paragraph,
            b"r" => NodeKind::Run,
            b"instrText" => NodeKind::InstrText,
            b"t" => NodeKind::LiteralText,
            b"fldChar" => match field_char_type(start).as_deref() {
                Some(b"begin") => NodeKind::FieldBegin,
                Some(b"separate") => NodeKind::FieldSeparator,
                Some(b"end") => NodeKind::FieldEnd,
                _ => NodeKind::Other,
            },
            _ => NodeKind::Other,
        }
    }
}

fn field_char_type(start: &BytesStart<'_>) -> Option<Vec<u8>> {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"fldCharType")
        .map(|attr| attr.value.into_owned())
}

/// An element with its raw start tag and children
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub kind: NodeKind,
    /// Everything between `<` and `>` (or `/>`): qualified name plus attributes
    pub start: String,
    /// Raw closing tag name, absent for self-closing elements
    pub end: Option<String>,
    pub children: Vec<Node>,
}

impl Element {
    /// Qualified element name, e.g. `w:r`
    pub fn name(&self) -> &str {
        self.start
            .split(|c: char| c.is_ascii_whitespace())
            .next()
            .unwrap_or_default()
    }

    /// Namespace prefix of the element name, empty when unprefixed
    pub fn prefix(&self) -> &str {
        self.name()
            .split_once(':')
            .map(|(prefix, _)| prefix)
            .unwrap_or_default()
    }

    pub fn is_self_closing(&self) -> bool {
        self.end.is_none()
    }

    /// Unescaped character data of this element and all descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }

    /// Build a run holding a single literal text node, keeping the start and
    /// end tags of `template`
    pub fn literal_run(template: &Element, value: &str) -> Element {
        let text_name = match template.prefix() {
            "" => "t".to_string(),
            prefix => format!("{prefix}:t"),
        };
        let text = Element {
            kind: NodeKind::LiteralText,
            start: format!(r#"{text_name} xml:space="preserve""#),
            end: Some(text_name),
            children: vec![Node::Text(quick_xml::escape::escape(value).into_owned())],
        };
        Element {
            kind: NodeKind::Run,
            start: template.start.clone(),
            end: Some(template.end.clone().unwrap_or_else(|| template.name().to_string())),
            children: vec![Node::Element(text)],
        }
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.start);
        match &self.end {
            None => out.push_str("/>"),
            Some(end) => {
                out.push('>');
                write_nodes(&self.children, out);
                out.push_str("</");
                out.push_str(end);
                out.push('>');
            }
        }
    }
}

fn collect_text(nodes: &[Node], text: &mut String) {
    for node in nodes {
        match node {
            Node::Text(raw) => match quick_xml::escape::unescape(raw) {
                Ok(unescaped) => text.push_str(&unescaped),
                Err(_) => text.push_str(raw),
            },
            Node::Element(el) => collect_text(&el.children, text),
            Node::Raw(_) => {}
        }
    }
}

/// A node of the content tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped exactly as it appeared in the source
    Text(String),
    /// Comments, CDATA, processing instructions, declarations - kept verbatim
    Raw(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// The element if this node is a run
    pub fn as_run(&self) -> Option<&Element> {
        self.as_element().filter(|el| el.kind == NodeKind::Run)
    }
}

/// A parsed XML part
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parse XML text into a tree
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(xml);
        let mut open: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();

        loop {
            let node = match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    open.push(Element {
                        kind: NodeKind::classify(e),
                        start: utf8(e)?,
                        end: None,
                        children: Vec::new(),
                    });
                    continue;
                }
                Ok(Event::End(ref e)) => {
                    let end = utf8(e)?;
                    let mut el = open
                        .pop()
                        .ok_or_else(|| ParseError::UnexpectedEnd { name: end.clone() })?;
                    el.end = Some(end);
                    Node::Element(el)
                }
                Ok(Event::Empty(ref e)) => Node::Element(Element {
                    kind: NodeKind::classify(e),
                    start: utf8(e)?,
                    end: None,
                    children: Vec::new(),
                }),
                Ok(Event::Text(ref e)) => Node::Text(utf8(e)?),
                Ok(Event::CData(ref e)) => Node::Raw(format!("<![CDATA[{}]]>", utf8(e)?)),
                Ok(Event::Comment(ref e)) => Node::Raw(format!("<!--{}-->", utf8(e)?)),
                Ok(Event::Decl(ref e)) => Node::Raw(format!("<?{}?>", utf8(e)?)),
                Ok(Event::PI(ref e)) => Node::Raw(format!("<?{}?>", utf8(e)?)),
                Ok(Event::DocType(ref e)) => {
                    let body = utf8(e)?;
                    if body.starts_with(|c: char| c.is_ascii_whitespace()) {
                        Node::Raw(format!("<!DOCTYPE{body}>"))
                    } else {
                        Node::Raw(format!("<!DOCTYPE {body}>"))
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::Syntax {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })
                }
            };

            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ParseError::Unclosed {
                name: unclosed.name().to_string(),
            });
        }

        Ok(Document { nodes: top })
    }

    /// Serialise the tree back to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.nodes, &mut out);
        out
    }

    /// The first element at top level
    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(Node::as_element)
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(el) => el.write(out),
            Node::Text(raw) | Node::Raw(raw) => out.push_str(raw),
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ParseError::Encoding)
}
