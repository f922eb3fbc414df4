//! Owned XML document tree built with `quick-xml`.
//!
//! Only the internal predefined entities and character references are
//! decoded. Entities declared in a DTD are never expanded and external
//! resources are never loaded; a reference to such an entity contributes no
//! text. Comments and processing instructions are skipped, so the text on
//! either side of them joins up.

use crate::error::{Error, Result};
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, QName, ResolveResult};
use quick_xml::reader::NsReader;
use std::collections::BTreeMap;
use std::ops::Range;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope namespace bindings; `None` is the default namespace.
pub type NamespaceMap = BTreeMap<Option<String>, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// The text the document was parsed from (without a byte order mark).
    pub source: String,
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub namespaces: NamespaceMap,
    pub attributes: Vec<XmlAttribute>,
    /// Character data before the first child element.
    pub text: String,
    pub children: Vec<XmlElement>,
    /// Character data between this element's end and the next sibling (or
    /// the parent's end).
    pub tail: String,
    /// Byte range of the element's markup in [`XmlDocument::source`].
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl XmlDocument {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let root = TreeBuilder::default().build(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Self::parse(std::str::from_utf8(bytes)?)
    }

    /// Source markup of `element`, or an empty string if the element does not
    /// belong to this document.
    pub fn markup(&self, element: &XmlElement) -> &str {
        self.source.get(element.span.clone()).unwrap_or_default()
    }
}

impl XmlElement {
    /// `prefix_localName`, or just the local name when unprefixed.
    pub fn qualified_name(&self) -> String {
        crate::text::join_strs(self.prefix.as_deref(), Some(&self.local_name), "_")
    }

    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<XmlElement>,
    root: Option<XmlElement>,
    dropped_entities: usize,
}

impl TreeBuilder {
    fn build(mut self, source: &str) -> Result<XmlElement> {
        let mut reader = NsReader::from_str(source);
        reader.trim_text(false);

        loop {
            let start = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| Error::syntax(reader.buffer_position(), e.to_string()))?;
            match event {
                Event::Start(ref e) => {
                    let element = self.open(&reader, e, start)?;
                    self.stack.push(element);
                }
                Event::Empty(ref e) => {
                    let mut element = self.open(&reader, e, start)?;
                    element.span.end = reader.buffer_position();
                    self.close(element, start)?;
                }
                Event::End(_) => {
                    let mut element = self
                        .stack
                        .pop()
                        .ok_or_else(|| Error::syntax(start, "end tag without start tag"))?;
                    element.span.end = reader.buffer_position();
                    self.close(element, start)?;
                }
                Event::Text(ref t) => {
                    let raw = std::str::from_utf8(t)?;
                    let text = self.unescape(raw, start)?;
                    self.push_text(&text, start)?;
                }
                Event::CData(ref c) => {
                    let text = std::str::from_utf8(c)?.to_string();
                    self.push_text(&text, start)?;
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(Error::syntax(
                source.len(),
                format!("unclosed element '{}'", open.qualified_name()),
            ));
        }
        if self.dropped_entities > 0 {
            tracing::debug!(
                count = self.dropped_entities,
                "dropped unexpanded entity references"
            );
        }
        self.root
            .ok_or_else(|| Error::syntax(source.len(), "document has no root element"))
    }

    /// Builds an element from its start tag. The reader has already pushed
    /// the tag's own namespace declarations, so prefixes resolve against the
    /// element's full scope.
    fn open(
        &mut self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart,
        position: usize,
    ) -> Result<XmlElement> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(Error::syntax(position, "document has more than one root element"));
        }

        let mut namespaces = self
            .stack
            .last()
            .map(|parent| parent.namespaces.clone())
            .unwrap_or_default();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::syntax(position, e.to_string()))?;
            let raw = std::str::from_utf8(&attr.value)?;
            let value = self.unescape(&normalize_attribute_whitespace(raw), position)?;

            match attr.key.as_namespace_binding() {
                Some(PrefixDeclaration::Default) if value.is_empty() => {
                    namespaces.remove(&None);
                }
                Some(PrefixDeclaration::Default) => {
                    namespaces.insert(None, value);
                }
                Some(PrefixDeclaration::Named(prefix)) => {
                    namespaces.insert(Some(std::str::from_utf8(prefix)?.to_string()), value);
                }
                None => {
                    let (resolved, _) = reader.resolve_attribute(attr.key);
                    let namespace = namespace_uri(resolved, position)?;
                    let (prefix, local_name) = split_name(attr.key)?;
                    attributes.push(XmlAttribute {
                        prefix,
                        local_name,
                        namespace,
                        value,
                    });
                }
            }
        }

        let (resolved, _) = reader.resolve_element(start.name());
        let namespace = namespace_uri(resolved, position)?;
        let (prefix, local_name) = split_name(start.name())?;

        Ok(XmlElement {
            prefix,
            local_name,
            namespace,
            namespaces,
            attributes,
            text: String::new(),
            children: Vec::new(),
            tail: String::new(),
            span: position..position,
        })
    }

    fn close(&mut self, element: XmlElement, position: usize) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if self.root.is_none() => self.root = Some(element),
            None => {
                return Err(Error::syntax(position, "document has more than one root element"))
            }
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str, position: usize) -> Result<()> {
        let Some(current) = self.stack.last_mut() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::syntax(position, "text outside the root element"));
        };
        match current.children.last_mut() {
            Some(child) => child.tail.push_str(text),
            None => current.text.push_str(text),
        }
        Ok(())
    }

    /// Decodes predefined entities and character references. Every other
    /// entity reference resolves to nothing.
    fn unescape(&mut self, raw: &str, position: usize) -> Result<String> {
        let dropped = &mut self.dropped_entities;
        let text = unescape_with(raw, |_| {
            *dropped += 1;
            Some("")
        })
        .map_err(|e| Error::syntax(position, e.to_string()))?;
        Ok(text.into_owned())
    }
}

fn namespace_uri(resolved: ResolveResult, position: usize) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.into_inner())?.to_string())),
        ResolveResult::Unknown(prefix) => Err(Error::syntax(
            position,
            format!(
                "unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
        )),
    }
}

fn normalize_attribute_whitespace(raw: &str) -> String {
    raw.replace("\r\n", " ").replace(['\t', '\n', '\r'], " ")
}

fn split_name(name: QName) -> Result<(Option<String>, String)> {
    let local = std::str::from_utf8(name.local_name().into_inner())?.to_string();
    let prefix = name
        .prefix()
        .map(|p| std::str::from_utf8(p.into_inner()).map(str::to_string))
        .transpose()?;
    Ok((prefix, local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shape_and_tails() {
        let doc = XmlDocument::parse("<a>abc<b>123<c/>456</b>def</a>").unwrap();
        let a = &doc.root;
        assert_eq!(a.local_name, "a");
        assert_eq!(a.text, "abc");
        let b = &a.children[0];
        assert_eq!(b.text, "123");
        assert_eq!(b.tail, "def");
        assert_eq!(b.children[0].tail, "456");
        assert_eq!(doc.markup(b), "<b>123<c/>456</b>");
        assert_eq!(doc.markup(&b.children[0]), "<c/>");
    }

    #[test]
    fn test_namespaces_are_inherited() {
        let doc = XmlDocument::parse(
            r#"<root xmlns="urn:hl7-org:v3" xmlns:sdtc="urn:hl7-org:sdtc"><sdtc:raceCode xml:lang="en"/><child xmlns=""/></root>"#,
        )
        .unwrap();
        let race = &doc.root.children[0];
        assert_eq!(race.prefix.as_deref(), Some("sdtc"));
        assert_eq!(race.namespace.as_deref(), Some("urn:hl7-org:sdtc"));
        assert_eq!(race.attributes[0].namespace.as_deref(), Some(XML_NAMESPACE));
        assert_eq!(doc.root.namespace.as_deref(), Some("urn:hl7-org:v3"));
        assert_eq!(doc.root.children[1].namespace, None);
    }

    #[test]
    fn test_entities() {
        let doc = XmlDocument::parse("<a t='x&#10;y'>&lt;&amp;&gt;&quot;&apos;&#65;&#x42;</a>").unwrap();
        assert_eq!(doc.root.text, "<&>\"'AB");
        assert_eq!(doc.root.attribute("t"), Some("x\ny"));
    }

    #[test]
    fn test_dropped_entities_leave_surrounding_text() {
        let doc = XmlDocument::parse("<a t='1&custom;2'>x&nbsp;y&amp;z</a>").unwrap();
        assert_eq!(doc.root.text, "xy&z");
        assert_eq!(doc.root.attribute("t"), Some("12"));
    }

    #[test]
    fn test_namespace_scope_ends_with_element() {
        let doc = XmlDocument::parse(
            r#"<a><b xmlns:p="urn:p"><p:c p:x="1"/></b><d xmlns:p="urn:other"><p:e/></d></a>"#,
        )
        .unwrap();
        let c = &doc.root.children[0].children[0];
        assert_eq!(c.namespace.as_deref(), Some("urn:p"));
        assert_eq!(c.attributes[0].namespace.as_deref(), Some("urn:p"));
        let e = &doc.root.children[1].children[0];
        assert_eq!(e.namespace.as_deref(), Some("urn:other"));
        assert!(doc.root.namespaces.is_empty());
    }

    #[test]
    fn test_attribute_whitespace_is_normalized() {
        let doc = XmlDocument::parse("<a t='x\ty\r\nz'/>").unwrap();
        assert_eq!(doc.root.attribute("t"), Some("x y z"));
    }

    #[test]
    fn test_declared_entities_are_not_expanded() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE lolz [
  <!ENTITY lol "lol">
  <!ENTITY lol2 "&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;">
  <!ENTITY xxe SYSTEM "file:///etc/passwd">
]>
<lolz>&lol2;&xxe;</lolz>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.root.local_name, "lolz");
        assert_eq!(doc.root.text, "");
    }

    #[test]
    fn test_comments_and_instructions_are_skipped() {
        let doc = XmlDocument::parse("<a>3<!-- c -->4<?pi x?>5</a>").unwrap();
        assert_eq!(doc.root.text, "345");
        assert!(doc.root.children.is_empty());
    }

    #[test]
    fn test_cdata_is_text() {
        let doc = XmlDocument::parse("<a><![CDATA[<b>&amp;</b>]]></a>").unwrap();
        assert_eq!(doc.root.text, "<b>&amp;</b>");
    }

    #[test]
    fn test_bom_and_bytes() {
        let doc = XmlDocument::parse_bytes(b"\xEF\xBB\xBF<a>x</a>").unwrap();
        assert_eq!(doc.source, "<a>x</a>");
        assert!(matches!(
            XmlDocument::parse_bytes(b"<a>\xFF</a>"),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_syntax_errors() {
        for xml in [
            "",
            "   ",
            "<a>",
            "<a></b>",
            "<a/><b/>",
            "text<a/>",
            "<p:a/>",
            "<a>&amp</a>",
            "<a>&#xZZ;</a>",
            "<a>&#0;</a>",
            "<a t='&#0;'/>",
            "<a xmlns:x='urn:x'><x:b/><y:c/></a>",
            "<a><b p:attr='v'/></a>",
        ] {
            assert!(
                matches!(XmlDocument::parse(xml), Err(Error::XmlSyntax { .. })),
                "expected syntax error for {xml:?}"
            );
        }
    }
}
