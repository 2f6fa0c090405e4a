//! Minimal in-memory XML tree serialised with `quick-xml`.
//!
//! Names are written verbatim (`dc:title`, `xml:lang`); namespace declarations
//! are ordinary `xmlns:*` attributes on the root element.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to serialise XML: {0}")]
pub struct XmlError(String);

/// An XML element with optional text and child elements.
///
/// Text is written before children. `text: None` with no children serialises
/// as a self-closing tag; `Some("")` forces an explicit start/end pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set an attribute, replacing an existing value with the same name.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append `child` and return a handle to it.
    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append an empty child element named `name`.
    pub fn child(&mut self, name: &str) -> &mut Element {
        self.push(Element::new(name))
    }

    /// Append `<name>contents</name>` unless `contents` is empty or absent.
    pub fn text_child(&mut self, name: &str, contents: Option<&str>) -> Option<&mut Element> {
        self.text_child_with(name, contents, &[])
    }

    /// Like [`Element::text_child`], with attributes.
    pub fn text_child_with(
        &mut self,
        name: &str,
        contents: Option<&str>,
        attrs: &[(&str, &str)],
    ) -> Option<&mut Element> {
        let contents = contents.filter(|c| !c.is_empty())?;
        let mut el = Element::new(name).with_text(contents);
        for (k, v) in attrs {
            el.set_attr(*k, *v);
        }
        Some(self.push(el))
    }

    /// Append one child per non-empty part of `contents` split on `delimiter`.
    pub fn split_children(
        &mut self,
        name: &str,
        contents: Option<&str>,
        delimiter: &str,
        attrs: &[(&str, &str)],
    ) {
        let Some(contents) = contents.filter(|c| !c.is_empty()) else {
            return;
        };
        for part in contents.split(delimiter).filter(|p| !p.is_empty()) {
            self.text_child_with(name, Some(part), attrs);
        }
    }

    /// Append a child with an explicit empty body (`<name></name>`).
    pub fn empty_child(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Element {
        let mut el = Element::new(name).with_text("");
        for (k, v) in attrs {
            el.set_attr(*k, *v);
        }
        self.push(el)
    }

    /// Find the first direct child with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Serialise as an indented UTF-8 document with an XML declaration.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the writer fails.
    pub fn to_document(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| XmlError(e.to_string()))?;
        self.write(&mut writer)?;
        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(out)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| XmlError(e.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| XmlError(e.to_string()))?;
        // An empty text event keeps the indenter from breaking before `End`.
        if let Some(text) = self.text.as_deref() {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmlError(e.to_string()))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| XmlError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(el: &Element) -> String {
        String::from_utf8(el.to_document().unwrap()).unwrap()
    }

    #[test]
    fn empty_contents_produce_no_child() {
        let mut root = Element::new("root");
        assert!(root.text_child("a", None).is_none());
        assert!(root.text_child("a", Some("")).is_none());
        assert!(root.children.is_empty());
    }

    #[test]
    fn document_has_declaration_and_escapes() {
        let mut root = Element::new("root").with_attr("k", "a\"b");
        root.text_child("t", Some("x < y & z"));
        let out = render(&root);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<t>x &lt; y &amp; z</t>"));
        assert!(out.contains("k=\"a&quot;b\""));
    }

    #[test]
    fn self_closing_vs_explicit_empty() {
        let mut root = Element::new("root");
        root.child("bare");
        root.empty_child("full", &[("role", "url")]);
        let out = render(&root);
        assert!(out.contains("<bare/>"));
        assert!(out.contains("<full role=\"url\"></full>"));
    }

    #[test]
    fn explicit_empty_has_no_whitespace_body() {
        let mut root = Element::new("root");
        let parent = root.child("parent");
        parent.empty_child("full", &[("role", "url")]);
        parent.text_child("after", Some("x"));
        let out = render(&root);
        assert!(out.contains("    <full role=\"url\"></full>\n"));
        assert!(!out.contains("<full role=\"url\">\n"));
        assert!(out.contains("    <after>x</after>\n"));
    }

    #[test]
    fn split_children_skips_empty_parts() {
        let mut root = Element::new("root");
        root.split_children("s", Some("a, b, , c"), ", ", &[("xml:lang", "sv")]);
        let texts: Vec<_> = root
            .children
            .iter()
            .map(|c| c.text.clone().unwrap())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(root.children[0].attr("xml:lang"), Some("sv"));
    }

    #[test]
    fn split_children_without_delimiter_is_single() {
        let mut root = Element::new("root");
        root.split_children("s", Some("only"), ", ", &[]);
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn set_attr_replaces_existing() {
        let mut el = Element::new("e").with_attr("status", "x");
        el.set_attr("status", "deleted");
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.attr("status"), Some("deleted"));
    }
}
