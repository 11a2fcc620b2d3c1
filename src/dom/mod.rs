//! Mutable markup tree.
//!
//! A thin layer over the `kuchikikiki` DOM. Documents are parsed with the
//! HTML5 tree builder, so entities are decoded once on the way in and
//! escaped again on the way out; the pipeline only ever sees plain values.
//!
//! ```text
//! Document
//! ├── Doctype  <!DOCTYPE html>
//! └── Element  <html>
//!     ├── Element <head> ── Element <link rel="stylesheet" href="app.css">
//!     └── Element <body> ── Element <script src="app.js"> ── Text
//! ```

use std::fmt;
use std::io;

use kuchikikiki::traits::TendrilSink;
use kuchikikiki::{ElementData, NodeRef, parse_html};

/// Handle to a node inside a [`Document`].
///
/// Handles stay valid after the node is detached.
#[derive(Clone, PartialEq)]
pub struct NodeId(NodeRef);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_element() {
            Some(el) => write!(f, "NodeId(<{}>)", &*el.name.local),
            None => f.write_str("NodeId(..)"),
        }
    }
}

/// Attribute access shared by anything carrying HTML attributes.
///
/// Names compare ASCII case-insensitively, as HTML attribute names do.
pub trait AttrAccess {
    /// Attribute value; boolean attributes yield `Some("")`.
    fn attr(&self, name: &str) -> Option<String>;

    fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute in place, appending it when absent.
    fn set_attr(&mut self, name: &str, value: &str);

    /// Remove an attribute. Returns whether it was present.
    fn remove_attr(&mut self, name: &str) -> bool;
}

/// Element view. Writes go straight to the tree.
pub struct Element<'a> {
    data: &'a ElementData,
}

impl AttrAccess for Element<'_> {
    fn attr(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.data
            .attributes
            .borrow()
            .get(name.as_str())
            .map(str::to_string)
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        self.data
            .attributes
            .borrow_mut()
            .insert(name.as_str(), value.to_string());
    }

    fn remove_attr(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.data
            .attributes
            .borrow_mut()
            .remove(name.as_str())
            .is_some()
    }
}

/// A parsed markup document.
pub struct Document {
    root: NodeRef,
}

impl Document {
    /// Parse markup text. Parsing never fails; the tree builder recovers
    /// from malformed markup the way browsers do.
    pub fn parse(html: &str) -> Self {
        Self {
            root: parse_html().one(html),
        }
    }

    /// Serialize the tree back to markup text.
    pub fn serialize(&self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.root.serialize(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn element<'a>(&self, id: &'a NodeId) -> Option<Element<'a>> {
        id.0.as_element().map(|data| Element { data })
    }

    /// All attached elements with the given tag name, in document order.
    pub fn select(&self, tag: &str) -> Vec<NodeId> {
        self.root
            .descendants()
            .filter(|node| is_tag(node, tag))
            .map(NodeId)
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self, id: &NodeId) -> String {
        id.0.text_contents()
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: &NodeId, text: &str) {
        let children: Vec<_> = id.0.children().collect();
        for child in children {
            child.detach();
        }
        if !text.is_empty() {
            id.0.append(NodeRef::new_text(text));
        }
    }

    /// Create a detached element without attributes.
    ///
    /// Returns `None` if `tag` is not a name the tree builder keeps as an
    /// element.
    pub fn create_element(&mut self, tag: &str) -> Option<NodeId> {
        let scratch = parse_html().one(format!("<{tag}></{tag}>"));
        let node = scratch
            .descendants()
            .find(|node| is_tag(node, tag))?;
        node.detach();
        Some(NodeId(node))
    }

    /// Insert `node` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, node: &NodeId, reference: &NodeId) {
        node.0.detach();
        reference.0.insert_before(node.0.clone());
    }

    /// Remove a node (and its subtree) from the tree.
    pub fn detach(&mut self, id: &NodeId) {
        id.0.detach();
    }
}

fn is_tag(node: &NodeRef, tag: &str) -> bool {
    node.as_element()
        .is_some_and(|el| (*el.name.local).eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "<!DOCTYPE html><html><head>",
        r#"<link rel="stylesheet" href="a.css">"#,
        "<style>body { color: red; }</style>",
        "</head><body>",
        r#"<script src="a.js"></script>"#,
        "<script>var x = 1 < 2 && y;</script>",
        "</body></html>",
    );

    fn serialize(doc: &Document) -> String {
        doc.serialize().unwrap()
    }

    #[test]
    fn test_round_trip_untouched() {
        let doc = Document::parse(PAGE);
        assert_eq!(serialize(&doc), PAGE);
    }

    #[test]
    fn test_select_document_order() {
        let doc = Document::parse(PAGE);
        let scripts = doc.select("script");
        assert_eq!(scripts.len(), 2);
        let first = doc.element(&scripts[0]).unwrap();
        assert_eq!(first.attr("src").as_deref(), Some("a.js"));
        assert!(!doc.element(&scripts[1]).unwrap().has_attr("src"));
    }

    #[test]
    fn test_text_of_raw_element() {
        let doc = Document::parse(PAGE);
        let scripts = doc.select("script");
        assert_eq!(doc.text(&scripts[1]), "var x = 1 < 2 && y;");
        let styles = doc.select("style");
        assert_eq!(doc.text(&styles[0]), "body { color: red; }");
    }

    #[test]
    fn test_entities_in_attributes_survive() {
        let html = r#"<html><head></head><body><p title="&copy; 2024 &mdash; x" data-q="a &amp; &quot;b&quot;">x &lt; y</p></body></html>"#;
        let doc = Document::parse(html);
        let p = doc.select("p").remove(0);
        let el = doc.element(&p).unwrap();
        assert_eq!(el.attr("title").as_deref(), Some("\u{a9} 2024 \u{2014} x"));
        assert_eq!(el.attr("data-q").as_deref(), Some(r#"a & "b""#));

        let out = serialize(&doc);
        assert!(out.contains("title=\"\u{a9} 2024 \u{2014} x\""));
        assert!(out.contains(r#"data-q="a &amp; &quot;b&quot;""#));
        assert!(out.contains("x &lt; y"));
        assert!(!out.contains("&amp;copy;"));
    }

    #[test]
    fn test_set_attr_escapes_value() {
        let doc = Document::parse(r#"<html><head><link href="a.css"></head><body></body></html>"#);
        let link = doc.select("link").remove(0);
        doc.element(&link).unwrap().set_attr("title", r#"a & "b""#);
        let out = serialize(&doc);
        assert!(out.contains(r#"title="a &amp; &quot;b&quot;""#));
    }

    #[test]
    fn test_set_attr_keeps_order() {
        let doc = Document::parse(
            r#"<html><head><link media="print" rel="stylesheet/less" href="a.less" id="x"></head><body></body></html>"#,
        );
        let link = doc.select("link").remove(0);
        let mut el = doc.element(&link).unwrap();
        el.set_attr("rel", "stylesheet");
        el.set_attr("HREF", "a-123.css");
        assert_eq!(
            serialize(&doc),
            r#"<html><head><link media="print" rel="stylesheet" href="a-123.css" id="x"></head><body></body></html>"#
        );
    }

    #[test]
    fn test_remove_attr() {
        let doc = Document::parse(r#"<html><head></head><body><script @bundle="core" src="a.js"></script></body></html>"#);
        let id = doc.select("script").remove(0);
        let mut el = doc.element(&id).unwrap();
        assert_eq!(el.attr("@bundle").as_deref(), Some("core"));
        assert!(el.remove_attr("@bundle"));
        assert!(!el.remove_attr("@bundle"));
        assert_eq!(
            serialize(&doc),
            r#"<html><head></head><body><script src="a.js"></script></body></html>"#
        );
    }

    #[test]
    fn test_boolean_attribute_is_empty() {
        let doc = Document::parse("<html><head></head><body><script @remove></script></body></html>");
        let id = doc.select("script").remove(0);
        assert_eq!(doc.element(&id).unwrap().attr("@remove").as_deref(), Some(""));
    }

    #[test]
    fn test_insert_before_and_detach() {
        let mut doc = Document::parse(
            "<html><head></head><body><p></p><script src=a.js></script><script src=b.js></script></body></html>",
        );
        let scripts = doc.select("script");
        let bundle = doc.create_element("script").unwrap();
        doc.insert_before(&bundle, &scripts[0]);
        doc.element(&bundle).unwrap().set_attr("src", "core.js");
        for id in &scripts {
            doc.detach(id);
        }
        assert_eq!(
            serialize(&doc),
            r#"<html><head></head><body><p></p><script src="core.js"></script></body></html>"#
        );
    }

    #[test]
    fn test_detached_nodes_not_selected() {
        let mut doc = Document::parse("<html><head></head><body><div><script></script></div></body></html>");
        let div = doc.select("div").remove(0);
        doc.detach(&div);
        assert!(doc.select("script").is_empty());
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut doc = Document::parse("<html><head><style>a { b: c }</style></head><body></body></html>");
        let style = doc.select("style").remove(0);
        doc.set_text(&style, "a{b:c}");
        assert_eq!(
            serialize(&doc),
            "<html><head><style>a{b:c}</style></head><body></body></html>"
        );
        doc.set_text(&style, "");
        assert_eq!(serialize(&doc), "<html><head><style></style></head><body></body></html>");
    }
}
