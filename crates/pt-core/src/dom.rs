//! Document tree abstraction
//!
//! The matching engine edits pages through [`DomTree`]. The wasm bindings
//! implement it over the live page; [`Document`] is an arena-backed tree used
//! by the CLI (fed by the HTML parser in `pt-html`) and by tests.

use std::fmt::Write as _;

use crate::error::{Error, Result};

/// Kind of a node, mirroring the DOM `nodeType` values the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Document,
    Fragment,
    Other,
}

impl NodeKind {
    /// Map a DOM `nodeType` number.
    pub fn from_node_type(node_type: u16) -> Self {
        match node_type {
            1 => Self::Element,
            3 => Self::Text,
            8 => Self::Comment,
            9 => Self::Document,
            11 => Self::Fragment,
            _ => Self::Other,
        }
    }

    /// Whether text collection descends into this node's children.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Element | Self::Document | Self::Fragment)
    }
}

/// Mutable view of a document.
pub trait DomTree {
    type Node: Clone;

    /// Elements with the given tag name in document order, nested ones
    /// included. Matching is ASCII case-insensitive and `*` matches all.
    fn elements_by_tag_name(&self, tag: &str) -> Vec<Self::Node>;

    fn node_kind(&self, node: &Self::Node) -> NodeKind;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Value of a text node, `None` for other kinds.
    fn text(&self, node: &Self::Node) -> Option<String>;

    fn set_text(&mut self, node: &Self::Node, value: &str) -> Result<()>;

    fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Collect every text node under `node`, depth-first.
    fn text_nodes_under(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        collect_text_nodes(self, node, &mut out);
        out
    }
}

fn collect_text_nodes<T: DomTree + ?Sized>(tree: &T, node: &T::Node, out: &mut Vec<T::Node>) {
    match tree.node_kind(node) {
        NodeKind::Text => out.push(node.clone()),
        kind if kind.is_container() => {
            for child in tree.children(node) {
                collect_text_nodes(tree, &child, out);
            }
        }
        _ => {}
    }
}

// =============================================================================
// In-memory Document
// =============================================================================

/// Index of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Fragment,
    Doctype(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeEntry>,
}

/// Elements whose content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeEntry {
                data: NodeData::Document,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            data,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element<I, K, V>(&mut self, parent: NodeId, name: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attrs = attrs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.push(
            parent,
            NodeData::Element {
                name: name.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Text(text.to_string()))
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Comment(text.to_string()))
    }

    pub fn append_doctype(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(parent, NodeData::Doctype(name.to_string()))
    }

    pub fn append_fragment(&mut self, parent: NodeId) -> NodeId {
        self.push(parent, NodeData::Fragment)
    }

    /// Tag name of an element node.
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry> {
        self.nodes
            .get(node.0)
            .ok_or_else(|| Error::Dom(format!("unknown node {}", node.0)))
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry> {
        self.nodes
            .get_mut(node.0)
            .ok_or_else(|| Error::Dom(format!("unknown node {}", node.0)))
    }

    fn walk_preorder(&self, node: NodeId, out: &mut Vec<NodeId>) {
        out.push(node);
        for &child in &self.nodes[node.0].children {
            self.walk_preorder(child, out);
        }
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.text_nodes_under(&node)
            .into_iter()
            .filter_map(|n| self.text(&n))
            .collect()
    }

    /// Serialize the document back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in &self.nodes[0].children {
            self.serialize(child, false, &mut out);
        }
        out
    }

    fn serialize(&self, node: NodeId, raw_text: bool, out: &mut String) {
        let entry = &self.nodes[node.0];
        match &entry.data {
            NodeData::Document | NodeData::Fragment => {
                for &child in &entry.children {
                    self.serialize(child, raw_text, out);
                }
            }
            NodeData::Doctype(name) => {
                let _ = write!(out, "<!DOCTYPE {}>", name);
            }
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_into(text, false, out);
                }
            }
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                for &child in &entry.children {
                    self.serialize(child, raw, out);
                }
                let _ = write!(out, "</{}>", name);
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

impl DomTree for Document {
    type Node = NodeId;

    fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.walk_preorder(self.root(), &mut order);

        let any = tag == "*";
        order
            .into_iter()
            .filter(|&id| match &self.nodes[id.0].data {
                NodeData::Element { name, .. } => any || name.eq_ignore_ascii_case(tag),
                _ => false,
            })
            .collect()
    }

    fn node_kind(&self, node: &NodeId) -> NodeKind {
        match self.nodes.get(node.0).map(|e| &e.data) {
            Some(NodeData::Element { .. }) => NodeKind::Element,
            Some(NodeData::Text(_)) => NodeKind::Text,
            Some(NodeData::Comment(_)) => NodeKind::Comment,
            Some(NodeData::Document) => NodeKind::Document,
            Some(NodeData::Fragment) => NodeKind::Fragment,
            Some(NodeData::Doctype(_)) | None => NodeKind::Other,
        }
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: &NodeId, value: &str) -> Result<()> {
        match &mut self.entry_mut(*node)?.data {
            NodeData::Text(text) => {
                *text = value.to_string();
                Ok(())
            }
            _ => Err(Error::Dom(format!("node {} is not a text node", node.0))),
        }
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        match &self.entry(*element).ok()?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<()> {
        match &mut self.entry_mut(*element)?.data {
            NodeData::Element { attrs, .. } => {
                match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                    Some((_, v)) => *v = value.to_string(),
                    None => attrs.push((name.to_ascii_lowercase(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(Error::Dom(format!("node {} is not an element", element.0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.append_element(root, "BODY", Vec::<(&str, &str)>::new());
        let outer = doc.append_element(body, "div", [("class", "a")]);
        doc.append_text(outer, "one ");
        let inner = doc.append_element(outer, "div", [("class", "b")]);
        doc.append_text(inner, "two");
        doc.append_comment(inner, "skip me");
        doc.append_text(outer, " three");
        (doc, outer, inner)
    }

    #[test]
    fn finds_elements_in_document_order() {
        let (doc, outer, inner) = sample();
        assert_eq!(doc.elements_by_tag_name("DIV"), vec![outer, inner]);
        assert_eq!(doc.elements_by_tag_name("*").len(), 3);
        assert!(doc.elements_by_tag_name("span").is_empty());
    }

    #[test]
    fn collects_text_nodes_depth_first() {
        let (doc, outer, _) = sample();
        let texts: Vec<_> = doc
            .text_nodes_under(&outer)
            .iter()
            .filter_map(|n| doc.text(n))
            .collect();
        assert_eq!(texts, vec!["one ", "two", " three"]);
        assert_eq!(doc.text_content(outer), "one two three");
    }

    #[test]
    fn attributes_are_case_insensitive() {
        let (mut doc, outer, _) = sample();
        assert_eq!(doc.attribute(&outer, "CLASS").as_deref(), Some("a"));
        doc.set_attribute(&outer, "Class", "z").unwrap();
        assert_eq!(doc.attribute(&outer, "class").as_deref(), Some("z"));
    }

    #[test]
    fn set_text_rejects_elements() {
        let (mut doc, outer, _) = sample();
        assert!(doc.set_text(&outer, "x").is_err());
    }

    #[test]
    fn serializes_html() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.append_element(root, "p", [("title", "a \"q\"")]);
        doc.append_text(p, "1 < 2 & 3");
        doc.append_element(p, "br", Vec::<(&str, &str)>::new());
        let script = doc.append_element(root, "script", Vec::<(&str, &str)>::new());
        doc.append_text(script, "if (a < b) {}");
        assert_eq!(
            doc.to_html(),
            "<p title=\"a &quot;q&quot;\">1 &lt; 2 &amp; 3<br></p><script>if (a < b) {}</script>"
        );
    }
}
