//! Live page access through `web-sys`.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomParser, Element, Node, SupportedType};

use pt_core::{DomTree, Error, NodeKind};
use pt_html::{LinkExtractor, RegexExtractor};

fn js_error_text(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// [`DomTree`] over a browser document.
pub struct PageDom {
    document: web_sys::Document,
}

impl PageDom {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The document of the current window, if there is one.
    pub fn current() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }
}

impl DomTree for PageDom {
    type Node = Node;

    fn elements_by_tag_name(&self, tag: &str) -> Vec<Node> {
        // The live collection is snapshotted before any edits
        let collection = self.document.get_elements_by_tag_name(tag);
        (0..collection.length())
            .filter_map(|i| collection.item(i))
            .map(Node::from)
            .collect()
    }

    fn node_kind(&self, node: &Node) -> NodeKind {
        NodeKind::from_node_type(node.node_type())
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() != Node::TEXT_NODE {
            return None;
        }
        node.node_value()
    }

    fn set_text(&mut self, node: &Node, value: &str) -> pt_core::error::Result<()> {
        node.set_node_value(Some(value));
        Ok(())
    }

    fn attribute(&self, element: &Node, name: &str) -> Option<String> {
        element.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn set_attribute(&mut self, element: &Node, name: &str, value: &str) -> pt_core::error::Result<()> {
        element
            .dyn_ref::<Element>()
            .ok_or_else(|| Error::Dom(format!("cannot set '{}' on a non-element node", name)))?
            .set_attribute(name, value)
            .map_err(|e| Error::Dom(js_error_text(&e)))
    }
}

/// Extracts links with the browser's `DOMParser`.
pub struct DomParserExtractor {
    parser: DomParser,
}

impl DomParserExtractor {
    /// Fails where `DOMParser` is not constructible (e.g. service workers).
    pub fn new() -> Result<Self, JsValue> {
        Ok(Self {
            parser: DomParser::new()?,
        })
    }
}

impl LinkExtractor for DomParserExtractor {
    fn name(&self) -> &'static str {
        "domparser"
    }

    fn hrefs(&self, html: &str) -> Vec<String> {
        let document = match self.parser.parse_from_string(html, SupportedType::TextHtml) {
            Ok(document) => document,
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!(
                    "DOMParser failed, using regex extraction: {}",
                    js_error_text(&e)
                )));
                return RegexExtractor::new().hrefs(html);
            }
        };

        let Ok(anchors) = document.query_selector_all("a[href]") else {
            return Vec::new();
        };

        // Raw attribute values; `.href` would resolve relative links
        (0..anchors.length())
            .filter_map(|i| anchors.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter_map(|anchor| anchor.get_attribute("href"))
            .collect()
    }
}

/// `DOMParser` when available, otherwise the regex strategy.
pub fn page_extractor() -> Box<dyn LinkExtractor> {
    match DomParserExtractor::new() {
        Ok(extractor) => Box::new(extractor),
        Err(_) => Box::new(RegexExtractor::new()),
    }
}
