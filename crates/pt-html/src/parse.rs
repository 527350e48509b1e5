//! HTML to [`Document`] conversion.

use std::collections::HashMap;

use scraper::{Html, Node};

use pt_core::Document;

/// Parse an HTML page into an editable document.
///
/// The parser repairs malformed markup the way browsers do, so the tree
/// (implied `html`/`head`/`body` included) matches what a content script sees.
pub fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();

    let root = parsed.tree.root();
    let mut ids = HashMap::new();
    ids.insert(root.id(), doc.root());

    for node in root.descendants().skip(1) {
        let Some(parent) = node.parent() else { continue };
        // Children of skipped nodes are skipped too
        let Some(&parent_id) = ids.get(&parent.id()) else {
            continue;
        };

        let id = match node.value() {
            Node::Element(element) => Some(doc.append_element(parent_id, element.name(), element.attrs())),
            Node::Text(text) => Some(doc.append_text(parent_id, &text.text)),
            Node::Comment(comment) => Some(doc.append_comment(parent_id, &comment.comment)),
            Node::Doctype(doctype) => Some(doc.append_doctype(parent_id, doctype.name())),
            Node::Fragment => Some(doc.append_fragment(parent_id)),
            _ => None,
        };

        if let Some(id) = id {
            ids.insert(node.id(), id);
        }
    }

    doc
}
