//! Markup serialization
//!
//! Serializes any [`Document`] subtree back to markup. The void element set
//! and escaping rules are shared with the virtual node serializer so that
//! live and virtual trees print identically.

use crate::{Document, NodeId, NodeKind};

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is written without escaping
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Check whether a tag is a void element
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Check whether a tag holds raw text
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|r| r.eq_ignore_ascii_case(tag))
}

/// Escape character data
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize a node including itself
pub fn outer_html(doc: &dyn Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

/// Serialize the children of a node
pub fn inner_html(doc: &dyn Document, node: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(node) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Concatenated text of all descendant text nodes
pub fn text_content(doc: &dyn Document, node: NodeId) -> String {
    if doc.is_text(node) {
        return doc.text(node).unwrap_or_default().to_string();
    }
    doc.descendants(node)
        .into_iter()
        .filter(|&n| doc.is_text(n))
        .filter_map(|n| doc.text(n))
        .collect()
}

fn write_node(doc: &dyn Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Text) => {
            let text = doc.text(node).unwrap_or_default();
            let raw = doc
                .parent(node)
                .and_then(|p| doc.tag_name(p))
                .is_some_and(is_raw_text_element);
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Some(NodeKind::Comment) => {
            out.push_str("<!--");
            out.push_str(doc.text(node).unwrap_or_default());
            out.push_str("-->");
        }
        Some(NodeKind::Element) => {
            let tag = doc.tag_name(node).unwrap_or_default();
            out.push('<');
            out.push_str(tag);
            for name in doc.attribute_names(node) {
                let value = doc.attribute(node, &name).unwrap_or_default();
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_element(tag) {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Some(NodeKind::Document) => {
            for child in doc.children(node) {
                write_node(doc, child, out);
            }
        }
        None => {}
    }
}
