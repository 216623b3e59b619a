//! Virtual tree serialization
//!
//! Uses the same void element set and escaping as
//! [`fos_dom::serialize`], so a rendered tree and the live subtree built
//! from it print identically.

use fos_dom::serialize::{escape_attribute, escape_text, is_raw_text_element, is_void_element};

use crate::{VChild, VNode};

/// Serialize a virtual node to markup
pub fn render_to_text(node: &VNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serialize a child sequence to markup
pub fn children_to_text(children: &[VChild]) -> String {
    let mut out = String::new();
    write_children(children, false, &mut out);
    out
}

fn write_node(node: &VNode, out: &mut String) {
    out.push('<');
    out.push_str(node.tag());
    for (name, value) in node.attrs() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&value.to_text()));
        out.push('"');
    }
    out.push('>');
    if is_void_element(node.tag()) {
        return;
    }
    write_children(node.children(), is_raw_text_element(node.tag()), out);
    out.push_str("</");
    out.push_str(node.tag());
    out.push('>');
}

fn write_children(children: &[VChild], raw: bool, out: &mut String) {
    for child in children {
        match child {
            VChild::Node(node) => write_node(node, out),
            VChild::Text(text) if raw => out.push_str(text),
            VChild::Text(text) => out.push_str(&escape_text(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{make_node, Child, DataRegistry, Value};

    #[test]
    fn test_render_to_text() {
        let mut registry = DataRegistry::new();
        let img = make_node(&mut registry, "img", vec![("alt", Value::from("a \"b\""))], Vec::<Child>::new());
        let p = make_node(
            &mut registry,
            "p",
            vec![("class", Value::from("x"))],
            vec![Child::from("1 < 2"), Child::from(img)],
        );
        assert_eq!(
            render_to_text(&p),
            r#"<p class="x">1 &lt; 2<img alt="a &quot;b&quot;"></p>"#
        );
    }

    #[test]
    fn test_refs_serialize_as_tokens() {
        let mut registry = DataRegistry::new();
        let node = make_node(&mut registry, "x-list", vec![("items", Value::Array(vec![]))], Vec::<Child>::new());
        assert_eq!(render_to_text(&node), r#"<x-list items="--1--"></x-list>"#);
    }
}
