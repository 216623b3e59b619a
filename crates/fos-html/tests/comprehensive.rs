//! Comprehensive tests for fos-html
//!
//! Document and fragment parsing into fos-dom trees.

use fos_dom::serialize::{inner_html, outer_html};
use fos_dom::{Document, DomTree};
use fos_html::{parse, parse_fragment, parse_fragment_into, HtmlParser};

fn find_tag(tree: &DomTree, tag: &str) -> Option<fos_dom::NodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .find(|&n| tree.tag_name(n) == Some(tag))
}

#[test]
fn test_parse_minimal_html() {
    let tree = HtmlParser::new().parse("").unwrap();
    // html5ever always synthesizes html/head/body
    assert!(find_tag(&tree, "body").is_some());
}

#[test]
fn test_parse_nested_structure() {
    let html = r#"
        <html>
            <head><title>Test Page</title></head>
            <body>
                <div id="container">
                    <h1>Welcome</h1>
                    <ul>
                        <li>Item 1</li>
                        <li>Item 2</li>
                    </ul>
                </div>
            </body>
        </html>
    "#;

    let tree = parse(html).unwrap();
    let ul = find_tag(&tree, "ul").unwrap();
    assert_eq!(inner_html(&tree, ul), "<li>Item 1</li><li>Item 2</li>");
    let container = find_tag(&tree, "div").unwrap();
    assert_eq!(tree.attribute(container, "id"), Some("container"));
}

#[test]
fn test_parse_with_attributes() {
    let tree = parse_fragment(r#"<a href="/x" class="link primary" data-id="7">Link</a>"#).unwrap();
    let a = tree.children(tree.root())[0];
    assert_eq!(
        tree.attribute_names(a),
        vec!["href".to_string(), "class".to_string(), "data-id".to_string()]
    );
    assert!(tree.has_class(a, "primary"));
}

#[test]
fn test_fragment_custom_elements() {
    let tree = parse_fragment(r#"<my-card :title="Hi"><span>body</span></my-card>"#).unwrap();
    let card = tree.children(tree.root())[0];
    assert_eq!(tree.tag_name(card), Some("my-card"));
    assert_eq!(tree.attribute(card, ":title"), Some("Hi"));
    assert_eq!(outer_html(&tree, card), r#"<my-card :title="Hi"><span>body</span></my-card>"#);
}

#[test]
fn test_fragment_into_existing_document() {
    let mut doc = DomTree::new();
    let host = doc.create_element("div");
    let root = doc.root();
    doc.append_child(root, host).unwrap();

    let created = parse_fragment_into(&mut doc, host, "<b>one</b><i>two</i>").unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(inner_html(&doc, host), "<b>one</b><i>two</i>");
}

#[test]
fn test_whitespace_only_text_is_skipped() {
    let tree = parse_fragment("<ul>\n  <li>a</li>\n</ul>").unwrap();
    let ul = tree.children(tree.root())[0];
    assert_eq!(tree.children(ul).len(), 1);
}
