//! HTML5 Parser implementation
//!
//! Uses html5ever's built-in RcDom and converts to our DOM format.
//! This is simpler and more reliable than implementing TreeSink directly.

use fos_dom::{Document, DomTree, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML string into a document tree
    pub fn parse(&self, html: &str) -> Result<DomTree, ParseError> {
        tracing::debug!("Parsing HTML document ({} bytes)", html.len());

        let dom = Self::read(html)?;
        let mut tree = DomTree::new();
        let root = tree.root();
        for child in dom.document.children.borrow().iter() {
            self.convert_node(child, &mut tree, root)?;
        }

        tracing::debug!("Parsed {} nodes", tree.len());
        Ok(tree)
    }

    /// Parse body content into a fresh tree; the nodes sit under the root
    pub fn parse_fragment(&self, html: &str) -> Result<DomTree, ParseError> {
        let mut tree = DomTree::new();
        let root = tree.root();
        self.parse_fragment_into(&mut tree, root, html)?;
        Ok(tree)
    }

    /// Parse body content and append it to `parent` in `doc`.
    ///
    /// html5ever hoists leading metadata elements (`style`, `script`,
    /// `link`, ...) into `<head>`; those are appended first, in source
    /// order, followed by the body content.
    pub fn parse_fragment_into(
        &self,
        doc: &mut dyn Document,
        parent: NodeId,
        html: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let dom = Self::read(html)?;
        let mut created = Vec::new();

        let Some(html_el) = find_element(&dom.document, "html") else {
            return Ok(created);
        };
        for section in ["head", "body"] {
            let Some(container) = find_element(&html_el, section) else {
                continue;
            };
            for child in container.children.borrow().iter() {
                if let Some(id) = self.convert_node(child, doc, parent)? {
                    created.push(id);
                }
            }
        }

        tracing::trace!("Parsed fragment into {} top-level nodes", created.len());
        Ok(created)
    }

    fn read(html: &str) -> Result<RcDom, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    /// Convert an RcDom node to our DOM format, returning the created node
    fn convert_node(
        &self,
        handle: &Handle,
        doc: &mut dyn Document,
        parent: NodeId,
    ) -> Result<Option<NodeId>, ParseError> {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, doc, parent)?;
                }
                Ok(None)
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return Ok(None);
                }
                let id = doc.create_text(&text);
                doc.append_child(parent, id)?;
                Ok(Some(id))
            }
            RcNodeData::Element { name, attrs, .. } => {
                let id = doc.create_element(name.local.as_ref());
                for attr in attrs.borrow().iter() {
                    doc.set_attribute(id, attr.name.local.as_ref(), &attr.value)?;
                }
                doc.append_child(parent, id)?;

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, doc, id)?;
                }
                Ok(Some(id))
            }
            // Doctypes, comments and processing instructions carry nothing
            // the component runtime reads
            RcNodeData::Doctype { .. }
            | RcNodeData::Comment { .. }
            | RcNodeData::ProcessingInstruction { .. } => Ok(None),
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .find(|child| matches!(&child.data, RcNodeData::Element { name, .. } if name.local.as_ref() == tag))
        .cloned()
}
