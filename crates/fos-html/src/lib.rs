//! fOS HTML Parser
//!
//! HTML5 parsing built on html5ever. Produces [`fos_dom::DomTree`]s for
//! host fixtures and parses light content fragments into an existing
//! document.

mod parser;

pub use parser::HtmlParser;

use fos_dom::{Document, DomTree, NodeId};

/// Parse a full HTML document
pub fn parse(html: &str) -> Result<DomTree, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse markup as body content, placed directly under the tree root
pub fn parse_fragment(html: &str) -> Result<DomTree, ParseError> {
    HtmlParser::new().parse_fragment(html)
}

/// Parse markup and append the resulting nodes to `parent`
pub fn parse_fragment_into(
    doc: &mut dyn Document,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, ParseError> {
    HtmlParser::new().parse_fragment_into(doc, parent, html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build document: {0}")]
    Dom(#[from] fos_dom::DomError),
}
