//! fOS CSS
//!
//! Selector parsing and matching for event delegation, component
//! stylesheet scoping, and lightningcss-backed minification.

mod parser;
mod scope;
pub mod selectors;

pub use parser::CssParser;
pub use scope::{scope_selector, scope_stylesheet};
pub use selectors::SelectorList;

/// Pseudo-selector naming the component host
pub const HOST_SELECTOR: &str = ":host";

/// Minify a stylesheet
pub fn minify_stylesheet(css: &str) -> Result<String, CssError> {
    CssParser::new().minify(css)
}

/// CSS error
#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("Invalid selector at {position}: {message}")]
    Selector { position: usize, message: String },

    #[error("Stylesheet error: {0}")]
    Stylesheet(String),
}
