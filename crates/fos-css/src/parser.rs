//! CSS Parser using lightningcss
//!
//! Minifies component stylesheets.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use crate::CssError;

/// CSS Parser
pub struct CssParser;

impl CssParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse and print a stylesheet without insignificant whitespace
    pub fn minify(&self, css: &str) -> Result<String, CssError> {
        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| CssError::Stylesheet(e.to_string()))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| CssError::Stylesheet(e.to_string()))?;

        tracing::trace!("Minified stylesheet {} -> {} bytes", css.len(), printed.code.len());
        Ok(printed.code)
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify() {
        let css = "my-card .name {\n  color: red;\n}\n";
        let out = CssParser::new().minify(css).unwrap();
        assert_eq!(out, "my-card .name{color:red}");
    }
}
