//! fOS Template Compiler
//!
//! Compiles component source (one root element holding markup, `<style>`
//! and `<script>` blocks) into a [`CompiledComponent`]: the tag name, a
//! render function producing virtual nodes, scoped styles and the parsed
//! script table.
//!
//! Expression grammar inside text and attribute values:
//!
//! | token          | meaning                                       |
//! |----------------|-----------------------------------------------|
//! | `{{p}}`        | escaped lookup                                |
//! | `{{{p}}}`      | unescaped lookup, parsed as markup            |
//! | `{{#p}}..{{/p}}` | repeat per element of `p`                   |
//! | `{{^p}}..{{/p}}` | render once if `p` is falsy or empty        |
//! | `{{%p,q}}`     | inline style declarations                     |
//! | `{{+p}}`       | data registry token for `p`                   |
//! | `{{!c}}`       | comment                                       |

mod ast;
mod scanner;
mod parser;
mod render;
mod style;
mod script;

use std::rc::Rc;

use fos_vdom::{children_to_text, DataRegistry, RenderContext, RenderFn, Value};

pub use ast::{Attr, AttrPart, AttrSection, AttrTemplate, Element, Expr, ExprKind, Node, Path, PathRoot, Section};
pub use render::Template;
pub use script::ScriptTable;
pub use style::{kebab_case, style_declarations, DEFAULT_UNIT};

/// Template compile error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No root element found")]
    NoRootElement,

    #[error("Mismatched closing tag </{found}> at {offset}, expected </{expected}>")]
    MismatchedTag { expected: String, found: String, offset: usize },

    #[error("Closing tag </{tag}> at {offset} has no open element")]
    UnexpectedClosingTag { tag: String, offset: usize },

    #[error("Element <{tag}> opened at {offset} is never closed")]
    UnclosedTag { tag: String, offset: usize },

    #[error("Block '{path}' opened at {offset} is never closed")]
    UnterminatedBlock { path: String, offset: usize },

    #[error("Block end '{path}' at {offset} has no open block")]
    UnexpectedBlockEnd { path: String, offset: usize },

    #[error("Block end '{found}' at {offset} does not close block '{expected}'")]
    MismatchedBlock { expected: String, found: String, offset: usize },

    #[error("Invalid script table: {0}")]
    InvalidScript(#[from] serde_json::Error),
}

/// Compiler options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Minify scoped styles with lightningcss
    pub minify_styles: bool,
}

/// Output of [`compile`]
#[derive(Debug, Clone)]
pub struct CompiledComponent {
    pub tag_name: String,
    pub template: Rc<Template>,
    /// Scoped stylesheets, one per `<style>` block
    pub styles: Vec<String>,
    pub functions: ScriptTable,
    /// Script block text as written
    pub functions_source: String,
}

impl CompiledComponent {
    pub fn render_fn(&self) -> RenderFn {
        let template = Rc::clone(&self.template);
        Rc::new(move |ctx: &mut RenderContext<'_>, data: &Value| template.render(ctx, data))
    }

    /// Render into markup with a throwaway registry
    pub fn render_to_string(&self, data: &Value) -> String {
        let mut registry = DataRegistry::new();
        let mut ctx = RenderContext::new(&mut registry);
        children_to_text(&self.template.render(&mut ctx, data))
    }
}

/// Compile component source with default options
pub fn compile(source: &str) -> Result<CompiledComponent, ParseError> {
    compile_with(source, &CompileOptions::default())
}

/// Compile component source
pub fn compile_with(source: &str, options: &CompileOptions) -> Result<CompiledComponent, ParseError> {
    let mut root = None;
    for node in parser::parse(source)? {
        match node {
            Node::Element(element) if root.is_none() => root = Some(element),
            Node::Text(text) if text.trim().is_empty() => {}
            other => tracing::warn!("Ignoring content outside the root element: {:?}", other),
        }
    }
    let root = root.ok_or(ParseError::NoRootElement)?;
    let tag_name = root.tag;

    let mut styles = Vec::new();
    let mut functions = ScriptTable::default();
    let mut sources = Vec::new();
    let mut body = Vec::new();

    for child in root.children {
        match child {
            Node::Element(element) if element.tag == "style" => {
                let scoped = fos_css::scope_stylesheet(&literal_text(&element.children), &tag_name);
                styles.push(if options.minify_styles { minify(scoped) } else { scoped });
            }
            Node::Element(element) if element.tag == "script" => {
                let source = literal_text(&element.children);
                functions.merge(ScriptTable::parse(&source)?);
                sources.push(source.trim().to_string());
            }
            other => body.push(other),
        }
    }

    tracing::debug!(
        "Compiled <{}>: {} nodes, {} styles, {} script blocks",
        tag_name,
        body.len(),
        styles.len(),
        sources.len()
    );

    Ok(CompiledComponent {
        tag_name,
        template: Rc::new(Template::new(body)),
        styles,
        functions,
        functions_source: sources.join("\n"),
    })
}

/// Compile a bare template fragment with no root element requirements
pub fn compile_template(markup: &str) -> Result<Template, ParseError> {
    Ok(Template::new(parser::parse(markup)?))
}

fn literal_text(nodes: &[Node]) -> String {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn minify(css: String) -> String {
    match fos_css::minify_stylesheet(&css) {
        Ok(minified) => minified,
        Err(e) => {
            tracing::warn!("Keeping unminified styles: {}", e);
            css
        }
    }
}
