//! Template Renderer
//!
//! Evaluates a template AST against a data snapshot and produces virtual
//! children through [`RenderContext`]. Scopes form a stack: the root holds
//! the snapshot and each block iteration pushes its element.

use fos_dom::serialize::is_void_element;
use fos_vdom::{normalize_children, Child, RenderContext, VChild, Value};

use crate::ast::{AttrPart, AttrTemplate, Element, Expr, ExprKind, Node, Path, PathRoot};
use crate::scanner::{scan_markup, Token};
use crate::style::{style_declarations, DEFAULT_UNIT};

/// Compiled template body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against `data`
    pub fn render(&self, ctx: &mut RenderContext<'_>, data: &Value) -> Vec<VChild> {
        let mut renderer = Renderer::new(ctx, data);
        let mut children = Vec::new();
        renderer.render_nodes(&self.nodes, &mut children);
        normalize_children(children)
    }
}

struct Scope {
    value: Value,
    index: Option<usize>,
    length: Option<usize>,
}

struct Renderer<'c, 'r> {
    ctx: &'c mut RenderContext<'r>,
    scopes: Vec<Scope>,
}

impl<'c, 'r> Renderer<'c, 'r> {
    fn new(ctx: &'c mut RenderContext<'r>, data: &Value) -> Self {
        let root = Scope { value: data.clone(), index: None, length: None };
        Self { ctx, scopes: vec![root] }
    }

    fn render_nodes(&mut self, nodes: &[Node], out: &mut Vec<Child>) {
        for node in nodes {
            match node {
                Node::Element(element) => {
                    let vnode = self.render_element(element);
                    out.push(Child::Node(vnode));
                }
                Node::Text(text) => out.push(Child::Text(text.clone())),
                Node::Expr(expr) => self.render_expr(expr, out),
                Node::Section(section) => {
                    let repeats = self.section(&section.path, section.inverted, |renderer| {
                        let mut children = Vec::new();
                        renderer.render_nodes(&section.children, &mut children);
                        children
                    });
                    out.extend(repeats.into_iter().flatten());
                }
            }
        }
    }

    fn render_element(&mut self, element: &Element) -> fos_vdom::VNode {
        let attrs: Vec<(String, Value)> = element
            .attrs
            .iter()
            .map(|attr| (attr.name.clone(), self.attribute_value(&attr.value)))
            .collect();
        let mut children = Vec::new();
        self.render_nodes(&element.children, &mut children);
        self.ctx.make_node(&element.tag, attrs, children)
    }

    fn render_expr(&mut self, expr: &Expr, out: &mut Vec<Child>) {
        match expr.kind {
            ExprKind::Escaped => out.push(Child::Text(self.resolve(expr.path()).to_text())),
            ExprKind::Raw => {
                let markup = self.resolve(expr.path()).to_text();
                out.extend(parse_markup(self.ctx, &markup));
            }
            ExprKind::Style => out.push(Child::Text(self.style(expr))),
            ExprKind::Register => {
                let value = self.resolve(expr.path());
                out.push(Child::Text(self.ctx.register(value)));
            }
        }
    }

    fn attribute_value(&mut self, template: &AttrTemplate) -> Value {
        match template {
            AttrTemplate::Static(text) => Value::String(text.clone()),
            AttrTemplate::Single(expr) if expr.kind == ExprKind::Style => Value::String(self.style(expr)),
            // make_node parks non-primitive values in the registry
            AttrTemplate::Single(expr) => self.resolve(expr.path()),
            AttrTemplate::Mixed(parts) => Value::String(self.attribute_text(parts)),
        }
    }

    fn attribute_text(&mut self, parts: &[AttrPart]) -> String {
        let mut text = String::new();
        for part in parts {
            match part {
                AttrPart::Text(literal) => text.push_str(literal),
                AttrPart::Expr(expr) => match expr.kind {
                    ExprKind::Style => text.push_str(&self.style(expr)),
                    ExprKind::Register => {
                        let value = self.resolve(expr.path());
                        text.push_str(&self.ctx.register(value));
                    }
                    ExprKind::Escaped | ExprKind::Raw => {
                        text.push_str(&self.resolve(expr.path()).to_text());
                    }
                },
                AttrPart::Section(section) => {
                    let repeats = self.section(&section.path, section.inverted, |renderer| {
                        renderer.attribute_text(&section.parts)
                    });
                    text.extend(repeats);
                }
            }
        }
        text
    }

    /// Run `body` once per repeat of a block and collect the results
    fn section<T>(&mut self, path: &Path, inverted: bool, mut body: impl FnMut(&mut Self) -> T) -> Vec<T> {
        let value = self.resolve(path);

        if inverted {
            let empty = !value.is_truthy() || value.len() == Some(0);
            return if empty { vec![body(self)] } else { Vec::new() };
        }

        let items = match value {
            Value::Array(items) => items,
            value if value.is_truthy() => vec![value],
            _ => Vec::new(),
        };
        let length = items.len();
        let mut repeats = Vec::with_capacity(length);
        for (index, item) in items.into_iter().enumerate() {
            self.scopes.push(Scope { value: item, index: Some(index), length: Some(length) });
            repeats.push(body(self));
            self.scopes.pop();
        }
        repeats
    }

    fn current(&self) -> Value {
        self.scopes.last().map(|scope| scope.value.clone()).unwrap_or_default()
    }

    /// Look a path up, innermost scope first; missing values are null
    fn resolve(&self, path: &Path) -> Value {
        let base = match path.root() {
            PathRoot::Current => self.current(),
            PathRoot::Index => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.index)
                .map(Value::from)
                .unwrap_or_default(),
            PathRoot::Length => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.length)
                .map(Value::from)
                .unwrap_or_default(),
            PathRoot::Named(name) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| lookup(&scope.value, name))
                .unwrap_or_default(),
        };

        path.rest()
            .iter()
            .try_fold(base, |value, segment| lookup(&value, segment))
            .unwrap_or_default()
    }

    fn style(&self, expr: &Expr) -> String {
        let unit = self.resolve(&Path::parse("styles.defaultUnit")).to_text();
        let unit = if unit.is_empty() { DEFAULT_UNIT } else { unit.as_str() };
        let values: Vec<Value> = expr.paths.iter().map(|path| self.resolve(path)).collect();
        style_declarations(&values, &self.current(), unit)
    }
}

fn lookup(value: &Value, key: &str) -> Option<Value> {
    if let Some(found) = value.get(key) {
        return Some(found.clone());
    }
    if key == "length" {
        return value.len().map(Value::from);
    }
    None
}

struct OpenElement {
    tag: String,
    attrs: Vec<(String, Value)>,
    children: Vec<Child>,
}

/// Lenient markup parse for unescaped values: stray end tags are ignored
/// and open elements close at the end of input
fn parse_markup(ctx: &mut RenderContext<'_>, markup: &str) -> Vec<Child> {
    let mut top = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();

    fn close(ctx: &mut RenderContext<'_>, stack: &mut Vec<OpenElement>, top: &mut Vec<Child>) {
        if let Some(open) = stack.pop() {
            let node = ctx.make_node(&open.tag, open.attrs, open.children);
            match stack.last_mut() {
                Some(parent) => parent.children.push(Child::Node(node)),
                None => top.push(Child::Node(node)),
            }
        }
    }

    for token in scan_markup(markup) {
        match token {
            Token::Text(text) | Token::RawText(text) => match stack.last_mut() {
                Some(parent) => parent.children.push(Child::Text(text)),
                None => top.push(Child::Text(text)),
            },
            Token::StartTag { name, attrs, self_closing, .. } => {
                let attrs = attrs
                    .into_iter()
                    .map(|attr| (attr.name, Value::String(attr.value.unwrap_or_default())))
                    .collect();
                let open = OpenElement { tag: name, attrs, children: Vec::new() };
                let is_leaf = self_closing || is_void_element(&open.tag);
                stack.push(open);
                if is_leaf {
                    close(ctx, &mut stack, &mut top);
                }
            }
            Token::EndTag { name, .. } => {
                if let Some(depth) = stack.iter().rposition(|open| open.tag == name) {
                    while stack.len() > depth {
                        close(ctx, &mut stack, &mut top);
                    }
                }
            }
            Token::Mustache { .. } => {}
        }
    }

    while !stack.is_empty() {
        close(ctx, &mut stack, &mut top);
    }
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_template;
    use fos_vdom::{children_to_text, DataRegistry};
    use serde_json::json;

    fn render(markup: &str, data: serde_json::Value) -> String {
        let template = compile_template(markup).unwrap();
        let mut registry = DataRegistry::new();
        let mut ctx = RenderContext::new(&mut registry);
        children_to_text(&template.render(&mut ctx, &Value::from(data)))
    }

    #[test]
    fn test_escaped_lookup() {
        assert_eq!(render("<h1>{{x}}</h1>", json!({"x": "A&B"})), "<h1>A&amp;B</h1>");
    }

    #[test]
    fn test_block_index() {
        assert_eq!(render("{{#list}}{{.index}}{{/list}}", json!({"list": [1, 2]})), "01");
    }

    #[test]
    fn test_inverted_block() {
        assert_eq!(render("{{^empty}}X{{/empty}}", json!({"empty": []})), "X");
        assert_eq!(render("{{^empty}}X{{/empty}}", json!({"empty": true})), "");
    }

    #[test]
    fn test_scope_fallthrough() {
        let out = render(
            "{{#items}}{{name}}-{{title}};{{/items}}",
            json!({"title": "T", "items": [{"name": "a"}, {"name": "b", "title": "U"}]}),
        );
        assert_eq!(out, "a-T;b-U;");
    }

    #[test]
    fn test_length_and_numeric_segments() {
        let out = render(
            "{{items.length}} {{items.1}} {{name.length}}{{#items}} {{.length}}{{/items}}",
            json!({"items": ["x", "y"], "name": "abc"}),
        );
        assert_eq!(out, "2 y 3 2 2");
    }

    #[test]
    fn test_raw_markup_is_lenient() {
        let out = render("<div>{{{html}}}</div>", json!({"html": "<b>bold</i> <br>text"}));
        assert_eq!(out, "<div><b>bold <br>text</b></div>");
    }
}
