//! Template AST
//!
//! Output of the parser, walked by the renderer on every render.

/// Template body node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Expr(Expr),
    Section(Section),
}

/// Element with attribute templates
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: AttrTemplate,
}

/// Attribute value template
#[derive(Debug, Clone, PartialEq)]
pub enum AttrTemplate {
    /// Literal value; boolean attributes are empty
    Static(String),
    /// Exactly one expression: the raw value reaches `make_node`
    Single(Expr),
    /// Literal text mixed with expressions and sections
    Mixed(Vec<AttrPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrPart {
    Text(String),
    Expr(Expr),
    Section(AttrSection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSection {
    pub path: Path,
    pub inverted: bool,
    pub parts: Vec<AttrPart>,
}

/// Expression token
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub paths: Vec<Path>,
}

impl Expr {
    /// First path; every kind but `Style` carries exactly one
    pub fn path(&self) -> &Path {
        &self.paths[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// `{{p}}`
    Escaped,
    /// `{{{p}}}`
    Raw,
    /// `{{%p,q}}`
    Style,
    /// `{{+p}}`
    Register,
}

/// `{{#p}}` / `{{^p}}` block
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub path: Path,
    pub inverted: bool,
    pub children: Vec<Node>,
}

/// Where a path lookup starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    /// `.` and `.name`
    Current,
    /// `.index`
    Index,
    /// `.length`
    Length,
    /// First segment of `a.b.c`, looked up innermost scope first
    Named(String),
}

/// Dotted lookup path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    root: PathRoot,
    rest: Vec<String>,
}

impl Path {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "." {
            return Self { raw: raw.to_string(), root: PathRoot::Current, rest: Vec::new() };
        }

        if let Some(relative) = raw.strip_prefix('.') {
            let mut segments = relative.split('.').map(str::to_string);
            let first = segments.next().unwrap_or_default();
            let (root, rest) = match first.as_str() {
                "index" => (PathRoot::Index, segments.collect()),
                "length" => (PathRoot::Length, segments.collect()),
                _ => (PathRoot::Current, std::iter::once(first).chain(segments).collect()),
            };
            return Self { raw: raw.to_string(), root, rest };
        }

        let mut segments = raw.split('.').map(str::to_string);
        let first = segments.next().unwrap_or_default();
        Self {
            raw: raw.to_string(),
            root: PathRoot::Named(first),
            rest: segments.filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// Segments after the root
    pub fn rest(&self) -> &[String] {
        &self.rest
    }
}
