//! CSS Selectors Module
//!
//! Parses the selector subset used by component event maps and matches it
//! against any [`Document`]. Matching runs right to left, the way browsers
//! do it: the rightmost compound is tested first, then combinators walk
//! toward the root.

use fos_dom::{Document, NodeId};

use crate::{CssError, HOST_SELECTOR};

/// A component of a compound selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// `:host` - the component host the match is scoped to
    Host,
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (&self.matcher, value) {
            (None, Some(_)) => true, // [attr] - just check existence
            (None, None) | (Some(_), None) => false,
            (Some(matcher), Some(val)) => {
                let fold = |s: &str| {
                    if self.case_insensitive {
                        s.to_lowercase()
                    } else {
                        s.to_string()
                    }
                };
                let val = fold(val);

                match matcher {
                    AttributeMatcher::Exact(expected) => val == fold(expected),
                    AttributeMatcher::Contains(expected) => {
                        let expected = fold(expected);
                        val.split_whitespace().any(|w| w == expected)
                    }
                    AttributeMatcher::DashMatch(expected) => {
                        let expected = fold(expected);
                        val == expected || val.starts_with(&format!("{}-", expected))
                    }
                    AttributeMatcher::Prefix(expected) => {
                        !expected.is_empty() && val.starts_with(&fold(expected))
                    }
                    AttributeMatcher::Suffix(expected) => {
                        !expected.is_empty() && val.ends_with(&fold(expected))
                    }
                    AttributeMatcher::Substring(expected) => {
                        !expected.is_empty() && val.contains(&fold(expected))
                    }
                }
            }
        }
    }
}

/// Combinator between two compounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

/// Sequence of simple selectors without combinators
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub components: Vec<SelectorComponent>,
}

impl Compound {
    fn matches(&self, doc: &dyn Document, node: NodeId, host: Option<NodeId>) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        self.components.iter().all(|component| match component {
            SelectorComponent::Universal => true,
            SelectorComponent::Type(name) => tag.eq_ignore_ascii_case(name),
            SelectorComponent::Id(id) => doc.attribute(node, "id") == Some(id.as_str()),
            SelectorComponent::Class(class) => doc.has_class(node, class),
            SelectorComponent::Attribute(attr) => attr.matches(doc.attribute(node, &attr.name)),
            SelectorComponent::Host => host == Some(node),
        })
    }
}

/// Complex selector: compounds joined by combinators.
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

impl ComplexSelector {
    /// Whether the selector mentions `:host`
    pub fn has_host(&self) -> bool {
        self.compounds
            .iter()
            .any(|c| c.components.contains(&SelectorComponent::Host))
    }

    fn matches(&self, doc: &dyn Document, node: NodeId, host: Option<NodeId>) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.match_at(doc, node, n - 1, host),
        }
    }

    fn match_at(&self, doc: &dyn Document, node: NodeId, index: usize, host: Option<NodeId>) -> bool {
        if !self.compounds[index].matches(doc, node, host) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = index - 1;
        match self.combinators[next] {
            Combinator::Child => parent_element(doc, node)
                .is_some_and(|parent| self.match_at(doc, parent, next, host)),
            Combinator::Descendant => {
                let mut current = parent_element(doc, node);
                while let Some(ancestor) = current {
                    if self.match_at(doc, ancestor, next, host) {
                        return true;
                    }
                    current = parent_element(doc, ancestor);
                }
                false
            }
            Combinator::NextSibling => previous_elements(doc, node)
                .first()
                .is_some_and(|&sibling| self.match_at(doc, sibling, next, host)),
            Combinator::SubsequentSibling => previous_elements(doc, node)
                .into_iter()
                .any(|sibling| self.match_at(doc, sibling, next, host)),
        }
    }
}

fn parent_element(doc: &dyn Document, node: NodeId) -> Option<NodeId> {
    doc.parent(node).filter(|&p| doc.is_element(p))
}

/// Element siblings before `node`, nearest first
fn previous_elements(doc: &dyn Document, node: NodeId) -> Vec<NodeId> {
    let Some(parent) = doc.parent(node) else {
        return Vec::new();
    };
    let siblings = doc.element_children(parent);
    let position = siblings.iter().position(|&s| s == node).unwrap_or(0);
    siblings[..position].iter().rev().copied().collect()
}

/// Comma separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
    source: String,
}

impl SelectorList {
    /// Parse selector text
    pub fn parse(text: &str) -> Result<Self, CssError> {
        let mut parser = SelectorParser { chars: text.char_indices().peekable(), text };
        let selectors = parser.parse_list()?;
        Ok(Self { selectors, source: text.trim().to_string() })
    }

    /// Original selector text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this list is exactly `:host`
    pub fn is_host(&self) -> bool {
        self.source == HOST_SELECTOR
    }

    /// Match against a node with no host context
    pub fn matches(&self, doc: &dyn Document, node: NodeId) -> bool {
        self.matches_in(doc, node, None)
    }

    /// Match against a node; `:host` matches only `host`
    pub fn matches_in(&self, doc: &dyn Document, node: NodeId, host: Option<NodeId>) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node, host))
    }
}

struct SelectorParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl SelectorParser<'_> {
    fn error(&mut self, message: impl Into<String>) -> CssError {
        let position = self.chars.peek().map(|&(i, _)| i).unwrap_or(self.text.len());
        CssError::Selector { position, message: message.into() }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>, CssError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                None => break,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(selectors)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, CssError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_space => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            if combinator != Combinator::Descendant {
                self.chars.next();
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, CssError> {
        let mut components = Vec::new();
        loop {
            match self.peek() {
                Some('*') => {
                    self.chars.next();
                    components.push(SelectorComponent::Universal);
                }
                Some('#') => {
                    self.chars.next();
                    components.push(SelectorComponent::Id(self.ident()?));
                }
                Some('.') => {
                    self.chars.next();
                    components.push(SelectorComponent::Class(self.ident()?));
                }
                Some('[') => {
                    self.chars.next();
                    components.push(SelectorComponent::Attribute(self.attribute()?));
                }
                Some(':') => {
                    self.chars.next();
                    let name = self.ident()?;
                    if name != "host" {
                        return Err(self.error(format!("unsupported pseudo-class ':{}'", name)));
                    }
                    components.push(SelectorComponent::Host);
                }
                Some(c) if is_ident_start(c) && components.is_empty() => {
                    components.push(SelectorComponent::Type(self.ident()?.to_ascii_lowercase()));
                }
                _ => break,
            }
        }
        if components.is_empty() {
            return Err(self.error("expected selector"));
        }
        Ok(Compound { components })
    }

    fn ident(&mut self) -> Result<String, CssError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, CssError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let operator = match self.peek() {
            Some(']') => {
                self.chars.next();
                return Ok(AttributeSelector { name, matcher: None, case_insensitive: false });
            }
            Some('=') => None,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.chars.next();
                Some(c)
            }
            _ => return Err(self.error("expected attribute operator")),
        };
        if self.peek() != Some('=') {
            return Err(self.error("expected '='"));
        }
        self.chars.next();
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut value = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, c)) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.ident()?,
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            self.chars.next();
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_whitespace();
        }
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.chars.next();

        let matcher = match operator {
            None => AttributeMatcher::Exact(value),
            Some('~') => AttributeMatcher::Contains(value),
            Some('|') => AttributeMatcher::DashMatch(value),
            Some('^') => AttributeMatcher::Prefix(value),
            Some('$') => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector { name, matcher: Some(matcher), case_insensitive })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::DomTree;

    #[test]
    fn test_attribute_selector_exact() {
        let sel = AttributeSelector {
            name: "type".to_string(),
            matcher: Some(AttributeMatcher::Exact("text".to_string())),
            case_insensitive: false,
        };

        assert!(sel.matches(Some("text")));
        assert!(!sel.matches(Some("TEXT")));
        assert!(!sel.matches(Some("password")));
        assert!(!sel.matches(None));
    }

    #[test]
    fn test_attribute_selector_prefix() {
        let sel = AttributeSelector {
            name: "class".to_string(),
            matcher: Some(AttributeMatcher::Prefix("btn-".to_string())),
            case_insensitive: false,
        };

        assert!(sel.matches(Some("btn-primary")));
        assert!(sel.matches(Some("btn-secondary")));
        assert!(!sel.matches(Some("button")));
    }

    #[test]
    fn test_parse_compound() {
        let list = SelectorList::parse("button.btn#go[data-x='1' i]").unwrap();
        let compound = &list.selectors[0].compounds[0];
        assert_eq!(compound.components.len(), 4);
        assert_eq!(compound.components[0], SelectorComponent::Type("button".into()));
        assert!(matches!(
            &compound.components[3],
            SelectorComponent::Attribute(AttributeSelector { case_insensitive: true, .. })
        ));
    }

    #[test]
    fn test_parse_combinators() {
        let list = SelectorList::parse("ul > li a, .x ~ .y").unwrap();
        assert_eq!(list.selectors.len(), 2);
        assert_eq!(
            list.selectors[0].combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
        assert_eq!(list.selectors[1].combinators, vec![Combinator::SubsequentSibling]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("a:hover").is_err());
        assert!(SelectorList::parse("[x").is_err());
        assert!(SelectorList::parse("a,").is_err());
    }

    #[test]
    fn test_host_detection() {
        assert!(SelectorList::parse(":host").unwrap().is_host());
        assert!(SelectorList::parse(":host .a").unwrap().selectors[0].has_host());
        assert!(!SelectorList::parse(".a").unwrap().is_host());
    }

    #[test]
    fn test_matches_descendant_and_child() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let a = tree.create_element("a");
        tree.append_child(tree.root(), ul).unwrap();
        tree.append_child(ul, li).unwrap();
        tree.append_child(li, a).unwrap();
        tree.set_attribute(a, "class", "link active").unwrap();

        assert!(SelectorList::parse("ul a.active").unwrap().matches(&tree, a));
        assert!(SelectorList::parse("li > a").unwrap().matches(&tree, a));
        assert!(!SelectorList::parse("ul > a").unwrap().matches(&tree, a));
        assert!(!SelectorList::parse(".missing").unwrap().matches(&tree, a));
    }

    #[test]
    fn test_matches_host_scope() {
        let mut tree = DomTree::new();
        let host = tree.create_element("my-list");
        let item = tree.create_element("span");
        tree.append_child(host, item).unwrap();

        let sel = SelectorList::parse(":host span").unwrap();
        assert!(sel.matches_in(&tree, item, Some(host)));
        assert!(!sel.matches(&tree, item));
    }

    #[test]
    fn test_matches_siblings() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let i = tree.create_element("i");
        for child in [a, b, i] {
            tree.append_child(div, child).unwrap();
        }
        assert!(SelectorList::parse("a + b").unwrap().matches(&tree, b));
        assert!(!SelectorList::parse("a + i").unwrap().matches(&tree, i));
        assert!(SelectorList::parse("a ~ i").unwrap().matches(&tree, i));
    }
}
