//! Virtual nodes
//!
//! Immutable element descriptions produced fresh by every render. Each node
//! carries a structural hash over its tag, attributes and children so the
//! reconciler can skip subtrees that did not change.

use std::rc::Rc;

use crate::hash::{fnv1a64, fnv1a64_mix};
use crate::{DataId, DataRegistry, Value};

/// Attribute value on a virtual node
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Written verbatim
    Text(String),
    /// Non-primitive value parked in the data registry
    Ref(DataId),
}

impl AttrValue {
    /// Text written into the document
    pub fn to_text(&self) -> String {
        match self {
            AttrValue::Text(text) => text.clone(),
            AttrValue::Ref(id) => id.token(),
        }
    }
}

/// Child of a virtual node
#[derive(Debug, Clone, PartialEq)]
pub enum VChild {
    Node(VNode),
    Text(String),
}

impl VChild {
    pub fn as_node(&self) -> Option<&VNode> {
        match self {
            VChild::Node(node) => Some(node),
            VChild::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VChild::Text(text) => Some(text),
            VChild::Node(_) => None,
        }
    }
}

/// Child argument accepted by [`make_node`] before normalization
#[derive(Debug, Clone)]
pub enum Child {
    Node(VNode),
    Text(String),
    List(Vec<Child>),
    Empty,
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<VChild> for Child {
    fn from(child: VChild) -> Self {
        match child {
            VChild::Node(node) => Child::Node(node),
            VChild::Text(text) => Child::Text(text),
        }
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map(Into::into).unwrap_or(Child::Empty)
    }
}

/// Virtual element
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    tag: String,
    attrs: Vec<(String, AttrValue)>,
    children: Vec<VChild>,
    hash: u64,
}

impl VNode {
    /// Lowercase tag name
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in declaration order
    pub fn attrs(&self) -> &[(String, AttrValue)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn children(&self) -> &[VChild] {
        &self.children
    }

    /// Structural hash
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Registry ids referenced by this node and its descendants
    pub fn refs(&self) -> Vec<DataId> {
        let mut ids = Vec::new();
        self.collect_refs(&mut ids);
        ids
    }

    fn collect_refs(&self, ids: &mut Vec<DataId>) {
        for (_, value) in &self.attrs {
            if let AttrValue::Ref(id) = value {
                ids.push(*id);
            }
        }
        for child in &self.children {
            if let VChild::Node(node) = child {
                node.collect_refs(ids);
            }
        }
    }

    /// Descendants whose tag satisfies `is_match`, in document order.
    /// Matched nodes are not searched further.
    pub fn find_all(&self, is_match: &dyn Fn(&str) -> bool) -> Vec<&VNode> {
        let mut found = Vec::new();
        for child in &self.children {
            if let VChild::Node(node) = child {
                node.find_into(is_match, &mut found);
            }
        }
        found
    }

    fn find_into<'a>(&'a self, is_match: &dyn Fn(&str) -> bool, found: &mut Vec<&'a VNode>) {
        if is_match(&self.tag) {
            found.push(self);
            return;
        }
        for child in &self.children {
            if let VChild::Node(node) = child {
                node.find_into(is_match, found);
            }
        }
    }
}

/// Build a virtual node.
///
/// Attributes: `Null` and `false` are omitted, `true` becomes an empty
/// value, numbers and strings become text and everything else is stored in
/// `registry` and written as its token. Children are flattened; empty
/// entries and empty text are dropped and adjacent text is merged.
pub fn make_node<K, A, C>(registry: &mut DataRegistry, tag: &str, attrs: A, children: C) -> VNode
where
    K: Into<String>,
    A: IntoIterator<Item = (K, Value)>,
    C: IntoIterator<Item = Child>,
{
    let mut normalized: Vec<(String, AttrValue)> = Vec::new();
    for (name, value) in attrs {
        let value = match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => AttrValue::Text(String::new()),
            Value::Number(_) | Value::String(_) => AttrValue::Text(value.to_text()),
            other => AttrValue::Ref(registry.insert(other)),
        };
        let name = name.into();
        match normalized.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                if let AttrValue::Ref(stale) = &slot.1 {
                    registry.free(*stale);
                }
                slot.1 = value;
            }
            None => normalized.push((name, value)),
        }
    }

    let flat = normalize_children(children);
    let tag = tag.to_ascii_lowercase();
    let hash = node_hash(&tag, &normalized, &flat);
    VNode { tag, attrs: normalized, children: flat, hash }
}

/// Flatten children the way [`make_node`] does
pub fn normalize_children<C: IntoIterator<Item = Child>>(children: C) -> Vec<VChild> {
    let mut flat = Vec::new();
    for child in children {
        flatten(child, &mut flat);
    }
    flat
}

fn flatten(child: Child, out: &mut Vec<VChild>) {
    match child {
        Child::Empty => {}
        Child::List(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        Child::Node(node) => out.push(VChild::Node(node)),
        Child::Text(text) => {
            if text.is_empty() {
                return;
            }
            if let Some(VChild::Text(previous)) = out.last_mut() {
                previous.push_str(&text);
            } else {
                out.push(VChild::Text(text));
            }
        }
    }
}

fn node_hash(tag: &str, attrs: &[(String, AttrValue)], children: &[VChild]) -> u64 {
    let mut hash = fnv1a64(tag.as_bytes());
    for (name, value) in attrs {
        hash = fnv1a64_mix(hash, b" ");
        hash = fnv1a64_mix(hash, name.as_bytes());
        hash = fnv1a64_mix(hash, b"=");
        hash = fnv1a64_mix(hash, value.to_text().as_bytes());
        hash = fnv1a64_mix(hash, b"\0");
    }
    for child in children {
        hash = match child {
            VChild::Node(node) => fnv1a64_mix(fnv1a64_mix(hash, b"<"), &node.hash.to_le_bytes()),
            VChild::Text(text) => {
                let hash = fnv1a64_mix(hash, b"\"");
                let hash = fnv1a64_mix(hash, &(text.len() as u64).to_le_bytes());
                fnv1a64_mix(hash, text.as_bytes())
            }
        };
    }
    hash
}

/// State available to render functions
pub struct RenderContext<'a> {
    pub registry: &'a mut DataRegistry,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a mut DataRegistry) -> Self {
        Self { registry }
    }

    /// [`make_node`] against this context's registry
    pub fn make_node<K, A, C>(&mut self, tag: &str, attrs: A, children: C) -> VNode
    where
        K: Into<String>,
        A: IntoIterator<Item = (K, Value)>,
        C: IntoIterator<Item = Child>,
    {
        make_node(self.registry, tag, attrs, children)
    }

    /// Store a value and return its token
    pub fn register(&mut self, value: Value) -> String {
        self.registry.insert(value).token()
    }
}

/// Compiled render function: data snapshot in, child sequence out
pub type RenderFn = Rc<dyn Fn(&mut RenderContext<'_>, &Value) -> Vec<VChild>>;
