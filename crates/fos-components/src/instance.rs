//! Component instances and their light content

use std::rc::Rc;

use fos_dom::serialize::{inner_html, outer_html, text_content};
use fos_dom::{Document, ListenerId, NodeId};
use fos_vdom::Value;
use indexmap::IndexMap;

use crate::ComponentDefinition;

/// Instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Between mount and the end of the first render
    Mounting,
    Rendered,
    /// Waiting on the dirty queue
    Dirty,
    Rendering,
    Unmounted,
}

/// One mounted component
#[derive(Debug)]
pub struct Instance {
    pub(crate) definition: Rc<ComponentDefinition>,
    pub(crate) host: NodeId,
    pub(crate) content_root: NodeId,
    pub(crate) state: InstanceState,
    pub(crate) props: IndexMap<String, Value>,
    /// Props currently supplied by `:` attributes
    pub(crate) attribute_props: Vec<String>,
    pub(crate) body: LightContent,
    pub(crate) prerendered: bool,
    pub(crate) last_hash: Option<u64>,
    pub(crate) listeners: Vec<(NodeId, String, ListenerId)>,
    /// Content root the delegated listeners are attached to
    pub(crate) bound_root: Option<NodeId>,
}

impl Instance {
    pub(crate) fn new(
        definition: Rc<ComponentDefinition>,
        host: NodeId,
        content_root: NodeId,
        props: IndexMap<String, Value>,
        attribute_props: Vec<String>,
        body: LightContent,
    ) -> Self {
        Self {
            definition,
            host,
            content_root,
            state: InstanceState::Mounting,
            props,
            attribute_props,
            body,
            prerendered: false,
            last_hash: None,
            listeners: Vec::new(),
            bound_root: None,
        }
    }

    pub fn tag_name(&self) -> &str {
        self.definition.tag_name()
    }

    pub fn definition(&self) -> &ComponentDefinition {
        &self.definition
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn content_root(&self) -> NodeId {
        self.content_root
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn props(&self) -> &IndexMap<String, Value> {
        &self.props
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    pub fn body(&self) -> &LightContent {
        &self.body
    }

    /// Adopted a pre-rendered content block on mount
    pub fn is_prerendered(&self) -> bool {
        self.prerendered
    }

    /// Snapshot hash of the last completed render
    pub fn last_hash(&self) -> Option<u64> {
        self.last_hash
    }
}

/// Original content of a host, as authored by whoever placed it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightContent {
    markup: String,
    children: Vec<LightChild>,
}

/// Element index entry
#[derive(Debug, Clone, PartialEq)]
pub struct LightChild {
    pub tag: String,
    pub text: String,
    pub html: String,
    pub attributes: IndexMap<String, String>,
}

impl LightContent {
    /// Record `nodes` as they currently are in `doc`
    pub fn capture(doc: &dyn Document, nodes: &[NodeId]) -> Self {
        let markup = nodes.iter().map(|&node| outer_html(doc, node)).collect();
        let children = nodes
            .iter()
            .filter(|&&node| doc.is_element(node))
            .map(|&node| LightChild {
                tag: doc.tag_name(node).unwrap_or_default().to_string(),
                text: text_content(doc, node),
                html: inner_html(doc, node),
                attributes: doc
                    .attribute_names(node)
                    .into_iter()
                    .filter_map(|name| {
                        let value = doc.attribute(node, &name)?.to_string();
                        Some((name, value))
                    })
                    .collect(),
            })
            .collect();
        Self { markup, children }
    }

    /// Parse `markup` to build the element index; the markup is kept as given
    pub fn from_markup(markup: &str) -> Result<Self, fos_html::ParseError> {
        let tree = fos_html::parse_fragment(markup)?;
        let nodes = tree.children(tree.root());
        let mut content = Self::capture(&tree, &nodes);
        content.markup = markup.to_string();
        Ok(content)
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn children(&self) -> &[LightChild] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    /// Element index as template data
    pub fn children_value(&self) -> Value {
        let items = self
            .children
            .iter()
            .map(|child| {
                let attributes: IndexMap<String, Value> = child
                    .attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
                    .collect();
                Value::object()
                    .with("tag", child.tag.as_str())
                    .with("text", child.text.as_str())
                    .with("html", child.html.as_str())
                    .with("attributes", attributes)
            })
            .collect::<Vec<_>>();
        Value::from(items)
    }
}
