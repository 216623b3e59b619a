//! Document - capability set
//!
//! Everything the component runtime needs from a host document: node
//! creation, attribute storage, child list edits and listener registration.
//! The trait is object safe; the runtime holds a `Box<dyn Document>`.

use crate::{DomResult, ListenerId, NodeId, NodeKind};

/// Abstract host document
pub trait Document {
    /// Root node. A node is connected when it can reach the root.
    fn root(&self) -> NodeId;

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Kind of node, `None` for unknown ids
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name of an element
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Character data of a text or comment node
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Replace the character data of a text node
    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Attribute names in document order
    fn attribute_names(&self, node: NodeId) -> Vec<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Child nodes in order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Insert `child` before `reference`, or append when `reference` is `None`.
    /// The child is first detached from its current parent.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()>;

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()>;

    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<()>;

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) -> DomResult<()>;

    fn remove_event_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) -> DomResult<()>;

    /// Listeners registered on `node` for `event`, in registration order
    fn event_listeners(&self, node: NodeId, event: &str) -> Vec<ListenerId>;

    /// Append a child node
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    fn is_text(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Text)
    }

    /// Element children only
    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// Ancestors, nearest first
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// Descendants in document order (pre-order), excluding `node`
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        result
    }

    /// Whether the node is attached under the document root
    fn is_connected(&self, node: NodeId) -> bool {
        let root = self.root();
        if node == root {
            return true;
        }
        self.ancestors(node).last() == Some(&root)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Detach all children, returning them
    fn remove_children(&mut self, node: NodeId) -> DomResult<Vec<NodeId>> {
        let children = self.children(node);
        for &child in &children {
            self.remove_child(node, child)?;
        }
        Ok(children)
    }
}
