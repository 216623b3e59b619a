//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed; removed subtrees simply become unreachable from
//! the root. That keeps every [`NodeId`] stable for the lifetime of the tree.

use crate::{
    Document, DomError, DomResult, ListenerId, Mutation, MutationLog, Node, NodeId, NodeKind,
};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    log: Option<MutationLog>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            log: None,
        }
    }

    /// Record every mutation into `log`
    pub fn with_mutation_log(mut self, log: MutationLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated (including the document node)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree holds nothing but the document node
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Create a comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Log a mutation whose target is attached to the document
    fn record(&self, mutation: Mutation) {
        if let Some(log) = &self.log {
            if self.is_connected(mutation.target()) {
                log.record(mutation);
            }
        }
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.get(current).map(|n| n.parent) {
                Some(parent) if parent.is_valid() => current = parent,
                _ => return false,
            }
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let kind = self.node(parent)?.kind();
        self.node(child)?;
        if !matches!(kind, NodeKind::Element | NodeKind::Document) {
            return Err(DomError::InvalidNodeType(parent));
        }
        if self.is_inclusive_ancestor(child, parent) {
            tracing::debug!(%parent, %child, "Rejected insertion that would create a cycle");
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Unlink a node from its parent and siblings
    fn detach(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Link a detached node before `reference` (append when NONE)
    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if reference.is_valid() {
            let prev = self.nodes[reference.index()].prev_sibling;
            {
                let node = &mut self.nodes[child.index()];
                node.prev_sibling = prev;
                node.next_sibling = reference;
            }
            self.nodes[reference.index()].prev_sibling = child;
            if prev.is_valid() {
                self.nodes[prev.index()].next_sibling = child;
            } else {
                self.nodes[parent.index()].first_child = child;
            }
        } else {
            let last = self.nodes[parent.index()].last_child;
            {
                let node = &mut self.nodes[child.index()];
                node.prev_sibling = last;
                node.next_sibling = NodeId::NONE;
            }
            if last.is_valid() {
                self.nodes[last.index()].next_sibling = child;
            } else {
                self.nodes[parent.index()].first_child = child;
            }
            self.nodes[parent.index()].last_child = child;
        }
        self.nodes[child.index()].parent = parent;
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for DomTree {
    fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.get(node).map(Node::kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.get(node)?.as_element().map(|e| e.tag.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            crate::NodeData::Text(text) | crate::NodeData::Comment(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        match &mut self.node_mut(node)?.data {
            crate::NodeData::Text(content) => {
                *content = text.to_string();
            }
            _ => return Err(DomError::InvalidNodeType(node)),
        }
        self.record(Mutation::SetText { node });
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node)?.as_element()?.get_attr(name)
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.get(node)
            .and_then(Node::as_element)
            .map(|e| e.attrs.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.node_mut(node)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(node))?
            .set_attr(name, value);
        self.record(Mutation::SetAttribute { node, name: name.to_string() });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        let removed = self.node_mut(node)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(node))?
            .remove_attr(name);
        if removed.is_some() {
            self.record(Mutation::RemoveAttribute { node, name: name.to_string() });
        }
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent.option()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let Some(mut current) = self.get(node).map(|n| n.first_child) else {
            return result;
        };
        while current.is_valid() {
            result.push(current);
            current = self.nodes[current.index()].next_sibling;
        }
        result
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        self.check_insertable(parent, child)?;
        if let Some(reference) = reference {
            if self.node(reference)?.parent != parent {
                return Err(DomError::NotAChild { parent, child: reference });
            }
            if reference == child {
                return Ok(());
            }
        }
        self.detach(child);
        self.link_before(parent, child, reference.unwrap_or(NodeId::NONE));
        self.record(Mutation::Insert { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        self.record(Mutation::Remove { parent, child });
        Ok(())
    }

    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<()> {
        if self.node(old_child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child: old_child });
        }
        if new_child == old_child {
            return Ok(());
        }
        self.check_insertable(parent, new_child)?;
        self.detach(new_child);
        let next = self.nodes[old_child.index()].next_sibling;
        self.detach(old_child);
        self.link_before(parent, new_child, next);
        self.record(Mutation::Replace { parent, new_child, old_child });
        Ok(())
    }

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) -> DomResult<()> {
        let listeners = &mut self.node_mut(node)?.listeners;
        if !listeners.iter().any(|(name, id)| name == event && *id == listener) {
            listeners.push((event.to_string(), listener));
        }
        Ok(())
    }

    fn remove_event_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) -> DomResult<()> {
        self.node_mut(node)?
            .listeners
            .retain(|(name, id)| !(name == event && *id == listener));
        Ok(())
    }

    fn event_listeners(&self, node: NodeId, event: &str) -> Vec<ListenerId> {
        self.get(node)
            .map(|n| {
                n.listeners.iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}
