//! Diff/patch engine
//!
//! Reconciles a live subtree with a virtual tree, positionally:
//!
//! 1. A live node stamped with the virtual node's hash is left alone.
//! 2. A tag mismatch replaces the live node with a materialized one.
//! 3. Attributes are set where they differ and removed where absent,
//!    except the reserved `fos-` attributes. Overwritten or removed tokens
//!    are freed in the data registry.
//! 4. Children are walked by index: missing ones are appended, text is
//!    updated in place, kind mismatches are replaced, elements recurse.
//! 5. Trailing live children are removed.
//! 6. The live node is stamped with the virtual hash.
//!
//! Structural mismatches are always resolved by replacement; the only
//! errors are the document's own.

use std::collections::HashMap;

use fos_dom::{Document, DomResult, NodeId, NodeKind};

use crate::{DataId, DataRegistry, VChild, VNode};

/// Attributes with this prefix belong to the runtime and survive diffs
pub const RESERVED_ATTRIBUTE_PREFIX: &str = "fos-";

/// Structural hash last applied to each live node
#[derive(Debug, Default)]
pub struct HashStamps {
    stamps: HashMap<NodeId, u64>,
}

impl HashStamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<u64> {
        self.stamps.get(&node).copied()
    }

    pub fn insert(&mut self, node: NodeId, hash: u64) {
        self.stamps.insert(node, hash);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<u64> {
        self.stamps.remove(&node)
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

/// Hooks the reconciler calls while patching
pub trait PatchObserver {
    /// Whether the reconciler owns the children of `node`. Returning
    /// `false` leaves them untouched; attributes are still patched.
    fn manages_children(&mut self, _doc: &dyn Document, _node: NodeId, _vnode: &VNode) -> bool {
        true
    }

    /// An attribute of an existing node was set or removed
    fn attribute_written(&mut self, _doc: &dyn Document, _node: NodeId, _name: &str) {}

    /// A new element was built, before its children
    fn node_created(&mut self, _doc: &dyn Document, _node: NodeId, _vnode: &VNode) {}

    /// A live subtree was detached and dropped
    fn node_discarded(&mut self, _doc: &dyn Document, _node: NodeId) {}
}

/// Observer that accepts the defaults
#[derive(Debug, Default)]
pub struct NoopObserver;

impl PatchObserver for NoopObserver {}

/// Reconciler over one document
pub struct Reconciler<'a> {
    doc: &'a mut dyn Document,
    registry: &'a mut DataRegistry,
    stamps: &'a mut HashStamps,
    observer: &'a mut dyn PatchObserver,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        doc: &'a mut dyn Document,
        registry: &'a mut DataRegistry,
        stamps: &'a mut HashStamps,
        observer: &'a mut dyn PatchObserver,
    ) -> Self {
        Self { doc, registry, stamps, observer }
    }

    /// Patch `live` to match `vnode`. Returns the node now standing in
    /// for `live`, which differs when it had to be replaced.
    pub fn reconcile(&mut self, live: NodeId, vnode: &VNode) -> DomResult<NodeId> {
        if self.stamps.get(live) == Some(vnode.hash()) {
            return Ok(live);
        }
        if self.doc.tag_name(live) != Some(vnode.tag()) {
            return self.replace(live, vnode);
        }

        self.patch_attributes(live, vnode)?;
        if self.observer.manages_children(&*self.doc, live, vnode) {
            self.patch_children(live, vnode.children())?;
        }
        self.stamps.insert(live, vnode.hash());
        Ok(live)
    }

    /// Build a detached live subtree for `vnode`
    pub fn materialize(&mut self, vnode: &VNode) -> DomResult<NodeId> {
        let element = self.doc.create_element(vnode.tag());
        for (name, value) in vnode.attrs() {
            self.doc.set_attribute(element, name, &value.to_text())?;
        }
        self.observer.node_created(&*self.doc, element, vnode);

        for child in vnode.children() {
            let node = self.materialize_child(child)?;
            self.doc.append_child(element, node)?;
        }
        self.stamps.insert(element, vnode.hash());
        Ok(element)
    }

    /// Throw away the children of `live` and build them again from
    /// `vnode`. Registry entries are kept: the tokens in the old children
    /// are the ones `vnode` references.
    pub fn rebuild(&mut self, live: NodeId, vnode: &VNode) -> DomResult<()> {
        tracing::debug!("Rebuilding children of {}", live);
        for child in self.doc.remove_children(live)? {
            self.stamps.remove(child);
            for node in self.doc.descendants(child) {
                self.stamps.remove(node);
            }
            self.observer.node_discarded(&*self.doc, child);
        }
        for child in vnode.children() {
            let node = self.materialize_child(child)?;
            self.doc.append_child(live, node)?;
        }
        self.stamps.insert(live, vnode.hash());
        Ok(())
    }

    fn materialize_child(&mut self, child: &VChild) -> DomResult<NodeId> {
        match child {
            VChild::Node(node) => self.materialize(node),
            VChild::Text(text) => Ok(self.doc.create_text(text)),
        }
    }

    fn replace(&mut self, live: NodeId, vnode: &VNode) -> DomResult<NodeId> {
        tracing::debug!(
            "Replacing {} <{}> with <{}>",
            live,
            self.doc.tag_name(live).unwrap_or("#text"),
            vnode.tag()
        );
        let fresh = self.materialize(vnode)?;
        if let Some(parent) = self.doc.parent(live) {
            self.doc.replace_child(parent, fresh, live)?;
        }
        self.discard(live);
        Ok(fresh)
    }

    fn patch_attributes(&mut self, live: NodeId, vnode: &VNode) -> DomResult<()> {
        for (name, value) in vnode.attrs() {
            let text = value.to_text();
            let current = self.doc.attribute(live, name).map(str::to_string);
            if current.as_deref() == Some(text.as_str()) {
                continue;
            }
            if let Some(current) = &current {
                free_replaced_tokens(self.registry, current, &text);
            }
            self.doc.set_attribute(live, name, &text)?;
            self.observer.attribute_written(&*self.doc, live, name);
        }

        for name in self.doc.attribute_names(live) {
            if name.starts_with(RESERVED_ATTRIBUTE_PREFIX) || vnode.attr(&name).is_some() {
                continue;
            }
            if let Some(stale) = self.doc.attribute(live, &name) {
                free_replaced_tokens(self.registry, stale, "");
            }
            self.doc.remove_attribute(live, &name)?;
            self.observer.attribute_written(&*self.doc, live, &name);
        }
        Ok(())
    }

    fn patch_children(&mut self, live: NodeId, children: &[VChild]) -> DomResult<()> {
        let existing = self.doc.children(live);

        for (index, child) in children.iter().enumerate() {
            let Some(&current) = existing.get(index) else {
                let fresh = self.materialize_child(child)?;
                self.doc.append_child(live, fresh)?;
                continue;
            };
            match (self.doc.kind(current), child) {
                (Some(NodeKind::Text), VChild::Text(text)) => {
                    if let Some(old) = self.doc.text(current).filter(|old| *old != text.as_str()) {
                        free_replaced_tokens(self.registry, old, text);
                        self.doc.set_text(current, text)?;
                    }
                }
                (Some(NodeKind::Element), VChild::Node(node)) => {
                    self.reconcile(current, node)?;
                }
                _ => {
                    let fresh = self.materialize_child(child)?;
                    self.doc.replace_child(live, fresh, current)?;
                    self.discard(current);
                }
            }
        }

        for &extra in existing.iter().skip(children.len()) {
            self.doc.remove_child(live, extra)?;
            self.discard(extra);
        }
        Ok(())
    }

    /// Free the tokens held by a detached subtree and forget its stamps
    fn discard(&mut self, node: NodeId) {
        free_subtree_tokens(&*self.doc, self.registry, node);
        self.stamps.remove(node);
        for current in self.doc.descendants(node) {
            self.stamps.remove(current);
        }
        self.observer.node_discarded(&*self.doc, node);
    }
}

/// Free every token embedded in the attributes and text of `root` and its
/// descendants
pub fn free_subtree_tokens(doc: &dyn Document, registry: &mut DataRegistry, root: NodeId) {
    let mut nodes = vec![root];
    nodes.extend(doc.descendants(root));
    for node in nodes {
        for name in doc.attribute_names(node) {
            if let Some(value) = doc.attribute(node, &name) {
                free_replaced_tokens(registry, value, "");
            }
        }
        if let Some(text) = doc.text(node) {
            free_replaced_tokens(registry, text, "");
        }
    }
}

/// Free the tokens in `old` that `new` no longer carries
fn free_replaced_tokens(registry: &mut DataRegistry, old: &str, new: &str) {
    let kept = DataId::scan_tokens(new);
    for id in DataId::scan_tokens(old) {
        if !kept.contains(&id) {
            registry.free(id);
        }
    }
}
