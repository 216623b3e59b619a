//! Lifecycle observer
//!
//! Watches a diff of one component's content and records what it means
//! for other components: hosts created, subtrees discarded, attribute and
//! light content changes on mounted hosts. The runtime acts on the record
//! once the diff is done, so no instance is touched mid-patch.

use std::collections::HashMap;
use std::rc::Rc;

use fos_dom::{Document, NodeId};
use fos_vdom::{children_to_text, PatchObserver, VNode};
use indexmap::IndexMap;

use crate::{ComponentDefinition, Instance};

/// What a diff did to component hosts
#[derive(Debug, Default)]
pub(crate) struct LifecycleChanges {
    pub created: Vec<NodeId>,
    pub discarded: Vec<NodeId>,
    pub prop_writes: Vec<NodeId>,
    pub body_updates: Vec<(NodeId, String)>,
}

pub(crate) struct LifecycleObserver<'a> {
    definitions: &'a IndexMap<String, Rc<ComponentDefinition>>,
    instances: &'a HashMap<NodeId, Instance>,
    changes: LifecycleChanges,
}

impl<'a> LifecycleObserver<'a> {
    pub fn new(
        definitions: &'a IndexMap<String, Rc<ComponentDefinition>>,
        instances: &'a HashMap<NodeId, Instance>,
    ) -> Self {
        Self { definitions, instances, changes: LifecycleChanges::default() }
    }

    pub fn into_changes(self) -> LifecycleChanges {
        self.changes
    }
}

impl PatchObserver for LifecycleObserver<'_> {
    fn manages_children(&mut self, _doc: &dyn Document, node: NodeId, vnode: &VNode) -> bool {
        let Some(instance) = self.instances.get(&node) else {
            return true;
        };
        let markup = children_to_text(vnode.children());
        if markup != instance.body.markup() {
            self.changes.body_updates.push((node, markup));
        }
        false
    }

    fn attribute_written(&mut self, _doc: &dyn Document, node: NodeId, _name: &str) {
        if self.instances.contains_key(&node) && !self.changes.prop_writes.contains(&node) {
            self.changes.prop_writes.push(node);
        }
    }

    fn node_created(&mut self, _doc: &dyn Document, node: NodeId, vnode: &VNode) {
        if self.definitions.contains_key(vnode.tag()) {
            self.changes.created.push(node);
        }
    }

    fn node_discarded(&mut self, _doc: &dyn Document, node: NodeId) {
        self.changes.discarded.push(node);
    }
}
