//! Mutation log
//!
//! Optional record of every mutation a [`crate::DomTree`] performs on nodes
//! attached to the document. Building detached subtrees is not recorded;
//! inserting them is.
//! Cloning the log shares the underlying buffer, so a host can keep a handle
//! while the tree itself is moved into a runtime.

use std::cell::RefCell;
use std::rc::Rc;

use crate::NodeId;

/// A single document mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetAttribute { node: NodeId, name: String },
    RemoveAttribute { node: NodeId, name: String },
    SetText { node: NodeId },
    Insert { parent: NodeId, child: NodeId },
    Remove { parent: NodeId, child: NodeId },
    Replace { parent: NodeId, new_child: NodeId, old_child: NodeId },
}

impl Mutation {
    /// Node whose own state or child list changed
    pub fn target(&self) -> NodeId {
        match self {
            Self::SetAttribute { node, .. }
            | Self::RemoveAttribute { node, .. }
            | Self::SetText { node } => *node,
            Self::Insert { parent, .. }
            | Self::Remove { parent, .. }
            | Self::Replace { parent, .. } => *parent,
        }
    }
}

/// Shared mutation buffer
#[derive(Debug, Clone, Default)]
pub struct MutationLog {
    records: Rc<RefCell<Vec<Mutation>>>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, mutation: Mutation) {
        self.records.borrow_mut().push(mutation);
    }

    /// Number of recorded mutations
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Snapshot of the recorded mutations
    pub fn records(&self) -> Vec<Mutation> {
        self.records.borrow().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<Mutation> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}
