//! fOS DOM - Document capability set
//!
//! The component runtime never owns a real host document. It talks to one
//! through the [`Document`] trait. [`DomTree`] is the arena-backed
//! implementation used by hosts without a native DOM and by the tests.

mod node;
mod tree;
mod document;
mod operations;
mod dom_events;
mod mutation;
pub mod serialize;

pub use node::{Node, NodeData, NodeKind, ElementData, Attribute};
pub use tree::DomTree;
pub use document::Document;
pub use operations::{DomError, DomResult};
pub use dom_events::ListenerId;
pub use mutation::{Mutation, MutationLog};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
