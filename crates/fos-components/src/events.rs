//! Delegated events
//!
//! The document stores listener ids; the runtime keeps what each id means.
//! Host-scoped bindings sit on the host. Everything else sits on the
//! content root and is resolved by walking from the target upward, so a
//! single binding keeps serving nodes that later renders add or replace.

use fos_css::SelectorList;
use fos_dom::{Document, NodeId};
use fos_vdom::Value;

use crate::definition::EventHandler;

/// Event passed to delegated handlers
#[derive(Debug, Clone)]
pub struct Event {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) matched: NodeId,
    pub(crate) host: NodeId,
    pub(crate) detail: Value,
    pub(crate) propagation_stopped: bool,
    pub(crate) default_prevented: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId, detail: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            matched: target,
            host: NodeId::NONE,
            detail,
            propagation_stopped: false,
            default_prevented: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Node the event was dispatched at
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Node the firing listener is registered on
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    /// Node the binding's selector matched
    pub fn matched(&self) -> NodeId {
        self.matched
    }

    /// Host of the component whose binding is firing
    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Result of [`crate::Runtime::dispatch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that ran
    pub handled: usize,
    pub default_prevented: bool,
}

/// What a registered listener id stands for
#[derive(Clone)]
pub(crate) struct Binding {
    pub host: NodeId,
    /// `None` for host-scoped bindings
    pub selector: Option<SelectorList>,
    pub handler: EventHandler,
}

impl Binding {
    /// Node this binding fires for, if any.
    ///
    /// Walks from `target` up to (not including) `root`. Nodes inside the
    /// content of a nested component are skipped: only the outermost
    /// nested host and the nodes above it belong to this component.
    pub fn resolve(
        &self,
        doc: &dyn Document,
        target: NodeId,
        root: NodeId,
        is_host: &dyn Fn(NodeId) -> bool,
    ) -> Option<NodeId> {
        let Some(selector) = &self.selector else {
            return Some(self.host);
        };

        let mut chain = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            if node == root {
                break;
            }
            chain.push(node);
            current = doc.parent(node);
        }
        if current.is_none() {
            return None;
        }

        let start = chain
            .iter()
            .rposition(|&node| node != self.host && is_host(node))
            .unwrap_or(0);
        chain[start..]
            .iter()
            .copied()
            .filter(|&node| doc.is_element(node))
            .find(|&node| selector.matches_in(doc, node, Some(self.host)))
    }
}
