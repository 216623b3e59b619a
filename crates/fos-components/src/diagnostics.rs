//! Diagnostics
//!
//! Hook and handler failures stop at the instance boundary and are
//! reported here instead of propagating.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fos_dom::NodeId;

/// Where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Mount,
    Unmount,
    Render,
    Event,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Mount => "mount",
            Phase::Unmount => "unmount",
            Phase::Render => "render",
            Phase::Event => "event",
        };
        f.write_str(name)
    }
}

/// One reported failure
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub tag: String,
    pub host: NodeId,
    pub phase: Phase,
    pub message: String,
}

/// Receiver for failures caught by the runtime
pub trait DiagnosticsSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs failures at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::error!(
            "<{}> {} failed on {}: {}",
            diagnostic.tag,
            diagnostic.phase,
            diagnostic.host,
            diagnostic.message
        );
    }
}

/// Keeps every failure for later inspection
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.borrow_mut().push(diagnostic);
    }
}
