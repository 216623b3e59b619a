//! DOM Events
//!
//! The document only stores listener registrations. Dispatch and handler
//! invocation belong to whoever owns the listener ids.

/// Opaque listener handle registered on a node for one event name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}
