//! Script tables
//!
//! A component's `<script>` block is a JSON table naming its props,
//! delegated events and hooks. It is parsed once at compile time; handler
//! names are resolved to Rust closures when the definition is built.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use fos_vdom::Value;

/// Parsed `<script>` block
///
/// ```json
/// {
///   "props": { "count": 0 },
///   "events": { ".btn": { "click": "increment" } },
///   "mount": "start",
///   "unmount": "stop",
///   "render": "afterRender"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptTable {
    /// Default prop values
    pub props: IndexMap<String, serde_json::Value>,
    /// selector -> event type -> handler name
    pub events: IndexMap<String, IndexMap<String, String>>,
    pub mount: Option<String>,
    pub unmount: Option<String>,
    pub render: Option<String>,
}

impl ScriptTable {
    /// Parse a script block; blank blocks give an empty table
    pub fn parse(source: &str) -> Result<Self, serde_json::Error> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(source)
    }

    /// Fold a later block into this one; later entries win
    pub fn merge(&mut self, other: ScriptTable) {
        self.props.extend(other.props);
        for (selector, handlers) in other.events {
            self.events.entry(selector).or_default().extend(handlers);
        }
        if other.mount.is_some() {
            self.mount = other.mount;
        }
        if other.unmount.is_some() {
            self.unmount = other.unmount;
        }
        if other.render.is_some() {
            self.render = other.render;
        }
    }

    /// Default props as a value object
    pub fn default_props(&self) -> Value {
        Value::Object(
            self.props
                .iter()
                .map(|(name, value)| (name.clone(), Value::from(value.clone())))
                .collect(),
        )
    }

    /// Every handler name the table refers to
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        let hooks = [&self.mount, &self.unmount, &self.render]
            .into_iter()
            .filter_map(|name| name.as_deref());
        let events = self.events.values().flat_map(|handlers| handlers.values().map(String::as_str));
        hooks.chain(events)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
