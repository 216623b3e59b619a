//! Component Definitions
//!
//! A typed record of everything the runtime needs to instantiate a tag:
//! render function, default props, lifecycle hooks, delegated event
//! bindings and styles. Definitions come from compiled templates (script
//! table names resolved through a [`HandlerTable`]) or are built directly.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_css::{SelectorList, HOST_SELECTOR};
use fos_dom::NodeId;
use fos_template::CompiledComponent;
use fos_vdom::{RenderContext, RenderFn, VChild, Value};
use indexmap::IndexMap;

use crate::{DefinitionError, Event, Runtime};

/// Lifecycle hook: mount, unmount or render
pub type Hook = Rc<dyn Fn(&mut Runtime, NodeId) -> anyhow::Result<()>>;

/// Delegated event handler
pub type EventHandler = Rc<dyn Fn(&mut Runtime, &mut Event) -> anyhow::Result<()>>;

/// Optional lifecycle hooks; absent hooks are no-ops
#[derive(Clone, Default)]
pub struct Hooks {
    pub mount: Option<Hook>,
    pub unmount: Option<Hook>,
    pub render: Option<Hook>,
}

/// One delegated event entry
#[derive(Clone)]
pub struct EventBinding {
    pub selector: String,
    pub event: String,
    pub handler: EventHandler,
}

impl EventBinding {
    /// Bound on the host itself rather than delegated from the content root
    pub fn is_host_scoped(&self, tag: &str) -> bool {
        let selector = self.selector.trim();
        selector == HOST_SELECTOR || selector == tag
    }
}

/// Component definition
#[derive(Clone)]
pub struct ComponentDefinition {
    tag_name: String,
    render: Option<RenderFn>,
    defaults: IndexMap<String, Value>,
    hooks: Hooks,
    events: Vec<EventBinding>,
    styles: Vec<String>,
}

impl ComponentDefinition {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            render: None,
            defaults: IndexMap::new(),
            hooks: Hooks::default(),
            events: Vec::new(),
            styles: Vec::new(),
        }
    }

    /// Build from compiled source, resolving hook and handler names
    pub fn from_compiled(compiled: &CompiledComponent, handlers: &HandlerTable) -> Result<Self, DefinitionError> {
        let tag = compiled.tag_name.as_str();
        let unknown = |name: &str| DefinitionError::UnknownHandler {
            tag: tag.to_string(),
            name: name.to_string(),
        };
        let hook = |name: &Option<String>| -> Result<Option<Hook>, DefinitionError> {
            match name {
                Some(name) => handlers.hook(name).map(Some).ok_or_else(|| unknown(name.as_str())),
                None => Ok(None),
            }
        };

        let mut definition = Self::new(tag);
        definition.render = Some(compiled.render_fn());
        definition.hooks = Hooks {
            mount: hook(&compiled.functions.mount)?,
            unmount: hook(&compiled.functions.unmount)?,
            render: hook(&compiled.functions.render)?,
        };
        if let Value::Object(defaults) = compiled.functions.default_props() {
            definition.defaults = defaults;
        }
        for (selector, events) in &compiled.functions.events {
            for (event, name) in events {
                let handler = handlers.event(name).ok_or_else(|| unknown(name.as_str()))?;
                definition.events.push(EventBinding {
                    selector: selector.clone(),
                    event: event.clone(),
                    handler,
                });
            }
        }
        definition.styles = compiled.styles.clone();
        Ok(definition)
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn render_fn(&self) -> Option<&RenderFn> {
        self.render.as_ref()
    }

    pub fn defaults(&self) -> &IndexMap<String, Value> {
        &self.defaults
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn events(&self) -> &[EventBinding] {
        &self.events
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    pub(crate) fn styles_mut(&mut self) -> &mut Vec<String> {
        &mut self.styles
    }

    pub fn with_render(mut self, render: impl Fn(&mut RenderContext<'_>, &Value) -> Vec<VChild> + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn with_render_fn(mut self, render: RenderFn) -> Self {
        self.render = Some(render);
        self
    }

    pub fn with_default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }

    pub fn with_style(mut self, css: &str) -> Self {
        self.styles.push(fos_css::scope_stylesheet(css, &self.tag_name));
        self
    }

    pub fn on_mount(mut self, hook: impl Fn(&mut Runtime, NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.hooks.mount = Some(Rc::new(hook));
        self
    }

    pub fn on_unmount(mut self, hook: impl Fn(&mut Runtime, NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.hooks.unmount = Some(Rc::new(hook));
        self
    }

    pub fn on_render(mut self, hook: impl Fn(&mut Runtime, NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.hooks.render = Some(Rc::new(hook));
        self
    }

    /// Delegate `event` on nodes matching `selector`
    pub fn on(
        mut self,
        selector: &str,
        event: &str,
        handler: impl Fn(&mut Runtime, &mut Event) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.events.push(EventBinding {
            selector: selector.to_string(),
            event: event.to_string(),
            handler: Rc::new(handler),
        });
        self
    }

    /// Checks run once at registration
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !is_valid_custom_element_name(&self.tag_name) {
            return Err(DefinitionError::InvalidTagName(self.tag_name.clone()));
        }
        for binding in &self.events {
            if binding.is_host_scoped(&self.tag_name) {
                continue;
            }
            SelectorList::parse(&binding.selector).map_err(|e| DefinitionError::InvalidSelector {
                tag: self.tag_name.clone(),
                selector: binding.selector.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("tag_name", &self.tag_name)
            .field("has_render", &self.render.is_some())
            .field("defaults", &self.defaults)
            .field("events", &self.events.len())
            .field("styles", &self.styles.len())
            .finish()
    }
}

/// Reserved names that look like custom elements but are not
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Lowercase ASCII letter first, at least one hyphen, not reserved
pub fn is_valid_custom_element_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && name.contains('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
        && !RESERVED_NAMES.contains(&name)
}

/// Named Rust closures that script tables refer to
#[derive(Clone, Default)]
pub struct HandlerTable {
    hooks: HashMap<String, Hook>,
    events: HashMap<String, EventHandler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(
        mut self,
        name: &str,
        hook: impl Fn(&mut Runtime, NodeId) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.insert(name.to_string(), Rc::new(hook));
        self
    }

    pub fn with_event(
        mut self,
        name: &str,
        handler: impl Fn(&mut Runtime, &mut Event) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.events.insert(name.to_string(), Rc::new(handler));
        self
    }

    pub fn hook(&self, name: &str) -> Option<Hook> {
        self.hooks.get(name).cloned()
    }

    pub fn event(&self, name: &str) -> Option<EventHandler> {
        self.events.get(name).cloned()
    }
}
