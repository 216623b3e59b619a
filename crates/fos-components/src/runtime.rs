//! Component Runtime
//!
//! One explicit context that owns the document, the tag registry, the data
//! registry, the instance table and the work queues. Independent runtimes
//! share nothing.
//!
//! Mount, render and unmount call each other recursively: a render mounts
//! hosts its diff created and unmounts hosts its diff dropped. A render
//! never re-enters the same instance; nested re-renders caused by a parent
//! render go to the dirty queue.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fos_css::SelectorList;
use fos_dom::{Document, ListenerId, NodeId};
use fos_vdom::{
    free_subtree_tokens, hash_value, make_node, Child, DataId, DataRegistry, HashStamps, Reconciler, RenderContext,
    RenderFn, VNode, Value, RESERVED_ATTRIBUTE_PREFIX,
};
use indexmap::IndexMap;

use crate::definition::Hook;
use crate::diagnostics::{Diagnostic, DiagnosticsSink, Phase, TracingSink};
use crate::events::{Binding, DispatchOutcome, Event};
use crate::lifecycle::{LifecycleChanges, LifecycleObserver};
use crate::scheduler::{Queue, Scheduler, TickReport};
use crate::{
    ComponentDefinition, ComponentLoader, DefinitionError, HandlerTable, Instance, InstanceState, LightContent,
    RuntimeConfig, RuntimeError, CONTENT_CLASS, PRERENDERED_CLASS, PROP_PREFIX, READY_ATTRIBUTE,
};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Ticks [`Runtime::flush`] runs before giving up on a queue that keeps refilling
const FLUSH_ROUNDS: usize = 64;

/// Component runtime over one document
pub struct Runtime {
    doc: Box<dyn Document>,
    config: RuntimeConfig,
    definitions: IndexMap<String, Rc<ComponentDefinition>>,
    instances: HashMap<NodeId, Instance>,
    registry: DataRegistry,
    stamps: HashStamps,
    scheduler: Scheduler,
    bindings: HashMap<ListenerId, Binding>,
    next_listener: u64,
    diagnostics: Rc<dyn DiagnosticsSink>,
    render_depth: usize,
}

impl Runtime {
    pub fn new(doc: Box<dyn Document>, config: RuntimeConfig) -> Self {
        tracing::info!(
            "Creating component runtime (frame budget {}ms, sync updates {})",
            config.frame_budget_ms,
            config.sync_updates
        );
        Self {
            doc,
            config,
            definitions: IndexMap::new(),
            instances: HashMap::new(),
            registry: DataRegistry::new(),
            stamps: HashStamps::new(),
            scheduler: Scheduler::new(),
            bindings: HashMap::new(),
            next_listener: 1,
            diagnostics: Rc::new(TracingSink),
            render_depth: 0,
        }
    }

    /// Send hook and handler failures to `sink` instead of the log
    pub fn with_diagnostics(mut self, sink: Rc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn document(&self) -> &dyn Document {
        &*self.doc
    }

    pub fn document_mut(&mut self) -> &mut dyn Document {
        &mut *self.doc
    }

    pub fn data_registry(&self) -> &DataRegistry {
        &self.registry
    }

    pub fn data_registry_mut(&mut self) -> &mut DataRegistry {
        &mut self.registry
    }

    pub fn definition(&self, tag: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(tag).map(|definition| &**definition)
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(tag)
    }

    pub fn instance(&self, node: NodeId) -> Option<&Instance> {
        self.instances.get(&node)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Jobs waiting on both queues
    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    /// Nearest ancestor of `node` that hosts a mounted component
    pub fn host_of(&self, node: NodeId) -> Option<NodeId> {
        self.doc
            .ancestors(node)
            .into_iter()
            .find(|ancestor| self.instances.contains_key(ancestor))
    }

    /// Styles of every registered component, in registration order
    pub fn stylesheet(&self) -> String {
        self.definitions
            .values()
            .flat_map(|definition| definition.styles().iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a definition unless its tag is taken, then initialize the
    /// occurrences of the tag under `root`. Returns how many were found.
    pub fn register(&mut self, definition: ComponentDefinition, root: NodeId) -> RuntimeResult<usize> {
        definition.validate()?;
        let tag = definition.tag_name().to_string();
        if self.definitions.contains_key(&tag) {
            tracing::debug!("<{}> is already registered", tag);
        } else {
            let definition = self.prepare(definition);
            tracing::info!("Registered <{}>", tag);
            self.definitions.insert(tag.clone(), Rc::new(definition));
        }
        let occurrences = self.occurrences(root, &|name| name == tag);
        self.initialize(occurrences)
    }

    /// Compile `path` through `loader` and register the result
    pub fn load(
        &mut self,
        loader: &dyn ComponentLoader,
        path: &str,
        handlers: &HandlerTable,
        root: NodeId,
    ) -> RuntimeResult<usize> {
        let compiled = loader.load(path)?;
        let definition = ComponentDefinition::from_compiled(&compiled, handlers)?;
        self.register(definition, root)
    }

    /// Initialize every occurrence of any registered tag under `root`
    pub fn upgrade(&mut self, root: NodeId) -> RuntimeResult<usize> {
        let definitions = &self.definitions;
        let occurrences = self.occurrences(root, &|name| definitions.contains_key(name));
        self.initialize(occurrences)
    }

    fn prepare(&self, mut definition: ComponentDefinition) -> ComponentDefinition {
        if self.config.minify_styles {
            for css in definition.styles_mut() {
                match fos_css::minify_stylesheet(css) {
                    Ok(minified) => *css = minified,
                    Err(e) => tracing::warn!("Keeping unminified style: {}", e),
                }
            }
        }
        definition
    }

    /// Uninitialized elements under `root` (inclusive) whose tag passes `is_match`
    fn occurrences(&self, root: NodeId, is_match: &dyn Fn(&str) -> bool) -> Vec<NodeId> {
        let mut nodes = vec![root];
        nodes.extend(self.doc.descendants(root));
        nodes
            .into_iter()
            .filter(|&node| self.doc.tag_name(node).is_some_and(is_match))
            .filter(|&node| !self.instances.contains_key(&node) && self.doc.attribute(node, READY_ATTRIBUTE).is_none())
            .collect()
    }

    fn initialize(&mut self, nodes: Vec<NodeId>) -> RuntimeResult<usize> {
        let found = nodes.len();
        for node in nodes {
            if self.config.defer_mounts {
                self.scheduler.enqueue(Queue::Mount, node);
            } else if self.doc.is_connected(node) {
                self.mount(node)?;
            }
        }
        Ok(found)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Turn `node` into a component instance and render it.
    ///
    /// No-op for nodes that are ready, already mounted or have no
    /// registered definition.
    pub fn mount(&mut self, node: NodeId) -> RuntimeResult<()> {
        if self.instances.contains_key(&node) || self.doc.attribute(node, READY_ATTRIBUTE).is_some() {
            return Ok(());
        }
        let Some(definition) = self.doc.tag_name(node).and_then(|tag| self.definitions.get(tag)).cloned() else {
            return Ok(());
        };
        self.scheduler.remove(node);
        tracing::debug!("Mounting <{}> at {}", definition.tag_name(), node);

        let prerendered = self
            .doc
            .element_children(node)
            .into_iter()
            .find(|&child| self.doc.has_class(child, PRERENDERED_CLASS));
        let light: Vec<NodeId> = self
            .doc
            .children(node)
            .into_iter()
            .filter(|&child| Some(child) != prerendered)
            .collect();
        let body = LightContent::capture(&*self.doc, &light);
        for child in light {
            self.doc.remove_child(node, child)?;
        }

        let content_root = match prerendered {
            Some(block) => {
                self.adopt(block)?;
                block
            }
            None => {
                let root = self.doc.create_element("div");
                self.doc.set_attribute(root, "class", CONTENT_CLASS)?;
                self.doc.append_child(node, root)?;
                root
            }
        };

        let supplied = self.prop_attributes(node);
        let mut props = definition.defaults().clone();
        let attribute_props = supplied.keys().cloned().collect();
        props.extend(supplied);
        let mut instance = Instance::new(Rc::clone(&definition), node, content_root, props, attribute_props, body);
        instance.prerendered = prerendered.is_some();
        self.instances.insert(node, instance);

        self.run_hook(Phase::Mount, node, definition.hooks().mount.clone());
        if !self.instances.contains_key(&node) {
            return Ok(());
        }

        if prerendered.is_some() {
            let hash = hash_value(&self.snapshot(node)?);
            if let Some(instance) = self.instances.get_mut(&node) {
                instance.last_hash = Some(hash);
                instance.state = InstanceState::Rendered;
            }
            self.bind_events(node)?;
            self.upgrade(content_root)?;
        } else {
            self.render(node)?;
        }
        self.doc.set_attribute(node, READY_ATTRIBUTE, "")?;
        Ok(())
    }

    /// Swap the pre-rendered marker for the content root class
    fn adopt(&mut self, block: NodeId) -> RuntimeResult<()> {
        let mut classes: Vec<&str> = self
            .doc
            .attribute(block, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|class| *class != PRERENDERED_CLASS)
            .collect();
        if !classes.contains(&CONTENT_CLASS) {
            classes.push(CONTENT_CLASS);
        }
        let class = classes.join(" ");
        self.doc.set_attribute(block, "class", &class)?;
        Ok(())
    }

    /// Re-render `node` if its data snapshot changed since the last render
    pub fn render(&mut self, node: NodeId) -> RuntimeResult<()> {
        let (definition, state) = match self.instances.get(&node) {
            Some(instance) => (Rc::clone(&instance.definition), instance.state),
            None => return Err(RuntimeError::NotMounted(node)),
        };
        if state == InstanceState::Rendering {
            tracing::warn!("<{}> at {} is already rendering, deferring", definition.tag_name(), node);
            self.schedule(node);
            return Ok(());
        }
        let render_fn = definition.render_fn().cloned().ok_or_else(|| RuntimeError::MissingRender {
            tag: definition.tag_name().to_string(),
        })?;

        let snapshot = self.snapshot(node)?;
        let hash = hash_value(&snapshot);
        if let Some(instance) = self.instances.get_mut(&node) {
            if instance.last_hash == Some(hash) {
                instance.state = InstanceState::Rendered;
                return Ok(());
            }
            instance.state = InstanceState::Rendering;
        }

        tracing::debug!("Rendering <{}> at {}", definition.tag_name(), node);
        self.render_depth += 1;
        let result = self.render_content(node, &definition, &render_fn, &snapshot);
        self.render_depth -= 1;

        let queued = self.scheduler.contains(Queue::Dirty, node);
        if let Some(instance) = self.instances.get_mut(&node) {
            if instance.state == InstanceState::Rendering {
                instance.state = if queued { InstanceState::Dirty } else { InstanceState::Rendered };
            }
            if result.is_ok() {
                instance.last_hash = Some(hash);
            }
        }
        result
    }

    fn render_content(
        &mut self,
        node: NodeId,
        definition: &ComponentDefinition,
        render_fn: &RenderFn,
        snapshot: &Value,
    ) -> RuntimeResult<()> {
        let children = render_fn(&mut RenderContext::new(&mut self.registry), snapshot);
        let vtree = make_node(
            &mut self.registry,
            "div",
            [("class", Value::from(CONTENT_CLASS))],
            children.into_iter().map(Child::from),
        );

        let content_root = self.content_root(node)?;
        let mut observer = LifecycleObserver::new(&self.definitions, &self.instances);
        let live = Reconciler::new(&mut *self.doc, &mut self.registry, &mut self.stamps, &mut observer)
            .reconcile(content_root, &vtree)?;
        let changes = observer.into_changes();
        if live != content_root {
            if let Some(instance) = self.instances.get_mut(&node) {
                instance.content_root = live;
            }
        }

        self.apply_changes(changes, true)?;
        self.bind_events(node)?;
        self.run_hook(Phase::Render, node, definition.hooks().render.clone());
        if self.instances.contains_key(&node) {
            self.ensure_consistent(node, &vtree)?;
        }
        Ok(())
    }

    /// Act on what a diff did to other components
    fn apply_changes(&mut self, changes: LifecycleChanges, free_tokens: bool) -> RuntimeResult<()> {
        for root in changes.discarded {
            let mut nodes = vec![root];
            nodes.extend(self.doc.descendants(root));
            for node in nodes {
                if self.instances.contains_key(&node) {
                    self.unmount_instance(node, free_tokens)?;
                }
            }
        }

        for host in changes.prop_writes {
            if self.instances.contains_key(&host) {
                self.refresh_props(host);
                self.schedule(host);
            }
        }

        for (host, markup) in changes.body_updates {
            let body = LightContent::from_markup(&markup)?;
            if let Some(instance) = self.instances.get_mut(&host) {
                instance.body = body;
                self.schedule(host);
            }
        }

        for host in changes.created {
            if self.instances.contains_key(&host) || !self.doc.is_connected(host) {
                continue;
            }
            if let Err(e) = self.mount(host) {
                self.report(host, Phase::Render, e.to_string());
            }
        }
        Ok(())
    }

    /// Compare nested host tags in the vtree with the live content, and
    /// rebuild the content until they agree
    fn ensure_consistent(&mut self, node: NodeId, vtree: &VNode) -> RuntimeResult<()> {
        let definitions = &self.definitions;
        let expected: Vec<String> = vtree
            .find_all(&|tag| definitions.contains_key(tag))
            .into_iter()
            .map(|vnode| vnode.tag().to_string())
            .collect();

        let attempts = self.config.max_rebuild_attempts;
        for attempt in 0..=attempts {
            let content_root = self.content_root(node)?;
            if self.live_host_tags(content_root) == expected {
                return Ok(());
            }
            if attempt == attempts {
                break;
            }
            tracing::warn!("Content of {} does not match its render, rebuilding (attempt {})", node, attempt + 1);
            self.rebuild(node, vtree)?;
        }

        let tag = self.doc.tag_name(node).unwrap_or_default().to_string();
        Err(RuntimeError::Unstable { tag, attempts })
    }

    /// Registered tags directly inside `root`, not looking into nested hosts
    fn live_host_tags(&self, root: NodeId) -> Vec<String> {
        let mut tags = Vec::new();
        let mut stack: Vec<NodeId> = self.doc.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            match self.doc.tag_name(node) {
                Some(tag) if self.definitions.contains_key(tag) => tags.push(tag.to_string()),
                Some(_) => stack.extend(self.doc.children(node).into_iter().rev()),
                None => {}
            }
        }
        tags
    }

    fn rebuild(&mut self, node: NodeId, vtree: &VNode) -> RuntimeResult<()> {
        let content_root = self.content_root(node)?;
        let mut observer = LifecycleObserver::new(&self.definitions, &self.instances);
        Reconciler::new(&mut *self.doc, &mut self.registry, &mut self.stamps, &mut observer)
            .rebuild(content_root, vtree)?;
        let changes = observer.into_changes();
        self.apply_changes(changes, false)
    }

    /// Tear down the instance at `node` and everything nested in it
    pub fn unmount(&mut self, node: NodeId) -> RuntimeResult<()> {
        if !self.instances.contains_key(&node) {
            return Err(RuntimeError::NotMounted(node));
        }
        self.unmount_instance(node, true)
    }

    /// Rebuilds keep the tokens: the fresh content references them again
    fn unmount_instance(&mut self, node: NodeId, free_tokens: bool) -> RuntimeResult<()> {
        let Some(instance) = self.instances.get_mut(&node) else {
            return Ok(());
        };
        instance.state = InstanceState::Unmounted;
        let content_root = instance.content_root;
        let definition = Rc::clone(&instance.definition);
        tracing::debug!("Unmounting <{}> at {}", definition.tag_name(), node);

        if free_tokens {
            for name in self.doc.attribute_names(node) {
                let ids = self.doc.attribute(node, &name).map(DataId::scan_tokens).unwrap_or_default();
                for id in ids {
                    self.registry.free(id);
                }
            }
            free_subtree_tokens(&*self.doc, &mut self.registry, content_root);
        }

        let nested: Vec<NodeId> = self
            .doc
            .descendants(content_root)
            .into_iter()
            .filter(|host| self.instances.contains_key(host))
            .collect();
        for host in nested {
            self.unmount_instance(host, free_tokens)?;
        }

        self.run_hook(Phase::Unmount, node, definition.hooks().unmount.clone());

        let Some(instance) = self.instances.remove(&node) else {
            return Ok(());
        };
        for (target, event, id) in instance.listeners {
            self.doc.remove_event_listener(target, &event, id)?;
            self.bindings.remove(&id);
        }
        self.scheduler.remove(node);
        self.stamps.remove(content_root);
        for descendant in self.doc.descendants(content_root) {
            self.stamps.remove(descendant);
        }
        self.doc.remove_attribute(node, READY_ATTRIBUTE)?;
        Ok(())
    }

    // ========================================================================
    // Props, attributes and light content
    // ========================================================================

    /// Set an attribute on `node`; on a mounted host this refreshes its props
    /// and re-renders
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> RuntimeResult<()> {
        self.doc.set_attribute(node, name, value)?;
        self.attribute_changed(node)
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> RuntimeResult<()> {
        self.doc.remove_attribute(node, name)?;
        self.attribute_changed(node)
    }

    fn attribute_changed(&mut self, node: NodeId) -> RuntimeResult<()> {
        if !self.instances.contains_key(&node) {
            return Ok(());
        }
        self.refresh_props(node);
        self.invalidate(node)
    }

    pub fn set_prop(&mut self, node: NodeId, name: &str, value: impl Into<Value>) -> RuntimeResult<()> {
        let instance = self.instances.get_mut(&node).ok_or(RuntimeError::NotMounted(node))?;
        instance.props.insert(name.to_string(), value.into());
        self.invalidate(node)
    }

    /// Set several props with a single re-render
    pub fn set_props<K, I>(&mut self, node: NodeId, props: I) -> RuntimeResult<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let instance = self.instances.get_mut(&node).ok_or(RuntimeError::NotMounted(node))?;
        instance
            .props
            .extend(props.into_iter().map(|(name, value)| (name.into(), value)));
        self.invalidate(node)
    }

    /// Replace the light content of `node` and schedule a re-render
    pub fn set_body(&mut self, node: NodeId, markup: &str) -> RuntimeResult<()> {
        let body = LightContent::from_markup(markup)?;
        let instance = self.instances.get_mut(&node).ok_or(RuntimeError::NotMounted(node))?;
        instance.body = body;
        self.schedule(node);
        Ok(())
    }

    pub fn body(&self, node: NodeId) -> Option<&LightContent> {
        self.instances.get(&node).map(|instance| &instance.body)
    }

    /// Re-render now, or later when inside a render pass or when updates
    /// are deferred
    fn invalidate(&mut self, node: NodeId) -> RuntimeResult<()> {
        let Some(state) = self.instances.get(&node).map(|instance| instance.state) else {
            return Ok(());
        };
        match state {
            InstanceState::Mounting | InstanceState::Unmounted => Ok(()),
            InstanceState::Rendering => {
                self.schedule(node);
                Ok(())
            }
            _ if self.render_depth > 0 || !self.config.sync_updates => {
                self.schedule(node);
                Ok(())
            }
            _ => self.render(node),
        }
    }

    fn schedule(&mut self, node: NodeId) {
        self.scheduler.enqueue(Queue::Dirty, node);
        if let Some(instance) = self.instances.get_mut(&node) {
            if instance.state == InstanceState::Rendered {
                instance.state = InstanceState::Dirty;
            }
        }
    }

    /// Props supplied by `:` attributes, keyed by camelCase name
    fn prop_attributes(&self, node: NodeId) -> IndexMap<String, Value> {
        self.doc
            .attribute_names(node)
            .into_iter()
            .filter_map(|name| {
                let prop = camel_case(name.strip_prefix(PROP_PREFIX)?);
                let value = self.attribute_value(self.doc.attribute(node, &name)?);
                Some((prop, value))
            })
            .collect()
    }

    fn refresh_props(&mut self, node: NodeId) {
        let supplied = self.prop_attributes(node);
        let Some(instance) = self.instances.get_mut(&node) else {
            return;
        };
        let definition = Rc::clone(&instance.definition);
        for name in std::mem::take(&mut instance.attribute_props) {
            if supplied.contains_key(&name) {
                continue;
            }
            match definition.defaults().get(&name) {
                Some(value) => {
                    instance.props.insert(name, value.clone());
                }
                None => {
                    instance.props.shift_remove(&name);
                }
            }
        }
        instance.attribute_props = supplied.keys().cloned().collect();
        instance.props.extend(supplied);
    }

    /// Attribute text, or the registry value its token stands for
    fn attribute_value(&self, text: &str) -> Value {
        self.registry
            .resolve_token(text)
            .cloned()
            .unwrap_or_else(|| Value::from(text))
    }

    /// Data handed to the render function
    fn snapshot(&self, node: NodeId) -> RuntimeResult<Value> {
        let instance = self.instances.get(&node).ok_or(RuntimeError::NotMounted(node))?;
        let mut data = instance.props.clone();

        let mut attributes = IndexMap::new();
        for name in self.doc.attribute_names(node) {
            if name.starts_with(PROP_PREFIX) || name.starts_with(RESERVED_ATTRIBUTE_PREFIX) {
                continue;
            }
            if let Some(text) = self.doc.attribute(node, &name) {
                attributes.insert(name.clone(), self.attribute_value(text));
            }
        }
        let style = self.doc.attribute(node, "style").unwrap_or_default();

        data.insert("attributes".to_string(), Value::from(attributes));
        data.insert("body".to_string(), Value::from(instance.body.markup()));
        data.insert("children".to_string(), instance.body.children_value());
        data.insert("style".to_string(), Value::from(style));
        Ok(Value::Object(data))
    }

    fn content_root(&self, node: NodeId) -> RuntimeResult<NodeId> {
        self.instances
            .get(&node)
            .map(|instance| instance.content_root)
            .ok_or(RuntimeError::NotMounted(node))
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Attach the definition's bindings. Host-scoped ones go on the host
    /// once; the rest follow the content root when a diff replaces it.
    fn bind_events(&mut self, node: NodeId) -> RuntimeResult<()> {
        let Some(instance) = self.instances.get(&node) else {
            return Ok(());
        };
        let content_root = instance.content_root;
        if instance.bound_root == Some(content_root) {
            return Ok(());
        }
        let first = instance.bound_root.is_none();
        let definition = Rc::clone(&instance.definition);
        let stale: Vec<(NodeId, String, ListenerId)> = instance
            .listeners
            .iter()
            .filter(|(target, _, _)| *target != node)
            .cloned()
            .collect();

        for (target, event, id) in &stale {
            self.doc.remove_event_listener(*target, event, *id)?;
            self.bindings.remove(id);
        }

        let mut added = Vec::new();
        for binding in definition.events() {
            let host_scoped = binding.is_host_scoped(definition.tag_name());
            if host_scoped && !first {
                continue;
            }
            let (target, selector) = if host_scoped {
                (node, None)
            } else {
                let selector = SelectorList::parse(&binding.selector).map_err(|e| DefinitionError::InvalidSelector {
                    tag: definition.tag_name().to_string(),
                    selector: binding.selector.clone(),
                    message: e.to_string(),
                })?;
                (content_root, Some(selector))
            };
            let id = ListenerId(self.next_listener);
            self.next_listener += 1;
            self.doc.add_event_listener(target, &binding.event, id)?;
            self.bindings.insert(id, Binding { host: node, selector, handler: Rc::clone(&binding.handler) });
            added.push((target, binding.event.clone(), id));
        }

        if let Some(instance) = self.instances.get_mut(&node) {
            instance.listeners.retain(|(target, _, _)| *target == node);
            instance.listeners.extend(added);
            instance.bound_root = Some(content_root);
        }
        Ok(())
    }

    /// Dispatch an event at `target`, bubbling to the document root
    pub fn dispatch(&mut self, target: NodeId, event_type: &str, detail: Value) -> DispatchOutcome {
        let mut event = Event::new(event_type, target, detail);
        let mut outcome = DispatchOutcome::default();
        let mut path = vec![target];
        path.extend(self.doc.ancestors(target));

        for current in path {
            for id in self.doc.event_listeners(current, event_type) {
                let Some(binding) = self.bindings.get(&id).cloned() else {
                    continue;
                };
                let is_host = |node: NodeId| self.instances.contains_key(&node);
                let Some(matched) = binding.resolve(&*self.doc, target, current, &is_host) else {
                    continue;
                };
                event.current_target = current;
                event.matched = matched;
                event.host = binding.host;
                outcome.handled += 1;
                if let Err(e) = (binding.handler)(self, &mut event) {
                    self.report(binding.host, Phase::Event, format!("{e:#}"));
                }
            }
            if event.propagation_stopped {
                break;
            }
        }

        outcome.default_prevented = event.default_prevented;
        outcome
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Host callback for when work becomes pending
    pub fn on_frame_request(&mut self, callback: impl FnMut() + 'static) {
        self.scheduler.set_frame_request(callback);
    }

    /// Run one tick with the configured frame budget
    pub fn tick(&mut self) -> TickReport {
        self.tick_with_budget(self.config.frame_budget())
    }

    /// Drain the mount queue, then the dirty queue, each for up to `budget`.
    /// At least one job per non-empty queue runs. Jobs queued during the
    /// tick wait for the next one.
    pub fn tick_with_budget(&mut self, budget: Duration) -> TickReport {
        let mut report = TickReport::default();
        for queue in [Queue::Mount, Queue::Dirty] {
            let started = Instant::now();
            for _ in 0..self.scheduler.queue_len(queue) {
                let Some(node) = self.scheduler.pop(queue) else {
                    break;
                };
                self.run_job(queue, node, &mut report);
                if started.elapsed() >= budget {
                    break;
                }
            }
        }
        report.remaining = self.scheduler.len();
        tracing::debug!(
            "Tick: {} mounted, {} rendered, {} skipped, {} remaining",
            report.mounted,
            report.rendered,
            report.skipped,
            report.remaining
        );
        report
    }

    /// Tick until both queues are empty
    pub fn flush(&mut self) -> TickReport {
        let mut total = TickReport::default();
        for _ in 0..FLUSH_ROUNDS {
            if self.scheduler.is_empty() {
                break;
            }
            total.absorb(self.tick_with_budget(Duration::MAX));
        }
        total.remaining = self.scheduler.len();
        if total.remaining > 0 {
            tracing::warn!("{} jobs still queued after {} flush rounds", total.remaining, FLUSH_ROUNDS);
        }
        total
    }

    fn run_job(&mut self, queue: Queue, node: NodeId, report: &mut TickReport) {
        if !self.doc.is_connected(node) {
            tracing::warn!("Dropping {:?} job for detached node {}", queue, node);
            report.skipped += 1;
            return;
        }
        match queue {
            Queue::Mount => match self.mount(node) {
                Ok(()) if self.instances.contains_key(&node) => report.mounted += 1,
                Ok(()) => report.skipped += 1,
                Err(e) => self.report(node, Phase::Mount, e.to_string()),
            },
            Queue::Dirty => {
                if !self.instances.contains_key(&node) {
                    report.skipped += 1;
                    return;
                }
                match self.render(node) {
                    Ok(()) => report.rendered += 1,
                    Err(e) => self.report(node, Phase::Render, e.to_string()),
                }
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn run_hook(&mut self, phase: Phase, node: NodeId, hook: Option<Hook>) {
        let Some(hook) = hook else {
            return;
        };
        if let Err(e) = hook(self, node) {
            self.report(node, phase, format!("{e:#}"));
        }
    }

    fn report(&self, host: NodeId, phase: Phase, message: String) {
        let tag = self.doc.tag_name(host).unwrap_or_default().to_string();
        self.diagnostics.report(Diagnostic { tag, host, phase, message });
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("instances", &self.instances.len())
            .field("registry", &self.registry.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// `user-name` to `userName`
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::DomTree;

    fn runtime(markup: &str) -> Runtime {
        let tree = fos_html::parse(markup).unwrap();
        Runtime::new(Box::new(tree), RuntimeConfig::default().with_defer_mounts(false))
    }

    fn find(runtime: &Runtime, tag: &str) -> NodeId {
        let doc = runtime.document();
        doc.descendants(doc.root())
            .into_iter()
            .find(|&node| doc.tag_name(node) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("user-name"), "userName");
        assert_eq!(camel_case("items"), "items");
        assert_eq!(camel_case("a-b-c"), "aBC");
    }

    #[test]
    fn test_snapshot_reserved_keys() {
        let mut rt = runtime(r#"<x-card :user-name="Ada" title="t" style="color: red">hi</x-card>"#);
        rt.register(
            ComponentDefinition::new("x-card").with_render(|_, _| Vec::new()).with_default("size", 2),
            NodeId::ROOT,
        )
        .unwrap();
        let host = find(&rt, "x-card");
        let snapshot = rt.snapshot(host).unwrap();

        assert_eq!(snapshot.get("userName"), Some(&Value::from("Ada")));
        assert_eq!(snapshot.get("size"), Some(&Value::from(2)));
        assert_eq!(snapshot.get("body"), Some(&Value::from("hi")));
        assert_eq!(snapshot.get("style"), Some(&Value::from("color: red")));
        let attributes = snapshot.get("attributes").unwrap();
        assert_eq!(attributes.get("title"), Some(&Value::from("t")));
        assert!(attributes.get(":user-name").is_none());
        assert!(attributes.get("fos-ready").is_none());
    }

    #[test]
    fn test_refresh_props_falls_back_to_default() {
        let mut rt = runtime(r#"<x-card :size="9"></x-card>"#);
        rt.register(
            ComponentDefinition::new("x-card").with_render(|_, _| Vec::new()).with_default("size", 2),
            NodeId::ROOT,
        )
        .unwrap();
        let host = find(&rt, "x-card");
        assert_eq!(rt.instance(host).unwrap().prop("size"), Some(&Value::from("9")));

        rt.remove_attribute(host, ":size").unwrap();
        assert_eq!(rt.instance(host).unwrap().prop("size"), Some(&Value::from(2)));
    }

    #[test]
    fn test_mount_undefined_is_noop() {
        let mut rt = Runtime::new(Box::new(DomTree::new()), RuntimeConfig::default());
        let node = rt.document_mut().create_element("x-unknown");
        let root = rt.document().root();
        rt.document_mut().append_child(root, node).unwrap();

        rt.mount(node).unwrap();
        assert!(rt.instance(node).is_none());
        assert!(rt.document().children(node).is_empty());
    }
}
