//! Scheduler tests for fos-components

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use fos_components::{ComponentDefinition, HandlerTable, Runtime, RuntimeConfig, TickReport};
use fos_dom::serialize::inner_html;
use fos_dom::{Document, NodeId};
use fos_vdom::Value;

fn runtime(markup: &str, config: RuntimeConfig) -> Runtime {
    let tree = fos_html::parse(markup).unwrap();
    Runtime::new(Box::new(tree), config)
}

fn compiled(source: &str) -> ComponentDefinition {
    let compiled = fos_template::compile(source).unwrap();
    ComponentDefinition::from_compiled(&compiled, &HandlerTable::new()).unwrap()
}

fn find_all(rt: &Runtime, tag: &str) -> Vec<NodeId> {
    let doc = rt.document();
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&node| doc.tag_name(node) == Some(tag))
        .collect()
}

fn content(rt: &Runtime, host: NodeId) -> String {
    inner_html(rt.document(), rt.instance(host).unwrap().content_root())
}

/// Item definition that records the order its instances mount in
fn recording_item(order: &Rc<RefCell<Vec<NodeId>>>) -> ComponentDefinition {
    let order = Rc::clone(order);
    compiled("<x-item><span>{{label}}</span></x-item>").on_mount(move |_, node| {
        order.borrow_mut().push(node);
        Ok(())
    })
}

const ITEMS: &str = "<x-item></x-item><section><x-item></x-item></section><x-item></x-item>";

// ============================================================================
// MOUNT QUEUE
// ============================================================================

#[test]
fn test_mounts_run_in_document_order() {
    let mut rt = runtime(ITEMS, RuntimeConfig::default());
    let order = Rc::new(RefCell::new(Vec::new()));
    rt.register(recording_item(&order), NodeId::ROOT).unwrap();
    let items = find_all(&rt, "x-item");

    let report = rt.tick_with_budget(Duration::ZERO);
    assert_eq!(report, TickReport { mounted: 1, rendered: 0, skipped: 0, remaining: 2 });
    assert_eq!(*order.borrow(), vec![items[0]]);

    rt.tick_with_budget(Duration::ZERO);
    rt.tick_with_budget(Duration::ZERO);
    assert_eq!(*order.borrow(), items);
    assert_eq!(rt.pending(), 0);
}

#[test]
fn test_generous_budget_drains_in_one_tick() {
    let mut rt = runtime(ITEMS, RuntimeConfig::default().with_frame_budget_ms(10_000));
    let order = Rc::new(RefCell::new(Vec::new()));
    rt.register(recording_item(&order), NodeId::ROOT).unwrap();

    let report = rt.tick();
    assert_eq!(report.mounted, 3);
    assert_eq!(report.remaining, 0);
    assert_eq!(rt.instance_count(), 3);
}

#[test]
fn test_detached_host_is_skipped() {
    let mut rt = runtime(ITEMS, RuntimeConfig::default());
    let order = Rc::new(RefCell::new(Vec::new()));
    rt.register(recording_item(&order), NodeId::ROOT).unwrap();

    let items = find_all(&rt, "x-item");
    let parent = rt.document().parent(items[1]).unwrap();
    rt.document_mut().remove_child(parent, items[1]).unwrap();

    let report = rt.flush();
    assert_eq!(report.mounted, 2);
    assert_eq!(report.skipped, 1);
    assert!(rt.instance(items[1]).is_none());
    assert_eq!(*order.borrow(), vec![items[0], items[2]]);
}

#[test]
fn test_inline_mount_bypasses_queue() {
    let mut rt = runtime(ITEMS, RuntimeConfig::default().with_defer_mounts(false));
    let order = Rc::new(RefCell::new(Vec::new()));
    rt.register(recording_item(&order), NodeId::ROOT).unwrap();

    assert_eq!(rt.pending(), 0);
    assert_eq!(order.borrow().len(), 3);
}

// ============================================================================
// DIRTY QUEUE
// ============================================================================

fn deferred_updates() -> (Runtime, NodeId) {
    let config = RuntimeConfig::default().with_defer_mounts(false).with_sync_updates(false);
    let mut rt = runtime("<x-item></x-item>", config);
    rt.register(
        compiled("<x-item><span>{{label}}</span></x-item>").with_default("label", "zero"),
        NodeId::ROOT,
    )
    .unwrap();
    let host = find_all(&rt, "x-item")[0];
    (rt, host)
}

#[test]
fn test_updates_coalesce_into_one_render() {
    let (mut rt, host) = deferred_updates();

    rt.set_prop(host, "label", "one").unwrap();
    rt.set_prop(host, "label", "two").unwrap();
    rt.set_attribute(host, "title", "t").unwrap();
    assert_eq!(rt.pending(), 1);
    assert_eq!(content(&rt, host), "<span>zero</span>");

    let report = rt.flush();
    assert_eq!(report.rendered, 1);
    assert_eq!(content(&rt, host), "<span>two</span>");
}

#[test]
fn test_each_queue_gets_a_job_per_tick() {
    let config = RuntimeConfig::default().with_sync_updates(false);
    let mut rt = runtime("<x-item></x-item>", config);
    rt.register(compiled("<x-item><span>{{label}}</span></x-item>"), NodeId::ROOT).unwrap();
    rt.flush();
    let host = find_all(&rt, "x-item")[0];
    rt.set_prop(host, "label", "one").unwrap();

    let body = find_all(&rt, "body")[0];
    let fresh = rt.document_mut().create_element("x-item");
    rt.document_mut().append_child(body, fresh).unwrap();
    assert_eq!(rt.upgrade(body).unwrap(), 1);
    assert_eq!(rt.pending(), 2);

    let report = rt.tick_with_budget(Duration::ZERO);
    assert_eq!(report, TickReport { mounted: 1, rendered: 1, skipped: 0, remaining: 0 });
    assert!(rt.instance(fresh).is_some());
    assert_eq!(content(&rt, host), "<span>one</span>");
}

#[test]
fn test_unmount_drops_queued_render() {
    let (mut rt, host) = deferred_updates();
    rt.set_prop(host, "label", "one").unwrap();
    assert_eq!(rt.pending(), 1);

    rt.unmount(host).unwrap();
    assert_eq!(rt.pending(), 0);
    assert_eq!(rt.flush(), TickReport::default());
}

#[test]
fn test_self_invalidating_render_waits_for_next_tick() {
    let mut rt = runtime("<x-spin></x-spin>", RuntimeConfig::default().with_defer_mounts(false));
    rt.register(
        compiled("<x-spin><b>{{n}}</b></x-spin>").with_default("n", 0).on_render(|rt, host| {
            let n = rt
                .instance(host)
                .and_then(|instance| instance.prop("n"))
                .and_then(Value::as_f64)
                .unwrap_or_default();
            rt.set_prop(host, "n", n + 1.0)?;
            Ok(())
        }),
        NodeId::ROOT,
    )
    .unwrap();
    assert_eq!(rt.pending(), 1);

    let report = rt.tick_with_budget(Duration::MAX);
    assert_eq!(report.rendered, 1);
    assert_eq!(report.remaining, 1);

    let report = rt.flush();
    assert!(report.rendered > 1);
    assert!(report.remaining > 0);
    assert_eq!(rt.pending(), 1);
}

// ============================================================================
// FRAME REQUESTS
// ============================================================================

#[test]
fn test_frame_requested_when_work_appears() {
    let mut rt = runtime("<x-item></x-item><x-item></x-item>", RuntimeConfig::default().with_sync_updates(false));
    let requests = Rc::new(Cell::new(0));
    let counter = Rc::clone(&requests);
    rt.on_frame_request(move || counter.set(counter.get() + 1));

    rt.register(compiled("<x-item><span>{{label}}</span></x-item>"), NodeId::ROOT).unwrap();
    assert_eq!(requests.get(), 1);

    rt.flush();
    let items = find_all(&rt, "x-item");
    rt.set_prop(items[0], "label", "a").unwrap();
    rt.set_prop(items[1], "label", "b").unwrap();
    assert_eq!(requests.get(), 2);
    assert_eq!(rt.pending(), 2);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_from_json_drives_runtime() {
    let config = RuntimeConfig::from_json(r#"{"defer_mounts": false, "frame_budget_ms": 4}"#).unwrap();
    assert_eq!(config.frame_budget(), Duration::from_millis(4));
    assert!(config.sync_updates);

    let mut rt = runtime("<x-item></x-item>", config);
    rt.register(compiled("<x-item><span>{{label}}</span></x-item>"), NodeId::ROOT).unwrap();
    assert_eq!(rt.pending(), 0);
    assert_eq!(rt.instance_count(), 1);
}

#[test]
fn test_config_rejects_bad_json() {
    assert!(RuntimeConfig::from_json(r#"{"frame_budget_ms": "fast"}"#).is_err());
}
