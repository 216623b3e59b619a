//! Event delegation tests for fos-components

use std::cell::RefCell;
use std::rc::Rc;

use fos_components::{CollectingSink, ComponentDefinition, Event, HandlerTable, Phase, Runtime, RuntimeConfig};
use fos_dom::{Document, NodeId};
use fos_vdom::Value;
use serde_json::json;

type Calls = Rc<RefCell<Vec<(String, NodeId, NodeId)>>>;

fn runtime(markup: &str) -> Runtime {
    let tree = fos_html::parse(markup).unwrap();
    Runtime::new(Box::new(tree), RuntimeConfig::default().with_defer_mounts(false))
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

fn with_class(rt: &Runtime, class: &str) -> Vec<NodeId> {
    let doc = rt.document();
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&node| doc.has_class(node, class))
        .collect()
}

/// Handler that records (label, host, matched)
fn record(calls: &Calls, label: &str) -> impl Fn(&mut Runtime, &mut Event) -> anyhow::Result<()> + 'static {
    let calls = Rc::clone(calls);
    let label = label.to_string();
    move |_, event| {
        calls.borrow_mut().push((label.clone(), event.host(), event.matched()));
        Ok(())
    }
}

const MENU: &str = r#"<x-menu><ul>{{#items}}<li class="{{kind}}">{{name}}</li>{{/items}}</ul></x-menu>"#;

// ============================================================================
// CONTENT-SCOPED BINDINGS
// ============================================================================

#[test]
fn test_delegation_serves_nodes_added_later() {
    let mut rt = runtime("<x-menu></x-menu>");
    let calls: Calls = Rc::default();
    rt.register(
        compiled(MENU)
            .with_default("items", Value::from(json!([{"kind": "btn", "name": "a"}])))
            .on(".btn", "click", record(&calls, "btn")),
        NodeId::ROOT,
    )
    .unwrap();
    let host = find_all(&rt, "x-menu")[0];

    rt.set_prop(
        host,
        "items",
        Value::from(json!([
            {"kind": "btn", "name": "a"},
            {"kind": "btn", "name": "b"},
            {"kind": "other", "name": "c"}
        ])),
    )
    .unwrap();

    let buttons = with_class(&rt, "btn");
    assert_eq!(buttons.len(), 2);
    let outcome = rt.dispatch(buttons[1], "click", Value::Null);
    assert_eq!(outcome.handled, 1);
    assert_eq!(*calls.borrow(), vec![("btn".to_string(), host, buttons[1])]);

    let other = with_class(&rt, "other")[0];
    assert_eq!(rt.dispatch(other, "click", Value::Null).handled, 0);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_match_walks_up_from_target() {
    let mut rt = runtime("<x-list></x-list>");
    let calls: Calls = Rc::default();
    rt.register(
        compiled(r#"<x-list><div class="row"><span><b>deep</b></span></div></x-list>"#)
            .on(".row", "click", record(&calls, "row")),
        NodeId::ROOT,
    )
    .unwrap();

    let b = find_all(&rt, "b")[0];
    let row = with_class(&rt, "row")[0];
    rt.dispatch(b, "click", Value::Null);
    assert_eq!(calls.borrow()[0].2, row);
}

#[test]
fn test_other_event_types_ignored() {
    let mut rt = runtime("<x-menu></x-menu>");
    let calls: Calls = Rc::default();
    rt.register(
        compiled(MENU)
            .with_default("items", Value::from(json!([{"kind": "btn", "name": "a"}])))
            .on(".btn", "click", record(&calls, "btn")),
        NodeId::ROOT,
    )
    .unwrap();

    let button = with_class(&rt, "btn")[0];
    assert_eq!(rt.dispatch(button, "keydown", Value::Null).handled, 0);
    assert!(calls.borrow().is_empty());
}

// ============================================================================
// HOST-SCOPED BINDINGS
// ============================================================================

#[test]
fn test_host_bindings_match_the_host() {
    let mut rt = runtime("<x-card></x-card>");
    let calls: Calls = Rc::default();
    rt.register(
        compiled("<x-card><p>body</p></x-card>")
            .on(":host", "focus", record(&calls, "pseudo"))
            .on("x-card", "focus", record(&calls, "tag")),
        NodeId::ROOT,
    )
    .unwrap();

    let host = find_all(&rt, "x-card")[0];
    let p = find_all(&rt, "p")[0];
    let outcome = rt.dispatch(p, "focus", Value::Null);

    assert_eq!(outcome.handled, 2);
    assert_eq!(
        *calls.borrow(),
        vec![("pseudo".to_string(), host, host), ("tag".to_string(), host, host)]
    );
}

// ============================================================================
// NESTED COMPONENTS
// ============================================================================

fn nested(calls: &Calls) -> Runtime {
    let mut rt = runtime("<x-outer></x-outer>");
    rt.register(
        compiled("<x-inner><button>go</button></x-inner>").on("button", "click", record(calls, "inner")),
        NodeId::ROOT,
    )
    .unwrap();
    rt.register(
        compiled("<x-outer><section><x-inner></x-inner></section></x-outer>")
            .on("x-inner", "click", record(calls, "outer"))
            .on("button", "click", record(calls, "outer-button")),
        NodeId::ROOT,
    )
    .unwrap();
    rt
}

#[test]
fn test_nested_events_resolve_to_owning_host() {
    let calls: Calls = Rc::default();
    let mut rt = nested(&calls);
    let outer = find_all(&rt, "x-outer")[0];
    let inner = find_all(&rt, "x-inner")[0];
    let button = find_all(&rt, "button")[0];

    let outcome = rt.dispatch(button, "click", Value::Null);
    assert_eq!(outcome.handled, 2);
    assert_eq!(
        *calls.borrow(),
        vec![("inner".to_string(), inner, button), ("outer".to_string(), outer, inner)]
    );
    assert_eq!(rt.host_of(button), Some(inner));
}

#[test]
fn test_stop_propagation() {
    let calls: Calls = Rc::default();
    let mut rt = runtime("<x-outer></x-outer>");
    rt.register(
        compiled("<x-inner><button>go</button></x-inner>").on("button", "click", |_, event| {
            event.stop_propagation();
            Ok(())
        }),
        NodeId::ROOT,
    )
    .unwrap();
    rt.register(
        compiled("<x-outer><x-inner></x-inner></x-outer>").on("x-inner", "click", record(&calls, "outer")),
        NodeId::ROOT,
    )
    .unwrap();

    let button = find_all(&rt, "button")[0];
    assert_eq!(rt.dispatch(button, "click", Value::Null).handled, 1);
    assert!(calls.borrow().is_empty());
}

// ============================================================================
// OUTCOMES AND FAILURES
// ============================================================================

#[test]
fn test_prevent_default_and_detail() {
    let mut rt = runtime("<x-form></x-form>");
    let seen = Rc::new(RefCell::new(Value::Null));
    let slot = Rc::clone(&seen);
    rt.register(
        compiled("<x-form><form></form></x-form>").on("form", "submit", move |_, event| {
            *slot.borrow_mut() = event.detail().clone();
            event.prevent_default();
            Ok(())
        }),
        NodeId::ROOT,
    )
    .unwrap();

    let form = find_all(&rt, "form")[0];
    let outcome = rt.dispatch(form, "submit", Value::from("payload"));
    assert!(outcome.default_prevented);
    assert_eq!(*seen.borrow(), Value::from("payload"));
}

#[test]
fn test_handler_failure_is_reported() {
    let sink = CollectingSink::new();
    let mut rt = runtime("<x-bad></x-bad>").with_diagnostics(Rc::new(sink.clone()));
    rt.register(
        compiled("<x-bad><a>x</a></x-bad>").on("a", "click", |_, _| anyhow::bail!("handler exploded")),
        NodeId::ROOT,
    )
    .unwrap();

    let a = find_all(&rt, "a")[0];
    let outcome = rt.dispatch(a, "click", Value::Null);
    assert_eq!(outcome.handled, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.entries()[0].phase, Phase::Event);
    assert_eq!(sink.entries()[0].tag, "x-bad");
}

#[test]
fn test_handler_can_update_props() {
    let mut rt = runtime("<x-counter></x-counter>");
    rt.register(
        compiled("<x-counter><button>{{count}}</button></x-counter>")
            .with_default("count", 0)
            .on("button", "click", |rt, event| {
                let host = event.host();
                let count = rt
                    .instance(host)
                    .and_then(|instance| instance.prop("count"))
                    .and_then(Value::as_f64)
                    .unwrap_or_default();
                rt.set_prop(host, "count", count + 1.0)?;
                Ok(())
            }),
        NodeId::ROOT,
    )
    .unwrap();

    for _ in 0..3 {
        let button = find_all(&rt, "button")[0];
        rt.dispatch(button, "click", Value::Null);
    }
    let button = find_all(&rt, "button")[0];
    assert_eq!(fos_dom::serialize::text_content(rt.document(), button), "3");
}

#[test]
fn test_listeners_removed_on_unmount() {
    let mut rt = runtime("<x-menu></x-menu>");
    let calls: Calls = Rc::default();
    rt.register(
        compiled(MENU)
            .with_default("items", Value::from(json!([{"kind": "btn", "name": "a"}])))
            .on(".btn", "click", record(&calls, "btn"))
            .on(":host", "click", record(&calls, "host")),
        NodeId::ROOT,
    )
    .unwrap();
    let host = find_all(&rt, "x-menu")[0];
    let button = with_class(&rt, "btn")[0];

    rt.unmount(host).unwrap();
    assert_eq!(rt.dispatch(button, "click", Value::Null).handled, 0);
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_bindings_follow_replaced_content_root() {
    let mut rt = runtime(r#"<x-swap><section class="fos-prerendered"><i class="hit">old</i></section></x-swap>"#);
    let calls: Calls = Rc::default();
    rt.register(
        compiled(r#"<x-swap><i class="hit">{{label}}</i></x-swap>"#)
            .with_default("label", "old")
            .on(".hit", "click", record(&calls, "hit")),
        NodeId::ROOT,
    )
    .unwrap();
    let host = find_all(&rt, "x-swap")[0];
    let adopted = rt.instance(host).unwrap().content_root();
    assert_eq!(rt.document().tag_name(adopted), Some("section"));

    rt.dispatch(with_class(&rt, "hit")[0], "click", Value::Null);
    rt.set_prop(host, "label", "new").unwrap();
    let fresh = rt.instance(host).unwrap().content_root();
    assert_eq!(rt.document().tag_name(fresh), Some("div"));

    rt.dispatch(with_class(&rt, "hit")[0], "click", Value::Null);
    assert_eq!(calls.borrow().len(), 2);
    assert!(rt.document().event_listeners(adopted, "click").is_empty());
}
