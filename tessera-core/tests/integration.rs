//! Integration Tests for Reconciliation and Reactivity
//!
//! These tests drive the public API end to end: declarative nodes in, VNode
//! identities, change sets and live DOM out.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::dom::Document;
use tessera_core::patch::{ChangeAction, ChangeKind, Mount};
use tessera_core::reactive::{computed, signal, Effect};
use tessera_core::render::{create, update, RenderContext};
use tessera_core::vdom::{el, Component, ComponentRegistry, Node, VNode};

fn keyed(keys: &[i32]) -> Node {
    el("ul")
        .children(keys.iter().map(|k| el("li").key(*k).text(k.to_string())))
        .into()
}

fn client() -> (Mount<Document>, tessera_core::vdom::NodeRef, Arc<Mutex<Document>>) {
    let doc = Arc::new(Mutex::new(Document::new()));
    let root = doc.lock().root();
    let mount = Mount::new(doc.clone(), RenderContext::client(ComponentRegistry::new()));
    (mount, root, doc)
}

fn same(a: &[VNode], b: &[VNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ptr_eq(b))
}

/// Same keys in the same order: every position keeps its VNode.
#[test]
fn keyed_update_preserves_identity() {
    let cx = RenderContext::server(ComponentRegistry::new());
    let list = create(&cx, keyed(&[1, 2, 3, 4, 5])).unwrap();
    let before = list.children();

    let next = update(&cx, keyed(&[1, 2, 3, 4, 5]), &list, true).unwrap();
    assert!(next.ptr_eq(&list));
    assert!(same(&before, &next.children()));
}

/// Appending reuses positions 0-4 and allocates position 5.
#[test]
fn keyed_append() {
    let cx = RenderContext::server(ComponentRegistry::new());
    let list = create(&cx, keyed(&[1, 2, 3, 4, 5])).unwrap();
    let before = list.children();

    let after = update(&cx, keyed(&[1, 2, 3, 4, 5, 6]), &list, true)
        .unwrap()
        .children();
    assert!(same(&before, &after[..5]));
    assert!(before.iter().all(|old| !old.ptr_eq(&after[5])));
}

/// Prepending allocates position 0 and shifts the rest by one.
#[test]
fn keyed_prepend() {
    let cx = RenderContext::server(ComponentRegistry::new());
    let list = create(&cx, keyed(&[1, 2, 3, 4, 5])).unwrap();
    let before = list.children();

    let after = update(&cx, keyed(&[6, 1, 2, 3, 4, 5]), &list, true)
        .unwrap()
        .children();
    assert!(before.iter().all(|old| !old.ptr_eq(&after[0])));
    assert!(same(&before, &after[1..]));
}

/// Structurally identical input produces no change sets at all.
#[test]
fn noop_update_emits_no_change_sets() {
    let (mount, root, doc) = client();
    let page = || -> Node {
        el("main")
            .attr("class", "page")
            .child(el("h1").text("Title"))
            .child(keyed(&[1, 2, 3]))
            .into()
    };

    mount.render(page(), root).unwrap();
    let vnodes = {
        let mut all = Vec::new();
        mount.root().unwrap().walk(&mut |v| all.push(v.clone()));
        all
    };
    let html = doc.lock().to_html();

    let report = mount.update(page()).unwrap();
    assert!(report.is_empty(), "unexpected changes: {:?}", report.applied);
    assert_eq!(doc.lock().to_html(), html);

    let mut again = Vec::new();
    mount.root().unwrap().walk(&mut |v| again.push(v.clone()));
    assert!(same(&vnodes, &again));
}

/// A keyed reorder moves live nodes instead of recreating them.
#[test]
fn keyed_reorder_moves_live_nodes() {
    let (mount, root, doc) = client();
    mount.render(keyed(&[1, 2, 3]), root).unwrap();
    let items = doc.lock().elements_by_tag("li");

    let report = mount.update(keyed(&[3, 1, 2])).unwrap();
    assert_eq!(report.count_of(ChangeKind::Element, ChangeAction::Create), 0);
    assert_eq!(doc.lock().to_html(), "<ul><li>3</li><li>1</li><li>2</li></ul>");

    let moved = doc.lock().elements_by_tag("li");
    assert_eq!(moved, vec![items[2], items[0], items[1]]);
}

/// `a.set(1)` is a no-op; `a.set(2)` reaches an effect reading `a` and
/// `b = a * 2` exactly once.
#[test]
fn diamond_notifies_once() {
    let a = signal(1);
    let b = {
        let a = a.clone();
        computed(move || a.get() * 2)
    };
    let seen = Arc::new(Mutex::new(Vec::new()));

    let effect = {
        let (a, b, seen) = (a.clone(), b.clone(), seen.clone());
        Effect::new(move || seen.lock().push((a.get(), b.get())))
    };
    assert_eq!(effect.run_count(), 1);

    assert!(!a.set(1));
    assert_eq!(effect.run_count(), 1);

    assert!(a.set(2));
    assert_eq!(effect.run_count(), 2);
    assert_eq!(*seen.lock(), vec![(1, 2), (2, 4)]);
}

/// Teardown through a parent and a direct call runs every cleanup once.
#[test]
fn cleanups_run_exactly_once() {
    let first = signal(1);
    let second = signal("a".to_string());
    let cleanups = Arc::new(AtomicI32::new(0));

    let widget = {
        let (first, second, cleanups) = (first.clone(), second.clone(), cleanups.clone());
        Component::new("Widget", move |cx, _| {
            let count = cleanups.clone();
            cx.on_cleanup(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })?;
            // One subscription for the render, one for the text binding.
            Ok(el("p")
                .text(first.get().to_string())
                .child(second.clone())
                .into())
        })
    };

    let (mount, root, doc) = client();
    mount
        .render(el("div").child(widget.node()).into(), root)
        .unwrap();
    assert_eq!(doc.lock().to_html(), "<div><p>1a</p></div>");
    assert_eq!(first.subscriber_count(), 1);
    assert_eq!(second.subscriber_count(), 1);

    let component = mount.root().unwrap().children()[0].clone();
    mount.update(el("div").into()).unwrap();
    component.dispose();
    mount.unmount().unwrap();

    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(first.subscriber_count(), 0);
    assert_eq!(second.subscriber_count(), 0);
    assert!(component.is_disposed());
    assert_eq!(doc.lock().to_html(), "");
}

/// A signal read by a component re-renders it and patches the DOM.
#[test]
fn signal_change_reaches_the_dom() {
    let label = signal("draft".to_string());
    let status = {
        let label = label.clone();
        Component::new("Status", move |_, _| {
            Ok(el("span").attr("data-state", label.get()).text(label.get()).into())
        })
    };

    let (mount, root, doc) = client();
    mount.render(status.node().into(), root).unwrap();
    let span = doc.lock().elements_by_tag("span")[0];

    label.set("published".to_string());
    assert_eq!(
        doc.lock().to_html(),
        r#"<span data-state="published">published</span>"#
    );
    assert_eq!(doc.lock().elements_by_tag("span")[0], span);
    assert!(mount.last_report().contains(ChangeKind::Attribute, ChangeAction::Update));
}

/// An effect that writes the signal it is being notified for does not
/// interleave: every subscriber sees 2 before anyone sees 3.
#[test]
fn writes_during_notification_run_in_a_later_pass() {
    let a = signal(1);
    let log = Arc::new(Mutex::new(Vec::new()));

    let _first = {
        let (a, log) = (a.clone(), log.clone());
        Effect::new(move || {
            let value = a.get();
            log.lock().push(format!("first:{value}"));
            if value == 2 {
                a.set(3);
            }
        })
    };
    let _second = {
        let (a, log) = (a.clone(), log.clone());
        Effect::new(move || {
            let value = a.get();
            log.lock().push(format!("second:{value}"));
        })
    };
    log.lock().clear();

    assert!(a.set(2));
    assert_eq!(*log.lock(), ["first:2", "second:2", "first:3", "second:3"]);
    assert_eq!(a.get(), 3);
}

/// A component that writes a signal it reads while rendering renders again
/// with the written value, on first render and on re-render.
#[test]
fn render_writing_its_own_signal_settles() {
    let level = signal(5);
    let gauge = {
        let level = level.clone();
        Component::new("Gauge", move |_, _| {
            let value = level.get();
            if value == 5 {
                level.set(4);
            }
            Ok(el("b").text(value.to_string()).into())
        })
    };

    let (mount, root, doc) = client();
    mount.render(gauge.node().into(), root).unwrap();
    assert_eq!(level.get(), 4);
    assert_eq!(doc.lock().to_html(), "<b>4</b>");

    level.set(5);
    assert_eq!(level.get(), 4);
    assert_eq!(doc.lock().to_html(), "<b>4</b>");
}

/// `on_unmount` runs while the component's nodes are still attached.
#[test]
fn unmount_hooks_run_before_detach() {
    let (mount, root, doc) = client();
    let buttons_seen = Arc::new(Mutex::new(None));

    let toolbar = {
        let (doc, buttons_seen) = (doc.clone(), buttons_seen.clone());
        Component::new("Toolbar", move |cx, _| {
            let (doc, buttons_seen) = (doc.clone(), buttons_seen.clone());
            cx.on_unmount(move || {
                *buttons_seen.lock() = Some(doc.lock().elements_by_tag("button").len());
            })?;
            Ok(el("button").text("save").into())
        })
    };

    mount
        .render(el("div").child(toolbar.node()).into(), root)
        .unwrap();
    mount.update(el("div").into()).unwrap();

    assert_eq!(*buttons_seen.lock(), Some(1));
    assert_eq!(doc.lock().to_html(), "<div></div>");
    assert!(mount.last_report().contains(ChangeKind::Component, ChangeAction::Unmount));
}
