//! Island Round Trip
//!
//! Server-render a page with an island whose children slot holds a second
//! island, then hydrate the markup on an in-memory document.

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::dom::Document;
use tessera_core::hydrate::{find_manifest, hydrate_islands};
use tessera_core::patch::{ChangeAction, ChangeKind};
use tessera_core::render::{render_to_string, RenderContext};
use tessera_core::vdom::{el, ComponentRegistry, PropValue};

fn registry() -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    registry.register_island("islands/card.rs", |_, props| {
        Ok(el("section")
            .attr("title", props.str("title"))
            .children(props.children.clone())
            .into())
    });
    registry.register_island("islands/counter.rs", |cx, props| {
        let start = props.get("start").and_then(PropValue::as_i64).unwrap_or_default();
        let count = cx.signal(start)?;
        let shown = count.get();
        Ok(el("button")
            .on("click", move |_| {
                count.update(|n| n + 1);
            })
            .text(shown.to_string())
            .into())
    });
    registry
}

#[test]
fn nested_island_round_trip() {
    let registry = registry();
    let card = registry.island("islands/card.rs").unwrap();
    let counter = registry.island("islands/counter.rs").unwrap();

    let page = el("main").child(
        card.node()
            .prop("title", "Clicks")
            .child(counter.node().prop("start", 5)),
    );
    let output = render_to_string(&RenderContext::server(registry.clone()), page.into()).unwrap();

    assert_eq!(
        output.html,
        concat!(
            "<main>",
            "<!-- start_island_0 -->",
            r#"<section title="Clicks">"#,
            "<!-- start_children_0 -->",
            "<!-- start_island_1 --><button>5</button><!-- end_island_1 -->",
            "<!-- end_children_0 -->",
            "</section>",
            "<!-- end_island_0 -->",
            "</main>",
        )
    );
    assert_eq!(output.islands.len(), 2);
    assert_eq!(output.islands.get("island_0").unwrap().slot.as_deref(), Some("children_0"));
    assert_eq!(
        output.islands.get("island_1").unwrap().props.get("start"),
        Some(&PropValue::Int(5))
    );

    // Client: load the full document, manifest included.
    let doc = Document::from_html(&output.document().unwrap()).unwrap();
    let manifest = find_manifest(&doc, doc.root()).unwrap();
    assert_eq!(manifest, output.islands);

    let section = doc.elements_by_tag("section")[0];
    let button = doc.elements_by_tag("button")[0];
    let root = doc.root();
    let doc = Arc::new(Mutex::new(doc));

    let hydrated = hydrate_islands(&doc, &RenderContext::client(registry), root, &manifest).unwrap();
    assert_eq!(hydrated.len(), 1);
    assert_eq!(hydrated[0].source_path, "islands/card.rs");
    assert_eq!(hydrated[0].nested, vec!["island_1".to_string()]);

    // Linked, not created.
    let report = hydrated[0].mount.last_report();
    assert_eq!(report.count_of(ChangeKind::Element, ChangeAction::Create), 0);
    assert_eq!(report.count_of(ChangeKind::Element, ChangeAction::Link), 2);
    assert!(report.contains(ChangeKind::Event, ChangeAction::Create));

    {
        let live = doc.lock();
        assert_eq!(live.elements_by_tag("section"), vec![section]);
        assert_eq!(live.elements_by_tag("button"), vec![button]);
        assert_eq!(live.attribute(section, "title").as_deref(), Some("Clicks"));
        assert!(live.to_html().starts_with(
            r#"<main><section title="Clicks"><button>5</button></section></main><script"#
        ));
    }

    // The nested island is live.
    assert_eq!(hydrated[0].mount.dispatch_event(button, "click", PropValue::Null), 1);
    let live = doc.lock();
    assert_eq!(live.text_content(button), "6");
    assert_eq!(live.elements_by_tag("button"), vec![button]);
}

#[test]
fn truncated_markup_fails_before_hydrating() {
    let registry = registry();
    let counter = registry.island("islands/counter.rs").unwrap();
    let output = render_to_string(
        &RenderContext::server(registry.clone()),
        el("div").child(counter.node().prop("start", 1)).into(),
    )
    .unwrap();

    let cut = output.html.replace("<!-- end_island_0 -->", "");
    let doc = Arc::new(Mutex::new(Document::from_html(&cut).unwrap()));
    let root = doc.lock().root();
    let before = doc.lock().to_html();

    let err = hydrate_islands(&doc, &RenderContext::client(registry), root, &output.islands).unwrap_err();
    assert!(err.to_string().contains("island_0"));
    assert_eq!(doc.lock().to_html(), before);
}
