//! Island Hydration Walker
//!
//! Finds `start_<marker>`/`end_<marker>` comment pairs in server markup that
//! is already live on a platform, rebuilds each island's component node from
//! the [`IslandManifest`] and hydrates it against exactly the nodes between
//! its markers. Every island gets its own [`Mount`], so islands re-render
//! independently.
//!
//! # Phases
//!
//! 1. Scan (platform locked): collect boundaries and rebuild component nodes.
//!    Islands inside an island are opaque, except for those in its children
//!    slot, which are converted back into declarative children.
//! 2. Hydrate (platform unlocked): each island mounts through the differ's
//!    hydrate path, linking the live nodes instead of creating new ones.
//! 3. Clean up (platform locked): remove the boundary and slot comments.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RenderError, Result};
use crate::patch::{AttachmentRef, LiveKind, Mount, Platform};
use crate::render::{IslandManifest, RenderContext, MANIFEST_SCRIPT_ID};
use crate::vdom::{el, ComponentNode, Node, NodeRef, Props};

/// An island that was found and hydrated.
pub struct HydratedIsland<P: Platform + Send + 'static> {
    pub marker: String,
    pub source_path: String,
    /// Markers of islands rebuilt inside this island's children slot.
    pub nested: Vec<String>,
    pub mount: Mount<P>,
}

impl<P: Platform + Send + 'static> std::fmt::Debug for HydratedIsland<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydratedIsland")
            .field("marker", &self.marker)
            .field("source_path", &self.source_path)
            .field("nested", &self.nested)
            .finish()
    }
}

/// A top-level island boundary and the node rebuilt for it.
struct Boundary {
    marker: String,
    source_path: String,
    start: NodeRef,
    nodes: Vec<NodeRef>,
    node: ComponentNode,
    nested: Vec<String>,
}

/// Hydrate every island found under `root`.
///
/// `cx` supplies the options and registry; each island renders in a fork of
/// it. Fails on orphan markers, markers missing from `manifest` and source
/// paths missing from the registry, before any island is hydrated.
#[tracing::instrument(skip_all, fields(islands = manifest.len()))]
pub fn hydrate_islands<P>(
    platform: &Arc<Mutex<P>>,
    cx: &RenderContext,
    root: NodeRef,
    manifest: &IslandManifest,
) -> Result<Vec<HydratedIsland<P>>>
where
    P: Platform + Send + 'static,
{
    let mut markers = Vec::new();
    let boundaries = {
        let live = platform.lock();
        let walker = Walker {
            platform: &*live,
            cx,
            manifest,
            prefix: &cx.options().marker_prefix,
        };
        let mut found = Vec::new();
        walker.scan(root, &mut found)?;
        found
            .into_iter()
            .map(|(marker, start, end, nodes)| -> Result<Boundary> {
                let mut nested = Vec::new();
                let (source_path, node) = walker.island(&marker, &nodes, &mut markers, &mut nested)?;
                markers.push(start);
                markers.push(end);
                Ok(Boundary {
                    marker,
                    source_path,
                    start,
                    nodes,
                    node,
                    nested,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut hydrated = Vec::with_capacity(boundaries.len());
    for boundary in boundaries {
        let mount = Mount::new(platform.clone(), cx.fork());
        let report = mount.hydrate(
            Node::Component(boundary.node),
            boundary.nodes,
            AttachmentRef::Sibling(boundary.start),
        )?;
        tracing::debug!(
            marker = %boundary.marker,
            source_path = %boundary.source_path,
            changes = report.count(),
            "island hydrated"
        );
        hydrated.push(HydratedIsland {
            marker: boundary.marker,
            source_path: boundary.source_path,
            nested: boundary.nested,
            mount,
        });
    }

    let mut live = platform.lock();
    for marker in markers {
        live.remove(marker)?;
    }
    Ok(hydrated)
}

/// Read the manifest from the `<script>` tag the server renderer emits.
///
/// Returns an empty manifest when the page has no such tag.
pub fn find_manifest<P: Platform + ?Sized>(platform: &P, root: NodeRef) -> Result<IslandManifest> {
    match find_script(platform, root) {
        Some(script) => IslandManifest::from_json(&text_of(platform, script)),
        None => Ok(IslandManifest::default()),
    }
}

fn find_script<P: Platform + ?Sized>(platform: &P, node: NodeRef) -> Option<NodeRef> {
    platform.children(node).into_iter().find_map(|child| match platform.kind(child) {
        Some(LiveKind::Element { tag, .. }) => {
            let is_manifest = tag.eq_ignore_ascii_case("script")
                && platform
                    .attributes(child)
                    .iter()
                    .any(|(name, value)| name == "id" && value == MANIFEST_SCRIPT_ID);
            if is_manifest {
                Some(child)
            } else {
                find_script(platform, child)
            }
        }
        _ => None,
    })
}

fn text_of<P: Platform + ?Sized>(platform: &P, node: NodeRef) -> String {
    platform
        .children(node)
        .into_iter()
        .filter_map(|child| match platform.kind(child) {
            Some(LiveKind::Text(text)) => Some(text),
            _ => None,
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Scanning
// ----------------------------------------------------------------------------

type Found = (String, NodeRef, NodeRef, Vec<NodeRef>);

struct Walker<'a, P: ?Sized> {
    platform: &'a P,
    cx: &'a RenderContext,
    manifest: &'a IslandManifest,
    prefix: &'a str,
}

/// What a comment node means to the walker.
enum Marker<'t> {
    Start(&'t str),
    End(&'t str),
}

impl<P: Platform + ?Sized> Walker<'_, P> {
    fn comment(&self, node: NodeRef) -> Option<String> {
        match self.platform.kind(node) {
            Some(LiveKind::Comment(text)) => Some(text.trim().to_string()),
            _ => None,
        }
    }

    fn island_marker<'t>(&self, text: &'t str) -> Option<Marker<'t>> {
        let is_island = |marker: &str| {
            marker
                .strip_prefix(self.prefix)
                .is_some_and(|rest| rest.starts_with('_'))
        };
        if let Some(marker) = text.strip_prefix("start_").filter(|m| is_island(*m)) {
            Some(Marker::Start(marker))
        } else {
            text.strip_prefix("end_").filter(|m| is_island(*m)).map(Marker::End)
        }
    }

    /// Index of the `end_<id>` comment among `siblings`, after `from`.
    fn find_end(&self, siblings: &[NodeRef], from: usize, id: &str) -> Result<usize> {
        let end = format!("end_{id}");
        siblings[from..]
            .iter()
            .position(|node| self.comment(*node).as_deref() == Some(end.as_str()))
            .map(|offset| from + offset)
            .ok_or_else(|| RenderError::OrphanIslandMarker {
                marker: id.to_string(),
                reason: "missing end marker",
            })
    }

    /// Collect top-level island boundaries under `parent`.
    fn scan(&self, parent: NodeRef, found: &mut Vec<Found>) -> Result<()> {
        let children = self.platform.children(parent);
        let mut i = 0;
        while i < children.len() {
            let child = children[i];
            if let Some(text) = self.comment(child) {
                match self.island_marker(&text) {
                    Some(Marker::Start(marker)) => {
                        let end = self.find_end(&children, i + 1, marker)?;
                        found.push((
                            marker.to_string(),
                            child,
                            children[end],
                            children[i + 1..end].to_vec(),
                        ));
                        i = end + 1;
                        continue;
                    }
                    Some(Marker::End(marker)) => {
                        return Err(RenderError::OrphanIslandMarker {
                            marker: marker.to_string(),
                            reason: "missing start marker",
                        });
                    }
                    None => {}
                }
            } else if matches!(self.platform.kind(child), Some(LiveKind::Element { .. })) {
                self.scan(child, found)?;
            }
            i += 1;
        }
        Ok(())
    }

    // ---- Rebuilding declarative nodes ----

    /// The component node for the island `marker` whose markup is `nodes`.
    ///
    /// Slot and nested island comments are pushed onto `markers`.
    fn island(
        &self,
        marker: &str,
        nodes: &[NodeRef],
        markers: &mut Vec<NodeRef>,
        nested: &mut Vec<String>,
    ) -> Result<(String, ComponentNode)> {
        let island = self
            .manifest
            .get(marker)
            .ok_or_else(|| RenderError::MissingIslandData(marker.to_string()))?;
        let component = self
            .cx
            .registry()
            .island(&island.source_path)
            .ok_or_else(|| RenderError::UnknownIsland(island.source_path.clone()))?;

        let mut props = Props {
            values: island.props.clone(),
            children: Vec::new(),
        };
        if let Some(slot) = &island.slot {
            props.children = self.slot(slot, nodes, markers, nested)?;
        }
        Ok((island.source_path.clone(), component.with_props(props)))
    }

    /// Children found between the `start_<slot>`/`end_<slot>` comments.
    ///
    /// A component that never rendered its children leaves no slot markers;
    /// that yields no children.
    fn slot(
        &self,
        slot: &str,
        nodes: &[NodeRef],
        markers: &mut Vec<NodeRef>,
        nested: &mut Vec<String>,
    ) -> Result<Vec<Node>> {
        let start = format!("start_{slot}");
        let Some(start_node) = nodes.iter().find_map(|node| self.find_comment(*node, &start)) else {
            return Ok(Vec::new());
        };
        let siblings = match self.platform.parent(start_node) {
            Some(parent) => self.platform.children(parent),
            None => nodes.to_vec(),
        };
        let Some(from) = siblings.iter().position(|node| *node == start_node) else {
            return Ok(Vec::new());
        };
        let end = self.find_end(&siblings, from + 1, slot)?;
        markers.push(start_node);
        markers.push(siblings[end]);
        self.convert(&siblings[from + 1..end], markers, nested)
    }

    /// The comment `text` at or below `node`.
    fn find_comment(&self, node: NodeRef, text: &str) -> Option<NodeRef> {
        if self.comment(node).as_deref() == Some(text) {
            return Some(node);
        }
        self.platform
            .children(node)
            .into_iter()
            .find_map(|child| self.find_comment(child, text))
    }

    /// Convert live nodes back into declarative nodes. Islands among them
    /// become component nodes; other comments are dropped.
    fn convert(&self, nodes: &[NodeRef], markers: &mut Vec<NodeRef>, nested: &mut Vec<String>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut i = 0;
        while i < nodes.len() {
            let node = nodes[i];
            match self.platform.kind(node) {
                Some(LiveKind::Comment(text)) => match self.island_marker(text.trim()) {
                    Some(Marker::Start(marker)) => {
                        let end = self.find_end(nodes, i + 1, marker)?;
                        let (_, component) = self.island(marker, &nodes[i + 1..end], markers, nested)?;
                        markers.push(node);
                        markers.push(nodes[end]);
                        nested.push(marker.to_string());
                        out.push(Node::Component(component));
                        i = end + 1;
                        continue;
                    }
                    Some(Marker::End(marker)) => {
                        return Err(RenderError::OrphanIslandMarker {
                            marker: marker.to_string(),
                            reason: "missing start marker",
                        });
                    }
                    None => {}
                },
                Some(LiveKind::Text(text)) => out.push(Node::text(text)),
                Some(LiveKind::Element { tag, .. }) => {
                    let mut element = el(tag);
                    for (name, value) in self.platform.attributes(node) {
                        element = element.attr(name, value);
                    }
                    let children = self.convert(&self.platform.children(node), markers, nested)?;
                    out.push(element.children(children).into());
                }
                None => {}
            }
            i += 1;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::render::{render_to_string, Island};
    use crate::vdom::{ComponentRegistry, PropValue};

    fn counter(registry: &ComponentRegistry) {
        registry.register_island("islands/counter.rs", |cx, props| {
            let start = props.get("start").and_then(PropValue::as_i64).unwrap_or_default();
            let count = cx.signal(start)?;
            let shown = count.get();
            let button = el("button")
                .on("click", move |_| {
                    count.update(|n| n + 1);
                })
                .text(shown.to_string());
            Ok(button.into())
        });
    }

    fn load(html: &str) -> Arc<Mutex<Document>> {
        Arc::new(Mutex::new(Document::from_html(html).unwrap()))
    }

    #[test]
    fn hydrates_a_server_rendered_island() {
        let registry = ComponentRegistry::new();
        counter(&registry);
        let island = registry.island("islands/counter.rs").unwrap();

        let output = render_to_string(
            &RenderContext::server(registry.clone()),
            el("main").child(island.node().prop("start", 3)).into(),
        )
        .unwrap();

        let doc = load(&output.html);
        let button = doc.lock().elements_by_tag("button")[0];
        let root = doc.lock().root();
        let hydrated =
            hydrate_islands(&doc, &RenderContext::client(registry), root, &output.islands).unwrap();

        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].marker, "island_0");
        assert_eq!(hydrated[0].source_path, "islands/counter.rs");
        assert_eq!(doc.lock().to_html(), "<main><button>3</button></main>");
        assert_eq!(doc.lock().elements_by_tag("button")[0], button);

        hydrated[0].mount.dispatch_event(button, "click", PropValue::Null);
        assert_eq!(doc.lock().to_html(), "<main><button>4</button></main>");
    }

    #[test]
    fn manifest_is_read_from_the_page() {
        let registry = ComponentRegistry::new();
        counter(&registry);
        let island = registry.island("islands/counter.rs").unwrap();
        let output =
            render_to_string(&RenderContext::server(registry), island.node().prop("start", 1).into()).unwrap();

        let doc = Document::from_html(&output.document().unwrap()).unwrap();
        assert_eq!(find_manifest(&doc, doc.root()).unwrap(), output.islands);

        let empty = Document::new();
        assert!(find_manifest(&empty, empty.root()).unwrap().is_empty());
    }

    #[test]
    fn missing_end_marker_is_an_orphan() {
        let registry = ComponentRegistry::new();
        counter(&registry);
        let doc = load("<main><!-- start_island_0 --><button>3</button></main>");
        let root = doc.lock().root();

        let err = hydrate_islands(&doc, &RenderContext::client(registry), root, &IslandManifest::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::OrphanIslandMarker { ref marker, reason: "missing end marker" } if marker == "island_0"
        ));
    }

    #[test]
    fn stray_end_marker_is_an_orphan() {
        let doc = load("<button>3</button><!-- end_island_4 -->");
        let root = doc.lock().root();
        let err = hydrate_islands(
            &doc,
            &RenderContext::client(ComponentRegistry::new()),
            root,
            &IslandManifest::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::OrphanIslandMarker { reason: "missing start marker", .. }));
        // Nothing was touched.
        assert_eq!(doc.lock().comments().len(), 1);
    }

    #[test]
    fn unknown_islands_and_missing_data() {
        let doc = load("<!-- start_island_0 --><button>3</button><!-- end_island_0 -->");
        let root = doc.lock().root();
        let cx = RenderContext::client(ComponentRegistry::new());

        let err = hydrate_islands(&doc, &cx, root, &IslandManifest::new()).unwrap_err();
        assert!(matches!(err, RenderError::MissingIslandData(ref m) if m == "island_0"));

        let mut manifest = IslandManifest::new();
        manifest.insert(Island {
            marker: "island_0".into(),
            source_path: "islands/gone.rs".into(),
            props: Default::default(),
            slot: None,
        });
        let err = hydrate_islands(&doc, &cx, root, &manifest).unwrap_err();
        assert!(matches!(err, RenderError::UnknownIsland(ref p) if p == "islands/gone.rs"));
    }

    #[test]
    fn other_comments_are_left_alone() {
        let doc = load("<!-- keep --><p>static</p>");
        let root = doc.lock().root();
        let hydrated = hydrate_islands(
            &doc,
            &RenderContext::client(ComponentRegistry::new()),
            root,
            &IslandManifest::new(),
        )
        .unwrap();
        assert!(hydrated.is_empty());
        assert_eq!(doc.lock().to_html(), "<!-- keep --><p>static</p>");
    }
}
