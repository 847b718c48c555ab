//! Reconciler
//!
//! [`create`] builds a VNode tree from a declarative [`Node`]; [`update`] folds
//! a new declarative node into an existing VNode, reusing it in place whenever
//! the shape matches.
//!
//! # Shape Matching
//!
//! - Empty reuses an Empty.
//! - Text (plain, raw or signal-bound) reuses any Text, mutating its value.
//! - An element reuses an element with the same tag and key.
//! - A component reuses a component with the same [`ComponentId`] and key and
//!   re-runs its render function inside the component's subscriber scope.
//! - A fragment reuses a fragment with the same key.
//!
//! Any other combination creates the new subtree from scratch and tears the
//! old one down. Nothing is morphed across shapes.
//!
//! # Children
//!
//! Children are matched by [`track`]: positionally, unless the new child has a
//! key, in which case the previous child at the same index is tried first and
//! then any unconsumed previous child with that key. Previous children left
//! unmatched are torn down.
//!
//! On the client target the reconciler also records what the differ needs to
//! patch the live tree: which node replaced which, which children were dropped
//! and which were moved.
//!
//! [`ComponentId`]: crate::vdom::ComponentId

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::RenderContext;
use super::island::{end_comment, start_comment, Island};
use crate::error::{RenderError, Result};
use crate::options::Target;
use crate::reactive::{untracked, Cleanup, SubscriberScope, TrackedFuture};
use crate::vdom::{
    Attributes, BoxFuture, ComponentData, ComponentMode, ComponentNode, ElementData, ElementNode,
    EventRef, Key, Node, NodeRefCell, Props, RenderFn, SignalRef, SlotNode, VNode, VNodeKind,
    VNodeType, WeakVNode, INNER_HTML,
};

/// Build a new VNode tree from `node`.
///
/// Component render functions run here. A component that may suspend fails
/// with [`InvalidAsyncRender`](crate::RenderError::InvalidAsyncRender); use
/// [`create_async`] for the first server render of such trees.
pub fn create(cx: &RenderContext, node: Node) -> Result<VNode> {
    let _depth = cx.descend()?;
    match node {
        Node::Empty | Node::Bool(_) => Ok(VNode::empty()),
        Node::Text(value) => Ok(VNode::text(value, false)),
        Node::Raw(value) => Ok(VNode::text(value, true)),
        Node::Dynamic(source) => {
            let vnode = VNode::text(String::new(), false);
            bind_text(cx, &vnode, source);
            Ok(vnode)
        }
        Node::Element(el) => create_element(cx, el),
        Node::Component(node) if is_island(cx, &node) => create_island(cx, node),
        Node::Component(node) => create_component(cx, node, None),
        Node::Fragment(fragment) => {
            let children = create_children(cx, fragment.children)?;
            Ok(VNode::fragment(children, fragment.key))
        }
        Node::Template(template) => {
            let children = create_children(cx, template.into_children())?;
            Ok(VNode::fragment(children, None))
        }
        Node::Slot(slot) => {
            let _slot = cx.enter_slot();
            let children = create_children(cx, slot_children(cx, slot))?;
            Ok(VNode::fragment(children, None))
        }
    }
}

/// Fold `node` into `prev`.
///
/// Returns `prev` itself when it could be reused, otherwise a newly created
/// VNode. With `cleanup_root` a replaced `prev` is torn down here; without it
/// the caller is responsible for tearing it down.
pub fn update(cx: &RenderContext, node: Node, prev: &VNode, cleanup_root: bool) -> Result<VNode> {
    let depth = cx.descend()?;
    let node = match patch(cx, node, prev)? {
        Patch::Reused => return Ok(prev.clone()),
        Patch::Mismatch(node) => node,
    };
    drop(depth);

    let next = create(cx, node)?;
    if cleanup_root {
        prev.teardown();
    }
    if cx.is_client() {
        if prev.is_mounted() {
            next.set_replaces(prev.clone());
        } else if let Some(old) = prev.take_pending().replaces {
            // `prev` never reached the platform; the node it replaced did.
            next.set_replaces(old);
        }
    }
    Ok(next)
}

/// Build a VNode tree, awaiting components that may suspend.
///
/// Children are created depth-first, left to right, each awaited before the
/// next sibling starts.
pub fn create_async<'a>(cx: &'a RenderContext, node: Node) -> BoxFuture<'a, Result<VNode>> {
    Box::pin(async move {
        let _depth = cx.descend()?;
        match node {
            Node::Element(el) if !el.attrs.contains_key(INNER_HTML) => {
                let ElementNode {
                    tag,
                    attrs,
                    events,
                    children,
                    key,
                    node_ref,
                } = el;
                let children = create_children_async(cx, children).await?;
                Ok(VNode::element(
                    element_data(tag, attrs, events, children, node_ref),
                    key,
                ))
            }
            Node::Fragment(fragment) => {
                let children = create_children_async(cx, fragment.children).await?;
                Ok(VNode::fragment(children, fragment.key))
            }
            Node::Template(template) => {
                let children = create_children_async(cx, template.into_children()).await?;
                Ok(VNode::fragment(children, None))
            }
            Node::Slot(slot) => {
                let _slot = cx.enter_slot();
                let children = slot_children(cx, slot);
                let children = create_children_async(cx, children).await?;
                Ok(VNode::fragment(children, None))
            }
            Node::Component(mut node) if is_island(cx, &node) => {
                let key = node.key.clone();
                let (marker, slot) = prepare_island(cx, &mut node);
                let component = {
                    let _inside = cx.enter_island();
                    create_component_async(cx, node, Some((marker.clone(), slot))).await?
                };
                Ok(wrap_island(&marker, component, key))
            }
            Node::Component(node) => create_component_async(cx, node, None).await,
            other => create(cx, other),
        }
    })
}

// ----------------------------------------------------------------------------
// Creation
// ----------------------------------------------------------------------------

fn create_children(cx: &RenderContext, children: Vec<Node>) -> Result<Vec<VNode>> {
    children.into_iter().map(|child| create(cx, child)).collect()
}

async fn create_children_async(cx: &RenderContext, children: Vec<Node>) -> Result<Vec<VNode>> {
    let mut created = Vec::with_capacity(children.len());
    for child in children {
        created.push(create_async(cx, child).await?);
    }
    Ok(created)
}

fn element_data(
    tag: String,
    attrs: Attributes,
    events: SmallVec<[EventRef; 2]>,
    children: Vec<VNode>,
    node_ref: Option<NodeRefCell>,
) -> ElementData {
    ElementData {
        tag,
        attrs,
        events,
        children,
        node_ref,
        live: None,
        applied_attrs: IndexMap::new(),
        applied_events: SmallVec::new(),
        applied_html: None,
    }
}

fn create_element(cx: &RenderContext, el: ElementNode) -> Result<VNode> {
    let ElementNode {
        tag,
        attrs,
        events,
        children,
        key,
        node_ref,
    } = el;
    // Raw inner markup replaces the children entirely.
    let children = if attrs.contains_key(INNER_HTML) {
        Vec::new()
    } else {
        create_children(cx, children)?
    };
    Ok(VNode::element(
        element_data(tag, attrs, events, children, node_ref),
        key,
    ))
}

type IslandIds = (String, Option<String>);

fn new_component_vnode(cx: &RenderContext, node: ComponentNode, island: Option<IslandIds>) -> VNode {
    let ComponentNode {
        component,
        props,
        key,
    } = node;
    let (island_marker, island_slot) = match island {
        Some((marker, slot)) => (Some(marker), slot),
        None => (None, None),
    };
    let vnode = VNode::new_component(
        ComponentData {
            component,
            props,
            ast: None,
            mode: ComponentMode::NotCreated,
            on_mount: SmallVec::new(),
            on_unmount: SmallVec::new(),
            scope: None,
            slots: Vec::new(),
            slot_cursor: 0,
            rendering: false,
            rerender_requested: false,
            island_marker,
            island_slot,
        },
        key,
    );

    let weak = vnode.downgrade();
    let owner = cx.clone();
    let scope = SubscriberScope::with_registrar(
        move |_| rerender_from_signal(&owner, &weak),
        register_on(vnode.downgrade()),
    );
    if let VNodeKind::Component(c) = &mut vnode.lock().kind {
        c.scope = Some(scope);
    }
    vnode
}

fn finish_first_render(vnode: &VNode, ast: VNode) {
    if let VNodeKind::Component(c) = &mut vnode.lock().kind {
        c.ast = Some(ast);
        c.mode = ComponentMode::Created;
    }
}

fn create_component(cx: &RenderContext, node: ComponentNode, island: Option<IslandIds>) -> Result<VNode> {
    let vnode = new_component_vnode(cx, node, island);
    match render_component(cx, &vnode).and_then(|rendered| create(cx, rendered)) {
        Ok(ast) => {
            finish_first_render(&vnode, ast);
            Ok(vnode)
        }
        Err(err) => {
            vnode.teardown();
            Err(err)
        }
    }
}

async fn create_component_async(
    cx: &RenderContext,
    node: ComponentNode,
    island: Option<IslandIds>,
) -> Result<VNode> {
    let vnode = new_component_vnode(cx, node, island);
    let created = async {
        let rendered = render_component_async(cx, &vnode).await?;
        create_async(cx, rendered).await
    }
    .await;

    match created {
        Ok(ast) => {
            finish_first_render(&vnode, ast);
            Ok(vnode)
        }
        Err(err) => {
            vnode.teardown();
            Err(err)
        }
    }
}

type ComponentParts = (RenderFn, Props, Option<Arc<SubscriberScope>>, String);

fn component_parts(vnode: &VNode) -> Option<ComponentParts> {
    let data = vnode.lock();
    match &data.kind {
        VNodeKind::Component(c) => Some((
            c.component.render_fn().clone(),
            c.props.clone(),
            c.scope.clone(),
            c.component.name().to_string(),
        )),
        _ => None,
    }
}

/// Renders a component may trigger from inside its own render function
/// before it is considered runaway.
const MAX_RENDER_PASSES: usize = 100;

/// Invoke a component's render function inside its scope.
///
/// A render that writes a signal it depends on runs again once it returns,
/// until it settles.
fn render_component(cx: &RenderContext, vnode: &VNode) -> Result<Node> {
    let Some((render, props, scope, name)) = component_parts(vnode) else {
        return Ok(Node::Empty);
    };
    let RenderFn::Sync(render) = render else {
        return Err(RenderError::InvalidAsyncRender { component: name });
    };

    for _ in 0..MAX_RENDER_PASSES {
        let rendered = {
            let _guard = cx.enter_component(vnode);
            match &scope {
                Some(scope) => scope.run_tracked(|| render(cx, &props)),
                None => render(cx, &props),
            }
        }?;
        if !take_rerender_request(vnode) {
            return Ok(rendered);
        }
        tracing::debug!(component = %name, "signal changed during render; rendering again");
    }
    Err(runaway(&name))
}

async fn render_component_async(cx: &RenderContext, vnode: &VNode) -> Result<Node> {
    let Some((render, props, scope, name)) = component_parts(vnode) else {
        return Ok(Node::Empty);
    };

    for _ in 0..MAX_RENDER_PASSES {
        let rendered = {
            let _guard = cx.enter_component(vnode);
            match &render {
                RenderFn::Sync(render) => match &scope {
                    Some(scope) => scope.run_tracked(|| render(cx, &props)),
                    None => render(cx, &props),
                },
                RenderFn::Async(render) => {
                    TrackedFuture::new(scope.clone(), render(cx.clone(), props.clone())).await
                }
            }
        }?;
        if !take_rerender_request(vnode) {
            return Ok(rendered);
        }
        tracing::debug!(component = %name, "signal changed during render; rendering again");
    }
    Err(runaway(&name))
}

fn take_rerender_request(vnode: &VNode) -> bool {
    match &mut vnode.lock().kind {
        VNodeKind::Component(c) => std::mem::take(&mut c.rerender_requested),
        _ => false,
    }
}

fn runaway(name: &str) -> RenderError {
    RenderError::component(format!(
        "{name} still changed its own signals after {MAX_RENDER_PASSES} renders"
    ))
}

/// Registrar that files new subscriptions under `target`'s cleanups.
fn register_on(target: WeakVNode) -> impl Fn(Cleanup) + Send + Sync + 'static {
    move |cleanup| match target.upgrade() {
        Some(vnode) => vnode.add_cleanup(cleanup),
        None => {
            cleanup.run();
        }
    }
}

// ----------------------------------------------------------------------------
// Text bindings
// ----------------------------------------------------------------------------

fn bind_text(cx: &RenderContext, vnode: &VNode, source: SignalRef) {
    let weak = vnode.downgrade();
    let owner = cx.clone();
    let reader = source.clone();
    let scope = SubscriberScope::with_registrar(
        move |scope| refresh_binding(&owner, &weak, &reader, scope),
        register_on(vnode.downgrade()),
    );
    let value = scope.run_tracked(|| source.read());

    if let VNodeKind::Text(text) = &mut vnode.lock().kind {
        text.value = value;
        text.skip_escaping = false;
        text.source = Some(source.0.source_id());
        text.binding = Some(scope);
    }
}

fn refresh_binding(cx: &RenderContext, weak: &WeakVNode, source: &SignalRef, scope: &Arc<SubscriberScope>) {
    let Some(vnode) = weak.upgrade() else {
        return;
    };
    if vnode.is_disposed() {
        return;
    }
    let value = scope.run_tracked(|| source.read());
    if let VNodeKind::Text(text) = &mut vnode.lock().kind {
        text.value = value;
    }
    cx.commit(&vnode, None);
}

fn set_text(prev: &VNode, value: String, skip_escaping: bool) {
    let binding = match &mut prev.lock().kind {
        VNodeKind::Text(text) => {
            text.value = value;
            text.skip_escaping = skip_escaping;
            text.source = None;
            text.binding.take()
        }
        _ => None,
    };
    if let Some(binding) = binding {
        binding.dispose();
    }
}

fn rebind_text(cx: &RenderContext, prev: &VNode, source: SignalRef) {
    let source_id = source.0.source_id();
    let same_source = match &prev.lock().kind {
        VNodeKind::Text(text) => text.binding.is_some() && text.source == Some(source_id),
        _ => false,
    };

    if same_source {
        let value = untracked(|| source.read());
        if let VNodeKind::Text(text) = &mut prev.lock().kind {
            text.value = value;
        }
        return;
    }

    let old = match &mut prev.lock().kind {
        VNodeKind::Text(text) => {
            text.source = None;
            text.binding.take()
        }
        _ => None,
    };
    if let Some(old) = old {
        old.dispose();
    }
    bind_text(cx, prev, source);
}

// ----------------------------------------------------------------------------
// Islands
// ----------------------------------------------------------------------------

fn server_markers(cx: &RenderContext) -> bool {
    cx.options().target == Target::Server && cx.options().islands
}

fn is_island(cx: &RenderContext, node: &ComponentNode) -> bool {
    node.component.island().is_some() && cx.wraps_islands()
}

fn slot_children(cx: &RenderContext, slot: SlotNode) -> Vec<Node> {
    if !server_markers(cx) {
        return slot.children;
    }
    let mut children = Vec::with_capacity(slot.children.len() + 2);
    children.push(Node::raw(start_comment(&slot.id)));
    children.extend(slot.children);
    children.push(Node::raw(end_comment(&slot.id)));
    children
}

/// Move the island's children into a marked slot.
fn fill_slot(node: &mut ComponentNode, slot_id: String) -> Option<String> {
    if node.props.children.is_empty() {
        return None;
    }
    let children = std::mem::take(&mut node.props.children);
    node.props.children = vec![Node::Slot(SlotNode {
        id: slot_id.clone(),
        children,
    })];
    Some(slot_id)
}

fn record_island(cx: &RenderContext, marker: &str, node: &ComponentNode, slot: Option<String>) {
    cx.record_island(Island {
        marker: marker.to_string(),
        source_path: node.component.island().unwrap_or_default().to_string(),
        props: node.props.values.clone(),
        slot,
    });
}

fn prepare_island(cx: &RenderContext, node: &mut ComponentNode) -> IslandIds {
    let (marker, slot_id) = cx.next_island_ids();
    let slot = fill_slot(node, slot_id);
    record_island(cx, &marker, node, slot.clone());
    (marker, slot)
}

fn wrap_island(marker: &str, component: VNode, key: Option<Key>) -> VNode {
    VNode::fragment(
        vec![
            VNode::text(start_comment(marker), true),
            component,
            VNode::text(end_comment(marker), true),
        ],
        key,
    )
}

fn create_island(cx: &RenderContext, mut node: ComponentNode) -> Result<VNode> {
    let key = node.key.clone();
    let (marker, slot) = prepare_island(cx, &mut node);
    let component = {
        let _inside = cx.enter_island();
        create_component(cx, node, Some((marker.clone(), slot)))?
    };
    Ok(wrap_island(&marker, component, key))
}

/// The island component inside a previously wrapped island.
fn wrapped_island(prev: &VNode, node: &ComponentNode) -> Option<VNode> {
    let children = match &prev.lock().kind {
        VNodeKind::Fragment { children } if children.len() == 3 => children.clone(),
        _ => return None,
    };
    let inner = children.into_iter().nth(1)?;
    let matches = {
        let data = inner.lock();
        match &data.kind {
            VNodeKind::Component(c) => {
                c.component == node.component && data.key == node.key && c.island_marker.is_some()
            }
            _ => false,
        }
    };
    matches.then_some(inner)
}

fn update_island(cx: &RenderContext, mut node: ComponentNode, prev: &VNode) -> Result<Patch> {
    let Some(inner) = wrapped_island(prev, &node) else {
        return Ok(Patch::Mismatch(Node::Component(node)));
    };
    let (marker, slot_id) = match &inner.lock().kind {
        VNodeKind::Component(c) => (c.island_marker.clone(), c.island_slot.clone()),
        _ => (None, None),
    };
    let Some(marker) = marker else {
        return Ok(Patch::Mismatch(Node::Component(node)));
    };
    let slot = match slot_id {
        Some(slot_id) => fill_slot(&mut node, slot_id),
        // Children appeared where there was no slot: start over.
        None if !node.props.children.is_empty() => {
            return Ok(Patch::Mismatch(Node::Component(node)));
        }
        None => None,
    };

    record_island(cx, &marker, &node, slot);
    let _inside = cx.enter_island();
    update_component(cx, &inner, node)?;
    Ok(Patch::Reused)
}

// ----------------------------------------------------------------------------
// Update
// ----------------------------------------------------------------------------

enum Patch {
    Reused,
    Mismatch(Node),
}

fn patch(cx: &RenderContext, node: Node, prev: &VNode) -> Result<Patch> {
    let prev_type = prev.node_type();
    let prev_key = prev.key();

    match node {
        Node::Empty | Node::Bool(_) if prev_type == VNodeType::Empty => Ok(Patch::Reused),
        Node::Text(value) if prev_type == VNodeType::Text => {
            set_text(prev, value, false);
            Ok(Patch::Reused)
        }
        Node::Raw(value) if prev_type == VNodeType::Text => {
            set_text(prev, value, true);
            Ok(Patch::Reused)
        }
        Node::Dynamic(source) if prev_type == VNodeType::Text => {
            rebind_text(cx, prev, source);
            Ok(Patch::Reused)
        }
        Node::Element(el)
            if prev_type == VNodeType::Element
                && prev_key == el.key
                && prev.tag().as_deref() == Some(el.tag.as_str()) =>
        {
            update_element(cx, el, prev)?;
            Ok(Patch::Reused)
        }
        Node::Component(node) if is_island(cx, &node) => update_island(cx, node, prev),
        Node::Component(node)
            if prev_type == VNodeType::Component
                && prev_key == node.key
                && prev.component().is_some_and(|c| c == node.component) =>
        {
            update_component(cx, prev, node)?;
            Ok(Patch::Reused)
        }
        Node::Fragment(fragment) if prev_type == VNodeType::Fragment && prev_key == fragment.key => {
            update_fragment(cx, prev, fragment.children)?;
            Ok(Patch::Reused)
        }
        Node::Template(template) => patch(cx, Node::from(template.into_children()), prev),
        Node::Slot(slot) if prev_type == VNodeType::Fragment && prev_key.is_none() => {
            let _slot = cx.enter_slot();
            let children = slot_children(cx, slot);
            update_fragment(cx, prev, children)?;
            Ok(Patch::Reused)
        }
        other => Ok(Patch::Mismatch(other)),
    }
}

fn update_element(cx: &RenderContext, el: ElementNode, prev: &VNode) -> Result<()> {
    let ElementNode {
        attrs,
        events,
        children,
        node_ref,
        ..
    } = el;
    let raw = attrs.contains_key(INNER_HTML);

    let previous = match &mut prev.lock().kind {
        VNodeKind::Element(e) => {
            e.attrs = attrs;
            e.events = events;
            e.node_ref = node_ref;
            e.children.clone()
        }
        _ => return Ok(()),
    };

    let next = if raw {
        for child in previous {
            retire(cx, prev, child);
        }
        Vec::new()
    } else {
        track(cx, prev, children, previous)?
    };

    if let VNodeKind::Element(e) = &mut prev.lock().kind {
        e.children = next;
    }
    Ok(())
}

fn update_fragment(cx: &RenderContext, prev: &VNode, children: Vec<Node>) -> Result<()> {
    let previous = prev.children();
    let next = track(cx, prev, children, previous)?;
    if let VNodeKind::Fragment { children } = &mut prev.lock().kind {
        *children = next;
    }
    Ok(())
}

fn update_component(cx: &RenderContext, prev: &VNode, node: ComponentNode) -> Result<()> {
    if let VNodeKind::Component(c) = &mut prev.lock().kind {
        c.props = node.props;
    }
    rerender(cx, prev)
}

/// Re-run a component and fold the result into its AST.
fn rerender(cx: &RenderContext, vnode: &VNode) -> Result<()> {
    let rendered = render_component(cx, vnode)?;
    let old_ast = vnode.ast();
    let new_ast = match &old_ast {
        Some(old) => update(cx, rendered, old, false)?,
        None => create(cx, rendered)?,
    };
    if let Some(old) = &old_ast {
        if !old.ptr_eq(&new_ast) {
            old.teardown();
        }
    }

    if let VNodeKind::Component(c) = &mut vnode.lock().kind {
        c.ast = Some(new_ast);
    }
    Ok(())
}

/// Update callback of a component's subscriber scope.
fn rerender_from_signal(cx: &RenderContext, weak: &WeakVNode) {
    let Some(vnode) = weak.upgrade() else {
        return;
    };
    let name = {
        let mut data = vnode.lock();
        if data.disposed {
            return;
        }
        let VNodeKind::Component(c) = &mut data.kind else {
            return;
        };
        if c.rendering {
            c.rerender_requested = true;
            tracing::debug!(
                component = c.component.name(),
                "signal changed during its own render; render queued"
            );
            return;
        }
        if c.mode == ComponentMode::NotCreated {
            return;
        }
        c.component.name().to_string()
    };

    let anchor = vnode.first_live();
    tracing::debug!(component = %name, "re-render");
    match untracked(|| rerender(cx, &vnode)) {
        Ok(()) => cx.commit(&vnode, anchor),
        Err(err) => tracing::error!(component = %name, error = %err, "re-render failed"),
    }
}

/// Match `nodes` against `previous` children of `parent`.
pub(crate) fn track(
    cx: &RenderContext,
    parent: &VNode,
    nodes: Vec<Node>,
    previous: Vec<VNode>,
) -> Result<Vec<VNode>> {
    let keyed: HashMap<Key, usize> = previous
        .iter()
        .enumerate()
        .filter_map(|(index, child)| child.key().map(|key| (key, index)))
        .collect();
    let mut pool: Vec<Option<(VNode, Option<Key>)>> = previous
        .into_iter()
        .map(|child| {
            let key = child.key();
            Some((child, key))
        })
        .collect();

    let mut result = Vec::with_capacity(nodes.len());
    let mut last_matched = 0;
    for (index, node) in nodes.into_iter().enumerate() {
        let matched = match node.key() {
            None => match pool.get(index) {
                Some(Some((_, None))) => Some(index),
                _ => None,
            },
            Some(key) => match pool.get(index) {
                Some(Some((_, Some(prev_key)))) if prev_key == key => Some(index),
                _ => keyed
                    .get(key)
                    .copied()
                    .filter(|&i| pool.get(i).is_some_and(Option::is_some)),
            },
        };

        let child = match matched.and_then(|i| pool[i].take().map(|(prev, _)| (i, prev))) {
            Some((i, prev)) => {
                let moved = i < last_matched;
                last_matched = last_matched.max(i);
                let child = update(cx, node, &prev, true)?;
                child.set_moved(moved);
                child
            }
            None => create(cx, node)?,
        };
        result.push(child);
    }

    for (leftover, _) in pool.into_iter().flatten() {
        retire(cx, parent, leftover);
    }
    Ok(result)
}

/// Tear a dropped child down and hand its live nodes to the differ.
fn retire(cx: &RenderContext, parent: &VNode, child: VNode) {
    child.teardown();
    if !cx.is_client() {
        return;
    }
    if child.is_mounted() {
        parent.push_removed(child);
    } else if let Some(old) = child.take_pending().replaces {
        parent.push_removed(old);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RenderOptions;
    use crate::reactive::WritableSignal;
    use crate::vdom::{el, fragment, Component, ComponentRegistry};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn server() -> RenderContext {
        RenderContext::server(ComponentRegistry::new())
    }

    fn list(keys: &[i32]) -> Node {
        el("ul")
            .children(keys.iter().map(|k| el("li").key(*k).text(k.to_string())))
            .into()
    }

    #[test]
    fn text_is_updated_in_place() {
        let cx = server();
        let prev = create(&cx, "a".into()).unwrap();
        let next = update(&cx, "b".into(), &prev, true).unwrap();

        assert!(next.ptr_eq(&prev));
        assert_eq!(next.text_value().as_deref(), Some("b"));
    }

    #[test]
    fn keyed_children_keep_identity() {
        let cx = server();
        let root = create(&cx, list(&[1, 2, 3])).unwrap();
        let before = root.children();

        let after = update(&cx, list(&[1, 2, 3]), &root, true).unwrap();
        assert!(after.ptr_eq(&root));
        for (a, b) in before.iter().zip(root.children()) {
            assert!(a.ptr_eq(&b));
        }
    }

    #[test]
    fn keyed_append_and_prepend() {
        let cx = server();
        let root = create(&cx, list(&[1, 2, 3, 4, 5])).unwrap();
        let before = root.children();

        update(&cx, list(&[1, 2, 3, 4, 5, 6]), &root, true).unwrap();
        let appended = root.children();
        for i in 0..5 {
            assert!(appended[i].ptr_eq(&before[i]));
        }
        assert!(!before.iter().any(|b| b.ptr_eq(&appended[5])));

        update(&cx, list(&[6, 1, 2, 3, 4, 5]), &root, true).unwrap();
        let prepended = root.children();
        assert!(!before.iter().any(|b| b.ptr_eq(&prepended[0])));
        for i in 0..5 {
            assert!(prepended[i + 1].ptr_eq(&before[i]));
        }
    }

    #[test]
    fn keyed_move_is_matched_and_leftovers_are_torn_down() {
        let cx = server();
        let root = create(&cx, list(&[1, 2, 3])).unwrap();
        let before = root.children();

        update(&cx, list(&[3, 1]), &root, true).unwrap();
        let after = root.children();
        assert!(after[0].ptr_eq(&before[2]));
        assert!(after[1].ptr_eq(&before[0]));
        assert!(before[1].is_disposed());
        assert!(!before[0].is_disposed());
    }

    #[test]
    fn tag_change_replaces_and_tears_down() {
        let cx = server();
        let prev = create(&cx, el("div").into()).unwrap();
        let next = update(&cx, el("span").into(), &prev, true).unwrap();

        assert!(!next.ptr_eq(&prev));
        assert!(prev.is_disposed());
        assert_eq!(next.tag().as_deref(), Some("span"));
    }

    #[test]
    fn key_change_replaces_element() {
        let cx = server();
        let prev = create(&cx, el("div").key("a").into()).unwrap();
        let next = update(&cx, el("div").key("b").into(), &prev, true).unwrap();
        assert!(!next.ptr_eq(&prev));
    }

    #[test]
    fn fragments_are_reused() {
        let cx = server();
        let prev = create(&cx, fragment(["a", "b"])).unwrap();
        let first = prev.children()[0].clone();

        let next = update(&cx, fragment(["c", "d"]), &prev, true).unwrap();
        assert!(next.ptr_eq(&prev));
        assert!(next.children()[0].ptr_eq(&first));
        assert_eq!(first.text_value().as_deref(), Some("c"));
    }

    #[test]
    fn component_reruns_in_place() {
        let cx = server();
        let renders = Arc::new(AtomicI32::new(0));
        let counter = renders.clone();
        let greeting = Component::new("Greeting", move |_, props| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(el("p").text(format!("Hello, {}", props.str("name"))).into())
        });

        let prev = create(&cx, greeting.node().prop("name", "Ada").into()).unwrap();
        assert_eq!(prev.component_mode(), Some(ComponentMode::Created));
        let ast = prev.ast().unwrap();

        let next = update(&cx, greeting.node().prop("name", "Grace").into(), &prev, true).unwrap();
        assert!(next.ptr_eq(&prev));
        assert!(next.ast().unwrap().ptr_eq(&ast));
        assert_eq!(
            ast.children()[0].text_value().as_deref(),
            Some("Hello, Grace")
        );
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn different_component_identity_replaces() {
        let cx = server();
        let a = Component::new("A", |_, _| Ok("a".into()));
        let b = Component::new("A", |_, _| Ok("a".into()));

        let prev = create(&cx, a.node().into()).unwrap();
        let next = update(&cx, b.node().into(), &prev, true).unwrap();
        assert!(!next.ptr_eq(&prev));
        assert!(prev.is_disposed());
    }

    #[test]
    fn state_survives_rerender_and_signal_rerenders() {
        let cx = server();
        let setter_out = Arc::new(parking_lot::Mutex::new(None));
        let slot = setter_out.clone();
        let counter = Component::new("Counter", move |cx, _| {
            let (count, set) = cx.state(0)?;
            *slot.lock() = Some(set);
            Ok(el("span").text(count.to_string()).into())
        });

        let vnode = create(&cx, counter.node().into()).unwrap();
        let text = || vnode.ast().unwrap().children()[0].text_value().unwrap();
        assert_eq!(text(), "0");

        let set = setter_out.lock().clone().unwrap();
        set.set(4);
        assert_eq!(text(), "4");

        update(&cx, counter.node().into(), &vnode, true).unwrap();
        assert_eq!(text(), "4");
    }

    #[test]
    fn signal_text_binding_updates_without_rerender() {
        let cx = server();
        let renders = Arc::new(AtomicI32::new(0));
        let counter = renders.clone();
        let count = WritableSignal::new(1);
        let bound = count.clone();
        let view = Component::new("View", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(el("b").child(bound.clone()).into())
        });

        let vnode = create(&cx, view.node().into()).unwrap();
        let text = vnode.ast().unwrap().children()[0].clone();
        assert_eq!(text.text_value().as_deref(), Some("1"));

        count.set(2);
        assert_eq!(text.text_value().as_deref(), Some("2"));
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        vnode.dispose();
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn lifecycle_hooks_only_accepted_on_first_render() {
        let cx = server();
        let registered = Arc::new(AtomicI32::new(0));
        let seen = registered.clone();
        let component = Component::new("Hooks", move |cx, _| {
            cx.on_cleanup({
                let seen = seen.clone();
                move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })?;
            Ok(Node::Empty)
        });

        let vnode = create(&cx, component.node().into()).unwrap();
        update(&cx, component.node().into(), &vnode, true).unwrap();
        update(&cx, component.node().into(), &vnode, true).unwrap();
        vnode.dispose();

        assert_eq!(registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_outside_render_fail() {
        let cx = server();
        assert!(matches!(
            cx.signal(1),
            Err(RenderError::MissingScope { hook: "signal" })
        ));
    }

    #[test]
    fn sync_path_rejects_async_components() {
        let cx = server();
        let slow = Component::new_async("Slow", |_, _| async { Ok(Node::Empty) });
        let err = create(&cx, el("div").child(slow.node()).into()).unwrap_err();
        assert!(
            matches!(err, RenderError::InvalidAsyncRender { ref component } if component == "Slow")
        );
    }

    #[test]
    fn render_errors_propagate() {
        let cx = server();
        let failing = Component::new("Failing", |_, _| Err(RenderError::component("boom")));
        let err = create(&cx, failing.node().into()).unwrap_err();
        assert_eq!(err.to_string(), "component error: boom");
    }

    #[test]
    fn depth_limit_is_enforced() {
        let cx = RenderContext::new(RenderOptions::server().with_max_depth(3), ComponentRegistry::new());
        let deep: Node = el("a").child(el("b").child(el("c").child(el("d")))).into();
        assert!(matches!(create(&cx, deep), Err(RenderError::DepthExceeded(3))));
    }

    #[test]
    fn islands_are_wrapped_once() {
        let registry = ComponentRegistry::new();
        let inner = registry.register_island("islands/inner.rs", |_, _| Ok("inner".into()));
        let inner_node = inner.node();
        let outer = registry.register_island("islands/outer.rs", move |_, _| {
            Ok(el("div").child(inner_node.clone()).into())
        });
        let cx = RenderContext::server(registry);

        let root = create(&cx, outer.node().prop("n", 1).into()).unwrap();
        let children = root.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].text_value().as_deref(), Some("<!-- start_island_0 -->"));
        assert_eq!(children[1].island_marker().as_deref(), Some("island_0"));
        assert_eq!(children[2].text_value().as_deref(), Some("<!-- end_island_0 -->"));

        // The nested island is part of the outer one and is not wrapped.
        let islands = cx.take_islands();
        assert_eq!(islands.len(), 1);
        assert_eq!(islands.get("island_0").unwrap().source_path, "islands/outer.rs");
    }

    #[test]
    fn client_target_records_replacements_of_mounted_nodes() {
        let cx = RenderContext::client(ComponentRegistry::new());
        let root = create(&cx, fragment([el("div")])).unwrap();
        let old = root.children()[0].clone();
        old.lock().mounted = true;
        root.lock().mounted = true;

        update(&cx, fragment([el("span")]), &root, true).unwrap();
        let new = root.children()[0].clone();
        let pending = new.take_pending();
        assert!(pending.replaces.is_some_and(|r| r.ptr_eq(&old)));
    }
}
