//! Differ
//!
//! Walks a reconciled VNode tree and emits the change sets that bring the live
//! tree in line with it. The differ only reads the platform; every mutation is
//! expressed as a [`ChangeSet`] for the dispatcher.
//!
//! # Paths
//!
//! Each VNode is visited on one of four paths:
//!
//! - **create**: the VNode has no live node yet. Elements and text are
//!   created and attached at the cursor, then attributes, listeners and
//!   children follow.
//! - **update**: the VNode is mounted. Attributes are diffed against the
//!   values last applied, listener lists are swapped wholesale when they
//!   differ, text is patched, and children dropped by the reconciler are
//!   deleted. Unchanged subtrees emit nothing.
//! - **replace**: the reconciler put a new VNode where a mounted one was. A
//!   single live root is swapped in place; anything else is created at the
//!   cursor and the old subtree removed.
//! - **hydrate**: live nodes exist (server markup) but no VNode owns them.
//!   Matching nodes are linked instead of created; only a tag mismatch
//!   replaces a live node.
//!
//! Removal collects `on_unmount` hooks, clears node refs, detaches the
//! topmost live nodes and tears the VNodes down. The hooks are handed out
//! through [`Differ::take_unmount_hooks`] so they can run before the detach
//! is applied.

use std::collections::VecDeque;

use indexmap::IndexMap;

use super::attachment::AttachmentRef;
use super::change_set::{ChangeAction, ChangeKind, ChangeSet};
use super::platform::{element_child_namespace, element_namespace, LiveKind, Platform};
use crate::reactive::Cleanup;
use crate::vdom::{Attributes, EventRef, NodeRef, VNode, VNodeKind, VNodeType, INNER_HTML};

/// Emits change sets for one commit.
pub struct Differ<'p, P: Platform + ?Sized> {
    platform: &'p P,
    changes: Vec<ChangeSet>,
    unmount_hooks: Vec<Cleanup>,
}

impl<'p, P: Platform + ?Sized> Differ<'p, P> {
    pub fn new(platform: &'p P) -> Self {
        Self {
            platform,
            changes: Vec::new(),
            unmount_hooks: Vec::new(),
        }
    }

    pub fn changes(&self) -> &[ChangeSet] {
        &self.changes
    }

    /// `on_unmount` hooks of the components removed so far, in removal order.
    pub fn take_unmount_hooks(&mut self) -> Vec<Cleanup> {
        std::mem::take(&mut self.unmount_hooks)
    }

    pub fn finish(self) -> Vec<ChangeSet> {
        self.changes
    }

    fn push(&mut self, change: ChangeSet) {
        self.changes.push(change);
    }

    /// Diff `vnode` against the live tree, placing new nodes at `at`.
    ///
    /// `namespace` is the namespace new elements inherit from their parent.
    pub fn visit(&mut self, vnode: &VNode, at: &mut AttachmentRef, namespace: Option<&'static str>) {
        let pending = vnode.take_pending();
        if let Some(old) = pending.replaces {
            self.replace(vnode, &old, at, namespace, pending.moved);
            return;
        }

        if vnode.is_mounted() {
            for removed in &pending.removed {
                self.remove(removed, true);
            }
            if pending.moved {
                self.reattach(vnode, *at);
            }
            self.update(vnode, at, namespace);
        } else {
            for removed in &pending.removed {
                self.remove(removed, true);
            }
            self.create(vnode, at, namespace);
        }
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    fn create(&mut self, vnode: &VNode, at: &mut AttachmentRef, namespace: Option<&'static str>) {
        match vnode.node_type() {
            VNodeType::Empty | VNodeType::Text | VNodeType::Element => {
                if let Some(node) = self.build(vnode, namespace, Some(*at)) {
                    at.advance(node);
                }
            }
            VNodeType::Component => {
                if let Some(ast) = vnode.ast() {
                    self.visit(&ast, at, namespace);
                }
                self.mount_component(vnode);
            }
            VNodeType::Fragment => {
                for child in vnode.children() {
                    self.visit(&child, at, namespace);
                }
                vnode.lock().mounted = true;
            }
        }
    }

    /// Create the live node of an element, text or empty VNode.
    ///
    /// With `attach` the node is attached right after creation; otherwise the
    /// caller places it.
    fn build(
        &mut self,
        vnode: &VNode,
        namespace: Option<&'static str>,
        attach: Option<AttachmentRef>,
    ) -> Option<NodeRef> {
        let node = NodeRef::new();
        let nested = {
            let mut guard = vnode.lock();
            let data = &mut *guard;
            data.mounted = true;
            match &mut data.kind {
                VNodeKind::Empty { live } => {
                    *live = Some(node);
                    self.push(ChangeSet::create_text(node, ""));
                    if let Some(at) = attach {
                        self.push(ChangeSet::attach(ChangeKind::Text, node, at));
                    }
                    None
                }
                VNodeKind::Text(text) => {
                    text.live = Some(node);
                    text.applied = Some(text.value.clone());
                    self.push(ChangeSet::create_text(node, &text.value));
                    if let Some(at) = attach {
                        self.push(ChangeSet::attach(ChangeKind::Text, node, at));
                    }
                    None
                }
                VNodeKind::Element(el) => {
                    el.live = Some(node);
                    let own = element_namespace(&el.tag, namespace);
                    self.push(ChangeSet::create_element(node, &el.tag, own));
                    if let Some(at) = attach {
                        self.push(ChangeSet::attach(ChangeKind::Element, node, at));
                    }
                    if let Some(cell) = &el.node_ref {
                        self.push(ChangeSet::node_ref(ChangeAction::Mount, cell.clone(), Some(node)));
                    }

                    let desired = desired_attributes(&el.attrs);
                    for (name, value) in &desired {
                        self.push(ChangeSet::set_attribute(ChangeAction::Create, node, name, value));
                    }
                    el.applied_attrs = desired;

                    el.applied_html = desired_html(&el.attrs);
                    if let Some(html) = &el.applied_html {
                        self.push(ChangeSet::inner_html(node, html));
                    }

                    for event in &el.events {
                        self.push(ChangeSet::add_listener(node, event.clone()));
                    }
                    el.applied_events = el.events.clone();

                    Some((el.children.clone(), element_child_namespace(&el.tag, own)))
                }
                VNodeKind::Component(_) | VNodeKind::Fragment { .. } => {
                    data.mounted = false;
                    return None;
                }
            }
        };

        if let Some((children, child_namespace)) = nested {
            let mut cursor = AttachmentRef::Parent(node);
            for child in children {
                self.visit(&child, &mut cursor, child_namespace);
            }
        }
        Some(node)
    }

    fn mount_component(&mut self, vnode: &VNode) {
        let hooks = {
            let mut data = vnode.lock();
            data.mounted = true;
            match &mut data.kind {
                VNodeKind::Component(c) => std::mem::take(&mut c.on_mount).into_vec(),
                _ => Vec::new(),
            }
        };
        self.push(ChangeSet::lifecycle(ChangeAction::Mount, hooks));
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Move a mounted subtree's live roots to the cursor.
    fn reattach(&mut self, vnode: &VNode, at: AttachmentRef) {
        let mut cursor = at;
        for root in vnode.live_roots() {
            let kind = match self.platform.kind(root) {
                Some(LiveKind::Element { .. }) => ChangeKind::Element,
                _ => ChangeKind::Text,
            };
            self.push(ChangeSet::attach(kind, root, cursor));
            cursor.advance(root);
        }
    }

    fn update(&mut self, vnode: &VNode, at: &mut AttachmentRef, namespace: Option<&'static str>) {
        match vnode.node_type() {
            VNodeType::Empty => {
                if let Some(live) = vnode.live() {
                    at.advance(live);
                }
            }
            VNodeType::Text => {
                let live = {
                    let mut data = vnode.lock();
                    let VNodeKind::Text(text) = &mut data.kind else {
                        return;
                    };
                    if let Some(live) = text.live {
                        if text.applied.as_deref() != Some(text.value.as_str()) {
                            self.push(ChangeSet::set_text(live, &text.value));
                            text.applied = Some(text.value.clone());
                        }
                    }
                    text.live
                };
                if let Some(live) = live {
                    at.advance(live);
                }
            }
            VNodeType::Element => self.update_element(vnode, at, namespace),
            VNodeType::Component => {
                if let Some(ast) = vnode.ast() {
                    self.visit(&ast, at, namespace);
                }
            }
            VNodeType::Fragment => {
                for child in vnode.children() {
                    self.visit(&child, at, namespace);
                }
            }
        }
    }

    fn update_element(&mut self, vnode: &VNode, at: &mut AttachmentRef, namespace: Option<&'static str>) {
        let (live, children, child_namespace) = {
            let mut data = vnode.lock();
            let VNodeKind::Element(el) = &mut data.kind else {
                return;
            };
            let Some(live) = el.live else {
                return;
            };

            let desired = desired_attributes(&el.attrs);
            for name in el.applied_attrs.keys() {
                if !desired.contains_key(name) {
                    self.push(ChangeSet::remove_attribute(live, name));
                }
            }
            for (name, value) in &desired {
                match el.applied_attrs.get(name) {
                    None => self.push(ChangeSet::set_attribute(ChangeAction::Create, live, name, value)),
                    Some(old) if old != value => {
                        self.push(ChangeSet::set_attribute(ChangeAction::Update, live, name, value))
                    }
                    Some(_) => {}
                }
            }
            el.applied_attrs = desired;

            let html = desired_html(&el.attrs);
            if html != el.applied_html {
                self.push(ChangeSet::inner_html(live, html.as_deref().unwrap_or_default()));
                el.applied_html = html;
            }

            if !same_listeners(&el.applied_events, &el.events) {
                for event in &el.applied_events {
                    self.push(ChangeSet::remove_listener(live, event.clone()));
                }
                for event in &el.events {
                    self.push(ChangeSet::add_listener(live, event.clone()));
                }
                el.applied_events = el.events.clone();
            }

            if let Some(cell) = &el.node_ref {
                if cell.get() != Some(live) {
                    self.push(ChangeSet::node_ref(ChangeAction::Mount, cell.clone(), Some(live)));
                }
            }

            let own = element_namespace(&el.tag, namespace);
            (live, el.children.clone(), element_child_namespace(&el.tag, own))
        };

        let mut cursor = AttachmentRef::Parent(live);
        for child in children {
            self.visit(&child, &mut cursor, child_namespace);
        }
        at.advance(live);
    }

    // ------------------------------------------------------------------------
    // Replace / Remove
    // ------------------------------------------------------------------------

    fn replace(
        &mut self,
        vnode: &VNode,
        old: &VNode,
        at: &mut AttachmentRef,
        namespace: Option<&'static str>,
        moved: bool,
    ) {
        let old_roots = old.live_roots();
        let kind = match vnode.node_type() {
            VNodeType::Element => Some(ChangeKind::Element),
            VNodeType::Text | VNodeType::Empty => Some(ChangeKind::Text),
            VNodeType::Component | VNodeType::Fragment => None,
        };

        match (kind, old_roots.as_slice()) {
            (Some(kind), [old_root]) if !moved => {
                if let Some(node) = self.build(vnode, namespace, None) {
                    self.push(ChangeSet::replace(kind, *old_root, node));
                    at.advance(node);
                }
                self.remove(old, false);
            }
            _ => {
                self.create(vnode, at, namespace);
                self.remove(old, true);
            }
        }
    }

    /// Remove `vnode`'s subtree. With `detach` its topmost live nodes are
    /// deleted; below that only hooks and node refs are handled.
    pub fn remove(&mut self, vnode: &VNode, detach: bool) {
        let pending = vnode.take_pending();
        for removed in &pending.removed {
            self.remove(removed, detach);
        }
        if let Some(old) = &pending.replaces {
            // Never reached the platform; the node it replaced still did.
            self.remove(old, detach);
        }

        let nested = {
            let mut data = vnode.lock();
            let mounted = std::mem::replace(&mut data.mounted, false);
            match &mut data.kind {
                VNodeKind::Empty { live } => {
                    if let (true, Some(live)) = (detach, live.take()) {
                        self.push(ChangeSet::delete(ChangeKind::Text, live));
                    }
                    Vec::new()
                }
                VNodeKind::Text(text) => {
                    if let (true, Some(live)) = (detach, text.live.take()) {
                        self.push(ChangeSet::delete(ChangeKind::Text, live));
                    }
                    Vec::new()
                }
                VNodeKind::Element(el) => {
                    if let Some(cell) = &el.node_ref {
                        if el.live.is_some() {
                            self.push(ChangeSet::node_ref(ChangeAction::Unmount, cell.clone(), None));
                        }
                    }
                    if let (true, Some(live)) = (detach, el.live.take()) {
                        self.push(ChangeSet::delete(ChangeKind::Element, live));
                    }
                    el.children.iter().map(|child| (child.clone(), false)).collect()
                }
                VNodeKind::Component(c) => {
                    let hooks = std::mem::take(&mut c.on_unmount);
                    if mounted {
                        self.unmount_hooks.extend(hooks);
                        self.push(ChangeSet::lifecycle(ChangeAction::Unmount, Vec::new()));
                    }
                    c.ast.iter().map(|ast| (ast.clone(), detach)).collect()
                }
                VNodeKind::Fragment { children } => {
                    children.iter().map(|child| (child.clone(), detach)).collect::<Vec<_>>()
                }
            }
        };

        for (child, detach) in nested {
            self.remove(&child, detach);
        }
        vnode.teardown();
    }

    // ------------------------------------------------------------------------
    // Hydrate
    // ------------------------------------------------------------------------

    /// Adopt the live `nodes` for `vnode`, creating what is missing at `at`.
    ///
    /// Live nodes left over after the walk are deleted, except comments.
    pub fn hydrate(
        &mut self,
        vnode: &VNode,
        nodes: Vec<NodeRef>,
        at: &mut AttachmentRef,
        namespace: Option<&'static str>,
    ) {
        let mut cursor = LiveCursor::new(nodes, *at);
        self.hydrate_node(vnode, &mut cursor, namespace);
        self.delete_leftovers(cursor.items);
        *at = cursor.at;
    }

    fn hydrate_node(&mut self, vnode: &VNode, cursor: &mut LiveCursor, namespace: Option<&'static str>) {
        vnode.take_pending();
        match vnode.node_type() {
            VNodeType::Empty => self.create(vnode, &mut cursor.at, namespace),
            VNodeType::Text => self.hydrate_text(vnode, cursor),
            VNodeType::Element => self.hydrate_element(vnode, cursor, namespace),
            VNodeType::Component => {
                if let Some(ast) = vnode.ast() {
                    self.hydrate_node(&ast, cursor, namespace);
                }
                self.mount_component(vnode);
            }
            VNodeType::Fragment => {
                for child in vnode.children() {
                    self.hydrate_node(&child, cursor, namespace);
                }
                vnode.lock().mounted = true;
            }
        }
    }

    fn skip_comments(&self, cursor: &mut LiveCursor) {
        while let Some(LiveItem::Existing(node)) = cursor.items.front().cloned() {
            if !matches!(self.platform.kind(node), Some(LiveKind::Comment(_))) {
                break;
            }
            cursor.items.pop_front();
            cursor.at.advance(node);
        }
    }

    fn hydrate_text(&mut self, vnode: &VNode, cursor: &mut LiveCursor) {
        let value = vnode.text_value().unwrap_or_default();
        // Empty text leaves no trace in markup.
        if value.is_empty() {
            return self.create(vnode, &mut cursor.at, None);
        }

        self.skip_comments(cursor);
        let live = match cursor.items.front() {
            Some(LiveItem::Existing(node)) => match self.platform.kind(*node) {
                Some(LiveKind::Text(text)) => Some((*node, text)),
                _ => None,
            },
            Some(LiveItem::PendingText(node, text)) => Some((*node, text.clone())),
            None => None,
        };
        let Some((node, text)) = live else {
            return self.create(vnode, &mut cursor.at, None);
        };
        cursor.items.pop_front();

        self.push(ChangeSet::link(ChangeKind::Text, node));
        if text != value {
            self.push(ChangeSet::set_text(node, &value));
            // Adjacent texts merge in markup: split off the rest for the
            // following VNodes.
            if let Some(rest) = text.strip_prefix(value.as_str()) {
                let split = NodeRef::new();
                self.push(ChangeSet::create_text(split, rest));
                self.push(ChangeSet::attach(
                    ChangeKind::Text,
                    split,
                    AttachmentRef::Sibling(node),
                ));
                cursor
                    .items
                    .push_front(LiveItem::PendingText(split, rest.to_string()));
            }
        }

        {
            let mut data = vnode.lock();
            data.mounted = true;
            if let VNodeKind::Text(text) = &mut data.kind {
                text.live = Some(node);
                text.applied = Some(value);
            }
        }
        cursor.at.advance(node);
    }

    fn hydrate_element(&mut self, vnode: &VNode, cursor: &mut LiveCursor, namespace: Option<&'static str>) {
        let tag = vnode.tag().unwrap_or_default();
        self.skip_comments(cursor);

        let Some(item) = cursor.items.front().cloned() else {
            return self.create(vnode, &mut cursor.at, namespace);
        };
        cursor.items.pop_front();

        let matches = match &item {
            LiveItem::Existing(node) => matches!(
                self.platform.kind(*node),
                Some(LiveKind::Element { tag: live_tag, .. }) if live_tag.eq_ignore_ascii_case(&tag)
            ),
            LiveItem::PendingText(..) => false,
        };

        if matches {
            let node = item.node();
            self.link_element(vnode, node, namespace);
            cursor.at.advance(node);
        } else if let Some(node) = self.build(vnode, namespace, None) {
            self.push(ChangeSet::replace(ChangeKind::Element, item.node(), node));
            cursor.at.advance(node);
        }
    }

    fn link_element(&mut self, vnode: &VNode, node: NodeRef, namespace: Option<&'static str>) {
        self.push(ChangeSet::link(ChangeKind::Element, node));
        let existing: IndexMap<String, String> = self.platform.attributes(node).into_iter().collect();

        let nested = {
            let mut data = vnode.lock();
            data.mounted = true;
            let VNodeKind::Element(el) = &mut data.kind else {
                return;
            };
            el.live = Some(node);
            if let Some(cell) = &el.node_ref {
                self.push(ChangeSet::node_ref(ChangeAction::Mount, cell.clone(), Some(node)));
            }

            let desired = desired_attributes(&el.attrs);
            for name in existing.keys() {
                if !desired.contains_key(name) {
                    self.push(ChangeSet::remove_attribute(node, name));
                }
            }
            for (name, value) in &desired {
                match existing.get(name) {
                    None => self.push(ChangeSet::set_attribute(ChangeAction::Create, node, name, value)),
                    Some(old) if old != value => {
                        self.push(ChangeSet::set_attribute(ChangeAction::Update, node, name, value))
                    }
                    Some(_) => {}
                }
            }
            el.applied_attrs = desired;

            // Server markup already carries the raw inner markup.
            el.applied_html = desired_html(&el.attrs);

            // Markup carries no listeners.
            for event in &el.events {
                self.push(ChangeSet::add_listener(node, event.clone()));
            }
            el.applied_events = el.events.clone();

            let own = element_namespace(&el.tag, namespace);
            el.applied_html
                .is_none()
                .then(|| (el.children.clone(), element_child_namespace(&el.tag, own)))
        };

        if let Some((children, child_namespace)) = nested {
            let mut cursor = LiveCursor::new(self.platform.children(node), AttachmentRef::Parent(node));
            for child in children {
                self.hydrate_node(&child, &mut cursor, child_namespace);
            }
            self.delete_leftovers(cursor.items);
        }
    }

    fn delete_leftovers(&mut self, items: VecDeque<LiveItem>) {
        for item in items {
            match item {
                LiveItem::Existing(node) => match self.platform.kind(node) {
                    Some(LiveKind::Comment(_)) | None => {}
                    Some(LiveKind::Element { .. }) => {
                        self.push(ChangeSet::delete(ChangeKind::Element, node))
                    }
                    Some(LiveKind::Text(_)) => self.push(ChangeSet::delete(ChangeKind::Text, node)),
                },
                LiveItem::PendingText(node, _) => self.push(ChangeSet::delete(ChangeKind::Text, node)),
            }
        }
    }
}

#[derive(Debug, Clone)]
enum LiveItem {
    Existing(NodeRef),
    /// A text node split off during this walk, not created yet.
    PendingText(NodeRef, String),
}

impl LiveItem {
    fn node(&self) -> NodeRef {
        match self {
            LiveItem::Existing(node) | LiveItem::PendingText(node, _) => *node,
        }
    }
}

/// Live nodes still to be claimed, and where to put nodes that are missing.
struct LiveCursor {
    items: VecDeque<LiveItem>,
    at: AttachmentRef,
}

impl LiveCursor {
    fn new(nodes: Vec<NodeRef>, at: AttachmentRef) -> Self {
        Self {
            items: nodes.into_iter().map(LiveItem::Existing).collect(),
            at,
        }
    }
}

/// Attribute values as they appear on the live node.
fn desired_attributes(attrs: &Attributes) -> IndexMap<String, String> {
    attrs
        .iter()
        .filter(|(name, _)| name.as_str() != INNER_HTML)
        .filter_map(|(name, value)| {
            value
                .attribute_value()
                .map(|value| (name.clone(), value.into_owned()))
        })
        .collect()
}

fn desired_html(attrs: &Attributes) -> Option<String> {
    attrs
        .get(INNER_HTML)
        .and_then(|value| value.attribute_value())
        .map(|html| html.into_owned())
}

fn same_listeners(applied: &[EventRef], declared: &[EventRef]) -> bool {
    applied.len() == declared.len()
        && applied
            .iter()
            .zip(declared)
            .all(|(a, b)| a.same_listener(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::patch::Payload;
    use crate::render::{create, update, RenderContext};
    use crate::vdom::{el, fragment, ComponentRegistry, EventRef, Node};

    fn client() -> RenderContext {
        RenderContext::client(ComponentRegistry::new())
    }

    fn actions(changes: &[ChangeSet]) -> Vec<(ChangeKind, ChangeAction)> {
        changes.iter().map(|c| (c.kind, c.action)).collect()
    }

    fn mount(doc: &Document, vnode: &VNode) -> Vec<ChangeSet> {
        let mut differ = Differ::new(doc);
        let mut at = AttachmentRef::Parent(doc.root());
        differ.visit(vnode, &mut at, None);
        differ.finish()
    }

    #[test]
    fn create_emits_create_attach_then_contents() {
        let cx = client();
        let doc = Document::new();
        let vnode = create(&cx, el("p").attr("class", "note").text("hi").into()).unwrap();

        let changes = mount(&doc, &vnode);
        assert_eq!(
            actions(&changes),
            vec![
                (ChangeKind::Element, ChangeAction::Create),
                (ChangeKind::Element, ChangeAction::Attach),
                (ChangeKind::Attribute, ChangeAction::Create),
                (ChangeKind::Text, ChangeAction::Create),
                (ChangeKind::Text, ChangeAction::Attach),
            ]
        );
        assert!(vnode.is_mounted());
        assert!(vnode.live().is_some());
    }

    #[test]
    fn no_op_update_emits_nothing() {
        let cx = client();
        let mut doc = Document::new();
        let listener = EventRef::new("click", |_| {});
        let view = || -> Node {
            el("ul")
                .attr("id", "list")
                .on_ref(listener.clone())
                .children((0..3).map(|i| el("li").key(i).text(i.to_string())))
                .into()
        };

        let vnode = create(&cx, view()).unwrap();
        let mut dispatcher = crate::patch::Dispatcher::new();
        dispatcher.enqueue_all(mount(&doc, &vnode));
        dispatcher.drain(&mut doc).unwrap();

        let next = update(&cx, view(), &vnode, true).unwrap();
        assert!(next.ptr_eq(&vnode));
        assert!(mount(&doc, &next).is_empty());
    }

    #[test]
    fn attribute_diff_emits_delete_create_update() {
        let cx = client();
        let doc = Document::new();
        let vnode = create(&cx, el("a").attr("href", "/a").attr("title", "x").into()).unwrap();
        mount(&doc, &vnode);

        update(&cx, el("a").attr("href", "/b").attr("rel", "next").into(), &vnode, true).unwrap();
        let changes = mount(&doc, &vnode);
        assert_eq!(
            actions(&changes),
            vec![
                (ChangeKind::Attribute, ChangeAction::Delete),
                (ChangeKind::Attribute, ChangeAction::Update),
                (ChangeKind::Attribute, ChangeAction::Create),
            ]
        );
    }

    #[test]
    fn changed_listeners_are_swapped_wholesale() {
        let cx = client();
        let doc = Document::new();
        let vnode = create(&cx, el("button").on("click", |_| {}).into()).unwrap();
        mount(&doc, &vnode);

        update(&cx, el("button").on("click", |_| {}).into(), &vnode, true).unwrap();
        let changes = mount(&doc, &vnode);
        assert_eq!(
            actions(&changes),
            vec![
                (ChangeKind::Event, ChangeAction::Delete),
                (ChangeKind::Event, ChangeAction::Create),
            ]
        );
    }

    #[test]
    fn single_root_replacement_is_in_place() {
        let cx = client();
        let doc = Document::new();
        let root = create(&cx, fragment([el("div")])).unwrap();
        mount(&doc, &root);
        let old = root.children()[0].live().unwrap();

        update(&cx, fragment([el("span")]), &root, true).unwrap();
        let changes = mount(&doc, &root);
        let replace = changes
            .iter()
            .find(|c| c.action == ChangeAction::Replace)
            .unwrap();
        assert!(matches!(replace.payload, Payload::Replace { old: o, .. } if o == old));
    }

    #[test]
    fn dropped_children_are_deleted() {
        let cx = client();
        let doc = Document::new();
        let list = |n: i32| -> Node { el("ul").children((0..n).map(|i| el("li").key(i))).into() };
        let root = create(&cx, list(3)).unwrap();
        mount(&doc, &root);
        let last = root.children()[2].live().unwrap();

        update(&cx, list(2), &root, true).unwrap();
        let changes = mount(&doc, &root);
        assert_eq!(actions(&changes), vec![(ChangeKind::Element, ChangeAction::Delete)]);
        assert_eq!(changes[0].target(), Some(last));
    }

    #[test]
    fn svg_children_get_the_namespace() {
        let cx = client();
        let doc = Document::new();
        let vnode = create(&cx, el("svg").child(el("circle")).into()).unwrap();
        let changes = mount(&doc, &vnode);
        let namespaces: Vec<_> = changes
            .iter()
            .filter_map(|c| match &c.payload {
                Payload::CreateElement { namespace, .. } => Some(*namespace),
                _ => None,
            })
            .collect();
        assert_eq!(namespaces, vec![Some(crate::patch::SVG_NAMESPACE); 2]);
    }
}
