//! VNode Tree
//!
//! A [`VNode`] is one node of the persistent tree the reconciler maintains.
//! Handles are shared (`Arc`) and compared by identity: an update that keeps a
//! node returns the very same handle, mutated in place.
//!
//! Besides the rendered shape each node carries bookkeeping:
//!
//! - `cleanups`: run exactly once, when the node is torn down.
//! - the live platform node it is bound to, and the attributes, listeners and
//!   text last applied to it, so the differ can compare against what the
//!   platform actually shows.
//! - pending structural changes recorded by the reconciler for the differ:
//!   the node this one replaced, children that were dropped, and whether a
//!   keyed match moved it.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;

use super::component::Component;
use super::key::Key;
use super::live::{NodeRef, NodeRefCell};
use super::props::{Attributes, EventRef, PropValue, Props};
use crate::reactive::{run_all, Cleanup, SourceId, SubscriberScope};

/// Shape of a VNode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VNodeType {
    Empty,
    Text,
    Element,
    Component,
    Fragment,
}

/// Lifecycle state of a component VNode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentMode {
    /// The first render has not returned yet; hooks may register callbacks.
    NotCreated,
    /// The first render completed.
    Created,
}

pub(crate) struct TextData {
    pub(crate) value: String,
    pub(crate) skip_escaping: bool,
    pub(crate) source: Option<SourceId>,
    pub(crate) binding: Option<Arc<SubscriberScope>>,
    pub(crate) live: Option<NodeRef>,
    pub(crate) applied: Option<String>,
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attrs: Attributes,
    pub(crate) events: SmallVec<[EventRef; 2]>,
    pub(crate) children: Vec<VNode>,
    pub(crate) node_ref: Option<NodeRefCell>,
    pub(crate) live: Option<NodeRef>,
    pub(crate) applied_attrs: IndexMap<String, String>,
    pub(crate) applied_events: SmallVec<[EventRef; 2]>,
    pub(crate) applied_html: Option<String>,
}

pub(crate) struct ComponentData {
    pub(crate) component: Component,
    pub(crate) props: Props,
    pub(crate) ast: Option<VNode>,
    pub(crate) mode: ComponentMode,
    pub(crate) on_mount: SmallVec<[Cleanup; 2]>,
    pub(crate) on_unmount: SmallVec<[Cleanup; 2]>,
    pub(crate) scope: Option<Arc<SubscriberScope>>,
    /// Hook state, resolved by call position.
    pub(crate) slots: Vec<Arc<dyn Any + Send + Sync>>,
    pub(crate) slot_cursor: usize,
    pub(crate) rendering: bool,
    /// A signal this component reads changed while it was rendering.
    pub(crate) rerender_requested: bool,
    pub(crate) island_marker: Option<String>,
    pub(crate) island_slot: Option<String>,
}

pub(crate) enum VNodeKind {
    Empty { live: Option<NodeRef> },
    Text(TextData),
    Element(ElementData),
    Component(ComponentData),
    Fragment { children: Vec<VNode> },
}

#[derive(Default)]
pub(crate) struct Pending {
    /// The node this one replaced during the last update.
    pub(crate) replaces: Option<VNode>,
    /// Children dropped by the last update.
    pub(crate) removed: Vec<VNode>,
    /// Matched by key from an earlier position than a preceding sibling.
    pub(crate) moved: bool,
}

pub(crate) struct VNodeData {
    pub(crate) kind: VNodeKind,
    pub(crate) key: Option<Key>,
    pub(crate) cleanups: Vec<Cleanup>,
    pub(crate) pending: Pending,
    pub(crate) mounted: bool,
    pub(crate) disposed: bool,
}

/// A node of the persistent render tree.
#[derive(Clone)]
pub struct VNode(Arc<Mutex<VNodeData>>);

/// Non-owning handle to a VNode, held by reactive scopes.
#[derive(Clone)]
pub(crate) struct WeakVNode(Weak<Mutex<VNodeData>>);

impl WeakVNode {
    pub(crate) fn upgrade(&self) -> Option<VNode> {
        self.0.upgrade().map(VNode)
    }
}

impl VNode {
    fn from_kind(kind: VNodeKind, key: Option<Key>) -> Self {
        Self(Arc::new(Mutex::new(VNodeData {
            kind,
            key,
            cleanups: Vec::new(),
            pending: Pending::default(),
            mounted: false,
            disposed: false,
        })))
    }

    pub(crate) fn empty() -> Self {
        Self::from_kind(VNodeKind::Empty { live: None }, None)
    }

    pub(crate) fn text(value: String, skip_escaping: bool) -> Self {
        Self::from_kind(
            VNodeKind::Text(TextData {
                value,
                skip_escaping,
                source: None,
                binding: None,
                live: None,
                applied: None,
            }),
            None,
        )
    }

    pub(crate) fn element(data: ElementData, key: Option<Key>) -> Self {
        Self::from_kind(VNodeKind::Element(data), key)
    }

    pub(crate) fn new_component(data: ComponentData, key: Option<Key>) -> Self {
        Self::from_kind(VNodeKind::Component(data), key)
    }

    pub(crate) fn fragment(children: Vec<VNode>, key: Option<Key>) -> Self {
        Self::from_kind(VNodeKind::Fragment { children }, key)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, VNodeData> {
        self.0.lock()
    }

    pub(crate) fn downgrade(&self) -> WeakVNode {
        WeakVNode(Arc::downgrade(&self.0))
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn node_type(&self) -> VNodeType {
        match self.lock().kind {
            VNodeKind::Empty { .. } => VNodeType::Empty,
            VNodeKind::Text(_) => VNodeType::Text,
            VNodeKind::Element(_) => VNodeType::Element,
            VNodeKind::Component(_) => VNodeType::Component,
            VNodeKind::Fragment { .. } => VNodeType::Fragment,
        }
    }

    pub fn key(&self) -> Option<Key> {
        self.lock().key.clone()
    }

    /// Current value of a text node.
    pub fn text_value(&self) -> Option<String> {
        match &self.lock().kind {
            VNodeKind::Text(text) => Some(text.value.clone()),
            _ => None,
        }
    }

    /// Tag of an element node.
    pub fn tag(&self) -> Option<String> {
        match &self.lock().kind {
            VNodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<PropValue> {
        match &self.lock().kind {
            VNodeKind::Element(el) => el.attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// Children of an element or fragment.
    pub fn children(&self) -> Vec<VNode> {
        match &self.lock().kind {
            VNodeKind::Element(el) => el.children.clone(),
            VNodeKind::Fragment { children } => children.clone(),
            _ => Vec::new(),
        }
    }

    /// The subtree rendered by a component.
    pub fn ast(&self) -> Option<VNode> {
        match &self.lock().kind {
            VNodeKind::Component(c) => c.ast.clone(),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<Component> {
        match &self.lock().kind {
            VNodeKind::Component(c) => Some(c.component.clone()),
            _ => None,
        }
    }

    pub fn component_mode(&self) -> Option<ComponentMode> {
        match &self.lock().kind {
            VNodeKind::Component(c) => Some(c.mode),
            _ => None,
        }
    }

    /// Island marker assigned during server rendering.
    pub fn island_marker(&self) -> Option<String> {
        match &self.lock().kind {
            VNodeKind::Component(c) => c.island_marker.clone(),
            _ => None,
        }
    }

    /// Live node bound to an element, text or empty placeholder.
    pub fn live(&self) -> Option<NodeRef> {
        match &self.lock().kind {
            VNodeKind::Empty { live } => *live,
            VNodeKind::Text(text) => text.live,
            VNodeKind::Element(el) => el.live,
            VNodeKind::Component(_) | VNodeKind::Fragment { .. } => None,
        }
    }

    /// Top-level live nodes of this subtree, in document order.
    pub fn live_roots(&self) -> Vec<NodeRef> {
        let mut roots = Vec::new();
        self.collect_roots(&mut roots);
        roots
    }

    fn collect_roots(&self, roots: &mut Vec<NodeRef>) {
        let nested = {
            let data = self.lock();
            match &data.kind {
                VNodeKind::Empty { live } => {
                    roots.extend(*live);
                    return;
                }
                VNodeKind::Text(text) => {
                    roots.extend(text.live);
                    return;
                }
                VNodeKind::Element(el) => {
                    roots.extend(el.live);
                    return;
                }
                VNodeKind::Component(c) => c.ast.iter().cloned().collect::<Vec<_>>(),
                VNodeKind::Fragment { children } => children.clone(),
            }
        };
        for child in nested {
            child.collect_roots(roots);
        }
    }

    pub fn first_live(&self) -> Option<NodeRef> {
        self.live_roots().first().copied()
    }

    pub fn last_live(&self) -> Option<NodeRef> {
        self.live_roots().last().copied()
    }

    /// Whether the differ has projected this node onto the platform.
    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Number of cleanups currently registered on this node.
    pub fn cleanup_count(&self) -> usize {
        self.lock().cleanups.iter().filter(|c| !c.is_done()).count()
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk(&self, f: &mut dyn FnMut(&VNode)) {
        f(self);
        let nested = {
            let data = self.lock();
            match &data.kind {
                VNodeKind::Element(el) => el.children.clone(),
                VNodeKind::Fragment { children } => children.clone(),
                VNodeKind::Component(c) => c.ast.iter().cloned().collect(),
                VNodeKind::Empty { .. } | VNodeKind::Text(_) => Vec::new(),
            }
        };
        for child in nested {
            child.walk(f);
        }
    }

    /// Tear this subtree down: run every cleanup and stop all reactivity.
    ///
    /// Safe to call more than once; cleanups never run twice.
    pub fn dispose(&self) {
        self.teardown();
    }

    pub(crate) fn add_cleanup(&self, cleanup: Cleanup) {
        let mut data = self.lock();
        if data.disposed {
            drop(data);
            cleanup.run();
            return;
        }
        data.cleanups.retain(|c| !c.is_done());
        data.cleanups.push(cleanup);
    }

    pub(crate) fn teardown(&self) {
        let (cleanups, scope, slots, nested) = {
            let mut data = self.lock();
            if data.disposed {
                return;
            }
            data.disposed = true;
            let cleanups = std::mem::take(&mut data.cleanups);
            match &mut data.kind {
                VNodeKind::Empty { .. } => (cleanups, None, Vec::new(), Vec::new()),
                VNodeKind::Text(text) => (cleanups, text.binding.take(), Vec::new(), Vec::new()),
                VNodeKind::Element(el) => (cleanups, None, Vec::new(), el.children.clone()),
                VNodeKind::Fragment { children } => {
                    (cleanups, None, Vec::new(), children.clone())
                }
                VNodeKind::Component(c) => (
                    cleanups,
                    c.scope.clone(),
                    std::mem::take(&mut c.slots),
                    c.ast.iter().cloned().collect(),
                ),
            }
        };

        if let Some(scope) = scope {
            scope.dispose();
        }
        run_all(cleanups);
        drop(slots);

        for child in nested {
            child.teardown();
        }
    }

    pub(crate) fn set_moved(&self, moved: bool) {
        self.lock().pending.moved = moved;
    }

    pub(crate) fn set_replaces(&self, old: VNode) {
        self.lock().pending.replaces = Some(old);
    }

    pub(crate) fn push_removed(&self, removed: VNode) {
        self.lock().pending.removed.push(removed);
    }

    pub(crate) fn take_pending(&self) -> Pending {
        std::mem::take(&mut self.lock().pending)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(data) = self.0.try_lock() else {
            return f.write_str("VNode(<locked>)");
        };
        match &data.kind {
            VNodeKind::Empty { .. } => f.write_str("Empty"),
            VNodeKind::Text(text) => f.debug_tuple("Text").field(&text.value).finish(),
            VNodeKind::Element(el) => f
                .debug_struct("Element")
                .field("tag", &el.tag)
                .field("key", &data.key)
                .field("children", &el.children)
                .finish(),
            VNodeKind::Component(c) => f
                .debug_struct("Component")
                .field("name", &c.component.name())
                .field("key", &data.key)
                .field("mode", &c.mode)
                .field("ast", &c.ast)
                .finish(),
            VNodeKind::Fragment { children } => f
                .debug_struct("Fragment")
                .field("key", &data.key)
                .field("children", children)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_cleanup(count: &Arc<AtomicI32>) -> Cleanup {
        let count = count.clone();
        Cleanup::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn teardown_runs_cleanups_once() {
        let count = Arc::new(AtomicI32::new(0));
        let child = VNode::text("a".into(), false);
        child.add_cleanup(counting_cleanup(&count));
        let parent = VNode::fragment(vec![child.clone()], None);
        parent.add_cleanup(counting_cleanup(&count));

        child.dispose();
        parent.dispose();
        parent.dispose();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(child.is_disposed());
    }

    #[test]
    fn cleanup_added_after_disposal_runs_immediately() {
        let count = Arc::new(AtomicI32::new(0));
        let node = VNode::empty();
        node.dispose();
        node.add_cleanup(counting_cleanup(&count));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn live_roots_flatten_fragments() {
        let a = VNode::text("a".into(), false);
        let b = VNode::text("b".into(), false);
        let (ra, rb) = (NodeRef::new(), NodeRef::new());
        if let VNodeKind::Text(t) = &mut a.lock().kind {
            t.live = Some(ra);
        }
        if let VNodeKind::Text(t) = &mut b.lock().kind {
            t.live = Some(rb);
        }
        let inner = VNode::fragment(vec![b], None);
        let outer = VNode::fragment(vec![a, inner], None);

        assert_eq!(outer.live_roots(), vec![ra, rb]);
        assert_eq!(outer.first_live(), Some(ra));
        assert_eq!(outer.last_live(), Some(rb));
    }

    #[test]
    fn identity_is_by_handle() {
        let a = VNode::empty();
        let b = VNode::empty();
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.node_type(), VNodeType::Empty);
    }
}
