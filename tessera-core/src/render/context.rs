//! Render Context
//!
//! Everything one render (one request on the server, one mounted root on the
//! client) shares: the options, the component registry, the stack of
//! components currently rendering, the islands found so far and the sink that
//! projects reactive re-renders onto a live tree.
//!
//! The context is an explicit value threaded through every `create`/`update`
//! call. Nothing here is global, so concurrent server renders never observe
//! each other's component stack.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::island::{Island, IslandManifest};
use crate::error::{RenderError, Result};
use crate::options::{RenderOptions, Target};
use crate::vdom::{ComponentRegistry, NodeRef, VNode, VNodeKind};

/// Receives VNodes changed by a reactive re-render.
///
/// Implemented by [`Mount`](crate::patch::Mount): it diffs the VNode against
/// the live tree and applies the resulting change sets. `anchor` is the first
/// live node of the subtree before the re-render, used to locate the insertion
/// point when the subtree's root was replaced.
pub trait Commit: Send + Sync {
    fn commit(&self, vnode: &VNode, anchor: Option<NodeRef>);
}

struct ContextInner {
    options: RenderOptions,
    registry: ComponentRegistry,
    scopes: Mutex<Vec<VNode>>,
    islands: Mutex<IslandManifest>,
    island_seq: AtomicU64,
    island_nesting: AtomicUsize,
    depth: AtomicUsize,
    committer: RwLock<Option<Weak<dyn Commit>>>,
}

/// Per-render state handed to render functions and hooks.
#[derive(Clone)]
pub struct RenderContext {
    inner: Arc<ContextInner>,
}

impl RenderContext {
    pub fn new(options: RenderOptions, registry: ComponentRegistry) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                options,
                registry,
                scopes: Mutex::new(Vec::new()),
                islands: Mutex::new(IslandManifest::default()),
                island_seq: AtomicU64::new(0),
                island_nesting: AtomicUsize::new(0),
                depth: AtomicUsize::new(0),
                committer: RwLock::new(None),
            }),
        }
    }

    /// A context for server rendering.
    pub fn server(registry: ComponentRegistry) -> Self {
        Self::new(RenderOptions::server(), registry)
    }

    /// A context for client rendering and hydration.
    pub fn client(registry: ComponentRegistry) -> Self {
        Self::new(RenderOptions::client(), registry)
    }

    /// A fresh context with the same options and registry.
    pub fn fork(&self) -> Self {
        Self::new(self.inner.options.clone(), self.inner.registry.clone())
    }

    pub fn options(&self) -> &RenderOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.registry
    }

    pub fn is_client(&self) -> bool {
        self.inner.options.target == Target::Client
    }

    // ---- Component scope stack ----

    /// Push `vnode` as the rendering component until the guard drops.
    pub(crate) fn enter_component(&self, vnode: &VNode) -> ComponentGuard<'_> {
        {
            let mut data = vnode.lock();
            if let VNodeKind::Component(c) = &mut data.kind {
                c.slot_cursor = 0;
                c.rendering = true;
            }
        }
        self.inner.scopes.lock().push(vnode.clone());
        ComponentGuard {
            cx: self,
            vnode: vnode.clone(),
        }
    }

    /// The component whose render function is running.
    pub(crate) fn current_component(&self, hook: &'static str) -> Result<VNode> {
        self.inner
            .scopes
            .lock()
            .last()
            .cloned()
            .ok_or(RenderError::MissingScope { hook })
    }

    /// Whether a component render is in progress.
    pub fn is_rendering(&self) -> bool {
        !self.inner.scopes.lock().is_empty()
    }

    /// Count one level of nesting until the guard drops.
    pub(crate) fn descend(&self) -> Result<DepthGuard<'_>> {
        let depth = self.inner.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = DepthGuard { cx: self };
        if depth > self.inner.options.max_depth {
            return Err(RenderError::DepthExceeded(self.inner.options.max_depth));
        }
        Ok(guard)
    }

    // ---- Islands ----

    /// Whether `island` components are wrapped with boundary markers here.
    pub(crate) fn wraps_islands(&self) -> bool {
        self.inner.options.target == Target::Server
            && self.inner.options.islands
            && self.inner.island_nesting.load(Ordering::SeqCst) == 0
    }

    /// Allocate a marker id and a children slot id for a new island.
    pub(crate) fn next_island_ids(&self) -> (String, String) {
        let n = self.inner.island_seq.fetch_add(1, Ordering::SeqCst);
        (
            format!("{}_{n}", self.inner.options.marker_prefix),
            format!("children_{n}"),
        )
    }

    pub(crate) fn record_island(&self, island: Island) {
        self.inner.islands.lock().insert(island);
    }

    /// Take the islands recorded so far.
    pub fn take_islands(&self) -> IslandManifest {
        std::mem::take(&mut *self.inner.islands.lock())
    }

    /// Mark the inside of an island: nested islands are not wrapped.
    pub(crate) fn enter_island(&self) -> IslandGuard<'_> {
        self.inner.island_nesting.fetch_add(1, Ordering::SeqCst);
        IslandGuard { cx: self }
    }

    /// Mark the inside of an island's children slot: islands are wrapped again.
    pub(crate) fn enter_slot(&self) -> SlotGuard<'_> {
        let saved = self.inner.island_nesting.swap(0, Ordering::SeqCst);
        SlotGuard { cx: self, saved }
    }

    // ---- Commit ----

    /// Route reactive re-renders of this context to `committer`.
    pub fn set_committer(&self, committer: Weak<dyn Commit>) {
        *self.inner.committer.write() = Some(committer);
    }

    pub(crate) fn commit(&self, vnode: &VNode, anchor: Option<NodeRef>) {
        let committer = self.inner.committer.read().as_ref().and_then(Weak::upgrade);
        if let Some(committer) = committer {
            committer.commit(vnode, anchor);
        }
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("options", &self.inner.options)
            .field("registry", &self.inner.registry)
            .field("rendering", &self.inner.scopes.lock().len())
            .finish()
    }
}

/// Pops the rendering component when dropped, on every exit path.
pub(crate) struct ComponentGuard<'a> {
    cx: &'a RenderContext,
    vnode: VNode,
}

impl Drop for ComponentGuard<'_> {
    fn drop(&mut self) {
        let popped = self.cx.inner.scopes.lock().pop();
        debug_assert!(
            popped.as_ref().is_some_and(|v| v.ptr_eq(&self.vnode)),
            "component scope stack mismatch"
        );

        let mut data = self.vnode.lock();
        if let VNodeKind::Component(c) = &mut data.kind {
            c.rendering = false;
        }
    }
}

pub(crate) struct DepthGuard<'a> {
    cx: &'a RenderContext,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.cx.inner.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct IslandGuard<'a> {
    cx: &'a RenderContext,
}

impl Drop for IslandGuard<'_> {
    fn drop(&mut self) {
        self.cx.inner.island_nesting.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct SlotGuard<'a> {
    cx: &'a RenderContext,
    saved: usize,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.cx
            .inner
            .island_nesting
            .store(self.saved, Ordering::SeqCst);
    }
}
