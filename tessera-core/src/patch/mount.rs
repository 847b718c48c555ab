//! Client Roots
//!
//! A [`Mount`] owns one VNode tree projected onto a platform. It renders or
//! hydrates the tree, folds later declarative updates into it, and receives
//! the re-renders that signals trigger inside the tree (it is the render
//! context's [`Commit`] sink).
//!
//! The platform sits behind a shared lock so several mounts (one per island)
//! can drive the same document. The lock is only held while diffing and
//! applying. Lifecycle hooks run while it is released, so they may read the
//! platform and set signals that commit again: `on_unmount` before the
//! removed nodes are detached, `on_mount` after the new ones are attached.

use std::sync::Arc;

use parking_lot::Mutex;

use super::attachment::AttachmentRef;
use super::differ::Differ;
use super::dispatcher::{Dispatcher, DrainReport};
use super::platform::{child_namespace, Platform};
use crate::dom::Document;
use crate::error::{RenderError, Result};
use crate::reactive::{batch, run_all};
use crate::render::{create, update, Commit, RenderContext};
use crate::vdom::{Event, Node, NodeRef, PropValue, VNode};

struct MountInner<P> {
    platform: Arc<Mutex<P>>,
    cx: RenderContext,
    root: Mutex<Option<VNode>>,
    container: Mutex<Option<NodeRef>>,
    dispatcher: Mutex<Dispatcher>,
    last_report: Mutex<DrainReport>,
}

/// A client root.
pub struct Mount<P: Platform + Send + 'static> {
    inner: Arc<MountInner<P>>,
}

impl<P: Platform + Send + 'static> Clone for Mount<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Platform + Send + 'static> Mount<P> {
    /// Create a root driving `platform`. Reactive re-renders inside trees
    /// built with `cx` are committed through this mount.
    pub fn new(platform: Arc<Mutex<P>>, cx: RenderContext) -> Self {
        let inner = Arc::new(MountInner {
            platform,
            cx,
            root: Mutex::new(None),
            container: Mutex::new(None),
            dispatcher: Mutex::new(Dispatcher::new()),
            last_report: Mutex::new(DrainReport::default()),
        });
        let committer: Arc<dyn Commit> = inner.clone();
        inner.cx.set_committer(Arc::downgrade(&committer));
        Self { inner }
    }

    /// Render `node` at the end of `container`.
    ///
    /// A second call updates the existing tree instead.
    #[tracing::instrument(skip_all, fields(container = %container))]
    pub fn render(&self, node: Node, container: NodeRef) -> Result<DrainReport> {
        if self.inner.root.lock().is_some() {
            return self.update(node);
        }

        let vnode = create(&self.inner.cx, node)?;
        *self.inner.container.lock() = Some(container);
        let report = self.inner.apply(|platform, differ| {
            let mut at = AttachmentRef::append(platform, container);
            differ.visit(&vnode, &mut at, child_namespace(platform, Some(container)));
            Ok(())
        })?;
        *self.inner.root.lock() = Some(vnode);
        Ok(report)
    }

    /// Adopt the live `nodes` for `node`. Nodes that are missing are created
    /// after `at`; live nodes that are not claimed are deleted.
    #[tracing::instrument(skip_all, fields(nodes = nodes.len()))]
    pub fn hydrate(&self, node: Node, nodes: Vec<NodeRef>, at: AttachmentRef) -> Result<DrainReport> {
        let vnode = create(&self.inner.cx, node)?;
        let report = self.inner.apply(|platform, differ| {
            let container = at.container(platform);
            *self.inner.container.lock() = container;
            let mut cursor = at;
            differ.hydrate(&vnode, nodes, &mut cursor, child_namespace(platform, container));
            Ok(())
        })?;
        *self.inner.root.lock() = Some(vnode);
        Ok(report)
    }

    /// Fold `node` into the mounted tree.
    pub fn update(&self, node: Node) -> Result<DrainReport> {
        let Some(prev) = self.inner.root.lock().clone() else {
            return Err(RenderError::AttachmentResolution(
                "update called before render or hydrate".to_string(),
            ));
        };
        let anchor = prev.first_live();
        let next = update(&self.inner.cx, node, &prev, true)?;
        let report = self.inner.apply(|platform, differ| {
            let mut at = self.inner.cursor(platform, &next, anchor)?;
            let container = at.container(platform);
            differ.visit(&next, &mut at, child_namespace(platform, container));
            Ok(())
        })?;
        *self.inner.root.lock() = Some(next);
        Ok(report)
    }

    /// Remove the tree from the platform and tear it down.
    pub fn unmount(&self) -> Result<DrainReport> {
        let Some(root) = self.inner.root.lock().take() else {
            return Ok(DrainReport::default());
        };
        // Cleanups are user code: run them before taking the platform lock.
        root.teardown();
        self.inner.apply(|_, differ| {
            differ.remove(&root, true);
            Ok(())
        })
    }

    pub fn root(&self) -> Option<VNode> {
        self.inner.root.lock().clone()
    }

    pub fn container(&self) -> Option<NodeRef> {
        *self.inner.container.lock()
    }

    /// What the most recent commit applied.
    pub fn last_report(&self) -> DrainReport {
        self.inner.last_report.lock().clone()
    }

    pub fn platform(&self) -> &Arc<Mutex<P>> {
        &self.inner.platform
    }

    pub fn context(&self) -> &RenderContext {
        &self.inner.cx
    }
}

impl Mount<Document> {
    /// Call the listeners for `name` registered on `node`.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch_event(&self, node: NodeRef, name: &str, value: PropValue) -> usize {
        // Listeners may set signals and commit, which needs the lock.
        let listeners = self.inner.platform.lock().listeners(node, name);
        let event = Event {
            name: name.to_string(),
            target: Some(node),
            value,
        };
        for listener in &listeners {
            listener.call(&event);
        }
        listeners.len()
    }
}

impl<P: Platform + Send + 'static> MountInner<P> {
    /// Diff under the platform lock, run `on_unmount` hooks, drain, then run
    /// `on_mount` hooks.
    ///
    /// Unmount hooks run unlocked while their nodes are still attached.
    /// Signals they write notify once the drain is done.
    fn apply<F>(&self, diff: F) -> Result<DrainReport>
    where
        F: FnOnce(&P, &mut Differ<'_, P>) -> Result<()>,
    {
        let (report, hooks) = batch(|| -> Result<_> {
            let (unmount_hooks, changes) = {
                let platform = self.platform.lock();
                let live: &P = &platform;
                let mut differ = Differ::new(live);
                diff(live, &mut differ)?;
                (differ.take_unmount_hooks(), differ.finish())
            };
            run_all(unmount_hooks);
            let mut platform = self.platform.lock();
            let mut dispatcher = self.dispatcher.lock();
            dispatcher.enqueue_all(changes);
            dispatcher.drain_deferred(&mut *platform)
        })?;
        run_all(hooks);
        tracing::debug!(applied = report.count(), "commit");
        *self.last_report.lock() = report.clone();
        Ok(report)
    }

    /// Insertion point for a subtree whose first live node was `anchor`.
    fn cursor(&self, platform: &P, vnode: &VNode, anchor: Option<NodeRef>) -> Result<AttachmentRef> {
        if let Some(anchor) = anchor.or_else(|| vnode.first_live()) {
            return AttachmentRef::before(platform, anchor);
        }
        let is_root = self
            .root
            .lock()
            .as_ref()
            .is_some_and(|root| root.ptr_eq(vnode));
        match *self.container.lock() {
            Some(container) if is_root => Ok(AttachmentRef::append(platform, container)),
            _ => Err(RenderError::AttachmentResolution(
                "subtree has no live nodes to anchor on".to_string(),
            )),
        }
    }
}

impl<P: Platform + Send + 'static> Commit for MountInner<P> {
    fn commit(&self, vnode: &VNode, anchor: Option<NodeRef>) {
        if !vnode.is_mounted() {
            return;
        }
        let result = self.apply(|platform, differ| {
            let mut at = self.cursor(platform, vnode, anchor)?;
            let container = at.container(platform);
            differ.visit(vnode, &mut at, child_namespace(platform, container));
            Ok(())
        });
        if let Err(err) = result {
            tracing::error!(error = %err, "commit failed");
        }
    }
}
