//! Subscriber scopes for the reactive system.
//!
//! A [`SubscriberScope`] represents any computation that depends on reactive
//! values: a computed signal, an effect, a component render or a text binding.
//! It binds one update callback to the set of signals it read during its last
//! execution.
//!
//! # Edges
//!
//! Every dependency is a two-sided edge: the signal keeps the scope in its
//! subscriber list and the scope keeps the signal in its dependency list. The
//! [`Cleanup`] created for an edge removes both sides, and it is handed to the
//! scope's cleanup registrar (if any) so an owner such as a component can run
//! all of its unsubscribes when it is torn down.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::cleanup::Cleanup;
use super::context::ReactiveContext;
use super::source::{Source, SourceId};

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. This ID is used to avoid
/// duplicate subscriptions and to remove edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type UpdateFn = Box<dyn Fn(&Arc<SubscriberScope>) + Send + Sync>;
type RegistrarFn = Box<dyn Fn(Cleanup) + Send + Sync>;

/// One dependency edge from a scope to a source.
pub(crate) struct Edge {
    source_id: SourceId,
    source: Weak<dyn Source>,
    cleanup: Cleanup,
}

#[derive(Default)]
struct Edges {
    /// Sources read during the current (or last) execution.
    current: Vec<Edge>,
    /// Sources read during the previous execution and not yet re-read.
    stale: Vec<Edge>,
}

/// A subscriber bound to the signals it read.
pub struct SubscriberScope {
    id: SubscriberId,
    update: UpdateFn,
    registrar: Option<RegistrarFn>,
    edges: Mutex<Edges>,
    runs: AtomicU64,
    disposed: AtomicBool,
}

impl SubscriberScope {
    /// Create a scope with the given update callback.
    ///
    /// The callback receives the scope itself so it can re-run a computation
    /// inside [`run_tracked`](Self::run_tracked).
    pub fn new<F>(update: F) -> Arc<Self>
    where
        F: Fn(&Arc<SubscriberScope>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: SubscriberId::new(),
            update: Box::new(update),
            registrar: None,
            edges: Mutex::new(Edges::default()),
            runs: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    /// Create a scope whose every new subscription is reported to `registrar`.
    pub fn with_registrar<F, R>(update: F, registrar: R) -> Arc<Self>
    where
        F: Fn(&Arc<SubscriberScope>) + Send + Sync + 'static,
        R: Fn(Cleanup) + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: SubscriberId::new(),
            update: Box::new(update),
            registrar: Some(Box::new(registrar)),
            edges: Mutex::new(Edges::default()),
            runs: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    /// Get the scope's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Invoke the update callback.
    pub fn notify(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        (self.update)(self);
    }

    /// Number of times the update callback has been invoked.
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Run `f` with this scope as the active subscriber.
    ///
    /// Sources read by `f` become dependencies. Dependencies from the previous
    /// execution that `f` did not read again are unsubscribed afterwards.
    pub fn run_tracked<R>(self: &Arc<Self>, f: impl FnOnce() -> R) -> R {
        {
            let mut edges = self.edges.lock();
            let previous = std::mem::take(&mut edges.current);
            edges.stale.extend(previous);
        }

        let output = {
            let _ctx = ReactiveContext::enter(self.clone());
            f()
        };

        let stale = std::mem::take(&mut self.edges.lock().stale);
        for edge in stale {
            edge.cleanup.run();
        }

        output
    }

    /// Subscribe this scope to `source`.
    ///
    /// Idempotent per scope/source pair: a second call returns the cleanup of
    /// the existing edge and does not notify the registrar again.
    pub(crate) fn track(self: &Arc<Self>, source: Arc<dyn Source>) -> Cleanup {
        let source_id = source.source_id();
        if self.is_disposed() {
            return Cleanup::noop();
        }

        {
            let mut edges = self.edges.lock();
            if let Some(edge) = edges.current.iter().find(|e| e.source_id == source_id) {
                return edge.cleanup.clone();
            }
            // Read again during a re-run: keep the existing edge.
            if let Some(pos) = edges.stale.iter().position(|e| e.source_id == source_id) {
                let edge = edges.stale.swap_remove(pos);
                let cleanup = edge.cleanup.clone();
                edges.current.push(edge);
                return cleanup;
            }
        }

        source.attach(self.clone());

        let weak_source = Arc::downgrade(&source);
        let weak_scope = Arc::downgrade(self);
        let scope_id = self.id;
        let cleanup = Cleanup::new(move || {
            if let Some(source) = weak_source.upgrade() {
                source.detach(scope_id);
            }
            if let Some(scope) = weak_scope.upgrade() {
                scope.remove_edge(source_id);
            }
        });

        self.edges.lock().current.push(Edge {
            source_id,
            source: Arc::downgrade(&source),
            cleanup: cleanup.clone(),
        });

        if let Some(registrar) = &self.registrar {
            registrar(cleanup.clone());
        }

        cleanup
    }

    fn remove_edge(&self, source_id: SourceId) {
        let mut edges = self.edges.lock();
        edges.current.retain(|e| e.source_id != source_id);
        edges.stale.retain(|e| e.source_id != source_id);
    }

    /// Whether this scope read `id` directly or through a computed source.
    pub fn depends_on(&self, id: SourceId) -> bool {
        self.sources()
            .into_iter()
            .any(|(source_id, source)| {
                source_id == id || source.upgrade().is_some_and(|s| s.depends_on(id))
            })
    }

    /// Whether some *other* dependency of this scope itself depends on `id`.
    ///
    /// Such a scope will be reached again through that dependency when it
    /// recomputes, so a direct notification from `id` can be held back.
    pub(crate) fn is_guarded_from(&self, id: SourceId) -> bool {
        self.sources()
            .into_iter()
            .filter(|(source_id, _)| *source_id != id)
            .any(|(_, source)| source.upgrade().is_some_and(|s| s.depends_on(id)))
    }

    fn sources(&self) -> Vec<(SourceId, Weak<dyn Source>)> {
        self.edges
            .lock()
            .current
            .iter()
            .map(|e| (e.source_id, e.source.clone()))
            .collect()
    }

    /// Number of sources this scope currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.edges.lock().current.len()
    }

    /// Remove every edge and stop reacting to notifications.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let edges = {
            let mut edges = self.edges.lock();
            let mut all = std::mem::take(&mut edges.current);
            all.append(&mut edges.stale);
            all
        };
        for edge in edges {
            edge.cleanup.run();
        }
    }

    /// Check if the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SubscriberScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberScope")
            .field("id", &self.id)
            .field("dependency_count", &self.dependency_count())
            .field("runs", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
