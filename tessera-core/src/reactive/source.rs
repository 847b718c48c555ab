//! Reactive sources and notification fan-out.
//!
//! A source is anything a scope can depend on: a writable signal or a computed
//! signal. Sources keep their subscriber list here and share one notification
//! routine.
//!
//! # Notification
//!
//! On notify the subscriber list is snapshotted first, so subscriptions added
//! or removed by the callbacks do not disturb the iteration.
//!
//! Writes made while a pass is running on the current thread are queued and
//! applied after the current pass, each in a pass of its own, in write order.
//! Every subscriber of the outer pass sees the value that triggered it.
//! Computed sources propagate inside the pass that recomputed them.
//!
//! A subscriber that also depends on a computed source which itself depends on
//! the notifying source is held back: the computed source will reach it when
//! it recomputes. Held-back subscribers are revisited at the end of the pass
//! and only run if nothing re-ran them in the meantime, so they fire once and
//! are never lost.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::subscriber::{SubscriberId, SubscriberScope};

/// Unique identifier for a reactive source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a signal used by scopes.
pub(crate) trait Source: Send + Sync {
    fn source_id(&self) -> SourceId;

    /// Whether this source's own computation read `id`.
    fn depends_on(&self, id: SourceId) -> bool;

    /// Add a subscriber. Returns `false` if it was already present.
    fn attach(&self, scope: Arc<SubscriberScope>) -> bool;

    /// Remove a subscriber.
    fn detach(&self, scope: SubscriberId);
}

/// Subscriber list of one source.
#[derive(Default)]
pub(crate) struct Subscribers {
    scopes: Mutex<Vec<Arc<SubscriberScope>>>,
}

impl Subscribers {
    pub(crate) fn attach(&self, scope: Arc<SubscriberScope>) -> bool {
        let mut scopes = self.scopes.lock();
        if scopes.iter().any(|s| s.id() == scope.id()) {
            return false;
        }
        scopes.push(scope);
        true
    }

    pub(crate) fn detach(&self, id: SubscriberId) {
        self.scopes.lock().retain(|s| s.id() != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.scopes.lock().len()
    }

    fn snapshot(&self) -> Vec<Arc<SubscriberScope>> {
        self.scopes.lock().clone()
    }

    /// Notify every subscriber that `source` was written.
    ///
    /// Runs a pass now, or queues it behind the pass already running on this
    /// thread.
    pub(crate) fn notify(&self, source: SourceId) {
        let pass = Pass {
            source,
            scopes: self.snapshot(),
        };
        if !pass.scopes.is_empty() {
            schedule(move || pass.run());
        }
    }

    /// Notify every subscriber inside the current pass.
    pub(crate) fn propagate(&self, source: SourceId) {
        let scopes = self.snapshot();
        if !scopes.is_empty() {
            Pass { source, scopes }.run();
        }
    }
}

// ----------------------------------------------------------------------------
// Passes
// ----------------------------------------------------------------------------

type Task = Box<dyn FnOnce()>;

thread_local! {
    /// Work waiting behind the running pass. `None` while no pass runs.
    static QUEUE: RefCell<Option<VecDeque<Task>>> = const { RefCell::new(None) };
}

/// Whether a pass is running on this thread.
pub(crate) fn in_pass() -> bool {
    QUEUE.with(|queue| queue.borrow().is_some())
}

/// Run `task` as a new pass, or queue it behind the pass already running on
/// this thread.
pub(crate) fn schedule(task: impl FnOnce() + 'static) {
    let queued = QUEUE.with(|queue| match queue.borrow_mut().as_mut() {
        Some(queue) => {
            queue.push_back(Box::new(task));
            None
        }
        None => Some(task),
    });
    match queued {
        Some(task) => {
            let _active = ActivePass::begin();
            task();
            drain();
        }
        None => tracing::trace!("queued behind the running pass"),
    }
}

/// Run `f` as part of a pass.
///
/// Writes made inside `f` are applied after it returns, or after the pass
/// already running on this thread.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    if in_pass() {
        return f();
    }
    let _active = ActivePass::begin();
    let result = f();
    drain();
    result
}

/// Run queued work until none is left.
fn drain() {
    while let Some(task) = QUEUE.with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
        task();
    }
}

/// Marks a pass as running until dropped.
struct ActivePass;

impl ActivePass {
    fn begin() -> Self {
        QUEUE.with(|queue| *queue.borrow_mut() = Some(VecDeque::new()));
        Self
    }
}

impl Drop for ActivePass {
    fn drop(&mut self) {
        QUEUE.with(|queue| *queue.borrow_mut() = None);
    }
}

struct Pass {
    source: SourceId,
    scopes: Vec<Arc<SubscriberScope>>,
}

impl Pass {
    fn run(self) {
        let source = self.source;
        let snapshot: Vec<(Arc<SubscriberScope>, u64)> = self
            .scopes
            .into_iter()
            .map(|scope| {
                let runs = scope.run_count();
                (scope, runs)
            })
            .collect();
        tracing::trace!(source = ?source, subscribers = snapshot.len(), "notify");

        let mut held_back = Vec::new();
        for (scope, runs) in snapshot {
            if scope.is_disposed() {
                continue;
            }
            if scope.is_guarded_from(source) {
                held_back.push((scope, runs));
                continue;
            }
            scope.notify();
        }

        for (scope, runs) in held_back {
            if scope.run_count() == runs && !scope.is_disposed() {
                scope.notify();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_unique() {
        assert_ne!(SourceId::new(), SourceId::new());
    }

    #[test]
    fn attach_is_idempotent() {
        let subscribers = Subscribers::default();
        let scope = SubscriberScope::new(|_| {});

        assert!(subscribers.attach(scope.clone()));
        assert!(!subscribers.attach(scope.clone()));
        assert_eq!(subscribers.len(), 1);

        subscribers.detach(scope.id());
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn notify_reaches_each_subscriber_once() {
        let subscribers = Subscribers::default();
        let first = SubscriberScope::new(|_| {});
        let second = SubscriberScope::new(|_| {});
        subscribers.attach(first.clone());
        subscribers.attach(second.clone());

        subscribers.notify(SourceId::new());

        assert_eq!(first.run_count(), 1);
        assert_eq!(second.run_count(), 1);
    }

    #[test]
    fn writes_during_a_pass_are_queued() {
        let subscribers = Arc::new(Subscribers::default());
        let source = SourceId::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = order.clone();
            let subscribers = subscribers.clone();
            SubscriberScope::new(move |scope| {
                let run = scope.run_count();
                order.lock().push(("first", run));
                if run == 1 {
                    subscribers.notify(source);
                }
            })
        };
        let second = {
            let order = order.clone();
            SubscriberScope::new(move |scope| order.lock().push(("second", scope.run_count())))
        };
        subscribers.attach(first);
        subscribers.attach(second);

        subscribers.notify(source);

        assert_eq!(
            *order.lock(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn batch_defers_until_it_returns() {
        let subscribers = Subscribers::default();
        let scope = SubscriberScope::new(|_| {});
        subscribers.attach(scope.clone());

        batch(|| {
            subscribers.notify(SourceId::new());
            subscribers.notify(SourceId::new());
            assert_eq!(scope.run_count(), 0);
        });
        assert_eq!(scope.run_count(), 2);
    }
}
