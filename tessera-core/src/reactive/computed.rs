//! Computed Signal Implementation
//!
//! A computed signal is a cached derived value. Unlike a lazy memo it
//! recomputes eagerly: as soon as any of its dependencies notifies it, the
//! computation runs again inside the signal's own scope.
//!
//! # How Computed Signals Work
//!
//! 1. On creation, the computation runs once and its reads become the
//!    signal's dependencies.
//!
//! 2. When a dependency changes, the computation re-runs and the new value is
//!    compared with the cached one.
//!
//! 3. Downstream subscribers are notified only if the derived value actually
//!    changed.
//!
//! A computed signal answers [`depends_on`](ComputedSignal::depends_on) from
//! its own dependency set; the notification fan-out uses this to avoid
//! double-firing subscribers that read both a signal and a value derived from
//! it.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::source::{Source, SourceId, Subscribers};
use super::subscriber::{SubscriberId, SubscriberScope};
use super::TextSource;

struct ComputedInner<T> {
    id: SourceId,
    value: RwLock<T>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    scope: Arc<SubscriberScope>,
    subscribers: Subscribers,
    recomputes: AtomicUsize,
}

impl<T> ComputedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn recompute(&self) {
        let new_value = self.scope.run_tracked(|| (self.compute)());
        self.recomputes.fetch_add(1, Ordering::SeqCst);

        // Check if value actually changed
        let changed = {
            let mut guard = self.value.write();
            if *guard == new_value {
                false
            } else {
                *guard = new_value;
                true
            }
        };

        if changed {
            self.subscribers.propagate(self.id);
        }
    }
}

impl<T> Source for ComputedInner<T>
where
    T: Send + Sync,
{
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn depends_on(&self, id: SourceId) -> bool {
        self.scope.depends_on(id)
    }

    fn attach(&self, scope: Arc<SubscriberScope>) -> bool {
        self.subscribers.attach(scope)
    }

    fn detach(&self, scope: SubscriberId) {
        self.subscribers.detach(scope);
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}

/// A derived value that recomputes whenever its dependencies change.
///
/// # Example
///
/// ```rust
/// use tessera_core::reactive::{ComputedSignal, WritableSignal};
///
/// let count = WritableSignal::new(2);
/// let source = count.clone();
/// let doubled = ComputedSignal::new(move || source.get() * 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a computed signal and run its computation once.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let scope = SubscriberScope::new(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.recompute();
                }
            });
            let value = scope.run_tracked(&compute);

            ComputedInner {
                id: SourceId::new(),
                value: RwLock::new(value),
                compute: Box::new(compute),
                scope,
                subscribers: Subscribers::default(),
                recomputes: AtomicUsize::new(0),
            }
        });

        Self { inner }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.inner.clone());
        }
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Whether this signal's last computation read `id`.
    pub fn depends_on(&self, id: SourceId) -> bool {
        self.inner.depends_on(id)
    }

    /// Number of times the value has been recomputed after creation.
    pub fn recompute_count(&self) -> usize {
        self.inner.recomputes.load(Ordering::SeqCst)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.inner.scope.dependency_count()
    }
}

impl<T> Clone for ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSignal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

impl<T> TextSource for ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + Display + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn read_text(&self) -> String {
        self.get().to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
