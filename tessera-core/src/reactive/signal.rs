//! Signal Implementation
//!
//! A writable signal is the fundamental reactive primitive. It holds a value
//! and tracks which scopes depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (computed signal,
//!    effect, component render), the signal registers that context as a
//!    subscriber.
//!
//! 2. When a signal's value changes, all subscribers are notified.
//!
//! 3. Setting a value equal to the current one is a no-op: nobody is notified.
//!
//! # Thread Safety
//!
//! Signals are designed to be thread-safe. The value is protected by a
//! RwLock and handles are cheap `Arc` clones that share state.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use parking_lot::RwLock;

use super::cleanup::Cleanup;
use super::context::ReactiveContext;
use super::source::{in_pass, schedule, Source, SourceId, Subscribers};
use super::subscriber::{SubscriberId, SubscriberScope};
use super::TextSource;

struct SignalInner<T> {
    id: SourceId,
    value: RwLock<T>,
    subscribers: Subscribers,
}

impl<T> Source for SignalInner<T>
where
    T: Send + Sync,
{
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn depends_on(&self, _id: SourceId) -> bool {
        // A writable signal has no dependencies of its own.
        false
    }

    fn attach(&self, scope: Arc<SubscriberScope>) -> bool {
        self.subscribers.attach(scope)
    }

    fn detach(&self, scope: SubscriberId) {
        self.subscribers.detach(scope);
    }
}

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use tessera_core::reactive::WritableSignal;
///
/// let count = WritableSignal::new(0);
/// assert!(count.set(5));
/// assert!(!count.set(5));
/// assert_eq!(count.get(), 5);
/// ```
pub struct WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::new(),
                value: RwLock::new(value),
                subscribers: Subscribers::default(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current scope as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.read().clone()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.read())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    ///
    /// Returns `false` without notifying anyone if `value` equals the current
    /// value. While a notification pass runs on this thread the write is
    /// queued behind it and `true` is returned; the comparison happens when
    /// the write is applied.
    pub fn set(&self, value: T) -> bool {
        if in_pass() {
            let signal = self.clone();
            schedule(move || signal.apply(value));
            return true;
        }
        if !self.store(value) {
            return false;
        }
        self.notify();
        true
    }

    /// Update the value using a function of the current one.
    ///
    /// Queued like [`set`](Self::set) while a pass runs; `f` then sees the
    /// value left by the writes queued before it.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T + 'static,
    {
        if in_pass() {
            let signal = self.clone();
            schedule(move || {
                let next = f(&signal.inner.value.read());
                signal.apply(next);
            });
            return true;
        }
        let next = f(&self.inner.value.read());
        self.set(next)
    }

    /// Store `value`; `false` if it equals the current one.
    fn store(&self, value: T) -> bool {
        let mut guard = self.inner.value.write();
        if *guard == value {
            return false;
        }
        *guard = value;
        true
    }

    /// Apply a queued write inside the pass draining it.
    fn apply(&self, value: T) {
        if self.store(value) {
            self.inner.subscribers.propagate(self.inner.id);
        }
    }

    /// Subscribe `scope` to this signal without reading it.
    ///
    /// Idempotent per scope; the returned cleanup removes the edge on both
    /// sides.
    pub fn subscribe(&self, scope: &Arc<SubscriberScope>) -> Cleanup {
        scope.track(self.inner.clone())
    }

    /// Notify all subscribers unconditionally.
    pub fn notify(&self) {
        self.inner.subscribers.notify(self.inner.id);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn track(&self) {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.inner.clone());
        }
    }
}

impl<T> Clone for WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableSignal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T> TextSource for WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + Display + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn read_text(&self) -> String {
        self.with(ToString::to_string)
    }
}

/// Write-only handle returned by the `state` hook.
pub struct Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    signal: WritableSignal<T>,
}

impl<T> Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(signal: WritableSignal<T>) -> Self {
        Self { signal }
    }

    /// Store a new value; see [`WritableSignal::set`].
    pub fn set(&self, value: T) -> bool {
        self.signal.set(value)
    }

    /// Store a value derived from the current one.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.signal.update(f)
    }
}

impl<T> Clone for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> Debug for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("signal", &self.signal.id()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = WritableSignal::new(0);
        assert_eq!(signal.get(), 0);

        assert!(signal.set(42));
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = WritableSignal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = WritableSignal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let scope = SubscriberScope::new(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        signal.subscribe(&scope);

        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        signal.set(1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        signal.set(2);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn setting_equal_value_notifies_nobody() {
        let signal = WritableSignal::new("a".to_string());
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let scope = SubscriberScope::new(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        signal.subscribe(&scope);

        assert!(!signal.set("a".to_string()));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = WritableSignal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let scope = SubscriberScope::new(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let cleanup = signal.subscribe(&scope);
        // Subscribing twice reuses the edge.
        assert!(signal.subscribe(&scope).ptr_eq(&cleanup));

        signal.set(1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        cleanup.run();
        signal.set(2);
        // Should not have been called again
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = WritableSignal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn setter_writes_through() {
        let signal = WritableSignal::new(1);
        let setter = Setter::new(signal.clone());
        setter.update(|v| v * 10);
        assert_eq!(signal.get_untracked(), 10);
    }
}
