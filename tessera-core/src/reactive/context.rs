//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (e.g., running a computed signal, an
//! effect or a component render), we push the subscriber onto the stack. When
//! the computation completes, we pop it. An untracked region pushes an empty
//! entry so reads inside it register nothing.
//!
//! Asynchronous renders never leave an entry on the stack across an `.await`:
//! [`TrackedFuture`] enters the context only for the duration of each `poll`,
//! so tasks interleaved on the same worker thread never see each other's scope.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::source::Source;
use super::subscriber::{SubscriberId, SubscriberScope};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Arc<SubscriberScope>>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics or returns early with an error.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given scope.
    ///
    /// While this context is active, any signals that are read will
    /// register the scope as a dependent.
    pub fn enter(scope: Arc<SubscriberScope>) -> Self {
        let subscriber_id = Some(scope.id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(scope)));
        Self { subscriber_id }
    }

    /// Enter a region where reads are not tracked.
    pub fn untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { subscriber_id: None }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        Self::current_scope().map(|scope| scope.id())
    }

    pub(crate) fn current_scope() -> Option<Arc<SubscriberScope>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Record a read of `source` by the current scope.
    pub(crate) fn track(source: Arc<dyn Source>) {
        if let Some(scope) = Self::current_scope() {
            scope.track(source);
        }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.map(|scope| scope.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

/// Run `f` without registering any dependency.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::untracked();
    f()
}

/// A future that tracks reads against a scope only while it is being polled.
pub struct TrackedFuture<F> {
    scope: Option<Arc<SubscriberScope>>,
    inner: Pin<Box<F>>,
}

impl<F: Future> TrackedFuture<F> {
    /// Wrap `inner`; reads during its polls are attributed to `scope`.
    pub fn new(scope: Option<Arc<SubscriberScope>>, inner: F) -> Self {
        Self {
            scope,
            inner: Box::pin(inner),
        }
    }
}

impl<F: Future> Future for TrackedFuture<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _ctx = match &self.scope {
            Some(scope) => ReactiveContext::enter(scope.clone()),
            None => ReactiveContext::untracked(),
        };
        self.inner.as_mut().poll(cx)
    }
}
