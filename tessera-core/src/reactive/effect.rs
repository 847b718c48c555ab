//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously.
//!
//! 3. Each run re-tracks its reads; signals that are no longer read are
//!    unsubscribed.
//!
//! An effect stays subscribed until it is disposed, even if every handle is
//! dropped. [`Effect::disposer`] returns the teardown as a [`Cleanup`] so an
//! owner (a component) can run it on removal.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::cleanup::Cleanup;
use super::subscriber::{SubscriberId, SubscriberScope};

#[derive(Default)]
struct EffectState {
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use tessera_core::reactive::{Effect, WritableSignal};
///
/// let count = WritableSignal::new(0);
/// let reader = count.clone();
/// let effect = Effect::new(move || {
///     let _ = reader.get();
/// });
///
/// count.set(5);
/// assert_eq!(effect.run_count(), 2);
/// effect.dispose();
/// ```
pub struct Effect {
    /// The scope the effect function runs in.
    scope: Arc<SubscriberScope>,

    state: Arc<EffectState>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let state = Arc::new(EffectState::default());
        let scope_state = state.clone();
        let scope = SubscriberScope::new(move |scope| {
            if scope_state.disposed.load(Ordering::SeqCst) {
                return;
            }
            scope.run_tracked(&run);
            scope_state.run_count.fetch_add(1, Ordering::SeqCst);
        });

        Self { scope, state }
    }

    /// The subscriber ID identifying this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.scope.id()
    }

    /// Execute the effect function, re-tracking its dependencies.
    pub fn execute(&self) {
        if !self.is_disposed() {
            self.scope.notify();
        }
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again and holds no
    /// subscriptions.
    pub fn dispose(&self) {
        self.state.disposed.store(true, Ordering::SeqCst);
        self.scope.dispose();
    }

    /// A run-once cleanup that disposes this effect.
    pub fn disposer(&self) -> Cleanup {
        let state = self.state.clone();
        let scope = self.scope.clone();
        Cleanup::new(move || {
            state.disposed.store(true, Ordering::SeqCst);
            scope.dispose();
        })
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.state.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.scope.dependency_count()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            scope: Arc::clone(&self.scope),
            state: Arc::clone(&self.state),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.subscriber_id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect and return its disposer.
pub fn effect<F>(run: F) -> Cleanup
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(run).disposer()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::WritableSignal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_lazy(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_signal_changes() {
        let signal = WritableSignal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_clone = seen.clone();

        let reader = signal.clone();
        let effect = Effect::new(move || {
            seen_clone.store(reader.get(), Ordering::SeqCst);
        });

        assert_eq!(seen.load(Ordering::SeqCst), 0);
        signal.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = WritableSignal::new(0);
        let reader = signal.clone();
        let effect = Effect::new(move || {
            reader.get();
        });

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn disposer_runs_once() {
        let signal = WritableSignal::new(0);
        let reader = signal.clone();
        let disposer = effect(move || {
            reader.get();
        });
        assert_eq!(signal.subscriber_count(), 1);

        assert!(disposer.run());
        assert!(!disposer.run());
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.subscriber_id(), effect2.subscriber_id());
        assert_eq!(effect2.run_count(), 1);

        effect1.execute();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
