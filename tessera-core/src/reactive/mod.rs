//! Reactive Primitives
//!
//! This module implements the signal graph: writable signals, computed
//! signals and effects. These primitives decide *when* a part of the render
//! tree has to run again.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`WritableSignal`] is a container for mutable state. When its value is
//! read while a subscriber scope is active (a computed signal, an effect, a
//! component render or a text binding), the scope is subscribed to the signal.
//! When the value changes, every subscriber is notified. Storing an equal value
//! notifies nobody.
//!
//! ## Computed Signals
//!
//! A [`ComputedSignal`] is a derived value that recomputes eagerly whenever one
//! of its dependencies changes, and notifies its own subscribers only if the
//! derived value differs from the cached one.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation that re-runs whenever its
//! dependencies change. [`effect`] returns its disposer as a [`Cleanup`].
//!
//! # Implementation Notes
//!
//! Dependencies are discovered automatically through a thread-local stack of
//! active scopes (see [`ReactiveContext`]). A subscriber that depends both on
//! a signal and on a computed signal derived from it is notified once per
//! change, through the computed signal.

mod cleanup;
mod computed;
mod context;
mod effect;
mod signal;
mod source;
mod subscriber;

pub use cleanup::{run_all, Cleanup};
pub use computed::ComputedSignal;
pub use context::{untracked, ReactiveContext, TrackedFuture};
pub use effect::{effect, Effect};
pub use signal::{Setter, WritableSignal};
pub use source::{batch, SourceId};
pub use subscriber::{SubscriberId, SubscriberScope};

/// A reactive value that can be rendered as text.
///
/// Text nodes built from a signal hold one of these and re-read it whenever
/// it changes, patching only that text.
pub trait TextSource: Send + Sync {
    /// Identifier of the underlying signal.
    fn source_id(&self) -> SourceId;

    /// Read the current value as text, tracking the read.
    fn read_text(&self) -> String;
}

/// Create a writable signal.
pub fn signal<T>(initial: T) -> WritableSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    WritableSignal::new(initial)
}

/// Create a computed signal from `compute`.
pub fn computed<T, F>(compute: F) -> ComputedSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    ComputedSignal::new(compute)
}
