//! Cleanup handles.
//!
//! A [`Cleanup`] wraps a teardown closure (a signal unsubscribe, an effect
//! disposer, a user `on_cleanup` hook). The closure runs at most once no matter
//! how many clones of the handle exist or how many owners try to run it, so a
//! component removed by its parent and disposed directly still unsubscribes
//! exactly once.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

type CleanupFn = Box<dyn FnOnce() + Send>;

/// A run-once teardown closure.
#[derive(Clone)]
pub struct Cleanup {
    inner: Arc<Mutex<Option<CleanupFn>>>,
}

impl Cleanup {
    /// Wrap a teardown closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(f)))),
        }
    }

    /// A cleanup that does nothing and is already spent.
    pub fn noop() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Run the closure if it has not run yet.
    ///
    /// Returns `true` if this call ran it. A panic inside the closure is caught
    /// and logged so that sibling cleanups still run.
    pub fn run(&self) -> bool {
        // Take the closure first so the lock is released before user code runs.
        let f = self.inner.lock().take();
        let Some(f) = f else {
            return false;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            tracing::error!(message = panic_message(&payload), "cleanup panicked");
        }
        true
    }

    /// Whether the closure has already run.
    pub fn is_done(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Whether two handles wrap the same closure.
    pub fn ptr_eq(&self, other: &Cleanup) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Run every cleanup in isolation. Returns how many actually ran.
pub fn run_all<I>(cleanups: I) -> usize
where
    I: IntoIterator<Item = Cleanup>,
{
    cleanups.into_iter().filter(|cleanup| cleanup.run()).count()
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn cleanup_runs_once() {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();

        let cleanup = Cleanup::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let other = cleanup.clone();

        assert!(cleanup.run());
        assert!(!other.run());
        assert!(!cleanup.run());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(other.is_done());
    }

    #[test]
    fn panicking_cleanup_does_not_stop_siblings() {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();

        let cleanups = vec![
            Cleanup::new(|| panic!("boom")),
            Cleanup::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        ];

        assert_eq!(run_all(cleanups), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_is_already_done() {
        let cleanup = Cleanup::noop();
        assert!(cleanup.is_done());
        assert!(!cleanup.run());
    }
}
