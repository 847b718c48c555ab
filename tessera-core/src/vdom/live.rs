//! Handles to live platform nodes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque handle of a node owned by a [`Platform`](crate::patch::Platform).
///
/// Handles are allocated by whoever asks the platform to create a node (the
/// differ or the markup parser), so change sets can refer to nodes that do not
/// exist yet when the change set is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u64);

impl NodeRef {
    /// Allocate a new unique handle.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared slot that receives the live node of an element once it is mounted.
#[derive(Debug, Clone, Default)]
pub struct NodeRefCell {
    inner: Arc<Mutex<Option<NodeRef>>>,
}

impl NodeRefCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mounted node, if any.
    pub fn get(&self) -> Option<NodeRef> {
        *self.inner.lock()
    }

    pub(crate) fn set(&self, node: Option<NodeRef>) {
        *self.inner.lock() = node;
    }
}
