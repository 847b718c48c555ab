//! Tessera Core
//!
//! This crate provides the core runtime for the Tessera reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (writable signals, computed signals, effects)
//! - A persistent VNode tree with identity-preserving reconciliation
//! - Change sets that project a reconciled tree onto a live DOM
//! - Server rendering with island markers, and client hydration of islands
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signal graph and dependency tracking
//! - `vdom`: Declarative nodes, VNodes and component registration
//! - `render`: Reconciler, render context, hooks and markup output
//! - `patch`: Differ, dispatcher and client roots (`Mount`)
//! - `hydrate`: Island hydration walker
//! - `dom`: In-memory DOM used by tests and hosts without a browser
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_core::prelude::*;
//!
//! let registry = ComponentRegistry::new();
//! let counter = registry.register("Counter", |cx, _props| {
//!     let count = cx.signal(0)?;
//!     let shown = count.get();
//!     Ok(el("button")
//!         .on("click", move |_| {
//!             count.update(|n| n + 1);
//!         })
//!         .text(shown.to_string())
//!         .into())
//! });
//!
//! // Server
//! let output = render_to_string(&RenderContext::server(registry.clone()), counter.node().into())?;
//! assert_eq!(output.html, "<button>0</button>");
//!
//! // Client
//! let doc = Arc::new(Mutex::new(Document::new()));
//! let root = doc.lock().root();
//! let mount = Mount::new(doc.clone(), RenderContext::client(registry));
//! mount.render(counter.node().into(), root)?;
//! ```

pub mod dom;
pub mod error;
pub mod hydrate;
pub mod options;
pub mod patch;
pub mod reactive;
pub mod render;
pub mod vdom;

pub use error::{RenderError, Result};
pub use options::{RenderOptions, Target};

/// Commonly used items.
pub mod prelude {
    pub use std::sync::Arc;

    pub use parking_lot::Mutex;

    pub use crate::dom::Document;
    pub use crate::error::{RenderError, Result};
    pub use crate::hydrate::{find_manifest, hydrate_islands, HydratedIsland};
    pub use crate::options::{RenderOptions, Target};
    pub use crate::patch::{AttachmentRef, Mount, Platform};
    pub use crate::reactive::{computed, effect, signal, untracked, Cleanup, ComputedSignal, WritableSignal};
    pub use crate::render::{render_to_string, render_to_string_async, IslandManifest, RenderContext, RenderOutput};
    pub use crate::vdom::{
        el, fragment, template, Component, ComponentNode, ComponentRegistry, Key, Node, NodeRef, NodeRefCell,
        PropValue, Props,
    };
}
