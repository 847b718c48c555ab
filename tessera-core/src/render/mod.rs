//! Rendering
//!
//! The reconciler, the per-render context and hooks, island bookkeeping and
//! server-side markup serialization.

mod context;
mod hooks;
mod island;
mod markup;
mod reconcile;

pub use context::{Commit, RenderContext};
pub use island::{Island, IslandManifest, MANIFEST_SCRIPT_ID};
pub use markup::{escape_attr, escape_text, render_to_string, render_to_string_async, to_markup, RenderOutput};
pub use reconcile::{create, create_async, update};

pub(crate) use markup::is_void;
