//! Island Hydration
//!
//! Client-side counterpart of server island wrapping: locate island
//! boundaries in live markup and resume each island as its own root.

mod walker;

pub use walker::{find_manifest, hydrate_islands, HydratedIsland};
