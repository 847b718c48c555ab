//! Render Options
//!
//! The "global options" handed to every `create`/`update` call. They are plain
//! data so hosts can load them from JSON or TOML next to the rest of their
//! configuration.

use serde::{Deserialize, Serialize};

/// Where a render tree is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Markup string output. Islands are wrapped with comment markers.
    #[default]
    Server,

    /// Live DOM output through a [`Platform`](crate::patch::Platform).
    /// The reconciler records replacements and removals for the differ.
    Client,
}

/// Options shared by every reconciliation in one render context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output target.
    pub target: Target,

    /// Wrap registered islands with `start_`/`end_` comment markers when
    /// rendering on the server.
    pub islands: bool,

    /// Maximum nesting of components and elements before rendering fails
    /// with [`RenderError::DepthExceeded`](crate::RenderError::DepthExceeded).
    pub max_depth: usize,

    /// Prefix of island marker ids (`<prefix>_<n>`).
    pub marker_prefix: String,
}

impl RenderOptions {
    /// Options for server rendering.
    pub fn server() -> Self {
        Self::default()
    }

    /// Options for client rendering and hydration.
    pub fn client() -> Self {
        Self {
            target: Target::Client,
            ..Self::default()
        }
    }

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Disable island wrapping.
    pub fn without_islands(mut self) -> Self {
        self.islands = false;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target: Target::Server,
            islands: true,
            max_depth: 512,
            marker_prefix: "island".to_string(),
        }
    }
}
