//! Error types shared by the reconciler, the differ and the island walker.
//!
//! Every error here is raised synchronously at the point of violation and is
//! returned to the caller of the render, hydrate or commit entry point. None of
//! them are retried: they point at a bug in component code or at damaged
//! server markup.

use thiserror::Error;

use crate::vdom::NodeRef;

/// Errors produced while rendering, diffing or hydrating a tree.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A synchronous render path reached a component whose render function
    /// may suspend. Only the first server render awaits such components.
    #[error("component `{component}` may suspend but was rendered on a synchronous path")]
    InvalidAsyncRender { component: String },

    /// A hook was called while no component was rendering.
    #[error("`{hook}` was called outside of a component render")]
    MissingScope { hook: &'static str },

    /// No live parent or sibling could be found to anchor a render.
    #[error("cannot resolve an attachment point: {0}")]
    AttachmentResolution(String),

    /// An island start marker without a matching end marker, or the reverse.
    #[error("orphan island marker `{marker}`: {reason}")]
    OrphanIslandMarker { marker: String, reason: &'static str },

    /// The markup references an island whose source path was never registered.
    #[error("no island component is registered for `{0}`")]
    UnknownIsland(String),

    /// The island manifest has no entry for a marker found in the markup.
    #[error("island manifest has no entry for marker `{0}`")]
    MissingIslandData(String),

    /// The island manifest could not be encoded or decoded.
    #[error("invalid island manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Markup handed to the in-memory document could not be parsed.
    #[error("invalid markup: {0}")]
    Markup(String),

    /// A platform node handle no longer refers to a live node.
    #[error("unknown platform node {0}")]
    UnknownNode(NodeRef),

    /// Component or element nesting went past the configured limit.
    #[error("render depth exceeded the limit of {0}")]
    DepthExceeded(usize),

    /// An error returned by user component code.
    #[error("component error: {0}")]
    Component(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RenderError {
    /// Wrap an arbitrary error raised inside a render function.
    pub fn component<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Component(err.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
