//! In-Memory DOM
//!
//! A [`Platform`](crate::patch::Platform) backed by a node arena, with a
//! markup parser so server output can be loaded and hydrated without a
//! browser.

mod document;
mod parse;

pub use document::Document;
