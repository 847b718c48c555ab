//! The live tree the dispatcher mutates.

use crate::error::Result;
use crate::vdom::{EventRef, NodeRef};

/// Namespace of SVG elements.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// What a live node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveKind {
    Element {
        tag: String,
        namespace: Option<String>,
    },
    Text(String),
    Comment(String),
}

/// A live node tree, such as a browser document.
///
/// Node handles are chosen by the caller of the `create_*` methods. Mutations
/// given a handle the platform does not know fail with
/// [`RenderError::UnknownNode`](crate::RenderError::UnknownNode).
pub trait Platform {
    fn create_element(&mut self, node: NodeRef, tag: &str, namespace: Option<&str>) -> Result<()>;

    fn create_text(&mut self, node: NodeRef, text: &str) -> Result<()>;

    /// Insert `node` right after `sibling`, moving it if already attached.
    fn insert_after(&mut self, sibling: NodeRef, node: NodeRef) -> Result<()>;

    /// Insert `node` as the first child of `parent`, moving it if already
    /// attached.
    fn prepend(&mut self, parent: NodeRef, node: NodeRef) -> Result<()>;

    /// Put `new` where `old` is and drop `old`.
    fn replace(&mut self, old: NodeRef, new: NodeRef) -> Result<()>;

    /// Detach `node` and drop it with its subtree.
    fn remove(&mut self, node: NodeRef) -> Result<()>;

    fn set_text(&mut self, node: NodeRef, text: &str) -> Result<()>;

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<()>;

    /// Replace the children of `node` with parsed markup.
    fn set_inner_html(&mut self, node: NodeRef, html: &str) -> Result<()>;

    fn add_listener(&mut self, node: NodeRef, event: &EventRef) -> Result<()>;

    fn remove_listener(&mut self, node: NodeRef, event: &EventRef) -> Result<()>;

    // ---- Queries ----

    fn kind(&self, node: NodeRef) -> Option<LiveKind>;

    fn parent(&self, node: NodeRef) -> Option<NodeRef>;

    fn previous_sibling(&self, node: NodeRef) -> Option<NodeRef>;

    fn children(&self, node: NodeRef) -> Vec<NodeRef>;

    fn attributes(&self, node: NodeRef) -> Vec<(String, String)>;
}

/// Namespace for children created under `parent`.
pub(crate) fn child_namespace<P: Platform + ?Sized>(
    platform: &P,
    parent: Option<NodeRef>,
) -> Option<&'static str> {
    match parent.and_then(|parent| platform.kind(parent)) {
        Some(LiveKind::Element { tag, namespace }) => {
            let inherited = (namespace.as_deref() == Some(SVG_NAMESPACE)).then_some(SVG_NAMESPACE);
            element_child_namespace(&tag, inherited)
        }
        _ => None,
    }
}

/// Namespace for the children of a `tag` element living in `namespace`.
pub(crate) fn element_child_namespace(tag: &str, namespace: Option<&'static str>) -> Option<&'static str> {
    if tag.eq_ignore_ascii_case("foreignObject") {
        None
    } else if tag.eq_ignore_ascii_case("svg") {
        Some(SVG_NAMESPACE)
    } else {
        namespace
    }
}

/// Namespace of a `tag` element created under a parent in `namespace`.
pub(crate) fn element_namespace(tag: &str, namespace: Option<&'static str>) -> Option<&'static str> {
    if tag.eq_ignore_ascii_case("svg") {
        Some(SVG_NAMESPACE)
    } else {
        namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_namespace_propagates_until_foreign_object() {
        assert_eq!(element_namespace("svg", None), Some(SVG_NAMESPACE));
        assert_eq!(element_child_namespace("svg", None), Some(SVG_NAMESPACE));
        assert_eq!(element_child_namespace("g", Some(SVG_NAMESPACE)), Some(SVG_NAMESPACE));
        assert_eq!(element_child_namespace("foreignObject", Some(SVG_NAMESPACE)), None);
        assert_eq!(element_namespace("div", None), None);
    }
}
