//! Insertion-point cursor.
//!
//! Text and fragment VNodes keep no handle to their live parent, so the
//! differ threads an [`AttachmentRef`] through every sibling list instead:
//! each attached node is placed at the cursor, then the cursor moves past it.

use super::platform::Platform;
use crate::error::{RenderError, Result};
use crate::vdom::NodeRef;

/// Where the next node goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentRef {
    /// Right after this live node.
    Sibling(NodeRef),
    /// First child of this live node; no sibling has been placed yet.
    Parent(NodeRef),
}

impl AttachmentRef {
    /// Move the cursor past `node`, which was just placed at it.
    pub fn advance(&mut self, node: NodeRef) {
        *self = AttachmentRef::Sibling(node);
    }

    pub fn node(&self) -> NodeRef {
        match self {
            AttachmentRef::Sibling(node) | AttachmentRef::Parent(node) => *node,
        }
    }

    /// The cursor that places a node where `anchor` currently is.
    pub fn before<P: Platform + ?Sized>(platform: &P, anchor: NodeRef) -> Result<Self> {
        if let Some(previous) = platform.previous_sibling(anchor) {
            return Ok(AttachmentRef::Sibling(previous));
        }
        match platform.parent(anchor) {
            Some(parent) => Ok(AttachmentRef::Parent(parent)),
            None => Err(RenderError::AttachmentResolution(format!(
                "{anchor} has neither a previous sibling nor a parent"
            ))),
        }
    }

    /// The cursor that appends to `parent`.
    pub fn append<P: Platform + ?Sized>(platform: &P, parent: NodeRef) -> Self {
        match platform.children(parent).last() {
            Some(last) => AttachmentRef::Sibling(*last),
            None => AttachmentRef::Parent(parent),
        }
    }

    /// The live parent the cursor inserts into.
    pub fn container<P: Platform + ?Sized>(&self, platform: &P) -> Option<NodeRef> {
        match self {
            AttachmentRef::Parent(parent) => Some(*parent),
            AttachmentRef::Sibling(sibling) => platform.parent(*sibling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn cursor_advances() {
        let parent = NodeRef::new();
        let child = NodeRef::new();
        let mut at = AttachmentRef::Parent(parent);
        at.advance(child);
        assert_eq!(at, AttachmentRef::Sibling(child));
        assert_eq!(at.node(), child);
    }

    #[test]
    fn resolves_against_live_tree() {
        let doc = Document::from_html("<ul><li>a</li><li>b</li></ul>").unwrap();
        let ul = doc.children(doc.root())[0];
        let items = doc.children(ul);

        assert_eq!(AttachmentRef::before(&doc, items[0]).unwrap(), AttachmentRef::Parent(ul));
        assert_eq!(
            AttachmentRef::before(&doc, items[1]).unwrap(),
            AttachmentRef::Sibling(items[0])
        );
        assert_eq!(AttachmentRef::append(&doc, ul), AttachmentRef::Sibling(items[1]));
        assert_eq!(AttachmentRef::Sibling(items[0]).container(&doc), Some(ul));
    }

    #[test]
    fn detached_anchor_cannot_be_resolved() {
        let doc = Document::new();
        let err = AttachmentRef::before(&doc, doc.root()).unwrap_err();
        assert!(matches!(err, RenderError::AttachmentResolution(_)));
    }
}
