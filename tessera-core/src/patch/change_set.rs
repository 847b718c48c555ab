//! Change Sets
//!
//! A change set is one instruction for the live tree: a kind (what sort of
//! thing it touches), an action (what happens to it) and a payload carrying the
//! node handles and values involved. The differ emits them in order; the
//! dispatcher applies each exactly once.

use std::fmt;

use super::attachment::AttachmentRef;
use crate::reactive::Cleanup;
use crate::vdom::{EventRef, NodeRef, NodeRefCell};

/// What a change set touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Component,
    Element,
    Event,
    Attribute,
    Text,
}

/// What happens to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Create,
    Link,
    Attach,
    Mount,
    Update,
    Replace,
    Delete,
    Unmount,
}

/// Data of a change set.
#[derive(Clone)]
pub enum Payload {
    CreateElement {
        node: NodeRef,
        tag: String,
        namespace: Option<&'static str>,
    },
    CreateText {
        node: NodeRef,
        text: String,
    },
    /// An existing live node was adopted by a VNode.
    Link {
        node: NodeRef,
    },
    Attach {
        node: NodeRef,
        at: AttachmentRef,
    },
    Replace {
        old: NodeRef,
        new: NodeRef,
    },
    Delete {
        node: NodeRef,
    },
    SetText {
        node: NodeRef,
        text: String,
    },
    SetAttribute {
        node: NodeRef,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: NodeRef,
        name: String,
    },
    InnerHtml {
        node: NodeRef,
        html: String,
    },
    Listener {
        node: NodeRef,
        event: EventRef,
    },
    /// Lifecycle callbacks, run after the queue is drained. Empty for
    /// `Unmount`, whose hooks run before it.
    Lifecycle {
        hooks: Vec<Cleanup>,
    },
    /// Fill (or clear) an element's node ref.
    NodeRef {
        cell: NodeRefCell,
        node: Option<NodeRef>,
    },
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::CreateElement { node, tag, .. } => write!(f, "CreateElement({node}, <{tag}>)"),
            Payload::CreateText { node, text } => write!(f, "CreateText({node}, {text:?})"),
            Payload::Link { node } => write!(f, "Link({node})"),
            Payload::Attach { node, at } => write!(f, "Attach({node}, {at:?})"),
            Payload::Replace { old, new } => write!(f, "Replace({old} -> {new})"),
            Payload::Delete { node } => write!(f, "Delete({node})"),
            Payload::SetText { node, text } => write!(f, "SetText({node}, {text:?})"),
            Payload::SetAttribute { node, name, value } => {
                write!(f, "SetAttribute({node}, {name}={value:?})")
            }
            Payload::RemoveAttribute { node, name } => write!(f, "RemoveAttribute({node}, {name})"),
            Payload::InnerHtml { node, .. } => write!(f, "InnerHtml({node})"),
            Payload::Listener { node, event } => write!(f, "Listener({node}, {})", event.name),
            Payload::Lifecycle { hooks } => write!(f, "Lifecycle({})", hooks.len()),
            Payload::NodeRef { node, .. } => write!(f, "NodeRef({node:?})"),
        }
    }
}

/// One ordered instruction for the live tree.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub kind: ChangeKind,
    pub action: ChangeAction,
    pub payload: Payload,
}

impl ChangeSet {
    pub fn new(kind: ChangeKind, action: ChangeAction, payload: Payload) -> Self {
        Self {
            kind,
            action,
            payload,
        }
    }

    pub(crate) fn create_element(node: NodeRef, tag: &str, namespace: Option<&'static str>) -> Self {
        Self::new(
            ChangeKind::Element,
            ChangeAction::Create,
            Payload::CreateElement {
                node,
                tag: tag.to_string(),
                namespace,
            },
        )
    }

    pub(crate) fn create_text(node: NodeRef, text: &str) -> Self {
        Self::new(
            ChangeKind::Text,
            ChangeAction::Create,
            Payload::CreateText {
                node,
                text: text.to_string(),
            },
        )
    }

    pub(crate) fn link(kind: ChangeKind, node: NodeRef) -> Self {
        Self::new(kind, ChangeAction::Link, Payload::Link { node })
    }

    pub(crate) fn attach(kind: ChangeKind, node: NodeRef, at: AttachmentRef) -> Self {
        Self::new(kind, ChangeAction::Attach, Payload::Attach { node, at })
    }

    pub(crate) fn replace(kind: ChangeKind, old: NodeRef, new: NodeRef) -> Self {
        Self::new(kind, ChangeAction::Replace, Payload::Replace { old, new })
    }

    pub(crate) fn delete(kind: ChangeKind, node: NodeRef) -> Self {
        Self::new(kind, ChangeAction::Delete, Payload::Delete { node })
    }

    pub(crate) fn set_text(node: NodeRef, text: &str) -> Self {
        Self::new(
            ChangeKind::Text,
            ChangeAction::Update,
            Payload::SetText {
                node,
                text: text.to_string(),
            },
        )
    }

    pub(crate) fn set_attribute(action: ChangeAction, node: NodeRef, name: &str, value: &str) -> Self {
        Self::new(
            ChangeKind::Attribute,
            action,
            Payload::SetAttribute {
                node,
                name: name.to_string(),
                value: value.to_string(),
            },
        )
    }

    pub(crate) fn remove_attribute(node: NodeRef, name: &str) -> Self {
        Self::new(
            ChangeKind::Attribute,
            ChangeAction::Delete,
            Payload::RemoveAttribute {
                node,
                name: name.to_string(),
            },
        )
    }

    pub(crate) fn inner_html(node: NodeRef, html: &str) -> Self {
        Self::new(
            ChangeKind::Element,
            ChangeAction::Update,
            Payload::InnerHtml {
                node,
                html: html.to_string(),
            },
        )
    }

    pub(crate) fn add_listener(node: NodeRef, event: EventRef) -> Self {
        Self::new(
            ChangeKind::Event,
            ChangeAction::Create,
            Payload::Listener { node, event },
        )
    }

    pub(crate) fn remove_listener(node: NodeRef, event: EventRef) -> Self {
        Self::new(
            ChangeKind::Event,
            ChangeAction::Delete,
            Payload::Listener { node, event },
        )
    }

    pub(crate) fn lifecycle(action: ChangeAction, hooks: Vec<Cleanup>) -> Self {
        Self::new(ChangeKind::Component, action, Payload::Lifecycle { hooks })
    }

    pub(crate) fn node_ref(action: ChangeAction, cell: NodeRefCell, node: Option<NodeRef>) -> Self {
        Self::new(ChangeKind::Element, action, Payload::NodeRef { cell, node })
    }

    /// The live node this change set acts on, if any.
    pub fn target(&self) -> Option<NodeRef> {
        match &self.payload {
            Payload::CreateElement { node, .. }
            | Payload::CreateText { node, .. }
            | Payload::Link { node }
            | Payload::Attach { node, .. }
            | Payload::Delete { node }
            | Payload::SetText { node, .. }
            | Payload::SetAttribute { node, .. }
            | Payload::RemoveAttribute { node, .. }
            | Payload::InnerHtml { node, .. }
            | Payload::Listener { node, .. } => Some(*node),
            Payload::Replace { new, .. } => Some(*new),
            Payload::NodeRef { node, .. } => *node,
            Payload::Lifecycle { .. } => None,
        }
    }
}
