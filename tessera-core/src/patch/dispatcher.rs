//! Dispatcher
//!
//! Drains queued change sets in emission order and applies each through the
//! [`Platform`]. Handlers are keyed by `(kind, action)` and never call back
//! into the differ.
//!
//! Lifecycle callbacks carried by `Component/Mount` change sets are collected
//! while draining and run once the queue is empty, so user code never
//! observes a half-applied tree. `Component/Unmount` change sets arrive
//! empty: their hooks ran before the drain started.

use std::collections::VecDeque;

use super::attachment::AttachmentRef;
use super::change_set::{ChangeAction, ChangeKind, ChangeSet, Payload};
use super::platform::Platform;
use crate::error::Result;
use crate::reactive::{run_all, Cleanup};

/// What one drain applied, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: Vec<(ChangeKind, ChangeAction)>,
}

impl DrainReport {
    pub fn count(&self) -> usize {
        self.applied.len()
    }

    /// Number of applied change sets with this kind and action.
    pub fn count_of(&self, kind: ChangeKind, action: ChangeAction) -> usize {
        self.applied
            .iter()
            .filter(|applied| **applied == (kind, action))
            .count()
    }

    pub fn contains(&self, kind: ChangeKind, action: ChangeAction) -> bool {
        self.count_of(kind, action) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// FIFO queue of change sets.
#[derive(Debug, Default)]
pub struct Dispatcher {
    queue: VecDeque<ChangeSet>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, change: ChangeSet) {
        self.queue.push_back(change);
    }

    pub fn enqueue_all<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = ChangeSet>,
    {
        self.queue.extend(changes);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply every queued change set, then run the collected lifecycle hooks.
    pub fn drain<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Result<DrainReport> {
        let (report, hooks) = self.drain_deferred(platform)?;
        run_all(hooks);
        Ok(report)
    }

    /// Apply every queued change set and hand back the lifecycle hooks.
    ///
    /// On error the rest of the queue is discarded.
    pub fn drain_deferred<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
    ) -> Result<(DrainReport, Vec<Cleanup>)> {
        let mut report = DrainReport::default();
        let mut hooks = Vec::new();

        while let Some(change) = self.queue.pop_front() {
            tracing::trace!(kind = ?change.kind, action = ?change.action, payload = ?change.payload, "apply");
            if let Err(err) = apply(platform, change.kind, change.action, change.payload, &mut hooks) {
                self.queue.clear();
                return Err(err);
            }
            report.applied.push((change.kind, change.action));
        }

        Ok((report, hooks))
    }
}

fn apply<P: Platform + ?Sized>(
    platform: &mut P,
    kind: ChangeKind,
    action: ChangeAction,
    payload: Payload,
    hooks: &mut Vec<Cleanup>,
) -> Result<()> {
    use ChangeAction as A;
    use ChangeKind as K;

    match (kind, action, payload) {
        (K::Element, A::Create, Payload::CreateElement { node, tag, namespace }) => {
            platform.create_element(node, &tag, namespace)
        }
        (K::Text, A::Create, Payload::CreateText { node, text }) => platform.create_text(node, &text),
        (K::Element | K::Text, A::Link, Payload::Link { .. }) => Ok(()),
        (K::Element | K::Text, A::Attach, Payload::Attach { node, at }) => match at {
            AttachmentRef::Sibling(sibling) => platform.insert_after(sibling, node),
            AttachmentRef::Parent(parent) => platform.prepend(parent, node),
        },
        (K::Element | K::Text, A::Replace, Payload::Replace { old, new }) => platform.replace(old, new),
        (K::Element | K::Text, A::Delete, Payload::Delete { node }) => platform.remove(node),
        (K::Text, A::Update, Payload::SetText { node, text }) => platform.set_text(node, &text),
        (K::Element, A::Update, Payload::InnerHtml { node, html }) => platform.set_inner_html(node, &html),
        (K::Element, A::Mount | A::Unmount, Payload::NodeRef { cell, node }) => {
            cell.set(node);
            Ok(())
        }
        (K::Attribute, A::Create | A::Update, Payload::SetAttribute { node, name, value }) => {
            platform.set_attribute(node, &name, &value)
        }
        (K::Attribute, A::Delete, Payload::RemoveAttribute { node, name }) => {
            platform.remove_attribute(node, &name)
        }
        (K::Event, A::Create, Payload::Listener { node, event }) => platform.add_listener(node, &event),
        (K::Event, A::Delete, Payload::Listener { node, event }) => {
            platform.remove_listener(node, &event)
        }
        (K::Component, A::Mount | A::Unmount, Payload::Lifecycle { hooks: callbacks }) => {
            hooks.extend(callbacks);
            Ok(())
        }
        (kind, action, payload) => {
            tracing::warn!(?kind, ?action, ?payload, "change set with no handler ignored");
            Ok(())
        }
    }
}
