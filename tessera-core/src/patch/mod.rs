//! Change Sets and the Client Runtime
//!
//! The differ turns a reconciled VNode tree into an ordered list of
//! [`ChangeSet`]s; the [`Dispatcher`] applies them to a [`Platform`] in FIFO
//! order. [`Mount`] ties both to a render context for a client root.

mod attachment;
mod change_set;
mod differ;
mod dispatcher;
mod mount;
mod platform;

pub use attachment::AttachmentRef;
pub use change_set::{ChangeAction, ChangeKind, ChangeSet, Payload};
pub use differ::Differ;
pub use dispatcher::{Dispatcher, DrainReport};
pub use mount::Mount;
pub use platform::{LiveKind, Platform, SVG_NAMESPACE};

pub(crate) use platform::{child_namespace, element_child_namespace, element_namespace};
