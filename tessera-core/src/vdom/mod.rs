//! VNode Model
//!
//! Declarative input ([`Node`]) and the persistent tree built from it
//! ([`VNode`]), plus component definitions and their registry.

mod component;
mod key;
mod live;
mod node;
mod props;
mod vnode;

pub use component::{BoxFuture, Component, ComponentId, ComponentRegistry, RenderMode};
pub use key::Key;
pub use live::{NodeRef, NodeRefCell};
pub use node::{
    el, fragment, template, ComponentNode, ElementNode, FragmentNode, Node, SignalRef, SlotNode,
    TemplateNode,
};
pub use props::{Attributes, Event, EventRef, Listener, PropValue, Props, INNER_HTML};
pub use vnode::{ComponentMode, VNode, VNodeType};

pub(crate) use component::RenderFn;
pub(crate) use vnode::{ComponentData, ElementData, VNodeKind, WeakVNode};
