//! Declarative Nodes
//!
//! A [`Node`] is the input of the reconciler: a plain description of what a
//! component wants to render. Nodes are cheap to clone and are rebuilt on
//! every render; the reconciler folds them into the persistent
//! [`VNode`](super::VNode) tree.
//!
//! # Builders
//!
//! ```rust
//! use tessera_core::vdom::{el, fragment, Node};
//!
//! let list: Node = el("ul")
//!     .attr("class", "todo")
//!     .children((1..=3).map(|n| el("li").key(n).text(format!("item {n}"))))
//!     .into();
//! let page = fragment([list, "footer".into()]);
//! ```

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::component::Component;
use super::key::Key;
use super::live::NodeRefCell;
use super::props::{Attributes, Event, EventRef, PropValue, Props, INNER_HTML};
use crate::reactive::{ComputedSignal, TextSource, WritableSignal};

/// A declarative node.
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Explicitly rendered nothing.
    #[default]
    Empty,

    /// Booleans render nothing, so `cond && node` style code works.
    Bool(bool),

    /// Escaped text.
    Text(String),

    /// Text written to markup without escaping. Only used for generated
    /// island boundary comments.
    Raw(String),

    /// Text bound to a signal; updates patch only this text.
    Dynamic(SignalRef),

    Element(ElementNode),
    Component(ComponentNode),
    Fragment(FragmentNode),

    /// Literal template fragments interleaved with interpolated nodes.
    Template(TemplateNode),

    /// Children slot of an island.
    Slot(SlotNode),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub(crate) fn raw(value: impl Into<String>) -> Self {
        Node::Raw(value.into())
    }

    /// Key of the node, if it carries one.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Element(el) => el.key.as_ref(),
            Node::Component(c) => c.key.as_ref(),
            Node::Fragment(f) => f.key.as_ref(),
            _ => None,
        }
    }

    /// Whether the node renders nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty | Node::Bool(_))
    }
}

/// Shared handle to a signal rendered as text.
#[derive(Clone)]
pub struct SignalRef(pub Arc<dyn TextSource>);

impl SignalRef {
    pub fn read(&self) -> String {
        self.0.read_text()
    }
}

impl fmt::Debug for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalRef").field(&self.0.source_id()).finish()
    }
}

/// An element with a string tag.
#[derive(Debug, Clone, Default)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Attributes,
    pub events: SmallVec<[EventRef; 2]>,
    pub children: Vec<Node>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRefCell>,
}

/// Start building an element.
pub fn el(tag: impl Into<String>) -> ElementNode {
    ElementNode {
        tag: tag.into(),
        ..ElementNode::default()
    }
}

impl ElementNode {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Attach a listener for `name`.
    pub fn on<F>(mut self, name: &str, listener: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.push(EventRef::new(name, listener));
        self
    }

    /// Attach an existing listener, keeping its identity across renders.
    pub fn on_ref(mut self, event: EventRef) -> Self {
        self.events.push(event);
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(Node::Text(value.into()))
    }

    /// Receive the live element once it is mounted.
    pub fn node_ref(mut self, cell: NodeRefCell) -> Self {
        self.node_ref = Some(cell);
        self
    }

    /// Replace the children with raw, unescaped markup.
    pub fn inner_html(self, html: impl Into<String>) -> Self {
        self.attr(INNER_HTML, html.into())
    }
}

/// A component invocation.
#[derive(Debug, Clone)]
pub struct ComponentNode {
    pub component: Component,
    pub props: Props,
    pub key: Option<Key>,
}

impl ComponentNode {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            props: Props::default(),
            key: None,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.values.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.props.children.push(child.into());
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A list of sibling nodes without a wrapping element.
#[derive(Debug, Clone, Default)]
pub struct FragmentNode {
    pub children: Vec<Node>,
    pub key: Option<Key>,
}

/// Build a fragment.
pub fn fragment<I>(children: I) -> Node
where
    I: IntoIterator,
    I::Item: Into<Node>,
{
    Node::Fragment(FragmentNode {
        children: children.into_iter().map(Into::into).collect(),
        key: None,
    })
}

/// Literal template strings with nodes between them.
#[derive(Debug, Clone, Default)]
pub struct TemplateNode {
    pub templates: Vec<String>,
    pub nodes: Vec<Node>,
}

impl TemplateNode {
    /// Interleave the literal parts with the interpolated nodes.
    ///
    /// Empty literal parts produce no child, so the shape only depends on the
    /// template itself.
    pub fn into_children(self) -> Vec<Node> {
        let mut children = Vec::with_capacity(self.templates.len() + self.nodes.len());
        let mut nodes = self.nodes.into_iter();
        for literal in self.templates {
            if !literal.is_empty() {
                children.push(Node::Text(literal));
            }
            if let Some(node) = nodes.next() {
                children.push(node);
            }
        }
        children.extend(nodes);
        children
    }
}

/// Build a template node.
pub fn template<I, N>(templates: I, nodes: N) -> Node
where
    I: IntoIterator,
    I::Item: Into<String>,
    N: IntoIterator,
    N::Item: Into<Node>,
{
    Node::Template(TemplateNode {
        templates: templates.into_iter().map(Into::into).collect(),
        nodes: nodes.into_iter().map(Into::into).collect(),
    })
}

/// The children slot of an island, delimited by `start_<id>`/`end_<id>`
/// comments in server markup.
#[derive(Debug, Clone, Default)]
pub struct SlotNode {
    pub id: String,
    pub children: Vec<Node>,
}

impl From<ElementNode> for Node {
    fn from(el: ElementNode) -> Self {
        Node::Element(el)
    }
}

impl From<ComponentNode> for Node {
    fn from(c: ComponentNode) -> Self {
        Node::Component(c)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Text(n.to_string())
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Text(n.to_string())
    }
}

impl From<usize> for Node {
    fn from(n: usize) -> Self {
        Node::Text(n.to_string())
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Text(f.to_string())
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<Vec<Node>> for Node {
    fn from(children: Vec<Node>) -> Self {
        Node::Fragment(FragmentNode {
            children,
            key: None,
        })
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map_or(Node::Empty, Into::into)
    }
}

impl<T> From<WritableSignal<T>> for Node
where
    T: Clone + PartialEq + Send + Sync + fmt::Display + 'static,
{
    fn from(signal: WritableSignal<T>) -> Self {
        Node::Dynamic(SignalRef(Arc::new(signal)))
    }
}

impl<T> From<ComputedSignal<T>> for Node
where
    T: Clone + PartialEq + Send + Sync + fmt::Display + 'static,
{
    fn from(signal: ComputedSignal<T>) -> Self {
        Node::Dynamic(SignalRef(Arc::new(signal)))
    }
}
