//! Property values, component props and event listeners.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::live::NodeRef;
use super::node::Node;

/// Name of the property that replaces an element's children with raw markup.
pub const INNER_HTML: &str = "dangerouslySetInnerHTML";

/// A property value.
///
/// Element attributes and component props share this type. Component props
/// of islands are serialized into the island manifest, so the type maps onto
/// plain JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
    Map(IndexMap<String, PropValue>),
}

impl PropValue {
    /// The value as an element attribute.
    ///
    /// Strings and numbers are written as text, `true` as an empty value.
    /// `false`, null, lists and maps produce no attribute.
    pub fn attribute_value(&self) -> Option<Cow<'_, str>> {
        match self {
            PropValue::Str(s) => Some(Cow::Borrowed(s)),
            PropValue::Int(n) => Some(Cow::Owned(n.to_string())),
            PropValue::Float(f) => Some(Cow::Owned(f.to_string())),
            PropValue::Bool(true) => Some(Cow::Borrowed("")),
            PropValue::Bool(false) | PropValue::Null | PropValue::List(_) | PropValue::Map(_) => {
                None
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        PropValue::Int(n.into())
    }
}

impl From<u32> for PropValue {
    fn from(n: u32) -> Self {
        PropValue::Int(n.into())
    }
}

impl From<f64> for PropValue {
    fn from(f: f64) -> Self {
        PropValue::Float(f)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(items: Vec<T>) -> Self {
        PropValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// Ordered attribute map of an element.
pub type Attributes = IndexMap<String, PropValue>;

/// Props handed to a component's render function.
#[derive(Debug, Clone, Default)]
pub struct Props {
    /// Named values, in declaration order.
    pub values: IndexMap<String, PropValue>,

    /// Child nodes passed between the component's tags.
    pub children: Vec<Node>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    /// String value of `name`, or `""`.
    pub fn str(&self, name: &str) -> &str {
        self.get(name).and_then(PropValue::as_str).unwrap_or_default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

/// An event delivered to a listener.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: Option<NodeRef>,
    pub value: PropValue,
}

/// Callback attached to an element event.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// A named event listener declared on an element.
#[derive(Clone)]
pub struct EventRef {
    pub name: Arc<str>,
    pub listener: Listener,
}

impl EventRef {
    pub fn new<F>(name: &str, listener: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            listener: Arc::new(listener),
        }
    }

    /// Same event name and the very same callback.
    pub fn same_listener(&self, other: &EventRef) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.listener, &other.listener)
    }

    pub fn call(&self, event: &Event) {
        (self.listener)(event)
    }
}

impl fmt::Debug for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRef").field("name", &self.name).finish()
    }
}
