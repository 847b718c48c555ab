//! In-memory Document
//!
//! An arena of nodes keyed by [`NodeRef`], implementing [`Platform`]. Hosts
//! without a browser (tests, server-side pre-hydration checks) use it as the
//! live tree.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::parse;
use crate::error::{RenderError, Result};
use crate::patch::{child_namespace, LiveKind, Platform};
use crate::render::{escape_attr, escape_text};
use crate::vdom::{EventRef, NodeRef};

#[derive(Debug)]
enum NodeData {
    Root,
    Element {
        tag: String,
        namespace: Option<String>,
        attrs: IndexMap<String, String>,
        listeners: Vec<EventRef>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct DomNode {
    data: NodeData,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
}

impl DomNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A live node tree held in memory.
#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeRef, DomNode>,
    root: NodeRef,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        let root = NodeRef::new();
        let mut nodes = HashMap::new();
        nodes.insert(root, DomNode::new(NodeData::Root));
        Self { nodes, root }
    }

    /// A document holding the parsed `html`.
    pub fn from_html(html: &str) -> Result<Self> {
        let mut doc = Self::new();
        let root = doc.root;
        doc.parse_into(root, html)?;
        Ok(doc)
    }

    /// The node that holds the top-level nodes.
    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Number of nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Parse `html` and append the result to `parent`.
    ///
    /// Returns the top-level nodes created.
    pub fn parse_into(&mut self, parent: NodeRef, html: &str) -> Result<Vec<NodeRef>> {
        self.get(parent)?;
        let namespace = child_namespace(&*self, Some(parent));
        parse::parse(self, parent, namespace, html)
    }

    /// Markup of everything under the root.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    /// Markup of `node`'s children.
    pub fn inner_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        if let Some(dom) = self.nodes.get(&node) {
            let raw = matches!(&dom.data, NodeData::Element { tag, .. } if is_raw_text(tag));
            for child in &dom.children {
                self.write(*child, raw, &mut out);
            }
        }
        out
    }

    /// Markup of `node` itself.
    pub fn outer_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.write(node, false, &mut out);
        out
    }

    fn write(&self, node: NodeRef, raw: bool, out: &mut String) {
        let Some(dom) = self.nodes.get(&node) else {
            return;
        };
        match &dom.data {
            NodeData::Root => {
                for child in &dom.children {
                    self.write(*child, false, out);
                }
            }
            NodeData::Text(text) if raw => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeData::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                }
                out.push('>');
                if crate::render::is_void(tag) {
                    return;
                }
                let raw = is_raw_text(tag);
                for child in &dom.children {
                    self.write(*child, raw, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Concatenated text under `node`.
    pub fn text_content(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeRef, out: &mut String) {
        let Some(dom) = self.nodes.get(&node) else {
            return;
        };
        match &dom.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(_) => {}
            NodeData::Root | NodeData::Element { .. } => {
                for child in &dom.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<String> {
        match &self.nodes.get(&node)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// Listeners for `name` on `node`.
    pub fn listeners(&self, node: NodeRef, name: &str) -> Vec<EventRef> {
        match self.nodes.get(&node).map(|dom| &dom.data) {
            Some(NodeData::Element { listeners, .. }) => listeners
                .iter()
                .filter(|listener| &*listener.name == name)
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Attached elements with this tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeRef> {
        let mut found = Vec::new();
        self.find(
            self.root,
            &mut |data| matches!(data, NodeData::Element { tag: t, .. } if t.eq_ignore_ascii_case(tag)),
            &mut found,
        );
        found
    }

    /// Attached comments, in document order.
    pub fn comments(&self) -> Vec<NodeRef> {
        let mut found = Vec::new();
        self.find(self.root, &mut |data| matches!(data, NodeData::Comment(_)), &mut found);
        found
    }

    fn find(&self, node: NodeRef, pred: &mut dyn FnMut(&NodeData) -> bool, found: &mut Vec<NodeRef>) {
        let Some(dom) = self.nodes.get(&node) else {
            return;
        };
        for child in &dom.children {
            if self.nodes.get(child).is_some_and(|child| pred(&child.data)) {
                found.push(*child);
            }
            self.find(*child, pred, found);
        }
    }

    // ---- Arena plumbing ----

    fn get(&self, node: NodeRef) -> Result<&DomNode> {
        self.nodes.get(&node).ok_or(RenderError::UnknownNode(node))
    }

    fn get_mut(&mut self, node: NodeRef) -> Result<&mut DomNode> {
        self.nodes.get_mut(&node).ok_or(RenderError::UnknownNode(node))
    }

    pub(crate) fn insert(&mut self, node: NodeRef, data: NodeDataInit) -> NodeRef {
        let data = match data {
            NodeDataInit::Element { tag, namespace } => NodeData::Element {
                tag,
                namespace,
                attrs: IndexMap::new(),
                listeners: Vec::new(),
            },
            NodeDataInit::Text(text) => NodeData::Text(text),
            NodeDataInit::Comment(text) => NodeData::Comment(text),
        };
        self.nodes.insert(node, DomNode::new(data));
        node
    }

    pub(crate) fn append_child(&mut self, parent: NodeRef, node: NodeRef) -> Result<()> {
        self.unlink(node)?;
        self.get_mut(parent)?.children.push(node);
        self.get_mut(node)?.parent = Some(parent);
        Ok(())
    }

    pub(crate) fn set_attr(&mut self, node: NodeRef, name: &str, value: &str) -> Result<()> {
        match &mut self.get_mut(node)?.data {
            NodeData::Element { attrs, .. } => {
                attrs.insert(name.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    /// Take `node` out of its parent's child list.
    fn unlink(&mut self, node: NodeRef) -> Result<()> {
        let parent = self.get_mut(node)?.parent.take();
        if let Some(parent) = parent {
            if let Some(dom) = self.nodes.get_mut(&parent) {
                dom.children.retain(|child| *child != node);
            }
        }
        Ok(())
    }

    /// Drop `node` and its subtree from the arena.
    fn drop_subtree(&mut self, node: NodeRef) {
        if let Some(dom) = self.nodes.remove(&node) {
            for child in dom.children {
                self.drop_subtree(child);
            }
        }
    }

    fn position(&self, node: NodeRef) -> Result<(NodeRef, usize)> {
        let parent = self
            .get(node)?
            .parent
            .ok_or_else(|| RenderError::AttachmentResolution(format!("{node} is not attached")))?;
        let index = self
            .get(parent)?
            .children
            .iter()
            .position(|child| *child == node)
            .ok_or(RenderError::UnknownNode(node))?;
        Ok((parent, index))
    }
}

/// Initial data of a parsed node.
pub(crate) enum NodeDataInit {
    Element {
        tag: String,
        namespace: Option<String>,
    },
    Text(String),
    Comment(String),
}

fn is_raw_text(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

impl Platform for Document {
    fn create_element(&mut self, node: NodeRef, tag: &str, namespace: Option<&str>) -> Result<()> {
        self.insert(
            node,
            NodeDataInit::Element {
                tag: tag.to_string(),
                namespace: namespace.map(str::to_string),
            },
        );
        Ok(())
    }

    fn create_text(&mut self, node: NodeRef, text: &str) -> Result<()> {
        self.insert(node, NodeDataInit::Text(text.to_string()));
        Ok(())
    }

    fn insert_after(&mut self, sibling: NodeRef, node: NodeRef) -> Result<()> {
        self.get(node)?;
        self.unlink(node)?;
        let (parent, index) = self.position(sibling)?;
        self.get_mut(parent)?.children.insert(index + 1, node);
        self.get_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn prepend(&mut self, parent: NodeRef, node: NodeRef) -> Result<()> {
        self.get(parent)?;
        self.unlink(node)?;
        self.get_mut(parent)?.children.insert(0, node);
        self.get_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn replace(&mut self, old: NodeRef, new: NodeRef) -> Result<()> {
        self.get(new)?;
        self.unlink(new)?;
        let (parent, index) = self.position(old)?;
        self.get_mut(parent)?.children[index] = new;
        self.get_mut(new)?.parent = Some(parent);
        self.get_mut(old)?.parent = None;
        self.drop_subtree(old);
        Ok(())
    }

    fn remove(&mut self, node: NodeRef) -> Result<()> {
        self.unlink(node)?;
        self.drop_subtree(node);
        Ok(())
    }

    fn set_text(&mut self, node: NodeRef, text: &str) -> Result<()> {
        match &mut self.get_mut(node)?.data {
            NodeData::Text(value) | NodeData::Comment(value) => {
                *value = text.to_string();
                Ok(())
            }
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<()> {
        self.set_attr(node, name, value)
    }

    fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<()> {
        match &mut self.get_mut(node)?.data {
            NodeData::Element { attrs, .. } => {
                attrs.shift_remove(name);
                Ok(())
            }
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    fn set_inner_html(&mut self, node: NodeRef, html: &str) -> Result<()> {
        let children = std::mem::take(&mut self.get_mut(node)?.children);
        for child in children {
            self.drop_subtree(child);
        }
        self.parse_into(node, html)?;
        Ok(())
    }

    fn add_listener(&mut self, node: NodeRef, event: &EventRef) -> Result<()> {
        match &mut self.get_mut(node)?.data {
            NodeData::Element { listeners, .. } => {
                listeners.push(event.clone());
                Ok(())
            }
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    fn remove_listener(&mut self, node: NodeRef, event: &EventRef) -> Result<()> {
        match &mut self.get_mut(node)?.data {
            NodeData::Element { listeners, .. } => {
                listeners.retain(|listener| !listener.same_listener(event));
                Ok(())
            }
            _ => Err(RenderError::UnknownNode(node)),
        }
    }

    fn kind(&self, node: NodeRef) -> Option<LiveKind> {
        match &self.nodes.get(&node)?.data {
            NodeData::Root => None,
            NodeData::Element { tag, namespace, .. } => Some(LiveKind::Element {
                tag: tag.clone(),
                namespace: namespace.clone(),
            }),
            NodeData::Text(text) => Some(LiveKind::Text(text.clone())),
            NodeData::Comment(text) => Some(LiveKind::Comment(text.clone())),
        }
    }

    fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(&node)?.parent
    }

    fn previous_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let (parent, index) = self.position(node).ok()?;
        index
            .checked_sub(1)
            .and_then(|previous| self.nodes.get(&parent)?.children.get(previous).copied())
    }

    fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        self.nodes
            .get(&node)
            .map(|dom| dom.children.clone())
            .unwrap_or_default()
    }

    fn attributes(&self, node: NodeRef) -> Vec<(String, String)> {
        match self.nodes.get(&node).map(|dom| &dom.data) {
            Some(NodeData::Element { attrs, .. }) => attrs
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_mutations() {
        let mut doc = Document::new();
        let root = doc.root();
        let ul = NodeRef::new();
        let (a, b, c) = (NodeRef::new(), NodeRef::new(), NodeRef::new());

        doc.create_element(ul, "ul", None).unwrap();
        doc.prepend(root, ul).unwrap();
        for (node, text) in [(a, "a"), (b, "b"), (c, "c")] {
            doc.create_text(node, text).unwrap();
        }
        doc.prepend(ul, a).unwrap();
        doc.insert_after(a, c).unwrap();
        doc.insert_after(a, b).unwrap();
        assert_eq!(doc.to_html(), "<ul>abc</ul>");

        // Moving an attached node.
        doc.insert_after(c, a).unwrap();
        assert_eq!(doc.to_html(), "<ul>bca</ul>");
        assert_eq!(doc.previous_sibling(a), Some(c));
        assert_eq!(doc.previous_sibling(b), None);

        doc.remove(c).unwrap();
        assert!(!doc.contains(c));
        doc.set_attribute(ul, "class", "x<y").unwrap();
        assert_eq!(doc.to_html(), r#"<ul class="x&lt;y">ba</ul>"#);
    }

    #[test]
    fn replace_swaps_in_place() {
        let mut doc = Document::from_html("<p>a</p><p>b</p>").unwrap();
        let first = doc.children(doc.root())[0];
        let h1 = NodeRef::new();
        doc.create_element(h1, "h1", None).unwrap();
        doc.replace(first, h1).unwrap();
        assert_eq!(doc.to_html(), "<h1></h1><p>b</p>");
        assert!(!doc.contains(first));
    }

    #[test]
    fn inner_html_is_parsed() {
        let mut doc = Document::from_html("<div><span>old</span></div>").unwrap();
        let div = doc.elements_by_tag("div")[0];
        doc.set_inner_html(div, "<b>new</b> &amp; more").unwrap();
        assert_eq!(doc.to_html(), "<div><b>new</b> &amp; more</div>");
        assert_eq!(doc.text_content(div), "new & more");
    }

    #[test]
    fn unknown_nodes_are_errors() {
        let mut doc = Document::new();
        let ghost = NodeRef::new();
        assert!(matches!(
            doc.set_text(ghost, "x"),
            Err(RenderError::UnknownNode(node)) if node == ghost
        ));
        assert!(doc.kind(ghost).is_none());
    }

    #[test]
    fn listeners_are_filtered_by_name() {
        let mut doc = Document::from_html("<button></button>").unwrap();
        let button = doc.elements_by_tag("button")[0];
        let click = EventRef::new("click", |_| {});
        doc.add_listener(button, &click).unwrap();
        doc.add_listener(button, &EventRef::new("input", |_| {})).unwrap();

        assert_eq!(doc.listeners(button, "click").len(), 1);
        doc.remove_listener(button, &click).unwrap();
        assert!(doc.listeners(button, "click").is_empty());
        assert_eq!(doc.listeners(button, "input").len(), 1);
    }
}
