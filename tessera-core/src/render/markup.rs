//! Markup Serialization
//!
//! Server rendering: build the VNode tree, serialize it to HTML and hand back
//! the islands recorded on the way.

use std::fmt::Write as _;

use super::context::RenderContext;
use super::island::IslandManifest;
use super::reconcile::{create, create_async};
use crate::error::Result;
use crate::vdom::{Node, VNode, VNodeKind, INNER_HTML};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(tag))
}

/// Result of a server render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub html: String,
    pub islands: IslandManifest,
}

impl RenderOutput {
    /// The markup followed by the island manifest script.
    pub fn document(&self) -> Result<String> {
        if self.islands.is_empty() {
            return Ok(self.html.clone());
        }
        Ok(format!("{}{}", self.html, self.islands.script_tag()?))
    }
}

/// Render `node` to HTML.
///
/// The tree is torn down after serialization; server trees never receive
/// reactive updates.
#[tracing::instrument(skip_all)]
pub fn render_to_string(cx: &RenderContext, node: Node) -> Result<RenderOutput> {
    let root = create(cx, node)?;
    Ok(finish(cx, root))
}

/// Render `node` to HTML, awaiting components that may suspend.
#[tracing::instrument(skip_all)]
pub async fn render_to_string_async(cx: &RenderContext, node: Node) -> Result<RenderOutput> {
    let root = create_async(cx, node).await?;
    Ok(finish(cx, root))
}

fn finish(cx: &RenderContext, root: VNode) -> RenderOutput {
    let html = to_markup(&root);
    root.teardown();
    let islands = cx.take_islands();
    tracing::debug!(bytes = html.len(), islands = islands.len(), "rendered to string");
    RenderOutput { html, islands }
}

/// Serialize a VNode tree as HTML.
pub fn to_markup(vnode: &VNode) -> String {
    let mut out = String::new();
    write_node(vnode, &mut out);
    out
}

fn write_node(vnode: &VNode, out: &mut String) {
    let nested = {
        let data = vnode.lock();
        match &data.kind {
            VNodeKind::Empty { .. } => return,
            VNodeKind::Text(text) => {
                if text.skip_escaping {
                    out.push_str(&text.value);
                } else {
                    out.push_str(&escape_text(&text.value));
                }
                return;
            }
            VNodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    if name == INNER_HTML {
                        continue;
                    }
                    let Some(value) = value.attribute_value() else {
                        continue;
                    };
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(&value));
                }
                out.push('>');
                if is_void(&el.tag) {
                    return;
                }
                if let Some(html) = el.attrs.get(INNER_HTML).and_then(|v| v.attribute_value()) {
                    out.push_str(&html);
                    let _ = write!(out, "</{}>", el.tag);
                    return;
                }
                Nested::Element(el.tag.clone(), el.children.clone())
            }
            VNodeKind::Component(c) => Nested::Plain(c.ast.iter().cloned().collect()),
            VNodeKind::Fragment { children } => Nested::Plain(children.clone()),
        }
    };

    match nested {
        Nested::Element(tag, children) => {
            for child in &children {
                write_node(child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
        Nested::Plain(children) => {
            for child in &children {
                write_node(child, out);
            }
        }
    }
}

enum Nested {
    Element(String, Vec<VNode>),
    Plain(Vec<VNode>),
}

/// Escape text content.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
