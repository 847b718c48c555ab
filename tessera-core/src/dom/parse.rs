//! Markup loading for the in-memory document.
//!
//! `tl` tokenizes and builds the tree. This module maps its nodes into the
//! arena, lowercases HTML names, tracks the SVG namespace and decodes
//! character references, which `tl` leaves as written. `script` and `style`
//! bodies are kept verbatim.

use std::borrow::Cow;

use super::document::{Document, NodeDataInit};
use crate::error::{RenderError, Result};
use crate::patch::{element_child_namespace, element_namespace};
use crate::vdom::NodeRef;

/// Parse `html` into `doc` as children of `parent`; returns the top-level nodes.
pub(crate) fn parse(
    doc: &mut Document,
    parent: NodeRef,
    namespace: Option<&'static str>,
    html: &str,
) -> Result<Vec<NodeRef>> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|err| RenderError::Markup(format!("{err:?}")))?;
    let parser = dom.parser();

    let mut top = Vec::new();
    for handle in dom.children() {
        if let Some(node) = convert(doc, parser, *handle, namespace)? {
            doc.append_child(parent, node)?;
            top.push(node);
        }
    }
    Ok(top)
}

fn convert(
    doc: &mut Document,
    parser: &tl::Parser<'_>,
    handle: tl::NodeHandle,
    namespace: Option<&'static str>,
) -> Result<Option<NodeRef>> {
    let Some(node) = handle.get(parser) else {
        return Ok(None);
    };
    let init = match node {
        tl::Node::Tag(tag) => return element(doc, parser, tag, namespace),
        tl::Node::Raw(bytes) => {
            let raw = bytes.as_utf8_str();
            if raw.is_empty() {
                return Ok(None);
            }
            NodeDataInit::Text(decode_entities(&raw).into_owned())
        }
        tl::Node::Comment(bytes) => match comment_body(&bytes.as_utf8_str()) {
            Some(body) => NodeDataInit::Comment(body.to_string()),
            None => return Ok(None),
        },
    };
    Ok(Some(doc.insert(NodeRef::new(), init)))
}

fn element(
    doc: &mut Document,
    parser: &tl::Parser<'_>,
    tag: &tl::HTMLTag<'_>,
    parent_namespace: Option<&'static str>,
) -> Result<Option<NodeRef>> {
    let raw_name = tag.name().as_utf8_str();
    // Doctypes and processing instructions.
    if raw_name.is_empty() || raw_name.starts_with(['!', '?']) {
        return Ok(None);
    }
    let namespace = element_namespace(&raw_name, parent_namespace);
    let name = match namespace {
        None => raw_name.to_ascii_lowercase(),
        Some(_) => raw_name.into_owned(),
    };
    let node = doc.insert(
        NodeRef::new(),
        NodeDataInit::Element {
            tag: name.clone(),
            namespace: namespace.map(str::to_string),
        },
    );

    for (key, value) in tag.attributes().iter() {
        let key = match namespace {
            None => key.to_ascii_lowercase(),
            Some(_) => key.into_owned(),
        };
        let value = value
            .map(|value| decode_entities(&value).into_owned())
            .unwrap_or_default();
        doc.set_attr(node, &key, &value)?;
    }

    if namespace.is_none() && (name == "script" || name == "style") {
        let body = tag.inner_text(parser);
        if !body.is_empty() {
            let text = doc.insert(NodeRef::new(), NodeDataInit::Text(body.into_owned()));
            doc.append_child(node, text)?;
        }
        return Ok(Some(node));
    }

    let child_namespace = element_child_namespace(&name, namespace);
    for handle in tag.children().top().iter() {
        if let Some(child) = convert(doc, parser, *handle, child_namespace)? {
            doc.append_child(node, child)?;
        }
    }
    Ok(Some(node))
}

/// Text of a `<!-- -->` comment, or `None` for other `<!...>` declarations.
fn comment_body(raw: &str) -> Option<&str> {
    match raw.strip_prefix("<!--") {
        Some(body) => Some(body.strip_suffix("-->").unwrap_or(body)),
        None if raw.starts_with("<!") => None,
        None => Some(raw),
    }
}

/// Replace character references with the characters they stand for.
///
/// Unknown or malformed references are kept as written.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let decoded = rest[1..]
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| entity(&rest[1..=end]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{LiveKind, Platform, SVG_NAMESPACE};

    #[test]
    fn elements_text_and_comments() {
        let doc = Document::from_html(
            "<div class=\"box\"><!-- note --><p>Hi <b>there</b></p><br><img src=\"a.png\"/></div>",
        )
        .unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<div class="box"><!-- note --><p>Hi <b>there</b></p><br><img src="a.png"></div>"#
        );
        assert_eq!(doc.comments().len(), 1);
    }

    #[test]
    fn attributes_are_lowercased_and_decoded() {
        let doc = Document::from_html(r#"<input disabled value="a &amp; b" DATA-Y="two">"#).unwrap();
        let input = doc.elements_by_tag("input")[0];
        assert_eq!(doc.attribute(input, "disabled").as_deref(), Some(""));
        assert_eq!(doc.attribute(input, "value").as_deref(), Some("a & b"));
        assert_eq!(doc.attribute(input, "data-y").as_deref(), Some("two"));
        assert_eq!(doc.attributes(input).len(), 3);
    }

    #[test]
    fn character_references() {
        assert_eq!(decode_entities("a &lt;b&gt; &#39;c&#x27; &quot;"), "a <b> 'c' \"");
        assert_eq!(decode_entities("fish & chips &bogus; &"), "fish & chips &bogus; &");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn text_is_decoded() {
        let doc = Document::from_html("<p>1 &lt; 2 &amp;&amp; 3</p>").unwrap();
        let p = doc.elements_by_tag("p")[0];
        assert_eq!(doc.text_content(p), "1 < 2 && 3");
    }

    #[test]
    fn script_bodies_are_verbatim() {
        let doc = Document::from_html(
            r#"<script type="application/json">{"a":"x &amp; y"}</script><p>x</p>"#,
        )
        .unwrap();
        let script = doc.elements_by_tag("script")[0];
        assert_eq!(doc.text_content(script), r#"{"a":"x &amp; y"}"#);
        assert_eq!(doc.elements_by_tag("p").len(), 1);
    }

    #[test]
    fn comment_bodies() {
        assert_eq!(comment_body("<!-- start_island_0 -->"), Some(" start_island_0 "));
        assert_eq!(comment_body(" bare "), Some(" bare "));
        assert_eq!(comment_body("<!DOCTYPE html>"), None);
    }

    #[test]
    fn svg_namespace_is_tracked() {
        let doc = Document::from_html(
            r#"<svg viewBox="0 0 1 1"><circle r="1"/><foreignObject><div></div></foreignObject></svg>"#,
        )
        .unwrap();
        let namespace = |tag: &str| match doc.kind(doc.elements_by_tag(tag)[0]) {
            Some(LiveKind::Element { namespace, .. }) => namespace,
            _ => None,
        };
        assert_eq!(namespace("svg").as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(namespace("circle").as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(namespace("foreignObject").as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(namespace("div"), None);
        assert_eq!(doc.elements_by_tag("circle").len(), 1);
    }
}
