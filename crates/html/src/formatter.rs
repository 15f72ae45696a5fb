//! Serialization callbacks driven by the tree builder.
//!
//! The tree builder composes results bottom-up: an element's children are fully
//! serialized (and concatenated) before [`Formatter::element`] is called for it.

use crate::elements::{is_prefix_lf_element, is_raw_text_element, is_void_element};
use crate::types::{Namespace, SerializerNode};

/// Tree-construction event callbacks producing serialized output.
///
/// Every callback returns the serialization of the event; the tree builder appends it to
/// the parent's content buffer.
pub trait Formatter {
    /// Called once before any other callback. The returned string prefixes the result.
    fn start_document(&mut self, fragment_namespace: Namespace, fragment_name: &str) -> String;

    /// Character data inside `parent`. Only `text[start..start + length]` belongs to the
    /// event; the rest of `text` must not be serialized.
    fn characters(
        &mut self,
        parent: &SerializerNode,
        text: &str,
        start: usize,
        length: usize,
    ) -> String;

    /// A closed element. `contents` is the concatenated serialization of its children.
    fn element(&mut self, parent: &SerializerNode, node: &SerializerNode, contents: &str)
    -> String;

    fn comment(&mut self, parent: &SerializerNode, text: &str) -> String;
}

/// Reference HTML fragment serializer.
///
/// Text is escaped with `&`, `<`, `>` and U+00A0 (as `&nbsp;`) except inside raw text
/// elements; attribute values escape `&`, `"` and U+00A0. Void HTML elements are left
/// unclosed, foreign (SVG/MathML) elements are always closed.
#[derive(Clone, Debug, Default)]
pub struct HtmlFormatter;

impl HtmlFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Whether text inside `parent` is emitted without escaping.
    pub fn is_raw_text_parent(&self, parent: &SerializerNode) -> bool {
        parent.namespace.is_html() && is_raw_text_element(&parent.name)
    }

    /// Write the end of an element whose start tag (including `>`) is already in `out`.
    pub fn close_element(&self, out: &mut String, node: &SerializerNode, contents: &str) {
        let name = node.name.as_str();
        if node.namespace.is_html() {
            if contents.starts_with('\n') && is_prefix_lf_element(name) {
                out.push('\n');
                out.push_str(contents);
                push_end_tag(out, name);
            } else if !is_void_element(name) {
                out.push_str(contents);
                push_end_tag(out, name);
            }
        } else {
            out.push_str(contents);
            push_end_tag(out, name);
        }
    }
}

fn push_end_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

impl Formatter for HtmlFormatter {
    fn start_document(&mut self, _fragment_namespace: Namespace, _fragment_name: &str) -> String {
        String::new()
    }

    fn characters(
        &mut self,
        parent: &SerializerNode,
        text: &str,
        start: usize,
        length: usize,
    ) -> String {
        let span = &text[start..start + length];
        if self.is_raw_text_parent(parent) {
            return span.to_string();
        }
        escape_text(span)
    }

    fn element(
        &mut self,
        _parent: &SerializerNode,
        node: &SerializerNode,
        contents: &str,
    ) -> String {
        let mut s = String::with_capacity(node.name.len() * 2 + contents.len() + 5);
        s.push('<');
        s.push_str(&node.name);
        for (name, value) in node.attrs.iter() {
            push_attribute(&mut s, name, value);
        }
        s.push('>');
        self.close_element(&mut s, node, contents);
        s
    }

    fn comment(&mut self, _parent: &SerializerNode, text: &str) -> String {
        format!("<!--{text}-->")
    }
}

/// Append ` name="value"` with the value attribute-escaped.
pub fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attribute(value));
    out.push('"');
}

/// Escape text content: `&`, `<`, `>` and U+00A0.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value for double-quoted output: `&`, `"` and U+00A0.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
