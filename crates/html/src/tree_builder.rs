//! Fragment tree builder.
//!
//! Consumes tokens and drives a [`Formatter`] bottom-up: every element keeps a buffer of
//! its serialized children, and when the element closes the formatter is called with that
//! buffer and the result is appended to the parent's buffer. The fragment context element
//! (for example the seeded `div`) is never closed; its buffer is the result.
//!
//! Core-v0 coverage of tree construction (intentionally incomplete):
//! - implied end tags for `p`, `li`, `dd`/`dt`, `option`, headings, table rows/cells, `a`;
//! - void elements, `</p>` and `</br>` recovery, leading newline after `pre`/`listing`/
//!   `textarea`;
//! - SVG/MathML foreign content (namespace, name case adjustment, break-out tags,
//!   integration points, self-closing foreign elements);
//! - prefixed pseudo-elements (`mw:resourceloader`) honour `/>`.
//!
//! Not implemented: table foster parenting and implicit `tbody`, the adoption agency
//! algorithm, reconstruction of active formatting elements.

use crate::elements::{
    adjust_svg_attribute_name, adjust_svg_tag_name, breaks_out_of_foreign_content,
    closes_paragraph, is_heading, is_mathml_text_integration_point, is_prefix_lf_element,
    is_svg_html_integration_point, is_void_element,
};
use crate::formatter::{Formatter, HtmlFormatter};
use crate::tokenizer::Tokenizer;
use crate::types::{Attributes, Namespace, SerializerNode, Token};

/// Scope classes used by end-tag and implied-end-tag handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeKind {
    /// HTML "in scope" baseline.
    InScope,
    /// HTML "in button scope".
    Button,
    /// HTML "in list-item scope".
    ListItem,
    /// HTML "in table scope".
    Table,
}

#[derive(Debug)]
struct OpenElement {
    node: SerializerNode,
    contents: String,
}

impl OpenElement {
    fn new(node: SerializerNode) -> Self {
        Self {
            node,
            contents: String::new(),
        }
    }
}

/// Fragment tree builder driving a [`Formatter`].
pub struct TreeBuilder<'f, F: Formatter + ?Sized> {
    formatter: &'f mut F,
    context: OpenElement,
    open_elements: Vec<OpenElement>,
    prefix: String,
    skip_leading_lf: bool,
}

impl<'f, F: Formatter + ?Sized> TreeBuilder<'f, F> {
    /// Start a fragment parse as if the input were the children of `context`.
    pub fn new(formatter: &'f mut F, context: SerializerNode) -> Self {
        let prefix = formatter.start_document(context.namespace, &context.name);
        Self {
            formatter,
            context: OpenElement::new(context),
            open_elements: Vec::new(),
            prefix,
            skip_leading_lf: false,
        }
    }

    pub fn push_token(&mut self, token: Token) {
        let skip_lf = std::mem::take(&mut self.skip_leading_lf);
        match token {
            Token::Doctype(doctype) => {
                log::debug!(target: "html.tree_builder", "ignoring doctype in fragment: {doctype:?}");
            }
            Token::Comment(text) => {
                let parent = self.open_elements.last_mut().unwrap_or(&mut self.context);
                let out = self.formatter.comment(&parent.node, &text);
                parent.contents.push_str(&out);
            }
            Token::Text(text) => {
                let text = match (skip_lf, text.strip_prefix('\n')) {
                    (true, Some(rest)) => rest,
                    _ => text.as_str(),
                };
                if !text.is_empty() {
                    self.insert_text(text);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let attrs: Attributes = attributes
                    .into_iter()
                    .map(|(k, v)| (k, v.unwrap_or_default()))
                    .collect();
                self.start_tag(name, attrs, self_closing);
            }
            Token::EndTag(name) => self.end_tag(&name),
        }
    }

    /// Close every open element and return the serialized fragment.
    pub fn finish(mut self) -> String {
        while !self.open_elements.is_empty() {
            self.close_current();
        }
        let mut out = self.prefix;
        out.push_str(&self.context.contents);
        out
    }

    /// Whether the innermost open element (or the context element) is in the HTML namespace.
    /// The tokenizer asks this after a raw-text start tag.
    pub fn current_node_is_html(&self) -> bool {
        self.current_node().namespace.is_html()
    }

    fn current_node(&self) -> &SerializerNode {
        self.open_elements
            .last()
            .map_or(&self.context.node, |open| &open.node)
    }

    fn insert_text(&mut self, text: &str) {
        let parent = self.open_elements.last_mut().unwrap_or(&mut self.context);
        let out = self.formatter.characters(&parent.node, text, 0, text.len());
        parent.contents.push_str(&out);
    }

    fn insert_empty_element(&mut self, node: SerializerNode) {
        let parent = self.open_elements.last_mut().unwrap_or(&mut self.context);
        let out = self.formatter.element(&parent.node, &node, "");
        parent.contents.push_str(&out);
    }

    fn close_current(&mut self) {
        let Some(open) = self.open_elements.pop() else {
            return;
        };
        let parent = self.open_elements.last_mut().unwrap_or(&mut self.context);
        let out = self
            .formatter
            .element(&parent.node, &open.node, &open.contents);
        parent.contents.push_str(&out);
    }

    /// Close open elements until the stack has `len` entries.
    fn close_to(&mut self, len: usize) {
        while self.open_elements.len() > len {
            self.close_current();
        }
    }

    fn find_in_scope_by(
        &self,
        kind: ScopeKind,
        matches: impl Fn(&SerializerNode) -> bool,
    ) -> Option<usize> {
        for (idx, open) in self.open_elements.iter().enumerate().rev() {
            if open.node.namespace.is_html() && matches(&open.node) {
                return Some(idx);
            }
            if is_scope_boundary(&open.node, kind) {
                return None;
            }
        }
        None
    }

    fn find_in_scope(&self, name: &str, kind: ScopeKind) -> Option<usize> {
        self.find_in_scope_by(kind, |node| node.name == name)
    }

    fn close_paragraph_in_button_scope(&mut self) {
        if let Some(idx) = self.find_in_scope("p", ScopeKind::Button) {
            self.close_to(idx);
        }
    }

    fn start_tag(&mut self, name: String, attrs: Attributes, self_closing: bool) {
        let current = self.current_node();
        if !current.namespace.is_html() && !is_html_integration_point(current) {
            let breaks_out = breaks_out_of_foreign_content(&name)
                || (name == "font"
                    && (attrs.contains("color") || attrs.contains("face") || attrs.contains("size")));
            if !breaks_out {
                let namespace = current.namespace;
                self.insert_foreign(name, namespace, attrs, self_closing);
                return;
            }
            log::debug!(target: "html.tree_builder", "<{name}> breaks out of foreign content");
            while let Some(top) = self.open_elements.last() {
                if top.node.namespace.is_html() || is_html_integration_point(&top.node) {
                    break;
                }
                self.close_current();
            }
        }

        match name.as_str() {
            "html" | "head" | "body" => {
                log::debug!(target: "html.tree_builder", "ignoring <{name}> in fragment");
                return;
            }
            "svg" => {
                self.insert_foreign(name, Namespace::Svg, attrs, self_closing);
                return;
            }
            "math" => {
                self.insert_foreign(name, Namespace::MathMl, attrs, self_closing);
                return;
            }
            _ => {}
        }

        if closes_paragraph(&name) || matches!(name.as_str(), "li" | "dd" | "dt") {
            self.close_paragraph_in_button_scope();
        }
        match name.as_str() {
            n if is_heading(n) => {
                if is_heading(&self.current_node().name) && self.current_node().namespace.is_html()
                {
                    log::debug!(target: "html.tree_builder", "nested heading <{name}>");
                    self.close_current();
                }
            }
            "li" => {
                if let Some(idx) = self.find_in_scope("li", ScopeKind::ListItem) {
                    self.close_to(idx);
                }
            }
            "dd" | "dt" => {
                if let Some(idx) =
                    self.find_in_scope_by(ScopeKind::InScope, |n| n.name == "dd" || n.name == "dt")
                {
                    self.close_to(idx);
                }
            }
            "option" | "optgroup" => {
                if self.current_node().is_html("option") {
                    self.close_current();
                }
            }
            "tr" => {
                if let Some(idx) = self.find_in_scope("tr", ScopeKind::Table) {
                    self.close_to(idx);
                }
            }
            "td" | "th" => {
                if let Some(idx) =
                    self.find_in_scope_by(ScopeKind::Table, |n| n.name == "td" || n.name == "th")
                {
                    self.close_to(idx);
                }
            }
            "a" => {
                if let Some(idx) = self.find_in_scope("a", ScopeKind::InScope) {
                    log::debug!(target: "html.tree_builder", "nested <a> closes the open one");
                    self.close_to(idx);
                }
            }
            _ => {}
        }

        let honours_self_closing = self_closing && name.contains(':');
        let node = SerializerNode {
            name,
            namespace: Namespace::Html,
            attrs,
            self_closing,
        };
        if is_void_element(&node.name) || honours_self_closing {
            self.insert_empty_element(node);
            return;
        }
        let skip_lf = is_prefix_lf_element(&node.name);
        self.open_elements.push(OpenElement::new(node));
        self.skip_leading_lf = skip_lf;
    }

    fn insert_foreign(
        &mut self,
        name: String,
        namespace: Namespace,
        attrs: Attributes,
        self_closing: bool,
    ) {
        let (name, attrs) = if namespace == Namespace::Svg {
            let attrs = attrs
                .iter()
                .map(|(k, v)| (adjust_svg_attribute_name(k).to_string(), v.to_string()))
                .collect();
            (adjust_svg_tag_name(&name).to_string(), attrs)
        } else {
            (name, attrs)
        };
        let node = SerializerNode {
            name,
            namespace,
            attrs,
            self_closing,
        };
        if self_closing {
            self.insert_empty_element(node);
        } else {
            self.open_elements.push(OpenElement::new(node));
        }
    }

    fn end_tag(&mut self, name: &str) {
        if !self.current_node().namespace.is_html() {
            for idx in (0..self.open_elements.len()).rev() {
                let node = &self.open_elements[idx].node;
                if node.namespace.is_html() {
                    break;
                }
                if node.name.eq_ignore_ascii_case(name) {
                    self.close_to(idx);
                    return;
                }
            }
        }

        let found = match name {
            "html" | "body" | "head" => return,
            "p" => match self.find_in_scope("p", ScopeKind::Button) {
                Some(idx) => Some(idx),
                None => {
                    log::debug!(target: "html.tree_builder", "</p> without open p");
                    self.insert_empty_element(SerializerNode::new("p", Namespace::Html));
                    return;
                }
            },
            "br" => {
                log::debug!(target: "html.tree_builder", "</br> treated as <br>");
                self.insert_empty_element(SerializerNode::new("br", Namespace::Html));
                return;
            }
            "li" => self.find_in_scope("li", ScopeKind::ListItem),
            "table" | "caption" | "tr" | "td" | "th" => self.find_in_scope(name, ScopeKind::Table),
            n if is_heading(n) => self.find_in_scope_by(ScopeKind::InScope, |n| is_heading(&n.name)),
            _ => self.find_in_scope(name, ScopeKind::InScope),
        };
        match found {
            Some(idx) => self.close_to(idx),
            None => {
                log::debug!(target: "html.tree_builder", "ignoring stray </{name}>");
            }
        }
    }
}

fn is_html_integration_point(node: &SerializerNode) -> bool {
    match node.namespace {
        Namespace::Html => false,
        Namespace::Svg => is_svg_html_integration_point(&node.name),
        Namespace::MathMl => is_mathml_text_integration_point(&node.name),
    }
}

fn is_scope_boundary(node: &SerializerNode, kind: ScopeKind) -> bool {
    match node.namespace {
        Namespace::Html => {
            let name = node.name.as_str();
            match kind {
                ScopeKind::Table => matches!(name, "html" | "table" | "template"),
                _ => {
                    matches!(
                        name,
                        "applet"
                            | "caption"
                            | "html"
                            | "table"
                            | "td"
                            | "th"
                            | "marquee"
                            | "object"
                            | "template"
                    ) || (kind == ScopeKind::Button && name == "button")
                        || (kind == ScopeKind::ListItem && matches!(name, "ol" | "ul"))
                }
            }
        }
        Namespace::Svg | Namespace::MathMl => {
            kind != ScopeKind::Table && is_html_integration_point(node)
        }
    }
}

/// Parse `input` as the children of `context` and serialize it through `formatter`.
pub fn parse_fragment<F: Formatter + ?Sized>(
    input: &str,
    context: SerializerNode,
    formatter: &mut F,
) -> String {
    let mut builder = TreeBuilder::new(formatter, context);
    let mut tokenizer = Tokenizer::new(input);
    while let Some(token) = tokenizer.next_token(builder.current_node_is_html()) {
        builder.push_token(token);
    }
    builder.finish()
}

/// Reference serialization of a fragment parsed in a `div` context.
pub fn serialize_fragment(input: &str) -> String {
    parse_fragment(
        input,
        SerializerNode::new("div", Namespace::Html),
        &mut HtmlFormatter::new(),
    )
}
