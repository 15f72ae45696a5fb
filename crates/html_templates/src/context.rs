//! Escaping policy selection from the position in the fragment tree.

use html::SerializerNode;
use html::elements::is_raw_text_element;

use crate::frames::FrameKind;

/// How a placeholder's expansion is made safe for its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapingPolicy {
    /// Attribute values: plain text, attribute-escaped by the serializer.
    PlainText,
    /// Script bodies and event-handler attributes: JavaScript string literals.
    UnquotedScript,
    /// Style bodies and `style` attributes: `;` escaped.
    StyleValue,
    /// Raw-text and preformatted elements: plain text, never markup.
    RawTextElementPlain,
    /// Ordinary content: values re-enter the block-markup processor.
    WikitextFragment,
    /// Already serialized children re-run through the block-markup processor.
    VerbatimWikitextBlock,
}

impl EscapingPolicy {
    /// The frame placeholders are expanded under, if any.
    pub fn frame_kind(self) -> Option<FrameKind> {
        match self {
            EscapingPolicy::PlainText | EscapingPolicy::RawTextElementPlain => {
                Some(FrameKind::Plain)
            }
            EscapingPolicy::UnquotedScript => Some(FrameKind::UnquotedScript),
            EscapingPolicy::StyleValue => Some(FrameKind::Style),
            EscapingPolicy::WikitextFragment => Some(FrameKind::Wikitext),
            EscapingPolicy::VerbatimWikitextBlock => None,
        }
    }
}

/// What kind of element encloses a text span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementContext {
    /// The resource directive pseudo-element; its content is never expanded.
    ResourceDirective,
    Script,
    Style,
    /// Raw-text elements other than `script`/`style`.
    RawText,
    /// `pre`, `listing` and the escapable raw-text elements `textarea` and `title`.
    Preformatted,
    Ordinary,
}

impl ElementContext {
    /// Script, style and the raw-text kinds are HTML elements only. An SVG `<script>`
    /// holds parsed markup and is ordinary content.
    pub fn classify(node: &SerializerNode, resource_directive: &str) -> Self {
        let name = node.name.as_str();
        if name.eq_ignore_ascii_case(resource_directive) {
            return ElementContext::ResourceDirective;
        }
        if !node.namespace.is_html() {
            return ElementContext::Ordinary;
        }
        match name {
            "script" => ElementContext::Script,
            "style" => ElementContext::Style,
            "pre" | "listing" | "textarea" | "title" => ElementContext::Preformatted,
            _ if is_raw_text_element(name) => ElementContext::RawText,
            _ => ElementContext::Ordinary,
        }
    }

    /// `None` for the resource directive, whose content is consumed unexpanded.
    pub fn policy(self) -> Option<EscapingPolicy> {
        match self {
            ElementContext::ResourceDirective => None,
            ElementContext::Script => Some(EscapingPolicy::UnquotedScript),
            ElementContext::Style => Some(EscapingPolicy::StyleValue),
            ElementContext::RawText | ElementContext::Preformatted => {
                Some(EscapingPolicy::RawTextElementPlain)
            }
            ElementContext::Ordinary => Some(EscapingPolicy::WikitextFragment),
        }
    }
}

/// What kind of attribute holds a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeContext {
    EventHandler,
    Style,
    Plain,
}

impl AttributeContext {
    pub fn classify(attribute_name: &str) -> Self {
        if attribute_name.starts_with("on") {
            AttributeContext::EventHandler
        } else if attribute_name == "style" {
            AttributeContext::Style
        } else {
            AttributeContext::Plain
        }
    }

    pub fn policy(self) -> EscapingPolicy {
        match self {
            AttributeContext::EventHandler => EscapingPolicy::UnquotedScript,
            AttributeContext::Style => EscapingPolicy::StyleValue,
            AttributeContext::Plain => EscapingPolicy::PlainText,
        }
    }
}

/// Attributes whose values are URLs and pass the URL filter.
pub fn is_url_attribute(attribute_name: &str) -> bool {
    matches!(attribute_name, "href" | "src")
}
