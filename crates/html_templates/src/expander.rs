//! Built-in expansion service for triple-brace argument placeholders.
//!
//! Grammar:
//! - `{{{name}}}` expands to the bound value of `name` (trimmed), or to itself when unbound;
//! - `{{{name|default}}}` falls back to `default`, which may contain placeholders;
//!   further `|` segments are ignored;
//! - a run of more than three `{` keeps the surplus as literal text;
//! - an unterminated `{{{` and everything after it stays literal.

use std::cell::RefCell;

use crate::expansion::{Arguments, ExpansionService};

/// Nesting deeper than this is kept as literal text.
const MAX_NESTING: usize = 40;
/// Bound on marker-inside-marker resolution passes in [`ArgumentExpander::unstrip`].
const MAX_UNSTRIP_PASSES: usize = 16;

const STRIP_PREFIX: &str = "\u{7f}'\"`UNIQ--item-";
const STRIP_SUFFIX: &str = "-QINU`\"'\u{7f}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateNode {
    Text(String),
    Argument {
        name: Vec<TemplateNode>,
        default: Option<Vec<TemplateNode>>,
    },
}

/// A parsed span of template source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub nodes: Vec<TemplateNode>,
}

/// Argument bindings a [`ParsedTemplate`] is expanded against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpanderFrame {
    pub arguments: Arguments,
}

type BlockMarkup = Box<dyn Fn(&str) -> String>;

/// [`ExpansionService`] over a fixed argument set.
///
/// The block-markup processor defaults to HTML text escaping, so argument values cannot
/// produce markup in ordinary content unless a processor is installed with
/// [`with_block_markup`](Self::with_block_markup).
pub struct ArgumentExpander {
    arguments: Arguments,
    strip_items: RefCell<Vec<String>>,
    block_markup: BlockMarkup,
}

impl ArgumentExpander {
    pub fn new(arguments: Arguments) -> Self {
        Self {
            arguments,
            strip_items: RefCell::new(Vec::new()),
            block_markup: Box::new(html::escape_text),
        }
    }

    pub fn with_block_markup(mut self, processor: impl Fn(&str) -> String + 'static) -> Self {
        self.block_markup = Box::new(processor);
        self
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Store `content` and return an opaque marker that [`unstrip`](ExpansionService::unstrip)
    /// replaces with it.
    pub fn insert_strip_item(&self, content: impl Into<String>) -> String {
        let mut items = self.strip_items.borrow_mut();
        let marker = format!("{STRIP_PREFIX}{:08X}{STRIP_SUFFIX}", items.len());
        items.push(content.into());
        marker
    }

    fn unstrip_once(&self, value: &str) -> Option<String> {
        if !value.contains(STRIP_PREFIX) {
            return None;
        }
        let items = self.strip_items.borrow();
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(STRIP_PREFIX) {
            out.push_str(&rest[..start]);
            let after_prefix = &rest[start + STRIP_PREFIX.len()..];
            let resolved = after_prefix.find(STRIP_SUFFIX).and_then(|end| {
                let index = usize::from_str_radix(&after_prefix[..end], 16).ok()?;
                Some((items.get(index)?, end))
            });
            match resolved {
                Some((content, end)) => {
                    out.push_str(content);
                    rest = &after_prefix[end + STRIP_SUFFIX.len()..];
                }
                None => {
                    out.push_str(STRIP_PREFIX);
                    rest = after_prefix;
                }
            }
        }
        out.push_str(rest);
        Some(out)
    }

    fn expand_nodes(&self, nodes: &[TemplateNode], frame: &ExpanderFrame, out: &mut String) {
        for node in nodes {
            match node {
                TemplateNode::Text(text) => out.push_str(text),
                TemplateNode::Argument { name, default } => {
                    let mut raw_name = String::new();
                    self.expand_nodes(name, frame, &mut raw_name);
                    let key = raw_name.trim();
                    match (frame.arguments.get(key), default) {
                        (Some(value), _) => out.push_str(value),
                        (None, Some(default)) => self.expand_nodes(default, frame, out),
                        (None, None) => {
                            out.push_str("{{{");
                            out.push_str(&raw_name);
                            out.push_str("}}}");
                        }
                    }
                }
            }
        }
    }
}

impl Default for ArgumentExpander {
    fn default() -> Self {
        Self::new(Arguments::new())
    }
}

impl ExpansionService for ArgumentExpander {
    type Tree = ParsedTemplate;
    type Frame = ExpanderFrame;

    fn parse(&self, source: &str) -> ParsedTemplate {
        parse_template(source)
    }

    fn expand(&self, tree: &ParsedTemplate, frame: &ExpanderFrame) -> String {
        let mut out = String::new();
        self.expand_nodes(&tree.nodes, frame, &mut out);
        out
    }

    fn new_frame(&self, arguments: Arguments) -> ExpanderFrame {
        ExpanderFrame { arguments }
    }

    fn current_arguments(&self) -> Arguments {
        self.arguments.clone()
    }

    fn unstrip(&self, value: &str) -> String {
        let mut current = value.to_string();
        for _ in 0..MAX_UNSTRIP_PASSES {
            match self.unstrip_once(&current) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    fn reprocess_as_block_markup(&self, text: &str) -> String {
        (self.block_markup)(text)
    }
}

/// An argument whose closing `}}}` has not been seen yet.
struct OpenArgument {
    /// Completed `|`-separated parts.
    parts: Vec<Vec<TemplateNode>>,
    /// The part being parsed.
    current: Vec<TemplateNode>,
}

impl OpenArgument {
    fn close(mut self) -> TemplateNode {
        self.parts.push(self.current);
        let mut parts = self.parts.into_iter();
        let name = parts.next().unwrap_or_default();
        TemplateNode::Argument {
            name,
            default: parts.next(),
        }
    }

    /// Unterminated: the argument becomes literal text again.
    fn into_literal(mut self) -> Vec<TemplateNode> {
        self.parts.push(self.current);
        let mut nodes = vec![TemplateNode::Text("{{{".to_string())];
        for (idx, part) in self.parts.into_iter().enumerate() {
            if idx > 0 {
                nodes.push(TemplateNode::Text("|".to_string()));
            }
            nodes.extend(part);
        }
        nodes
    }
}

fn push_text(nodes: &mut Vec<TemplateNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(TemplateNode::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(TemplateNode::Text(text.to_string()));
    }
}

fn extend_nodes(target: &mut Vec<TemplateNode>, nodes: Vec<TemplateNode>) {
    for node in nodes {
        match node {
            TemplateNode::Text(text) => push_text(target, &text),
            other => target.push(other),
        }
    }
}

/// Single pass over `source` with an explicit stack of open arguments.
pub fn parse_template(source: &str) -> ParsedTemplate {
    let bytes = source.as_bytes();
    let mut root: Vec<TemplateNode> = Vec::new();
    let mut stack: Vec<OpenArgument> = Vec::new();
    let mut i = 0usize;
    let mut text_start = 0usize;

    macro_rules! current {
        () => {
            match stack.last_mut() {
                Some(open) => &mut open.current,
                None => &mut root,
            }
        };
    }

    while i < bytes.len() {
        match bytes[i] {
            b'{' if source[i..].starts_with("{{{") && stack.len() < MAX_NESTING => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'{').count();
                let open_at = i + run - 3;
                push_text(current!(), &source[text_start..open_at]);
                stack.push(OpenArgument {
                    parts: Vec::new(),
                    current: Vec::new(),
                });
                i = open_at + 3;
                text_start = i;
            }
            b'|' if !stack.is_empty() => {
                push_text(current!(), &source[text_start..i]);
                if let Some(open) = stack.last_mut() {
                    let part = std::mem::take(&mut open.current);
                    open.parts.push(part);
                }
                i += 1;
                text_start = i;
            }
            b'}' if !stack.is_empty() && source[i..].starts_with("}}}") => {
                push_text(current!(), &source[text_start..i]);
                if let Some(open) = stack.pop() {
                    let node = open.close();
                    current!().push(node);
                }
                i += 3;
                text_start = i;
            }
            _ => i += 1,
        }
    }
    push_text(current!(), &source[text_start..]);
    while let Some(open) = stack.pop() {
        let literal = open.into_literal();
        extend_nodes(current!(), literal);
    }
    ParsedTemplate { nodes: root }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str, args: &[(&str, &str)]) -> String {
        let expander = ArgumentExpander::new(args.iter().copied().collect());
        let frame = expander.new_frame(expander.current_arguments());
        expander.expand(&expander.parse(source), &frame)
    }

    #[test]
    fn named_and_positional_arguments() {
        assert_eq!(render("a {{{1}}} b", &[("1", "x")]), "a x b");
        assert_eq!(render("{{{ name }}}", &[("name", "v")]), "v");
        assert_eq!(render("{{{1}}}{{{2}}}", &[("1", "a"), ("2", "b")]), "ab");
    }

    #[test]
    fn defaults_and_nesting() {
        assert_eq!(render("{{{1|fallback}}}", &[]), "fallback");
        assert_eq!(render("{{{1|fallback}}}", &[("1", "")]), "");
        assert_eq!(render("{{{1|{{{2|deep}}}}}}", &[("2", "two")]), "two");
        assert_eq!(render("{{{1|{{{2|deep}}}}}}", &[]), "deep");
        assert_eq!(render("{{{1|a|ignored}}}", &[]), "a");
    }

    #[test]
    fn name_may_be_computed() {
        // Six braces are literal `{{{` around an argument, not an argument-named argument.
        assert_eq!(render("{{{{{{1}}}}}}", &[("1", "k"), ("k", "v")]), "{{{k}}}");
        assert_eq!(
            render("{{{x{{{1}}}}}}", &[("1", "y"), ("xy", "computed")]),
            "computed"
        );
    }

    #[test]
    fn unbound_argument_renders_itself() {
        assert_eq!(render("{{{missing}}}", &[]), "{{{missing}}}");
    }

    #[test]
    fn surplus_braces_are_literal() {
        assert_eq!(render("{{{{1}}}}", &[("1", "x")]), "{x}");
        assert_eq!(render("{{ not an argument }}", &[]), "{{ not an argument }}");
    }

    #[test]
    fn unterminated_argument_is_literal() {
        assert_eq!(render("a {{{1|b", &[("1", "x")]), "a {{{1|b");
        assert_eq!(render("{{{1 {{{2}}}", &[("2", "x")]), "{{{1 x");
        assert_eq!(render("x}}}|y", &[]), "x}}}|y");
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let source = "{{{".repeat(10_000);
        assert_eq!(render(&source, &[]), source);
    }

    #[test]
    fn strip_markers_resolve_recursively() {
        let expander = ArgumentExpander::default();
        let inner = expander.insert_strip_item("<b>inner</b>");
        let outer = expander.insert_strip_item(format!("[{inner}]"));
        assert_eq!(expander.unstrip(&format!("a {outer} b")), "a [<b>inner</b>] b");
        assert_eq!(expander.unstrip("no markers"), "no markers");
    }

    #[test]
    fn unknown_strip_marker_is_left_alone() {
        let expander = ArgumentExpander::default();
        let bogus = format!("{STRIP_PREFIX}000000FF{STRIP_SUFFIX}");
        assert_eq!(expander.unstrip(&bogus), bogus);
    }

    #[test]
    fn default_block_markup_escapes_html() {
        let expander = ArgumentExpander::default();
        assert_eq!(
            expander.reprocess_as_block_markup("<b>x</b> & y"),
            "&lt;b&gt;x&lt;/b&gt; &amp; y"
        );
        let custom = ArgumentExpander::default().with_block_markup(|t| format!("<p>{t}</p>"));
        assert_eq!(custom.reprocess_as_block_markup("x"), "<p>x</p>");
    }
}
