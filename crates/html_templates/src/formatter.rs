//! The substitution formatter.
//!
//! Wraps the reference [`HtmlFormatter`]: spans without a `{{` marker take the plain
//! serializer path, spans with one are expanded under the frame their position selects.

use std::borrow::Cow;

use html::{Formatter, HtmlFormatter, Namespace, SerializerNode, escape_text, push_attribute};

use crate::config::ReplacerConfig;
use crate::context::{AttributeContext, ElementContext, EscapingPolicy, is_url_attribute};
use crate::css::CssSanitizer;
use crate::deps::{DependencySink, ModuleKind};
use crate::escape::{escape_angle_brackets, has_placeholder_marker, is_single_placeholder};
use crate::expansion::ExpansionService;
use crate::frames::{FrameCache, FrameKind};

/// Per-render formatter. Owns the frame cache; borrows everything else.
pub struct ParameterFormatter<'r, S: ExpansionService + ?Sized> {
    inner: HtmlFormatter,
    service: &'r S,
    frames: FrameCache<S::Frame>,
    dependencies: &'r mut dyn DependencySink,
    sanitizer: &'r dyn CssSanitizer,
    config: &'r ReplacerConfig,
}

impl<'r, S: ExpansionService + ?Sized> ParameterFormatter<'r, S> {
    pub fn new(
        service: &'r S,
        dependencies: &'r mut dyn DependencySink,
        sanitizer: &'r dyn CssSanitizer,
        config: &'r ReplacerConfig,
    ) -> Self {
        Self {
            inner: HtmlFormatter::new(),
            service,
            frames: FrameCache::new(),
            dependencies,
            sanitizer,
            config,
        }
    }

    pub fn frames(&self) -> &FrameCache<S::Frame> {
        &self.frames
    }

    fn classify(&self, node: &SerializerNode) -> ElementContext {
        ElementContext::classify(node, &self.config.resource_directive)
    }

    fn expand(&self, kind: FrameKind, source: &str) -> String {
        let tree = self.service.parse(source);
        let frame = self.frames.get_or_build(kind, self.service);
        self.service.expand(&tree, frame)
    }

    fn attribute_value<'v>(&self, name: &str, value: &'v str) -> Cow<'v, str>
    where
        'r: 'v,
    {
        let value: Cow<'v, str> = if has_placeholder_marker(value) {
            let context = AttributeContext::classify(name);
            Cow::Owned(match context.policy().frame_kind() {
                // A value that is the whole declaration list goes through the sanitizer
                // instead of the `;` escape.
                Some(_) if context == AttributeContext::Style && is_single_placeholder(value) => {
                    self.sanitizer
                        .sanitize_css(&self.expand(FrameKind::Plain, value))
                }
                Some(kind) => self.expand(kind, value),
                None => value.to_owned(),
            })
        } else {
            Cow::Borrowed(value)
        };
        if is_url_attribute(name) {
            self.config.url.filter(value)
        } else {
            value
        }
    }

    fn record_directive(&mut self, node: &SerializerNode) {
        let kind = ModuleKind::from_type_attribute(node.attrs.get("type"));
        match node.attrs.get("module") {
            Some(module) => {
                log::debug!(target: "html_templates", "recorded {kind:?} module {module}");
                self.dependencies.add_module(kind, module);
            }
            None => {
                log::debug!(target: "html_templates", "resource directive without module dropped");
            }
        }
    }
}

impl<S: ExpansionService + ?Sized> Formatter for ParameterFormatter<'_, S> {
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
        let policy = self.classify(parent).policy();
        if !has_placeholder_marker(span) {
            if policy == Some(EscapingPolicy::StyleValue) {
                return escape_angle_brackets(span);
            }
            return self.inner.characters(parent, text, start, length);
        }
        let Some((policy, kind)) = policy.and_then(|p| p.frame_kind().map(|k| (p, k))) else {
            return self.inner.characters(parent, text, start, length);
        };
        match policy {
            // Literal template text is escaped like any other text; only argument values
            // pass through the block-markup processor.
            EscapingPolicy::WikitextFragment => self.expand(kind, &escape_text(span)),
            EscapingPolicy::StyleValue => escape_angle_brackets(&self.expand(kind, span)),
            EscapingPolicy::RawTextElementPlain => {
                let mut plain = self.expand(kind, span);
                if self.inner.is_raw_text_parent(parent) {
                    plain = escape_angle_brackets(&plain);
                }
                self.inner.characters(parent, &plain, 0, plain.len())
            }
            _ => self.expand(kind, span),
        }
    }

    fn element(&mut self, _parent: &SerializerNode, node: &SerializerNode, contents: &str) -> String {
        if self.classify(node) == ElementContext::ResourceDirective {
            self.record_directive(node);
            return String::new();
        }
        let mut s = String::with_capacity(node.name.len() * 2 + contents.len() + 5);
        s.push('<');
        s.push_str(&node.name);
        let mut reprocess_body = false;
        for (name, value) in node.attrs.iter() {
            if name == self.config.wikitext_body_attribute {
                reprocess_body = true;
                continue;
            }
            let value = self.attribute_value(name, value);
            push_attribute(&mut s, name, &value);
        }
        s.push('>');
        let contents: Cow<'_, str> = if reprocess_body {
            Cow::Owned(self.service.reprocess_as_block_markup(contents))
        } else {
            Cow::Borrowed(contents)
        };
        self.inner.close_element(&mut s, node, &contents);
        s
    }

    fn comment(&mut self, parent: &SerializerNode, text: &str) -> String {
        self.inner.comment(parent, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::DefaultCssSanitizer;
    use crate::deps::ModuleDependencies;
    use crate::expansion::Arguments;
    use html::parse_fragment;
    use std::cell::RefCell;

    /// Expands `{{{name}}}` by plain substitution and records every service call.
    #[derive(Default)]
    struct RecordingService {
        arguments: Arguments,
        calls: RefCell<Vec<String>>,
    }

    impl RecordingService {
        fn with(args: &[(&str, &str)]) -> Self {
            Self {
                arguments: args.iter().copied().collect(),
                ..Default::default()
            }
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }
    }

    impl ExpansionService for RecordingService {
        type Tree = String;
        type Frame = Arguments;

        fn parse(&self, source: &str) -> String {
            self.calls.borrow_mut().push(format!("parse {source}"));
            source.to_string()
        }

        fn expand(&self, tree: &String, frame: &Arguments) -> String {
            frame.iter().fold(tree.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{{{{{name}}}}}}}"), value)
            })
        }

        fn new_frame(&self, arguments: Arguments) -> Arguments {
            self.calls.borrow_mut().push("new_frame".to_string());
            arguments
        }

        fn current_arguments(&self) -> Arguments {
            self.arguments.clone()
        }

        fn unstrip(&self, value: &str) -> String {
            value.to_string()
        }

        fn reprocess_as_block_markup(&self, text: &str) -> String {
            self.calls.borrow_mut().push(format!("block {text}"));
            format!("[{text}]")
        }
    }

    fn render_with(service: &RecordingService, input: &str) -> (String, ModuleDependencies) {
        let config = ReplacerConfig::default();
        let mut deps = ModuleDependencies::new();
        let html = {
            let mut formatter =
                ParameterFormatter::new(service, &mut deps, &DefaultCssSanitizer, &config);
            parse_fragment(
                input,
                SerializerNode::new("div", Namespace::Html),
                &mut formatter,
            )
        };
        (html, deps)
    }

    fn render(args: &[(&str, &str)], input: &str) -> String {
        render_with(&RecordingService::with(args), input).0
    }

    #[test]
    fn text_without_marker_takes_the_serializer_path() {
        let service = RecordingService::default();
        let (html, _) = render_with(&service, "<p>a &amp; b { c }</p>");
        assert_eq!(html, "<p>a &amp; b { c }</p>");
        assert_eq!(service.count("parse"), 0);
        assert_eq!(service.count("new_frame"), 0);
    }

    #[test]
    fn ordinary_text_uses_the_block_markup_frame() {
        assert_eq!(
            render(&[("1", "<b>x</b>")], "<p>&lt;{{{1}}}</p>"),
            "<p>&lt;[<b>x</b>]</p>"
        );
    }

    #[test]
    fn script_body_values_are_js_literals() {
        assert_eq!(
            render(&[("1", "</script>")], "<script>var x = {{{1}}};</script>"),
            "<script>var x = \"\\u003C/script\\u003E\";</script>"
        );
    }

    #[test]
    fn style_body_escapes_angle_brackets_everywhere() {
        assert_eq!(
            render(&[("1", "red;}</style>")], "<style>a > b { color: {{{1}}} }</style>"),
            "<style>a &gt; b { color: red\\;}&lt;/style&gt; }</style>"
        );
        assert_eq!(
            render(&[], "<style>a > b {}</style>"),
            "<style>a &gt; b {}</style>"
        );
    }

    #[test]
    fn raw_text_and_preformatted_values_are_plain() {
        assert_eq!(
            render(&[("1", "<b>&amp;</b>")], "<xmp>{{{1}}}</xmp>"),
            "<xmp>&lt;b&gt;&&lt;/b&gt;</xmp>"
        );
        assert_eq!(
            render(&[("1", "<b>x</b>")], "<pre>{{{1}}}</pre>"),
            "<pre>&lt;b&gt;x&lt;/b&gt;</pre>"
        );
        assert_eq!(
            render(&[("1", "a & b")], "<textarea>{{{1}}}</textarea>"),
            "<textarea>a &amp; b</textarea>"
        );
    }

    #[test]
    fn foreign_script_text_is_escaped_with_or_without_placeholders() {
        assert_eq!(
            render(&[], "<svg><script>if (a&lt;b) f()</script></svg>"),
            "<svg><script>if (a&lt;b) f()</script></svg>"
        );
        assert_eq!(
            render(&[("1", "v")], "<svg><script>if (a&lt;b) f({{{1}}})</script></svg>"),
            "<svg><script>if (a&lt;b) f([v])</script></svg>"
        );
    }

    #[test]
    fn attribute_policies() {
        assert_eq!(
            render(&[("1", "\" onmouseover=alert(1) \"")], "<span title=\"{{{1}}}\">x</span>"),
            "<span title=\"&quot; onmouseover=alert(1) &quot;\">x</span>"
        );
        assert_eq!(
            render(&[("1", "it's")], "<button onclick=\"f({{{1}}})\">x</button>"),
            "<button onclick=\"f(&quot;it's&quot;)\">x</button>"
        );
        assert_eq!(
            render(&[("1", "red; background: x")], "<b style=\"color: {{{1}}}\">x</b>"),
            "<b style=\"color: red\\; background: x\">x</b>"
        );
    }

    #[test]
    fn whole_style_attribute_is_sanitized() {
        assert_eq!(
            render(&[("1", "color: red; margin: 0")], "<b style=\"{{{1}}}\">x</b>"),
            "<b style=\"color: red; margin: 0\">x</b>"
        );
        assert_eq!(
            render(&[("1", "background: url(x)")], "<b style=\"{{{1}}}\">x</b>"),
            "<b style=\"/* insecure input */\">x</b>"
        );
    }

    #[test]
    fn url_attributes_are_filtered() {
        assert_eq!(
            render(&[("1", "javascript:alert(1)")], "<a href=\"{{{1}}}\">x</a>"),
            "<a href=\"about:blank#NotAllowedURLProtocol\">x</a>"
        );
        assert_eq!(
            render(&[("1", "/wiki/Page")], "<a href=\"{{{1}}}\">x</a>"),
            "<a href=\"/wiki/Page\">x</a>"
        );
        assert_eq!(
            render(&[], "<img src=\"javascript:x\">"),
            "<img src=\"about:blank#NotAllowedURLProtocol\">"
        );
    }

    #[test]
    fn resource_directive_records_one_dependency() {
        let service = RecordingService::default();
        let (html, deps) = render_with(
            &service,
            "a<mw:resourceloader module=\"foo\" type=\"style\"/>b",
        );
        assert_eq!(html, "ab");
        assert_eq!(deps.styles, vec!["foo"]);
        assert!(deps.scripts.is_empty());

        let (html, deps) = render_with(&service, "<mw:resourceloader type=\"script\">x</mw:resourceloader>");
        assert_eq!(html, "");
        assert!(deps.is_empty());

        let (html, deps) = render_with(&service, "<mw:resourceloader module=\"\"/>");
        assert_eq!(html, "");
        assert_eq!(deps.scripts, vec![""]);
    }

    #[test]
    fn directive_module_is_not_expanded() {
        let (html, deps) = render_with(
            &RecordingService::with(&[("1", "evil")]),
            "<mw:resourceloader module=\"{{{1}}}\"/>",
        );
        assert_eq!(html, "");
        assert_eq!(deps.scripts, vec!["{{{1}}}"]);
    }

    #[test]
    fn body_marker_attribute_reprocesses_children() {
        let service = RecordingService::default();
        let (html, _) = render_with(&service, "<div data-mw-wikitext class=c><b>x</b></div>");
        assert_eq!(html, "<div class=\"c\">[<b>x</b>]</div>");
        assert_eq!(service.count("block <b>x</b>"), 1);
    }

    #[test]
    fn frames_are_built_once_per_kind() {
        let service = RecordingService::with(&[("1", "v")]);
        let (html, _) = render_with(
            &service,
            "<p>{{{1}}}</p><p>{{{1}}}</p><pre>{{{1}}}</pre><i title=\"{{{1}}}\">{{{1}}}</i>",
        );
        assert_eq!(html, "<p>[v]</p><p>[v]</p><pre>v</pre><i title=\"v\">[v]</i>");
        assert_eq!(service.count("new_frame"), 2);
        assert_eq!(service.count("block v"), 1);
    }
}
