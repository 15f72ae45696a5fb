use html::{Namespace, SerializerNode, parse_fragment};

use crate::config::ReplacerConfig;
use crate::css::{CssSanitizer, DefaultCssSanitizer};
use crate::deps::{DependencySink, ModuleDependencies};
use crate::expansion::ExpansionService;
use crate::formatter::ParameterFormatter;

/// Output of [`ParameterReplacer::render`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub dependencies: ModuleDependencies,
}

/// Substitutes placeholders in an HTML fragment.
///
/// Holds only configuration, so one replacer can serve concurrent renders; all per-render
/// state lives in the formatter built by each call.
#[derive(Clone, Debug, Default)]
pub struct ParameterReplacer {
    config: ReplacerConfig,
}

impl ParameterReplacer {
    pub fn new(config: ReplacerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReplacerConfig {
        &self.config
    }

    /// Parse `fragment` as the children of the context element and reserialize it with
    /// every placeholder expanded for its position. Resource directives found along the
    /// way are reported to `dependencies`.
    pub fn replace<S>(
        &self,
        fragment: &str,
        service: &S,
        dependencies: &mut dyn DependencySink,
    ) -> String
    where
        S: ExpansionService + ?Sized,
    {
        self.replace_with_sanitizer(fragment, service, dependencies, &DefaultCssSanitizer)
    }

    pub fn replace_with_sanitizer<S>(
        &self,
        fragment: &str,
        service: &S,
        dependencies: &mut dyn DependencySink,
        sanitizer: &dyn CssSanitizer,
    ) -> String
    where
        S: ExpansionService + ?Sized,
    {
        log::trace!(
            target: "html_templates",
            "replacing placeholders in {} bytes under <{}>",
            fragment.len(),
            self.config.context_element
        );
        let mut formatter = ParameterFormatter::new(service, dependencies, sanitizer, &self.config);
        parse_fragment(
            fragment,
            SerializerNode::new(self.config.context_element.as_str(), Namespace::Html),
            &mut formatter,
        )
    }

    /// [`replace`](Self::replace) collecting dependencies into the returned value.
    pub fn render<S>(&self, fragment: &str, service: &S) -> Rendered
    where
        S: ExpansionService + ?Sized,
    {
        let mut dependencies = ModuleDependencies::new();
        let html = self.replace(fragment, service, &mut dependencies);
        Rendered { html, dependencies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::ArgumentExpander;
    use crate::expansion::Arguments;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn replacer_is_shareable() {
        assert_send_sync::<ParameterReplacer>();
    }

    #[test]
    fn render_collects_output_and_dependencies() {
        let expander = ArgumentExpander::new(Arguments::positional(["World"]));
        let rendered = ParameterReplacer::default().render(
            "<p>Hello {{{1}}}</p><mw:resourceloader module=\"greeting\"/>",
            &expander,
        );
        assert_eq!(rendered.html, "<p>Hello World</p>");
        assert_eq!(rendered.dependencies.scripts, vec!["greeting"]);
    }

    #[test]
    fn configured_context_element_is_the_fragment_parent() {
        let config = ReplacerConfig {
            context_element: "section".to_owned(),
            ..ReplacerConfig::default()
        };
        let replacer = ParameterReplacer::new(config);
        let expander = ArgumentExpander::new(Arguments::positional(["x"]));
        assert_eq!(replacer.config().context_element, "section");
        assert_eq!(
            replacer.render("<li>{{{1}}}<li>y", &expander).html,
            "<li>x</li><li>y</li>"
        );
    }

    struct Unsafe;

    impl CssSanitizer for Unsafe {
        fn sanitize_css(&self, css: &str) -> String {
            css.to_uppercase()
        }
    }

    #[test]
    fn custom_sanitizer_is_used_for_whole_style_values() {
        let expander = ArgumentExpander::new(Arguments::positional(["color: red"]));
        let mut deps = ModuleDependencies::new();
        let html = ParameterReplacer::default().replace_with_sanitizer(
            "<b style=\"{{{1}}}\">x</b>",
            &expander,
            &mut deps,
            &Unsafe,
        );
        assert_eq!(html, "<b style=\"COLOR: RED\">x</b>");
    }
}
