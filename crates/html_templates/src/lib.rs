//! Placeholder substitution for HTML fragments.
//!
//! A fragment is parsed as the children of a context element and serialized back with
//! every `{{{…}}}` placeholder expanded by an [`ExpansionService`]. The escaping applied to
//! an expansion depends on where it appears: script bodies and event handlers get
//! JavaScript string literals, style bodies and attributes get CSS-safe values, raw-text
//! elements and plain attributes get text, and ordinary content goes back through the
//! service's block-markup processor.

pub mod config;
pub mod context;
pub mod css;
pub mod deps;
pub mod escape;
pub mod expander;
pub mod expansion;
pub mod formatter;
pub mod frames;
pub mod replacer;
pub mod url;

#[cfg(all(test, feature = "perf-tests"))]
mod perf_guards;

pub use crate::config::{ConfigError, ReplacerConfig};
pub use crate::context::{AttributeContext, ElementContext, EscapingPolicy};
pub use crate::css::{CssSanitizer, DefaultCssSanitizer};
pub use crate::deps::{DependencySink, ModuleDependencies, ModuleKind};
pub use crate::expander::{ArgumentExpander, parse_template};
pub use crate::expansion::{Arguments, ExpansionService};
pub use crate::formatter::ParameterFormatter;
pub use crate::frames::{FrameCache, FrameKind};
pub use crate::replacer::{ParameterReplacer, Rendered};
pub use crate::url::UrlPolicy;
