//! HTML fragment tokenizer, tree builder and serializer.
//!
//! The tree builder does not materialize a DOM: it drives a [`Formatter`] bottom-up, so a
//! custom formatter can rewrite text and elements while the fragment is serialized.

pub mod elements;
pub mod formatter;
pub mod perf_fixtures;

mod entities;
mod tokenizer;
mod tree_builder;
mod types;

pub use crate::entities::decode_char_references;
pub use crate::formatter::{Formatter, HtmlFormatter, escape_attribute, escape_text, push_attribute};
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::tree_builder::{TreeBuilder, parse_fragment, serialize_fragment};
pub use crate::types::{Attributes, Namespace, SerializerNode, Token};
