//! The placeholder expansion seam.
//!
//! The formatter never interprets placeholder syntax itself. It hands every marked span to
//! an [`ExpansionService`], together with a frame whose argument values were already
//! transformed for the target context.

/// Ordered argument bindings (`name → value`).
///
/// Positional arguments use the names `1`, `2`, … Binding a name twice replaces the earlier
/// value in place, so iteration order is the order of first binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    entries: Vec<(String, String)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `values` to `1`, `2`, …
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| ((idx + 1).to_string(), value.into()))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Bind `value` to the next unused positional name.
    pub fn push_positional(&mut self, value: impl Into<String>) {
        let mut index = 1usize;
        while self.get(&index.to_string()).is_some() {
            index += 1;
        }
        self.insert(index.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `f` to every value, keeping names and order.
    pub fn map_values(self, mut f: impl FnMut(String) -> String) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(name, value)| (name, f(value)))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut args = Arguments::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

/// Placeholder expansion service.
///
/// Implementations may re-enter the replacer (for example from
/// [`reprocess_as_block_markup`](ExpansionService::reprocess_as_block_markup)); any
/// recursion limit is theirs to enforce.
pub trait ExpansionService {
    /// Parsed placeholder expression.
    type Tree;
    /// Argument bindings a tree is expanded against.
    type Frame;

    /// Parse a span of template source into an expression tree.
    fn parse(&self, source: &str) -> Self::Tree;

    /// Expand `tree` against `frame`. Literal template text is returned unchanged; only
    /// argument values come from the frame.
    fn expand(&self, tree: &Self::Tree, frame: &Self::Frame) -> String;

    fn new_frame(&self, arguments: Arguments) -> Self::Frame;

    /// The raw argument bindings of the current transclusion.
    fn current_arguments(&self) -> Arguments;

    /// Replace opaque strip markers left by earlier processing with their content.
    fn unstrip(&self, value: &str) -> String;

    fn decode_char_references(&self, value: &str) -> String {
        html::decode_char_references(value)
    }

    /// Run `text` through the block-level markup processor.
    fn reprocess_as_block_markup(&self, text: &str) -> String;
}
