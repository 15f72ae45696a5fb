//! Per-render escaping frames.
//!
//! A frame is the current argument set with one transform mapped over every value. Each
//! kind is built on first use and reused for the rest of the render.

use std::cell::OnceCell;

use crate::escape::{encode_js_value, escape_css_semicolons};
use crate::expansion::{Arguments, ExpansionService};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Values re-run through the block-markup processor; strip markers are kept.
    Wikitext,
    /// Values encoded as JavaScript string literals.
    UnquotedScript,
    /// Values with `;` escaped.
    Style,
    /// Values as resolved plain text.
    Plain,
}

impl FrameKind {
    pub const ALL: [FrameKind; 4] = [
        FrameKind::Wikitext,
        FrameKind::UnquotedScript,
        FrameKind::Style,
        FrameKind::Plain,
    ];

    /// Whether values are unstripped and reference-decoded before the transform runs.
    /// Wikitext values go back into the markup processor, which unstrips them itself.
    pub fn needs_resolved_text(self) -> bool {
        !matches!(self, FrameKind::Wikitext)
    }

    fn transform<S: ExpansionService + ?Sized>(self, service: &S, value: String) -> String {
        match self {
            FrameKind::Wikitext => service.reprocess_as_block_markup(&value),
            FrameKind::UnquotedScript => encode_js_value(&value),
            FrameKind::Style => escape_css_semicolons(&value),
            FrameKind::Plain => value,
        }
    }
}

/// Build a frame of `kind` from the service's current arguments.
pub fn build_frame<S: ExpansionService + ?Sized>(service: &S, kind: FrameKind) -> S::Frame {
    let mut args: Arguments = service.current_arguments();
    log::trace!(
        target: "html_templates",
        "building {kind:?} frame over {} arguments",
        args.len()
    );
    if kind.needs_resolved_text() {
        args = args.map_values(|value| service.decode_char_references(&service.unstrip(&value)));
    }
    let args = args.map_values(|value| kind.transform(service, value));
    service.new_frame(args)
}

/// Lazily built frames for one render.
pub struct FrameCache<F> {
    wikitext: OnceCell<F>,
    unquoted_script: OnceCell<F>,
    style: OnceCell<F>,
    plain: OnceCell<F>,
}

impl<F> Default for FrameCache<F> {
    fn default() -> Self {
        Self {
            wikitext: OnceCell::new(),
            unquoted_script: OnceCell::new(),
            style: OnceCell::new(),
            plain: OnceCell::new(),
        }
    }
}

impl<F> FrameCache<F> {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, kind: FrameKind) -> &OnceCell<F> {
        match kind {
            FrameKind::Wikitext => &self.wikitext,
            FrameKind::UnquotedScript => &self.unquoted_script,
            FrameKind::Style => &self.style,
            FrameKind::Plain => &self.plain,
        }
    }

    pub fn get_or_build<S>(&self, kind: FrameKind, service: &S) -> &F
    where
        S: ExpansionService<Frame = F> + ?Sized,
    {
        self.cell(kind).get_or_init(|| build_frame(service, kind))
    }

    pub fn is_built(&self, kind: FrameKind) -> bool {
        self.cell(kind).get().is_some()
    }
}
