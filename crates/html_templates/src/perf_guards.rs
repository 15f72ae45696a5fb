use std::cell::Cell;

use html::perf_fixtures::make_blocks;

use crate::expansion::{Arguments, ExpansionService};
use crate::replacer::ParameterReplacer;

const LARGE_BLOCKS: usize = 5_000;

#[derive(Default)]
struct CountingService {
    parses: Cell<usize>,
    frames: Cell<usize>,
}

impl ExpansionService for CountingService {
    type Tree = String;
    type Frame = ();

    fn parse(&self, source: &str) -> String {
        self.parses.set(self.parses.get() + 1);
        source.to_string()
    }

    fn expand(&self, tree: &String, _frame: &()) -> String {
        tree.replace("{{{1}}}", "v")
    }

    fn new_frame(&self, _arguments: Arguments) {
        self.frames.set(self.frames.get() + 1);
    }

    fn current_arguments(&self) -> Arguments {
        Arguments::positional(["v"])
    }

    fn unstrip(&self, value: &str) -> String {
        value.to_string()
    }

    fn reprocess_as_block_markup(&self, text: &str) -> String {
        text.to_string()
    }
}

#[test]
fn perf_guard_sparse_placeholders_parse_once() {
    let mut input = make_blocks(LARGE_BLOCKS);
    input.push_str("<p>{{{1}}}</p>");
    let service = CountingService::default();
    let rendered = ParameterReplacer::default().render(&input, &service);
    assert!(rendered.html.ends_with("<p>v</p>"));
    assert_eq!(service.parses.get(), 1, "only the marked span is parsed");
    assert_eq!(service.frames.get(), 1, "one frame for one context");
}

#[test]
fn perf_guard_no_placeholders_no_service_calls() {
    let input = make_blocks(LARGE_BLOCKS);
    let service = CountingService::default();
    let rendered = ParameterReplacer::default().render(&input, &service);
    let expected = html::serialize_fragment(&input)
        .replace("src=\"x\"", "src=\"about:blank#NotAllowedURLProtocol\"");
    assert_eq!(rendered.html, expected);
    assert_eq!(service.parses.get(), 0);
    assert_eq!(service.frames.get(), 0);
}
