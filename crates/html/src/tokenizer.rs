//! Fragment tokenizer with a practical subset of the HTML tokenization rules.
//!
//! Tag names run from an ASCII letter up to whitespace, `/` or `>` and are ASCII-lowercased.
//! Attribute names follow the same rule (plus `=` as a terminator).
//!
//! Known limitations (intentional):
//! - Not a full HTML5 state machine: no CDATA sections, no script-data escape states.
//! - Raw text / RCDATA switching needs the caller to say whether the element just opened is
//!   HTML (see [`Tokenizer::next_token`]); [`tokenize`] assumes it always is.
//! - Raw text close-tag scanning accepts `</name` followed by whitespace, `/` or `>` and then
//!   skips to the next `>` (see `find_close_tag`).
//! - An unquoted attribute value ends at `/>`, so `<x a=b/>` is self-closing.
use crate::elements::{is_raw_text_element, is_rcdata_element};
use crate::entities::decode_char_references;
use crate::types::Token;
use memchr::memchr;
use std::collections::VecDeque;

const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

fn is_tag_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

// it only attempts matches starting at ASCII <
// < cannot appear in UTF-8 continuation bytes
fn find_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let hay_bytes = haystack.as_bytes();
    let name_bytes = name.as_bytes();
    let len = hay_bytes.len();
    let n = name_bytes.len() + 2;
    debug_assert!(name.is_ascii());
    let mut i = 0;
    while i + n <= len {
        let rel = memchr(b'<', &hay_bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if hay_bytes[i + 1] == b'/'
            && starts_with_ignore_ascii_case_at(hay_bytes, i + 2, name_bytes)
            && hay_bytes.get(i + n).is_none_or(|&b| is_tag_name_terminator(b))
        {
            let end = memchr(b'>', &hay_bytes[i + n..]).map_or(len, |rel| i + n + rel + 1);
            return Some((i, end));
        }
        i += 1;
    }
    None
}

/// Buffers decoded text so adjacent runs (`a < b` is three runs) become one token.
#[derive(Default)]
struct TokenSink {
    out: VecDeque<Token>,
    text: String,
}

impl TokenSink {
    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let token = Token::Text(std::mem::take(&mut self.text));
        log::trace!(target: "html.tokenizer", "emit token: {token:?}");
        self.out.push_back(token);
    }

    fn push(&mut self, token: Token) {
        self.flush_text();
        log::trace!(target: "html.tokenizer", "emit token: {token:?}");
        self.out.push_back(token);
    }
}

/// Pull tokenizer.
///
/// Raw-text and RCDATA bodies depend on where the start tag landed: `<script>` inside SVG
/// is an ordinary foreign element whose content is markup. After emitting such a start
/// tag the tokenizer waits for the next [`next_token`](Self::next_token) call and scans
/// the body as raw text only if the caller reports that the current node is HTML.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    sink: TokenSink,
    /// Raw-text or RCDATA element whose start tag was emitted last.
    pending_body: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            sink: TokenSink::default(),
            pending_body: None,
        }
    }

    /// Next token, or `None` at end of input.
    ///
    /// `html_current_node` is only consulted right after a raw-text or RCDATA start tag has
    /// been returned; it must say whether the element that tag opened is an HTML element.
    pub fn next_token(&mut self, html_current_node: bool) -> Option<Token> {
        if let Some(token) = self.sink.out.pop_front() {
            return Some(token);
        }
        if let Some(name) = self.pending_body.take() {
            if html_current_node {
                self.scan_body(&name);
            } else {
                log::trace!(target: "html.tokenizer", "<{name}> is foreign; body is markup");
            }
        }
        while self.sink.out.is_empty() && self.pos < self.input.len() {
            self.step();
        }
        if self.sink.out.is_empty() {
            self.sink.flush_text();
        }
        self.sink.out.pop_front()
    }

    /// Consume one construct starting at `self.pos`.
    fn step(&mut self) {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let i = self.pos;
        // Invariant: we scan by byte, but any slice endpoints must be UTF-8 char boundaries.
        // We only cut slices at ASCII structural bytes, therefore slice endpoints remain
        // UTF-8 boundaries.
        if bytes[i] != b'<' {
            let end = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            debug_assert!(input.is_char_boundary(i));
            debug_assert!(input.is_char_boundary(end));
            self.sink.text(&decode_char_references(&input[i..end]));
            self.pos = end;
            return;
        }
        // now b[i] == b'<'
        if input[i..].starts_with(HTML_COMMENT_START) {
            let body_start = i + HTML_COMMENT_START.len();
            // Scan for the comment terminator once per comment (linear in comment length).
            match input[body_start..].find(HTML_COMMENT_END) {
                Some(end) => {
                    self.sink
                        .push(Token::Comment(input[body_start..body_start + end].to_string()));
                    self.pos = body_start + end + HTML_COMMENT_END.len();
                }
                None => {
                    self.sink.push(Token::Comment(input[body_start..].to_string()));
                    self.pos = len;
                }
            }
            return;
        }
        if starts_with_ignore_ascii_case_at(bytes, i, b"<!doctype") {
            let rest = &input[i + 2..];
            self.pos = match rest.find('>') {
                Some(end) => {
                    self.sink.push(Token::Doctype(rest[..end].trim().to_string()));
                    i + 2 + end + 1
                }
                None => len,
            };
            return;
        }
        match bytes.get(i + 1) {
            Some(b'!') => {
                self.pos = bogus_comment(&mut self.sink, input, i + 2);
                return;
            }
            Some(b'?') => {
                self.pos = bogus_comment(&mut self.sink, input, i + 1);
                return;
            }
            Some(b'/') => {
                self.pos = match bytes.get(i + 2) {
                    Some(b) if b.is_ascii_alphabetic() => {
                        let start = i + 2;
                        let mut j = start;
                        while j < len && !is_tag_name_terminator(bytes[j]) {
                            j += 1;
                        }
                        let name = input[start..j].to_ascii_lowercase();
                        // End tags may carry junk attributes; everything up to '>' is dropped.
                        match memchr(b'>', &bytes[j..]) {
                            Some(rel) => {
                                self.sink.push(Token::EndTag(name));
                                j + rel + 1
                            }
                            None => len,
                        }
                    }
                    Some(b'>') => i + 3,
                    Some(_) => bogus_comment(&mut self.sink, input, i + 2),
                    None => {
                        self.sink.text("</");
                        len
                    }
                };
                return;
            }
            Some(b) if b.is_ascii_alphabetic() => {}
            _ => {
                self.sink.text("<");
                self.pos = i + 1;
                return;
            }
        }

        // start tag
        let start = i + 1;
        let mut k = start;
        while k < len && !is_tag_name_terminator(bytes[k]) {
            k += 1;
        }
        let name = input[start..k].to_ascii_lowercase();
        let Some((attributes, self_closing, content_start)) = scan_attributes(input, k) else {
            // EOF inside a tag drops the tag.
            self.pos = len;
            return;
        };
        self.pos = content_start;
        let has_body = is_raw_text_element(&name) || is_rcdata_element(&name);
        if has_body && !self_closing {
            self.pending_body = Some(name.clone());
        }
        self.sink.push(Token::StartTag {
            name,
            attributes,
            self_closing,
        });
    }

    /// Scan the body of the raw-text or RCDATA element `name` and its end tag.
    fn scan_body(&mut self, name: &str) {
        let input = self.input;
        let content_start = self.pos;
        if name == "plaintext" {
            self.sink.text(&input[content_start..]);
            self.pos = input.len();
            return;
        }
        let body = &input[content_start..];
        let (raw, next) = match find_close_tag(body, name) {
            Some((rel_start, rel_end)) => (&body[..rel_start], content_start + rel_end),
            None => (body, input.len()),
        };
        if is_rcdata_element(name) {
            self.sink.text(&decode_char_references(raw));
        } else {
            self.sink.text(raw);
        }
        // A missing close tag closes the element implicitly at end of input.
        self.sink.push(Token::EndTag(name.to_string()));
        self.pos = next;
    }
}

/// Tokenizes an HTML fragment into a flat token stream, treating every raw-text and
/// RCDATA start tag as HTML.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(input);
    std::iter::from_fn(|| tokenizer.next_token(true)).collect()
}

/// Bogus comment: everything from `start` up to the next `>` becomes comment data.
fn bogus_comment(sink: &mut TokenSink, input: &str, start: usize) -> usize {
    let bytes = input.as_bytes();
    match memchr(b'>', &bytes[start..]) {
        Some(rel) => {
            sink.push(Token::Comment(input[start..start + rel].to_string()));
            start + rel + 1
        }
        None => {
            sink.push(Token::Comment(input[start..].to_string()));
            bytes.len()
        }
    }
}

type ScannedAttributes = (Vec<(String, Option<String>)>, bool, usize);

/// Scan attributes from `k` (just after the tag name) to the end of the tag.
///
/// Returns the attributes, the self-closing flag and the index after `>`, or `None` when
/// the input ends inside the tag.
fn scan_attributes(input: &str, mut k: usize) -> Option<ScannedAttributes> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes: Vec<(String, Option<String>)> = Vec::new();
    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            return None;
        }
        if bytes[k] == b'>' {
            return Some((attributes, false, k + 1));
        }
        if bytes[k] == b'/' {
            if k + 1 < len && bytes[k + 1] == b'>' {
                return Some((attributes, true, k + 2));
            }
            k += 1;
            continue;
        }
        let name_start = k;
        // A leading '=' belongs to the attribute name.
        k += 1;
        while k < len && !is_tag_name_terminator(bytes[k]) && bytes[k] != b'=' {
            k += 1;
        }
        debug_assert!(input.is_char_boundary(name_start));
        debug_assert!(input.is_char_boundary(k));
        let attribute_name = input[name_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                let vstart = k + 1;
                let rel = memchr(quote, &bytes[vstart..])?;
                k = vstart + rel + 1;
                Some(decode_char_references(&input[vstart..vstart + rel]))
            } else {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                        break;
                    }
                    k += 1;
                }
                Some(decode_char_references(&input[vstart..k]))
            }
        } else {
            None
        };
        // Duplicate attributes are dropped; the first occurrence wins.
        if !attributes.iter().any(|(n, _)| *n == attribute_name) {
            attributes.push((attribute_name, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "perf-tests")]
    use std::time::{Duration, Instant};

    fn start_tag<'a>(tokens: &'a [Token], tag: &str) -> Option<&'a [(String, Option<String>)]> {
        tokens.iter().find_map(|t| match t {
            Token::StartTag {
                name, attributes, ..
            } if name == tag => Some(attributes.as_slice()),
            _ => None,
        })
    }

    #[test]
    fn tokenize_preserves_utf8_text_nodes() {
        let tokens = tokenize("<p>120×32</p>");
        assert!(
            tokens
                .iter()
                .any(|t| matches!(t, Token::Text(s) if s == "120×32")),
            "expected UTF-8 text token, got: {tokens:?}"
        );
    }

    #[test]
    fn tokenize_handles_mixed_case_doctype() {
        let tokens = tokenize("<!DoCtYpE html>");
        assert_eq!(tokens, vec![Token::Doctype("DoCtYpE html".to_string())]);
    }

    #[test]
    fn tokenize_finds_script_end_tag_case_insensitive() {
        let tokens = tokenize("<script>let x = 1;</ScRiPt>");
        assert!(
            matches!(
                tokens.as_slice(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(body),
                    Token::EndTag(end)
                ] if name == "script" && body == "let x = 1;" && end == "script"
            ),
            "expected raw script text and matching end tag, got: {tokens:?}"
        );
    }

    #[test]
    fn script_body_is_not_entity_decoded_or_tag_parsed() {
        let tokens = tokenize("<script>if (a < b && c) { x = '&amp;<b>'; }</script>");
        assert!(
            tokens.iter().any(|t| matches!(
                t,
                Token::Text(s) if s == "if (a < b && c) { x = '&amp;<b>'; }"
            )),
            "expected untouched script body, got: {tokens:?}"
        );
    }

    #[test]
    fn foreign_raw_text_start_tag_keeps_markup_mode() {
        let mut tokenizer = Tokenizer::new("<script>a&amp;<b>c</script>");
        let tokens: Vec<Token> = std::iter::from_fn(|| tokenizer.next_token(false)).collect();
        assert_eq!(tokens.len(), 5, "got: {tokens:?}");
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "script"));
        assert_eq!(tokens[1], Token::Text("a&".to_string()));
        assert!(matches!(&tokens[2], Token::StartTag { name, .. } if name == "b"));
        assert_eq!(tokens[3], Token::Text("c".to_string()));
        assert_eq!(tokens[4], Token::EndTag("script".to_string()));
    }

    #[test]
    fn rcdata_body_decodes_references_but_not_tags() {
        let tokens = tokenize("<textarea>&lt;b&gt; <i>x</i></textarea>");
        assert!(
            matches!(
                tokens.as_slice(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(body),
                    Token::EndTag(end)
                ] if name == "textarea" && body == "<b> <i>x</i>" && end == "textarea"
            ),
            "expected rcdata text, got: {tokens:?}"
        );
    }

    #[test]
    fn rawtext_close_tag_does_not_accept_near_matches() {
        let tokens = tokenize("<script>ok</scriptx >no</script >");
        assert!(
            matches!(
                tokens.as_slice(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(body),
                    Token::EndTag(end),
                ] if name == "script" && body == "ok</scriptx >no" && end == "script"
            ),
            "expected near-match not to close rawtext, got: {tokens:?}"
        );
    }

    #[test]
    fn tokenize_handles_rawtext_without_close_tag() {
        let body = "x<y>\n".repeat(1_000);
        let tokens = tokenize(&format!("<style>{body}"));
        assert!(
            matches!(
                tokens.as_slice(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(text),
                    Token::EndTag(end)
                ] if name == "style" && *text == body && end == "style"
            ),
            "expected rawtext body without close tag to tokenize, got: {tokens:?}"
        );
    }

    #[test]
    fn plaintext_consumes_rest_of_input() {
        let tokens = tokenize("<plaintext><b>x</b></plaintext>");
        assert_eq!(
            tokens,
            vec![
                Token::StartTag {
                    name: "plaintext".to_string(),
                    attributes: vec![],
                    self_closing: false,
                },
                Token::Text("<b>x</b></plaintext>".to_string()),
            ]
        );
    }

    #[test]
    fn attribute_values_decode_references_quoted_and_unquoted() {
        let tokens = tokenize(r#"<a title="a &amp; b" href=x&amp;y data-x='&quot;'>"#);
        let attrs = start_tag(&tokens, "a").expect("a start tag");
        assert_eq!(
            attrs,
            &[
                ("title".to_string(), Some("a & b".to_string())),
                ("href".to_string(), Some("x&y".to_string())),
                ("data-x".to_string(), Some("\"".to_string())),
            ]
        );
    }

    #[test]
    fn duplicate_attributes_keep_first() {
        let tokens = tokenize(r#"<p id=one ID=two class>"#);
        let attrs = start_tag(&tokens, "p").expect("p start tag");
        assert_eq!(
            attrs,
            &[
                ("id".to_string(), Some("one".to_string())),
                ("class".to_string(), None),
            ]
        );
    }

    #[test]
    fn attribute_names_allow_framework_syntax() {
        let tokens = tokenize(r#"<button @click="go()" :disabled=x>"#);
        let attrs = start_tag(&tokens, "button").expect("button start tag");
        assert_eq!(attrs[0].0, "@click");
        assert_eq!(attrs[1].0, ":disabled");
    }

    #[test]
    fn lone_less_than_is_text() {
        let tokens = tokenize("a < b <3 c");
        assert_eq!(tokens, vec![Token::Text("a < b <3 c".to_string())]);
    }

    #[test]
    fn bogus_comments_and_processing_instructions() {
        let tokens = tokenize("<!foo><?xml version=1?></ 1>");
        assert_eq!(
            tokens,
            vec![
                Token::Comment("foo".to_string()),
                Token::Comment("?xml version=1?".to_string()),
                Token::Comment(" 1".to_string()),
            ]
        );
    }

    #[test]
    fn eof_inside_tag_drops_the_tag() {
        let tokens = tokenize("ok<a href=\"x");
        assert_eq!(tokens, vec![Token::Text("ok".to_string())]);
    }

    #[test]
    fn namespaced_and_self_closing_tags() {
        let tokens = tokenize(r#"<mw:resourceloader module=foo/><svg:rect></svg:rect>"#);
        assert!(matches!(
            &tokens[0],
            Token::StartTag { name, self_closing: true, attributes }
                if name == "mw:resourceloader"
                    && attributes == &[("module".to_string(), Some("foo".to_string()))]
        ));
        assert!(matches!(&tokens[1], Token::StartTag { name, .. } if name == "svg:rect"));
        assert!(matches!(&tokens[2], Token::EndTag(name) if name == "svg:rect"));
    }

    #[test]
    fn placeholders_survive_tokenization() {
        let tokens = tokenize(r#"<a href="{{{1}}}">{{{2|x}}}</a>"#);
        let attrs = start_tag(&tokens, "a").expect("a start tag");
        assert_eq!(attrs[0].1.as_deref(), Some("{{{1}}}"));
        assert!(tokens.contains(&Token::Text("{{{2|x}}}".to_string())));
    }

    #[test]
    fn tokenize_handles_tons_of_angle_brackets() {
        let input = "<".repeat(200_000);
        let tokens = tokenize(&input);
        assert_eq!(tokens, vec![Token::Text(input)]);
    }

    #[test]
    fn tokenize_handles_many_simple_tags_linearly() {
        let input = "<a></a>".repeat(20_000);
        assert_eq!(tokenize(&input).len(), 40_000);
    }

    #[cfg(feature = "perf-tests")]
    #[test]
    fn tokenize_scales_roughly_linearly_on_dense_near_match_rawtext() {
        fn build_input(repeats: usize) -> String {
            format!("<script>{}</script>", "</scripX>".repeat(repeats))
        }

        fn measure_total(input: &str) -> Duration {
            let _ = tokenize(input);
            let mut total = Duration::ZERO;
            for _ in 0..5 {
                let start = Instant::now();
                let _ = tokenize(input);
                total += start.elapsed();
            }
            total
        }

        let t_small = measure_total(&build_input(10_000));
        let t_large = measure_total(&build_input(40_000));
        assert!(!t_small.is_zero(), "timer resolution too coarse for test");
        // Allow generous slack to avoid flakiness while still catching quadratic regressions.
        assert!(
            t_large <= t_small.saturating_mul(12),
            "expected near-linear scaling; t_small={t_small:?} t_large={t_large:?}"
        );
    }
}
