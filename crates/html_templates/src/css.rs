//! CSS sanitizing for fully substituted `style` attributes.

use regex::Regex;
use std::sync::LazyLock;

pub const INSECURE_INPUT: &str = "/* insecure input */";
pub const INVALID_CONTROL_CHAR: &str = "/* invalid control char */";

pub trait CssSanitizer {
    fn sanitize_css(&self, css: &str) -> String;
}

/// Rejects declarations that can load resources or run script.
///
/// The value is normalized first (character references and CSS escapes decoded, comments
/// removed), so obfuscated spellings such as `u\72l(` or `ex/**/pression` are caught.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCssSanitizer;

static CSS_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:([0-9A-Fa-f]{1,6})[ \t\r\n\f]?|(\r\n|[\n\r\f])|(.))")
        .expect("static CSS escape pattern")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static CSS comment pattern"));

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0E-\x1F\x7F\x{FFFD}]").expect("static control char pattern")
});

static INSECURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        expression
        | filter \s* : \s* progid \s* :
        | accelerator \s* :
        | -o-link \s* :
        | -o-link-source \s* :
        | -o-replace \s* :
        | url \s* \(
        | image \s* \(
        | image-set \s* \(
        | attr \s* \( [^)]+ [\s,]+ url
        ",
    )
    .expect("static insecure CSS pattern")
});

/// Decode references and escapes, then drop comments.
pub fn normalize_css(css: &str) -> String {
    let decoded = html::decode_char_references(css);
    let decoded = CSS_ESCAPE.replace_all(&decoded, |caps: &regex::Captures<'_>| {
        if let Some(hex) = caps.get(1) {
            let ch = u32::from_str_radix(hex.as_str(), 16)
                .ok()
                .filter(|&cp| cp != 0)
                .and_then(char::from_u32)
                .unwrap_or('\u{FFFD}');
            ch.to_string()
        } else if caps.get(2).is_some() {
            String::new()
        } else {
            caps.get(3).map_or_else(String::new, |m| m.as_str().to_string())
        }
    });
    let without_comments = COMMENT.replace_all(&decoded, "");
    // An unterminated comment runs to the end of the value.
    match without_comments.find("/*") {
        Some(pos) => without_comments[..pos].to_string(),
        None => without_comments.into_owned(),
    }
}

impl CssSanitizer for DefaultCssSanitizer {
    fn sanitize_css(&self, css: &str) -> String {
        let normalized = normalize_css(css);
        if CONTROL_CHARS.is_match(&normalized) {
            log::debug!(target: "html_templates", "rejected css with control characters");
            return INVALID_CONTROL_CHAR.to_string();
        }
        if INSECURE.is_match(&normalized) {
            log::debug!(target: "html_templates", "rejected insecure css {normalized:?}");
            return INSECURE_INPUT.to_string();
        }
        normalized
    }
}
