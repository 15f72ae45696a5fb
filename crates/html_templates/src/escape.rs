//! Context transforms applied to argument values and expanded text.

use memchr::{memchr2, memmem};

/// Whether `text` contains the placeholder opening marker `{{`.
pub fn has_placeholder_marker(text: &str) -> bool {
    memmem::find(text.as_bytes(), b"{{").is_some()
}

/// Escape `<` and `>` as `&lt;`/`&gt;`, leaving everything else (including `&`) alone.
pub fn escape_angle_brackets(text: &str) -> String {
    let bytes = text.as_bytes();
    let Some(first) = memchr2(b'<', b'>', bytes) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(&text[..first]);
    for ch in text[first..].chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape `;` so an inserted value cannot end a CSS declaration. Backslashes are
/// escaped too, or a value ending in `\` would cancel the `;` escape.
pub fn escape_css_semicolons(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Encode `value` as a JavaScript string literal, quotes included.
///
/// The literal never contains `<`, `>` or `&`, so it cannot close a `<script>` element or
/// start a character reference in an event-handler attribute.
pub fn encode_js_value(value: &str) -> String {
    let json = serde_json::Value::from(value).to_string();
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

/// Whether the trimmed value is exactly one `{{{…}}}` span.
pub fn is_single_placeholder(value: &str) -> bool {
    let value = value.trim();
    if !value.starts_with("{{{") || !value.ends_with("}}}") {
        return false;
    }
    let mut depth = 0usize;
    for (idx, b) in value.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && idx + 1 < value.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
