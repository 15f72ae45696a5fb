/// Decode HTML character references.
///
/// Contract:
/// - Named references are decoded when they appear in [`NAMED_REFERENCES`] and are
///   semicolon-terminated (`&amp;`, `&nbsp;`, `&rbrace;`, ...).
/// - Numeric references are decoded when well-formed and semicolon-terminated:
///   `&#123;` (decimal) and `&#x1F4A9;` (hex).
/// - Only valid Unicode scalar values decode; surrogates and out-of-range values pass
///   through unchanged.
/// - Missing semicolons, unknown names, malformed numerics, or overlong digit runs are
///   left unchanged.
pub fn decode_char_references(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    let mut i = first;
    let mut copy_start = 0;

    while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }

        // Flush bytes up to '&' unchanged (preserves UTF-8).
        if copy_start < i {
            out.push_str(&s[copy_start..i]);
        }

        match decode_reference_at(s, i) {
            Some((decoded, end)) => {
                decoded.push_onto(&mut out);
                i = end;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
        copy_start = i;
    }

    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }

    out
}

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111
const MAX_NAME_LEN: usize = 32;

enum Decoded {
    Char(char),
    Str(&'static str),
}

impl Decoded {
    fn push_onto(&self, out: &mut String) {
        match self {
            Decoded::Char(c) => out.push(*c),
            Decoded::Str(s) => out.push_str(s),
        }
    }
}

/// Decode the reference starting at `start` (which must point at `&`).
/// Returns the decoded value and the index just past the terminating `;`.
fn decode_reference_at(s: &str, start: usize) -> Option<(Decoded, usize)> {
    let bytes = s.as_bytes();
    let mut j = start + 1;
    if bytes.get(j) == Some(&b'#') {
        j += 1;
        let is_hex = matches!(bytes.get(j), Some(b'x') | Some(b'X'));
        if is_hex {
            j += 1;
        }
        let max_digits = if is_hex { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
        let end = scan_digits(bytes, j, max_digits, is_hex)?;
        let digits = &s[j..end];
        let radix = if is_hex { 16 } else { 10 };
        let ch = u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)?;
        return Some((Decoded::Char(ch), end + 1));
    }

    let name_start = j;
    while j < bytes.len() && j - name_start <= MAX_NAME_LEN && bytes[j].is_ascii_alphanumeric() {
        j += 1;
    }
    if j == name_start || bytes.get(j) != Some(&b';') {
        return None;
    }
    let name = &s[name_start..j];
    let index = NAMED_REFERENCES
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()?;
    Some((Decoded::Str(NAMED_REFERENCES[index].1), j + 1))
}

// Bounded scan to avoid quadratic behavior on adversarial input.
fn scan_digits(bytes: &[u8], start: usize, max_digits: usize, is_hex: bool) -> Option<usize> {
    let mut j = start;
    let mut digits = 0usize;

    while j < bytes.len() {
        let b = bytes[j];
        if b == b';' {
            return (digits > 0).then_some(j);
        }
        if digits == max_digits {
            return None;
        }
        let ok = if is_hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            return None;
        }
        digits += 1;
        j += 1;
    }

    None
}

/// Named references understood by [`decode_char_references`], sorted by name
/// (byte order) for binary search.
const NAMED_REFERENCES: &[(&str, &str)] = &[
    ("AMP", "&"),
    ("Aacute", "\u{C1}"),
    ("Agrave", "\u{C0}"),
    ("Auml", "\u{C4}"),
    ("Ccedil", "\u{C7}"),
    ("Eacute", "\u{C9}"),
    ("GT", ">"),
    ("LT", "<"),
    ("Ntilde", "\u{D1}"),
    ("Ouml", "\u{D6}"),
    ("QUOT", "\""),
    ("Uuml", "\u{DC}"),
    ("aacute", "\u{E1}"),
    ("agrave", "\u{E0}"),
    ("amp", "&"),
    ("apos", "'"),
    ("auml", "\u{E4}"),
    ("bull", "\u{2022}"),
    ("ccedil", "\u{E7}"),
    ("cent", "\u{A2}"),
    ("colon", ":"),
    ("comma", ","),
    ("copy", "\u{A9}"),
    ("deg", "\u{B0}"),
    ("divide", "\u{F7}"),
    ("dollar", "$"),
    ("eacute", "\u{E9}"),
    ("egrave", "\u{E8}"),
    ("equals", "="),
    ("euro", "\u{20AC}"),
    ("excl", "!"),
    ("frac12", "\u{BD}"),
    ("frac14", "\u{BC}"),
    ("frac34", "\u{BE}"),
    ("gt", ">"),
    ("hellip", "\u{2026}"),
    ("iexcl", "\u{A1}"),
    ("iquest", "\u{BF}"),
    ("laquo", "\u{AB}"),
    ("lbrace", "{"),
    ("lbrack", "["),
    ("lcub", "{"),
    ("ldquo", "\u{201C}"),
    ("lpar", "("),
    ("lsqb", "["),
    ("lsquo", "\u{2018}"),
    ("lt", "<"),
    ("mdash", "\u{2014}"),
    ("middot", "\u{B7}"),
    ("nbsp", "\u{A0}"),
    ("ndash", "\u{2013}"),
    ("ntilde", "\u{F1}"),
    ("num", "#"),
    ("ouml", "\u{F6}"),
    ("para", "\u{B6}"),
    ("percnt", "%"),
    ("period", "."),
    ("plus", "+"),
    ("plusmn", "\u{B1}"),
    ("pound", "\u{A3}"),
    ("quest", "?"),
    ("quot", "\""),
    ("raquo", "\u{BB}"),
    ("rbrace", "}"),
    ("rbrack", "]"),
    ("rcub", "}"),
    ("rdquo", "\u{201D}"),
    ("reg", "\u{AE}"),
    ("rpar", ")"),
    ("rsqb", "]"),
    ("rsquo", "\u{2019}"),
    ("sect", "\u{A7}"),
    ("semi", ";"),
    ("shy", "\u{AD}"),
    ("sol", "/"),
    ("szlig", "\u{DF}"),
    ("times", "\u{D7}"),
    ("trade", "\u{2122}"),
    ("uuml", "\u{FC}"),
    ("verbar", "|"),
    ("vert", "|"),
    ("yen", "\u{A5}"),
];
