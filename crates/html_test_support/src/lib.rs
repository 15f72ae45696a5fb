//! Shared helpers for fixture-driven tests.

pub mod fixtures;

/// Escape control characters, quotes and backslashes so a value fits on one report line.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Report the first differing line between `expected` and `actual` with two lines of
/// context on each side.
pub fn diff_lines(expected: &[&str], actual: &[&str]) -> String {
    use std::fmt::Write;
    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    let mismatch = (0..max).find(|&i| expected.get(i) != actual.get(i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for line_idx in start..end {
            let left = expected.get(line_idx).copied().unwrap_or(missing);
            let right = actual.get(line_idx).copied().unwrap_or(missing);
            let marker = if line_idx == i { ">" } else { " " };
            let _ = writeln!(
                &mut out,
                "{marker} {:>4}  expected: {}",
                line_idx + 1,
                escape_text(left)
            );
            let _ = writeln!(
                &mut out,
                "{marker} {:>4}    actual: {}",
                line_idx + 1,
                escape_text(right)
            );
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
