//! HTML escaping for text nodes and attribute values.
//!
//! Escaping happens once, at render time. The output uses the same entity set
//! as Go's `html.EscapeString`: `&amp;`, `&lt;`, `&gt;`, `&#34;` and `&#39;`.

use memchr::{memchr2, memchr3};

/// Append `s` to `out`, escaping HTML special characters.
pub fn escape_html(out: &mut String, s: &str) {
    let bytes = s.as_bytes();
    let mut mark = 0;

    while let Some(i) = next_special(bytes, mark) {
        out.push_str(&s[mark..i]);
        // next_special only stops on the five bytes below
        out.push_str(match bytes[i] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&#34;",
            _ => "&#39;",
        });
        mark = i + 1; // all escaped characters are ASCII
    }

    out.push_str(&s[mark..]);
}

/// Escaped copy of `s`.
pub fn escape_html_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_html(&mut out, s);
    out
}

/// Position of the next byte needing an escape, searching from `from`.
#[inline(always)]
fn next_special(bytes: &[u8], from: usize) -> Option<usize> {
    let rest = bytes.get(from..)?;

    // memchr3 is SIMD-accelerated so two calls are still fast.
    let common = memchr3(b'&', b'<', b'>', rest);
    let quotes = memchr2(b'"', b'\'', rest);

    match (common, quotes) {
        (Some(a), Some(b)) => Some(from + a.min(b)),
        (Some(a), None) | (None, Some(a)) => Some(from + a),
        (None, None) => None,
    }
}
