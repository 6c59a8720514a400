//! Value escaping used in metadata frames.
//!
//! Metadata values travel one per line, so the worker escapes backslashes as
//! `\\` and newlines as `\n`. Decoding is deliberately lossy: a backslash
//! followed by any other character drops both, and a trailing lone backslash
//! is dropped.

/// Decode a metadata value.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Encode a metadata value. Inverse of [`unescape`].
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
