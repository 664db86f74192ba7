#![forbid(unsafe_code)]

//! Whole-string measurement: visible width and escape stripping.

use std::borrow::Cow;

use sliver_width::ClusterState;

use crate::token;

/// Visible column width of `text`, skipping every tokenizable escape
/// sequence and resolving grapheme clusters.
#[must_use]
pub fn visible_width(text: &str) -> usize {
    visible_width_with(text, false)
}

/// [`visible_width`] with East Asian Ambiguous characters counted as
/// wide.
#[must_use]
pub fn visible_width_with(text: &str, ambiguous_is_wide: bool) -> usize {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut total = 0;
    let mut cluster = ClusterState::new();
    let mut i = 0;
    while i < len {
        if token::maybe_escape(bytes, i) {
            if let Some(tok) = token::try_parse(text, i) {
                i = tok.end;
                continue;
            }
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        if cluster.joins(c) {
            cluster.push(c, ambiguous_is_wide);
        } else {
            total += cluster.width();
            cluster.begin(c, ambiguous_is_wide);
        }
        i += c.len_utf8();
    }
    total + cluster.width()
}

/// Remove every tokenizable escape sequence from `text`. Unterminated
/// introducers are not sequences and stay in place, matching how the
/// slicer treats them (as ordinary zero-width characters).
///
/// Borrows when there is nothing to strip.
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut i = match first_token(text, 0) {
        Some(i) => i,
        None => return Cow::Borrowed(text),
    };
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..i]);
    while i < bytes.len() {
        if token::maybe_escape(bytes, i) {
            if let Some(tok) = token::try_parse(text, i) {
                i = tok.end;
                continue;
            }
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    Cow::Owned(out)
}

/// Byte offset of the first parseable escape sequence at or after
/// `from`, or None.
fn first_token(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut at = from;
    while let Some(i) = token::find_escape(bytes, at) {
        if token::try_parse(text, i).is_some() {
            return Some(i);
        }
        at = i + 1;
    }
    None
}
