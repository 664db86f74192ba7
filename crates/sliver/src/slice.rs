#![forbid(unsafe_code)]

//! The streaming slice emitter and its fast paths.
//!
//! One forward pass over the input. Position only advances when a
//! grapheme cluster closes, so a cluster is included or excluded as a
//! unit. Escape sequences seen before inclusion update the style and
//! hyperlink trackers silently; once inclusion starts they are buffered
//! until the next visible character proves they belong inside the
//! slice, and after the end bound only closing codes survive.

use std::borrow::Cow;

use smallvec::SmallVec;
use tracing::trace;

use sliver_width::ClusterState;

use crate::bounds::{self, EndCut, UNBOUNDED};
use crate::measure::visible_width_with;
use crate::style::{self, LinkTracker, StyleTracker};
use crate::token::{self, Token, TokenKind};
use crate::SliceOptions;

pub(crate) fn slice_impl<'a>(
    text: &'a str,
    start: isize,
    end: Option<isize>,
    opts: &SliceOptions<'_>,
) -> Cow<'a, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    let ambiguous_is_wide = opts.ambiguous_is_wide;
    let ellipsis = opts.ellipsis.unwrap_or("");
    let ellipsis_width = if ellipsis.is_empty() {
        0
    } else {
        visible_width_with(ellipsis, ambiguous_is_wide)
    };

    let bytes = text.as_bytes();
    let len = bytes.len();

    // No codepoint is wider than 2 columns and none is shorter than one
    // byte, so any end past 2*len is effectively unbounded.
    let end = match end {
        Some(e) if e >= 0 && e as usize > len.saturating_mul(2) => None,
        other => other,
    };

    if start == 0 && end.is_none() && ellipsis_width == 0 {
        return Cow::Borrowed(text);
    }

    // Printable-ASCII prefix scan, capped just past the requested end
    // so short slices of long inputs stay cheap.
    let cap = match end {
        Some(e) if start >= 0 && e >= 0 => (e as usize).saturating_add(2).min(len),
        _ => len,
    };
    let ascii_prefix = bytes[..cap]
        .iter()
        .position(|&b| !(0x20..=0x7e).contains(&b))
        .unwrap_or(cap);
    let whole_ascii = cap == len && ascii_prefix == len;
    let inside_prefix = match end {
        Some(e) if start >= 0 && e >= 0 => (e as usize) < ascii_prefix,
        _ => false,
    };

    if whole_ascii || inside_prefix {
        trace!(start, ?end, whole_ascii, "ascii fast path");
        return ascii_slice(text, start, end, ellipsis, ellipsis_width, whole_ascii, ascii_prefix);
    }

    let (col_start, col_end, end_cut) = if start >= 0 && end.is_none_or(|e| e >= 0) {
        let s = start as usize;
        if s > len.saturating_mul(2) {
            return Cow::Borrowed("");
        }
        match end {
            None => (s, UNBOUNDED, EndCut { known: true, hint: false }),
            Some(e) => {
                let e = e as usize;
                if e <= s {
                    return Cow::Borrowed("");
                }
                // End cut is detected lazily during the walk.
                (s, e, EndCut { known: false, hint: false })
            }
        }
    } else {
        // A negative index needs the total width up front.
        let total = visible_width_with(text, ambiguous_is_wide);
        let b = bounds::resolve(start, end, total);
        if b.empty {
            return Cow::Borrowed("");
        }
        (b.start, b.end, EndCut { known: true, hint: b.cut_end })
    };

    trace!(col_start, col_end, "streaming path");
    Cow::Owned(emit(
        text,
        ascii_prefix,
        col_start,
        col_end,
        ellipsis,
        ellipsis_width,
        end_cut,
        ambiguous_is_wide,
    ))
}

/// Pure printable-ASCII request: columns are bytes, escape-free, so the
/// slice is a direct byte range.
fn ascii_slice<'a>(
    text: &'a str,
    start: isize,
    end: Option<isize>,
    ellipsis: &str,
    ellipsis_width: usize,
    whole_ascii: bool,
    ascii_prefix: usize,
) -> Cow<'a, str> {
    let total = if whole_ascii { text.len() } else { ascii_prefix };
    let b = bounds::resolve(start, end, total);
    if b.empty {
        return Cow::Borrowed("");
    }
    // When the request sits strictly inside the ASCII prefix of a
    // longer string, content always continues past the end bound.
    let cut_end = if whole_ascii { b.cut_end } else { true };
    if !b.cut_start && !cut_end {
        return Cow::Borrowed(text);
    }
    if ellipsis_width == 0 {
        return Cow::Borrowed(&text[b.start..b.end]);
    }
    let lead = b.cut_start && ellipsis_width < b.end - b.start;
    let from = b.start + if lead { ellipsis_width } else { 0 };
    let trail = cut_end && ellipsis_width < b.end - from;
    let to = b.end - if trail { ellipsis_width } else { 0 };
    if !lead && !trail {
        return Cow::Owned(ellipsis.to_string());
    }
    let mut out = String::with_capacity(to - from + 2 * ellipsis.len());
    if lead {
        out.push_str(ellipsis);
    }
    out.push_str(&text[from..to]);
    if trail {
        out.push_str(ellipsis);
    }
    Cow::Owned(out)
}

fn apply_token(tok: &Token, text: &str, styles: &mut StyleTracker, link: &mut LinkTracker) {
    match tok.kind {
        TokenKind::Sgr => style::apply_sgr(styles, tok.text(text)),
        TokenKind::Hyperlink {
            open,
            introducer,
            terminator,
        } => {
            if open {
                link.open(tok.text(text), introducer, terminator);
            } else {
                link.close();
            }
        }
        TokenKind::Control => {}
    }
}

/// Replay buffered tokens into the output. With `close_only` set (the
/// slice end has passed), only tokens that exclusively close something
/// currently open survive; everything else is dropped.
fn flush_pending(
    text: &str,
    pending: &mut SmallVec<[Token; 4]>,
    close_only: bool,
    styles: &mut StyleTracker,
    link: &mut LinkTracker,
    out: &mut String,
) {
    for tok in pending.drain(..) {
        let t = tok.text(text);
        match tok.kind {
            TokenKind::Sgr => {
                if close_only && !style::token_closes_only(t, styles) {
                    continue;
                }
                style::apply_sgr(styles, t);
                out.push_str(t);
            }
            TokenKind::Hyperlink {
                open,
                introducer,
                terminator,
            } => {
                if close_only && (open || !link.is_active()) {
                    continue;
                }
                if open {
                    link.open(t, introducer, terminator);
                } else {
                    link.close();
                }
                out.push_str(t);
            }
            TokenKind::Control => {
                if !close_only {
                    out.push_str(t);
                }
            }
        }
    }
}

/// The general single-pass emitter.
#[allow(clippy::too_many_arguments)]
fn emit(
    text: &str,
    ascii_prefix: usize,
    start: usize,
    end: usize,
    ellipsis: &str,
    ellipsis_width: usize,
    end_cut: EndCut,
    ambiguous_is_wide: bool,
) -> String {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let unbounded = end == UNBOUNDED;

    let plan = bounds::plan_ellipsis(start, end, ellipsis_width, start > 0, end_cut);
    if plan.verbatim {
        return ellipsis.to_string();
    }
    let start = plan.start;
    let end = plan.end;
    let spec_end = if unbounded { UNBOUNDED } else { end + plan.spec_budget };
    let mut trail = plan.trail;

    let mut out = String::new();
    let mut styles = StyleTracker::default();
    let mut link = LinkTracker::default();
    let mut cluster = ClusterState::new();
    let mut pending: SmallVec<[Token; 4]> = SmallVec::new();
    // Content in columns [end, spec_end) when the end cut is still
    // unknown; kept only if the walk reaches EOF without a cut.
    let mut spec_zone = String::new();
    let mut in_spec_zone = false;
    let mut include = false;
    let mut saw_cut_end = false;

    // ASCII prefix bytes are one column each with no escapes; jump to
    // the last prefix byte at or before `start` so a combining mark
    // right after the prefix still joins its base.
    let mut i = start.min(ascii_prefix.saturating_sub(1));
    let mut position = i;

    while i < len {
        if token::maybe_escape(bytes, i) {
            if let Some(tok) = token::try_parse(text, i) {
                if include {
                    pending.push(tok);
                } else {
                    apply_token(&tok, text, &mut styles, &mut link);
                }
                i = tok.end;
                continue;
            }
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        if cluster.joins(c) {
            // Cluster continuation: position unchanged, tokens seen
            // inside the cluster belong with it.
            if include {
                flush_pending(text, &mut pending, false, &mut styles, &mut link, &mut out);
                if in_spec_zone {
                    spec_zone.push(c);
                } else {
                    out.push(c);
                }
            } else {
                pending.clear();
            }
            cluster.push(c, ambiguous_is_wide);
        } else {
            if !cluster.is_empty() {
                position += cluster.width();
            }
            if !unbounded && position >= spec_end {
                saw_cut_end = true;
                flush_pending(text, &mut pending, true, &mut styles, &mut link, &mut out);
                break;
            }
            if !include && position >= start {
                include = true;
                styles.write_open_codes(&mut out);
                if plan.lead {
                    out.push_str(ellipsis);
                }
                if let Some(l) = link.active() {
                    out.push_str(&l.code);
                }
            }
            if include {
                flush_pending(text, &mut pending, false, &mut styles, &mut link, &mut out);
                if !unbounded && position >= end && plan.spec_budget > 0 {
                    in_spec_zone = true;
                    spec_zone.push(c);
                } else {
                    out.push(c);
                }
            } else {
                pending.clear();
            }
            cluster.begin(c, ambiguous_is_wide);
        }
        i += c.len_utf8();
    }

    if !saw_cut_end {
        if !cluster.is_empty() {
            position += cluster.width();
        }
        if include {
            let past_end = !unbounded && position >= spec_end;
            flush_pending(text, &mut pending, past_end, &mut styles, &mut link, &mut out);
        }
    }

    if !include {
        return String::new();
    }

    if plan.spec_budget > 0 {
        if saw_cut_end {
            // Cut confirmed: the zone is discarded, the ellipsis stands.
        } else {
            out.push_str(&spec_zone);
            trail = false;
        }
    }

    // A hyperlink never spans the ellipsis.
    link.write_close(&mut out);
    if trail {
        out.push_str(ellipsis);
    }
    styles.write_close_codes(&mut out);
    out
}
