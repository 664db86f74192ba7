#![forbid(unsafe_code)]

//! SGR style and OSC 8 hyperlink state tracking.
//!
//! The slicer must know which styles are open at any byte so it can
//! replay them when a cut lands mid-styled-run and close them at the
//! end of the output. We track (close code, open sequence) pairs in
//! application order; a later code with the same close code replaces
//! the earlier one, so `[31m` then `[32m` keeps only green.

use smallvec::SmallVec;

use crate::token::{Introducer, Terminator};

/// Parameter count cutoff; sequences beyond it are treated as opaque.
pub const MAX_SGR_PARAMS: usize = 32;

// Parameter values stop accumulating past this magnitude.
const MAX_PARAM_VALUE: u32 = 100_000;

/// Parsed parameter list of a canonical SGR sequence.
#[derive(Debug, Default)]
pub struct SgrParams {
    pub values: SmallVec<[u32; 8]>,
    /// More than [`MAX_SGR_PARAMS`] parameters were present.
    pub overflow: bool,
    /// A `:` sub-parameter separator was present.
    pub has_colon: bool,
}

/// Parse the parameter region of an SGR sequence (the bytes between
/// the introducer and the final `m`). Empty input yields `[0]`, so a
/// bare `ESC[m` resets.
#[must_use]
pub fn parse_sgr_params(params: &str) -> SgrParams {
    let mut out = SgrParams::default();
    let mut current: u32 = 0;
    let mut has_digit = false;
    for &b in params.as_bytes() {
        match b {
            b'0'..=b'9' => {
                if current < MAX_PARAM_VALUE {
                    current = current * 10 + u32::from(b - b'0');
                }
                has_digit = true;
            }
            b';' | b':' => {
                if b == b':' {
                    out.has_colon = true;
                }
                if out.values.len() >= MAX_SGR_PARAMS {
                    out.overflow = true;
                    return out;
                }
                out.values.push(current);
                current = 0;
                has_digit = false;
            }
            // The tokenizer guarantees digits, ';' and ':' only.
            _ => {}
        }
    }
    if has_digit || out.values.is_empty() {
        if out.values.len() >= MAX_SGR_PARAMS {
            out.overflow = true;
        } else {
            out.values.push(current);
        }
    }
    out
}

// === Close-code table ===

/// The SGR code that closes a given open code, or None for unknown
/// codes (closed by a full reset).
#[must_use]
pub fn sgr_close_code(open: u32) -> Option<u32> {
    match open {
        1 | 2 => Some(22),
        3 => Some(23),
        4 => Some(24),
        5 | 6 => Some(25),
        7 => Some(27),
        8 => Some(28),
        9 => Some(29),
        30..=38 | 90..=97 => Some(39),
        40..=48 | 100..=107 => Some(49),
        53 => Some(55),
        _ => None,
    }
}

/// Codes that close styles rather than open them (reset plus the
/// right-hand side of the close table).
#[must_use]
pub fn is_sgr_end_code(code: u32) -> bool {
    matches!(code, 0 | 22..=29 | 39 | 49 | 55)
}

fn close_seq(code: u32) -> String {
    format!("\u{1b}[{code}m")
}

const RESET_SEQ: &str = "\u{1b}[0m";

// === Style tracker ===

#[derive(Debug, Clone)]
struct StyleEntry {
    /// Canonical 7-bit close sequence, the dedup key.
    close: String,
    /// Open sequence to replay, in the dialect it arrived in.
    open: String,
}

/// Open SGR styles in application order.
#[derive(Debug, Default)]
pub struct StyleTracker {
    entries: SmallVec<[StyleEntry; 4]>,
}

impl StyleTracker {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn apply_reset(&mut self) {
        self.entries.clear();
    }

    fn apply_end(&mut self, close: &str) {
        self.entries.retain(|e| e.close != close);
    }

    fn apply_start(&mut self, open: String, close: String) {
        // Same close code replaces: only the latest foreground color
        // (say) is live.
        self.entries.retain(|e| e.close != close);
        self.entries.push(StyleEntry { close, open });
    }

    fn has_close(&self, close: &str) -> bool {
        self.entries.iter().any(|e| e.close == close)
    }

    /// Replay every open style, in application order.
    pub fn write_open_codes(&self, out: &mut String) {
        for e in &self.entries {
            out.push_str(&e.open);
        }
    }

    /// Close every open style, most recent first.
    pub fn write_close_codes(&self, out: &mut String) {
        for e in self.entries.iter().rev() {
            out.push_str(&e.close);
        }
    }
}

fn single_code(introducer: Introducer, code: u32) -> String {
    format!("{}{}m", introducer.sgr_prefix(), code)
}

fn extended_code(introducer: Introducer, parts: &[u32]) -> String {
    use std::fmt::Write;
    let mut s = String::from(introducer.sgr_prefix());
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            s.push(';');
        }
        let _ = write!(s, "{p}");
    }
    s.push('m');
    s
}

/// Fold one SGR token into the tracker.
///
/// Opaque parameter lists (colon sub-params, overflow) are kept as a
/// single entry keyed by the close code of their first parameter, so
/// `[4:3m` is still closed by `[24m`.
pub fn apply_sgr(tracker: &mut StyleTracker, token_text: &str) {
    let (introducer, params_str) = split_sgr(token_text);
    let params = parse_sgr_params(params_str);

    if params.has_colon || params.overflow {
        let first = params.values.first().copied().unwrap_or(0);
        let close = sgr_close_code(first).map_or_else(|| RESET_SEQ.to_string(), close_seq);
        tracker.apply_start(token_text.to_string(), close);
        return;
    }

    let v = &params.values;
    let mut i = 0;
    while i < v.len() {
        let code = v[i];
        if code == 0 {
            tracker.apply_reset();
            i += 1;
            continue;
        }
        if code == 38 || code == 48 {
            let close = close_seq(if code == 38 { 39 } else { 49 });
            if i + 1 < v.len() {
                let color_type = v[i + 1];
                if color_type == 5 && i + 2 < v.len() {
                    let open = extended_code(introducer, &v[i..i + 3]);
                    tracker.apply_start(open, close);
                    i += 3;
                    continue;
                }
                if color_type == 2 && i + 4 < v.len() {
                    let open = extended_code(introducer, &v[i..i + 5]);
                    tracker.apply_start(open, close);
                    i += 5;
                    continue;
                }
            }
            // Truncated extended color; keep the bare code.
            tracker.apply_start(single_code(introducer, code), close);
            i += 1;
            continue;
        }
        if is_sgr_end_code(code) {
            tracker.apply_end(&close_seq(code));
            i += 1;
            continue;
        }
        let close = sgr_close_code(code).map_or_else(|| RESET_SEQ.to_string(), close_seq);
        tracker.apply_start(single_code(introducer, code), close);
        i += 1;
    }
}

/// Split an SGR token into its introducer dialect and parameter text.
fn split_sgr(token_text: &str) -> (Introducer, &str) {
    if let Some(rest) = token_text.strip_prefix('\u{9b}') {
        (Introducer::C1, &rest[..rest.len() - 1])
    } else {
        // "ESC [ params m"
        (Introducer::Esc, &token_text[2..token_text.len() - 1])
    }
}

/// [`closes_only`] over a raw SGR token.
#[must_use]
pub fn token_closes_only(token_text: &str, tracker: &StyleTracker) -> bool {
    let (_, params_str) = split_sgr(token_text);
    closes_only(&parse_sgr_params(params_str), tracker)
}

/// Whether an SGR token seen after the slice end should still be
/// emitted: true only when every parameter closes something currently
/// open and none opens anything new.
#[must_use]
pub fn closes_only(params: &SgrParams, tracker: &StyleTracker) -> bool {
    if params.has_colon || params.overflow {
        return false;
    }
    let v = &params.values;
    let mut closing = false;
    let mut starting = false;
    let mut i = 0;
    while i < v.len() {
        let code = v[i];
        if code == 0 {
            if !tracker.is_empty() {
                closing = true;
            }
            i += 1;
            continue;
        }
        if code == 38 || code == 48 {
            starting = true;
            if i + 1 < v.len() {
                let color_type = v[i + 1];
                if color_type == 5 && i + 2 < v.len() {
                    i += 2;
                } else if color_type == 2 && i + 4 < v.len() {
                    i += 4;
                }
            }
            i += 1;
            continue;
        }
        if is_sgr_end_code(code) {
            if tracker.has_close(&close_seq(code)) {
                closing = true;
            }
            i += 1;
            continue;
        }
        starting = true;
        i += 1;
    }
    closing && !starting
}

// === Hyperlink tracker ===

/// The currently open OSC 8 hyperlink, if any.
#[derive(Debug, Clone)]
pub struct ActiveLink {
    /// Verbatim open sequence, replayed on inclusion.
    pub code: String,
    pub close_prefix: &'static str,
    pub terminator: &'static str,
}

/// At most one hyperlink is open at a time; opening replaces.
#[derive(Debug, Default)]
pub struct LinkTracker {
    active: Option<ActiveLink>,
}

impl LinkTracker {
    pub fn open(&mut self, token_text: &str, introducer: Introducer, terminator: Terminator) {
        self.active = Some(ActiveLink {
            code: token_text.to_string(),
            close_prefix: introducer.link_close_prefix(),
            terminator: terminator.as_str(),
        });
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveLink> {
        self.active.as_ref()
    }

    /// Synthesize a close in the same dialect the link was opened with.
    pub fn write_close(&self, out: &mut String) {
        if let Some(link) = &self.active {
            out.push_str(link.close_prefix);
            out.push_str(link.terminator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_codes(tracker: &StyleTracker) -> String {
        let mut s = String::new();
        tracker.write_open_codes(&mut s);
        s
    }

    fn close_codes(tracker: &StyleTracker) -> String {
        let mut s = String::new();
        tracker.write_close_codes(&mut s);
        s
    }

    #[test]
    fn parse_empty_params_is_reset() {
        let p = parse_sgr_params("");
        assert_eq!(p.values.as_slice(), &[0]);
        assert!(!p.has_colon);
        assert!(!p.overflow);
    }

    #[test]
    fn parse_multi_params() {
        let p = parse_sgr_params("1;31;4");
        assert_eq!(p.values.as_slice(), &[1, 31, 4]);
    }

    #[test]
    fn parse_trailing_semicolon_yields_zero() {
        let p = parse_sgr_params("31;");
        assert_eq!(p.values.as_slice(), &[31, 0]);
    }

    #[test]
    fn parse_clamps_huge_values() {
        let p = parse_sgr_params("99999999999");
        assert_eq!(p.values.len(), 1);
        assert!(p.values[0] < MAX_PARAM_VALUE * 10);
    }

    #[test]
    fn parse_colon_flags() {
        let p = parse_sgr_params("4:3");
        assert!(p.has_colon);
        assert_eq!(p.values.as_slice(), &[4, 3]);
    }

    #[test]
    fn parse_overflow_flags() {
        let many = "1;".repeat(40);
        let p = parse_sgr_params(&many);
        assert!(p.overflow);
    }

    #[test]
    fn close_code_table() {
        assert_eq!(sgr_close_code(1), Some(22));
        assert_eq!(sgr_close_code(2), Some(22));
        assert_eq!(sgr_close_code(31), Some(39));
        assert_eq!(sgr_close_code(38), Some(39));
        assert_eq!(sgr_close_code(97), Some(39));
        assert_eq!(sgr_close_code(41), Some(49));
        assert_eq!(sgr_close_code(107), Some(49));
        assert_eq!(sgr_close_code(53), Some(55));
        assert_eq!(sgr_close_code(73), None);
    }

    #[test]
    fn start_and_replay() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[1m");
        apply_sgr(&mut t, "\u{1b}[31m");
        assert_eq!(open_codes(&t), "\u{1b}[1m\u{1b}[31m");
        assert_eq!(close_codes(&t), "\u{1b}[39m\u{1b}[22m");
    }

    #[test]
    fn same_close_code_replaces() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[31m");
        apply_sgr(&mut t, "\u{1b}[32m");
        assert_eq!(open_codes(&t), "\u{1b}[32m");
    }

    #[test]
    fn end_code_removes_entry() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[1;31m");
        apply_sgr(&mut t, "\u{1b}[39m");
        assert_eq!(open_codes(&t), "\u{1b}[1m");
    }

    #[test]
    fn reset_clears_everything() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[1;31;4m");
        apply_sgr(&mut t, "\u{1b}[0m");
        assert!(t.is_empty());
        apply_sgr(&mut t, "\u{1b}[1;31;4m");
        apply_sgr(&mut t, "\u{1b}[m");
        assert!(t.is_empty());
    }

    #[test]
    fn extended_256_color() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[38;5;196m");
        assert_eq!(open_codes(&t), "\u{1b}[38;5;196m");
        assert_eq!(close_codes(&t), "\u{1b}[39m");
    }

    #[test]
    fn extended_truecolor_and_following_param() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[48;2;10;20;30;1m");
        assert_eq!(open_codes(&t), "\u{1b}[48;2;10;20;30m\u{1b}[1m");
    }

    #[test]
    fn truncated_extended_color_keeps_bare_code() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[38;5m");
        // 5 with no payload: 38 kept bare, 5 read as its own (unknown) code.
        assert!(open_codes(&t).starts_with("\u{1b}[38m"));
    }

    #[test]
    fn unknown_code_closed_by_reset() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[73m");
        assert_eq!(close_codes(&t), "\u{1b}[0m");
    }

    #[test]
    fn colon_subparams_kept_opaque() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[4:3m");
        assert_eq!(open_codes(&t), "\u{1b}[4:3m");
        // Closed by the close code of the first parameter.
        assert_eq!(close_codes(&t), "\u{1b}[24m");
        apply_sgr(&mut t, "\u{1b}[24m");
        assert!(t.is_empty());
    }

    #[test]
    fn c1_dialect_preserved_in_opens() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{9b}31m");
        assert_eq!(open_codes(&t), "\u{9b}31m");
        // Close codes are always canonical 7-bit.
        assert_eq!(close_codes(&t), "\u{1b}[39m");
    }

    #[test]
    fn closes_only_rules() {
        let mut t = StyleTracker::default();
        apply_sgr(&mut t, "\u{1b}[31m");
        assert!(closes_only(&parse_sgr_params("39"), &t));
        assert!(closes_only(&parse_sgr_params("0"), &t));
        // End code with no matching open style is not a close.
        assert!(!closes_only(&parse_sgr_params("22"), &t));
        // Mixed close + open is not close-only.
        assert!(!closes_only(&parse_sgr_params("39;1"), &t));
        // Extended color is a start fragment.
        assert!(!closes_only(&parse_sgr_params("38;5;196"), &t));
        // Reset with nothing open closes nothing.
        let empty = StyleTracker::default();
        assert!(!closes_only(&parse_sgr_params("0"), &empty));
    }

    #[test]
    fn link_tracker_replaces_and_closes() {
        let mut l = LinkTracker::default();
        assert!(!l.is_active());
        l.open(
            "\u{1b}]8;;https://a\u{7}",
            Introducer::Esc,
            Terminator::Bel,
        );
        l.open(
            "\u{9d}8;;https://b\u{9c}",
            Introducer::C1,
            Terminator::C1St,
        );
        let link = l.active().unwrap();
        assert_eq!(link.code, "\u{9d}8;;https://b\u{9c}");
        let mut out = String::new();
        l.write_close(&mut out);
        assert_eq!(out, "\u{9d}8;;\u{9c}");
        l.close();
        assert!(!l.is_active());
    }
}
