#![forbid(unsafe_code)]

//! Grapheme cluster accumulation and width resolution.
//!
//! Clusters are fed one codepoint at a time. [`ClusterState::joins`]
//! asks whether the next codepoint extends the open cluster;
//! [`ClusterState::width`] resolves the finished cluster to a column
//! count. The resolution order matters: flag pairs, keycaps, emoji
//! modifier sequences and variation selectors each override the plain
//! per-codepoint sum.

use unicode_segmentation::GraphemeCursor;

use crate::codepoint::{
    codepoint_width, is_emoji_presentation, is_regional_indicator, is_skin_tone_modifier,
};

const ZWJ: char = '\u{200D}';
const KEYCAP: char = '\u{20E3}';
const VS15: char = '\u{FE0E}';
const VS16: char = '\u{FE0F}';

// Guard against pathological clusters inflating the sum.
const MAX_SUM_WIDTH: usize = 1023;

/// Accumulates one grapheme cluster and resolves its display width.
///
/// The fallback width is the uncapped sum of per-codepoint widths, so
/// decomposed multi-codepoint sequences can report more than 2 columns.
#[derive(Debug, Default)]
pub struct ClusterState {
    buf: String,
    first: char,
    last: char,
    count: u32,
    base_width: usize,
    sum_width: usize,
    emoji_base: bool,
    keycap: bool,
    regional: bool,
    skin_tone: bool,
    zwj: bool,
    vs15: bool,
    vs16: bool,
}

impl ClusterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True until `begin` has opened a cluster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Open a new cluster on `c`, discarding any previous state.
    pub fn begin(&mut self, c: char, ambiguous_is_wide: bool) {
        self.buf.clear();
        self.buf.push(c);
        self.first = c;
        self.last = c;
        self.count = 1;
        let w = codepoint_width(c, ambiguous_is_wide);
        self.base_width = w;
        self.sum_width = w;
        self.emoji_base = is_emoji_presentation(c);
        self.keycap = c == KEYCAP;
        self.regional = is_regional_indicator(c);
        self.skin_tone = is_skin_tone_modifier(c);
        self.zwj = c == ZWJ;
        self.vs15 = false;
        self.vs16 = false;
    }

    /// Extend the open cluster with `c`. Call only after `joins(c)`
    /// returned true.
    pub fn push(&mut self, c: char, ambiguous_is_wide: bool) {
        self.buf.push(c);
        self.last = c;
        self.count = self.count.saturating_add(1);
        self.keycap |= c == KEYCAP;
        self.regional |= is_regional_indicator(c);
        self.skin_tone |= is_skin_tone_modifier(c);
        self.zwj |= c == ZWJ;
        self.vs15 |= c == VS15;
        self.vs16 |= c == VS16;
        let w = codepoint_width(c, ambiguous_is_wide);
        if w > 0 {
            self.sum_width = (self.sum_width + w).min(MAX_SUM_WIDTH);
        }
    }

    /// Whether `c` extends the open cluster rather than starting a new
    /// one. False on an empty state.
    ///
    /// CR+LF joins; any other adjacency involving CR or LF breaks.
    /// Printable-ASCII pairs always break. Everything else defers to
    /// the extended grapheme cluster rules, checked against the open
    /// cluster's own codepoints (a cluster starts at a confirmed
    /// boundary, so no pre-context is needed).
    pub fn joins(&mut self, c: char) -> bool {
        if self.count == 0 {
            return false;
        }
        let prev = self.last;
        if prev == '\r' && c == '\n' {
            return true;
        }
        if prev == '\r' || prev == '\n' || c == '\r' || c == '\n' {
            return false;
        }
        if (' '..='~').contains(&prev) && (' '..='~').contains(&c) {
            return false;
        }
        let pos = self.buf.len();
        self.buf.push(c);
        let mut cursor = GraphemeCursor::new(pos, self.buf.len(), true);
        let boundary = cursor.is_boundary(&self.buf, 0).unwrap_or(true);
        self.buf.truncate(pos);
        !boundary
    }

    /// Display width of the accumulated cluster.
    #[must_use]
    pub fn width(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        if self.regional {
            // A regional indicator pair renders as one flag.
            return if self.count >= 2 { 2 } else { 1 };
        }
        if self.keycap {
            return 2;
        }
        if self.emoji_base && (self.zwj || self.skin_tone) {
            return 2;
        }
        if self.vs15 || self.vs16 {
            if self.base_width == 2 {
                return 2;
            }
            if self.vs16 {
                // VS16 upgrades to emoji presentation, except on ASCII
                // bases (digits, '#', '*') which stay narrow without a
                // following keycap.
                return if u32::from(self.first) < 0x80 { 1 } else { 2 };
            }
            return 1;
        }
        self.sum_width
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn width_is_bounded_by_sum(s in "\\PC{0,40}") {
            let mut cluster = ClusterState::new();
            for c in s.chars() {
                if cluster.joins(c) {
                    cluster.push(c, false);
                } else {
                    cluster.begin(c, false);
                }
                prop_assert!(cluster.width() <= MAX_SUM_WIDTH);
            }
        }

        #[test]
        fn ascii_never_joins(a in 0x20u8..=0x7e, b in 0x20u8..=0x7e) {
            let mut cluster = ClusterState::new();
            cluster.begin(a as char, false);
            prop_assert!(!cluster.joins(b as char));
        }
    }
}
