#![forbid(unsafe_code)]

//! ANSI-aware slicing of terminal text by visible columns.
//!
//! [`slice`] cuts a string at display-column boundaries while keeping
//! escape sequences coherent: SGR styles open at the cut are replayed
//! at the front and closed at the back, OSC 8 hyperlinks are re-opened
//! and terminated, grapheme clusters (emoji ZWJ sequences, flags,
//! combining marks) are never split, and CJK width is accounted for.
//!
//! # Example
//! ```
//! use sliver::{slice, visible_width};
//!
//! assert_eq!(slice("hello world", 0, Some(5)), "hello");
//!
//! // Styles survive the cut.
//! assert_eq!(
//!     slice("\u{1b}[31municorn\u{1b}[39m", 0, Some(3)),
//!     "\u{1b}[31muni\u{1b}[39m"
//! );
//!
//! // Negative indices count back from the visible end.
//! assert_eq!(slice("hello", -2, None), "lo");
//!
//! assert_eq!(visible_width("\u{1b}[1m你好\u{1b}[22m"), 4);
//! ```
//!
//! Truncation with an ellipsis shares the same engine:
//! ```
//! use sliver::{slice_with_options, SliceOptions};
//!
//! let opts = SliceOptions::new().ellipsis("\u{2026}");
//! assert_eq!(slice_with_options("unicorn", 0, Some(4), &opts), "uni\u{2026}");
//! ```

pub mod bounds;
pub mod measure;
pub mod style;
pub mod token;

mod slice;

use std::borrow::Cow;

pub use measure::{strip_ansi, visible_width, visible_width_with};

/// Options for [`slice_with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceOptions<'a> {
    /// Marker inserted on a truncated side, paid for out of the
    /// requested column budget. None (or empty) disables it.
    pub ellipsis: Option<&'a str>,
    /// Count East Asian Ambiguous characters as two columns.
    pub ambiguous_is_wide: bool,
}

impl<'a> SliceOptions<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ellipsis(mut self, ellipsis: &'a str) -> Self {
        self.ellipsis = Some(ellipsis);
        self
    }

    #[must_use]
    pub fn ambiguous_is_wide(mut self, yes: bool) -> Self {
        self.ambiguous_is_wide = yes;
        self
    }
}

/// Slice `text` to the visible column range `[start, end)`.
///
/// `start` and `end` are display columns, not bytes or codepoints;
/// negative values count back from the total visible width, and
/// `end: None` means "to the end". Escape sequences never count toward
/// columns. Returns a borrow of `text` whenever the result is a
/// verbatim sub-slice.
#[must_use]
pub fn slice(text: &str, start: isize, end: Option<isize>) -> Cow<'_, str> {
    slice_with_options(text, start, end, &SliceOptions::default())
}

/// [`slice`] with an ellipsis and width options.
#[must_use]
pub fn slice_with_options<'a>(
    text: &'a str,
    start: isize,
    end: Option<isize>,
    options: &SliceOptions<'_>,
) -> Cow<'a, str> {
    slice::slice_impl(text, start, end, options)
}
