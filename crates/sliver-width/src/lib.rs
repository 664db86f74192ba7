#![forbid(unsafe_code)]

//! Unicode column accounting for terminal text.
//!
//! This crate answers one question: how many terminal columns does a
//! piece of text occupy? It does so at two levels:
//! - [`codepoint_width`] - per-codepoint width classification (0, 1 or 2)
//! - [`ClusterState`] - grapheme-cluster accumulation, where emoji
//!   sequences, flags and keycaps resolve to a single width even though
//!   their component codepoints do not sum to it
//!
//! # Example
//! ```
//! use sliver_width::{codepoint_width, ClusterState};
//!
//! assert_eq!(codepoint_width('a', false), 1);
//! assert_eq!(codepoint_width('你', false), 2);
//!
//! // A family emoji is many codepoints but two columns.
//! let mut cluster = ClusterState::new();
//! let mut chars = "👨\u{200D}👩\u{200D}👧".chars();
//! cluster.begin(chars.next().unwrap(), false);
//! for c in chars {
//!     assert!(cluster.joins(c));
//!     cluster.push(c, false);
//! }
//! assert_eq!(cluster.width(), 2);
//! ```

pub mod cluster;
pub mod codepoint;

pub use cluster::ClusterState;
pub use codepoint::{codepoint_width, is_emoji_presentation};
