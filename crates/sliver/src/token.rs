#![forbid(unsafe_code)]

//! ANSI / OSC tokenizer.
//!
//! Tokens are byte spans over the input, classified into three kinds:
//! canonical SGR sequences (the only ones whose parameters we
//! interpret), OSC 8 hyperlinks, and everything else lumped as opaque
//! control sequences. Parsing is attempted in that priority order at
//! every escape introducer.
//!
//! Unterminated string sequences (OSC/DCS/SOS/PM/APC without ST or BEL)
//! are deliberately not parsed; the introducer then falls through to
//! the caller as an ordinary zero-width character. Consuming to end of
//! input there would let a single truncated escape swallow the rest of
//! the string.

/// ESC, the 7-bit escape introducer.
pub const ESC: char = '\u{1b}';
/// C1 CSI (0x9B).
pub const C1_CSI: char = '\u{9b}';
/// C1 OSC (0x9D).
pub const C1_OSC: char = '\u{9d}';
/// C1 DCS (0x90).
pub const C1_DCS: char = '\u{90}';
/// C1 SOS (0x98).
pub const C1_SOS: char = '\u{98}';
/// C1 PM (0x9E).
pub const C1_PM: char = '\u{9e}';
/// C1 APC (0x9F).
pub const C1_APC: char = '\u{9f}';
/// C1 ST, string terminator (0x9C).
pub const C1_ST: char = '\u{9c}';

const BEL: u8 = 0x07;

/// How a sequence was introduced; decides the byte shape of replayed
/// and synthesized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Introducer {
    /// 7-bit `ESC [` / `ESC ]`.
    Esc,
    /// Single-byte C1 control (as the codepoints U+009B / U+009D).
    C1,
}

impl Introducer {
    /// Prefix for a synthesized hyperlink close in the same dialect as
    /// the open.
    #[must_use]
    pub fn link_close_prefix(self) -> &'static str {
        match self {
            Introducer::Esc => "\u{1b}]8;;",
            Introducer::C1 => "\u{9d}8;;",
        }
    }

    /// Prefix for a synthesized SGR code.
    #[must_use]
    pub fn sgr_prefix(self) -> &'static str {
        match self {
            Introducer::Esc => "\u{1b}[",
            Introducer::C1 => "\u{9b}",
        }
    }
}

/// String terminator form of an OSC sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Bel,
    EscBackslash,
    C1St,
}

impl Terminator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Terminator::Bel => "\u{7}",
            Terminator::EscBackslash => "\u{1b}\\",
            Terminator::C1St => "\u{9c}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// CSI sequence with final byte `m` and parameters drawn only from
    /// digits, `;` and `:`. Parameters are interpreted by the style
    /// tracker.
    Sgr,
    /// OSC 8 hyperlink open (non-empty URI) or close (empty URI).
    Hyperlink {
        open: bool,
        introducer: Introducer,
        terminator: Terminator,
    },
    /// Any other complete escape sequence; replayed verbatim, never
    /// interpreted.
    Control,
}

/// A parsed escape sequence: the byte span `[start, end)` in the input
/// plus its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

impl Token {
    /// The raw bytes of the token.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }
}

// === Introducer scanning ===

/// Second byte of a two-byte C1 control we care about (the codepoints
/// U+0090..U+009F encode as 0xC2 0x90..0x9F).
#[inline]
fn is_c1_follow(b: u8) -> bool {
    matches!(b, 0x90 | 0x98 | 0x9b | 0x9c | 0x9d | 0x9e | 0x9f)
}

/// Whether byte position `i` could start an escape sequence. Cheap
/// pre-filter before [`try_parse`].
#[inline]
#[must_use]
pub fn maybe_escape(bytes: &[u8], i: usize) -> bool {
    bytes[i] == 0x1b || (bytes[i] == 0xc2 && i + 1 < bytes.len() && is_c1_follow(bytes[i + 1]))
}

/// First candidate escape introducer at or after `from`, or None.
#[must_use]
pub fn find_escape(bytes: &[u8], from: usize) -> Option<usize> {
    for off in memchr::memchr2_iter(0x1b, 0xc2, &bytes[from..]) {
        let i = from + off;
        if maybe_escape(bytes, i) {
            return Some(i);
        }
    }
    None
}

// === Parsers ===

/// Try to parse a complete escape sequence starting at byte `start`
/// (which must be a char boundary). Returns None when nothing parses,
/// in which case the introducer is treated as a plain character.
#[must_use]
pub fn try_parse(input: &str, start: usize) -> Option<Token> {
    let c = input[start..].chars().next()?;
    if c == ESC || c == C1_OSC {
        if let Some(tok) = parse_hyperlink(input, start) {
            return Some(tok);
        }
    }
    if matches!(c, ESC | C1_OSC | C1_DCS | C1_SOS | C1_PM | C1_APC | C1_ST) {
        if let Some(tok) = parse_control_string(input, start) {
            return Some(tok);
        }
    }
    if c == ESC || c == C1_CSI {
        if let Some(tok) = parse_csi(input, start) {
            return Some(tok);
        }
    }
    None
}

/// OSC 8 hyperlink: `OSC 8 ; params ; uri ST`. Open when the URI is
/// non-empty, close when it is empty.
fn parse_hyperlink(input: &str, start: usize) -> Option<Token> {
    let s = &input[start..];
    let (introducer, head) = if let Some(rest) = s.strip_prefix("\u{1b}]8;") {
        (Introducer::Esc, s.len() - rest.len())
    } else if let Some(rest) = s.strip_prefix("\u{9d}8;") {
        (Introducer::C1, s.len() - rest.len())
    } else {
        return None;
    };
    let bytes = input.as_bytes();
    let params_start = start + head;
    // Second ';' separates params from the URI.
    let semi = memchr::memchr(b';', &bytes[params_start..])?;
    let uri_start = params_start + semi + 1;
    let mut p = uri_start;
    while p < bytes.len() {
        match bytes[p] {
            BEL => {
                return Some(hyperlink_token(
                    start,
                    p + 1,
                    p > uri_start,
                    introducer,
                    Terminator::Bel,
                ));
            }
            0x1b if p + 1 < bytes.len() && bytes[p + 1] == b'\\' => {
                return Some(hyperlink_token(
                    start,
                    p + 2,
                    p > uri_start,
                    introducer,
                    Terminator::EscBackslash,
                ));
            }
            0xc2 if p + 1 < bytes.len() && bytes[p + 1] == 0x9c => {
                return Some(hyperlink_token(
                    start,
                    p + 2,
                    p > uri_start,
                    introducer,
                    Terminator::C1St,
                ));
            }
            _ => p += 1,
        }
    }
    None
}

fn hyperlink_token(
    start: usize,
    end: usize,
    open: bool,
    introducer: Introducer,
    terminator: Terminator,
) -> Token {
    Token {
        start,
        end,
        kind: TokenKind::Hyperlink {
            open,
            introducer,
            terminator,
        },
    }
}

/// Opaque string sequences (OSC, DCS, SOS, PM, APC) and standalone ST.
/// Only OSC accepts BEL as a terminator.
fn parse_control_string(input: &str, start: usize) -> Option<Token> {
    let bytes = input.as_bytes();
    let c = input[start..].chars().next()?;
    let (body, bel_terminates) = match c {
        ESC => {
            let next = *bytes.get(start + 1)?;
            match next {
                b']' => (start + 2, true),
                b'P' | b'X' | b'^' | b'_' => (start + 2, false),
                b'\\' => {
                    // Standalone ST.
                    return Some(Token {
                        start,
                        end: start + 2,
                        kind: TokenKind::Control,
                    });
                }
                _ => return None,
            }
        }
        C1_OSC => (start + c.len_utf8(), true),
        C1_DCS | C1_SOS | C1_PM | C1_APC => (start + c.len_utf8(), false),
        C1_ST => {
            return Some(Token {
                start,
                end: start + c.len_utf8(),
                kind: TokenKind::Control,
            });
        }
        _ => return None,
    };
    let mut p = body;
    while p < bytes.len() {
        match bytes[p] {
            BEL if bel_terminates => {
                return Some(Token {
                    start,
                    end: p + 1,
                    kind: TokenKind::Control,
                });
            }
            0x1b if p + 1 < bytes.len() && bytes[p + 1] == b'\\' => {
                return Some(Token {
                    start,
                    end: p + 2,
                    kind: TokenKind::Control,
                });
            }
            0xc2 if p + 1 < bytes.len() && bytes[p + 1] == 0x9c => {
                return Some(Token {
                    start,
                    end: p + 2,
                    kind: TokenKind::Control,
                });
            }
            _ => p += 1,
        }
    }
    // Unterminated: refuse to parse, the introducer stays visible.
    None
}

/// CSI sequence. Canonical SGR means final byte `m` with parameters
/// restricted to digits, `;` and `:`; anything else (intermediate
/// bytes, private markers like `?`) demotes the token to opaque.
///
/// A parameter byte outside 0x20..=0x7E ends the token early: bytes up
/// to it are consumed as an opaque control, the rest stays visible.
fn parse_csi(input: &str, start: usize) -> Option<Token> {
    let bytes = input.as_bytes();
    let c = input[start..].chars().next()?;
    let body = match c {
        ESC => {
            if bytes.get(start + 1) != Some(&b'[') {
                return None;
            }
            start + 2
        }
        C1_CSI => start + c.len_utf8(),
        _ => return None,
    };
    let mut canonical = true;
    let mut p = body;
    while p < bytes.len() {
        let b = bytes[p];
        match b {
            0x40..=0x7e => {
                let kind = if b == b'm' && canonical {
                    TokenKind::Sgr
                } else {
                    TokenKind::Control
                };
                return Some(Token {
                    start,
                    end: p + 1,
                    kind,
                });
            }
            0x30..=0x3f => {
                if !(b.is_ascii_digit() || b == b';' || b == b':') {
                    canonical = false;
                }
                p += 1;
            }
            0x20..=0x2f => {
                canonical = false;
                p += 1;
            }
            _ => {
                return Some(Token {
                    start,
                    end: p,
                    kind: TokenKind::Control,
                });
            }
        }
    }
    // Unterminated CSI consumes to end of input.
    Some(Token {
        start,
        end: bytes.len(),
        kind: TokenKind::Control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<Token> {
        try_parse(s, 0)
    }

    #[test]
    fn canonical_sgr() {
        let t = parse("\u{1b}[31mx").unwrap();
        assert_eq!(t.kind, TokenKind::Sgr);
        assert_eq!(t.text("\u{1b}[31mx"), "\u{1b}[31m");
    }

    #[test]
    fn sgr_with_colon_subparams_is_still_sgr_kind() {
        let t = parse("\u{1b}[4:3m").unwrap();
        assert_eq!(t.kind, TokenKind::Sgr);
    }

    #[test]
    fn c1_csi_sgr() {
        let s = "\u{9b}1mx";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Sgr);
        assert_eq!(t.text(s), "\u{9b}1m");
    }

    #[test]
    fn private_mode_is_control() {
        let s = "\u{1b}[?25h";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.end, s.len());
    }

    #[test]
    fn private_marker_demotes_even_with_final_m() {
        let t = parse("\u{1b}[?31m").unwrap();
        assert_eq!(t.kind, TokenKind::Control);
    }

    #[test]
    fn intermediate_byte_demotes() {
        let t = parse("\u{1b}[1 m").unwrap();
        assert_eq!(t.kind, TokenKind::Control);
    }

    #[test]
    fn non_m_final_is_control() {
        let t = parse("\u{1b}[2J").unwrap();
        assert_eq!(t.kind, TokenKind::Control);
    }

    #[test]
    fn malformed_csi_consumes_up_to_invalid_byte() {
        let s = "\u{1b}[31\u{e9}m";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.text(s), "\u{1b}[31");
    }

    #[test]
    fn unterminated_csi_consumes_to_eof() {
        let s = "\u{1b}[31;4";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.end, s.len());
    }

    #[test]
    fn lone_esc_does_not_parse() {
        assert_eq!(parse("\u{1b}"), None);
        assert_eq!(parse("\u{1b}x"), None);
    }

    #[test]
    fn osc_with_bel() {
        let s = "\u{1b}]0;title\u{7}x";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.text(s), "\u{1b}]0;title\u{7}");
    }

    #[test]
    fn osc_with_st() {
        let s = "\u{1b}]0;title\u{1b}\\x";
        let t = parse(s).unwrap();
        assert_eq!(t.text(s), "\u{1b}]0;title\u{1b}\\");
    }

    #[test]
    fn unterminated_osc_does_not_parse() {
        assert_eq!(parse("\u{1b}]0;title"), None);
    }

    #[test]
    fn dcs_ignores_bel() {
        // BEL does not terminate DCS, only ST does.
        let s = "\u{1b}Pdata\u{7}more\u{1b}\\x";
        let t = parse(s).unwrap();
        assert_eq!(t.text(s), "\u{1b}Pdata\u{7}more\u{1b}\\");
    }

    #[test]
    fn standalone_st_is_a_token() {
        let t = parse("\u{1b}\\x").unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.end, 2);
        let t = parse("\u{9c}x").unwrap();
        assert_eq!(t.end, 2);
    }

    #[test]
    fn c1_apc_string() {
        let s = "\u{9f}payload\u{9c}x";
        let t = parse(s).unwrap();
        assert_eq!(t.kind, TokenKind::Control);
        assert_eq!(t.text(s), "\u{9f}payload\u{9c}");
    }

    #[test]
    fn hyperlink_open_bel() {
        let s = "\u{1b}]8;;https://example.com\u{7}text";
        let t = parse(s).unwrap();
        match t.kind {
            TokenKind::Hyperlink {
                open,
                introducer,
                terminator,
            } => {
                assert!(open);
                assert_eq!(introducer, Introducer::Esc);
                assert_eq!(terminator, Terminator::Bel);
            }
            other => panic!("expected hyperlink, got {other:?}"),
        }
        assert_eq!(t.text(s), "\u{1b}]8;;https://example.com\u{7}");
    }

    #[test]
    fn hyperlink_close_is_not_open() {
        let s = "\u{1b}]8;;\u{7}";
        let t = parse(s).unwrap();
        assert!(matches!(t.kind, TokenKind::Hyperlink { open: false, .. }));
    }

    #[test]
    fn hyperlink_with_params_and_st() {
        let s = "\u{1b}]8;id=1;https://x\u{1b}\\y";
        let t = parse(s).unwrap();
        assert!(matches!(
            t.kind,
            TokenKind::Hyperlink {
                open: true,
                terminator: Terminator::EscBackslash,
                ..
            }
        ));
        assert_eq!(t.text(s), "\u{1b}]8;id=1;https://x\u{1b}\\");
    }

    #[test]
    fn c1_hyperlink() {
        let s = "\u{9d}8;;u\u{9c}";
        let t = parse(s).unwrap();
        assert!(matches!(
            t.kind,
            TokenKind::Hyperlink {
                open: true,
                introducer: Introducer::C1,
                terminator: Terminator::C1St,
            }
        ));
    }

    #[test]
    fn unterminated_hyperlink_falls_back() {
        // No terminator anywhere: the hyperlink parser gives up, and so
        // does the OSC parser, so nothing parses.
        assert_eq!(parse("\u{1b}]8;;https://x"), None);
    }

    #[test]
    fn find_escape_spots_c1() {
        let s = "ab\u{9b}1m";
        assert_eq!(find_escape(s.as_bytes(), 0), Some(2));
        assert_eq!(find_escape(b"plain", 0), None);
        // 0xC2 lead bytes of ordinary Latin-1 chars do not count.
        let s = "é"; // 0xC3.. no 0xC2; use U+00A0 (0xC2 0xA0)
        assert_eq!(find_escape(s.as_bytes(), 0), None);
        assert_eq!(find_escape("\u{a0}".as_bytes(), 0), None);
    }
}
