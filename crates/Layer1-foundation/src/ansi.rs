//! ANSI styling and width utilities
//!
//! Styled text is measured and truncated by its *visible* width: escape
//! sequences occupy zero columns and are never split.

use crossterm::style::{Color, Stylize};

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Single-column ellipsis appended to truncated text
pub const ELLIPSIS: char = '…';

/// Named styles used by the tree renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Green,
    Yellow,
    /// 256-color index 214
    Orange,
    Red,
    Cyan,
    Dim,
    Bold,
}

/// Wrap `text` in the styling codes for `style`. With `color` off the text is
/// returned unchanged.
pub fn paint(text: &str, style: Style, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match style {
        Style::Green => text.green().to_string(),
        Style::Yellow => text.yellow().to_string(),
        Style::Orange => text.with(Color::AnsiValue(214)).to_string(),
        Style::Red => text.red().to_string(),
        Style::Cyan => text.cyan().to_string(),
        Style::Dim => text.dim().to_string(),
        Style::Bold => text.bold().to_string(),
    }
}

/// Remove all styling codes
pub fn strip(text: &str) -> String {
    strip_ansi_escapes::strip_str(text).to_string()
}

/// Display width of `text`, ignoring styling codes
pub fn visual_width(text: &str) -> usize {
    textwrap::core::display_width(&strip(text))
}

fn char_width(ch: char) -> usize {
    let mut buf = [0u8; 4];
    textwrap::core::display_width(ch.encode_utf8(&mut buf))
}

/// Shorten `text` to at most `max_width` visible columns.
///
/// Text that already fits is returned as-is. Otherwise the visible part is
/// cut so that a trailing [`ELLIPSIS`] fits, and every escape sequence after
/// the cut is still emitted so color resets survive.
pub fn truncate(text: &str, max_width: usize) -> String {
    if visual_width(text) <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(1);
    let mut out = String::with_capacity(text.len() + ELLIPSIS.len_utf8());
    let mut used = 0;
    let mut cut = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ESC {
            out.push(ch);
            copy_escape(&mut chars, &mut out);
            continue;
        }
        if cut {
            continue;
        }
        let width = char_width(ch);
        if used + width > budget {
            out.push(ELLIPSIS);
            cut = true;
            continue;
        }
        used += width;
        out.push(ch);
    }

    out
}

/// Copy the remainder of an escape sequence (the ESC itself is already
/// written) from `chars` to `out`.
fn copy_escape<I>(chars: &mut std::iter::Peekable<I>, out: &mut String)
where
    I: Iterator<Item = char>,
{
    match chars.peek().copied() {
        // CSI: ESC [ params... final byte in '@'..='~'
        Some('[') => {
            out.push('[');
            chars.next();
            for c in chars.by_ref() {
                out.push(c);
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
        // OSC: ESC ] ... (BEL | ESC \)
        Some(']') => {
            out.push(']');
            chars.next();
            while let Some(c) = chars.next() {
                out.push(c);
                if c == BEL {
                    break;
                }
                if c == ESC && chars.peek() == Some(&'\\') {
                    out.push('\\');
                    chars.next();
                    break;
                }
            }
        }
        Some(c) => {
            out.push(c);
            chars.next();
        }
        None => {}
    }
}

/// Longest common prefix of `a` and `b`, on char boundaries
pub fn longest_common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| common_len(a, b));
    &a[..end]
}

/// Byte length of `a` covered when one string is a prefix of the other
fn common_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .map(|(c, _)| c.len_utf8())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_roundtrips_through_strip() {
        let styled = paint("Done", Style::Green, true);
        assert_eq!(strip(&styled), "Done");
        assert_eq!(visual_width(&styled), 4);
    }

    #[test]
    fn test_paint_without_color() {
        assert_eq!(paint("Fail", Style::Red, false), "Fail");
        assert_eq!(paint("Warn", Style::Orange, false), "Warn");
    }

    #[test]
    fn test_visual_width_wide_chars() {
        assert_eq!(visual_width("abc"), 3);
        assert_eq!(visual_width("한글"), 4);
        assert_eq!(visual_width("\x1b[31m한글\x1b[39m"), 4);
    }

    #[test]
    fn test_truncate_fits_unchanged() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_plain() {
        let out = truncate("hello world", 8);
        assert_eq!(out, "hello w…");
        assert_eq!(visual_width(&out), 8);
    }

    #[test]
    fn test_truncate_keeps_trailing_reset() {
        let line = "abc \x1b[32mDone\x1b[39m tail text";
        let out = truncate(line, 6);

        assert_eq!(strip(&out), "abc D…");
        assert_eq!(visual_width(&out), 6);
        // the reset emitted after "Done" must survive the cut
        assert!(out.ends_with("\x1b[39m"), "reset lost: {:?}", out);
        assert_eq!(out.matches(ELLIPSIS).count(), 1);
    }

    #[test]
    fn test_truncate_wide_char_boundary() {
        // "한" is two columns: only one fits before the ellipsis
        let out = truncate("한한한", 4);
        assert_eq!(out, "한…");
        assert_eq!(visual_width(&out), 3);
    }

    #[test]
    fn test_longest_common_prefix() {
        assert_eq!(longest_common_prefix("file1.txt", "file2.txt"), "file");
        assert_eq!(longest_common_prefix("Copying a", "Copying a"), "Copying a");
        assert_eq!(longest_common_prefix("Copying abc", "Copying"), "Copying");
        assert_eq!(longest_common_prefix("abc", "xyz"), "");
        assert_eq!(longest_common_prefix("", "abc"), "");
        assert_eq!(longest_common_prefix("한글a", "한글b"), "한글");
    }
}
