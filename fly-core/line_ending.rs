//! Line boundaries over rope slices.
//!
//! Only `\n` and `\r\n` end a line, matching how ropey counts lines with its
//! `unicode_lines` feature disabled.

use ropey::RopeSlice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
  Crlf,
  LF,
}

impl LineEnding {
  pub const fn len_chars(self) -> usize {
    match self {
      Self::Crlf => 2,
      Self::LF => 1,
    }
  }

  /// The ending a lone char forms. `\r` only counts as part of `\r\n`.
  pub const fn from_char(ch: char) -> Option<Self> {
    match ch {
      '\n' => Some(Self::LF),
      _ => None,
    }
  }
}

/// The ending of `line`, if it has one.
pub fn get_line_ending(line: &RopeSlice) -> Option<LineEnding> {
  let len = line.len_chars();
  if len == 0 || line.char(len - 1) != '\n' {
    return None;
  }
  if len >= 2 && line.char(len - 2) == '\r' {
    Some(LineEnding::Crlf)
  } else {
    Some(LineEnding::LF)
  }
}

/// Char index where `line` ends, before its line ending.
pub fn line_end_char_index(slice: &RopeSlice, line: usize) -> usize {
  let ending = get_line_ending(&slice.line(line)).map_or(0, LineEnding::len_chars);
  slice.line_to_char(line + 1) - ending
}

/// Start and end (sans line ending) of the line holding `pos`.
pub fn line_bounds(slice: &RopeSlice, pos: usize) -> (usize, usize) {
  let line = slice.char_to_line(pos.min(slice.len_chars()));
  (slice.line_to_char(line), line_end_char_index(slice, line))
}

/// Start and end (including the line ending) of the line holding `pos`.
pub fn full_line_bounds(slice: &RopeSlice, pos: usize) -> (usize, usize) {
  let line = slice.char_to_line(pos.min(slice.len_chars()));
  (slice.line_to_char(line), slice.line_to_char(line + 1))
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  #[test]
  fn test_get_line_ending() {
    let r = Rope::from_str("hello\r\n");
    assert_eq!(get_line_ending(&r.slice(..)), Some(LineEnding::Crlf));
    assert_eq!(get_line_ending(&r.slice(5..6)), None);
    assert_eq!(get_line_ending(&r.slice(6..)), Some(LineEnding::LF));
    assert_eq!(get_line_ending(&r.slice(..0)), None);
  }

  #[test]
  fn test_line_end_char_index() {
    let r = Rope::from_str("abc\r\nde\nf");
    let s = r.slice(..);
    assert_eq!(line_end_char_index(&s, 0), 3);
    assert_eq!(line_end_char_index(&s, 1), 7);
    assert_eq!(line_end_char_index(&s, 2), 9);
  }

  #[test]
  fn test_line_bounds() {
    let r = Rope::from_str("foo bar\n\nbaz qux");
    let s = r.slice(..);
    assert_eq!(line_bounds(&s, 2), (0, 7));
    assert_eq!(line_bounds(&s, 7), (0, 7));
    assert_eq!(line_bounds(&s, 8), (8, 8));
    assert_eq!(line_bounds(&s, 16), (9, 16));
    assert_eq!(full_line_bounds(&s, 2), (0, 8));
    assert_eq!(full_line_bounds(&s, 8), (8, 9));
    assert_eq!(full_line_bounds(&s, 12), (9, 16));
  }
}
