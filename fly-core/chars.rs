use std::fmt;

use crate::line_ending::LineEnding;

/// Separators used when a document does not configure its own.
pub const DEFAULT_WORD_SEPARATORS: &str = "./\\()\"'-:,.;<>~!@#$%^&*|+=[]{}`~?";

#[derive(Debug, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Eol,
  Word,
  Separator,
}

/// The set of characters that split words, on top of whitespace.
#[derive(Clone, PartialEq, Eq)]
pub struct WordSeparators {
  chars: Box<str>,
}

impl WordSeparators {
  pub fn new(chars: impl Into<String>) -> Self {
    Self {
      chars: chars.into().into_boxed_str(),
    }
  }

  #[inline]
  pub fn as_str(&self) -> &str {
    &self.chars
  }

  #[inline]
  pub fn contains(&self, ch: char) -> bool {
    self.chars.contains(ch)
  }

  #[inline]
  pub fn is_word_char(&self, ch: char) -> bool {
    !ch.is_whitespace() && !self.contains(ch)
  }

  pub fn categorize(&self, ch: char) -> CharCategory {
    match ch {
      c if char_is_line_ending(c) => CharCategory::Eol,
      c if c.is_whitespace() => CharCategory::Whitespace,
      c if self.contains(c) => CharCategory::Separator,
      _ => CharCategory::Word,
    }
  }

  /// Body of a regex character class matching any separator or whitespace,
  /// e.g. `\.\-\s` (without the surrounding brackets).
  pub fn class_body(&self) -> String {
    let mut body = String::with_capacity(self.chars.len() * 2 + 2);
    let mut seen = Vec::with_capacity(self.chars.len());
    for ch in self.chars.chars() {
      if seen.contains(&ch) {
        continue;
      }
      seen.push(ch);
      if matches!(ch, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        body.push('\\');
      }
      body.push(ch);
    }
    body.push_str("\\s");
    body
  }

  /// Pattern matching a run of word characters.
  pub fn word_pattern(&self) -> String {
    format!("[^{}]+", self.class_body())
  }
}

impl Default for WordSeparators {
  fn default() -> Self {
    Self::new(DEFAULT_WORD_SEPARATORS)
  }
}

impl fmt::Debug for WordSeparators {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("WordSeparators").field(&self.chars).finish()
  }
}

impl From<&str> for WordSeparators {
  fn from(chars: &str) -> Self {
    Self::new(chars)
  }
}

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  LineEnding::from_char(ch).is_some()
}

/// Spaces and tabs, the only whitespace an indentation or a blank line is
/// made of.
#[inline]
pub fn char_is_blank(ch: char) -> bool {
  matches!(ch, ' ' | '\t')
}
