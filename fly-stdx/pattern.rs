//! Compiled search patterns.
//!
//! A [`Pattern`] wraps a backtracking regex (lookaround is needed by the word
//! and paragraph patterns) together with the source text and case flag it
//! was built from. Two patterns compare equal when they were built from the
//! same source with the same flag, regardless of whether they share the
//! compiled program.
//!
//! Matching is always forward. Callers that scan backward do so over reversed
//! text with patterns written for reversed text; see `fly_lib::scanner`.

use std::{
  fmt,
  sync::Arc,
};

use fancy_regex::Regex;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PatternError>;

#[derive(Debug, Error)]
pub enum PatternError {
  #[error("invalid pattern `{pattern}`: {error}")]
  Invalid {
    pattern: String,
    #[source]
    error:   fancy_regex::Error,
  },
  #[error("pattern `{pattern}` failed while matching: {error}")]
  Runtime {
    pattern: String,
    #[source]
    error:   fancy_regex::Error,
  },
}

#[derive(Clone)]
pub struct Pattern {
  source:      Arc<str>,
  ignore_case: bool,
  regex:       Arc<Regex>,
}

impl Pattern {
  /// Compile a case sensitive pattern.
  pub fn new(source: &str) -> Result<Self> {
    Self::with_case(source, false)
  }

  pub fn with_case(source: &str, ignore_case: bool) -> Result<Self> {
    let compiled = if ignore_case {
      Regex::new(&format!("(?i){source}"))
    } else {
      Regex::new(source)
    };
    let regex = compiled.map_err(|error| {
      PatternError::Invalid {
        pattern: source.to_string(),
        error,
      }
    })?;

    Ok(Self {
      source: Arc::from(source),
      ignore_case,
      regex: Arc::new(regex),
    })
  }

  /// Pattern matching `text` literally.
  pub fn literal(text: &str, ignore_case: bool) -> Result<Self> {
    Self::with_case(&escape(text), ignore_case)
  }

  /// Case insensitive unless `text` holds an uppercase character. The text
  /// is escaped unless `raw` is set.
  pub fn smartcase(text: &str, raw: bool) -> Result<Self> {
    let ignore_case = is_smartcase_insensitive(text);
    if raw {
      Self::with_case(text, ignore_case)
    } else {
      Self::literal(text, ignore_case)
    }
  }

  #[inline]
  pub fn as_str(&self) -> &str {
    &self.source
  }

  #[inline]
  pub fn ignore_case(&self) -> bool {
    self.ignore_case
  }

  /// Whether both patterns share one compiled program.
  #[inline]
  pub fn shares_program(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.regex, &other.regex)
  }

  /// Find the first match in `haystack` starting at byte offset `pos`.
  ///
  /// Text before `pos` is still visible to lookbehind and `^`, so resuming at
  /// the end of a previous match sees the same context a fresh search would.
  /// Returns byte offsets into `haystack`.
  pub fn find_at(&self, haystack: &str, pos: usize) -> Result<Option<(usize, usize)>> {
    if pos > haystack.len() {
      return Ok(None);
    }
    match self.regex.find_from_pos(haystack, pos) {
      Ok(found) => Ok(found.map(|m| (m.start(), m.end()))),
      Err(error) => {
        Err(PatternError::Runtime {
          pattern: self.source.to_string(),
          error,
        })
      },
    }
  }

  pub fn is_match(&self, haystack: &str) -> Result<bool> {
    Ok(self.find_at(haystack, 0)?.is_some())
  }

  /// Text of every capture group of the first match, `None` for groups that
  /// did not take part. Group 0 is left out.
  pub fn captures<'h>(&self, haystack: &'h str) -> Result<Option<Vec<Option<&'h str>>>> {
    let captures = self.regex.captures(haystack).map_err(|error| {
      PatternError::Runtime {
        pattern: self.source.to_string(),
        error,
      }
    })?;
    Ok(captures.map(|captures| {
      captures
        .iter()
        .skip(1)
        .map(|group| group.map(|m| m.as_str()))
        .collect()
    }))
  }
}

impl PartialEq for Pattern {
  fn eq(&self, other: &Self) -> bool {
    self.ignore_case == other.ignore_case && self.source == other.source
  }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pattern")
      .field("source", &self.source)
      .field("ignore_case", &self.ignore_case)
      .finish()
  }
}

/// Escape every regex metacharacter in `text`.
pub fn escape(text: &str) -> String {
  fancy_regex::escape(text).into_owned()
}

/// Smartcase: lowercase-only input searches case insensitively.
pub fn is_smartcase_insensitive(text: &str) -> bool {
  !text.chars().any(char::is_uppercase)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_find_at_sees_context_before_pos() {
    let pattern = Pattern::new(r"(?<=o)b").unwrap();
    assert_eq!(pattern.find_at("foob", 3).unwrap(), Some((3, 4)));
    let anchored = Pattern::new(r"^b").unwrap();
    assert_eq!(anchored.find_at("ab", 1).unwrap(), None);
  }

  #[test]
  fn test_find_at_past_end() {
    let pattern = Pattern::new("a").unwrap();
    assert_eq!(pattern.find_at("a", 2).unwrap(), None);
    assert_eq!(pattern.find_at("a", 1).unwrap(), None);
  }

  #[test]
  fn test_smartcase() {
    let lower = Pattern::smartcase("at", false).unwrap();
    assert!(lower.ignore_case());
    assert_eq!(lower.find_at("cAT", 0).unwrap(), Some((1, 3)));

    let upper = Pattern::smartcase("At", false).unwrap();
    assert!(!upper.ignore_case());
    assert_eq!(upper.find_at("cat At", 0).unwrap(), Some((4, 6)));
  }

  #[test]
  fn test_literal_escapes() {
    let pattern = Pattern::smartcase("a.b", false).unwrap();
    assert_eq!(pattern.find_at("axb a.b", 0).unwrap(), Some((4, 7)));
    let raw = Pattern::smartcase("a.b", true).unwrap();
    assert_eq!(raw.find_at("axb a.b", 0).unwrap(), Some((0, 3)));
  }

  #[test]
  fn test_equality_ignores_program_identity() {
    let a = Pattern::new("foo").unwrap();
    let b = Pattern::new("foo").unwrap();
    assert_eq!(a, b);
    assert!(!a.shares_program(&b));
    assert!(a.shares_program(&a.clone()));
    assert_ne!(a, Pattern::with_case("foo", true).unwrap());
  }

  #[test]
  fn test_captures() {
    let pattern = Pattern::new(r"line (\d+), col (\d+)(!)?").unwrap();
    let groups = pattern.captures("error at line 3, col 14").unwrap();
    assert_eq!(groups, Some(vec![Some("3"), Some("14"), None]));
    assert_eq!(pattern.captures("fine").unwrap(), None);
  }

  #[test]
  fn test_invalid_pattern() {
    let err = Pattern::new("(").unwrap_err();
    assert!(matches!(err, PatternError::Invalid { .. }));
  }
}
