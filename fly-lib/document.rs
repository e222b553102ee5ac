//! Document state and the read interface the scanner works against.
//!
//! Positions are char indices. [`TextSource`] is everything the scanner and
//! the navigators need from a buffer: its length, slices of it, the folded
//! (hidden) ranges, and line bounds. [`Document`] is the owned buffer used by
//! the command layer: text, selection, folds, flags and settings.
//!
//! Edits go through [`Document::insert`], [`Document::erase`] and
//! [`Document::replace`]. Each one maps the selection and the folds through
//! the change. Undo grouping is left to the host.
//!
//! ```ignore
//! use fly_lib::document::{Document, DocumentId, TextSource};
//!
//! let mut doc = Document::from_str(DocumentId::MIN, "hello");
//! doc.insert(5, " world")?;
//! assert_eq!(doc.substr(0, 11), "hello world");
//! ```

use std::{
  borrow::Cow,
  num::NonZeroUsize,
  path::{
    Path,
    PathBuf,
  },
};

use fly_core::{
  chars::{
    WordSeparators,
    char_is_blank,
  },
  line_ending::{
    full_line_bounds,
    line_bounds,
  },
};
use ropey::Rope;
use thiserror::Error;

use crate::selection::{
  Range,
  Selection,
};

/// Read access to a buffer.
pub trait TextSource {
  fn len_chars(&self) -> usize;

  /// Text between `start` and `end`, clamped to the buffer.
  fn substr(&self, start: usize, end: usize) -> Cow<'_, str>;

  /// Hidden ranges, ordered and disjoint.
  fn folded_ranges(&self) -> &[(usize, usize)];

  /// Bounds of the line holding `pos`, without its line ending.
  fn line_containing(&self, pos: usize) -> (usize, usize);

  /// Bounds of the line holding `pos`, including its line ending.
  fn full_line(&self, pos: usize) -> (usize, usize);

  fn char_at(&self, pos: usize) -> Option<char> {
    if pos >= self.len_chars() {
      return None;
    }
    self.substr(pos, pos + 1).chars().next()
  }

  /// First char on the line of `pos` that is not a space or a tab, or the
  /// line end for blank lines.
  fn first_non_blank(&self, pos: usize) -> usize {
    let (start, end) = self.line_containing(pos);
    let line = self.substr(start, end);
    start + line.chars().take_while(|&ch| char_is_blank(ch)).count()
  }

  /// Column (in chars) of `pos` within its line.
  fn column(&self, pos: usize) -> usize {
    pos - self.line_containing(pos).0
  }
}

impl TextSource for Rope {
  fn len_chars(&self) -> usize {
    Rope::len_chars(self)
  }

  fn substr(&self, start: usize, end: usize) -> Cow<'_, str> {
    let len = Rope::len_chars(self);
    let end = end.min(len);
    let start = start.min(end);
    self.slice(start..end).into()
  }

  fn folded_ranges(&self) -> &[(usize, usize)] {
    &[]
  }

  fn line_containing(&self, pos: usize) -> (usize, usize) {
    line_bounds(&self.slice(..), pos)
  }

  fn full_line(&self, pos: usize) -> (usize, usize) {
    full_line_bounds(&self.slice(..), pos)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(NonZeroUsize);

impl DocumentId {
  pub const MIN: Self = Self(NonZeroUsize::MIN);

  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }

  #[must_use]
  pub fn next(self) -> Self {
    Self(self.0.saturating_add(1))
  }
}

impl From<NonZeroUsize> for DocumentId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFlags {
  pub readonly: bool,
  pub modified: bool,
}

/// Per-document settings read by the commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSettings {
  pub word_separators:          WordSeparators,
  pub tab_size:                 usize,
  pub translate_tabs_to_spaces: bool,
}

impl Default for DocumentSettings {
  fn default() -> Self {
    Self {
      word_separators:          WordSeparators::default(),
      tab_size:                 4,
      translate_tabs_to_spaces: true,
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
  #[error("document is readonly")]
  Readonly,
  #[error("position {pos} is out of bounds for document of length {len}")]
  OutOfBounds { pos: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone)]
pub struct Document {
  id:        DocumentId,
  path:      Option<PathBuf>,
  text:      Rope,
  selection: Selection,
  folds:     Vec<(usize, usize)>,
  flags:     DocumentFlags,
  settings:  DocumentSettings,
}

impl Document {
  pub fn new(id: DocumentId, text: Rope) -> Self {
    Self {
      id,
      path: None,
      text,
      selection: Selection::point(0),
      folds: Vec::new(),
      flags: DocumentFlags::default(),
      settings: DocumentSettings::default(),
    }
  }

  #[allow(clippy::should_implement_trait)]
  pub fn from_str(id: DocumentId, text: &str) -> Self {
    Self::new(id, Rope::from_str(text))
  }

  pub fn id(&self) -> DocumentId {
    self.id
  }

  pub fn display_name(&self) -> Cow<'_, str> {
    match self.path.as_deref().and_then(Path::file_name) {
      Some(name) => name.to_string_lossy(),
      None => Cow::Borrowed("<untitled>"),
    }
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: impl Into<PathBuf>) {
    self.path = Some(path.into());
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn set_selection(&mut self, selection: Selection) {
    let len = self.text.len_chars();
    self.selection = selection.transform(|range| Some(range.map(|pos| pos.min(len))));
  }

  pub fn flags(&self) -> DocumentFlags {
    self.flags
  }

  pub fn is_readonly(&self) -> bool {
    self.flags.readonly
  }

  pub fn set_readonly(&mut self, readonly: bool) {
    self.flags.readonly = readonly;
  }

  pub fn settings(&self) -> &DocumentSettings {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut DocumentSettings {
    &mut self.settings
  }

  // Folding.
  //

  pub fn folds(&self) -> &[(usize, usize)] {
    &self.folds
  }

  /// Hide `from..to`. Folds touching or overlapping it are merged into one.
  pub fn fold(&mut self, from: usize, to: usize) {
    let len = self.text.len_chars();
    let (mut from, mut to) = (from.min(len), to.min(len));
    if from >= to {
      return;
    }

    let mut folds = Vec::with_capacity(self.folds.len() + 1);
    for &(start, end) in &self.folds {
      if end < from || start > to {
        folds.push((start, end));
      } else {
        from = from.min(start);
        to = to.max(end);
      }
    }
    folds.push((from, to));
    folds.sort_unstable();
    self.folds = folds;
  }

  /// Remove every fold intersecting `from..to`. Returns whether any was
  /// removed.
  pub fn unfold(&mut self, from: usize, to: usize) -> bool {
    let before = self.folds.len();
    self
      .folds
      .retain(|&(start, end)| end <= from || start >= to.max(from + 1));
    self.folds.len() != before
  }

  // Edits.
  //

  pub fn insert(&mut self, pos: usize, text: &str) -> Result<()> {
    self.replace(pos, pos, text)
  }

  pub fn erase(&mut self, from: usize, to: usize) -> Result<()> {
    self.replace(from, to, "")
  }

  /// Replace `from..to` with `text`.
  pub fn replace(&mut self, from: usize, to: usize, text: &str) -> Result<()> {
    if self.flags.readonly {
      return Err(DocumentError::Readonly);
    }
    let len = self.text.len_chars();
    let (from, to) = (from.min(to), from.max(to));
    if to > len {
      return Err(DocumentError::OutOfBounds { pos: to, len });
    }

    let inserted = text.chars().count();
    if from == to && inserted == 0 {
      return Ok(());
    }

    self.text.remove(from..to);
    self.text.insert(from, text);

    let map = |pos: usize| map_position(pos, from, to, inserted);
    let selection = std::mem::take(&mut self.selection);
    self.selection = selection.transform(|range| Some(range.map(map)));
    self.folds = self
      .folds
      .iter()
      .map(|&(start, end)| (map(start), map(end)))
      .filter(|(start, end)| start < end)
      .collect();
    self.flags.modified = true;
    Ok(())
  }

  /// Apply several replacements at once. Positions refer to the text before
  /// any of them is applied; overlapping replacements are rejected by
  /// applying them back to front and skipping those that would overlap.
  pub fn replace_many(&mut self, mut edits: Vec<(usize, usize, String)>) -> Result<()> {
    edits.sort_by_key(|(from, to, _)| (*from, *to));
    let mut limit = usize::MAX;
    for (from, to, text) in edits.into_iter().rev() {
      if to > limit {
        continue;
      }
      self.replace(from, to, &text)?;
      limit = from;
    }
    Ok(())
  }
}

/// Where `pos` ends up after `from..to` is replaced by `inserted` chars.
///
/// Positions before the edit stay. A position at the insertion point of a
/// pure insertion moves past the inserted text. Positions inside a replaced
/// span move to the end of the replacement.
fn map_position(pos: usize, from: usize, to: usize, inserted: usize) -> usize {
  if from == to {
    return if pos < from { pos } else { pos + inserted };
  }
  if pos <= from {
    pos
  } else if pos >= to {
    pos - (to - from) + inserted
  } else {
    from + inserted
  }
}

impl TextSource for Document {
  fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  fn substr(&self, start: usize, end: usize) -> Cow<'_, str> {
    TextSource::substr(&self.text, start, end)
  }

  fn folded_ranges(&self) -> &[(usize, usize)] {
    &self.folds
  }

  fn line_containing(&self, pos: usize) -> (usize, usize) {
    line_bounds(&self.text.slice(..), pos)
  }

  fn full_line(&self, pos: usize) -> (usize, usize) {
    full_line_bounds(&self.text.slice(..), pos)
  }
}

/// Text of `range`.
pub fn fragment<T: TextSource + ?Sized>(text: &T, range: Range) -> Cow<'_, str> {
  text.substr(range.from(), range.to())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(text: &str) -> Document {
    Document::from_str(DocumentId::new(NonZeroUsize::new(1).unwrap()), text)
  }

  #[test]
  fn test_text_source() {
    let doc = doc("foo bar\n\nbaz qux");
    assert_eq!(doc.len_chars(), 16);
    assert_eq!(doc.substr(4, 7), "bar");
    assert_eq!(doc.substr(12, 99), " qux");
    assert_eq!(doc.line_containing(10), (9, 16));
    assert_eq!(doc.full_line(0), (0, 8));
    assert_eq!(doc.char_at(8), Some('\n'));
    assert_eq!(doc.char_at(16), None);
  }

  #[test]
  fn test_first_non_blank() {
    let doc = doc("  \tfoo\n   \nbar");
    assert_eq!(doc.first_non_blank(5), 3);
    assert_eq!(doc.first_non_blank(8), 10);
    assert_eq!(doc.first_non_blank(11), 11);
  }

  #[test]
  fn test_readonly_rejects_edits() {
    let mut doc = doc("hello");
    doc.set_readonly(true);
    assert_eq!(doc.insert(0, "x"), Err(DocumentError::Readonly));
    assert_eq!(doc.text().to_string(), "hello");
    assert!(!doc.flags().modified);
  }

  #[test]
  fn test_out_of_bounds() {
    let mut doc = doc("hello");
    assert_eq!(
      doc.erase(2, 9),
      Err(DocumentError::OutOfBounds { pos: 9, len: 5 })
    );
  }

  #[test]
  fn test_insert_maps_selection() {
    let mut doc = doc("hello world");
    doc.set_selection(Selection::new([Range::point(0), Range::new(6, 11)]));
    doc.insert(0, ">> ").unwrap();
    assert_eq!(doc.text().to_string(), ">> hello world");
    assert_eq!(
      doc.selection().ranges(),
      &[Range::point(3), Range::new(9, 14)]
    );
    assert!(doc.flags().modified);
  }

  #[test]
  fn test_erase_collapses_positions_inside() {
    let mut doc = doc("hello world");
    doc.set_selection(Selection::new([Range::point(3), Range::point(8)]));
    doc.erase(2, 9).unwrap();
    assert_eq!(doc.text().to_string(), "held");
    assert_eq!(doc.selection().ranges(), &[Range::point(2)]);
  }

  #[test]
  fn test_replace_covers_new_text() {
    let mut doc = doc("a bb c");
    doc.set_selection(Selection::single(2, 4));
    doc.replace(2, 4, "xyz").unwrap();
    assert_eq!(doc.text().to_string(), "a xyz c");
    assert_eq!(doc.selection().ranges(), &[Range::new(2, 5)]);
  }

  #[test]
  fn test_replace_many() {
    let mut doc = doc("a b c");
    doc
      .replace_many(vec![
        (4, 5, "C".into()),
        (0, 1, "A".into()),
        (2, 3, "B".into()),
      ])
      .unwrap();
    assert_eq!(doc.text().to_string(), "A B C");
  }

  #[test]
  fn test_fold_merges_and_edits_shift_folds() {
    let mut doc = doc("0123456789abcdef");
    doc.fold(2, 4);
    doc.fold(8, 10);
    doc.fold(4, 6);
    assert_eq!(doc.folds(), &[(2, 6), (8, 10)]);

    doc.insert(0, "xx").unwrap();
    assert_eq!(doc.folds(), &[(4, 8), (10, 12)]);

    doc.erase(9, 13).unwrap();
    assert_eq!(doc.folds(), &[(4, 8)]);

    assert!(doc.unfold(5, 6));
    assert!(doc.folds().is_empty());
  }

  #[test]
  fn test_display_name() {
    let mut doc = doc("");
    assert_eq!(doc.display_name(), "<untitled>");
    doc.set_path("/tmp/notes.txt");
    assert_eq!(doc.display_name(), "notes.txt");
  }
}
