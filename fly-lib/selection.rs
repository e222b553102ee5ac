//! Carets, selected spans, and sets of them.
//!
//! A [`Range`] is an `anchor` that stays put and a `head` that moves. Equal
//! ends make a caret; `head < anchor` is a selection made backwards:
//!
//! ```text
//! (2, 7)  "he[llo w]orld"
//! (7, 2)  "he]llo w[orld"
//! (5, 5)  "hello|world"
//! ```
//!
//! A [`Selection`] holds any number of ranges, including none. It keeps them
//! ordered by start and folds overlapping ones together, so every command
//! sees at most one range per span. Indexed access accepts negative indices
//! counting from the end and fails with [`SelectionError`] past either end.

use smallvec::SmallVec;
use thiserror::Error;

use crate::movement::Direction;

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
  #[error("no range at index {index} in a selection of {len}")]
  IndexOutOfBounds { index: isize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub const fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  pub const fn point(pos: usize) -> Self {
    Self::new(pos, pos)
  }

  /// Lower end.
  #[must_use]
  pub fn from(&self) -> usize {
    self.anchor.min(self.head)
  }

  /// Upper end.
  #[must_use]
  pub fn to(&self) -> usize {
    self.anchor.max(self.head)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.anchor.abs_diff(self.head)
  }

  /// A caret.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  /// Whether `pos` is one of the selected chars. Carets contain nothing.
  pub fn contains(&self, pos: usize) -> bool {
    (self.from()..self.to()).contains(&pos)
  }

  /// Carets count as forward.
  #[must_use]
  pub fn direction(&self) -> Direction {
    if self.head < self.anchor {
      Direction::Backward
    } else {
      Direction::Forward
    }
  }

  /// Whether the range is non-empty and points against `direction`, so that
  /// moving its head in `direction` shrinks it first.
  pub fn is_shrinking(&self, direction: Direction) -> bool {
    !self.is_empty() && self.direction() != direction
  }

  #[must_use]
  pub fn flip(&self) -> Self {
    Self::new(self.head, self.anchor)
  }

  /// The same span, pointing in `direction`.
  #[must_use]
  pub fn with_direction(self, direction: Direction) -> Self {
    match direction {
      Direction::Forward => Self::new(self.from(), self.to()),
      Direction::Backward => Self::new(self.to(), self.from()),
    }
  }

  /// Ranges starting at the same position always overlap, carets included.
  /// Otherwise the spans must share at least one char.
  pub fn overlaps(&self, other: &Self) -> bool {
    self.from() == other.from() || (self.from() < other.to() && other.from() < self.to())
  }

  /// The smallest range covering both. Backward only when both are.
  pub fn merge(&self, other: Self) -> Self {
    let (from, to) = (self.from().min(other.from()), self.to().max(other.to()));
    if self.direction() == Direction::Backward && other.direction() == Direction::Backward {
      Self::new(to, from)
    } else {
      Self::new(from, to)
    }
  }

  /// Map both ends through `f`, keeping the orientation.
  #[must_use]
  pub fn map(self, mut f: impl FnMut(usize) -> usize) -> Self {
    Self::new(f(self.anchor), f(self.head))
  }
}

impl From<(usize, usize)> for Range {
  fn from((anchor, head): (usize, usize)) -> Self {
    Self::new(anchor, head)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  ranges: SmallVec<[Range; 1]>,
}

impl Selection {
  /// Build a normalized selection out of `ranges`.
  pub fn new(ranges: impl IntoIterator<Item = Range>) -> Self {
    Self {
      ranges: ranges.into_iter().collect(),
    }
    .normalize()
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn point(pos: usize) -> Self {
    Self::single(pos, pos)
  }

  pub fn single(anchor: usize, head: usize) -> Self {
    Self {
      ranges: smallvec::smallvec![Range::new(anchor, head)],
    }
  }

  #[inline]
  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }

  #[inline]
  pub fn iter(&self) -> std::slice::Iter<'_, Range> {
    self.ranges.iter()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.ranges.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  #[inline]
  pub fn first(&self) -> Option<&Range> {
    self.ranges.first()
  }

  #[inline]
  pub fn last(&self) -> Option<&Range> {
    self.ranges.last()
  }

  /// Every range is a caret.
  pub fn all_empty(&self) -> bool {
    self.ranges.iter().all(Range::is_empty)
  }

  pub fn heads(&self) -> impl Iterator<Item = usize> + '_ {
    self.ranges.iter().map(|range| range.head)
  }

  /// Range at `index`. Negative indices count from the end.
  pub fn range_at(&self, index: isize) -> Result<Range> {
    let len = self.ranges.len();
    let resolved = if index < 0 {
      len.checked_sub(index.unsigned_abs())
    } else {
      Some(index as usize).filter(|&i| i < len)
    };
    resolved
      .and_then(|i| self.ranges.get(i).copied())
      .ok_or(SelectionError::IndexOutOfBounds { index, len })
  }

  // Mutation.
  //

  pub fn clear(&mut self) {
    self.ranges.clear();
  }

  /// Add a range, merging it with any range it overlaps.
  pub fn add(&mut self, range: Range) {
    self.ranges.push(range);
    *self = std::mem::take(self).normalize();
  }

  /// Remove the span of `range` from the selection.
  ///
  /// Ranges partially covered are trimmed, ranges strictly containing the
  /// span are split in two. Carets inside the span (ends included) are
  /// dropped.
  pub fn subtract(&mut self, range: Range) {
    let (from, to) = (range.from(), range.to());
    let mut kept: SmallVec<[Range; 1]> = SmallVec::with_capacity(self.ranges.len() + 1);

    for r in self.ranges.drain(..) {
      if r.is_empty() {
        if r.head < from || r.head > to {
          kept.push(r);
        }
        continue;
      }
      if r.to() <= from || r.from() >= to {
        kept.push(r);
        continue;
      }
      let direction = r.direction();
      if r.from() < from {
        kept.push(Range::new(r.from(), from).with_direction(direction));
      }
      if r.to() > to {
        kept.push(Range::new(to, r.to()).with_direction(direction));
      }
    }

    self.ranges = kept;
  }

  /// Remove and return the range at `index`.
  pub fn remove(&mut self, index: isize) -> Result<Range> {
    let range = self.range_at(index)?;
    self.ranges.retain(|r| *r != range);
    Ok(range)
  }

  /// Map every range through `f`, then normalize. Ranges for which `f`
  /// returns `None` are dropped.
  #[must_use]
  pub fn transform(self, f: impl FnMut(Range) -> Option<Range>) -> Self {
    Self {
      ranges: self.ranges.into_iter().filter_map(f).collect(),
    }
    .normalize()
  }

  fn normalize(mut self) -> Self {
    if self.ranges.len() < 2 {
      return self;
    }
    self.ranges.sort_by_key(|range| range.from());

    let mut ranges: SmallVec<[Range; 1]> = SmallVec::with_capacity(self.ranges.len());
    for range in self.ranges.drain(..) {
      if let Some(prev) = ranges.last_mut()
        && prev.overlaps(&range)
      {
        *prev = prev.merge(range);
        continue;
      }
      ranges.push(range);
    }

    self.ranges = ranges;
    self
  }
}

impl<'a> IntoIterator for &'a Selection {
  type Item = &'a Range;
  type IntoIter = std::slice::Iter<'a, Range>;

  fn into_iter(self) -> Self::IntoIter {
    self.ranges.iter()
  }
}

impl FromIterator<Range> for Selection {
  fn from_iter<T: IntoIterator<Item = Range>>(iter: T) -> Self {
    Self::new(iter)
  }
}
