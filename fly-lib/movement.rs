//! Movement direction and the result of a cursor motion.
//!
//! Every navigation command produces a [`Motion`]: the new selection plus the
//! position the viewport should keep visible afterwards.
//!
//! ```ignore
//! use fly_lib::movement::Direction;
//! use fly_lib::selection::Range;
//!
//! let range = Range::new(5, 10);
//! assert_eq!(range.direction(), Direction::Forward);
//!
//! let backward = range.with_direction(Direction::Backward);
//! assert_eq!(backward.anchor, 10);
//! assert_eq!(backward.head, 5);
//! ```

use crate::selection::Selection;

/// The direction of cursor movement or selection extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
  /// Moving toward the end of the document (increasing positions).
  Forward,
  /// Moving toward the start of the document (decreasing positions).
  Backward,
}

impl Direction {
  #[inline]
  pub fn is_forward(self) -> bool {
    self == Direction::Forward
  }

  #[inline]
  #[must_use]
  pub fn reverse(self) -> Self {
    match self {
      Self::Forward => Self::Backward,
      Self::Backward => Self::Forward,
    }
  }
}

/// A position the viewport should bring into view.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reveal {
  pub pos:      usize,
  pub centered: bool,
}

impl Reveal {
  pub fn at(pos: usize) -> Self {
    Self {
      pos,
      centered: false,
    }
  }

  pub fn centered(pos: usize) -> Self {
    Self {
      pos,
      centered: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motion {
  pub selection: Selection,
  pub reveal:    Option<Reveal>,
}

impl Motion {
  pub fn new(selection: Selection) -> Self {
    Self {
      selection,
      reveal: None,
    }
  }

  /// Reveal the last head when moving forward and the first one otherwise.
  pub fn revealing_edge(selection: Selection, direction: Direction) -> Self {
    let edge = match direction {
      Direction::Forward => selection.last(),
      Direction::Backward => selection.first(),
    };
    let reveal = edge.map(|range| Reveal::at(range.head));
    Self { selection, reveal }
  }

  #[must_use]
  pub fn with_reveal(mut self, reveal: Reveal) -> Self {
    self.reveal = Some(reveal);
    self
  }
}
