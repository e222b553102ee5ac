//! Selection-level commands that need no scanning.

use crate::{
  document::TextSource,
  movement::{
    Direction,
    Motion,
    Reveal,
  },
  selection::{
    Range,
    Selection,
  },
};

/// Collapse every range to its end (`Forward`) or start (`Backward`).
pub fn clear_selection(selection: &Selection, direction: Direction) -> Selection {
  Selection::new(selection.iter().map(|range| {
    match direction {
      Direction::Forward => Range::point(range.to()),
      Direction::Backward => Range::point(range.from()),
    }
  }))
}

/// Drop the first (or last) range, as long as another one remains.
pub fn subtract_selection(selection: &Selection, last: bool) -> Option<Motion> {
  if selection.len() < 2 {
    return None;
  }
  let index = if last { -1 } else { 0 };
  let mut selection = selection.clone();
  selection.remove(index).ok()?;
  let head = selection.range_at(index).ok()?.head;
  Some(Motion::new(selection).with_reveal(Reveal::at(head)))
}

/// Swap anchor and head of every non-empty range. With only carets, bring
/// the other end of the selection into view instead.
pub fn revert_selection(
  selection: &Selection,
  is_visible: impl Fn(usize) -> bool,
) -> Option<Motion> {
  let (first, last) = (selection.first()?.head, selection.last()?.head);
  if selection.all_empty() {
    let target = if is_visible(first) { last } else { first };
    return Some(Motion::new(selection.clone()).with_reveal(Reveal::centered(target)));
  }

  let flipped = selection.clone().transform(|range| Some(range.flip()));
  let head = flipped.last()?.head;
  Some(Motion::new(flipped).with_reveal(Reveal::centered(head)))
}

/// Keep only the range at `index`; negative indices count from the end.
pub fn single_selection(selection: &Selection, index: isize) -> Option<Motion> {
  let range = selection.range_at(index).ok()?;
  let selection = Selection::single(range.anchor, range.head);
  Some(Motion::new(selection).with_reveal(Reveal::centered(range.head)))
}

/// Add previously recorded ranges to `selection`.
pub fn retrieve_selection(selection: &Selection, recorded: &[Range]) -> Selection {
  let mut selection = selection.clone();
  for &range in recorded {
    selection.add(range);
  }
  selection
}

/// A caret at the start (or end, with `after`) of every line a selection
/// touches. `None` when there are only carets.
pub fn cursors_from_selection<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  after: bool,
) -> Option<Selection> {
  if selection.all_empty() {
    return None;
  }

  let mut carets = Vec::new();
  for range in selection {
    let mut line = text.line_containing(range.from());
    while line.0 < range.to() {
      carets.push(Range::point(if after { line.1 } else { line.0 }));
      match line_below(text, line) {
        Some(next) => line = next,
        None => break,
      }
    }
  }
  Some(Selection::new(carets))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectLines {
  pub direction:     Direction,
  /// Always grow, even against the remembered direction.
  pub force_expand:  bool,
  /// Skip lines too short to hold the selection's columns.
  pub follow_column: bool,
}

impl SelectLines {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      force_expand: false,
      follow_column: false,
    }
  }

  #[must_use]
  pub fn force_expand(mut self, force_expand: bool) -> Self {
    self.force_expand = force_expand;
    self
  }

  #[must_use]
  pub fn follow_column(mut self, follow_column: bool) -> Self {
    self.follow_column = follow_column;
    self
  }
}

/// Add a range on the next line for every range, keeping columns.
///
/// `growing` remembers which way the block of lines was grown. Moving the
/// other way trims the line at the far end of the block instead.
pub fn select_lines<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  growing: &mut Option<Direction>,
  select: SelectLines,
) -> Option<Motion> {
  if selection.is_empty() {
    return None;
  }
  let direction = select.direction;
  let mut lines: Vec<(usize, usize)> = selection
    .iter()
    .map(|r| text.line_containing(r.head))
    .collect();
  lines.dedup();

  if lines.len() == 1 || select.force_expand {
    *growing = Some(direction);
  } else if growing.unwrap_or(direction.reverse()) != direction {
    let edge = match direction {
      Direction::Forward => selection.first(),
      Direction::Backward => selection.last(),
    }?;
    let (start, end) = text.line_containing(edge.head);
    let mut trimmed = selection.clone();
    for range in selection {
      if start <= range.from() && range.to() <= end {
        trimmed.subtract(*range);
      }
    }
    let reveal = match direction {
      Direction::Forward => trimmed.first(),
      Direction::Backward => trimmed.last(),
    }
    .map(|range| Reveal::at(range.head));
    return Some(Motion {
      selection: trimmed,
      reveal,
    });
  }

  let line_start = |pos: usize| text.line_containing(pos).0;
  let line_end = |pos: usize| text.line_containing(pos).1;
  let hardeol = selection.iter().any(|r| r.from() != line_start(r.from()))
    && selection.iter().all(|r| r.to() == line_end(r.to()));

  let mut added = Vec::new();
  for range in selection {
    let mut line = text.line_containing(range.head);
    let offset_start = range.anchor as isize - line.0 as isize;
    let offset_end = range.head as isize - line.0 as isize;
    let at = |line: (usize, usize), offset: isize| (line.0 as isize + offset).max(0) as usize;

    loop {
      let next = match direction {
        Direction::Forward => line_below(text, line),
        Direction::Backward => line_above(text, line),
      };
      let Some(next) = next else {
        break;
      };
      line = next;

      if hardeol {
        added.push(Range::new(line.1.saturating_sub(range.len()), line.1));
        break;
      }
      if !select.follow_column {
        added.push(Range::new(
          at(line, offset_start).min(line.1),
          at(line, offset_end).min(line.1),
        ));
        break;
      }
      if (line.1 - line.0) as isize >= offset_start.max(offset_end) {
        added.push(Range::new(at(line, offset_start), at(line, offset_end)));
        break;
      }
    }
  }

  let mut grown = selection.clone();
  for range in added {
    grown.add(range);
  }
  let reveal = match direction {
    Direction::Forward => grown.last(),
    Direction::Backward => grown.first(),
  }
  .map(|range| Reveal::at(range.head));
  Some(Motion {
    selection: grown,
    reveal,
  })
}

// Helpers.
//

fn line_below<T: TextSource + ?Sized>(text: &T, line: (usize, usize)) -> Option<(usize, usize)> {
  let (_, next_start) = text.full_line(line.0);
  (next_start > line.1).then(|| text.line_containing(next_start))
}

fn line_above<T: TextSource + ?Sized>(text: &T, line: (usize, usize)) -> Option<(usize, usize)> {
  line.0.checked_sub(1).map(|pos| text.line_containing(pos))
}
