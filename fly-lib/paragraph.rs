//! Paragraph-wise cursor movement.
//!
//! A paragraph is a block of lines delimited by blank lines. The first press
//! of a paragraph motion goes to the end (or first non-blank) of the current
//! line instead; pressing again in the same direction within
//! [`LINE_END_WINDOW`] jumps by paragraph.
//!
//! Backward scans run over reversed text, so the backward patterns below are
//! written back to front.

use std::time::{
  Duration,
  Instant,
};

use fly_stdx::pattern::Pattern;

use crate::{
  document::TextSource,
  movement::{
    Direction,
    Motion,
    Reveal,
  },
  scanner::{
    Result,
    ScanOptions,
    ScanOutcome,
    Scanner,
  },
  selection::{
    Range,
    Selection,
  },
};

/// How long a paragraph motion remembers the previous one.
pub const LINE_END_WINDOW: Duration = Duration::from_secs(1);

// Backward patterns read reversed text, where a CRLF ending shows up as
// `\n\r`.

/// Two or more line breaks, possibly with blank indentation between them.
const FORWARD: &str = r"(\r?\n[\t ]*){2,}";
/// The last line break of a blank run, read backwards.
const BACKWARD: &str = r"\n\r?[\t ]*(?=\n\r?[\t ]*\S)";
/// End of the paragraph holding the head.
const FORWARD_EXTEND: &str = r"\S\r?\n(?=\r?\n)";
/// Start of the paragraph holding the head, read backwards.
const BACKWARD_EXTEND: &str = r"[^\r\n](?=\n\r?\n)";
const SHRINK_FORWARD: &str = r"\r?\n\r?\n(?=[\t ]*\S)";
const SHRINK_BACKWARD: &str = r"\n\r?(?=\n\r?\S)";
/// First non-blank char of a line, read backwards from its end.
const LINE_START: &str = r"\S\s*\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphMotion {
  pub direction:       Direction,
  pub extend:          bool,
  /// Skip the line-end step.
  pub force_paragraph: bool,
}

impl ParagraphMotion {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      extend: false,
      force_paragraph: false,
    }
  }

  #[must_use]
  pub fn extend(mut self, extend: bool) -> Self {
    self.extend = extend;
    self
  }

  #[must_use]
  pub fn force_paragraph(mut self, force_paragraph: bool) -> Self {
    self.force_paragraph = force_paragraph;
    self
  }
}

/// What the previous paragraph motion on a document left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphState {
  last_heads:     Vec<usize>,
  last:           Option<Instant>,
  last_direction: Direction,
}

impl Default for ParagraphState {
  fn default() -> Self {
    Self {
      last_heads:     Vec::new(),
      last:           None,
      last_direction: Direction::Forward,
    }
  }
}

impl ParagraphState {
  /// Whether a motion at `now` starts a new sequence of presses rather than
  /// repeating the previous one.
  fn is_fresh(&self, heads: &[usize], direction: Direction, now: Instant) -> bool {
    let Some(last) = self.last else {
      return true;
    };
    now.saturating_duration_since(last) >= LINE_END_WINDOW
      || self.last_direction != direction
      || self.last_heads.iter().any(|head| !heads.contains(head))
  }

  fn record(&mut self, heads: Vec<usize>, direction: Direction, now: Instant) {
    self.last_heads = heads;
    self.last = Some(now);
    self.last_direction = direction;
  }
}

pub fn navigate_paragraph<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  state: &mut ParagraphState,
  motion: ParagraphMotion,
  now: Instant,
) -> Result<Option<Motion>> {
  if selection.is_empty() {
    return Ok(None);
  }

  let heads: Vec<usize> = selection.heads().collect();
  let line_end = |pos: usize| text.line_containing(pos).1;

  let mut line_ends = !motion.force_paragraph
    && selection.iter().all(|r| line_end(r.anchor) == line_end(r.head))
    && state.is_fresh(&heads, motion.direction, now);

  let mut targets = Vec::new();
  if line_ends {
    targets = line_end_targets(text, selection, motion.direction)?;
    // Already at the line ends: go by paragraph instead.
    line_ends = targets.iter().any(|&(_, target, head)| target != head);
  }

  let ranges: Vec<Range> = if line_ends {
    targets
      .into_iter()
      .map(|(anchor, target, _)| {
        if motion.extend {
          Range::new(anchor, target)
        } else {
          Range::point(target)
        }
      })
      .collect()
  } else {
    paragraph_targets(text, selection, motion)?
  };

  let Some(last) = ranges.last().copied() else {
    state.record(heads, motion.direction, now);
    return Ok(None);
  };
  state.record(ranges.iter().map(|r| r.head).collect(), motion.direction, now);

  Ok(Some(
    Motion::new(Selection::new(ranges)).with_reveal(Reveal::at(last.head)),
  ))
}

// Helpers.
//

/// `(anchor, target, head)` for every range when moving to a line edge.
fn line_end_targets<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  direction: Direction,
) -> Result<Vec<(usize, usize, usize)>> {
  if direction.is_forward() {
    return Ok(
      selection
        .iter()
        .map(|r| (r.from(), text.line_containing(r.head).1, r.head))
        .collect(),
    );
  }

  let line_start = Pattern::new(LINE_START)?;
  let mut session = Scanner::new(text, ScanOptions::backward().yield_border(true)).prime();
  let mut targets = Vec::with_capacity(selection.len());
  for r in selection {
    let (start, end) = text.line_containing(r.head);
    let target = match session.advance(end, &line_start)? {
      ScanOutcome::Match { start, .. } => start - 1,
      // Nothing but the first line above.
      _ => text.first_non_blank(0),
    };
    let anchor = if target < start {
      target
    } else {
      r.to().max(target)
    };
    targets.push((anchor, target, r.head));
  }
  Ok(targets)
}

fn paragraph_targets<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  motion: ParagraphMotion,
) -> Result<Vec<Range>> {
  let options = ScanOptions::new(motion.direction).yield_border(true);
  let mut session = Scanner::new(text, options).prime();
  let line_end = |pos: usize| text.line_containing(pos).1;
  let line_start = |pos: usize| text.line_containing(pos).0;

  let forward = Pattern::new(FORWARD)?;
  let backward = Pattern::new(BACKWARD)?;
  let forward_extend = Pattern::new(FORWARD_EXTEND)?;
  let backward_extend = Pattern::new(BACKWARD_EXTEND)?;
  let shrink_forward = Pattern::new(SHRINK_FORWARD)?;
  let shrink_backward = Pattern::new(SHRINK_BACKWARD)?;

  let mut ranges = Vec::with_capacity(selection.len());
  for &r in selection {
    let (index, pattern, anchor) = match (motion.direction, motion.extend) {
      (Direction::Forward, false) => {
        // A caret on a blank line still sees the break that opened it.
        let index = match r.head.checked_sub(1) {
          Some(prev) if text.char_at(prev) == Some('\n') => prev,
          _ => r.head,
        };
        (index, &forward, None)
      },
      (Direction::Backward, false) => (r.head, &backward, None),
      (Direction::Forward, true) => {
        if r.anchor > r.head {
          (r.head, &shrink_forward, Some(r.to()))
        } else {
          (r.head, &forward_extend, Some(line_start(r.from())))
        }
      },
      (Direction::Backward, true) => {
        if line_end(r.anchor) < r.to() {
          (r.head, &shrink_backward, Some(r.from()))
        } else {
          (r.head, &backward_extend, Some(r.to()))
        }
      },
    };

    let Some(target) = session.advance(index, pattern)?.end() else {
      continue;
    };
    ranges.push(match anchor {
      Some(anchor) => Range::new(anchor, target),
      None => Range::point(target),
    });
  }
  Ok(ranges)
}
