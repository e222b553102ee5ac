//! Word-wise cursor movement.
//!
//! Words are runs of characters that are neither whitespace nor one of the
//! document's word separators. In whole-word mode any run of non-whitespace
//! counts as a word.

use fly_core::chars::WordSeparators;
use fly_stdx::pattern::Pattern;

use crate::{
  document::TextSource,
  movement::{
    Direction,
    Motion,
  },
  scanner::{
    Result,
    ScanOptions,
    ScanOutcome,
    ScanSession,
    Scanner,
  },
  selection::{
    Range,
    Selection,
  },
};

/// Word scans touch little text per cursor, so they use smaller chunks.
pub const WORD_CHUNK_SIZE: usize = 1_000;

const WHOLE_WORD: &str = r"\S+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMotion {
  pub direction:   Direction,
  pub whole_words: bool,
  pub extend:      bool,
}

impl WordMotion {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      whole_words: false,
      extend: false,
    }
  }

  #[must_use]
  pub fn whole_words(mut self, whole_words: bool) -> Self {
    self.whole_words = whole_words;
    self
  }

  #[must_use]
  pub fn extend(mut self, extend: bool) -> Self {
    self.extend = extend;
    self
  }
}

pub fn word_pattern(separators: &WordSeparators, whole_words: bool) -> Result<Pattern> {
  let source = if whole_words {
    WHOLE_WORD.to_string()
  } else {
    separators.word_pattern()
  };
  Ok(Pattern::new(&source)?)
}

/// Move every range of `selection` by one word. Ranges without a further
/// word in the travel direction are left as they are.
pub fn navigate_word<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  separators: &WordSeparators,
  motion: WordMotion,
) -> Result<Option<Motion>> {
  if selection.is_empty() {
    return Ok(None);
  }

  let pattern = word_pattern(separators, motion.whole_words)?;
  let options = ScanOptions::new(motion.direction).chunk_size(WORD_CHUNK_SIZE);
  let mut session = Scanner::new(text, options).prime();

  let is_word = |ch: char| {
    if motion.whole_words {
      !ch.is_whitespace()
    } else {
      separators.is_word_char(ch)
    }
  };

  let mut ranges = Vec::with_capacity(selection.len());
  for &range in selection {
    // Whether the head sits on the edge of a word it would otherwise select.
    let outside = match motion.direction {
      Direction::Forward => range.head.checked_sub(1).and_then(|pos| text.char_at(pos)),
      Direction::Backward => text.char_at(range.head),
    };
    let on_edge = outside.is_none_or(|ch| !is_word(ch));
    ranges.push(step(&mut session, &pattern, range, motion, on_edge)?);
  }

  let selection = Selection::new(ranges);
  Ok(Some(Motion::revealing_edge(selection, motion.direction)))
}

fn step<T: TextSource + ?Sized>(
  session: &mut ScanSession<'_, T>,
  pattern: &Pattern,
  range: Range,
  motion: WordMotion,
  on_edge: bool,
) -> Result<Range> {
  let forward = motion.direction.is_forward();
  let Range {
    anchor: mut a,
    head: mut b,
  } = range;

  let mut index = b;
  while let ScanOutcome::Match {
    start: mstart,
    end: mend,
  } = session.advance(index, pattern)?
  {
    index = mend;

    // A match that starts on the head and would not move it.
    let stalled = mstart == b && (mend == a || (motion.extend && forward == (a > mend)));
    // A caret at the leading edge of a word moves on to the next one.
    let on_caret = !motion.extend && on_edge && a == b && mstart == b;
    if stalled || on_caret {
      continue;
    }

    let shrink = a != b && forward == (a > b);
    if motion.extend {
      if shrink && (forward == (mstart > a) || b == mstart) {
        a = b;
      }
      b = if shrink && a != b { mstart } else { mend };
    } else {
      if b != mstart || shrink {
        a = mstart;
      }
      b = mend;
    }
    return Ok(Range::new(a, b));
  }

  Ok(range)
}

/// Select the word nearest to each caret, preferring words on the caret's
/// own line. Returns `None` when no range found a word.
pub fn find_word_near<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  separators: &WordSeparators,
) -> Result<Option<Selection>> {
  let pattern = word_pattern(separators, false)?;
  let mut forward = Scanner::new(text, ScanOptions::forward()).prime();
  let mut backward = Scanner::new(text, ScanOptions::backward()).prime();

  let mut found = Vec::new();
  for range in selection {
    let caret = range.head;
    // Backward spans come as (end, start) in document order.
    let before = backward
      .advance(caret, &pattern)?
      .span()
      .map(|(end, start)| (start, end));
    let after = forward.advance(caret, &pattern)?.span();

    let line_end = text.full_line(caret).1;
    let on_line = |pos: usize| text.full_line(pos).1 == line_end;

    let candidate = match (before, after) {
      (None, None) => continue,
      (Some(before), None) => before,
      (None, Some(after)) => after,
      (Some(before), Some(after)) => {
        match (on_line(before.1), on_line(after.0)) {
          (true, false) => before,
          (false, true) => after,
          _ if before.1 == after.0 => (before.0, after.1),
          _ if caret - before.1 < after.0 - caret => before,
          _ => after,
        }
      },
    };
    found.push(Range::new(candidate.0, candidate.1));
  }

  if found.is_empty() {
    return Ok(None);
  }
  Ok(Some(Selection::new(found)))
}
