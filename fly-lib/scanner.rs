//! Resumable, fold-aware, chunked regex scanning.
//!
//! A [`ScanSession`] yields successive regex matches in one direction over a
//! [`TextSource`] without materializing the whole buffer. Callers pull
//! matches with [`ScanSession::advance`], passing the index to search from
//! and the pattern to use. Both may change between calls.
//!
//! # Layout
//!
//! The buffer is split into visible sub-ranges ("gaps") by removing the
//! folded ranges. Each gap is cut into chunks of roughly `chunk_size` chars
//! on a grid anchored at the gap start: a cut at `gap.start + k * size` is
//! moved forward to the end of its line, so a chunk never ends mid-line.
//! Chunks are materialized on first use and cached by their start offset.
//!
//! # Backward scans
//!
//! Backward sessions cache chunks reversed (by chars) and run the same
//! forward matcher over them. Patterns passed to a backward session must be
//! written for reversed text. A backward match is reported as
//! `Match { start, end }` with `start >= end`: `start` is the edge nearest
//! to the scan origin.
//!
//! # Continuation
//!
//! Calling `advance` with the previous match's `end` and an equal pattern
//! resumes inside the cached chunk right after that match, without locating
//! the chunk again. Any other call restarts at the given index. The chunk
//! cache survives restarts.
//!
//! A match that would straddle a chunk seam is not stitched together; with
//! seams at line ends this only affects patterns spanning lines.
//!
//! ```ignore
//! let mut session = Scanner::new(&doc, ScanOptions::forward()).prime();
//! let word = Pattern::new(r"\w+")?;
//! let mut index = 0;
//! while let ScanOutcome::Match { start, end } = session.advance(index, &word)? {
//!   println!("{start}..{end}");
//!   index = end;
//! }
//! ```

use std::collections::HashMap;

use fly_stdx::pattern::{
  Pattern,
  PatternError,
};
use ropey::str_utils::{
  byte_to_char_idx,
  char_to_byte_idx,
};
use thiserror::Error;

use crate::{
  document::TextSource,
  movement::Direction,
};

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
  #[error(transparent)]
  Regex(#[from] PatternError),
  #[error("scan session was terminated by an earlier failure")]
  Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
  pub direction:     Direction,
  /// Report `Border` instead of `NoMatch` at the end of the scanned side.
  pub yield_border:  bool,
  pub respect_folds: bool,
  pub chunk_size:    usize,
}

impl ScanOptions {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      yield_border: false,
      respect_folds: true,
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }

  pub fn forward() -> Self {
    Self::new(Direction::Forward)
  }

  pub fn backward() -> Self {
    Self::new(Direction::Backward)
  }

  #[must_use]
  pub fn yield_border(mut self, yield_border: bool) -> Self {
    self.yield_border = yield_border;
    self
  }

  #[must_use]
  pub fn respect_folds(mut self, respect_folds: bool) -> Self {
    self.respect_folds = respect_folds;
    self
  }

  #[must_use]
  pub fn chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size.max(1);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
  Match { start: usize, end: usize },
  /// The scanned side is exhausted; carries the document edge.
  Border(usize),
  NoMatch,
}

impl ScanOutcome {
  /// The match as `(start, end)`, oriented like the scan.
  pub fn span(self) -> Option<(usize, usize)> {
    match self {
      Self::Match { start, end } => Some((start, end)),
      _ => None,
    }
  }

  /// Where a cursor following this outcome lands: the far edge of a match
  /// or the border position.
  pub fn end(self) -> Option<usize> {
    match self {
      Self::Match { end, .. } => Some(end),
      Self::Border(pos) => Some(pos),
      Self::NoMatch => None,
    }
  }

  pub fn is_match(self) -> bool {
    matches!(self, Self::Match { .. })
  }
}

/// An unprimed scanner. [`Scanner::prime`] turns it into a session.
pub struct Scanner<'a, T: ?Sized> {
  text:    &'a T,
  options: ScanOptions,
}

impl<'a, T: TextSource + ?Sized> Scanner<'a, T> {
  pub fn new(text: &'a T, options: ScanOptions) -> Self {
    Self { text, options }
  }

  /// Compute the visible layout. Performs no matching.
  pub fn prime(self) -> ScanSession<'a, T> {
    let len = self.text.len_chars();
    let mut gaps = Vec::new();
    let mut first = 0;
    if self.options.respect_folds {
      for &(fold_start, fold_end) in self.text.folded_ranges() {
        let (fold_start, fold_end) = (fold_start.min(len), fold_end.min(len));
        if fold_start > first {
          gaps.push(Gap {
            start: first,
            end:   fold_start,
          });
        }
        first = first.max(fold_end);
      }
    }
    if len > first {
      gaps.push(Gap {
        start: first,
        end:   len,
      });
    }

    ScanSession {
      text: self.text,
      options: self.options,
      len,
      gaps,
      cache: HashMap::new(),
      cursor: None,
      terminated: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gap {
  start: usize,
  end:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkBounds {
  gap:   usize,
  start: usize,
  end:   usize,
}

/// Where the previous match left off.
#[derive(Debug)]
struct Continuation {
  pattern:   Pattern,
  resume_at: usize,
  chunk:     ChunkBounds,
  byte:      usize,
  local:     usize,
}

pub struct ScanSession<'a, T: ?Sized> {
  text:       &'a T,
  options:    ScanOptions,
  len:        usize,
  gaps:       Vec<Gap>,
  cache:      HashMap<usize, String>,
  cursor:     Option<Continuation>,
  terminated: bool,
}

impl<'a, T: TextSource + ?Sized> ScanSession<'a, T> {
  pub fn direction(&self) -> Direction {
    self.options.direction
  }

  pub fn options(&self) -> ScanOptions {
    self.options
  }

  /// Find the next match from `index` in the scan direction.
  pub fn advance(&mut self, index: usize, pattern: &Pattern) -> Result<ScanOutcome> {
    if self.terminated {
      return Err(ScanError::Terminated);
    }

    let resume = self
      .cursor
      .take()
      .filter(|c| c.resume_at == index && c.pattern == *pattern);
    let (mut chunk, mut byte, mut local) = match resume {
      Some(c) => (c.chunk, c.byte, c.local),
      None => {
        tracing::trace!(index, pattern = pattern.as_str(), "scan restart");
        match self.locate(index) {
          Some(position) => position,
          None => return Ok(self.edge()),
        }
      },
    };

    loop {
      let step = {
        let haystack = self.load(chunk);
        pattern.find_at(haystack, byte).map(|found| {
          found.map(|(ms, me)| {
            let ms_char = local + byte_to_char_idx(&haystack[byte..ms], ms - byte);
            let me_char = ms_char + byte_to_char_idx(&haystack[ms..me], me - ms);
            // Empty matches resume one char further so repeated calls move.
            let next = if me > ms {
              (me, me_char)
            } else {
              match haystack[me..].chars().next() {
                Some(ch) => (me + ch.len_utf8(), me_char + 1),
                None => (haystack.len() + 1, me_char + 1),
              }
            };
            (ms_char, me_char, next)
          })
        })
      };

      match step {
        Err(err) => {
          tracing::warn!(pattern = pattern.as_str(), "terminating scan: {err}");
          self.terminated = true;
          return Err(err.into());
        },
        Ok(Some((ms_char, me_char, (next_byte, next_local)))) => {
          let (start, end) = self.absolute(chunk, ms_char, me_char);
          self.cursor = Some(Continuation {
            pattern: pattern.clone(),
            resume_at: end,
            chunk,
            byte: next_byte,
            local: next_local,
          });
          return Ok(ScanOutcome::Match { start, end });
        },
        Ok(None) => {
          match self.next_chunk(chunk) {
            Some(next) => {
              chunk = next;
              byte = 0;
              local = 0;
            },
            None => return Ok(self.edge()),
          }
        },
      }
    }
  }

  /// Pull matches starting at `index`, following each match with the next
  /// one, until there are no more or `limit` is reached.
  pub fn collect(
    &mut self,
    index: usize,
    pattern: &Pattern,
    limit: Option<usize>,
  ) -> Result<Vec<(usize, usize)>> {
    let mut found = Vec::new();
    let mut index = index;
    while limit.is_none_or(|limit| found.len() < limit) {
      match self.advance(index, pattern)? {
        ScanOutcome::Match { start, end } => {
          found.push((start, end));
          index = end;
        },
        _ => break,
      }
    }
    Ok(found)
  }

  // Helpers.
  //

  fn edge(&mut self) -> ScanOutcome {
    self.cursor = None;
    if !self.options.yield_border {
      return ScanOutcome::NoMatch;
    }
    match self.options.direction {
      Direction::Forward => ScanOutcome::Border(self.len),
      Direction::Backward => ScanOutcome::Border(0),
    }
  }

  fn absolute(&self, chunk: ChunkBounds, ms: usize, me: usize) -> (usize, usize) {
    match self.options.direction {
      Direction::Forward => (chunk.start + ms, chunk.start + me),
      Direction::Backward => (chunk.end - ms, chunk.end - me),
    }
  }

  /// Chunk and offsets for a fresh search from `index`. Indices inside a
  /// fold start at the first visible char past it in the scan direction.
  fn locate(&mut self, index: usize) -> Option<(ChunkBounds, usize, usize)> {
    let (chunk, local) = match self.options.direction {
      Direction::Forward => {
        let gap = self.gaps.iter().position(|gap| index < gap.end)?;
        let pos = index.max(self.gaps[gap].start);
        let chunk = self.chunk_at(gap, pos);
        (chunk, pos - chunk.start)
      },
      Direction::Backward => {
        let gap = self.gaps.iter().rposition(|gap| index > gap.start)?;
        let pos = index.min(self.gaps[gap].end);
        let chunk = self.chunk_at(gap, pos - 1);
        (chunk, chunk.end - pos)
      },
    };
    let byte = char_to_byte_idx(self.load(chunk), local);
    Some((chunk, byte, local))
  }

  fn next_chunk(&self, chunk: ChunkBounds) -> Option<ChunkBounds> {
    let gap = self.gaps[chunk.gap];
    match self.options.direction {
      Direction::Forward => {
        if chunk.end < gap.end {
          Some(self.chunk_at(chunk.gap, chunk.end))
        } else {
          let next = chunk.gap + 1;
          let gap = self.gaps.get(next)?;
          Some(self.chunk_at(next, gap.start))
        }
      },
      Direction::Backward => {
        if chunk.start > gap.start {
          Some(self.chunk_at(chunk.gap, chunk.start - 1))
        } else {
          let prev = chunk.gap.checked_sub(1)?;
          Some(self.chunk_at(prev, self.gaps[prev].end - 1))
        }
      },
    }
  }

  /// The chunk of gap `gap` holding the char at `pos`.
  fn chunk_at(&self, gap: usize, pos: usize) -> ChunkBounds {
    let bounds = self.gaps[gap];
    let mut k = (pos - bounds.start) / self.options.chunk_size;
    while k > 0 && self.cut(bounds, k) > pos {
      k -= 1;
    }
    let start = self.cut(bounds, k);
    let mut end = self.cut(bounds, k + 1);
    while end <= pos {
      k += 1;
      end = self.cut(bounds, k + 1);
    }
    ChunkBounds { gap, start, end }
  }

  /// The `k`th cut of a gap's chunk grid.
  fn cut(&self, gap: Gap, k: usize) -> usize {
    if k == 0 {
      return gap.start;
    }
    let pos = gap
      .start
      .saturating_add(k.saturating_mul(self.options.chunk_size));
    if pos >= gap.end {
      return gap.end;
    }
    let (_, line_end) = self.text.line_containing(pos);
    line_end.clamp(pos, gap.end)
  }

  fn load(&mut self, chunk: ChunkBounds) -> &str {
    let text = self.text;
    let direction = self.options.direction;
    self.cache.entry(chunk.start).or_insert_with(|| {
      let piece = text.substr(chunk.start, chunk.end);
      match direction {
        Direction::Forward => piece.into_owned(),
        Direction::Backward => piece.chars().rev().collect(),
      }
    })
  }
}

#[cfg(test)]
mod test {
  use std::num::NonZeroUsize;

  use ropey::Rope;

  use super::*;
  use crate::document::{
    Document,
    DocumentId,
  };

  fn doc(text: &str) -> Document {
    Document::from_str(DocumentId::new(NonZeroUsize::new(1).unwrap()), text)
  }

  fn word() -> Pattern {
    Pattern::new("[a-z]+").unwrap()
  }

  #[test]
  fn test_forward_matches() {
    let text = Rope::from_str("foo bar\n\nbaz qux");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    assert_eq!(
      session.collect(0, &word(), None).unwrap(),
      vec![(0, 3), (4, 7), (9, 12), (13, 16)]
    );
    assert_eq!(session.advance(16, &word()).unwrap(), ScanOutcome::NoMatch);
  }

  #[test]
  fn test_backward_matches_are_reversed() {
    let text = Rope::from_str("foo bar\n\nbaz qux");
    let mut session = Scanner::new(&text, ScanOptions::backward()).prime();
    assert_eq!(
      session.collect(16, &word(), None).unwrap(),
      vec![(16, 13), (12, 9), (7, 4), (3, 0)]
    );
  }

  #[test]
  fn test_backward_pattern_runs_on_reversed_text() {
    let text = Rope::from_str("ab ab");
    let mut session = Scanner::new(&text, ScanOptions::backward()).prime();
    let reversed = Pattern::new("ba").unwrap();
    assert_eq!(
      session.advance(5, &reversed).unwrap(),
      ScanOutcome::Match { start: 5, end: 3 }
    );
    assert_eq!(
      session.advance(3, &reversed).unwrap(),
      ScanOutcome::Match { start: 2, end: 0 }
    );
  }

  #[test]
  fn test_match_in_middle_of_word() {
    let text = Rope::from_str("foobar");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    assert_eq!(
      session.advance(2, &word()).unwrap(),
      ScanOutcome::Match { start: 2, end: 6 }
    );
  }

  #[test]
  fn test_border() {
    let text = Rope::from_str("foo bar");
    let mut forward = Scanner::new(&text, ScanOptions::forward().yield_border(true)).prime();
    assert_eq!(forward.advance(4, &word()).unwrap().span(), Some((4, 7)));
    assert_eq!(forward.advance(7, &word()).unwrap(), ScanOutcome::Border(7));
    assert_eq!(forward.advance(99, &word()).unwrap(), ScanOutcome::Border(7));

    let mut backward = Scanner::new(&text, ScanOptions::backward().yield_border(true)).prime();
    assert_eq!(backward.advance(0, &word()).unwrap(), ScanOutcome::Border(0));
    let digits = Pattern::new("[0-9]").unwrap();
    assert_eq!(backward.advance(7, &digits).unwrap(), ScanOutcome::Border(0));
  }

  #[test]
  fn test_empty_document() {
    let text = Rope::new();
    let mut session = Scanner::new(&text, ScanOptions::forward().yield_border(true)).prime();
    assert_eq!(session.advance(0, &word()).unwrap(), ScanOutcome::Border(0));
  }

  #[test]
  fn test_skips_folds() {
    let mut doc = doc("foo bar baz");
    doc.fold(4, 7);
    let mut forward = Scanner::new(&doc, ScanOptions::forward()).prime();
    assert_eq!(
      forward.collect(0, &word(), None).unwrap(),
      vec![(0, 3), (8, 11)]
    );
    // Starting inside the fold resumes after it.
    assert_eq!(forward.advance(5, &word()).unwrap().span(), Some((8, 11)));

    let mut backward = Scanner::new(&doc, ScanOptions::backward()).prime();
    assert_eq!(backward.advance(6, &word()).unwrap().span(), Some((3, 0)));

    let mut ignoring = Scanner::new(&doc, ScanOptions::forward().respect_folds(false)).prime();
    assert_eq!(ignoring.advance(3, &word()).unwrap().span(), Some((4, 7)));
  }

  #[test]
  fn test_fold_cuts_words() {
    let mut doc = doc("foobar");
    doc.fold(2, 4);
    let mut session = Scanner::new(&doc, ScanOptions::forward()).prime();
    assert_eq!(
      session.collect(0, &word(), None).unwrap(),
      vec![(0, 2), (4, 6)]
    );
  }

  #[test]
  fn test_small_chunks_cross_lines() {
    let text = Rope::from_str("aa\nbb bb\n\ncc\n");
    let mut session = Scanner::new(&text, ScanOptions::forward().chunk_size(1)).prime();
    assert_eq!(
      session.collect(0, &word(), None).unwrap(),
      vec![(0, 2), (3, 5), (6, 8), (10, 12)]
    );
    let mut session = Scanner::new(&text, ScanOptions::backward().chunk_size(1)).prime();
    assert_eq!(
      session.collect(13, &word(), None).unwrap(),
      vec![(12, 10), (8, 6), (5, 3), (2, 0)]
    );
  }

  #[test]
  fn test_pattern_change_restarts() {
    let text = Rope::from_str("ab12cd34");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    let digits = Pattern::new("[0-9]+").unwrap();
    assert_eq!(session.advance(0, &word()).unwrap().span(), Some((0, 2)));
    assert_eq!(session.advance(2, &digits).unwrap().span(), Some((2, 4)));
    assert_eq!(session.advance(4, &digits).unwrap().span(), Some((6, 8)));
    // Jumping back restarts at the new index.
    assert_eq!(session.advance(1, &word()).unwrap().span(), Some((1, 2)));
  }

  #[test]
  fn test_lookbehind_sees_text_before_index() {
    let text = Rope::from_str("x.foo foo");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    let after_dot = Pattern::new(r"(?<=\.)foo").unwrap();
    assert_eq!(session.advance(2, &after_dot).unwrap().span(), Some((2, 5)));
  }

  #[test]
  fn test_empty_matches_progress() {
    let text = Rope::from_str("ab");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    let empty = Pattern::new("").unwrap();
    assert_eq!(
      session.collect(0, &empty, Some(3)).unwrap(),
      vec![(0, 0), (1, 1), (2, 2)]
    );
  }

  #[test]
  fn test_multibyte_offsets() {
    let text = Rope::from_str("é ü ab");
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    assert_eq!(session.advance(0, &word()).unwrap().span(), Some((4, 6)));
    let mut session = Scanner::new(&text, ScanOptions::backward()).prime();
    let any = Pattern::new(r"\S").unwrap();
    assert_eq!(
      session.collect(6, &any, None).unwrap(),
      vec![(6, 5), (5, 4), (3, 2), (1, 0)]
    );
  }

  #[test]
  fn test_runtime_failure_terminates_session() {
    let text = Rope::from_str(&"ab".repeat(50));
    let mut session = Scanner::new(&text, ScanOptions::forward()).prime();
    let runaway = Pattern::new("(?i)(a|b|ab)*(?=c)").unwrap();
    assert!(matches!(
      session.advance(0, &runaway),
      Err(ScanError::Regex(PatternError::Runtime { .. }))
    ));
    assert!(matches!(
      session.advance(0, &word()),
      Err(ScanError::Terminated)
    ));
  }

  // Generated documents over a tiny alphabet so words, blank lines and chunk
  // seams all show up in small inputs.
  fn build(bytes: &[u8], folds: &[(u8, u8)]) -> Document {
    let text: String = bytes
      .iter()
      .map(|b| {
        match b % 4 {
          0 => 'a',
          1 => 'b',
          2 => ' ',
          _ => '\n',
        }
      })
      .collect();
    let mut doc = doc(&text);
    let len = text.len();
    for &(a, b) in folds {
      let (a, b) = (a as usize % (len + 1), b as usize % (len + 1));
      doc.fold(a.min(b), a.max(b));
    }
    doc
  }

  quickcheck::quickcheck! {
    fn forward_and_backward_agree(bytes: Vec<u8>, folds: Vec<(u8, u8)>, size: u8) -> bool {
      let doc = build(&bytes, &folds);
      let len = doc.len_chars();
      let options = ScanOptions::forward().chunk_size(size as usize % 5 + 1);
      let forward = Scanner::new(&doc, options)
        .prime()
        .collect(0, &word(), None)
        .unwrap();
      let reversed = ScanOptions { direction: Direction::Backward, ..options };
      let mut backward: Vec<_> = Scanner::new(&doc, reversed)
        .prime()
        .collect(len, &word(), None)
        .unwrap()
        .into_iter()
        .map(|(start, end)| (end, start))
        .collect();
      backward.reverse();
      forward == backward
    }

    fn matches_avoid_folds(bytes: Vec<u8>, folds: Vec<(u8, u8)>, size: u8) -> bool {
      let doc = build(&bytes, &folds);
      let options = ScanOptions::forward().chunk_size(size as usize % 5 + 1);
      let found = Scanner::new(&doc, options)
        .prime()
        .collect(0, &word(), None)
        .unwrap();
      found.iter().all(|&(start, end)| {
        doc
          .folds()
          .iter()
          .all(|&(f1, f2)| end <= f1 || start >= f2)
      })
    }

    fn continuation_matches_restart(bytes: Vec<u8>, folds: Vec<(u8, u8)>, size: u8) -> bool {
      let doc = build(&bytes, &folds);
      let options = ScanOptions::forward().chunk_size(size as usize % 5 + 1);
      let continued = Scanner::new(&doc, options)
        .prime()
        .collect(0, &word(), None)
        .unwrap();
      continued.windows(2).all(|pair| {
        let mut fresh = Scanner::new(&doc, options).prime();
        fresh.advance(pair[0].1, &word()).unwrap().span() == Some(pair[1])
      })
    }
  }
}
