//! Incremental multi-character search ("sneak").
//!
//! Every keystroke extends (or, through `keep`, truncates) the search string
//! of a document and moves every cursor to its next occurrence. With a single
//! cursor the following occurrences are handed back as numbered previews, so
//! [`nth_match`] can jump straight to one of them.

use bitflags::bitflags;
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
    ScanSession,
    Scanner,
  },
  selection::{
    Range,
    Selection,
  },
};

/// Labels drawn over preview matches, in jump order.
pub const DISAMBIGUATION_GLYPHS: [&str; 10] = [
  "➊", "➋", "➌", "➍", "➎", "➏", "➐", "➑", "➒", "🄌",
];

bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct SneakStatus: u8 {
    /// The search string is the same as last time.
    const REPEAT        = 1 << 0;
    const HAS_MATCH     = 1 << 1;
    /// Nothing typed yet.
    const NEW_SEARCH    = 1 << 2;
    /// Too few characters typed to search.
    const WAITING       = 1 << 3;
    const END_OF_BUFFER = 1 << 4;
  }
}

/// Per-document search state, kept between keystrokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SneakState {
  last_search: String,
  direction:   Direction,
  extend:      bool,
  matches:     Vec<(usize, usize)>,
  waiting:     bool,
  has_match:   bool,
}

impl Default for SneakState {
  fn default() -> Self {
    Self {
      last_search: String::new(),
      direction:   Direction::Forward,
      extend:      true,
      matches:     Vec::new(),
      waiting:     false,
      has_match:   false,
    }
  }
}

impl SneakState {
  pub fn last_search(&self) -> &str {
    &self.last_search
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  pub fn extend(&self) -> bool {
    self.extend
  }

  /// Preview matches of the last search, in document order pairs.
  pub fn matches(&self) -> &[(usize, usize)] {
    &self.matches
  }

  pub fn is_waiting(&self) -> bool {
    self.waiting
  }

  pub fn has_match(&self) -> bool {
    self.has_match
  }

  /// Forget transient results once the prompt closes. The search string is
  /// kept so the next search can repeat it.
  pub fn dismiss(&mut self) {
    self.matches.clear();
    self.waiting = false;
    self.has_match = false;
  }
}

/// One keystroke of a search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SneakInput {
  pub character: Option<char>,
  /// How many chars of the previous search to keep before appending.
  pub keep:      usize,
  /// Defaults to the previous direction.
  pub direction: Option<Direction>,
  /// Defaults to the previous extend mode.
  pub extend:    Option<bool>,
  /// Treat the search string as a regex.
  pub raw:       bool,
}

impl SneakInput {
  pub fn new(character: Option<char>, keep: usize) -> Self {
    Self {
      character,
      keep,
      ..Self::default()
    }
  }

  #[must_use]
  pub fn direction(mut self, direction: Direction) -> Self {
    self.direction = Some(direction);
    self
  }

  #[must_use]
  pub fn extend(mut self, extend: bool) -> Self {
    self.extend = Some(extend);
    self
  }

  #[must_use]
  pub fn raw(mut self, raw: bool) -> Self {
    self.raw = raw;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SneakPrompt {
  pub text:  String,
  pub style: PromptStyle,
  pub bold:  bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SneakOutcome {
  pub status:   SneakStatus,
  /// The moved selection, when any cursor found an occurrence.
  pub motion:   Option<Motion>,
  /// Occurrences past the new cursors, for highlighting.
  pub previews: Vec<(usize, usize)>,
  pub prompt:   SneakPrompt,
}

impl SneakOutcome {
  /// Whether a search ran for this keystroke.
  pub fn searched(&self) -> bool {
    !self.status.contains(SneakStatus::WAITING)
  }
}

/// Session-wide bounds on a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SneakLimits {
  /// Characters to type before the first search runs.
  pub min_chars: usize,
  /// Previews collected past a single cursor.
  pub previews:  usize,
}

impl SneakLimits {
  pub const fn new(min_chars: usize, previews: usize) -> Self {
    Self {
      min_chars,
      previews,
    }
  }
}

impl Default for SneakLimits {
  fn default() -> Self {
    Self::new(1, DISAMBIGUATION_GLYPHS.len())
  }
}

/// Apply one keystroke of a search to `selection`.
pub fn sneak<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  state: &mut SneakState,
  input: SneakInput,
  limits: SneakLimits,
) -> Result<SneakOutcome> {
  let mut status = SneakStatus::empty();

  let mut search: String = state.last_search.chars().take(input.keep).collect();
  search.extend(input.character);
  let typed = search.chars().count();

  if search == state.last_search {
    status |= SneakStatus::REPEAT;
  }
  if typed < input.keep || typed < limits.min_chars {
    status |= SneakStatus::WAITING;
  }
  if search.is_empty() {
    status |= SneakStatus::NEW_SEARCH | SneakStatus::WAITING;
  }

  let direction = input.direction.unwrap_or(state.direction);
  let extend = input.extend.unwrap_or(state.extend);

  let selection = if selection.is_empty() {
    Selection::point(0)
  } else {
    selection.clone()
  };

  let mut motion = None;
  let mut previews = Vec::new();
  if !status.contains(SneakStatus::WAITING) {
    let query = Query {
      search: &search,
      direction,
      extend,
      repeat: status.contains(SneakStatus::REPEAT),
      raw: input.raw,
      previews: limits.previews,
    };
    let found = search_from(text, &selection, &query)?;
    match found {
      Some((moved, found_previews)) => {
        status |= SneakStatus::HAS_MATCH;
        tracing::debug!(search = search.as_str(), cursors = moved.len(), "sneak");
        if moved.len() == 1 {
          state.matches = found_previews.clone();
        } else {
          state.matches.clear();
        }
        previews = found_previews;
        motion = Some(Motion::revealing_edge(moved, direction));
      },
      None => {
        status |= SneakStatus::END_OF_BUFFER;
        tracing::debug!(search = search.as_str(), "sneak reached end of buffer");
      },
    }
  }

  let prompt = prompt(&search, direction, extend, status);

  state.last_search = search;
  state.direction = direction;
  state.extend = extend;
  state.has_match = status.contains(SneakStatus::HAS_MATCH);
  state.waiting = status.contains(SneakStatus::WAITING);

  Ok(SneakOutcome {
    status,
    motion,
    previews,
    prompt,
  })
}

/// Jump to the `n`th preview of the last search. `None` when there is no
/// such preview.
pub fn nth_match(state: &SneakState, selection: &Selection, n: usize) -> Option<Motion> {
  let &(start, end) = state.matches.get(n)?;
  let anchor = match selection.first() {
    Some(range) if state.extend => range.anchor,
    _ => start,
  };
  Some(Motion::new(Selection::single(anchor, start)).with_reveal(Reveal::centered(end)))
}

/// Where the prompt goes: the first head `is_visible` accepts, else the last
/// head.
pub fn prompt_anchor(selection: &Selection, is_visible: impl Fn(usize) -> bool) -> Option<usize> {
  selection
    .heads()
    .find(|&head| is_visible(head))
    .or_else(|| selection.last().map(|range| range.head))
}

// Helpers.
//

fn prompt(search: &str, direction: Direction, extend: bool, status: SneakStatus) -> SneakPrompt {
  let waiting = status.contains(SneakStatus::WAITING);
  let text = match (direction, waiting) {
    (Direction::Forward, true) => format!("{search}_❯"),
    (Direction::Forward, false) => format!("{search}❯"),
    (Direction::Backward, true) => format!("❮{search}_"),
    (Direction::Backward, false) => format!("❮{search}"),
  };
  let style = if status.contains(SneakStatus::END_OF_BUFFER) {
    PromptStyle::Error
  } else {
    PromptStyle::Success
  };
  SneakPrompt {
    text,
    style,
    bold: extend,
  }
}

type Found = (Selection, Vec<(usize, usize)>);

struct Query<'a> {
  search:    &'a str,
  direction: Direction,
  extend:    bool,
  repeat:    bool,
  raw:       bool,
  previews:  usize,
}

fn search_from<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  query: &Query<'_>,
) -> Result<Option<Found>> {
  let Query {
    search,
    direction,
    extend,
    repeat,
    raw,
    previews: preview_limit,
  } = *query;
  let forward = direction.is_forward();
  let needle: String = if forward {
    search.to_string()
  } else {
    search.chars().rev().collect()
  };
  let pattern = Pattern::smartcase(&needle, raw)?;
  let len = text.len_chars();

  // Where each cursor starts looking, so that a repeated search leaves the
  // occurrence under the cursor behind.
  let typed = search.chars().count();
  let start_at = |head: usize| {
    let index = match (forward, repeat) {
      (true, false) => head,
      (true, true) => head + 1,
      (false, false) => head + typed,
      (false, true) => (head + typed).saturating_sub(1),
    };
    index.min(len)
  };

  let mut session = Scanner::new(text, ScanOptions::new(direction)).prime();
  let cursors: Vec<Range> = if forward {
    selection.iter().copied().collect()
  } else {
    selection.iter().rev().copied().collect()
  };

  let mut seen = Vec::new();
  let mut moved = Vec::with_capacity(cursors.len());
  for range in cursors {
    let mut index = start_at(range.head);
    while let Some((doc_start, doc_end)) = next_occurrence(&mut session, index, &pattern)? {
      index = if forward { doc_end } else { doc_start };
      if seen.contains(&doc_start) {
        continue;
      }
      seen.push(doc_start);
      moved.push(match (forward, extend) {
        (true, true) => Range::new(range.from(), doc_start),
        (false, true) => Range::new(range.to(), doc_start),
        (_, false) => Range::point(doc_start),
      });
      break;
    }
  }

  if moved.is_empty() {
    return Ok(None);
  }
  let moved = Selection::new(moved);

  let per_cursor = if moved.len() == 1 {
    preview_limit
  } else {
    1
  };
  let mut previews = Vec::new();
  for range in &moved {
    let mut head = range.head;
    for _ in 0..per_cursor {
      let index = if forward {
        head + 1
      } else {
        // The previous occurrence must start before `head`.
        let Some(index) = (head + typed).checked_sub(1) else {
          break;
        };
        index
      };
      let Some((doc_start, doc_end)) = next_occurrence(&mut session, index.min(len), &pattern)?
      else {
        break;
      };
      previews.push((doc_start, doc_end));
      head = doc_start;
    }
  }

  Ok(Some((moved, previews)))
}

/// Next occurrence as a `(start, end)` pair in document order.
fn next_occurrence<T: TextSource + ?Sized>(
  session: &mut ScanSession<'_, T>,
  index: usize,
  pattern: &Pattern,
) -> Result<Option<(usize, usize)>> {
  Ok(match session.advance(index, pattern)? {
    ScanOutcome::Match { start, end } => Some((start.min(end), start.max(end))),
    _ => None,
  })
}
