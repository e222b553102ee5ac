//! Select further occurrences of the selected text.
//!
//! Carets first grow to the word around them. Once there are selections,
//! every distinct selected literal is searched for on its own: stepping to
//! the next occurrence only follows matches of the same text. A literal that
//! sits on word boundaries only matches whole words; one that does not (part
//! of an identifier, say) matches anywhere.

use fly_core::chars::WordSeparators;
use fly_stdx::pattern::{
  Pattern,
  escape,
};

use crate::{
  document::{
    TextSource,
    fragment,
  },
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindUnder {
  pub direction: Direction,
  /// Replace the last selection of each group instead of adding to it.
  pub skip:      bool,
  pub find_all:  bool,
}

impl FindUnder {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      skip: false,
      find_all: false,
    }
  }

  #[must_use]
  pub fn skip(mut self, skip: bool) -> Self {
    self.skip = skip;
    self
  }

  #[must_use]
  pub fn find_all(mut self, find_all: bool) -> Self {
    self.find_all = find_all;
    self
  }
}

/// Selections sharing one literal, and the pattern that finds it.
///
/// For backward searches `word` and `pattern` are reversed.
#[derive(Debug, Clone)]
pub struct WordGroup {
  pub word:    String,
  pub ranges:  Vec<Range>,
  pub pattern: Pattern,
}

pub fn find_under_expand<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  separators: &WordSeparators,
  find: FindUnder,
) -> Result<Option<Motion>> {
  if selection.is_empty() {
    return Ok(None);
  }

  if let Some(expanded) = expand_carets(text, selection, separators) {
    let reveal = edge_head(&expanded, find.direction);
    let mut motion = Motion::new(expanded);
    if let Some(head) = reveal {
      motion = motion.with_reveal(Reveal::centered(head));
    }
    return Ok(Some(motion));
  }

  let groups = group_by_word(text, selection, separators, find.direction)?;
  let forward = find.direction.is_forward();
  let mut session = Scanner::new(text, ScanOptions::new(find.direction)).prime();
  let mut result = selection.clone();

  for group in &groups {
    let Some(&last) = group.ranges.last() else {
      continue;
    };
    let mut index = match (find.find_all, forward) {
      (true, true) => 0,
      (true, false) => text.len_chars(),
      (false, true) => last.to(),
      (false, false) => last.from(),
    };
    let revert = group.ranges.iter().all(|r| r.anchor > r.head) == forward;

    while let ScanOutcome::Match { start, end } = session.advance(index, &group.pattern)? {
      index = end;
      result.add(if revert {
        Range::new(end, start)
      } else {
        Range::new(start, end)
      });
      if find.skip {
        result.subtract(last);
      }
      if !find.find_all {
        break;
      }
    }
  }

  let reveal = edge_head(&result, find.direction);
  let mut motion = Motion::new(result);
  if let Some(head) = reveal {
    motion = motion.with_reveal(Reveal::centered(head));
  }
  Ok(Some(motion))
}

/// Group the non-empty ranges of `selection` by their text, in scan order.
pub fn group_by_word<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  separators: &WordSeparators,
  direction: Direction,
) -> Result<Vec<WordGroup>> {
  let forward = direction.is_forward();
  let class = separators.class_body();
  let word_start = format!(r"(^|\b(?<=[{class}]))");
  let word_end = format!(r"((?=[{class}])|\b|$)");

  let ranges: Vec<Range> = if forward {
    selection.iter().copied().collect()
  } else {
    selection.iter().rev().copied().collect()
  };

  let mut groups: Vec<WordGroup> = Vec::new();
  for range in ranges {
    if range.is_empty() {
      continue;
    }

    let mut word = fragment(text, range).into_owned();
    // The selection with one char of context on each side, when there is any.
    let mut surroundings = String::with_capacity(word.len() + 8);
    surroundings.extend(range.from().checked_sub(1).and_then(|pos| text.char_at(pos)));
    surroundings.push_str(&word);
    surroundings.extend(text.char_at(range.to()));
    if !forward {
      word = word.chars().rev().collect();
      surroundings = surroundings.chars().rev().collect();
    }

    let index = match groups.iter().position(|group| group.word == word) {
      Some(index) => index,
      None => {
        let bounded = format!("{word_start}{}{word_end}", escape(&word));
        groups.push(WordGroup {
          pattern: Pattern::new(&bounded)?,
          word,
          ranges: Vec::new(),
        });
        groups.len() - 1
      },
    };

    let group = &mut groups[index];
    group.ranges.push(range);
    if !group.pattern.is_match(&surroundings)? {
      tracing::trace!(word = group.word.as_str(), "literal is not on word bounds");
      group.pattern = Pattern::literal(&group.word, false)?;
    }
  }
  Ok(groups)
}

// Helpers.
//

/// Grow every caret touching a word to that word. `None` when no caret
/// grew.
fn expand_carets<T: TextSource + ?Sized>(
  text: &T,
  selection: &Selection,
  separators: &WordSeparators,
) -> Option<Selection> {
  let is_word = |pos: usize| text.char_at(pos).is_some_and(|ch| separators.is_word_char(ch));

  let mut expanded = false;
  let ranges: Vec<Range> = selection
    .iter()
    .map(|&range| {
      if !range.is_empty() {
        return range;
      }
      let mut start = range.head;
      while start > 0 && is_word(start - 1) {
        start -= 1;
      }
      let mut end = range.head;
      while is_word(end) {
        end += 1;
      }
      if start == end {
        return range;
      }
      expanded = true;
      Range::new(start, end)
    })
    .collect();

  expanded.then(|| Selection::new(ranges))
}

fn edge_head(selection: &Selection, direction: Direction) -> Option<usize> {
  let edge = match direction {
    Direction::Forward => selection.last(),
    Direction::Backward => selection.first(),
  };
  edge.map(|range| range.head)
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  fn run(text: &str, ranges: &[(usize, usize)], find: FindUnder) -> Vec<(usize, usize)> {
    let rope = Rope::from_str(text);
    let selection = Selection::new(ranges.iter().map(|&(a, b)| Range::new(a, b)));
    find_under_expand(&rope, &selection, &WordSeparators::default(), find)
      .unwrap()
      .unwrap()
      .selection
      .iter()
      .map(|r| (r.anchor, r.head))
      .collect()
  }

  fn forward() -> FindUnder {
    FindUnder::new(Direction::Forward)
  }

  fn backward() -> FindUnder {
    FindUnder::new(Direction::Backward)
  }

  #[test]
  fn test_caret_expands_to_word() {
    assert_eq!(run("foo bar", &[(5, 5)], forward()), vec![(4, 7)]);
    assert_eq!(run("foo bar", &[(7, 7)], forward()), vec![(4, 7)]);
  }

  #[test]
  fn test_caret_in_whitespace_stays() {
    assert_eq!(run("foo  bar", &[(4, 4)], forward()), vec![(4, 4)]);
  }

  #[test]
  fn test_adds_next_occurrence() {
    assert_eq!(
      run("foo bar foo", &[(0, 3)], forward()),
      vec![(0, 3), (8, 11)]
    );
  }

  #[test]
  fn test_whole_word_skips_partial_matches() {
    assert_eq!(
      run("foo foobar foo", &[(0, 3)], forward()),
      vec![(0, 3), (11, 14)]
    );
  }

  #[test]
  fn test_partial_word_matches_anywhere() {
    assert_eq!(
      run("foobar foo", &[(0, 3)], forward()),
      vec![(0, 3), (7, 10)]
    );
    assert_eq!(
      run("barfoo xfoo", &[(3, 6)], forward()),
      vec![(3, 6), (8, 11)]
    );
  }

  #[test]
  fn test_backward() {
    assert_eq!(
      run("foo bar foo", &[(8, 11)], backward()),
      vec![(0, 3), (8, 11)]
    );
    assert_eq!(
      run("foo bar foo", &[(11, 8)], backward()),
      vec![(3, 0), (11, 8)]
    );
  }

  #[test]
  fn test_reversed_selection_stays_reversed() {
    assert_eq!(
      run("foo bar foo", &[(3, 0)], forward()),
      vec![(3, 0), (11, 8)]
    );
  }

  #[test]
  fn test_skip_replaces_last() {
    assert_eq!(
      run("foo bar foo foo", &[(0, 3)], forward().skip(true)),
      vec![(8, 11)]
    );
  }

  #[test]
  fn test_find_all() {
    assert_eq!(
      run("foo bar foo bar foo", &[(8, 11)], forward().find_all(true)),
      vec![(0, 3), (8, 11), (16, 19)]
    );
    assert_eq!(
      run("foo bar foo", &[(0, 3)], backward().find_all(true)),
      vec![(0, 3), (8, 11)]
    );
  }

  #[test]
  fn test_groups_advance_independently() {
    let text = "foo bar foo bar";
    assert_eq!(
      run(text, &[(0, 3), (4, 7)], forward()),
      vec![(0, 3), (4, 7), (8, 11), (12, 15)]
    );
  }

  #[test]
  fn test_same_text_shares_a_pattern() {
    let rope = Rope::from_str("foo bar foo bar foo");
    let selection = Selection::new([Range::new(0, 3), Range::new(4, 7), Range::new(8, 11)]);
    let groups = group_by_word(
      &rope,
      &selection,
      &WordSeparators::default(),
      Direction::Forward,
    )
    .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].word, "foo");
    assert_eq!(groups[0].ranges, vec![Range::new(0, 3), Range::new(8, 11)]);
    assert_eq!(groups[1].word, "bar");
    assert!(!groups[0].pattern.shares_program(&groups[1].pattern));
  }

  #[test]
  fn test_backward_groups_are_reversed() {
    let rope = Rope::from_str("ab ab");
    let selection = Selection::new([Range::new(0, 2), Range::new(3, 5)]);
    let groups = group_by_word(
      &rope,
      &selection,
      &WordSeparators::default(),
      Direction::Backward,
    )
    .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].word, "ba");
    assert_eq!(groups[0].ranges, vec![Range::new(3, 5), Range::new(0, 2)]);
  }

  #[test]
  fn test_reveals_centered() {
    let rope = Rope::from_str("foo bar foo");
    let motion = find_under_expand(
      &rope,
      &Selection::single(0, 3),
      &WordSeparators::default(),
      forward(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(motion.reveal, Some(Reveal::centered(11)));
  }
}
