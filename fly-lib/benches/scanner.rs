//! Benchmarks for chunked scanning and the navigators built on it.
//!
//! Run with: `cargo bench -p fly-lib --bench scanner`

use divan::{
  Bencher,
  black_box,
};
use fly_core::chars::WordSeparators;
use fly_lib::{
  find_under::{
    FindUnder,
    find_under_expand,
  },
  movement::Direction,
  scanner::{
    ScanOptions,
    ScanOutcome,
    Scanner,
  },
  selection::Selection,
  sneak::{
    SneakInput,
    SneakLimits,
    SneakState,
    sneak,
  },
  word::{
    WordMotion,
    navigate_word,
  },
};
use fly_stdx::pattern::Pattern;
use ropey::Rope;

fn main() {
  divan::main();
}

fn make_rope(size: usize) -> Rope {
  let line = "The quick brown fox jumps over the lazy dog.\n";
  let mut s = String::with_capacity(size);
  while s.len() < size {
    s.push_str(line);
  }
  s.truncate(size);
  Rope::from_str(&s)
}

// Full passes over the buffer.

mod scan {
  use super::*;

  fn count_matches(rope: &Rope, direction: Direction, pattern: &Pattern) -> usize {
    let mut session = Scanner::new(rope, ScanOptions::new(direction)).prime();
    let mut index = match direction {
      Direction::Forward => 0,
      Direction::Backward => rope.len_chars(),
    };
    let mut count = 0;
    while let Ok(ScanOutcome::Match { end, .. }) = session.advance(index, pattern) {
      count += 1;
      index = end;
    }
    count
  }

  #[divan::bench(args = [16 * 1024, 256 * 1024, 1024 * 1024])]
  fn forward(bencher: Bencher, size: usize) {
    let rope = make_rope(size);
    let pattern = Pattern::literal("fox", false).unwrap();
    bencher.bench(|| black_box(count_matches(&rope, Direction::Forward, &pattern)));
  }

  #[divan::bench(args = [16 * 1024, 256 * 1024, 1024 * 1024])]
  fn backward(bencher: Bencher, size: usize) {
    let rope = make_rope(size);
    let pattern = Pattern::literal("xof", false).unwrap();
    bencher.bench(|| black_box(count_matches(&rope, Direction::Backward, &pattern)));
  }
}

// Incremental search, one keystroke at a time.

mod search {
  use super::*;

  const SIZE: usize = 256 * 1024;

  #[divan::bench(args = [1, 8, 64])]
  fn sneak_keystrokes(bencher: Bencher, cursors: usize) {
    let rope = make_rope(SIZE);
    let step = rope.len_chars() / (cursors + 1);
    let selection = Selection::new((1..=cursors).map(|i| (i * step, i * step).into()));

    bencher.bench(|| {
      let mut state = SneakState::default();
      let mut selection = selection.clone();
      for (keep, ch) in "lazy".chars().enumerate() {
        let input = SneakInput::new(Some(ch), keep).extend(false);
        let outcome = sneak(&rope, &selection, &mut state, input, SneakLimits::default()).unwrap();
        if let Some(motion) = outcome.motion {
          selection = motion.selection;
        }
      }
      black_box(selection);
    });
  }

  #[divan::bench]
  fn find_all(bencher: Bencher) {
    let rope = make_rope(SIZE);
    let separators = WordSeparators::default();
    let selection = Selection::single(4, 9);
    let find = FindUnder::new(Direction::Forward).find_all(true);
    bencher.bench(|| {
      black_box(find_under_expand(&rope, &selection, &separators, find).unwrap());
    });
  }

  #[divan::bench(args = [1, 64])]
  fn word_steps(bencher: Bencher, cursors: usize) {
    let rope = make_rope(SIZE);
    let step = rope.len_chars() / (cursors + 1);
    let selection = Selection::new((1..=cursors).map(|i| (i * step, i * step).into()));
    let separators = WordSeparators::default();
    let motion = WordMotion::new(Direction::Forward);
    bencher.bench(|| {
      black_box(navigate_word(&rope, &selection, &separators, motion).unwrap());
    });
  }
}
