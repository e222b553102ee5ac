#![no_main]

//! Chunked scanning must report exactly the matches a plain walk over the
//! visible text finds, whatever the chunk size and folds.

use std::num::NonZeroUsize;

use fly_lib::{
  document::{
    Document,
    DocumentId,
  },
  movement::Direction,
  scanner::{
    ScanOptions,
    Scanner,
  },
};
use fly_stdx::pattern::Pattern;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
  let [size, pick, fold_a, fold_b, rest @ ..] = data else {
    return;
  };
  let text = String::from_utf8_lossy(rest);
  let chars: Vec<char> = text.chars().collect();
  if chars.is_empty() {
    return;
  }
  let needle = chars[*pick as usize % chars.len()];
  if needle == '\n' || needle == '\r' {
    return;
  }
  let Ok(pattern) = Pattern::literal(needle.encode_utf8(&mut [0; 4]), false) else {
    return;
  };

  let mut doc = Document::from_str(DocumentId::new(NonZeroUsize::MIN), &text);
  let (mut from, mut to) = (
    *fold_a as usize % (chars.len() + 1),
    *fold_b as usize % (chars.len() + 1),
  );
  if from > to {
    std::mem::swap(&mut from, &mut to);
  }
  if from < to {
    doc.fold(from, to);
  }
  let hidden = |pos: usize| doc.folds().iter().any(|&(s, e)| pos >= s && pos < e);

  let chunk_size = (*size as usize % 64) + 1;
  let visible: Vec<usize> = chars
    .iter()
    .enumerate()
    .filter(|&(pos, &ch)| ch == needle && !hidden(pos))
    .map(|(pos, _)| pos)
    .collect();

  let forward = ScanOptions::new(Direction::Forward).chunk_size(chunk_size);
  let found = Scanner::new(&doc, forward)
    .prime()
    .collect(0, &pattern, None)
    .unwrap();
  let expected: Vec<_> = visible.iter().map(|&pos| (pos, pos + 1)).collect();
  assert_eq!(found, expected);

  let backward = ScanOptions::new(Direction::Backward).chunk_size(chunk_size);
  let found = Scanner::new(&doc, backward)
    .prime()
    .collect(chars.len(), &pattern, None)
    .unwrap();
  let expected: Vec<_> = visible.iter().rev().map(|&pos| (pos + 1, pos)).collect();
  assert_eq!(found, expected);
});
