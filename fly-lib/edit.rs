//! Commands that change the text around the selection.
//!
//! Every command here fails with [`DocumentError::Readonly`] before touching
//! anything when the document is read-only; the command layer turns that
//! into a status message.

use std::collections::BTreeMap;

use crate::{
  document::{
    Document,
    DocumentError,
    Result,
    TextSource,
    fragment,
  },
  movement::Reveal,
  selection::{
    Range,
    Selection,
  },
};

/// Insert spaces before every caret so all heads end up on the largest
/// column.
pub fn align_cursors(doc: &mut Document) -> Result<()> {
  ensure_writable(doc)?;
  let columns: Vec<(usize, usize)> = doc
    .selection()
    .heads()
    .map(|head| (head, doc.column(head)))
    .collect();
  let Some(target) = columns.iter().map(|&(_, column)| column).max() else {
    return Ok(());
  };

  let edits = columns
    .into_iter()
    .filter(|&(_, column)| column < target)
    .map(|(head, column)| (head, head, " ".repeat(target - column)))
    .collect();
  doc.replace_many(edits)
}

/// Duplicate the lines under carets and the text of non-empty ranges.
/// Blocks that touch are duplicated as one. The selection moves onto the
/// copies.
pub fn duplicate_lines(doc: &mut Document) -> Result<Option<Reveal>> {
  ensure_writable(doc)?;
  if doc.selection().is_empty() {
    return Ok(None);
  }

  // Keyed by start so a caret line and a selection starting there collapse.
  let mut regions = BTreeMap::new();
  for range in doc.selection() {
    let (from, to) = if range.is_empty() {
      doc.full_line(range.head)
    } else {
      (range.from(), range.to())
    };
    regions.insert(from, to);
  }

  let mut blocks: Vec<(usize, usize)> = Vec::with_capacity(regions.len());
  for (from, to) in regions {
    match blocks.last_mut() {
      Some(last) if from <= last.1 => last.1 = last.1.max(to),
      _ => blocks.push((from, to)),
    }
  }

  let len = doc.len_chars();
  let reveal = blocks.first().map(|&(from, _)| Reveal::at(from));
  let edits = blocks
    .into_iter()
    .map(|(from, to)| {
      let mut copy = doc.substr(from, to).into_owned();
      // The last line has no line ending of its own to duplicate.
      if to == len && doc.line_containing(from).0 == from && !copy.ends_with('\n') {
        copy.push('\n');
      }
      (from, from, copy)
    })
    .collect();
  doc.replace_many(edits)?;
  Ok(reveal)
}

/// What a copy or cut took from the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Copied {
  /// The text for the clipboard. `None` when it was empty or only
  /// whitespace.
  pub clip:       Option<String>,
  /// Regions to flash, in document order. Empty for cuts.
  pub highlights: Vec<Range>,
}

/// Copy (or cut) the selected text. Carets contribute their whole line,
/// each line at most once.
///
/// With `whole_line` every line a range covers turns into a caret first, so
/// the copy takes whole lines. After a copy from carets only, lines that
/// form one contiguous block collapse to the last caret.
pub fn smart_copy(doc: &mut Document, whole_line: bool, cut: bool) -> Result<Copied> {
  if cut {
    ensure_writable(doc)?;
  }
  if doc.selection().is_empty() {
    return Ok(Copied::default());
  }

  if whole_line {
    let carets = line_carets(doc, doc.selection());
    doc.set_selection(carets);
  }

  let selection = doc.selection().clone();
  let carets_only = selection.all_empty();
  let mut seen_lines = Vec::new();
  let mut content = Vec::with_capacity(selection.len());
  for range in &selection {
    if !range.is_empty() {
      content.push(Range::new(range.from(), range.to()));
      continue;
    }
    let (start, end) = doc.full_line(range.head);
    if !seen_lines.contains(&start) {
      seen_lines.push(start);
      content.push(Range::new(start, end));
    }
  }

  let separator = if carets_only { "" } else { "\n" };
  let clip = content
    .iter()
    .map(|&range| fragment(doc, range))
    .collect::<Vec<_>>()
    .join(separator);
  let clip = (!clip.trim().is_empty()).then_some(clip);

  if cut {
    let edits = content
      .iter()
      .map(|range| (range.from(), range.to(), String::new()))
      .collect();
    doc.replace_many(edits)?;
    return Ok(Copied {
      clip,
      highlights: Vec::new(),
    });
  }

  let contiguous = content.windows(2).all(|pair| pair[0].to() == pair[1].from());
  if carets_only
    && contiguous
    && let Some(last) = selection.last()
  {
    doc.set_selection(Selection::point(last.head));
  }

  Ok(Copied {
    clip,
    highlights: content,
  })
}

/// Paste `clipboard` at every range.
///
/// The clipboard is split into lines. When there is one line per range (or
/// per distinct selected text) each range gets its own line, otherwise each
/// gets the whole clipboard. A clipboard ending in a line break is pasted
/// line-wise: above the caret's line, re-indented to that line's
/// indentation, with the caret moving onto the pasted line. With
/// `strip_whitespace` lines are joined by spaces and never pasted
/// line-wise.
pub fn smart_paste(doc: &mut Document, clipboard: &str, strip_whitespace: bool) -> Result<()> {
  ensure_writable(doc)?;
  if clipboard.is_empty() || doc.selection().is_empty() {
    return Ok(());
  }

  let clips: Vec<&str> = clipboard.lines().collect();
  if clips.is_empty() {
    return Ok(());
  }
  let base_indent = clips
    .iter()
    .filter(|line| !line.trim().is_empty())
    .map(|line| line.chars().take_while(|ch| ch.is_whitespace()).count())
    .min()
    .unwrap_or(0);
  let lines: Vec<String> = clips
    .iter()
    .map(|line| line.chars().skip(base_indent).collect())
    .collect();
  let delimiter = if strip_whitespace { " " } else { "\n" };

  let selection = doc.selection().clone();
  let distinct_texts = {
    let mut texts: Vec<_> = selection.iter().map(|&range| fragment(doc, range)).collect();
    texts.sort_unstable();
    texts.dedup();
    texts.len()
  };
  let per_range = clips.len() == selection.len() || clips.len() == distinct_texts;

  let tab_size = doc.settings().tab_size.max(1);
  let (indent_unit, unit_width) = if doc.settings().translate_tabs_to_spaces {
    (' ', tab_size)
  } else {
    ('\t', 1)
  };
  let indented = |indent: usize, line: &str| {
    let mut out: String = std::iter::repeat_n(indent_unit, indent).collect();
    out.push_str(line);
    out
  };
  let whole = |indent: usize| {
    lines
      .iter()
      .map(|line| indented(indent, line))
      .collect::<Vec<_>>()
      .join(delimiter)
  };

  let mut edits = Vec::with_capacity(selection.len());
  // Caret positions relative to the start of their edit.
  let mut carets = Vec::with_capacity(selection.len());

  if clipboard.ends_with('\n') && !strip_whitespace {
    for (i, range) in selection.iter().enumerate() {
      let line_start = doc.line_containing(range.head).0;
      let indent = indentation_level(doc, line_start, tab_size) * unit_width;
      let mut text = if per_range {
        indented(indent, &lines[i % lines.len()])
      } else {
        whole(indent)
      };
      let first_line = text.lines().next().map_or(0, |line| line.chars().count());
      text.push_str(delimiter);

      let column = range.head - line_start;
      carets.push(column.min(first_line));
      edits.push((line_start, line_start, text));
    }
  } else {
    for (i, range) in selection.iter().enumerate() {
      let text = if per_range {
        clips[i % clips.len()].to_string()
      } else {
        whole(0)
      };
      carets.push(text.chars().count());
      edits.push((range.from(), range.to(), text));
    }
  }

  // Edits are in selection order, which is document order.
  let mut shift = 0isize;
  let mut placed = Vec::with_capacity(carets.len());
  for ((from, to, text), caret) in edits.iter().zip(carets) {
    placed.push(Range::point((*from as isize + shift) as usize + caret));
    shift += text.chars().count() as isize - (to - from) as isize;
  }

  doc.replace_many(edits)?;
  doc.set_selection(Selection::new(placed));
  Ok(())
}

// Helpers.
//

fn ensure_writable(doc: &Document) -> Result<()> {
  if doc.is_readonly() {
    return Err(DocumentError::Readonly);
  }
  Ok(())
}

/// One caret per line covered by each range: on the head when the head is
/// on that line, at the line start otherwise.
fn line_carets<T: TextSource + ?Sized>(text: &T, selection: &Selection) -> Selection {
  let mut carets = Vec::new();
  for range in selection {
    let mut pos = range.from();
    loop {
      let (start, end) = text.line_containing(pos);
      let caret = if (start..=end).contains(&range.head) {
        range.head
      } else {
        start
      };
      carets.push(Range::point(caret));

      let next = text.full_line(pos).1;
      if next >= range.to() || next <= pos {
        break;
      }
      pos = next;
    }
  }
  Selection::new(carets)
}

/// Indentation of the line starting at `line_start`, in tab stops.
fn indentation_level<T: TextSource + ?Sized>(
  text: &T,
  line_start: usize,
  tab_size: usize,
) -> usize {
  let mut width = 0;
  let mut pos = line_start;
  while let Some(ch) = text.char_at(pos) {
    match ch {
      ' ' => width += 1,
      '\t' => width += tab_size - width % tab_size,
      _ => break,
    }
    pos += 1;
  }
  width / tab_size
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::document::DocumentId;

  fn doc(text: &str, ranges: &[(usize, usize)]) -> Document {
    let mut doc = Document::from_str(DocumentId::new(NonZeroUsize::new(1).unwrap()), text);
    doc.set_selection(Selection::new(ranges.iter().map(|&(a, b)| Range::new(a, b))));
    doc
  }

  fn text(doc: &Document) -> String {
    doc.text().to_string()
  }

  fn ranges(doc: &Document) -> Vec<(usize, usize)> {
    doc.selection().iter().map(|r| (r.anchor, r.head)).collect()
  }

  #[test]
  fn test_align_cursors() {
    let mut doc = doc("a = 1\nlong = 2\n", &[(2, 2), (11, 11)]);
    align_cursors(&mut doc).unwrap();
    assert_eq!(text(&doc), "a    = 1\nlong = 2\n");
    assert_eq!(ranges(&doc), vec![(5, 5), (14, 14)]);
  }

  #[test]
  fn test_duplicate_caret_line() {
    let mut doc = doc("foo\nbar\n", &[(1, 1)]);
    let reveal = duplicate_lines(&mut doc).unwrap();
    assert_eq!(text(&doc), "foo\nfoo\nbar\n");
    assert_eq!(ranges(&doc), vec![(5, 5)]);
    assert_eq!(reveal, Some(Reveal::at(0)));
  }

  #[test]
  fn test_duplicate_last_line_without_eol() {
    let mut doc = doc("foo\nbar", &[(5, 5)]);
    duplicate_lines(&mut doc).unwrap();
    assert_eq!(text(&doc), "foo\nbar\nbar");
    assert_eq!(ranges(&doc), vec![(9, 9)]);
  }

  #[test]
  fn test_duplicate_merges_adjacent_lines() {
    let mut doc = doc("a\nb\nc\n", &[(0, 0), (2, 2)]);
    duplicate_lines(&mut doc).unwrap();
    assert_eq!(text(&doc), "a\nb\na\nb\nc\n");
    assert_eq!(ranges(&doc), vec![(4, 4), (6, 6)]);
  }

  #[test]
  fn test_duplicate_selection() {
    let mut doc = doc("foo bar", &[(0, 3)]);
    duplicate_lines(&mut doc).unwrap();
    assert_eq!(text(&doc), "foofoo bar");
  }

  #[test]
  fn test_copy_selections_joined_by_newline() {
    let mut doc = doc("foo bar baz", &[(0, 3), (8, 11)]);
    let copied = smart_copy(&mut doc, false, false).unwrap();
    assert_eq!(copied.clip.as_deref(), Some("foo\nbaz"));
    assert_eq!(copied.highlights, vec![Range::new(0, 3), Range::new(8, 11)]);
    assert_eq!(ranges(&doc), vec![(0, 3), (8, 11)]);
  }

  #[test]
  fn test_copy_caret_lines_once() {
    let mut doc = doc("foo\nbar\nbaz\n", &[(0, 0), (2, 2), (9, 9)]);
    let copied = smart_copy(&mut doc, false, false).unwrap();
    assert_eq!(copied.clip.as_deref(), Some("foo\nbaz\n"));
    // Not contiguous, so the carets stay.
    assert_eq!(ranges(&doc), vec![(0, 0), (2, 2), (9, 9)]);
  }

  #[test]
  fn test_copy_contiguous_lines_collapse() {
    let mut doc = doc("foo\nbar\nbaz\n", &[(1, 1), (5, 5)]);
    let copied = smart_copy(&mut doc, false, false).unwrap();
    assert_eq!(copied.clip.as_deref(), Some("foo\nbar\n"));
    assert_eq!(ranges(&doc), vec![(5, 5)]);
  }

  #[test]
  fn test_copy_whole_line() {
    let mut doc = doc("foo\nbar\nbaz\n", &[(1, 6)]);
    let copied = smart_copy(&mut doc, true, false).unwrap();
    assert_eq!(copied.clip.as_deref(), Some("foo\nbar\n"));
    assert_eq!(ranges(&doc), vec![(6, 6)]);
  }

  #[test]
  fn test_cut() {
    let mut doc = doc("foo\nbar\nbaz\n", &[(5, 5)]);
    let copied = smart_copy(&mut doc, false, true).unwrap();
    assert_eq!(copied.clip.as_deref(), Some("bar\n"));
    assert!(copied.highlights.is_empty());
    assert_eq!(text(&doc), "foo\nbaz\n");
  }

  #[test]
  fn test_whitespace_is_not_copied() {
    let mut doc = doc("foo   bar", &[(3, 6)]);
    let copied = smart_copy(&mut doc, false, false).unwrap();
    assert_eq!(copied.clip, None);
  }

  #[test]
  fn test_paste_inline() {
    let mut doc = doc("foo bar", &[(4, 7)]);
    smart_paste(&mut doc, "baz", false).unwrap();
    assert_eq!(text(&doc), "foo baz");
    assert_eq!(ranges(&doc), vec![(7, 7)]);
  }

  #[test]
  fn test_paste_distributes_lines() {
    let mut doc = doc("a b", &[(1, 1), (3, 3)]);
    smart_paste(&mut doc, "1\n2", false).unwrap();
    assert_eq!(text(&doc), "a1 b2");
    assert_eq!(ranges(&doc), vec![(2, 2), (5, 5)]);
  }

  #[test]
  fn test_paste_whole_clipboard_per_caret() {
    let mut doc = doc("ab", &[(1, 1)]);
    smart_paste(&mut doc, "    x\n      y", false).unwrap();
    assert_eq!(text(&doc), "ax\n  yb");
  }

  #[test]
  fn test_paste_line_wise_above_and_reindented() {
    let mut doc = doc("fn main() {\n    call();\n}\n", &[(18, 18)]);
    smart_paste(&mut doc, "  let x = 1;\n", false).unwrap();
    assert_eq!(text(&doc), "fn main() {\n    let x = 1;\n    call();\n}\n");
    assert_eq!(ranges(&doc), vec![(18, 18)]);
  }

  #[test]
  fn test_paste_strip_whitespace_joins_with_spaces() {
    let mut doc = doc("[]", &[(1, 1)]);
    smart_paste(&mut doc, "a\nb\nc\n", true).unwrap();
    assert_eq!(text(&doc), "[a b c]");
  }

  #[test]
  fn test_readonly() {
    let mut doc = doc("foo", &[(0, 0)]);
    doc.set_readonly(true);
    assert_eq!(smart_paste(&mut doc, "x", false), Err(DocumentError::Readonly));
    assert_eq!(align_cursors(&mut doc), Err(DocumentError::Readonly));
    assert_eq!(smart_copy(&mut doc, false, true), Err(DocumentError::Readonly));
    assert!(smart_copy(&mut doc, false, false).unwrap().clip.is_some());
    assert_eq!(text(&doc), "foo");
  }
}
