//! The host side of a session.
//!
//! Commands never draw anything themselves. Everything visible (status
//! messages, highlights, the sneak prompt, caret width) and every delayed
//! callback goes through a [`Surface`] implemented by the host.
//! [`HeadlessSurface`] records the calls instead, for the CLI and tests.

use std::time::Duration;

use crate::{
  document::DocumentId,
  movement::Reveal,
  selection::Range,
  sneak::SneakPrompt,
};

/// Named groups of highlighted regions. Highlighting a key again replaces
/// its regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKey {
  /// Further matches of the last sneak search.
  Sneak,
  /// Disambiguation glyphs over the matches of a single cursor.
  SneakPreviews,
  /// Regions a copy took.
  Copy,
}

impl HighlightKey {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Sneak => "Sneak",
      Self::SneakPreviews => "Sneaks",
      Self::Copy => "Copy",
    }
  }
}

/// Work the host must hand back to the session after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
  /// Call [`Session::flush_clipboard`](crate::session::Session::flush_clipboard).
  FlushClipboard,
  /// Clear a highlight group of a document.
  ClearHighlight(DocumentId, HighlightKey),
  /// Call [`Session::animation_tick`](crate::session::Session::animation_tick).
  AnimationFrame(DocumentId),
}

/// A labelled region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
  pub range: Range,
  pub label: String,
}

impl Annotation {
  pub fn new(range: Range, label: impl Into<String>) -> Self {
    Self {
      range,
      label: label.into(),
    }
  }
}

pub trait Surface {
  fn status(&mut self, message: &str);
  fn reveal(&mut self, doc: DocumentId, reveal: Reveal);
  /// Whether `pos` of `doc` is inside the viewport.
  fn is_visible(&self, doc: DocumentId, pos: usize) -> bool;
  fn highlight(&mut self, doc: DocumentId, key: HighlightKey, annotations: &[Annotation]);
  fn clear_highlight(&mut self, doc: DocumentId, key: HighlightKey);
  /// Show the sneak prompt next to `anchor`. `None` hides it.
  fn prompt(&mut self, doc: DocumentId, prompt: Option<(usize, &SneakPrompt)>);
  fn set_caret_width(&mut self, doc: DocumentId, width: u8);
  fn append_output(&mut self, panel: &str, text: &str);
  fn schedule(&mut self, task: Deferred, after: Duration);
}

/// Everything a [`HeadlessSurface`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
  Status(String),
  Reveal(DocumentId, Reveal),
  Highlight(DocumentId, HighlightKey, Vec<Annotation>),
  ClearHighlight(DocumentId, HighlightKey),
  Prompt(DocumentId, Option<(usize, SneakPrompt)>),
  CaretWidth(DocumentId, u8),
  Output(String, String),
  Schedule(Deferred, Duration),
}

/// A surface without a screen: every position counts as visible and calls
/// are recorded in order.
#[derive(Debug, Default, Clone)]
pub struct HeadlessSurface {
  calls: Vec<SurfaceCall>,
}

impl HeadlessSurface {
  pub fn calls(&self) -> &[SurfaceCall] {
    &self.calls
  }

  pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
    std::mem::take(&mut self.calls)
  }

  pub fn statuses(&self) -> impl Iterator<Item = &str> {
    self.calls.iter().filter_map(|call| {
      match call {
        SurfaceCall::Status(message) => Some(message.as_str()),
        _ => None,
      }
    })
  }

  pub fn scheduled(&self) -> impl Iterator<Item = (Deferred, Duration)> + '_ {
    self.calls.iter().filter_map(|call| {
      match call {
        SurfaceCall::Schedule(task, after) => Some((*task, *after)),
        _ => None,
      }
    })
  }
}

impl Surface for HeadlessSurface {
  fn status(&mut self, message: &str) {
    self.calls.push(SurfaceCall::Status(message.to_string()));
  }

  fn reveal(&mut self, doc: DocumentId, reveal: Reveal) {
    self.calls.push(SurfaceCall::Reveal(doc, reveal));
  }

  fn is_visible(&self, _doc: DocumentId, _pos: usize) -> bool {
    true
  }

  fn highlight(&mut self, doc: DocumentId, key: HighlightKey, annotations: &[Annotation]) {
    self
      .calls
      .push(SurfaceCall::Highlight(doc, key, annotations.to_vec()));
  }

  fn clear_highlight(&mut self, doc: DocumentId, key: HighlightKey) {
    self.calls.push(SurfaceCall::ClearHighlight(doc, key));
  }

  fn prompt(&mut self, doc: DocumentId, prompt: Option<(usize, &SneakPrompt)>) {
    let prompt = prompt.map(|(anchor, prompt)| (anchor, prompt.clone()));
    self.calls.push(SurfaceCall::Prompt(doc, prompt));
  }

  fn set_caret_width(&mut self, doc: DocumentId, width: u8) {
    self.calls.push(SurfaceCall::CaretWidth(doc, width));
  }

  fn append_output(&mut self, panel: &str, text: &str) {
    self
      .calls
      .push(SurfaceCall::Output(panel.to_string(), text.to_string()));
  }

  fn schedule(&mut self, task: Deferred, after: Duration) {
    self.calls.push(SurfaceCall::Schedule(task, after));
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_headless_records_calls() {
    let mut surface = HeadlessSurface::default();
    surface.status("hello");
    surface.schedule(Deferred::FlushClipboard, Duration::from_millis(50));
    assert_eq!(surface.statuses().collect::<Vec<_>>(), vec!["hello"]);
    assert_eq!(
      surface.scheduled().collect::<Vec<_>>(),
      vec![(Deferred::FlushClipboard, Duration::from_millis(50))]
    );
    assert_eq!(surface.take_calls().len(), 2);
    assert!(surface.calls().is_empty());
  }

  #[test]
  fn test_highlight_key_names() {
    assert_eq!(HighlightKey::Sneak.as_str(), "Sneak");
    assert_eq!(HighlightKey::SneakPreviews.as_str(), "Sneaks");
  }
}
