//! Per-document state that outlives a single command.

use std::collections::HashMap;

use crate::{
  animation::CursorAnimation,
  document::DocumentId,
  movement::Direction,
  paragraph::ParagraphState,
  selection::Range,
  sneak::SneakState,
};

#[derive(Debug, Default, Clone)]
pub struct DocumentState {
  pub sneak:          SneakState,
  pub paragraph:      ParagraphState,
  /// Ranges stored by `record-selections`.
  pub recorded:       Option<Vec<Range>>,
  /// Direction `select-lines` last grew in.
  pub line_direction: Option<Direction>,
  /// Whether the document had several cursors at the last selection change.
  pub multi_cursor:   Option<bool>,
  pub animation:      CursorAnimation,
}

#[derive(Debug, Default)]
pub struct Registry {
  states: HashMap<DocumentId, DocumentState>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn open(&mut self, doc: DocumentId) {
    self.states.entry(doc).or_default();
  }

  /// Drop the state of `doc`. Returns whether there was any.
  pub fn close(&mut self, doc: DocumentId) -> bool {
    self.states.remove(&doc).is_some()
  }

  pub fn get(&self, doc: DocumentId) -> Option<&DocumentState> {
    self.states.get(&doc)
  }

  /// State of `doc`, created on first use.
  pub fn state_mut(&mut self, doc: DocumentId) -> &mut DocumentState {
    self.states.entry(doc).or_default()
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_open_close() {
    let mut registry = Registry::new();
    let doc = DocumentId::MIN;
    registry.open(doc);
    registry.state_mut(doc).recorded = Some(vec![Range::new(0, 3)]);
    registry.open(doc);
    assert_eq!(registry.len(), 1);
    assert!(registry.get(doc).is_some_and(|state| state.recorded.is_some()));

    assert!(registry.close(doc));
    assert!(!registry.close(doc));
    assert!(registry.get(doc).is_none());
  }

  #[test]
  fn test_state_created_on_demand() {
    let mut registry = Registry::new();
    let doc = DocumentId::MIN.next();
    registry.state_mut(doc).line_direction = Some(Direction::Backward);
    assert_eq!(
      registry.get(doc).and_then(|state| state.line_direction),
      Some(Direction::Backward)
    );
  }
}
