//! Clipboard interface and copy coalescing.
//!
//! The lib only defines the provider interface; hosts supply the system
//! clipboard. Copies are debounced through [`CopyCoalescer`] so a burst of
//! copies writes the clipboard once, with the last clip.

use std::{
  borrow::Cow,
  time::Duration,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("clipboard provider does not support reading")]
  ReadingNotSupported,
  #[error("clipboard error: {0}")]
  Platform(String),
}

pub type Result<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardProvider: Send + Sync {
  fn name(&self) -> Cow<'_, str>;
  fn get_contents(&self) -> Result<String>;
  fn set_contents(&mut self, content: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardProvider for NoClipboard {
  fn name(&self) -> Cow<'_, str> {
    "none".into()
  }

  fn get_contents(&self) -> Result<String> {
    Err(ClipboardError::ReadingNotSupported)
  }

  fn set_contents(&mut self, _content: &str) -> Result<()> {
    Ok(())
  }
}

/// Clipboard kept in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
  contents: String,
}

impl ClipboardProvider for MemoryClipboard {
  fn name(&self) -> Cow<'_, str> {
    "memory".into()
  }

  fn get_contents(&self) -> Result<String> {
    Ok(self.contents.clone())
  }

  fn set_contents(&mut self, content: &str) -> Result<()> {
    content.clone_into(&mut self.contents);
    Ok(())
  }
}

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Debounces clipboard writes.
///
/// Every [`copy`](Self::copy) returns the delay after which the host calls
/// [`flush`](Self::flush). Only the flush matching the latest copy writes.
#[derive(Debug, Clone)]
pub struct CopyCoalescer {
  debounce: Duration,
  pending:  usize,
  clip:     Option<String>,
}

impl Default for CopyCoalescer {
  fn default() -> Self {
    Self::new(DEFAULT_DEBOUNCE)
  }
}

impl CopyCoalescer {
  pub fn new(debounce: Duration) -> Self {
    Self {
      debounce,
      pending: 0,
      clip: None,
    }
  }

  pub fn pending(&self) -> usize {
    self.pending
  }

  /// The clip the next writing flush will write.
  pub fn pending_clip(&self) -> Option<&str> {
    self.clip.as_deref()
  }

  /// Queue `clip`, replacing any clip not yet written.
  pub fn copy(&mut self, clip: String) -> Duration {
    self.pending += 1;
    self.clip = Some(clip);
    self.debounce
  }

  /// Called once per [`copy`](Self::copy) after its delay. Writes the clip
  /// when no later copy is pending and returns the status message.
  pub fn flush(&mut self, provider: &mut dyn ClipboardProvider) -> Result<Option<String>> {
    if self.pending == 0 {
      return Ok(None);
    }
    self.pending -= 1;
    if self.pending > 0 {
      return Ok(None);
    }

    let Some(clip) = self.clip.take() else {
      return Ok(None);
    };
    provider.set_contents(&clip)?;
    tracing::debug!(provider = %provider.name(), chars = clip.chars().count(), "clipboard written");
    Ok(Some(format!("Copied {} characters", clip.chars().count())))
  }
}
