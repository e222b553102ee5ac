//! Session configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use std::time::Duration;

use fly_core::chars::{
  DEFAULT_WORD_SEPARATORS,
  WordSeparators,
};
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  document::DocumentSettings,
  sneak::DISAMBIGUATION_GLYPHS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid value for `{field}`: {reason}")]
  Invalid {
    field:  &'static str,
    reason: &'static str,
  },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
  pub editor:    EditorConfig,
  pub sneak:     SneakConfig,
  pub copy:      CopyConfig,
  pub animation: AnimationConfig,
}

impl Config {
  pub fn from_toml(source: &str) -> Result<Self> {
    let config: Self = toml::from_str(source)?;
    config.validate()
  }

  pub fn from_value(value: toml::Value) -> Result<Self> {
    let config: Self = value.try_into()?;
    config.validate()
  }

  fn validate(self) -> Result<Self> {
    if self.sneak.glyphs.is_empty() {
      return Err(ConfigError::Invalid {
        field:  "sneak.glyphs",
        reason: "needs at least one glyph",
      });
    }
    Ok(self)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorConfig {
  pub word_separators:          String,
  pub tab_size:                 usize,
  pub translate_tabs_to_spaces: bool,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      word_separators:          DEFAULT_WORD_SEPARATORS.to_string(),
      tab_size:                 4,
      translate_tabs_to_spaces: true,
    }
  }
}

impl EditorConfig {
  /// Settings for a newly opened document.
  pub fn document_settings(&self) -> DocumentSettings {
    DocumentSettings {
      word_separators:          WordSeparators::new(self.word_separators.as_str()),
      tab_size:                 self.tab_size,
      translate_tabs_to_spaces: self.translate_tabs_to_spaces,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SneakConfig {
  /// Characters to type before the first search runs.
  pub min_chars:      usize,
  pub glyphs:         Vec<String>,
  /// Escape regex metacharacters in the search string.
  pub escape_regex:   bool,
  pub animate_cursor: bool,
}

impl Default for SneakConfig {
  fn default() -> Self {
    Self {
      min_chars:      1,
      glyphs:         DISAMBIGUATION_GLYPHS.iter().map(|g| g.to_string()).collect(),
      escape_regex:   true,
      animate_cursor: true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CopyConfig {
  pub debounce_ms:  u64,
  pub highlight_ms: u64,
}

impl Default for CopyConfig {
  fn default() -> Self {
    Self {
      debounce_ms:  50,
      highlight_ms: 250,
    }
  }
}

impl CopyConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }

  pub fn highlight(&self) -> Duration {
    Duration::from_millis(self.highlight_ms)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AnimationConfig {
  pub sneak_ms:        u64,
  pub multi_cursor_ms: u64,
}

impl Default for AnimationConfig {
  fn default() -> Self {
    Self {
      sneak_ms:        200,
      multi_cursor_ms: 80,
    }
  }
}

impl AnimationConfig {
  pub fn sneak(&self) -> Duration {
    Duration::from_millis(self.sneak_ms)
  }

  pub fn multi_cursor(&self) -> Duration {
    Duration::from_millis(self.multi_cursor_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_is_default() {
    assert_eq!(Config::from_toml("").unwrap(), Config::default());
  }

  #[test]
  fn defaults() {
    let config = Config::default();
    assert_eq!(config.sneak.min_chars, 1);
    assert_eq!(config.sneak.glyphs.len(), 10);
    assert_eq!(config.copy.debounce(), Duration::from_millis(50));
    assert_eq!(config.animation.sneak(), Duration::from_millis(200));
  }

  #[test]
  fn partial_sections_keep_other_defaults() {
    let config = Config::from_toml(
      r#"
      [editor]
      tab-size = 2

      [sneak]
      min-chars = 2
      "#,
    )
    .unwrap();
    assert_eq!(config.editor.tab_size, 2);
    assert!(config.editor.translate_tabs_to_spaces);
    assert_eq!(config.sneak.min_chars, 2);
    assert!(config.sneak.escape_regex);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(matches!(
      Config::from_toml("[sneak]\nmin-char = 2"),
      Err(ConfigError::Parse(_))
    ));
  }

  #[test]
  fn empty_glyphs_are_rejected() {
    let value: toml::Value = toml::from_str("[sneak]\nglyphs = []").unwrap();
    assert!(matches!(
      Config::from_value(value),
      Err(ConfigError::Invalid {
        field: "sneak.glyphs",
        ..
      })
    ));
  }

  #[test]
  fn document_settings_follow_editor_section() {
    let config = Config::from_toml("[editor]\nword-separators = \".\"").unwrap();
    let settings = config.editor.document_settings();
    assert!(settings.word_separators.contains('.'));
    assert!(settings.word_separators.is_word_char('-'));
  }
}
