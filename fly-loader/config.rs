use std::path::{
  Path,
  PathBuf,
};

use eyre::{
  Context,
  Result,
};

/// Config files in the order they apply: the user's, then the workspace's.
pub fn config_files() -> Vec<PathBuf> {
  vec![crate::config_file(), crate::workspace_config_file()]
}

/// User configuration: every file of [`config_files`] that exists, each one
/// merged onto the ones before it.
pub fn user_config() -> Result<toml::Value> {
  merged_config(&config_files())
}

/// Merge the TOML files among `files` that exist. Missing files count as
/// empty; a file that does not parse is an error.
pub fn merged_config(files: &[PathBuf]) -> Result<toml::Value> {
  let mut merged = toml::Value::Table(toml::Table::new());
  for file in files {
    let Some(value) = read_toml(file)? else {
      continue;
    };
    tracing::debug!(file = %file.display(), "loaded config");
    merged = crate::merge_toml_values(merged, value, 3);
  }
  Ok(merged)
}

fn read_toml(file: &Path) -> Result<Option<toml::Value>> {
  let source = match std::fs::read_to_string(file) {
    Ok(source) => source,
    Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
    Err(error) => {
      return Err(error).wrap_err_with(|| format!("failed to read {}", file.display()));
    },
  };
  toml::from_str(&source)
    .map(Some)
    .wrap_err_with(|| format!("failed to parse {}", file.display()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn later_files_win() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("global.toml");
    let workspace = dir.path().join("workspace.toml");
    std::fs::write(&global, "[sneak]\nmin-chars = 2\nanimate-cursor = false\n").unwrap();
    std::fs::write(&workspace, "[sneak]\nmin-chars = 3\n").unwrap();

    let merged = merged_config(&[global, dir.path().join("missing.toml"), workspace]).unwrap();
    let sneak = merged.get("sneak").unwrap();
    assert_eq!(sneak.get("min-chars").unwrap().as_integer(), Some(3));
    assert_eq!(sneak.get("animate-cursor").unwrap().as_bool(), Some(false));
  }

  #[test]
  fn no_files_is_an_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let merged = merged_config(&[dir.path().join("none.toml")]).unwrap();
    assert_eq!(merged, toml::Value::Table(toml::Table::new()));
  }

  #[test]
  fn parse_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.toml");
    std::fs::write(&file, "[sneak\n").unwrap();
    let error = merged_config(&[file]).unwrap_err();
    assert!(error.to_string().contains("broken.toml"));
  }
}
