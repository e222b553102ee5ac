//! Where `fly` keeps its files, and how layered configuration is combined.
//!
//! The user configuration lives in `<config dir>/fly/config.toml` and the log
//! in `<cache dir>/fly/fly.log`. A workspace may add `.fly/config.toml`,
//! which is merged over the user file.

pub mod config;

use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use fly_stdx::env::{
  current_working_dir,
  expand_tilde,
  home_dir,
};
use toml::Value;

const APP_DIR: &str = "fly";
const WORKSPACE_DIR: &str = ".fly";
const WORKSPACE_MARKERS: [&str; 4] = [".git", ".svn", ".jj", WORKSPACE_DIR];

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();
static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Pin the config file, `None` meaning the default location. Only the first
/// call has an effect.
pub fn initialize_config_file(path: Option<PathBuf>) {
  pin(&CONFIG_FILE, path.unwrap_or_else(default_config_file));
}

/// Pin the log file, `None` meaning [`default_log_file`]. Only the first call
/// has an effect.
pub fn initialize_log_file(path: Option<PathBuf>) {
  pin(&LOG_FILE, path.unwrap_or_else(default_log_file));
}

pub fn config_file() -> PathBuf {
  pinned(&CONFIG_FILE, default_config_file)
}

pub fn log_file() -> PathBuf {
  pinned(&LOG_FILE, default_log_file)
}

/// `FLY_CONFIG_DIR`, else the platform config directory.
pub fn config_dir() -> PathBuf {
  app_dir(BaseDir::Config)
}

/// `FLY_CACHE_DIR`, else the platform cache directory.
pub fn cache_dir() -> PathBuf {
  app_dir(BaseDir::Cache)
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(WORKSPACE_DIR).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("fly.log")
}

/// Layer `right` over `left`, descending at most `merge_depth` levels.
///
/// Below that depth, or where the two sides differ in kind, `right` wins.
/// Tables are merged key by key. Arrays of tables are paired up by their
/// `name` key: a named entry present on both sides is merged, the rest are
/// appended. Any other array from `right` replaces the one in `left`, so a
/// workspace that sets
///
/// ```toml
/// [sneak]
/// glyphs = ["a", "b"]
/// ```
///
/// over a user file with `glyphs = ["1", "2", "3"]` and `min-chars = 2` ends
/// up with exactly two glyphs and keeps `min-chars = 2`.
pub fn merge_toml_values(left: Value, right: Value, merge_depth: usize) -> Value {
  if merge_depth == 0 {
    return right;
  }

  match (left, right) {
    (Value::Table(mut merged), Value::Table(overrides)) => {
      for (key, value) in overrides {
        let value = match merged.remove(&key) {
          Some(base) => merge_toml_values(base, value, merge_depth - 1),
          None => value,
        };
        merged.insert(key, value);
      }
      Value::Table(merged)
    },
    (Value::Array(mut merged), Value::Array(overrides))
      if overrides.first().is_some_and(Value::is_table) =>
    {
      for value in overrides {
        let base = entry_name(&value)
          .and_then(|name| merged.iter().position(|v| entry_name(v) == Some(name)))
          .map(|index| merged.remove(index));
        merged.push(match base {
          Some(base) => merge_toml_values(base, value, merge_depth - 1),
          None => value,
        });
      }
      Value::Array(merged)
    },
    (_, right) => right,
  }
}

/// The nearest ancestor of the working directory holding `.git`, `.svn`,
/// `.jj` or `.fly`. The flag is `true` when none does and the working
/// directory itself is returned.
pub fn find_workspace() -> (PathBuf, bool) {
  match current_working_dir() {
    Ok(cwd) => find_workspace_in(cwd),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  dir
    .ancestors()
    .find(|ancestor| WORKSPACE_MARKERS.iter().any(|marker| ancestor.join(marker).exists()))
    .map_or_else(|| (dir.to_path_buf(), true), |root| (root.to_path_buf(), false))
}

// Helpers.
//

fn entry_name(value: &Value) -> Option<&str> {
  value.get("name").and_then(Value::as_str)
}

fn pin(cell: &OnceLock<PathBuf>, path: PathBuf) {
  ensure_parent_dir(&path);
  if cell.set(path).is_err() {
    tracing::debug!("file location already set");
  }
}

fn pinned(cell: &OnceLock<PathBuf>, default: fn() -> PathBuf) -> PathBuf {
  cell
    .get_or_init(|| {
      let path = default();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

#[derive(Clone, Copy)]
enum BaseDir {
  Config,
  Cache,
}

fn app_dir(kind: BaseDir) -> PathBuf {
  let (override_var, home_fallback) = match kind {
    BaseDir::Config => ("FLY_CONFIG_DIR", ".config"),
    BaseDir::Cache => ("FLY_CACHE_DIR", ".cache"),
  };
  if let Some(dir) = std::env::var_os(override_var) {
    return expand_tilde(Path::new(&dir));
  }
  let base = match (choose_base_strategy(), kind) {
    (Ok(strategy), BaseDir::Config) => strategy.config_dir(),
    (Ok(strategy), BaseDir::Cache) => strategy.cache_dir(),
    (Err(_), _) => fallback_dir(home_fallback),
  };
  base.join(APP_DIR)
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

fn fallback_dir(name: &str) -> PathBuf {
  match home_dir() {
    Ok(home) => home.join(name),
    Err(error) => {
      tracing::warn!(%error, "no home directory, using the working directory");
      PathBuf::from(name)
    },
  }
}

fn ensure_parent_dir(path: &Path) {
  let Some(parent) = path.parent() else {
    return;
  };
  if !parent.as_os_str().is_empty()
    && !parent.exists()
    && let Err(error) = std::fs::create_dir_all(parent)
  {
    tracing::warn!(%error, dir = %parent.display(), "cannot create directory");
  }
}


#[cfg(test)]
mod workspace_tests {
  use super::*;

  #[test]
  fn marker_directory_is_found_from_below() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join(WORKSPACE_DIR)).unwrap();
    let nested = root.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let (workspace, fallback) = find_workspace_in(&nested);
    assert_eq!(workspace, root.path());
    assert!(!fallback);
  }

  #[test]
  fn ensure_parent_dir_creates_directories() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("logs").join("fly.log");
    ensure_parent_dir(&file);
    assert!(root.path().join("logs").is_dir());
  }
}
