//! Functions for working with the host environment.

use std::{
  ffi::OsStr,
  path::{
    Path,
    PathBuf,
  },
};

use eyre::{
  Result,
  WrapErr,
};
use parking_lot::RwLock;

// Filter commands resolve their directory from here, so it must not change
// behind their back when the process cwd is removed.
static CWD: RwLock<Option<PathBuf>> = RwLock::new(None);

/// The working directory, resolved once and cached. A `PWD` naming the same
/// directory through symlinks wins over the canonical path.
pub fn current_working_dir() -> Result<PathBuf> {
  if let Some(path) = CWD.read().as_ref() {
    return Ok(path.clone());
  }

  let canonical = std::env::current_dir().wrap_err("cannot read the working directory")?;
  let cwd = std::env::var_os("PWD")
    .map(PathBuf::from)
    .filter(|pwd| pwd.canonicalize().is_ok_and(|resolved| resolved == canonical))
    .unwrap_or(canonical);

  *CWD.write() = Some(cwd.clone());
  Ok(cwd)
}

/// Change the working directory. Returns the previously cached one.
pub fn set_current_working_dir(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
  let requested = path.as_ref();
  let resolved = requested
    .canonicalize()
    .wrap_err_with(|| format!("cannot resolve '{}'", requested.display()))?;
  std::env::set_current_dir(&resolved)
    .wrap_err_with(|| format!("cannot change directory to '{}'", resolved.display()))?;

  Ok(CWD.write().replace(resolved))
}

/// Whether `program` can be found on `PATH`.
pub fn binary_exists(program: impl AsRef<OsStr>) -> bool {
  which::which(program).is_ok()
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf> {
  etcetera::home_dir().wrap_err("failed to locate home directory")
}

/// Directory external commands run in for a document: the directory of its
/// file when it has one, the home directory otherwise.
pub fn command_dir(file: Option<&Path>) -> Result<PathBuf> {
  match file.and_then(Path::parent) {
    Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
    _ => home_dir().or_else(|_| current_working_dir()),
  }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let mut components = path.components();
  if let Some(std::path::Component::Normal(first)) = components.next()
    && first == "~"
    && let Ok(mut home) = home_dir()
  {
    home.push(components.as_path());
    return home;
  }
  path.to_path_buf()
}
