//! Headless command runner.
//!
//! Opens one file, applies a selection, runs commands on it and prints the
//! resulting text. Everything a host would draw is reported on stderr;
//! delayed work (clipboard flushes, highlight expiry, caret animation) runs
//! right after the command that scheduled it.

mod cli;
mod logging;

use std::{
  io::Write,
  time::Instant,
};

use anyhow::{
  Context,
  Result,
};
use fly_lib::{
  clipboard::MemoryClipboard,
  config::Config,
  document::DocumentId,
  session::Session,
  surface::{
    HeadlessSurface,
    SurfaceCall,
  },
};
use ropey::Rope;

use crate::cli::CliOptions;

fn main() -> Result<()> {
  let options = CliOptions::parse()?;

  fly_loader::initialize_log_file(options.log_file.clone());
  logging::setup_logging(options.verbosity, &fly_loader::log_file())?;

  if let Some(dir) = &options.working_dir {
    fly_stdx::env::set_current_working_dir(dir).map_err(|err| anyhow::anyhow!("{err:#}"))?;
  }

  fly_loader::initialize_config_file(options.config_file.clone());
  let config = load_config()?;

  let text = std::fs::read_to_string(&options.file)
    .with_context(|| format!("failed to read {}", options.file.display()))?;

  let mut session = Session::new(config, Box::new(MemoryClipboard::default()));
  let mut surface = HeadlessSurface::default();
  let id = session.open(&mut surface, Rope::from_str(&text));
  if let Some(doc) = session.document_mut(id) {
    doc.set_path(std::path::absolute(&options.file).unwrap_or_else(|_| options.file.clone()));
    doc.set_readonly(options.readonly);
    log::debug!("opened {} as {id:?}", doc.display_name());
    for fold in &options.folds {
      doc.fold(fold.from(), fold.to());
    }
    if let Some(selection) = options.selection.clone() {
      doc.set_selection(selection);
    }
  }
  drain(&mut session, &mut surface)?;

  for command in options.commands {
    let name = command.name();
    log::info!("running `{command}`");
    session
      .execute(id, &mut surface, command, Instant::now())
      .with_context(|| format!("`{name}` failed"))?;
    drain(&mut session, &mut surface)?;
  }

  finish(&session, id, options.in_place, options.print_selection)
}

fn load_config() -> Result<Config> {
  let value = fly_loader::config::user_config().map_err(|err| anyhow::anyhow!("{err:#}"))?;
  Config::from_value(value).context("invalid configuration")
}

/// Report what the session asked the surface to do, running deferred work
/// immediately, until nothing new comes in.
fn drain(session: &mut Session, surface: &mut HeadlessSurface) -> Result<()> {
  loop {
    let calls = surface.take_calls();
    if calls.is_empty() {
      return Ok(());
    }
    for call in calls {
      match call {
        SurfaceCall::Schedule(task, _) => session.run_deferred(surface, task)?,
        SurfaceCall::Status(message) => eprintln!("{message}"),
        SurfaceCall::Output(panel, text) => eprint!("[{panel}] {text}"),
        call => log::trace!("{call:?}"),
      }
    }
  }
}

fn finish(session: &Session, id: DocumentId, in_place: bool, print_selection: bool) -> Result<()> {
  let doc = session
    .document(id)
    .context("document was closed while running commands")?;

  if print_selection {
    let ranges: Vec<String> = doc
      .selection()
      .iter()
      .map(|range| format!("{}..{}", range.anchor, range.head))
      .collect();
    eprintln!("{}", ranges.join(","));
  }

  if in_place {
    let path = doc.path().context("document has no path")?;
    std::fs::write(path, doc.text().to_string())
      .with_context(|| format!("failed to write {}", path.display()))?;
    return Ok(());
  }

  let mut stdout = std::io::stdout().lock();
  for chunk in doc.text().chunks() {
    stdout.write_all(chunk.as_bytes())?;
  }
  stdout.flush()?;
  Ok(())
}
