use std::path::PathBuf;

use anyhow::{
  Context,
  Result,
};
use clap::{
  ArgAction,
  Parser,
};
use fly_lib::{
  command::Command,
  selection::{
    Range,
    Selection,
  },
};

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:       u8,
  pub log_file:        Option<PathBuf>,
  pub config_file:     Option<PathBuf>,
  pub working_dir:     Option<PathBuf>,
  pub file:            PathBuf,
  pub selection:       Option<Selection>,
  pub folds:           Vec<Range>,
  pub readonly:        bool,
  pub commands:        Vec<Command>,
  pub in_place:        bool,
  pub print_selection: bool,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(name = "fly", about, long_about = None, version)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,

  /// Set the working directory
  #[arg(short = 'w', long = "working-dir", value_name = "PATH", value_parser = parse_working_dir)]
  working_dir: Option<PathBuf>,

  /// Initial selection, as comma separated `anchor..head` ranges or carets
  #[arg(short = 's', long = "selection", value_name = "RANGES", value_parser = parse_selection)]
  selection: Option<Selection>,

  /// Fold a region before running commands (repeatable)
  #[arg(long = "fold", value_name = "FROM..TO", value_parser = parse_range)]
  folds: Vec<Range>,

  /// Open the file read-only
  #[arg(long)]
  readonly: bool,

  /// Command to run, e.g. `navigate-word forward extend` (repeatable)
  #[arg(short = 'e', long = "execute", value_name = "COMMAND")]
  execute: Vec<String>,

  /// File with one command per line; `#` starts a comment
  #[arg(long = "script", value_name = "FILE")]
  script: Option<PathBuf>,

  /// Write the result back to the file instead of printing it
  #[arg(short = 'i', long = "in-place")]
  in_place: bool,

  /// Print the final selection to stderr
  #[arg(long = "print-selection")]
  print_selection: bool,

  /// File to run the commands on
  #[arg(value_name = "FILE")]
  file: PathBuf,
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    let mut lines = raw.execute;
    if let Some(script) = &raw.script {
      let source = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
      lines.extend(script_lines(&source).map(String::from));
    }

    let commands = lines
      .iter()
      .map(|line| {
        line
          .parse::<Command>()
          .with_context(|| format!("invalid command `{line}`"))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
      working_dir: raw.working_dir,
      file: raw.file,
      selection: raw.selection,
      folds: raw.folds,
      readonly: raw.readonly,
      commands,
      in_place: raw.in_place,
      print_selection: raw.print_selection,
    })
  }
}

/// Non-blank lines of a script, without comments.
fn script_lines(source: &str) -> impl Iterator<Item = &str> {
  source
    .lines()
    .map(|line| line.split_once('#').map_or(line, |(code, _)| code).trim())
    .filter(|line| !line.is_empty())
}

fn parse_working_dir(value: &str) -> std::result::Result<PathBuf, String> {
  let path = fly_stdx::env::expand_tilde(std::path::Path::new(value));
  if path.is_dir() {
    Ok(path)
  } else {
    Err(format!(
      "working directory '{value}' does not exist or is not a directory"
    ))
  }
}

fn parse_range(value: &str) -> std::result::Result<Range, String> {
  let number = |text: &str| {
    text
      .trim()
      .parse::<usize>()
      .map_err(|_| format!("invalid position '{text}'"))
  };
  match value.split_once("..") {
    Some((anchor, head)) => Ok(Range::new(number(anchor)?, number(head)?)),
    None => Ok(Range::point(number(value)?)),
  }
}

fn parse_selection(value: &str) -> std::result::Result<Selection, String> {
  let ranges = value
    .split(',')
    .map(parse_range)
    .collect::<std::result::Result<Vec<_>, _>>()?;
  Ok(Selection::new(ranges))
}

#[cfg(test)]
mod tests {
  use fly_lib::movement::Direction;

  use super::*;

  fn options(args: &[&str]) -> Result<CliOptions> {
    let raw = RawCli::try_parse_from(std::iter::once("fly").chain(args.iter().copied()))?;
    raw.try_into()
  }

  #[test]
  fn test_parse_selection() {
    assert_eq!(
      parse_selection("0..3,9,12..10"),
      Ok(Selection::new([
        Range::new(0, 3),
        Range::point(9),
        Range::new(12, 10)
      ]))
    );
    assert!(parse_selection("1..x").is_err());
  }

  #[test]
  fn test_script_lines() {
    let lines: Vec<_> = script_lines("# header\nnavigate-word\n\n  sneak char=a # go\n").collect();
    assert_eq!(lines, vec!["navigate-word", "sneak char=a"]);
  }

  #[test]
  fn test_commands_from_arguments() {
    let options = options(&[
      "-e",
      "clear-selection backward",
      "-vv",
      "--fold",
      "4..8",
      "notes.txt",
    ])
    .unwrap();
    assert_eq!(options.verbosity, 2);
    assert_eq!(options.file, PathBuf::from("notes.txt"));
    assert_eq!(options.folds, vec![Range::new(4, 8)]);
    assert_eq!(
      options.commands,
      vec![Command::ClearSelection(Direction::Backward)]
    );
  }

  #[test]
  fn test_commands_from_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("moves.fly");
    std::fs::write(&script, "navigate-word\n# nothing\nrevert-selection\n").unwrap();
    let script = script.to_string_lossy().into_owned();
    let options = options(&["-e", "find-word-near", "--script", &script, "a.txt"]).unwrap();
    let names: Vec<_> = options.commands.iter().map(Command::name).collect();
    assert_eq!(names, vec!["find-word-near", "navigate-word", "revert-selection"]);
  }

  #[test]
  fn test_invalid_command() {
    let error = options(&["-e", "fly-away", "a.txt"]).unwrap_err();
    assert!(error.to_string().contains("fly-away"));
  }
}
