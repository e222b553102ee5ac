//! Commands and their textual form.
//!
//! A command is written as its name followed by flags and `key=value`
//! arguments, separated by whitespace:
//!
//! ```text
//! navigate-word backward extend
//! sneak char=a keep=1
//! find-under-expand all
//! filter whole-buffer sort | uniq
//! ```
//!
//! `filter` takes its own flags first; the first token that is not one of
//! them starts the pipeline, which runs to the end of the line.

use std::{
  fmt,
  str::FromStr,
};

use thiserror::Error;

use crate::{
  clipboard::ClipboardError,
  document::{
    DocumentError,
    DocumentId,
  },
  filter::{
    FilterError,
    FilterRequest,
  },
  find_under::FindUnder,
  movement::Direction,
  paragraph::ParagraphMotion,
  scanner::ScanError,
  select::SelectLines,
  selection::SelectionError,
  sneak::SneakInput,
  word::WordMotion,
};

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("unknown command `{0}`")]
  Unknown(String),
  #[error("empty command")]
  Empty,
  #[error("`{command}`: unexpected argument `{argument}`")]
  UnexpectedArgument { command: String, argument: String },
  #[error("`{command}`: invalid value `{value}` for `{key}`")]
  InvalidValue {
    command: String,
    key:     String,
    value:   String,
  },
  #[error("no open document {0:?}")]
  NoDocument(DocumentId),
  #[error(transparent)]
  Scan(#[from] ScanError),
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error(transparent)]
  Selection(#[from] SelectionError),
  #[error(transparent)]
  Filter(#[from] FilterError),
  #[error(transparent)]
  Clipboard(#[from] ClipboardError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  NavigateWord(WordMotion),
  NavigateParagraph(ParagraphMotion),
  Sneak(SneakInput),
  /// Jump to a preview of the last sneak search.
  SneakNth(usize),
  FindUnderExpand(FindUnder),
  FindWordNear,
  ClearSelection(Direction),
  SubtractSelection { last: bool },
  RevertSelection,
  SingleSelection(isize),
  RecordSelections,
  RetrieveSelections,
  CursorsFromSelection { after: bool },
  SelectLines(SelectLines),
  AlignCursors,
  DuplicateLines,
  Copy { whole_line: bool },
  Cut { whole_line: bool },
  Paste { strip_whitespace: bool },
  Filter(FilterRequest),
  /// Run the filter at this position of the history again.
  RecentFilter(usize),
  ClearFilterHistory,
}

impl Command {
  pub fn name(&self) -> &'static str {
    match self {
      Self::NavigateWord(_) => "navigate-word",
      Self::NavigateParagraph(_) => "navigate-paragraph",
      Self::Sneak(_) => "sneak",
      Self::SneakNth(_) => "sneak-nth",
      Self::FindUnderExpand(_) => "find-under-expand",
      Self::FindWordNear => "find-word-near",
      Self::ClearSelection(_) => "clear-selection",
      Self::SubtractSelection { .. } => "subtract-selection",
      Self::RevertSelection => "revert-selection",
      Self::SingleSelection(_) => "single-selection",
      Self::RecordSelections => "record-selections",
      Self::RetrieveSelections => "retrieve-selections",
      Self::CursorsFromSelection { .. } => "cursors-from-selection",
      Self::SelectLines(_) => "select-lines",
      Self::AlignCursors => "align-cursors",
      Self::DuplicateLines => "duplicate-lines",
      Self::Copy { .. } => "copy",
      Self::Cut { .. } => "cut",
      Self::Paste { .. } => "paste",
      Self::Filter(_) => "filter",
      Self::RecentFilter(_) => "recent-filter",
      Self::ClearFilterHistory => "clear-filter-history",
    }
  }

  /// Whether the command edits the text.
  pub fn is_edit(&self) -> bool {
    matches!(
      self,
      Self::AlignCursors
        | Self::DuplicateLines
        | Self::Cut { .. }
        | Self::Paste { .. }
        | Self::Filter(_)
        | Self::RecentFilter(_)
    )
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Command {
  type Err = CommandError;

  fn from_str(line: &str) -> Result<Self> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().ok_or(CommandError::Empty)?;

    if name == "filter" {
      return parse_filter(tokens.collect());
    }

    let mut args = Args::new(name, tokens);
    let command = match name {
      "navigate-word" => {
        Self::NavigateWord(
          WordMotion::new(args.direction()?)
            .whole_words(args.flag("whole-words"))
            .extend(args.flag("extend")),
        )
      },
      "navigate-paragraph" => {
        Self::NavigateParagraph(
          ParagraphMotion::new(args.direction()?)
            .extend(args.flag("extend"))
            .force_paragraph(args.flag("force-paragraph")),
        )
      },
      "sneak" => {
        let character = match args.value("char") {
          Some("space") => Some(' '),
          Some(value) => Some(args.single_char("char", value)?),
          None => None,
        };
        let mut input = SneakInput::new(character, args.parse("keep")?.unwrap_or(0))
          .raw(args.flag("raw"));
        if let Some(direction) = args.optional_direction()? {
          input = input.direction(direction);
        }
        if let Some(extend) = args.parse("extend")? {
          input = input.extend(extend);
        }
        Self::Sneak(input)
      },
      "sneak-nth" => Self::SneakNth(args.parse("n")?.unwrap_or(0)),
      "find-under-expand" => {
        Self::FindUnderExpand(
          FindUnder::new(args.direction()?)
            .skip(args.flag("skip"))
            .find_all(args.flag("all")),
        )
      },
      "find-word-near" => Self::FindWordNear,
      "clear-selection" => Self::ClearSelection(args.direction()?),
      "subtract-selection" => {
        Self::SubtractSelection {
          last: args.flag("last"),
        }
      },
      "revert-selection" => Self::RevertSelection,
      "single-selection" => Self::SingleSelection(args.parse("index")?.unwrap_or(0)),
      "record-selections" => Self::RecordSelections,
      "retrieve-selections" => Self::RetrieveSelections,
      "cursors-from-selection" => {
        Self::CursorsFromSelection {
          after: args.flag("after"),
        }
      },
      "select-lines" => {
        Self::SelectLines(
          SelectLines::new(args.direction()?)
            .force_expand(args.flag("force-expand"))
            .follow_column(args.flag("follow-column")),
        )
      },
      "align-cursors" => Self::AlignCursors,
      "duplicate-lines" => Self::DuplicateLines,
      "copy" => {
        Self::Copy {
          whole_line: args.flag("whole-line"),
        }
      },
      "cut" => {
        Self::Cut {
          whole_line: args.flag("whole-line"),
        }
      },
      "paste" => {
        Self::Paste {
          strip_whitespace: args.flag("strip-whitespace"),
        }
      },
      "recent-filter" => Self::RecentFilter(args.parse("index")?.unwrap_or(0)),
      "clear-filter-history" => Self::ClearFilterHistory,
      _ => return Err(CommandError::Unknown(name.to_string())),
    };

    args.finish()?;
    Ok(command)
  }
}

// Helpers.
//

fn parse_filter(tokens: Vec<&str>) -> Result<Command> {
  let mut request = FilterRequest::default();
  let mut rest = tokens.as_slice();
  while let Some((&token, tail)) = rest.split_first() {
    if token == "whole-buffer" {
      request.whole_buffer = true;
    } else if let Some(regex) = token.strip_prefix("error-regex=") {
      request.error_regex = Some(regex.to_string());
    } else {
      break;
    }
    rest = tail;
  }

  if rest.is_empty() {
    return Err(CommandError::Empty);
  }
  request.pipeline = rest.join(" ");
  Ok(Command::Filter(request))
}

/// Arguments of one command, consumed as they are read.
struct Args<'a> {
  command: &'a str,
  flags:   Vec<&'a str>,
  values:  Vec<(&'a str, &'a str)>,
}

impl<'a> Args<'a> {
  fn new(command: &'a str, tokens: impl Iterator<Item = &'a str>) -> Self {
    let mut flags = Vec::new();
    let mut values = Vec::new();
    for token in tokens {
      match token.split_once('=') {
        Some((key, value)) => values.push((key, value)),
        None => flags.push(token),
      }
    }
    Self {
      command,
      flags,
      values,
    }
  }

  fn flag(&mut self, name: &str) -> bool {
    let before = self.flags.len();
    self.flags.retain(|&flag| flag != name);
    self.flags.len() != before
  }

  fn value(&mut self, key: &str) -> Option<&'a str> {
    let index = self.values.iter().position(|&(k, _)| k == key)?;
    Some(self.values.remove(index).1)
  }

  fn parse<T: FromStr>(&mut self, key: &str) -> Result<Option<T>> {
    let Some(value) = self.value(key) else {
      return Ok(None);
    };
    value
      .parse()
      .map(Some)
      .map_err(|_| self.invalid(key, value))
  }

  fn single_char(&self, key: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
      (Some(ch), None) => Ok(ch),
      _ => Err(self.invalid(key, value)),
    }
  }

  fn optional_direction(&mut self) -> Result<Option<Direction>> {
    match (self.flag("forward"), self.flag("backward")) {
      (true, true) => Err(self.invalid("direction", "forward backward")),
      (true, false) => Ok(Some(Direction::Forward)),
      (false, true) => Ok(Some(Direction::Backward)),
      (false, false) => Ok(None),
    }
  }

  fn direction(&mut self) -> Result<Direction> {
    Ok(self.optional_direction()?.unwrap_or(Direction::Forward))
  }

  fn invalid(&self, key: &str, value: &str) -> CommandError {
    CommandError::InvalidValue {
      command: self.command.to_string(),
      key:     key.to_string(),
      value:   value.to_string(),
    }
  }

  fn finish(self) -> Result<()> {
    let leftover = self
      .flags
      .first()
      .map(|flag| flag.to_string())
      .or_else(|| self.values.first().map(|(k, v)| format!("{k}={v}")));
    match leftover {
      Some(argument) => {
        Err(CommandError::UnexpectedArgument {
          command: self.command.to_string(),
          argument,
        })
      },
      None => Ok(()),
    }
  }
}
