//! Run selections through external commands.
//!
//! A pipeline is written the way a shell would take it, `cmd args | cmd
//! args`, but without quoting: arguments are split on spaces. Each selection
//! (or the whole buffer) is fed to the first command and every command's
//! output to the next. A non-empty final output replaces the text.

use std::{
  collections::HashMap,
  io::Write,
  path::{
    Path,
    PathBuf,
  },
  process::{
    Command,
    Stdio,
  },
  time::Instant,
};

use fly_stdx::{
  env,
  pattern::{
    Pattern,
    PatternError,
  },
};
use thiserror::Error;

use crate::{
  document::{
    Document,
    DocumentError,
    TextSource,
  },
  selection::{
    Range,
    Selection,
  },
};

/// Output panel that receives the commands' stderr.
pub const FILTER_PANEL: &str = "filter";

#[derive(Debug, Error)]
pub enum FilterError {
  #[error("empty command")]
  Empty,
  #[error("\"{0}\" does not exist")]
  MissingProgram(String),
  #[error("failed to run \"{program}\": {source}")]
  Spawn {
    program: String,
    #[source]
    source:  std::io::Error,
  },
  #[error(transparent)]
  Pattern(#[from] PatternError),
  #[error(transparent)]
  Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterRequest {
  pub pipeline:     String,
  pub whole_buffer: bool,
  /// Regex with two groups, row and column, locating errors in stderr.
  pub error_regex:  Option<String>,
}

impl FilterRequest {
  pub fn new(pipeline: impl Into<String>) -> Self {
    Self {
      pipeline: pipeline.into(),
      ..Self::default()
    }
  }

  #[must_use]
  pub fn whole_buffer(mut self, whole_buffer: bool) -> Self {
    self.whole_buffer = whole_buffer;
    self
  }

  #[must_use]
  pub fn error_regex(mut self, error_regex: impl Into<String>) -> Self {
    self.error_regex = Some(error_regex.into());
    self
  }
}

/// A parsed pipeline whose programs all exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
  commands: Vec<Vec<String>>,
}

impl Pipeline {
  pub fn parse(pipeline: &str) -> Result<Self> {
    let mut commands = Vec::new();
    for part in pipeline.split('|') {
      let tokens: Vec<String> = part
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect();
      let Some(program) = tokens.first() else {
        return Err(FilterError::Empty);
      };
      if !env::binary_exists(program) {
        return Err(FilterError::MissingProgram(program.clone()));
      }
      commands.push(tokens);
    }
    Ok(Self { commands })
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  /// Feed `input` through every command. Returns the last stdout and the
  /// stderr of every command, concatenated.
  pub fn run(&self, input: &str, cwd: &Path) -> Result<(String, String)> {
    let mut data = input.to_string();
    let mut stderr = String::new();
    for tokens in &self.commands {
      let (stdout, err) = run_command(tokens, &data, cwd)?;
      stderr.push_str(&err);
      data = stdout;
    }
    Ok((data, stderr))
  }
}

/// What a filter run did besides replacing text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterReport {
  pub replaced: usize,
  pub stderr:   String,
  /// Positions reported by the error regex, in document order.
  pub errors:   Vec<usize>,
}

/// Run `request` over `doc`. Carets move to the reported errors, if any.
pub fn apply_filter(
  doc: &mut Document,
  request: &FilterRequest,
  cwd: &Path,
) -> Result<FilterReport> {
  if doc.is_readonly() {
    return Err(DocumentError::Readonly.into());
  }
  let pipeline = Pipeline::parse(&request.pipeline)?;
  let error_regex = request
    .error_regex
    .as_deref()
    .map(Pattern::new)
    .transpose()?;

  let regions: Vec<Range> = if request.whole_buffer {
    vec![Range::new(0, doc.len_chars())]
  } else {
    doc.selection().iter().copied().collect()
  };

  let mut report = FilterReport::default();
  for region in regions.into_iter().rev() {
    let input = doc.substr(region.from(), region.to()).into_owned();
    let (stdout, stderr) = pipeline.run(&input, cwd)?;

    if !stderr.is_empty() {
      tracing::warn!(
        pipeline = request.pipeline.as_str(),
        stderr = stderr.as_str(),
        "filter wrote to stderr"
      );
      if let Some(pattern) = &error_regex
        && let Some(pos) = error_position(doc, pattern, &stderr)?
      {
        report.errors.push(pos);
      }
      report.stderr.push_str(&stderr);
    }

    if !stdout.is_empty() {
      doc.replace(region.from(), region.to(), stdout.trim_end())?;
      report.replaced += 1;
    }
  }

  if !report.errors.is_empty() {
    report.errors.sort_unstable();
    report.errors.dedup();
    doc.set_selection(Selection::new(report.errors.iter().map(|&pos| Range::point(pos))));
  }
  Ok(report)
}

/// Directory filter commands run in: the document's own, else the home
/// directory.
pub fn working_dir(doc: &Document) -> Option<PathBuf> {
  env::command_dir(doc.path()).ok()
}

/// Filter commands run before, most recent first.
#[derive(Debug, Default, Clone)]
pub struct FilterHistory {
  entries: HashMap<String, (Instant, FilterRequest)>,
}

impl FilterHistory {
  pub fn record(&mut self, request: &FilterRequest, now: Instant) {
    self
      .entries
      .insert(request.pipeline.clone(), (now, request.clone()));
  }

  pub fn recent(&self) -> Vec<&FilterRequest> {
    let mut entries: Vec<_> = self.entries.values().collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.pipeline.cmp(&b.1.pipeline)));
    entries.into_iter().map(|(_, request)| request).collect()
  }

  pub fn get(&self, index: usize) -> Option<&FilterRequest> {
    self.recent().get(index).copied()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

// Helpers.
//

fn run_command(tokens: &[String], input: &str, cwd: &Path) -> Result<(String, String)> {
  let program = tokens.first().ok_or(FilterError::Empty)?;
  let spawn_error = |source| {
    FilterError::Spawn {
      program: program.clone(),
      source,
    }
  };

  let mut child = Command::new(program)
    .args(&tokens[1..])
    .current_dir(cwd)
    .stdin(if input.is_empty() { Stdio::null() } else { Stdio::piped() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(spawn_error)?;

  // Written from another thread so a command filling its stdout before
  // reading all of stdin cannot block both sides.
  let writer = child.stdin.take().map(|mut stdin| {
    let input = input.to_string();
    std::thread::spawn(move || stdin.write_all(input.as_bytes()))
  });
  let output = child.wait_with_output().map_err(spawn_error)?;
  if let Some(writer) = writer
    && let Ok(Err(error)) = writer.join()
  {
    tracing::debug!(program = program.as_str(), %error, "filter closed stdin early");
  }

  Ok((
    String::from_utf8_lossy(&output.stdout).into_owned(),
    String::from_utf8_lossy(&output.stderr).into_owned(),
  ))
}

/// Position named by the first `row` / `column` capture pair in `stderr`.
/// Rows count from one, columns from zero.
fn error_position<T: TextSource + ?Sized>(
  text: &T,
  pattern: &Pattern,
  stderr: &str,
) -> Result<Option<usize>> {
  let Some(groups) = pattern.captures(stderr)? else {
    return Ok(None);
  };
  let number = |index: usize| {
    groups
      .get(index)
      .copied()
      .flatten()
      .and_then(|group| group.parse::<usize>().ok())
  };
  let (Some(row), Some(column)) = (number(0), number(1)) else {
    return Ok(None);
  };

  let mut line_start = 0;
  for _ in 1..row {
    let next = text.full_line(line_start).1;
    if next == line_start || next >= text.len_chars() {
      break;
    }
    line_start = next;
  }
  let line_end = text.line_containing(line_start).1;
  Ok(Some((line_start + column).min(line_end)))
}

#[cfg(test)]
mod tests {
  use std::{
    num::NonZeroUsize,
    time::Duration,
  };

  use ropey::Rope;

  use super::*;
  use crate::document::DocumentId;

  fn doc(text: &str, ranges: &[(usize, usize)]) -> Document {
    let mut doc = Document::from_str(DocumentId::new(NonZeroUsize::new(1).unwrap()), text);
    doc.set_selection(Selection::new(ranges.iter().map(|&(a, b)| Range::new(a, b))));
    doc
  }

  #[test]
  fn test_missing_program() {
    let err = Pipeline::parse("no-such-program-fly --help").unwrap_err();
    assert!(matches!(err, FilterError::MissingProgram(ref name) if name == "no-such-program-fly"));
    assert_eq!(err.to_string(), "\"no-such-program-fly\" does not exist");
  }

  #[test]
  fn test_empty_segment() {
    assert!(matches!(Pipeline::parse("sort | "), Err(FilterError::Empty)));
  }

  #[cfg(unix)]
  #[test]
  fn test_pipeline_replaces_selection() {
    let mut doc = doc("b\na\nc\nrest", &[(0, 5)]);
    let cwd = std::env::temp_dir();
    let report = apply_filter(&mut doc, &FilterRequest::new("sort | tr a-z A-Z"), &cwd).unwrap();
    assert_eq!(report.replaced, 1);
    assert_eq!(doc.text().to_string(), "A\nB\nC\nrest");
  }

  #[cfg(unix)]
  #[test]
  fn test_whole_buffer() {
    let mut doc = doc("hello", &[(0, 0)]);
    let request = FilterRequest::new("tr a-z A-Z").whole_buffer(true);
    apply_filter(&mut doc, &request, &std::env::temp_dir()).unwrap();
    assert_eq!(doc.text().to_string(), "HELLO");
  }

  #[test]
  fn test_readonly() {
    let mut doc = doc("hello", &[(0, 5)]);
    doc.set_readonly(true);
    let result = apply_filter(&mut doc, &FilterRequest::new("sort"), &std::env::temp_dir());
    assert!(matches!(result, Err(FilterError::Document(DocumentError::Readonly))));
  }

  #[test]
  fn test_error_position() {
    let rope = Rope::from_str("first\nsecond line\nthird");
    let pattern = Pattern::new(r"line (\d+) column (\d+)").unwrap();
    let at = |stderr: &str| error_position(&rope, &pattern, stderr).unwrap();
    assert_eq!(at("oops at line 2 column 3"), Some(9));
    // Columns past the line end stay on the line.
    assert_eq!(at("line 1 column 40"), Some(5));
    assert_eq!(at("nothing to see"), None);
  }

  #[test]
  fn test_history_most_recent_first() {
    let start = Instant::now();
    let mut history = FilterHistory::default();
    history.record(&FilterRequest::new("sort"), start);
    history.record(&FilterRequest::new("uniq"), start + Duration::from_secs(1));
    history.record(&FilterRequest::new("sort").whole_buffer(true), start + Duration::from_secs(2));

    let recent: Vec<&str> = history.recent().iter().map(|r| r.pipeline.as_str()).collect();
    assert_eq!(recent, vec!["sort", "uniq"]);
    assert!(history.get(0).is_some_and(|r| r.whole_buffer));
    assert!(history.get(2).is_none());

    history.clear();
    assert!(history.is_empty());
  }
}
