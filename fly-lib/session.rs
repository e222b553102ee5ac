//! Open documents and the commands that run on them.
//!
//! A [`Session`] owns every document together with its per-document state,
//! the configuration, the clipboard and the filter history. Hosts feed it
//! commands and events; everything the host must show or do later comes back
//! through the [`Surface`] passed to each call.

use std::{
  collections::BTreeMap,
  fmt,
  sync::Arc,
  time::Instant,
};

use ropey::Rope;

use crate::{
  animation::CursorAnimation,
  clipboard::{
    ClipboardProvider,
    CopyCoalescer,
  },
  command::{
    Command,
    CommandError,
    Result,
  },
  config::Config,
  document::{
    Document,
    DocumentId,
  },
  edit::{
    self,
    Copied,
  },
  events::{
    Dispatcher,
    HostEvent,
    SurfaceKind,
  },
  filter::{
    self,
    FILTER_PANEL,
    FilterError,
    FilterHistory,
    FilterRequest,
  },
  find_under::find_under_expand,
  movement::{
    Motion,
    Reveal,
  },
  paragraph::navigate_paragraph,
  registry::{
    DocumentState,
    Registry,
  },
  select,
  selection::{
    Range,
    Selection,
  },
  sneak::{
    self,
    SneakInput,
    SneakLimits,
  },
  surface::{
    Annotation,
    Deferred,
    HighlightKey,
    Surface,
  },
  word::{
    find_word_near,
    navigate_word,
  },
};

const READONLY: &str = "Document is read-only";

pub struct Session {
  documents:  BTreeMap<DocumentId, Document>,
  next_id:    DocumentId,
  registry:   Registry,
  config:     Config,
  clipboard:  Box<dyn ClipboardProvider>,
  coalescer:  CopyCoalescer,
  history:    FilterHistory,
  dispatcher: Arc<Dispatcher<Session>>,
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session")
      .field("documents", &self.documents.keys().collect::<Vec<_>>())
      .field("clipboard", &self.clipboard.name())
      .field("dispatcher", &self.dispatcher)
      .finish_non_exhaustive()
  }
}

impl Session {
  pub fn new(config: Config, clipboard: Box<dyn ClipboardProvider>) -> Self {
    let coalescer = CopyCoalescer::new(config.copy.debounce());
    Self {
      documents: BTreeMap::new(),
      next_id: DocumentId::MIN,
      registry: Registry::new(),
      config,
      clipboard,
      coalescer,
      history: FilterHistory::default(),
      dispatcher: Arc::new(default_dispatcher()),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn clipboard(&self) -> &dyn ClipboardProvider {
    self.clipboard.as_ref()
  }

  pub fn filter_history(&self) -> &FilterHistory {
    &self.history
  }

  pub fn document(&self, id: DocumentId) -> Option<&Document> {
    self.documents.get(&id)
  }

  pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
    self.documents.get_mut(&id)
  }

  pub fn documents(&self) -> impl Iterator<Item = &Document> {
    self.documents.values()
  }

  /// Open a document holding `text`, with settings from the `[editor]`
  /// section.
  pub fn open(&mut self, surface: &mut dyn Surface, text: Rope) -> DocumentId {
    let id = self.next_id;
    self.next_id = id.next();

    let mut doc = Document::new(id, text);
    *doc.settings_mut() = self.config.editor.document_settings();
    self.documents.insert(id, doc);
    self.handle_event(surface, SurfaceKind::Editor, HostEvent::Opened, id);
    tracing::debug!(doc = ?id, "opened document");
    id
  }

  pub fn close(&mut self, surface: &mut dyn Surface, id: DocumentId) -> Option<Document> {
    let doc = self.documents.remove(&id)?;
    self.handle_event(surface, SurfaceKind::Editor, HostEvent::Closed, id);
    tracing::debug!(doc = ?id, "closed document");
    Some(doc)
  }

  /// Route a host event to its handlers. Returns how many ran.
  pub fn handle_event(
    &mut self,
    surface: &mut dyn Surface,
    kind: SurfaceKind,
    event: HostEvent,
    id: DocumentId,
  ) -> usize {
    let dispatcher = Arc::clone(&self.dispatcher);
    dispatcher.dispatch(self, surface, kind, event, id)
  }

  /// Run `command` on document `id`.
  ///
  /// Edits on a read-only document only report it on the status line.
  pub fn execute(
    &mut self,
    id: DocumentId,
    surface: &mut dyn Surface,
    command: Command,
    now: Instant,
  ) -> Result<()> {
    let doc = self.documents.get(&id).ok_or(CommandError::NoDocument(id))?;
    tracing::debug!(doc = ?id, %command, "execute");
    if command.is_edit() && doc.is_readonly() {
      surface.status(READONLY);
      return Ok(());
    }

    let before = doc.selection().clone();
    self.run(id, surface, command, now)?;

    if self
      .documents
      .get(&id)
      .is_some_and(|doc| *doc.selection() != before)
    {
      self.handle_event(surface, SurfaceKind::Editor, HostEvent::SelectionModified, id);
    }
    Ok(())
  }

  /// Hide the sneak prompt and its highlights. The search string is kept
  /// for the next repeat.
  pub fn dismiss_sneak(&mut self, surface: &mut dyn Surface, id: DocumentId) {
    if !self.documents.contains_key(&id) {
      return;
    }
    self.registry.state_mut(id).sneak.dismiss();
    hide_sneak(surface, id);
  }

  /// Handle a [`Deferred::FlushClipboard`].
  pub fn flush_clipboard(&mut self, surface: &mut dyn Surface) -> Result<()> {
    if let Some(message) = self.coalescer.flush(self.clipboard.as_mut())? {
      surface.status(&message);
    }
    Ok(())
  }

  /// Handle a [`Deferred::AnimationFrame`].
  pub fn animation_tick(&mut self, surface: &mut dyn Surface, id: DocumentId) {
    if !self.documents.contains_key(&id) {
      return;
    }
    let Some(frame) = self.registry.state_mut(id).animation.tick() else {
      return;
    };
    surface.set_caret_width(id, frame.width);
    if let Some(next) = frame.next {
      surface.schedule(Deferred::AnimationFrame(id), next);
    }
  }

  /// Run a task the host held back for its delay.
  pub fn run_deferred(&mut self, surface: &mut dyn Surface, task: Deferred) -> Result<()> {
    match task {
      Deferred::FlushClipboard => self.flush_clipboard(surface)?,
      Deferred::ClearHighlight(id, key) => surface.clear_highlight(id, key),
      Deferred::AnimationFrame(id) => self.animation_tick(surface, id),
    }
    Ok(())
  }

  fn run(
    &mut self,
    id: DocumentId,
    surface: &mut dyn Surface,
    command: Command,
    now: Instant,
  ) -> Result<()> {
    let Self {
      documents,
      registry,
      config,
      clipboard,
      coalescer,
      history,
      ..
    } = self;
    let doc = documents.get_mut(&id).ok_or(CommandError::NoDocument(id))?;

    let motion = match command {
      Command::NavigateWord(motion) => {
        navigate_word(
          &*doc,
          doc.selection(),
          &doc.settings().word_separators,
          motion,
        )?
      },
      Command::NavigateParagraph(motion) => {
        let state = &mut registry.state_mut(id).paragraph;
        navigate_paragraph(&*doc, doc.selection(), state, motion, now)?
      },
      Command::Sneak(input) => {
        return run_sneak(doc, registry.state_mut(id), config, surface, input);
      },
      Command::SneakNth(n) => {
        let state = registry.state_mut(id);
        let motion = sneak::nth_match(&state.sneak, doc.selection(), n);
        state.sneak.dismiss();
        hide_sneak(surface, id);
        if let Some(motion) = motion {
          apply(doc, surface, motion);
        }
        let grow = doc.selection().len() > 1;
        animate(&mut state.animation, surface, id, grow, config.animation.sneak());
        return Ok(());
      },
      Command::FindUnderExpand(find) => {
        find_under_expand(
          &*doc,
          doc.selection(),
          &doc.settings().word_separators,
          find,
        )?
      },
      Command::FindWordNear => {
        find_word_near(&*doc, doc.selection(), &doc.settings().word_separators)?
          .map(Motion::new)
      },
      Command::ClearSelection(direction) => {
        Some(Motion::new(select::clear_selection(doc.selection(), direction)))
      },
      Command::SubtractSelection { last } => select::subtract_selection(doc.selection(), last),
      Command::RevertSelection => {
        select::revert_selection(doc.selection(), |pos| surface.is_visible(id, pos))
      },
      Command::SingleSelection(index) => select::single_selection(doc.selection(), index),
      Command::RecordSelections => {
        registry.state_mut(id).recorded = Some(doc.selection().iter().copied().collect());
        None
      },
      Command::RetrieveSelections => {
        registry
          .state_mut(id)
          .recorded
          .as_deref()
          .map(|recorded| Motion::new(select::retrieve_selection(doc.selection(), recorded)))
      },
      Command::CursorsFromSelection { after } => {
        select::cursors_from_selection(&*doc, doc.selection(), after).map(Motion::new)
      },
      Command::SelectLines(lines) => {
        let growing = &mut registry.state_mut(id).line_direction;
        select::select_lines(&*doc, doc.selection(), growing, lines)
      },
      Command::AlignCursors => {
        edit::align_cursors(doc)?;
        None
      },
      Command::DuplicateLines => {
        if let Some(reveal) = edit::duplicate_lines(doc)? {
          surface.reveal(id, reveal);
        }
        None
      },
      Command::Copy { whole_line } => {
        let copied = edit::smart_copy(doc, whole_line, false)?;
        publish_copy(coalescer, config, surface, id, copied);
        None
      },
      Command::Cut { whole_line } => {
        let copied = edit::smart_copy(doc, whole_line, true)?;
        publish_copy(coalescer, config, surface, id, copied);
        None
      },
      Command::Paste { strip_whitespace } => {
        let clip = match coalescer.pending_clip() {
          Some(clip) => clip.to_string(),
          None => clipboard.get_contents()?,
        };
        edit::smart_paste(doc, &clip, strip_whitespace)?;
        None
      },
      Command::Filter(request) => {
        return run_filter(doc, history, surface, request, now);
      },
      Command::RecentFilter(index) => {
        let Some(request) = history.get(index).cloned() else {
          surface.status("No filter commands in history");
          return Ok(());
        };
        return run_filter(doc, history, surface, request, now);
      },
      Command::ClearFilterHistory => {
        history.clear();
        None
      },
    };

    if let Some(motion) = motion {
      apply(doc, surface, motion);
    }
    Ok(())
  }
}

// Helpers.
//

fn default_dispatcher() -> Dispatcher<Session> {
  Dispatcher::<Session>::new()
    .with(SurfaceKind::Editor, HostEvent::Opened, |session: &mut Session, _, id| {
      session.registry.open(id);
    })
    .with(SurfaceKind::Editor, HostEvent::Closed, |session: &mut Session, _, id| {
      session.registry.close(id);
    })
    .with(
      SurfaceKind::Editor,
      HostEvent::SelectionModified,
      animate_cursor_count,
    )
}

/// Widen the caret when a document gains a second cursor and narrow it back
/// when it is down to one.
fn animate_cursor_count(session: &mut Session, surface: &mut dyn Surface, id: DocumentId) {
  let Some(doc) = session.documents.get(&id) else {
    return;
  };
  let multi = doc.selection().len() > 1;
  let duration = session.config.animation.multi_cursor();
  let state = session.registry.state_mut(id);
  if state.multi_cursor == Some(multi) {
    return;
  }
  state.multi_cursor = Some(multi);
  animate(&mut state.animation, surface, id, multi, duration);
}

fn animate(
  animation: &mut CursorAnimation,
  surface: &mut dyn Surface,
  id: DocumentId,
  grow: bool,
  duration: std::time::Duration,
) {
  if let Some(delay) = animation.trigger(grow, duration) {
    surface.schedule(Deferred::AnimationFrame(id), delay);
  }
}

fn apply(doc: &mut Document, surface: &mut dyn Surface, motion: Motion) {
  let Motion { selection, reveal } = motion;
  doc.set_selection(selection);
  if let Some(reveal) = reveal {
    surface.reveal(doc.id(), reveal);
  }
}

fn hide_sneak(surface: &mut dyn Surface, id: DocumentId) {
  surface.clear_highlight(id, HighlightKey::Sneak);
  surface.clear_highlight(id, HighlightKey::SneakPreviews);
  surface.prompt(id, None);
}

fn run_sneak(
  doc: &mut Document,
  state: &mut DocumentState,
  config: &Config,
  surface: &mut dyn Surface,
  input: SneakInput,
) -> Result<()> {
  let id = doc.id();
  if doc.selection().is_empty() {
    doc.set_selection(Selection::point(0));
  }

  let raw = input.raw || !config.sneak.escape_regex;
  let limits = SneakLimits::new(config.sneak.min_chars, config.sneak.glyphs.len());
  let outcome = sneak::sneak(&*doc, doc.selection(), &mut state.sneak, input.raw(raw), limits)?;
  let searched = outcome.searched();

  if let Some(motion) = outcome.motion {
    doc.set_selection(motion.selection);
  }

  let regions: Vec<Annotation> = outcome
    .previews
    .iter()
    .map(|&(start, end)| Annotation::new(Range::new(start, end), ""))
    .collect();
  surface.highlight(id, HighlightKey::Sneak, &regions);

  let glyphs: Vec<Annotation> = if doc.selection().len() == 1 {
    regions
      .iter()
      .zip(&config.sneak.glyphs)
      .map(|(region, glyph)| Annotation::new(region.range, glyph.as_str()))
      .collect()
  } else {
    Vec::new()
  };
  surface.highlight(id, HighlightKey::SneakPreviews, &glyphs);

  if let Some(anchor) = sneak::prompt_anchor(doc.selection(), |pos| surface.is_visible(id, pos)) {
    surface.reveal(id, Reveal::centered(anchor));
    surface.prompt(id, Some((anchor, &outcome.prompt)));
  }

  if searched && config.sneak.animate_cursor {
    let grow = doc.selection().len() > 1;
    animate(&mut state.animation, surface, id, grow, config.animation.sneak());
  }
  Ok(())
}

fn publish_copy(
  coalescer: &mut CopyCoalescer,
  config: &Config,
  surface: &mut dyn Surface,
  id: DocumentId,
  copied: Copied,
) {
  if let Some(clip) = copied.clip {
    let delay = coalescer.copy(clip);
    surface.schedule(Deferred::FlushClipboard, delay);
  }
  if !copied.highlights.is_empty() {
    let regions: Vec<Annotation> = copied
      .highlights
      .into_iter()
      .map(|range| Annotation::new(range, ""))
      .collect();
    surface.highlight(id, HighlightKey::Copy, &regions);
    surface.schedule(Deferred::ClearHighlight(id, HighlightKey::Copy), config.copy.highlight());
  }
}

fn run_filter(
  doc: &mut Document,
  history: &mut FilterHistory,
  surface: &mut dyn Surface,
  request: FilterRequest,
  now: Instant,
) -> Result<()> {
  let Some(cwd) = filter::working_dir(doc) else {
    surface.status("No directory to run the filter in");
    return Ok(());
  };

  let report = match filter::apply_filter(doc, &request, &cwd) {
    Ok(report) => report,
    Err(err @ (FilterError::Empty | FilterError::MissingProgram(_))) => {
      surface.status(&err.to_string());
      return Ok(());
    },
    Err(err) => return Err(err.into()),
  };
  history.record(&request, now);

  if !report.stderr.is_empty() {
    surface.append_output(FILTER_PANEL, &report.stderr);
  }
  if let Some(&first) = report.errors.first() {
    surface.reveal(doc.id(), Reveal::centered(first));
  }
  tracing::debug!(pipeline = request.pipeline.as_str(), replaced = report.replaced, "filter");
  Ok(())
}
