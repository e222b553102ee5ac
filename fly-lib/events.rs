//! Host events and the table that routes them.
//!
//! Hosts report which UI element a buffer belongs to by name; that name is
//! parsed once into a [`SurfaceKind`]. A [`Dispatcher`] maps each
//! `(SurfaceKind, HostEvent)` pair to the handlers registered for it at
//! startup.
//!
//! ```ignore
//! let dispatcher = Dispatcher::<Counter>::new()
//!   .with(SurfaceKind::Editor, HostEvent::Opened, |ctx, _, _| ctx.opened += 1);
//! dispatcher.dispatch(&mut counter, &mut surface, SurfaceKind::Editor, HostEvent::Opened, id);
//! ```

use std::{
  collections::HashMap,
  fmt,
  str::FromStr,
};

use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  document::DocumentId,
  surface::Surface,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
  Editor,
  FindInput,
  ReplaceInput,
  IncrementalFindInput,
  GotoAnything,
  Console,
  OutputPanel,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown surface element: {0:?}")]
pub struct UnknownSurface(pub String);

impl FromStr for SurfaceKind {
  type Err = UnknownSurface;

  fn from_str(element: &str) -> Result<Self, Self::Err> {
    let kind = match element {
      "" => Self::Editor,
      "find:input" => Self::FindInput,
      "replace:input" => Self::ReplaceInput,
      "incremental_find:input" => Self::IncrementalFindInput,
      "goto_anything:input" => Self::GotoAnything,
      "console:input" => Self::Console,
      _ if element.ends_with(":output") => Self::OutputPanel,
      _ => return Err(UnknownSurface(element.to_string())),
    };
    Ok(kind)
  }
}

impl fmt::Display for SurfaceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Editor => "editor",
      Self::FindInput => "find:input",
      Self::ReplaceInput => "replace:input",
      Self::IncrementalFindInput => "incremental_find:input",
      Self::GotoAnything => "goto_anything:input",
      Self::Console => "console:input",
      Self::OutputPanel => "output",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
  Opened,
  Closed,
  SelectionModified,
}

pub type Handler<Ctx> = fn(&mut Ctx, &mut dyn Surface, DocumentId);

pub struct Dispatcher<Ctx> {
  table: HashMap<(SurfaceKind, HostEvent), SmallVec<[Handler<Ctx>; 2]>>,
}

impl<Ctx> Default for Dispatcher<Ctx> {
  fn default() -> Self {
    Self {
      table: HashMap::new(),
    }
  }
}

impl<Ctx> fmt::Debug for Dispatcher<Ctx> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut keys: Vec<_> = self.table.keys().collect();
    keys.sort_by_key(|(kind, event)| (kind.to_string(), format!("{event:?}")));
    f.debug_struct("Dispatcher").field("routes", &keys).finish()
  }
}

impl<Ctx> Dispatcher<Ctx> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `handler` for `event` on surfaces of `kind`, after the handlers
  /// already registered for them.
  #[must_use]
  pub fn with(mut self, kind: SurfaceKind, event: HostEvent, handler: Handler<Ctx>) -> Self {
    self.table.entry((kind, event)).or_default().push(handler);
    self
  }

  pub fn handles(&self, kind: SurfaceKind, event: HostEvent) -> bool {
    self.table.contains_key(&(kind, event))
  }

  /// Returns how many handlers ran.
  pub fn dispatch(
    &self,
    ctx: &mut Ctx,
    surface: &mut dyn Surface,
    kind: SurfaceKind,
    event: HostEvent,
    doc: DocumentId,
  ) -> usize {
    let Some(handlers) = self.table.get(&(kind, event)) else {
      return 0;
    };
    tracing::trace!(%kind, ?event, handlers = handlers.len(), "dispatch");
    for handler in handlers {
      handler(ctx, surface, doc);
    }
    handlers.len()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::surface::HeadlessSurface;

  #[derive(Default)]
  struct Log(Vec<&'static str>);

  #[test]
  fn test_parse_surface() {
    assert_eq!("".parse(), Ok(SurfaceKind::Editor));
    assert_eq!("goto_anything:input".parse(), Ok(SurfaceKind::GotoAnything));
    assert_eq!("exec:output".parse(), Ok(SurfaceKind::OutputPanel));
    assert_eq!(
      "mystery".parse::<SurfaceKind>(),
      Err(UnknownSurface("mystery".into()))
    );
  }

  #[test]
  fn test_dispatch_in_registration_order() {
    let dispatcher = Dispatcher::<Log>::new()
      .with(SurfaceKind::Editor, HostEvent::Opened, |log, _, _| log.0.push("first"))
      .with(SurfaceKind::Editor, HostEvent::Opened, |log, _, _| log.0.push("second"))
      .with(SurfaceKind::Editor, HostEvent::Closed, |log, _, _| log.0.push("closed"));

    let mut log = Log::default();
    let (id, mut surface) = (DocumentId::MIN, HeadlessSurface::default());
    let ran = dispatcher.dispatch(
      &mut log,
      &mut surface,
      SurfaceKind::Editor,
      HostEvent::Opened,
      id,
    );
    assert_eq!(ran, 2);
    assert_eq!(log.0, vec!["first", "second"]);
  }

  #[test]
  fn test_unrouted_events_are_ignored() {
    let dispatcher = Dispatcher::<Log>::new()
      .with(SurfaceKind::Editor, HostEvent::Opened, |log, _, _| log.0.push("opened"));
    let mut log = Log::default();
    let (id, mut surface) = (DocumentId::MIN, HeadlessSurface::default());
    let ran = dispatcher.dispatch(
      &mut log,
      &mut surface,
      SurfaceKind::Console,
      HostEvent::Opened,
      id,
    );
    assert_eq!(ran, 0);
    assert!(!dispatcher.handles(SurfaceKind::Console, HostEvent::Opened));
    assert!(log.0.is_empty());
  }
}
