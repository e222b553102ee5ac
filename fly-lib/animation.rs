//! Caret width animation.
//!
//! The caret grows (or shrinks) through [`CURSOR_STEPS`] over a short
//! duration. Each document owns one [`CursorAnimation`]; the host drives it by
//! calling [`CursorAnimation::tick`] after every delay it hands out. A trigger
//! while an animation runs restarts the steps instead of starting another
//! animation.

use std::time::Duration;

/// Extra caret widths, from narrowest to widest.
pub const CURSOR_STEPS: [u8; 4] = [1, 2, 3, 4];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
  #[default]
  Idle,
  Animating,
  RestartRequested,
}

/// One animation step: the caret width to apply now, and the delay until the
/// next tick. `next` is `None` on the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
  pub width: u8,
  pub next:  Option<Duration>,
}

#[derive(Debug, Default, Clone)]
pub struct CursorAnimation {
  phase:    AnimationPhase,
  grow:     bool,
  step:     usize,
  interval: Duration,
}

impl CursorAnimation {
  pub fn phase(&self) -> AnimationPhase {
    self.phase
  }

  pub fn is_idle(&self) -> bool {
    self.phase == AnimationPhase::Idle
  }

  /// Start an animation spread over `duration`. Returns the delay before the
  /// first tick, or `None` when an animation is already running, in which
  /// case it starts over at its next tick.
  pub fn trigger(&mut self, grow: bool, duration: Duration) -> Option<Duration> {
    if self.phase != AnimationPhase::Idle {
      self.phase = AnimationPhase::RestartRequested;
      return None;
    }
    self.phase = AnimationPhase::Animating;
    self.grow = grow;
    self.step = 0;
    self.interval = duration / CURSOR_STEPS.len() as u32;
    Some(self.interval)
  }

  pub fn tick(&mut self) -> Option<Frame> {
    if self.phase == AnimationPhase::Idle {
      return None;
    }

    let index = if self.grow {
      self.step
    } else {
      CURSOR_STEPS.len() - 1 - self.step
    };
    let width = CURSOR_STEPS[index];

    if self.phase == AnimationPhase::RestartRequested {
      self.phase = AnimationPhase::Animating;
      self.step = 0;
    } else {
      self.step += 1;
    }

    if self.step >= CURSOR_STEPS.len() {
      self.phase = AnimationPhase::Idle;
      self.step = 0;
      return Some(Frame { width, next: None });
    }
    Some(Frame {
      width,
      next: Some(self.interval),
    })
  }
}
