//! Timed action scheduling for the dodge window and cooldown.
//!
//! These countdowns advance on the control-frame clock, not the physics
//! step: dodge duration is a perceptual timing concern. There is no
//! cancellation; once started, the window and the cooldown always run to
//! completion.

use std::time::Duration;

use bevy::prelude::*;

/// A time-bounded action advanced by the control-frame clock.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct TimedAction {
    /// Time accumulated so far, in seconds.
    pub elapsed: f32,
    /// Total duration of the action, in seconds.
    pub duration: f32,
}

impl TimedAction {
    /// Start a new action with the given duration.
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration,
        }
    }

    /// Advance by a frame delta; returns whether the action just finished
    /// or was already finished.
    pub fn advance(&mut self, delta: f32) -> bool {
        self.elapsed += delta;
        self.finished()
    }

    /// Whether the elapsed time has reached the duration.
    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Time left before the action finishes.
    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }
}

/// What a [`DodgeClock`] tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DodgeTick {
    /// Nothing running.
    Idle,
    /// The dodge window is still active.
    WindowRunning,
    /// The dodge window just completed; the cooldown has started.
    WindowFinished,
    /// The cooldown is still counting down.
    CooldownRunning,
    /// The cooldown just elapsed; the dodge lock may be released.
    /// Reported exactly once per dodge.
    CooldownFinished,
}

/// Control-frame clock for the dodge window and cooldown.
///
/// Created (armed) when a dodge is triggered and reset once the cooldown
/// completes. The two phases never overlap: the cooldown starts the frame
/// the window finishes.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct DodgeClock {
    window: Option<TimedAction>,
    #[reflect(ignore)]
    cooldown: Option<Timer>,
}

impl DodgeClock {
    /// Create an idle clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the dodge window. Any running window or cooldown is replaced;
    /// callers gate on [`crate::state::LocomotionState::can_dodge`] so this
    /// only happens from idle.
    pub fn start(&mut self, duration: f32) {
        self.window = Some(TimedAction::new(duration));
        self.cooldown = None;
    }

    /// The active dodge window, if any.
    pub fn window(&self) -> Option<TimedAction> {
        self.window
    }

    /// Seconds left on the cooldown, zero when no cooldown is running.
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
            .as_ref()
            .map_or(0.0, |t| t.remaining_secs())
    }

    /// Advance the clock by a control-frame delta.
    ///
    /// `cooldown_duration` is consulted when the window finishes and the
    /// cooldown phase begins.
    pub fn tick(&mut self, delta: Duration, cooldown_duration: f32) -> DodgeTick {
        if let Some(window) = self.window.as_mut() {
            if window.advance(delta.as_secs_f32()) {
                self.window = None;
                self.cooldown = Some(Timer::from_seconds(cooldown_duration, TimerMode::Once));
                return DodgeTick::WindowFinished;
            }
            return DodgeTick::WindowRunning;
        }
        if let Some(cooldown) = self.cooldown.as_mut() {
            cooldown.tick(delta);
            if cooldown.finished() {
                self.cooldown = None;
                return DodgeTick::CooldownFinished;
            }
            return DodgeTick::CooldownRunning;
        }
        DodgeTick::Idle
    }
}
