//! Movement intent components.
//!
//! Intent represents the desired movement from player input or AI. The
//! input layer writes a planar vector and held-button states every control
//! frame; the controller latches rising edges into one-shot jump/dodge
//! requests and consumes them. A request whose preconditions are unmet when
//! consumed is silently dropped, never queued.

use bevy::prelude::*;

/// Threshold below which planar intent counts as zero.
const ACTIVE_THRESHOLD: f32 = 1e-3;

/// Per-control-frame movement intent.
///
/// The planar vector uses `x` for lateral and `y` for forward input and is
/// magnitude-clamped to 1. Held-button states are plain booleans; the
/// controller performs rising-edge detection itself, so any input source
/// (keyboard, gamepad, AI, replay) works.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use floating_locomotion::prelude::*;
///
/// let mut intent = MoveIntent::default();
/// intent.set_planar(Vec2::new(3.0, 4.0));
/// // Magnitude-clamped to 1
/// assert!((intent.planar().length() - 1.0).abs() < 1e-6);
///
/// intent.set_jump_pressed(true);
/// intent.set_dodge_pressed(false);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MoveIntent {
    planar: Vec2,
    jump_pressed: bool,
    dodge_pressed: bool,
    jump_pressed_prev: bool,
    dodge_pressed_prev: bool,
    jump_requested: bool,
    dodge_requested: bool,
}

impl MoveIntent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planar intent (`x` = lateral, `y` = forward), clamped to
    /// unit magnitude.
    pub fn set_planar(&mut self, planar: Vec2) {
        self.planar = planar.clamp_length_max(1.0);
    }

    /// The current planar intent.
    #[inline]
    pub fn planar(&self) -> Vec2 {
        self.planar
    }

    /// Whether there is any planar input this frame.
    pub fn is_active(&self) -> bool {
        self.planar.length_squared() > ACTIVE_THRESHOLD * ACTIVE_THRESHOLD
    }

    /// Set the held state of the jump button.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Set the held state of the dodge button.
    pub fn set_dodge_pressed(&mut self, pressed: bool) {
        self.dodge_pressed = pressed;
    }

    /// Latch rising edges of the held-button states into one-shot requests.
    ///
    /// Called once per control frame, after input sampling and before any
    /// trigger evaluation. A latched request persists until consumed.
    pub(crate) fn latch_edges(&mut self) {
        if self.jump_pressed && !self.jump_pressed_prev {
            self.jump_requested = true;
        }
        if self.dodge_pressed && !self.dodge_pressed_prev {
            self.dodge_requested = true;
        }
        self.jump_pressed_prev = self.jump_pressed;
        self.dodge_pressed_prev = self.dodge_pressed;
    }

    /// Take the pending jump request, clearing it.
    ///
    /// The caller decides whether preconditions hold; either way the
    /// request is gone (silent drop, no queueing).
    pub(crate) fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }

    /// Take the pending dodge request, clearing it.
    pub(crate) fn take_dodge_request(&mut self) -> bool {
        std::mem::take(&mut self.dodge_requested)
    }

    /// Whether a jump request is pending.
    pub fn has_jump_request(&self) -> bool {
        self.jump_requested
    }

    /// Whether a dodge request is pending.
    pub fn has_dodge_request(&self) -> bool {
        self.dodge_requested
    }
}
