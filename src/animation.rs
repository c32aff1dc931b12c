//! Animation/display sink.
//!
//! The controller exposes a small set of flags to the animation layer once
//! per control frame. The `is_jumping` flag deliberately outlives the
//! physical jump: it is set when the jump starts and stays set until the
//! animation layer calls [`AnimationFlags::reset_jump_flag`] after its
//! landing animation completes.

use bevy::prelude::*;

/// Planar speed above which the body counts as running.
pub const RUN_SPEED_THRESHOLD: f32 = 0.1;

/// Flags and inputs published to the animation layer.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct AnimationFlags {
    /// Planar speed exceeds [`RUN_SPEED_THRESHOLD`].
    pub is_running: bool,
    /// Ground classification from the last physics step.
    pub is_grounded: bool,
    /// Set when a jump starts; cleared only by [`Self::reset_jump_flag`].
    pub is_jumping: bool,
    /// Lateral input component, for blend trees.
    pub lateral: f32,
    /// Forward input component, for blend trees.
    pub forward: f32,
}

impl AnimationFlags {
    /// Refresh the per-frame fields. `is_jumping` is only ever raised here;
    /// clearing it is the animation layer's call.
    pub(crate) fn refresh(
        &mut self,
        planar_speed: f32,
        grounded: bool,
        jumping: bool,
        input: Vec2,
    ) {
        self.is_running = planar_speed > RUN_SPEED_THRESHOLD;
        self.is_grounded = grounded;
        if jumping {
            self.is_jumping = true;
        }
        self.lateral = input.x;
        self.forward = input.y;
    }

    /// Entry point for the animation layer: clear the jump flag once the
    /// landing animation has completed. Never touches locomotion state.
    pub fn reset_jump_flag(&mut self) {
        self.is_jumping = false;
    }
}
