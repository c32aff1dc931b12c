//! Locomotion state machine and state marker components.
//!
//! [`LocomotionState`] owns the grounded/jumping/dodging variant and the
//! dodge lock. Transitions with unmet preconditions are silent no-ops: the
//! request is dropped, never queued, and never logged as an error. The
//! variant representation makes the core invariant structural: the body can
//! never be Jumping and Dodging at the same instant.

use bevy::prelude::*;

/// The current locomotion variant.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocomotionMode {
    /// Idle or moving under float stabilization. Also covers falling
    /// without a jump; airborne status lives in
    /// [`crate::detection::GroundState`].
    #[default]
    Grounded,
    /// Airborne by jump; the float stabilizer is suspended.
    Jumping,
    /// Dodge window active; horizontal-intent movement is suspended.
    Dodging {
        /// Whether the dodge interrupted a jump and should resume it when
        /// the window ends.
        resume_jump: bool,
    },
}

/// Locomotion state machine component.
///
/// Created at controller initialization and mutated only by the controller
/// systems; it lives for the controller's lifetime.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct LocomotionState {
    mode: LocomotionMode,
    can_dodge: bool,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::new()
    }
}

impl LocomotionState {
    /// Fresh state: grounded, dodge available.
    pub fn new() -> Self {
        Self {
            mode: LocomotionMode::Grounded,
            can_dodge: true,
        }
    }

    /// The current variant.
    #[inline]
    pub fn mode(&self) -> LocomotionMode {
        self.mode
    }

    /// Whether the body is airborne by jump.
    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.mode == LocomotionMode::Jumping
    }

    /// Whether a dodge window is active.
    #[inline]
    pub fn is_dodging(&self) -> bool {
        matches!(self.mode, LocomotionMode::Dodging { .. })
    }

    /// Whether the dodge cooldown has elapsed.
    #[inline]
    pub fn can_dodge(&self) -> bool {
        self.can_dodge
    }

    /// Attempt the `Grounded -> Jumping` transition.
    ///
    /// Requires the body to be grounded and not already jumping or dodging.
    /// Returns whether the transition happened; on `false` the request is
    /// dropped.
    #[must_use]
    pub fn begin_jump(&mut self, grounded: bool) -> bool {
        if grounded && self.mode == LocomotionMode::Grounded {
            self.mode = LocomotionMode::Jumping;
            true
        } else {
            false
        }
    }

    /// `Jumping -> Grounded` on landing. No-op in any other mode.
    pub fn land(&mut self) {
        if self.mode == LocomotionMode::Jumping {
            self.mode = LocomotionMode::Grounded;
        }
    }

    /// Attempt the transition into Dodging from Grounded or mid-jump.
    ///
    /// Requires the cooldown to have elapsed, no dodge to be in progress,
    /// and non-zero planar intent. On success the dodge lock engages and
    /// the interrupted mode is remembered. Returns whether the transition
    /// happened; on `false` the request is dropped.
    #[must_use]
    pub fn begin_dodge(&mut self, has_intent: bool) -> bool {
        if !self.can_dodge || self.is_dodging() || !has_intent {
            return false;
        }
        self.mode = LocomotionMode::Dodging {
            resume_jump: self.mode == LocomotionMode::Jumping,
        };
        self.can_dodge = false;
        true
    }

    /// End the dodge window, restoring the interrupted mode.
    ///
    /// `can_dodge` stays false until [`Self::unlock_dodge`] after the
    /// cooldown. No-op when not dodging.
    pub fn end_dodge(&mut self) {
        if let LocomotionMode::Dodging { resume_jump } = self.mode {
            self.mode = if resume_jump {
                LocomotionMode::Jumping
            } else {
                LocomotionMode::Grounded
            };
        }
    }

    /// Release the dodge lock once the cooldown has elapsed.
    pub fn unlock_dodge(&mut self) {
        self.can_dodge = true;
    }
}

/// Marker component indicating the body classified as grounded.
///
/// Added and removed by the controller based on ground sensing results,
/// so game systems can filter queries by ground state. Mutually exclusive
/// with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the body classified as airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
