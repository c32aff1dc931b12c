//! Controller configuration components.
//!
//! This module defines the designer-tunable configuration for locomotion
//! controllers (float height, spring parameters, jump and dodge tuning,
//! ground probe geometry) plus the facing basis supplied by the
//! orientation/camera collaborator.

use bevy::prelude::*;
use thiserror::Error;

/// Fatal setup errors.
///
/// All failures in this domain are missing or malformed configuration,
/// detected once when a controller entity is first seen. Nothing here is
/// recoverable at runtime; a probe miss is the valid airborne state, not
/// an error.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Float height must be positive for the spring to have a target.
    #[error("float_height must be positive and finite, got {0}")]
    FloatHeight(f32),
    /// Spring parameters are independently tunable but must be finite.
    #[error("spring parameters must be finite, got strength={strength} damping={damping}")]
    Spring {
        /// Configured spring strength.
        strength: f32,
        /// Configured spring damping.
        damping: f32,
    },
    /// Movement speed must be a non-negative finite value.
    #[error("move_speed must be non-negative and finite, got {0}")]
    MoveSpeed(f32),
    /// Rotation smoothing rate must be a non-negative finite value.
    #[error("rotation_speed must be non-negative and finite, got {0}")]
    RotationSpeed(f32),
    /// A dodge must occupy a positive window of time.
    #[error("dodge_duration must be positive and finite, got {0}")]
    DodgeDuration(f32),
    /// Dodge cooldown must be a non-negative finite value.
    #[error("dodge_cooldown must be non-negative and finite, got {0}")]
    DodgeCooldown(f32),
    /// Probe radius may be zero (intentional "no ground" detection) but
    /// never negative or non-finite.
    #[error("probe_radius must be non-negative and finite, got {0}")]
    ProbeRadius(f32),
    /// The controller cannot map planar input to world space without a
    /// facing basis.
    #[error("controller entity is missing a FacingBasis component")]
    MissingFacingBasis,
}

/// Core locomotion controller configuration.
///
/// All fields are designer-tunable at spawn time; there is no dynamic
/// reconfiguration surface. Defaults mirror a human-scale character in
/// meter units.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ControllerConfig {
    /// Target planar speed while moving.
    pub move_speed: f32,
    /// Facing smoothing rate (spherical interpolation factor per second).
    pub rotation_speed: f32,
    /// Upward impulse applied on jump.
    pub jump_impulse: f32,
    /// Target height of the body above ground.
    pub float_height: f32,
    /// Spring strength of the float stabilizer.
    pub spring_strength: f32,
    /// Spring damping of the float stabilizer.
    pub spring_damping: f32,
    /// Controller-owned gravity acceleration along the up axis
    /// (negative = downward). Applied only while airborne; backend gravity
    /// is disabled on controller bodies.
    pub gravity: f32,
    /// Planar speed imposed for the duration of a dodge.
    pub dodge_speed: f32,
    /// Length of the dodge window in seconds.
    pub dodge_duration: f32,
    /// Lockout after a dodge window before the next dodge, in seconds.
    pub dodge_cooldown: f32,
    /// Radius of the ground probe sphere. Zero disables ground detection
    /// (the body always classifies as airborne).
    pub probe_radius: f32,
    /// Extra probe reach below the float height, bounding how far beyond
    /// the float height a ground hit is still reported.
    pub probe_reach: f32,
    /// Collision mask the ground probe tests against. An empty mask means
    /// nothing qualifies as ground.
    pub probe_mask: u32,
    /// Maximum ground slope angle (radians) at which movement is projected
    /// onto the slope plane.
    pub slope_limit: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            rotation_speed: 10.0,
            jump_impulse: 7.0,
            float_height: 1.0,
            spring_strength: 500.0,
            spring_damping: 50.0,
            gravity: -20.0,
            dodge_speed: 10.0,
            dodge_duration: 0.2,
            dodge_cooldown: 1.0,
            probe_radius: 0.2,
            probe_reach: 0.5,
            probe_mask: u32::MAX,
            slope_limit: std::f32::consts::FRAC_PI_4,
        }
    }
}

impl ControllerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target float height.
    pub fn with_float_height(mut self, height: f32) -> Self {
        self.float_height = height;
        self
    }

    /// Set spring strength and damping together.
    pub fn with_spring(mut self, strength: f32, damping: f32) -> Self {
        self.spring_strength = strength;
        self.spring_damping = damping;
        self
    }

    /// Set the planar movement speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Set the jump impulse.
    pub fn with_jump_impulse(mut self, impulse: f32) -> Self {
        self.jump_impulse = impulse;
        self
    }

    /// Set dodge speed, window duration and cooldown together.
    pub fn with_dodge(mut self, speed: f32, duration: f32, cooldown: f32) -> Self {
        self.dodge_speed = speed;
        self.dodge_duration = duration;
        self.dodge_cooldown = cooldown;
        self
    }

    /// Set the ground probe geometry.
    pub fn with_probe(mut self, radius: f32, reach: f32) -> Self {
        self.probe_radius = radius;
        self.probe_reach = reach;
        self
    }

    /// Set the ground probe collision mask.
    pub fn with_probe_mask(mut self, mask: u32) -> Self {
        self.probe_mask = mask;
        self
    }

    /// Set the slope limit in radians.
    pub fn with_slope_limit(mut self, limit: f32) -> Self {
        self.slope_limit = limit;
        self
    }

    /// Total downward reach of the ground probe from the body origin.
    #[inline]
    pub fn probe_distance(&self) -> f32 {
        self.float_height + self.probe_reach
    }

    /// Whether the probe can ever report ground.
    ///
    /// A zero radius or empty mask is intentional "no ground" detection,
    /// not an error.
    #[inline]
    pub fn probe_enabled(&self) -> bool {
        self.probe_radius > 0.0 && self.probe_mask != 0
    }

    /// Validate the configuration.
    ///
    /// Called once per controller when the entity is first seen; an invalid
    /// config is a fatal setup error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.float_height.is_finite() && self.float_height > 0.0) {
            return Err(ConfigError::FloatHeight(self.float_height));
        }
        if !(self.spring_strength.is_finite() && self.spring_damping.is_finite()) {
            return Err(ConfigError::Spring {
                strength: self.spring_strength,
                damping: self.spring_damping,
            });
        }
        if !(self.move_speed.is_finite() && self.move_speed >= 0.0) {
            return Err(ConfigError::MoveSpeed(self.move_speed));
        }
        if !(self.rotation_speed.is_finite() && self.rotation_speed >= 0.0) {
            return Err(ConfigError::RotationSpeed(self.rotation_speed));
        }
        if !(self.dodge_duration.is_finite() && self.dodge_duration > 0.0) {
            return Err(ConfigError::DodgeDuration(self.dodge_duration));
        }
        if !(self.dodge_cooldown.is_finite() && self.dodge_cooldown >= 0.0) {
            return Err(ConfigError::DodgeCooldown(self.dodge_cooldown));
        }
        if !(self.probe_radius.is_finite() && self.probe_radius >= 0.0) {
            return Err(ConfigError::ProbeRadius(self.probe_radius));
        }
        Ok(())
    }
}

/// The facing basis supplied by the orientation/camera collaborator.
///
/// Stores a planar forward/right vector pair used to map planar input into
/// world space. The controller does not care how the basis is derived from
/// mouse look; the camera layer updates it (e.g. via [`FacingBasis::set_yaw`])
/// and the controller only reads it.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FacingBasis {
    forward: Vec3,
    right: Vec3,
}

impl Default for FacingBasis {
    fn default() -> Self {
        Self {
            forward: Vec3::NEG_Z,
            right: Vec3::X,
        }
    }
}

impl FacingBasis {
    /// Create a basis from a forward direction.
    ///
    /// The vector is flattened onto the ground plane and normalized; a
    /// degenerate input falls back to the default basis.
    pub fn new(forward: Vec3) -> Self {
        let planar = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        if planar == Vec3::ZERO {
            return Self::default();
        }
        Self {
            forward: planar,
            right: planar.cross(Vec3::Y).normalize(),
        }
    }

    /// Create a basis from a yaw angle (radians about the up axis; zero
    /// faces `-Z`).
    pub fn from_yaw(yaw: f32) -> Self {
        Self::new(Quat::from_rotation_y(yaw) * Vec3::NEG_Z)
    }

    /// The planar forward direction.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// The planar right direction.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Update the basis from a new forward direction.
    pub fn set_forward(&mut self, forward: Vec3) {
        *self = Self::new(forward);
    }

    /// Update the basis from a yaw angle.
    pub fn set_yaw(&mut self, yaw: f32) {
        *self = Self::from_yaw(yaw);
    }

    /// Map planar intent (`x` = lateral, `y` = forward) into a world-space
    /// movement direction with the vertical component zeroed.
    ///
    /// The result is not normalized; its magnitude follows the intent
    /// magnitude (clamped to 1 by [`crate::intent::MoveIntent`]).
    pub fn world_direction(&self, intent: Vec2) -> Vec3 {
        let dir = self.forward * intent.y + self.right * intent.x;
        Vec3::new(dir.x, 0.0, dir.z)
    }
}

/// Smoothed visual facing for the display layer.
///
/// The control-frame chain spherically interpolates this rotation toward the
/// current movement heading; the mesh/display layer applies it to whatever
/// transform it owns. The controller never rotates the physics body itself
/// (its rotation is locked).
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MeshFacing {
    /// Current smoothed facing rotation (yaw about the up axis).
    pub rotation: Quat,
}

impl Default for MeshFacing {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
        }
    }
}
