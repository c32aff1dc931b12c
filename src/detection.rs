//! Ground sensing result structures.
//!
//! These structures hold the result of the per-physics-step ground probe:
//! a downward volumetric sphere cast classified into grounded/airborne
//! plus distance-to-ground and surface normal.

use bevy::prelude::*;

/// Information about a ground probe hit.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// Distance from the probe origin to the hit.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// Entity that was hit (if the backend reports one).
    pub entity: Option<Entity>,
}

impl ProbeHit {
    /// Create a probe hit.
    pub fn new(distance: f32, normal: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            entity,
        }
    }
}

/// Ground classification for one physics step.
///
/// Recomputed every physics step by the backend's sensing system, before any
/// force application; never carried across steps. A probe miss is the valid
/// airborne state, not an error.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct GroundState {
    /// Whether the body classified as grounded this step.
    pub grounded: bool,
    /// The probe hit, if any. Distance and normal are only meaningful when
    /// this is `Some`.
    pub hit: Option<ProbeHit>,
}

impl GroundState {
    /// The airborne state (probe miss or probe disabled).
    pub fn airborne() -> Self {
        Self::default()
    }

    /// Classify a probe result against the float height.
    ///
    /// Grounded iff the probe hit within the float height; a hit beyond the
    /// float height (within the probe's extra reach) still carries distance
    /// and normal for the stabilizer, but classifies as airborne.
    pub fn classify(hit: Option<ProbeHit>, float_height: f32) -> Self {
        let grounded = hit.is_some_and(|h| h.distance <= float_height);
        Self { grounded, hit }
    }

    /// Distance to ground, valid only when the probe hit.
    pub fn distance(&self) -> Option<f32> {
        self.hit.map(|h| h.distance)
    }

    /// Ground surface normal, defaulting to world up when airborne.
    pub fn normal(&self) -> Vec3 {
        self.hit.map_or(Vec3::Y, |h| h.normal)
    }

    /// Angle between world up and the ground normal, in radians. Zero when
    /// the probe missed.
    pub fn slope_angle(&self) -> f32 {
        match self.hit {
            Some(h) => h.normal.normalize_or_zero().dot(Vec3::Y).clamp(-1.0, 1.0).acos(),
            None => 0.0,
        }
    }

    /// Whether the body stands on a slope within the given limit.
    ///
    /// Flat ground (angle near zero) does not count; steeper-than-limit
    /// surfaces are treated as walls, not slopes.
    pub fn on_slope(&self, slope_limit: f32) -> bool {
        if !self.grounded {
            return false;
        }
        let angle = self.slope_angle();
        angle > 1e-3 && angle <= slope_limit
    }

    /// Float-height error for the stabilizer (positive = below target).
    /// Zero when the probe missed.
    pub fn height_error(&self, float_height: f32) -> f32 {
        self.distance().map_or(0.0, |d| float_height - d)
    }
}
