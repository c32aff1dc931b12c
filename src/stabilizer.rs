//! Float stabilizer math.
//!
//! Pure spring-damper computation for the vertical corrective force that
//! keeps the body at its float height. The sign and subtraction order are
//! load-bearing: spring strength and damping are independently tunable, and
//! flipping either sign turns the stabilizer into an oscillator or sinks
//! the body.

use bevy::prelude::*;

/// Compute the vertical corrective force for the float stabilizer.
///
/// `force = (float_height - distance_to_ground) * spring_strength
///          - vertical_velocity * spring_damping`
///
/// Positive when the body sits below the target height (pushes up); the
/// damping term opposes vertical velocity to prevent oscillation. The
/// result is applied as an acceleration-mode force along the body's up
/// axis. Non-finite results clamp to zero rather than corrupting the
/// body's velocity.
pub fn vertical_spring_force(
    float_height: f32,
    distance_to_ground: f32,
    vertical_velocity: f32,
    spring_strength: f32,
    spring_damping: f32,
) -> f32 {
    let force =
        (float_height - distance_to_ground) * spring_strength - vertical_velocity * spring_damping;
    finite_or_zero(force)
}

/// Clamp a non-finite scalar to zero.
#[inline]
pub fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp a vector with any non-finite component to zero.
///
/// Used wherever a zero-length normalize could leak NaN into the body's
/// velocity.
#[inline]
pub fn finite_or_zero_vec(value: Vec3) -> Vec3 {
    if value.is_finite() {
        value
    } else {
        Vec3::ZERO
    }
}
