//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the locomotion controller. This allows easy swapping
//! between physics engines (Avian3D, Rapier, custom, etc.).

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the locomotion
/// controller. The backend exposes the rigid-body handle operations the
/// controller needs (velocity access, impulses, acceleration-mode forces)
/// and registers its own ground sensing systems through [`Self::plugin`],
/// in [`crate::FixedStepSet::Sensors`], writing the result into each
/// controller's [`crate::detection::GroundState`].
///
/// For an example implementation, see the `avian` module's `Avian3dBackend`
/// which implements this trait for Avian3D.
pub trait LocomotionPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    ///
    /// The plugin must register a ground sensing system in
    /// [`crate::FixedStepSet::Sensors`] so the sphere probe runs before any
    /// force application within a physics step.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an instantaneous impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum; backends divide by
    /// body mass to produce the velocity change.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Apply a continuous acceleration-mode force to an entity.
    ///
    /// The force is mass-independent and integrated over the fixed
    /// timestep: `velocity += force * dt`.
    fn apply_force(world: &mut World, entity: Entity, force: Vec3);

    /// Get the current world-space position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
