//! Avian3D physics backend implementation.
//!
//! Enable with the `avian3d` feature. The backend provides the rigid-body
//! handle operations and registers the sphere-probe ground sensing system
//! in [`crate::FixedStepSet::Sensors`]. Controller bodies get backend
//! gravity disabled and rotation locked; gravity is owned by the
//! controller while airborne.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::backend::LocomotionPhysicsBackend;
use crate::config::ControllerConfig;
use crate::detection::{GroundState, ProbeHit};
use crate::FixedStepSet;

/// Avian3D backend for the locomotion controller.
///
/// Velocity access goes through [`LinearVelocity`]; impulses divide by
/// [`ComputedMass`]; acceleration-mode forces are integrated directly over
/// the fixed timestep. Ground sensing uses [`SpatialQuery`] shape casts,
/// which are only reachable as a system parameter, so the probe lives in
/// [`Avian3dBackendPlugin`] rather than on the trait.
pub struct Avian3dBackend;

impl LocomotionPhysicsBackend for Avian3dBackend {
    fn plugin() -> impl Plugin {
        Avian3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<LinearVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<LinearVelocity>(entity) {
            vel.0 = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        // Impulse = mass * delta_v
        let mass = get_mass(world, entity);
        if mass <= 0.0 {
            return;
        }
        let delta_v = impulse / mass;
        if let Some(mut vel) = world.get_mut::<LinearVelocity>(entity) {
            vel.0 += delta_v;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
        // Acceleration-mode: mass-independent, integrated over the fixed step
        let dt = Self::get_fixed_timestep(world);
        if let Some(mut vel) = world.get_mut::<LinearVelocity>(entity) {
            vel.0 += force * dt;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Position>(entity)
            .map(|p| p.0)
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation))
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
            .unwrap_or(Vec3::ZERO)
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

fn get_mass(world: &World, entity: Entity) -> f32 {
    let Some(computed_mass) = world.get::<ComputedMass>(entity) else {
        return 0.0;
    };
    let mass = computed_mass.value();
    if mass <= 0.0 || !mass.is_finite() {
        return 0.0;
    }
    mass
}

/// Plugin registering the Avian-specific controller systems.
pub struct Avian3dBackendPlugin;

impl Plugin for Avian3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (configure_controller_bodies, avian_ground_probe)
                .chain()
                .in_set(FixedStepSet::Sensors),
        );
    }
}

/// Prepare freshly added controller bodies for floating locomotion.
///
/// Backend gravity is disabled (the controller owns gravity while
/// airborne) and rotation is locked so collisions can never tip the body;
/// visual rotation lives on the display layer's transform instead.
fn configure_controller_bodies(
    mut commands: Commands,
    q_new: Query<Entity, (Added<ControllerConfig>, With<RigidBody>)>,
) {
    for entity in &q_new {
        commands
            .entity(entity)
            .insert((GravityScale(0.0), LockedAxes::ROTATION_LOCKED));
    }
}

/// Downward sphere probe, once per physics step per controller.
///
/// Casts a sphere of `probe_radius` from the body origin down to
/// `float_height + probe_reach`, filtered by `probe_mask` and excluding
/// the caster. The result is classified into [`GroundState`] before any
/// force system runs. A disabled probe classifies as airborne every step.
fn avian_ground_probe(
    spatial_query: SpatialQuery,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &ControllerConfig,
        &mut GroundState,
    )>,
) {
    for (entity, transform, config, mut ground) in &mut q_controllers {
        if !config.probe_enabled() {
            *ground = GroundState::airborne();
            continue;
        }

        let origin = transform.translation();
        let shape = Collider::sphere(config.probe_radius);
        let filter = SpatialQueryFilter::from_mask(config.probe_mask)
            .with_excluded_entities([entity]);
        let cast_config = ShapeCastConfig::from_max_distance(config.probe_distance());

        let hit = spatial_query
            .cast_shape(
                &shape,
                origin,
                Quat::IDENTITY,
                Dir3::NEG_Y,
                &cast_config,
                &filter,
            )
            .map(|hit| ProbeHit::new(hit.distance, hit.normal1, Some(hit.entity)));

        *ground = GroundState::classify(hit, config.float_height);
    }
}
