//! Core controller systems.
//!
//! These systems implement the floating locomotion behavior across the two
//! clocks. The fixed-step chain (ground sensing by the backend, float
//! stabilization, gravity, jump, horizontal movement, landing) runs on the
//! physics clock; the control chain (edge latching, dodge timers, dodge
//! trigger, facing smoothing, animation flags) runs on the frame clock.
//! Force-applying systems are generic over the physics backend.

use bevy::prelude::*;
use log::{debug, trace};

use crate::animation::AnimationFlags;
use crate::backend::LocomotionPhysicsBackend;
use crate::config::{ConfigError, ControllerConfig, FacingBasis, MeshFacing};
use crate::detection::GroundState;
use crate::intent::MoveIntent;
use crate::stabilizer::{finite_or_zero_vec, vertical_spring_force};
use crate::state::{Airborne, Grounded, LocomotionState};
use crate::timing::{DodgeClock, DodgeTick};

/// Fatal setup check, run once per controller entity.
///
/// Missing or malformed configuration is not recoverable at runtime, so it
/// panics here rather than degrading per frame.
pub fn validate_controller_setup(
    q_new: Query<(Entity, &ControllerConfig, Has<FacingBasis>), Added<ControllerConfig>>,
) {
    for (entity, config, has_basis) in &q_new {
        if let Err(err) = config.validate() {
            panic!("locomotion setup error on {entity:?}: {err}");
        }
        if !has_basis {
            panic!(
                "locomotion setup error on {entity:?}: {}",
                ConfigError::MissingFacingBasis
            );
        }
    }
}

/// Latch rising edges of the held jump/dodge buttons into one-shot requests.
///
/// Runs at the start of the control chain, after the user's input sampling
/// systems have written [`MoveIntent`].
pub fn latch_intent_edges(mut q_intents: Query<&mut MoveIntent>) {
    for mut intent in &mut q_intents {
        intent.latch_edges();
    }
}

/// Apply the float spring force to maintain the float height.
///
/// `force = (float_height - distance) * spring_strength
///          - vertical_velocity * spring_damping`,
/// applied as an acceleration-mode force along the up axis. Suspended
/// entirely while Jumping so the spring cannot fight the jump impulse; it
/// resumes the physics step after landing.
pub fn apply_float_spring<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, ControllerConfig, LocomotionState, GroundState)> = world
        .query::<(
            Entity,
            &ControllerConfig,
            &LocomotionState,
            &GroundState,
        )>()
        .iter(world)
        .map(|(e, config, state, ground)| (e, *config, *state, *ground))
        .collect();

    for (entity, config, state, ground) in entities {
        if state.is_jumping() {
            continue;
        }
        // A probe miss is the valid airborne state; nothing to stabilize.
        let Some(hit) = ground.hit else {
            continue;
        };

        let velocity = B::get_velocity(world, entity);
        let force = vertical_spring_force(
            config.float_height,
            hit.distance,
            velocity.y,
            config.spring_strength,
            config.spring_damping,
        );
        B::apply_force(world, entity, Vec3::Y * force);
    }
}

/// Apply controller-owned gravity while airborne.
///
/// Backend gravity is disabled on controller bodies; this keeps fall
/// behavior a designer-tunable of the controller itself.
pub fn apply_gravity<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, ControllerConfig, GroundState)> = world
        .query::<(Entity, &ControllerConfig, &GroundState)>()
        .iter(world)
        .map(|(e, config, ground)| (e, *config, *ground))
        .collect();

    let dt = B::get_fixed_timestep(world);

    for (entity, config, ground) in entities {
        if ground.grounded {
            continue;
        }
        let velocity = B::get_velocity(world, entity);
        B::set_velocity(world, entity, velocity + Vec3::Y * config.gravity * dt);
    }
}

/// Consume pending jump requests.
///
/// `Grounded -> Jumping`: zero the vertical velocity, apply the upward
/// impulse, mark the body airborne. A request with unmet preconditions is
/// consumed and silently dropped.
pub fn apply_jump<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (
            With<MoveIntent>,
            With<ControllerConfig>,
            With<LocomotionState>,
            With<GroundState>,
        )>()
        .iter(world)
        .collect();

    for entity in entities {
        let Some(mut intent) = world.get_mut::<MoveIntent>(entity) else {
            continue;
        };
        if !intent.take_jump_request() {
            continue;
        }

        let Some(config) = world.get::<ControllerConfig>(entity).copied() else {
            continue;
        };
        let grounded = world
            .get::<GroundState>(entity)
            .is_some_and(|g| g.grounded);

        let mut jumped = false;
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            jumped = state.begin_jump(grounded);
        }
        if !jumped {
            trace!("jump request dropped for {entity:?} (preconditions unmet)");
            continue;
        }

        // Reset vertical velocity so back-to-back steps can't stack height,
        // then launch.
        let velocity = B::get_velocity(world, entity);
        B::set_velocity(world, entity, Vec3::new(velocity.x, 0.0, velocity.z));
        B::apply_impulse(world, entity, Vec3::Y * config.jump_impulse);

        if let Some(mut ground) = world.get_mut::<GroundState>(entity) {
            ground.grounded = false;
        }
        if let Some(mut flags) = world.get_mut::<AnimationFlags>(entity) {
            flags.is_jumping = true;
        }
        debug!("jump started for {entity:?}");
    }
}

/// Apply planar movement from intent, suspended while Dodging.
///
/// Builds a world-space direction from intent rotated into the facing
/// basis, projects it onto the slope plane when standing on a walkable
/// slope, scales by `move_speed`, and writes it as a velocity change that
/// preserves the vertical component.
pub fn apply_horizontal_movement<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<(
        Entity,
        ControllerConfig,
        FacingBasis,
        LocomotionState,
        GroundState,
        Vec2,
    )> = world
        .query::<(
            Entity,
            &ControllerConfig,
            &FacingBasis,
            &LocomotionState,
            &GroundState,
            &MoveIntent,
        )>()
        .iter(world)
        .map(|(e, config, basis, state, ground, intent)| {
            (e, *config, *basis, *state, *ground, intent.planar())
        })
        .collect();

    for (entity, config, basis, state, ground, planar) in entities {
        if state.is_dodging() {
            continue;
        }

        let direction = basis.world_direction(planar);
        let desired = if direction.length_squared() < 1e-6 {
            Vec3::ZERO
        } else {
            let mut dir = direction.normalize();
            if ground.on_slope(config.slope_limit) {
                // Best-effort slope handling: slide along the surface
                // instead of driving into it.
                let normal = ground.normal().normalize_or_zero();
                dir = (dir - normal * dir.dot(normal)).normalize_or_zero();
            }
            finite_or_zero_vec(dir * config.move_speed)
        };

        let current = B::get_velocity(world, entity);
        B::set_velocity(
            world,
            entity,
            Vec3::new(desired.x, current.y, desired.z),
        );
    }
}

/// `Jumping -> Grounded` once the probe reports ground again.
///
/// The guard on vertical velocity keeps the probe, which still overlaps
/// ground on the step right after the impulse, from cancelling the jump
/// before the body has actually risen and come back down.
pub fn settle_landing<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionState, GroundState)> = world
        .query::<(Entity, &LocomotionState, &GroundState)>()
        .iter(world)
        .map(|(e, state, ground)| (e, *state, *ground))
        .collect();

    for (entity, state, ground) in entities {
        if !state.is_jumping() || !ground.grounded {
            continue;
        }
        let velocity = B::get_velocity(world, entity);
        if velocity.y > 0.0 {
            continue;
        }
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.land();
            debug!("landed {entity:?}");
        }
    }
}

/// Sync the `Grounded`/`Airborne` marker components from ground sensing.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &GroundState, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, ground, has_grounded, has_airborne) in &q_controllers {
        if ground.grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !ground.grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>().insert(Airborne);
        } else if !ground.grounded && !has_airborne {
            commands.entity(entity).insert(Airborne);
        }
    }
}

/// Advance the dodge window and cooldown on the control-frame clock.
///
/// The window ending restores the interrupted mode; the cooldown ending
/// releases the dodge lock exactly once.
pub fn tick_dodge_timers(
    time: Res<Time>,
    mut q_clocks: Query<(Entity, &mut DodgeClock, &mut LocomotionState, &ControllerConfig)>,
) {
    let delta = time.delta();
    for (entity, mut clock, mut state, config) in &mut q_clocks {
        match clock.tick(delta, config.dodge_cooldown) {
            DodgeTick::WindowFinished => {
                state.end_dodge();
                debug!("dodge window complete for {entity:?}");
            }
            DodgeTick::CooldownFinished => {
                state.unlock_dodge();
                debug!("dodge cooldown elapsed for {entity:?}");
            }
            _ => {}
        }
    }
}

/// Consume pending dodge requests.
///
/// Requires the cooldown to have elapsed, no dodge in progress, and
/// non-zero planar intent; otherwise the request is consumed and silently
/// dropped. On success the planar velocity is set directly to the dodge
/// speed along the intent direction (vertical component preserved) and the
/// dodge clock is armed.
pub fn trigger_dodge<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (
            With<MoveIntent>,
            With<ControllerConfig>,
            With<FacingBasis>,
            With<LocomotionState>,
            With<DodgeClock>,
        )>()
        .iter(world)
        .collect();

    for entity in entities {
        let Some(mut intent) = world.get_mut::<MoveIntent>(entity) else {
            continue;
        };
        if !intent.take_dodge_request() {
            continue;
        }
        let planar = intent.planar();
        let has_intent = intent.is_active();

        let Some(config) = world.get::<ControllerConfig>(entity).copied() else {
            continue;
        };
        let Some(basis) = world.get::<FacingBasis>(entity).copied() else {
            continue;
        };

        let mut started = false;
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            started = state.begin_dodge(has_intent);
        }
        if !started {
            trace!("dodge request dropped for {entity:?} (preconditions unmet)");
            continue;
        }

        let direction =
            finite_or_zero_vec(basis.world_direction(planar).normalize_or_zero());
        let dodge_velocity = direction * config.dodge_speed;
        let current = B::get_velocity(world, entity);
        B::set_velocity(
            world,
            entity,
            Vec3::new(dodge_velocity.x, current.y, dodge_velocity.z),
        );

        if let Some(mut clock) = world.get_mut::<DodgeClock>(entity) {
            clock.start(config.dodge_duration);
        }
        debug!("dodge started for {entity:?}");
    }
}

/// Yaw rotation looking along a planar direction.
///
/// `None` for a zero direction, which prevents snapping to an undefined
/// heading at zero input.
pub fn heading_rotation(direction: Vec3) -> Option<Quat> {
    let planar = Vec3::new(direction.x, 0.0, direction.z);
    if planar.length_squared() < 1e-6 {
        return None;
    }
    Some(Quat::from_rotation_y(f32::atan2(-planar.x, -planar.z)))
}

/// Smooth the visual facing toward the movement heading.
///
/// Spherical interpolation at `rotation_speed`, only when the movement
/// direction is non-zero, and not while the dodge velocity owns movement.
pub fn smooth_facing(
    time: Res<Time>,
    mut q_facings: Query<(
        &MoveIntent,
        &FacingBasis,
        &ControllerConfig,
        &LocomotionState,
        &mut MeshFacing,
    )>,
) {
    let dt = time.delta_secs();
    for (intent, basis, config, state, mut facing) in &mut q_facings {
        if state.is_dodging() {
            continue;
        }
        let Some(target) = heading_rotation(basis.world_direction(intent.planar())) else {
            continue;
        };
        let t = (config.rotation_speed * dt).clamp(0.0, 1.0);
        facing.rotation = facing.rotation.slerp(target, t);
    }
}

/// Publish animation flags to the display layer, once per control frame.
pub fn publish_animation_flags<B: LocomotionPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, bool, bool, Vec2)> = world
        .query::<(Entity, &GroundState, &LocomotionState, &MoveIntent)>()
        .iter(world)
        .map(|(e, ground, state, intent)| {
            (e, ground.grounded, state.is_jumping(), intent.planar())
        })
        .collect();

    for (entity, grounded, jumping, input) in entities {
        let velocity = B::get_velocity(world, entity);
        let planar_speed = Vec3::new(velocity.x, 0.0, velocity.z).length();
        if let Some(mut flags) = world.get_mut::<AnimationFlags>(entity) {
            flags.refresh(planar_speed, grounded, jumping, input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoOpBackendPlugin;
    use crate::detection::ProbeHit;
    use approx::assert_relative_eq;

    #[derive(Component, Default)]
    struct TestVelocity(Vec3);

    /// Accumulated acceleration-mode forces, inspected instead of integrated.
    #[derive(Component, Default)]
    struct TestForces(Vec3);

    struct TestBackend;

    impl LocomotionPhysicsBackend for TestBackend {
        fn plugin() -> impl Plugin {
            NoOpBackendPlugin
        }

        fn get_velocity(world: &World, entity: Entity) -> Vec3 {
            world
                .get::<TestVelocity>(entity)
                .map(|v| v.0)
                .unwrap_or(Vec3::ZERO)
        }

        fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
            if let Some(mut v) = world.get_mut::<TestVelocity>(entity) {
                v.0 = velocity;
            }
        }

        fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
            // Unit mass: impulse is a direct velocity change
            if let Some(mut v) = world.get_mut::<TestVelocity>(entity) {
                v.0 += impulse;
            }
        }

        fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
            if let Some(mut f) = world.get_mut::<TestForces>(entity) {
                f.0 += force;
            }
        }

        fn get_position(world: &World, entity: Entity) -> Vec3 {
            world
                .get::<Transform>(entity)
                .map(|t| t.translation)
                .unwrap_or(Vec3::ZERO)
        }

        fn get_fixed_timestep(_world: &World) -> f32 {
            1.0 / 60.0
        }
    }

    fn grounded_at(distance: f32) -> GroundState {
        GroundState::classify(Some(ProbeHit::new(distance, Vec3::Y, None)), 1.0)
    }

    fn spawn_body(world: &mut World, ground: GroundState) -> Entity {
        world
            .spawn((
                ControllerConfig::default(),
                FacingBasis::default(),
                MoveIntent::new(),
                LocomotionState::new(),
                DodgeClock::new(),
                AnimationFlags::default(),
                ground,
                TestVelocity::default(),
                TestForces::default(),
            ))
            .id()
    }

    fn velocity(world: &World, entity: Entity) -> Vec3 {
        world.get::<TestVelocity>(entity).unwrap().0
    }

    fn forces(world: &World, entity: Entity) -> Vec3 {
        world.get::<TestForces>(entity).unwrap().0
    }

    // ==================== Float spring ====================

    #[test]
    fn spring_pushes_up_below_float_height() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.8));

        apply_float_spring::<TestBackend>(&mut world);

        // (1.0 - 0.8) * 500 = 100
        assert_relative_eq!(forces(&world, body).y, 100.0, epsilon = 1e-4);
    }

    #[test]
    fn spring_balances_against_upward_velocity() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.8));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(0.0, 2.0, 0.0);

        apply_float_spring::<TestBackend>(&mut world);

        // (1.0 - 0.8) * 500 - 2.0 * 50 = 0
        assert_relative_eq!(forces(&world, body).y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn spring_pulls_down_above_float_height() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(1.3));

        apply_float_spring::<TestBackend>(&mut world);

        assert!(forces(&world, body).y < 0.0);
    }

    #[test]
    fn spring_suppressed_while_jumping() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.5));
        assert!(world
            .get_mut::<LocomotionState>(body)
            .unwrap()
            .begin_jump(true));

        apply_float_spring::<TestBackend>(&mut world);

        assert_eq!(forces(&world, body), Vec3::ZERO);
    }

    #[test]
    fn spring_skipped_on_probe_miss() {
        let mut world = World::new();
        let body = spawn_body(&mut world, GroundState::airborne());

        apply_float_spring::<TestBackend>(&mut world);

        assert_eq!(forces(&world, body), Vec3::ZERO);
    }

    // ==================== Gravity ====================

    #[test]
    fn gravity_applies_only_while_airborne() {
        let mut world = World::new();
        let airborne = spawn_body(&mut world, GroundState::airborne());
        let grounded = spawn_body(&mut world, grounded_at(0.9));

        apply_gravity::<TestBackend>(&mut world);

        // -20 * (1/60)
        assert_relative_eq!(velocity(&world, airborne).y, -20.0 / 60.0, epsilon = 1e-5);
        assert_eq!(velocity(&world, grounded).y, 0.0);
    }

    // ==================== Jump ====================

    fn request_jump(world: &mut World, body: Entity) {
        let mut intent = world.get_mut::<MoveIntent>(body).unwrap();
        intent.set_jump_pressed(true);
        intent.latch_edges();
    }

    #[test]
    fn jump_zeroes_vertical_then_launches() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(2.0, -1.5, 3.0);
        request_jump(&mut world, body);

        apply_jump::<TestBackend>(&mut world);

        let state = world.get::<LocomotionState>(body).unwrap();
        assert!(state.is_jumping());
        // Vertical reset to zero, then the 7.0 impulse
        assert_eq!(velocity(&world, body), Vec3::new(2.0, 7.0, 3.0));
        assert!(!world.get::<GroundState>(body).unwrap().grounded);
        assert!(world.get::<AnimationFlags>(body).unwrap().is_jumping);
    }

    #[test]
    fn spring_stays_suppressed_on_the_step_after_jump() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        request_jump(&mut world, body);

        apply_jump::<TestBackend>(&mut world);
        apply_float_spring::<TestBackend>(&mut world);

        assert_eq!(forces(&world, body), Vec3::ZERO);
    }

    #[test]
    fn jump_dropped_while_airborne() {
        let mut world = World::new();
        let body = spawn_body(&mut world, GroundState::airborne());
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(1.0, -4.0, 0.0);
        request_jump(&mut world, body);

        apply_jump::<TestBackend>(&mut world);

        assert!(!world.get::<LocomotionState>(body).unwrap().is_jumping());
        // Velocity untouched, request consumed rather than queued
        assert_eq!(velocity(&world, body), Vec3::new(1.0, -4.0, 0.0));
        assert!(!world.get::<MoveIntent>(body).unwrap().has_jump_request());
    }

    #[test]
    fn jump_dropped_while_already_jumping() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        request_jump(&mut world, body);
        apply_jump::<TestBackend>(&mut world);
        let after_first = velocity(&world, body);

        // Second request while airborne-by-jump
        {
            let mut intent = world.get_mut::<MoveIntent>(body).unwrap();
            intent.set_jump_pressed(false);
            intent.latch_edges();
        }
        request_jump(&mut world, body);
        apply_jump::<TestBackend>(&mut world);

        assert_eq!(velocity(&world, body), after_first);
    }

    // ==================== Horizontal movement ====================

    #[test]
    fn movement_sets_planar_velocity_and_preserves_vertical() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(0.0, -3.0, 0.0);
        world
            .get_mut::<MoveIntent>(body)
            .unwrap()
            .set_planar(Vec2::new(1.0, 0.0));

        apply_horizontal_movement::<TestBackend>(&mut world);

        // Pure lateral input maps onto the right axis at move_speed
        let v = velocity(&world, body);
        assert_relative_eq!(v.x, 6.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, -3.0);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn planar_speed_never_exceeds_move_speed() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        for input in [
            Vec2::new(1.0, 1.0),
            Vec2::new(0.2, 0.1),
            Vec2::new(-0.7, 0.7),
            Vec2::new(0.0, -1.0),
        ] {
            world.get_mut::<MoveIntent>(body).unwrap().set_planar(input);
            apply_horizontal_movement::<TestBackend>(&mut world);
            let v = velocity(&world, body);
            let planar = Vec3::new(v.x, 0.0, v.z).length();
            assert!(planar <= 6.0 + 1e-4, "input {input} gave planar {planar}");
        }
    }

    #[test]
    fn movement_zero_input_zeroes_planar_velocity() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(4.0, -2.0, 1.0);

        apply_horizontal_movement::<TestBackend>(&mut world);

        assert_eq!(velocity(&world, body), Vec3::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn movement_suspended_while_dodging() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(10.0, 0.0, 0.0);
        assert!(world
            .get_mut::<LocomotionState>(body)
            .unwrap()
            .begin_dodge(true));
        world
            .get_mut::<MoveIntent>(body)
            .unwrap()
            .set_planar(Vec2::new(0.0, 1.0));

        apply_horizontal_movement::<TestBackend>(&mut world);

        // Dodge velocity is left alone
        assert_eq!(velocity(&world, body), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn movement_projects_onto_walkable_slope() {
        let mut world = World::new();
        // ~26.6 degree slope rising toward -Z
        let normal = Vec3::new(0.0, 2.0, 1.0).normalize();
        let ground = GroundState::classify(Some(ProbeHit::new(0.9, normal, None)), 1.0);
        let body = spawn_body(&mut world, ground);
        world
            .get_mut::<MoveIntent>(body)
            .unwrap()
            .set_planar(Vec2::new(0.0, 1.0));

        apply_horizontal_movement::<TestBackend>(&mut world);

        let v = velocity(&world, body);
        let planar = Vec3::new(v.x, 0.0, v.z).length();
        // Projection shortens the planar component below full speed
        assert!(planar < 6.0);
        assert!(planar > 4.0);
        assert!(v.z < 0.0);
    }

    // ==================== Landing ====================

    #[test]
    fn landing_clears_jump_when_descending() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        assert!(world
            .get_mut::<LocomotionState>(body)
            .unwrap()
            .begin_jump(true));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(0.0, -0.5, 0.0);

        settle_landing::<TestBackend>(&mut world);

        assert!(!world.get::<LocomotionState>(body).unwrap().is_jumping());
    }

    #[test]
    fn landing_guard_ignores_ascending_body() {
        let mut world = World::new();
        // Probe still overlaps ground right after the impulse
        let body = spawn_body(&mut world, grounded_at(0.9));
        assert!(world
            .get_mut::<LocomotionState>(body)
            .unwrap()
            .begin_jump(true));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(0.0, 6.5, 0.0);

        settle_landing::<TestBackend>(&mut world);

        assert!(world.get::<LocomotionState>(body).unwrap().is_jumping());
    }

    // ==================== Dodge ====================

    fn request_dodge(world: &mut World, body: Entity, planar: Vec2) {
        let mut intent = world.get_mut::<MoveIntent>(body).unwrap();
        intent.set_planar(planar);
        intent.set_dodge_pressed(true);
        intent.latch_edges();
    }

    #[test]
    fn dodge_sets_planar_velocity_preserving_vertical() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(0.0, -2.0, 0.0);
        request_dodge(&mut world, body, Vec2::new(1.0, 0.0));

        trigger_dodge::<TestBackend>(&mut world);

        // Pure lateral dodge at dodge_speed, vertical untouched
        let v = velocity(&world, body);
        assert_relative_eq!(v.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, -2.0);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-5);

        let state = world.get::<LocomotionState>(body).unwrap();
        assert!(state.is_dodging());
        assert!(!state.can_dodge());
        assert!(world.get::<DodgeClock>(body).unwrap().window().is_some());
    }

    #[test]
    fn dodge_dropped_on_zero_intent() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        request_dodge(&mut world, body, Vec2::ZERO);

        trigger_dodge::<TestBackend>(&mut world);

        let state = world.get::<LocomotionState>(body).unwrap();
        assert!(!state.is_dodging());
        assert!(state.can_dodge());
        assert!(!world.get::<MoveIntent>(body).unwrap().has_dodge_request());
    }

    #[test]
    fn dodge_dropped_while_locked() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        {
            let mut state = world.get_mut::<LocomotionState>(body).unwrap();
            assert!(state.begin_dodge(true));
            state.end_dodge();
            // Cooldown still running: can_dodge is false
        }
        request_dodge(&mut world, body, Vec2::new(0.0, 1.0));

        trigger_dodge::<TestBackend>(&mut world);

        assert!(!world.get::<LocomotionState>(body).unwrap().is_dodging());
        assert_eq!(velocity(&world, body), Vec3::ZERO);
    }

    #[test]
    fn dodge_normalizes_partial_input() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        request_dodge(&mut world, body, Vec2::new(0.3, 0.0));

        trigger_dodge::<TestBackend>(&mut world);

        // Dodge always fires at full dodge_speed
        let v = velocity(&world, body);
        assert_relative_eq!(
            Vec3::new(v.x, 0.0, v.z).length(),
            10.0,
            epsilon = 1e-4
        );
    }

    // ==================== Control-frame systems via App ====================

    fn control_app() -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app
    }

    fn advance(app: &mut App, seconds: f32) {
        app.world_mut()
            .resource_mut::<Time<()>>()
            .advance_by(std::time::Duration::from_secs_f32(seconds));
        app.update();
    }

    #[test]
    fn dodge_window_then_cooldown_via_timers() {
        let mut app = control_app();
        app.add_systems(Update, tick_dodge_timers);

        let body = spawn_body(app.world_mut(), grounded_at(0.9));
        {
            let world = app.world_mut();
            assert!(world
                .get_mut::<LocomotionState>(body)
                .unwrap()
                .begin_dodge(true));
            world
                .get_mut::<DodgeClock>(body)
                .unwrap()
                .start(0.2);
        }

        // Mid-window
        advance(&mut app, 0.1);
        assert!(app.world().get::<LocomotionState>(body).unwrap().is_dodging());

        // Window elapses, cooldown starts
        advance(&mut app, 0.15);
        let state = app.world().get::<LocomotionState>(body).unwrap();
        assert!(!state.is_dodging());
        assert!(!state.can_dodge());

        // Cooldown elapses, lock releases
        advance(&mut app, 1.1);
        assert!(app.world().get::<LocomotionState>(body).unwrap().can_dodge());
    }

    #[test]
    fn markers_track_ground_classification() {
        let mut app = App::new();
        app.add_systems(Update, sync_state_markers);

        let body = spawn_body(app.world_mut(), grounded_at(0.9));
        app.update();
        assert!(app.world().get::<Grounded>(body).is_some());
        assert!(app.world().get::<Airborne>(body).is_none());

        *app.world_mut().get_mut::<GroundState>(body).unwrap() = GroundState::airborne();
        app.update();
        assert!(app.world().get::<Grounded>(body).is_none());
        assert!(app.world().get::<Airborne>(body).is_some());
    }

    #[test]
    fn heading_rotation_zero_direction_is_none() {
        assert_eq!(heading_rotation(Vec3::ZERO), None);
        assert_eq!(heading_rotation(Vec3::new(0.0, 5.0, 0.0)), None);
    }

    #[test]
    fn heading_rotation_faces_direction() {
        let rot = heading_rotation(Vec3::NEG_Z).unwrap();
        assert!(rot.angle_between(Quat::IDENTITY) < 1e-5);

        let rot = heading_rotation(Vec3::X).unwrap();
        let faced = rot * Vec3::NEG_Z;
        assert_relative_eq!(faced.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(faced.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn facing_smooths_toward_heading() {
        let mut app = control_app();
        app.add_systems(Update, smooth_facing);

        let body = spawn_body(app.world_mut(), grounded_at(0.9));
        app.world_mut()
            .get_mut::<MoveIntent>(body)
            .unwrap()
            .set_planar(Vec2::new(1.0, 0.0));
        app.world_mut().entity_mut(body).insert(MeshFacing::default());

        let target = heading_rotation(Vec3::X).unwrap();
        let before = MeshFacing::default()
            .rotation
            .angle_between(target);

        advance(&mut app, 0.05);

        let facing = app.world().get::<MeshFacing>(body).unwrap();
        let after = facing.rotation.angle_between(target);
        assert!(after < before, "facing did not move toward heading");
    }

    #[test]
    fn facing_untouched_at_zero_input() {
        let mut app = control_app();
        app.add_systems(Update, smooth_facing);

        let body = spawn_body(app.world_mut(), grounded_at(0.9));
        let start = Quat::from_rotation_y(1.2);
        app.world_mut()
            .entity_mut(body)
            .insert(MeshFacing { rotation: start });

        advance(&mut app, 0.1);

        let facing = app.world().get::<MeshFacing>(body).unwrap();
        assert!(facing.rotation.angle_between(start) < 1e-6);
    }

    #[test]
    fn animation_flags_published_from_velocity_and_state() {
        let mut world = World::new();
        let body = spawn_body(&mut world, grounded_at(0.9));
        world.get_mut::<TestVelocity>(body).unwrap().0 = Vec3::new(3.0, -5.0, 0.0);
        world
            .get_mut::<MoveIntent>(body)
            .unwrap()
            .set_planar(Vec2::new(0.5, -0.5));

        publish_animation_flags::<TestBackend>(&mut world);

        let flags = world.get::<AnimationFlags>(body).unwrap();
        assert!(flags.is_running);
        assert!(flags.is_grounded);
        assert!(!flags.is_jumping);
        assert_relative_eq!(flags.lateral, 0.5);
        assert_relative_eq!(flags.forward, -0.5);
    }

    // ==================== Setup validation ====================

    #[test]
    #[should_panic(expected = "locomotion setup error")]
    fn invalid_config_is_fatal() {
        let mut app = App::new();
        app.add_systems(Update, validate_controller_setup);
        app.world_mut().spawn((
            ControllerConfig::default().with_float_height(-1.0),
            FacingBasis::default(),
        ));
        app.update();
    }

    #[test]
    #[should_panic(expected = "missing a FacingBasis")]
    fn missing_facing_basis_is_fatal() {
        let mut app = App::new();
        app.add_systems(Update, validate_controller_setup);
        app.world_mut().spawn(ControllerConfig::default());
        app.update();
    }

    #[test]
    fn valid_setup_passes() {
        let mut app = App::new();
        app.add_systems(Update, validate_controller_setup);
        app.world_mut()
            .spawn((ControllerConfig::default(), FacingBasis::default()));
        app.update();
    }
}
