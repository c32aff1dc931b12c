//! # `floating_locomotion`
//!
//! A floating rigidbody locomotion controller with physics backend abstraction.
//!
//! This crate provides a responsive, tuneable locomotion controller that:
//! - Floats above ground using a spring-damper system
//! - Uses a volumetric sphere probe for ground classification
//! - Drives jump and dodge states through an explicit state machine
//! - Smooths visual facing toward the movement heading
//! - Abstracts the physics backend for easy swapping (Avian3D included)
//!
//! ## Architecture
//!
//! The controller uses a **floating rigidbody** approach where:
//! 1. A dynamic rigidbody (rotation locked) handles collisions normally
//! 2. A downward sphere probe classifies the body as grounded or airborne
//! 3. A spring-damper force maintains the configured float height
//! 4. Movement is applied as a planar velocity change that preserves the
//!    vertical component
//!
//! Two clocks drive the controller. The fixed-step physics chain (ground
//! sensing, float stabilization, gravity, jump, horizontal movement) runs in
//! [`FixedUpdate`]; the variable-step control chain (intent edge latching,
//! dodge timers, dodge trigger, facing smoothing, animation flags) runs in
//! [`Update`]. Within a physics step, ground classification always completes
//! before any force is applied.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use floating_locomotion::prelude::*;
//!
//! // Components for a floating character
//! let config = ControllerConfig::default();
//! let state = LocomotionState::new();
//! let intent = MoveIntent::default();
//! let basis = FacingBasis::default();
//!
//! // These are spawned as a bundle together with physics components
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod config;
pub mod detection;
pub mod intent;
pub mod stabilizer;
pub mod state;
pub mod systems;
pub mod timing;

#[cfg(feature = "avian3d")]
pub mod avian;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::AnimationFlags;
    pub use crate::backend::LocomotionPhysicsBackend;
    pub use crate::config::{ConfigError, ControllerConfig, FacingBasis, MeshFacing};
    pub use crate::detection::{GroundState, ProbeHit};
    pub use crate::intent::MoveIntent;
    pub use crate::state::{Airborne, Grounded, LocomotionMode, LocomotionState};
    pub use crate::timing::{DodgeClock, TimedAction};
    pub use crate::{ControlStepSet, FixedStepSet, FloatingLocomotionPlugin};

    #[cfg(feature = "avian3d")]
    pub use crate::avian::Avian3dBackend;
}

/// Phases of the fixed-step (physics clock) chain.
///
/// Backends register their ground sensing systems in [`FixedStepSet::Sensors`];
/// the core force systems run in the later phases. The sets are chained so
/// classification always precedes force application.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedStepSet {
    /// Ground probing and classification.
    Sensors,
    /// Float spring and controller gravity.
    Stabilization,
    /// Jump, horizontal movement, landing.
    Locomotion,
    /// Marker component sync.
    StateSync,
}

/// Phases of the variable-step (control clock) chain.
///
/// User input systems that write [`intent::MoveIntent`] should run before
/// [`ControlStepSet::Intent`].
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlStepSet {
    /// Setup validation and input edge latching.
    Intent,
    /// Dodge window and cooldown countdowns.
    Timers,
    /// Dodge trigger evaluation.
    Actions,
    /// Facing smoothing and animation flag publishing.
    Display,
}

/// Main plugin for the floating locomotion controller.
///
/// Generic over a physics backend `B` which provides the rigid-body handle
/// operations (velocity access, impulses, acceleration-mode forces) and
/// registers its own ground sensing systems.
///
/// # Examples
///
/// With the Avian3D backend (requires the `avian3d` feature):
/// ```rust,ignore
/// use bevy::prelude::*;
/// use avian3d::prelude::*;
/// use floating_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(PhysicsPlugins::default())
///     .add_plugins(FloatingLocomotionPlugin::<Avian3dBackend>::default())
///     .run();
/// ```
pub struct FloatingLocomotionPlugin<B: backend::LocomotionPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionPhysicsBackend> Default for FloatingLocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionPhysicsBackend> Plugin for FloatingLocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::FacingBasis>();
        app.register_type::<config::MeshFacing>();
        app.register_type::<detection::GroundState>();
        app.register_type::<intent::MoveIntent>();
        app.register_type::<state::LocomotionState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<timing::DodgeClock>();
        app.register_type::<animation::AnimationFlags>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // Fixed-step (physics clock) chain. Sensors run first so every
        // later phase sees freshly classified ground state.
        app.configure_sets(
            FixedUpdate,
            (
                FixedStepSet::Sensors,
                FixedStepSet::Stabilization,
                FixedStepSet::Locomotion,
                FixedStepSet::StateSync,
            )
                .chain(),
        );
        app.add_systems(
            FixedUpdate,
            (systems::apply_float_spring::<B>, systems::apply_gravity::<B>)
                .chain()
                .in_set(FixedStepSet::Stabilization),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::apply_jump::<B>,
                systems::apply_horizontal_movement::<B>,
                systems::settle_landing::<B>,
            )
                .chain()
                .in_set(FixedStepSet::Locomotion),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(FixedStepSet::StateSync),
        );

        // Variable-step (control clock) chain. Input sampling (user side)
        // precedes edge latching, which precedes trigger evaluation.
        app.configure_sets(
            Update,
            (
                ControlStepSet::Intent,
                ControlStepSet::Timers,
                ControlStepSet::Actions,
                ControlStepSet::Display,
            )
                .chain(),
        );
        app.add_systems(
            Update,
            (
                systems::validate_controller_setup,
                systems::latch_intent_edges,
            )
                .chain()
                .in_set(ControlStepSet::Intent),
        );
        app.add_systems(
            Update,
            systems::tick_dodge_timers.in_set(ControlStepSet::Timers),
        );
        app.add_systems(
            Update,
            systems::trigger_dodge::<B>.in_set(ControlStepSet::Actions),
        );
        app.add_systems(
            Update,
            (systems::smooth_facing, systems::publish_animation_flags::<B>)
                .chain()
                .in_set(ControlStepSet::Display),
        );
    }
}
