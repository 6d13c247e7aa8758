// Physics backend abstraction
//
// The character controller only talks to physics through `PhysicsBackend`.
// `PhysicsWorld` implements it on top of rapier2d, `SceneWorld` on top of plain
// parry2d shape queries with explicit integration.

use glam::Vec2;

use super::collision::CollisionMask;

pub use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

/// Result of a raycast against the environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point
    pub distance: f32,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// World position of the hit point
    pub point: Vec2,
    /// Collider that was hit
    pub collider: ColliderHandle,
}

/// Kinematic state of a body as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise
    pub rotation: f32,
    pub velocity: Vec2,
    pub mass: f32,
}

/// Axis-aligned box in body space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxShape {
    /// Full extents
    pub size: Vec2,
    /// Center relative to the body origin
    pub offset: Vec2,
}

impl BoxShape {
    pub fn new(size: Vec2, offset: Vec2) -> Self {
        Self { size, offset }
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size * 0.5
    }
}

/// Collider layout of a character body
///
/// The primary box is always enabled; the airborne capsule only while airborne.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterShapes {
    pub primary: BoxShape,
    /// Rounding radius of the primary box
    pub primary_edge_radius: f32,
    /// Capsule bounds (width = diameter)
    pub airborne: BoxShape,
    pub airborne_enabled: bool,
}

/// A character body entered or left a trigger volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub body: RigidBodyHandle,
    pub trigger: ColliderHandle,
    pub entered: bool,
}

/// Everything the character controller needs from a physics engine
pub trait PhysicsBackend {
    /// Cast a ray and return the closest hit among colliders in `mask`.
    /// Triggers are ignored, and rays starting inside a collider ignore it.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit>;

    /// Check whether an axis-aligned box overlaps any non-trigger collider in `mask`
    fn overlap_box(&self, center: Vec2, size: Vec2, mask: CollisionMask) -> bool;

    /// Current state of a body, or `None` if it does not exist
    fn body_state(&self, body: RigidBodyHandle) -> Option<BodyState>;

    fn set_velocity(&mut self, body: RigidBodyHandle, velocity: Vec2);

    /// Teleport a body
    fn set_position(&mut self, body: RigidBodyHandle, position: Vec2);

    /// Move a body to `position` as part of the next step
    fn move_position(&mut self, body: RigidBodyHandle, position: Vec2) {
        self.set_position(body, position);
    }

    fn set_rotation(&mut self, body: RigidBodyHandle, rotation: f32);

    /// Instantaneous change in momentum
    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec2);

    /// Scale of world gravity applied to the body (0 disables gravity)
    fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32);

    /// Persistent force applied every step until replaced
    fn set_constant_force(&mut self, body: RigidBodyHandle, force: Vec2);

    /// Toggle between a simulated (dynamic) body and a frozen kinematic one
    fn set_simulated(&mut self, body: RigidBodyHandle, simulated: bool);

    /// Replace the character collider layout of a body
    fn set_character_shapes(&mut self, body: RigidBodyHandle, shapes: &CharacterShapes);

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);

    /// Take trigger enter/exit events produced since the last call
    fn take_trigger_events(&mut self) -> Vec<TriggerEvent>;
}
