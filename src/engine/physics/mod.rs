// Physics layer
//
// The controller talks to physics only through `PhysicsBackend`.
// - `world`: rapier2d simulation used by the demo
// - `scene`: deterministic parry2d queries used by tests and tools

pub mod backend;
pub mod body;
mod collision;
mod scene;
mod world;

pub use backend::{
    BodyState, BoxShape, CharacterShapes, ColliderHandle, PhysicsBackend, RayHit,
    RigidBodyHandle, TriggerEvent,
};
pub use collision::{CollisionEvent, CollisionGroups, CollisionMask};
pub use scene::SceneWorld;
pub use world::PhysicsWorld;
