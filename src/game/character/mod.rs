// Character controller
//
// - `config`: tuning values and collider size generation
// - `ground`: raycast grounding
// - `collider_mode`: standing / growing / airborne geometry
// - `jump`: jump windows and air jumps
// - `velocity`: movement model and transient velocity
// - `platforms`: moving platforms and speed zones
// - `state`: saved state
// - `controller`: the per-tick pipeline tying it together

pub mod collider_mode;
pub mod config;
pub mod controller;
pub mod ground;
pub mod jump;
pub mod platforms;
pub mod state;
pub mod velocity;

pub use collider_mode::{ColliderMode, ColliderModeManager};
pub use config::{
    CharacterSize, ControllerConfig, GeneratedCharacterSize, PositionCorrectionMode, BASE_CONFIG,
    BASE_SIZE,
};
pub use controller::CharacterController;
pub use ground::{GroundDetector, GroundHit};
pub use jump::{JumpPhase, JumpStateMachine};
pub use platforms::{
    CapabilityRegistry, MovingPlatform, PhysicsMover, PlatformTracker, SpeedModifier, SpeedZone,
};
pub use state::{ControllerState, ControllerStateStore};
pub use velocity::VelocitySolver;

use crate::engine::physics::RigidBodyHandle;

/// Errors from setting up or reconfiguring controllers
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Body {0:?} does not exist in the physics backend")]
    MissingBody(RigidBodyHandle),

    #[error("Invalid config value for {field}: {value}")]
    InvalidConfig { field: &'static str, value: f32 },

    #[error("Unknown controller: {0}")]
    UnknownController(u32),
}
