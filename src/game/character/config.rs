// Controller tuning values and collider size generation
//
// Every controller reads the same kind of config. Hosts usually start from
// `BASE_CONFIG` and override a few fields.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ControllerError;
use crate::engine::physics::{BoxShape, CollisionMask};

/// Gap kept between the character's colliders and the surfaces it rests on
pub const SKIN_WIDTH: f32 = 0.02;

/// Minimum spacing between the step height and the character's heights
pub const STEP_BUFFER: f32 = 0.05;

/// Rounding radius of the primary box collider
pub const COLLIDER_EDGE_RADIUS: f32 = 0.05;

/// Smallest extent a generated collider may have
const MIN_EXTENT: f32 = 0.01;

const TIME_BETWEEN_WARNINGS: Duration = Duration::from_secs(1);
static LAST_SIZE_WARNING: Mutex<Option<Instant>> = Mutex::new(None);

/// How the controller keeps the character at step height above the ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionCorrectionMode {
    /// Add a one-tick velocity. Smoother, less reliable on jagged terrain
    #[default]
    Velocity,
    /// Move the body directly. Stable, occasionally jittery
    Immediate,
}

/// Character dimensions as authored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSize {
    /// Total height, including the step height
    pub height: f32,
    /// Collider width
    pub width: f32,
    /// Height of obstacles the character walks over
    pub step_height: f32,
    /// Total height while growing
    pub grow_height: f32,
    /// Collider width while growing
    pub grow_width: f32,
    /// Inset of the outermost ground rays from the collider edge
    pub ray_inset: f32,
}

pub const BASE_SIZE: CharacterSize = CharacterSize {
    height: 1.8,
    width: 0.6,
    step_height: 0.5,
    grow_height: 0.6,
    grow_width: 0.6,
    ray_inset: 0.1,
};

impl Default for CharacterSize {
    fn default() -> Self {
        BASE_SIZE
    }
}

impl CharacterSize {
    /// Clamp inconsistent heights and derive the collider layout
    pub fn generate(&self) -> GeneratedCharacterSize {
        let size = self.clamped();

        let standing_size = Vec2::new(
            size.width - COLLIDER_EDGE_RADIUS * 2.0,
            size.height - size.step_height - COLLIDER_EDGE_RADIUS * 2.0,
        )
        .max(Vec2::splat(MIN_EXTENT));
        let standing_center = Vec2::new(
            0.0,
            size.height - standing_size.y / 2.0 - COLLIDER_EDGE_RADIUS,
        );

        let grow_size = Vec2::new(
            size.grow_width - COLLIDER_EDGE_RADIUS * 2.0,
            size.grow_height - size.step_height,
        )
        .max(Vec2::splat(MIN_EXTENT));
        let grow_center = Vec2::new(0.0, size.grow_height - grow_size.y / 2.0 - COLLIDER_EDGE_RADIUS);

        let airborne_size = Vec2::new(
            size.width - SKIN_WIDTH * 2.0,
            size.height - SKIN_WIDTH * 2.0,
        )
        .max(Vec2::splat(MIN_EXTENT));

        GeneratedCharacterSize {
            height: size.height,
            width: size.width,
            step_height: size.step_height,
            ray_inset: size.ray_inset,
            grow_height: size.grow_height,
            grow_width: size.grow_width,
            standing: BoxShape::new(standing_size, standing_center),
            growing: BoxShape::new(grow_size, grow_center),
            airborne: BoxShape::new(airborne_size, Vec2::new(0.0, size.height / 2.0)),
        }
    }

    fn clamped(&self) -> CharacterSize {
        let mut size = *self;
        size.height = size.height.max(0.1);
        size.width = size.width.max(0.1);
        size.grow_width = size.grow_width.max(0.1);
        size.step_height = size.step_height.max(STEP_BUFFER);
        size.ray_inset = size.ray_inset.clamp(0.0, size.width / 2.0);

        let max_step_height = size.height - STEP_BUFFER;
        if size.step_height > max_step_height {
            size.step_height = max_step_height;
            warn_rate_limited("Step height cannot be larger than height");
        }

        let min_grow_height = size.step_height + STEP_BUFFER;
        if size.grow_height < min_grow_height {
            size.grow_height = min_grow_height;
            warn_rate_limited("Grow height must be larger than step height");
        }

        size
    }
}

fn warn_rate_limited(message: &str) {
    let Ok(mut last) = LAST_SIZE_WARNING.lock() else {
        return;
    };
    let now = Instant::now();
    if matches!(*last, Some(at) if now.duration_since(at) < TIME_BETWEEN_WARNINGS) {
        return;
    }
    *last = Some(now);
    log::warn!("{}", message);
}

/// Collider layout derived from [`CharacterSize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedCharacterSize {
    pub height: f32,
    pub width: f32,
    pub step_height: f32,
    pub ray_inset: f32,
    pub grow_height: f32,
    pub grow_width: f32,
    /// Primary box while standing
    pub standing: BoxShape,
    /// Primary box while growing
    pub growing: BoxShape,
    /// Capsule bounds while airborne
    pub airborne: BoxShape,
}

/// Tuning values for one character controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // Setup
    /// Layers the character stands on and collides with
    pub collision_mask: CollisionMask,
    pub character_size: CharacterSize,

    // Input
    pub vertical_dead_zone: f32,
    pub horizontal_dead_zone: f32,
    pub position_correction_mode: PositionCorrectionMode,

    // Movement
    /// Top horizontal speed (units/second)
    pub base_speed: f32,
    /// Speed gained per second while input is held
    pub acceleration: f32,
    /// Speed lost per second without input
    pub friction: f32,
    /// Scales acceleration and friction while airborne
    pub air_friction_multiplier: f32,
    /// Scales acceleration when input opposes the current velocity
    pub direction_correction_multiplier: f32,
    /// Steepest walkable slope in degrees
    pub max_walkable_slope: f32,

    // Jump
    /// Downward acceleration added while airborne
    pub extra_constant_gravity: f32,
    /// How long a jump press stays valid before landing (seconds)
    pub buffered_jump_time: f32,
    /// How long after leaving a ledge a ground jump is still allowed (seconds)
    pub coyote_time: f32,
    /// Upward velocity change of a jump
    pub jump_power: f32,
    /// Scales the extra gravity after the jump button is released early
    pub end_jump_early_multiplier: f32,
    pub max_air_jumps: u32,

    // Grow
    /// Time until the grow speed penalty is fully applied (seconds)
    pub grow_slow_down_time: f32,
    /// Speed multiplier once fully grown
    pub grow_speed_modifier: f32,

    // Moving platforms
    /// Scales the downward part of a platform's takeoff velocity
    pub negative_y_velocity_negation: f32,
    /// Fraction of the inherited platform velocity lost per tick
    pub external_velocity_decay: f32,
}

/// Default controller tuning
pub const BASE_CONFIG: ControllerConfig = ControllerConfig {
    collision_mask: CollisionMask::ENVIRONMENT,
    character_size: BASE_SIZE,

    vertical_dead_zone: 0.3,
    horizontal_dead_zone: 0.1,
    position_correction_mode: PositionCorrectionMode::Velocity,

    base_speed: 9.0,
    acceleration: 50.0,
    friction: 30.0,
    air_friction_multiplier: 0.5,
    direction_correction_multiplier: 3.0,
    max_walkable_slope: 50.0,

    extra_constant_gravity: 40.0,
    buffered_jump_time: 0.15,
    coyote_time: 0.15,
    jump_power: 20.0,
    end_jump_early_multiplier: 3.0,
    max_air_jumps: 1,

    grow_slow_down_time: 0.5,
    grow_speed_modifier: 0.5,

    negative_y_velocity_negation: 0.2,
    external_velocity_decay: 0.1,
};

impl Default for ControllerConfig {
    fn default() -> Self {
        BASE_CONFIG
    }
}

impl ControllerConfig {
    /// Reject values the controller cannot work with
    pub fn validate(&self) -> Result<(), ControllerError> {
        let non_negative = [
            ("vertical_dead_zone", self.vertical_dead_zone),
            ("horizontal_dead_zone", self.horizontal_dead_zone),
            ("base_speed", self.base_speed),
            ("acceleration", self.acceleration),
            ("friction", self.friction),
            ("air_friction_multiplier", self.air_friction_multiplier),
            ("direction_correction_multiplier", self.direction_correction_multiplier),
            ("max_walkable_slope", self.max_walkable_slope),
            ("extra_constant_gravity", self.extra_constant_gravity),
            ("buffered_jump_time", self.buffered_jump_time),
            ("coyote_time", self.coyote_time),
            ("jump_power", self.jump_power),
            ("end_jump_early_multiplier", self.end_jump_early_multiplier),
            ("grow_slow_down_time", self.grow_slow_down_time),
            ("grow_speed_modifier", self.grow_speed_modifier),
            ("negative_y_velocity_negation", self.negative_y_velocity_negation),
            ("external_velocity_decay", self.external_velocity_decay),
            ("character_size.height", self.character_size.height),
            ("character_size.width", self.character_size.width),
            ("character_size.step_height", self.character_size.step_height),
            ("character_size.grow_height", self.character_size.grow_height),
            ("character_size.grow_width", self.character_size.grow_width),
            ("character_size.ray_inset", self.character_size.ray_inset),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ControllerError::InvalidConfig {
                    field: name,
                    value,
                });
            }
        }

        if self.external_velocity_decay > 1.0 {
            return Err(ControllerError::InvalidConfig {
                field: "external_velocity_decay",
                value: self.external_velocity_decay,
            });
        }

        Ok(())
    }
}
