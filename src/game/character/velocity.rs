// Per-tick velocity: target motion, gravity shaping and transient composition

use glam::Vec2;

use super::config::{ControllerConfig, PositionCorrectionMode, SKIN_WIDTH};
use crate::core::math::{inverse_lerp, lerp, move_towards, move_towards_vec, smooth_damp};

/// |direction.y| at which grounded motion follows the slope exactly
pub const SLOPE_ANGLE_FOR_EXACT_MOVEMENT: f32 = 0.7;

/// Smoothing time of the speed modifier blend (seconds)
pub const MODIFIER_SMOOTH_TIME: f32 = 0.1;

/// Inherited platform velocity below this magnitude is dropped
pub const DECAY_EPSILON: f32 = 0.01;

/// Modifier components smaller than this are not divided back out
const MIN_MODIFIER: f32 = 1e-3;

/// Everything the solver needs to know about the current tick
#[derive(Debug, Clone, Copy)]
pub struct MotionInput {
    /// Body velocity after this tick's adjustments so far
    pub velocity: Vec2,
    /// Movement direction along the ground, normalized or zero
    pub direction: Vec2,
    pub has_input: bool,
    pub grounded: bool,
    /// Seconds spent growing, `None` when not growing
    pub growing_for: Option<f32>,
    pub dt: f32,
}

/// Transient velocity bookkeeping and the movement model
#[derive(Debug, Clone)]
pub struct VelocitySolver {
    frame_transient: Vec2,
    immediate_move: Vec2,
    decaying: Vec2,
    applied_last_frame: Vec2,
    current_modifier: Vec2,
    applied_modifier: Vec2,
    modifier_velocity: Vec2,
}

impl Default for VelocitySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocitySolver {
    pub fn new() -> Self {
        Self {
            frame_transient: Vec2::ZERO,
            immediate_move: Vec2::ZERO,
            decaying: Vec2::ZERO,
            applied_last_frame: Vec2::ZERO,
            current_modifier: Vec2::ONE,
            applied_modifier: Vec2::ONE,
            modifier_velocity: Vec2::ZERO,
        }
    }

    /// Strip last tick's modifier and transient velocity from `velocity` and start a new tick
    pub fn remove_transient(&mut self, velocity: Vec2, decay_rate: f32) -> Vec2 {
        let stripped = unscale(velocity, self.applied_modifier) - self.applied_last_frame;
        self.applied_modifier = Vec2::ONE;
        self.frame_transient = Vec2::ZERO;
        self.immediate_move = Vec2::ZERO;
        self.applied_last_frame = Vec2::ZERO;

        self.decaying *= 1.0 - decay_rate;
        if self.decaying.length() < DECAY_EPSILON {
            self.decaying = Vec2::ZERO;
        }

        stripped
    }

    /// Forget every transient term, as after a state load
    pub fn reset_transient(&mut self) {
        self.frame_transient = Vec2::ZERO;
        self.immediate_move = Vec2::ZERO;
        self.decaying = Vec2::ZERO;
        self.applied_last_frame = Vec2::ZERO;
        self.applied_modifier = Vec2::ONE;
    }

    /// Queue the move that puts the character back at step height
    pub fn ground_correction(&mut self, offset: f32, up: Vec2, mode: PositionCorrectionMode, dt: f32) {
        if offset == 0.0 {
            return;
        }
        let required = up * offset;
        match mode {
            PositionCorrectionMode::Velocity => self.frame_transient = required / dt,
            PositionCorrectionMode::Immediate => self.immediate_move = required,
        }
    }

    /// Add velocity carried over from platforms this tick
    pub fn add_platform_velocity(&mut self, velocity: Vec2) {
        self.frame_transient += velocity;
    }

    /// Inherit a platform's takeoff velocity, damping its downward part
    pub fn add_takeoff(&mut self, mut velocity: Vec2, negative_y_negation: f32) {
        if velocity.y < 0.0 {
            velocity.y *= negative_y_negation;
        }
        self.decaying += velocity;
    }

    /// Smooth the effective speed modifier towards `target`
    pub fn blend_modifier(&mut self, target: Vec2, dt: f32) {
        self.current_modifier = smooth_damp(
            self.current_modifier,
            target,
            &mut self.modifier_velocity,
            MODIFIER_SMOOTH_TIME,
            dt,
        );
    }

    /// Position nudge to apply this tick, if it is large enough to matter
    pub fn immediate_move(&self) -> Option<Vec2> {
        (self.immediate_move.length() > SKIN_WIDTH).then_some(self.immediate_move)
    }

    /// Total transient velocity for this tick. Remembered so the next tick removes it
    pub fn compose_transient(&mut self) -> Vec2 {
        self.applied_last_frame = self.frame_transient + self.decaying;
        self.applied_last_frame
    }

    /// Scale the final velocity of this tick by the effective modifier
    pub fn apply_modifier(&mut self, velocity: Vec2) -> Vec2 {
        self.applied_modifier = self.current_modifier;
        velocity * self.current_modifier
    }

    pub fn current_modifier(&self) -> Vec2 {
        self.current_modifier
    }

    pub fn decaying(&self) -> Vec2 {
        self.decaying
    }

    pub fn frame_transient(&self) -> Vec2 {
        self.frame_transient
    }

    /// Velocity the character steers towards this tick, before transients and modifiers
    pub fn target_velocity(&self, motion: &MotionInput, config: &ControllerConfig) -> Vec2 {
        let mut target_speed = if motion.has_input { config.base_speed } else { 0.0 };

        if let Some(grown_for) = motion.growing_for {
            let grow_point = inverse_lerp(0.0, config.grow_slow_down_time, grown_for);
            target_speed *= lerp(1.0, config.grow_speed_modifier, grow_point);
        }

        let mut step = if motion.has_input {
            config.acceleration
        } else {
            config.friction
        };

        let x_dir = if motion.has_input {
            motion.direction
        } else {
            motion.velocity.normalize_or_zero()
        };

        let trimmed = Vec2::new(motion.velocity.x, 0.0);
        if trimmed.dot(motion.direction) < 0.0 {
            step *= config.direction_correction_multiplier;
        }
        step *= motion.dt;

        if motion.grounded {
            let speed = move_towards(motion.velocity.length(), target_speed, step);
            let target = x_dir * speed;

            let new_speed = move_towards(motion.velocity.length(), target.length(), step);
            let smoothed = move_towards_vec(motion.velocity, target, step);
            let direct = target.normalize_or_zero() * new_speed;
            let slope_point = inverse_lerp(0.0, SLOPE_ANGLE_FOR_EXACT_MOVEMENT, motion.direction.y.abs());

            smoothed.lerp(direct, slope_point)
        } else {
            let step = step * config.air_friction_multiplier;
            let x = move_towards(trimmed.x, x_dir.x * target_speed, step);
            Vec2::new(x, motion.velocity.y)
        }
    }
}

fn unscale(velocity: Vec2, modifier: Vec2) -> Vec2 {
    let axis = |v: f32, m: f32| if m.abs() > MIN_MODIFIER { v / m } else { v };
    Vec2::new(axis(velocity.x, modifier.x), axis(velocity.y, modifier.y))
}

/// Extra downward force per unit mass: zero grounded, stronger after an early release
pub fn extra_gravity(
    grounded: bool,
    ended_jump_early: bool,
    velocity_y: f32,
    config: &ControllerConfig,
) -> Vec2 {
    if grounded {
        return Vec2::ZERO;
    }
    let multiplier = if ended_jump_early && velocity_y > 0.0 {
        config.end_jump_early_multiplier
    } else {
        1.0
    };
    Vec2::new(0.0, -config.extra_constant_gravity * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::character::config::BASE_CONFIG;
    use approx::assert_relative_eq;

    fn motion(velocity: Vec2, direction: Vec2, grounded: bool) -> MotionInput {
        MotionInput {
            velocity,
            direction,
            has_input: direction != Vec2::ZERO,
            grounded,
            growing_for: None,
            dt: 0.02,
        }
    }

    #[test]
    fn test_accelerates_from_rest() {
        let solver = VelocitySolver::new();
        let v = solver.target_velocity(&motion(Vec2::ZERO, Vec2::X, true), &BASE_CONFIG);
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, 0.0);
    }

    #[test]
    fn test_friction_without_input() {
        let solver = VelocitySolver::new();
        let v = solver.target_velocity(&motion(Vec2::new(5.0, 0.0), Vec2::ZERO, true), &BASE_CONFIG);
        assert_relative_eq!(v.x, 4.4, epsilon = 1e-5);
    }

    #[test]
    fn test_direction_correction_boost() {
        let solver = VelocitySolver::new();
        let v = solver.target_velocity(&motion(Vec2::new(5.0, 0.0), Vec2::NEG_X, true), &BASE_CONFIG);
        // Reversing input triples the step: 50 * 3 * 0.02
        assert_relative_eq!(v.x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_airborne_keeps_vertical() {
        let solver = VelocitySolver::new();
        let v = solver.target_velocity(&motion(Vec2::new(0.0, 7.0), Vec2::X, false), &BASE_CONFIG);
        assert_relative_eq!(v.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(v.y, 7.0);
    }

    #[test]
    fn test_slope_follows_direction() {
        let solver = VelocitySolver::new();
        let direction = Vec2::new(1.0, 1.0).normalize();
        let v = solver.target_velocity(&motion(Vec2::ZERO, direction, true), &BASE_CONFIG);
        assert_relative_eq!(v.normalize().dot(direction), 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_grow_slows_down() {
        let solver = VelocitySolver::new();
        let mut input = motion(Vec2::new(9.0, 0.0), Vec2::X, true);
        input.growing_for = Some(10.0);
        let v = solver.target_velocity(&input, &BASE_CONFIG);
        // Target 4.5, approached by at most 1.0 per tick
        assert_relative_eq!(v.x, 8.0, epsilon = 1e-4);
    }

    #[test]
    fn test_transient_removed_next_tick() {
        let mut solver = VelocitySolver::new();
        solver.ground_correction(0.1, Vec2::Y, PositionCorrectionMode::Velocity, 0.02);
        let transient = solver.compose_transient();
        assert_relative_eq!(transient.y, 5.0, epsilon = 1e-4);

        let velocity = Vec2::new(3.0, 0.0) + transient;
        let stripped = solver.remove_transient(velocity, 0.1);
        assert_relative_eq!(stripped.x, 3.0);
        assert_relative_eq!(stripped.y, 0.0, epsilon = 1e-5);
        assert_eq!(solver.frame_transient(), Vec2::ZERO);
    }

    #[test]
    fn test_immediate_move_threshold() {
        let mut solver = VelocitySolver::new();
        solver.ground_correction(0.01, Vec2::Y, PositionCorrectionMode::Immediate, 0.02);
        assert!(solver.immediate_move().is_none());
        solver.ground_correction(0.1, Vec2::Y, PositionCorrectionMode::Immediate, 0.02);
        assert_eq!(solver.immediate_move(), Some(Vec2::new(0.0, 0.1)));
        assert_eq!(solver.compose_transient(), Vec2::ZERO);
    }

    #[test]
    fn test_takeoff_damps_downward_and_decays() {
        let mut solver = VelocitySolver::new();
        solver.add_takeoff(Vec2::new(4.0, -5.0), 0.2);
        assert_eq!(solver.decaying(), Vec2::new(4.0, -1.0));

        solver.remove_transient(Vec2::ZERO, 0.5);
        assert_relative_eq!(solver.decaying().x, 2.0);
        assert_relative_eq!(solver.decaying().y, -0.5);

        for _ in 0..20 {
            solver.remove_transient(Vec2::ZERO, 0.5);
        }
        assert_eq!(solver.decaying(), Vec2::ZERO);
    }

    #[test]
    fn test_modifier_blend_converges() {
        let mut solver = VelocitySolver::new();
        for _ in 0..100 {
            solver.blend_modifier(Vec2::splat(2.0), 0.02);
        }
        assert_relative_eq!(solver.current_modifier().x, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_modifier_does_not_compound() {
        let mut solver = VelocitySolver::new();
        for _ in 0..100 {
            solver.blend_modifier(Vec2::new(1.5, 1.0), 0.02);
        }

        let mut velocity = Vec2::new(9.0, 0.0);
        for _ in 0..10 {
            let base = solver.remove_transient(velocity, 0.1);
            velocity = solver.apply_modifier(base);
        }
        assert_relative_eq!(velocity.x, 13.5, epsilon = 1e-2);
    }

    #[test]
    fn test_reset_transient_keeps_velocity() {
        let mut solver = VelocitySolver::new();
        solver.add_takeoff(Vec2::new(5.0, 0.0), 0.2);
        solver.add_platform_velocity(Vec2::new(2.0, 0.0));
        solver.compose_transient();

        solver.reset_transient();
        assert_eq!(solver.decaying(), Vec2::ZERO);
        assert_eq!(solver.remove_transient(Vec2::new(1.0, 0.0), 0.1), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_extra_gravity() {
        assert_eq!(extra_gravity(true, true, 5.0, &BASE_CONFIG), Vec2::ZERO);
        assert_eq!(extra_gravity(false, false, 5.0, &BASE_CONFIG), Vec2::new(0.0, -40.0));
        assert_eq!(extra_gravity(false, true, 5.0, &BASE_CONFIG), Vec2::new(0.0, -120.0));
        assert_eq!(extra_gravity(false, true, -1.0, &BASE_CONFIG), Vec2::new(0.0, -40.0));
    }
}
