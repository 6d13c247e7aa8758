// Jump eligibility and timing windows

use super::config::ControllerConfig;
use crate::engine::events::JumpKind;

/// After a jump, ground snapping and buffered jumps are suspended this long (seconds)
pub const JUMP_CLEARANCE_TIME: f32 = 0.25;

/// Jump multiplier while growing
pub const GROW_JUMP_MULTIPLIER: f32 = 0.75;

/// Coarse jump state, derived from the timing fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    Grounded,
    /// Airborne and a coyote jump is still available
    CoyoteEligible,
    /// Airborne with the coyote window gone
    CoyoteExpired,
}

/// Tracks jump requests, windows and remaining air jumps
///
/// Times are simulation seconds. Windows that have never been opened start at
/// negative infinity so nothing is eligible at time zero.
#[derive(Debug, Clone)]
pub struct JumpStateMachine {
    jump_to_consume: bool,
    time_jump_pressed: f32,
    buffered_jump_usable: bool,
    coyote_usable: bool,
    time_left_grounded: f32,
    last_jump_time: f32,
    ended_jump_early: bool,
    air_jumps_remaining: u32,
}

impl Default for JumpStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl JumpStateMachine {
    pub fn new() -> Self {
        Self {
            jump_to_consume: false,
            time_jump_pressed: f32::NEG_INFINITY,
            buffered_jump_usable: false,
            coyote_usable: false,
            time_left_grounded: f32::NEG_INFINITY,
            last_jump_time: f32::NEG_INFINITY,
            ended_jump_early: false,
            air_jumps_remaining: 0,
        }
    }

    /// Register a fresh jump press
    pub fn request(&mut self, time: f32) {
        self.jump_to_consume = true;
        self.time_jump_pressed = time;
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.air_jumps_remaining
    }

    pub fn ended_jump_early(&self) -> bool {
        self.ended_jump_early
    }

    pub fn coyote_usable(&self) -> bool {
        self.coyote_usable
    }

    pub fn phase(&self, grounded: bool, time: f32, config: &ControllerConfig) -> JumpPhase {
        if grounded {
            JumpPhase::Grounded
        } else if self.can_use_coyote(grounded, time, config) {
            JumpPhase::CoyoteEligible
        } else {
            JumpPhase::CoyoteExpired
        }
    }

    pub fn within_clearance(&self, time: f32) -> bool {
        self.last_jump_time + JUMP_CLEARANCE_TIME > time
    }

    pub fn has_buffered_jump(&self, time: f32, config: &ControllerConfig) -> bool {
        self.buffered_jump_usable
            && time < self.time_jump_pressed + config.buffered_jump_time
            && !self.within_clearance(time)
    }

    pub fn can_use_coyote(&self, grounded: bool, time: f32, config: &ControllerConfig) -> bool {
        self.coyote_usable && !grounded && time < self.time_left_grounded + config.coyote_time
    }

    fn can_air_jump(&self, grounded: bool) -> bool {
        !grounded && self.air_jumps_remaining > 0
    }

    /// A fresh or buffered press wants a jump this tick
    pub fn wants_jump(&self, time: f32, config: &ControllerConfig) -> bool {
        self.jump_to_consume || self.has_buffered_jump(time, config)
    }

    /// Highest priority jump currently allowed
    pub fn select(&self, grounded: bool, time: f32, config: &ControllerConfig) -> Option<JumpKind> {
        if grounded {
            Some(JumpKind::Grounded)
        } else if self.can_use_coyote(grounded, time, config) {
            Some(JumpKind::Coyote)
        } else if self.can_air_jump(grounded) {
            Some(JumpKind::Air)
        } else {
            None
        }
    }

    /// Consume the windows a jump of `kind` uses
    pub fn execute(&mut self, kind: JumpKind, time: f32) {
        self.ended_jump_early = false;
        self.buffered_jump_usable = false;
        self.coyote_usable = false;
        self.last_jump_time = time;
        if kind == JumpKind::Air {
            self.air_jumps_remaining = self.air_jumps_remaining.saturating_sub(1);
        }
    }

    /// Latch early release: ascending without the button held, or falling
    pub fn update_early_release(&mut self, grounded: bool, jump_held: bool, velocity_y: f32) {
        if (!self.ended_jump_early && !grounded && !jump_held && velocity_y > 0.0) || velocity_y < 0.0 {
            self.ended_jump_early = true;
        }
    }

    pub fn on_landed(&mut self, config: &ControllerConfig) {
        self.coyote_usable = true;
        self.buffered_jump_usable = true;
        self.air_jumps_remaining = config.max_air_jumps;
    }

    pub fn on_left_ground(&mut self, time: f32) {
        self.time_left_grounded = time;
    }

    /// Drop the fresh press at the end of a tick
    pub fn end_frame(&mut self) {
        self.jump_to_consume = false;
    }

    /// Drop a pending press and its buffer window
    pub fn discard_press(&mut self) {
        self.jump_to_consume = false;
        self.time_jump_pressed = f32::NEG_INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::character::config::BASE_CONFIG;

    #[test]
    fn test_nothing_eligible_at_start() {
        let jump = JumpStateMachine::new();
        assert!(!jump.wants_jump(0.0, &BASE_CONFIG));
        assert!(!jump.within_clearance(0.0));
        assert_eq!(jump.select(false, 0.0, &BASE_CONFIG), None);
    }

    #[test]
    fn test_priority_grounded_then_coyote_then_air() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        assert_eq!(jump.select(true, 1.0, &BASE_CONFIG), Some(JumpKind::Grounded));

        jump.on_left_ground(1.0);
        assert_eq!(jump.select(false, 1.1, &BASE_CONFIG), Some(JumpKind::Coyote));
        assert_eq!(jump.select(false, 1.2, &BASE_CONFIG), Some(JumpKind::Air));
    }

    #[test]
    fn test_coyote_window() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        jump.on_left_ground(2.0);

        assert_eq!(jump.phase(false, 2.14, &BASE_CONFIG), JumpPhase::CoyoteEligible);
        assert_eq!(jump.phase(false, 2.16, &BASE_CONFIG), JumpPhase::CoyoteExpired);

        jump.execute(JumpKind::Coyote, 2.1);
        assert!(!jump.can_use_coyote(false, 2.1, &BASE_CONFIG));
    }

    #[test]
    fn test_air_jumps_count_down_and_reset() {
        let config = ControllerConfig {
            max_air_jumps: 2,
            ..BASE_CONFIG
        };
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&config);

        jump.execute(JumpKind::Air, 1.0);
        assert_eq!(jump.air_jumps_remaining(), 1);
        jump.execute(JumpKind::Air, 1.5);
        jump.execute(JumpKind::Air, 2.0);
        assert_eq!(jump.air_jumps_remaining(), 0);
        assert_eq!(jump.select(false, 3.0, &config), None);

        jump.on_landed(&config);
        assert_eq!(jump.air_jumps_remaining(), 2);
    }

    #[test]
    fn test_buffered_jump_window() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        jump.request(5.0);
        jump.end_frame();

        assert!(jump.has_buffered_jump(5.1, &BASE_CONFIG));
        assert!(!jump.has_buffered_jump(5.2, &BASE_CONFIG));
    }

    #[test]
    fn test_discarded_press_is_not_buffered() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        jump.request(5.0);
        jump.discard_press();

        assert!(!jump.wants_jump(5.0, &BASE_CONFIG));
        assert!(!jump.has_buffered_jump(5.05, &BASE_CONFIG));
    }

    #[test]
    fn test_buffered_jump_blocked_by_clearance() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        jump.execute(JumpKind::Grounded, 1.0);
        jump.on_landed(&BASE_CONFIG);
        jump.request(1.1);
        jump.end_frame();

        assert!(jump.within_clearance(1.2));
        assert!(!jump.has_buffered_jump(1.2, &BASE_CONFIG));
    }

    #[test]
    fn test_buffered_jump_single_use() {
        let mut jump = JumpStateMachine::new();
        jump.on_landed(&BASE_CONFIG);
        jump.request(1.0);
        jump.execute(JumpKind::Grounded, 1.0);
        jump.end_frame();
        assert!(!jump.wants_jump(1.05, &BASE_CONFIG));
    }

    #[test]
    fn test_early_release() {
        let mut jump = JumpStateMachine::new();
        jump.execute(JumpKind::Grounded, 0.0);

        jump.update_early_release(false, true, 5.0);
        assert!(!jump.ended_jump_early());

        jump.update_early_release(false, false, 5.0);
        assert!(jump.ended_jump_early());

        jump.execute(JumpKind::Air, 1.0);
        assert!(!jump.ended_jump_early());
        jump.update_early_release(false, true, -0.1);
        assert!(jump.ended_jump_early());
    }
}
