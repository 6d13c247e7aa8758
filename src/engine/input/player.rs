// Per-player input state management

use super::action::Action;
use super::frame::{FrameInput, InputProvider};
use glam::Vec2;
use std::collections::HashSet;

/// Button state for one player, fed by the host's key/button events
///
/// Presses are latched until the next [`InputProvider::gather`], so a tap that
/// starts and ends between two samples still registers as a jump.
#[derive(Debug, Default)]
pub struct PlayerInput {
    /// Player ID (0-3 for up to 4 players)
    player_id: usize,

    /// Actions that are currently pressed
    pressed: HashSet<Action>,

    /// Actions pressed since the last sample
    just_pressed: HashSet<Action>,

    /// Analog stick override, used instead of the digital directions when set
    analog: Option<Vec2>,

    /// Latched grow toggle
    growing: bool,
}

impl PlayerInput {
    /// Create a new player input state
    pub fn new(player_id: usize) -> Self {
        Self {
            player_id,
            ..Default::default()
        }
    }

    /// Get the player ID
    pub fn player_id(&self) -> usize {
        self.player_id
    }

    /// Check if an action is currently pressed
    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    /// Check if an action was pressed since the last sample
    pub fn just_pressed(&self, action: Action) -> bool {
        self.just_pressed.contains(&action)
    }

    /// Register an action press
    pub fn press(&mut self, action: Action) {
        if self.pressed.insert(action) {
            self.just_pressed.insert(action);
        }
    }

    /// Register an action release
    pub fn release(&mut self, action: Action) {
        self.pressed.remove(&action);
    }

    /// Set an analog stick value, or `None` to use the digital directions
    pub fn set_analog(&mut self, axis: Option<Vec2>) {
        self.analog = axis;
    }

    /// Reset all input state
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.just_pressed.clear();
        self.analog = None;
        self.growing = false;
    }

    /// Get directional input, each axis in -1.0..=1.0
    pub fn get_direction(&self) -> Vec2 {
        if let Some(axis) = self.analog {
            return axis.clamp(Vec2::NEG_ONE, Vec2::ONE);
        }

        let mut direction = Vec2::ZERO;
        if self.is_pressed(Action::MoveLeft) {
            direction.x -= 1.0;
        }
        if self.is_pressed(Action::MoveRight) {
            direction.x += 1.0;
        }
        if self.is_pressed(Action::MoveDown) {
            direction.y -= 1.0;
        }
        if self.is_pressed(Action::MoveUp) {
            direction.y += 1.0;
        }
        direction
    }
}

impl InputProvider for PlayerInput {
    fn gather(&mut self) -> FrameInput {
        if self.just_pressed(Action::Grow) {
            self.growing = !self.growing;
        }

        let frame = FrameInput {
            move_axis: self.get_direction(),
            jump_down: self.just_pressed(Action::Jump),
            jump_held: self.is_pressed(Action::Jump),
            grow: self.growing,
        };

        self.just_pressed.clear();
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_input_creation() {
        let input = PlayerInput::new(0);
        assert_eq!(input.player_id(), 0);
        assert!(!input.is_pressed(Action::Jump));
    }

    #[test]
    fn test_press_action() {
        let mut input = PlayerInput::new(0);
        input.press(Action::Jump);
        assert!(input.is_pressed(Action::Jump));
        assert!(input.just_pressed(Action::Jump));
    }

    #[test]
    fn test_jump_edge_only_on_first_sample() {
        let mut input = PlayerInput::new(0);
        input.press(Action::Jump);

        let first = input.gather();
        assert!(first.jump_down);
        assert!(first.jump_held);

        let second = input.gather();
        assert!(!second.jump_down);
        assert!(second.jump_held);
    }

    #[test]
    fn test_tap_between_samples_still_registers() {
        let mut input = PlayerInput::new(0);
        input.press(Action::Jump);
        input.release(Action::Jump);

        let frame = input.gather();
        assert!(frame.jump_down);
        assert!(!frame.jump_held);
    }

    #[test]
    fn test_grow_toggles_on_press() {
        let mut input = PlayerInput::new(0);
        input.press(Action::Grow);
        assert!(input.gather().grow);

        input.release(Action::Grow);
        assert!(input.gather().grow, "toggle stays latched after release");

        input.press(Action::Grow);
        assert!(!input.gather().grow);
    }

    #[test]
    fn test_get_direction() {
        let mut input = PlayerInput::new(0);
        assert_eq!(input.get_direction(), Vec2::ZERO);

        input.press(Action::MoveRight);
        input.press(Action::MoveDown);
        assert_eq!(input.get_direction(), Vec2::new(1.0, -1.0));

        input.press(Action::MoveLeft);
        assert_eq!(input.get_direction().x, 0.0);
    }

    #[test]
    fn test_analog_overrides_digital() {
        let mut input = PlayerInput::new(0);
        input.press(Action::MoveRight);
        input.set_analog(Some(Vec2::new(-0.5, 2.0)));
        assert_eq!(input.get_direction(), Vec2::new(-0.5, 1.0));
    }

    #[test]
    fn test_reset() {
        let mut input = PlayerInput::new(0);
        input.press(Action::Jump);
        input.press(Action::Grow);
        input.gather();
        input.reset();

        assert!(!input.is_pressed(Action::Jump));
        assert!(!input.gather().grow);
    }
}
