// Per-tick input snapshot handed to the fixed update

use glam::Vec2;
use std::collections::VecDeque;

/// Input for one fixed tick. Immutable once handed to the controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    /// Movement axes, each in -1.0..=1.0
    pub move_axis: Vec2,
    /// Jump was pressed since the previous sample
    pub jump_down: bool,
    /// Jump is currently held
    pub jump_held: bool,
    /// Grow mode is toggled on
    pub grow: bool,
}

impl FrameInput {
    /// Input moving horizontally with no buttons
    pub fn moving(x: f32) -> Self {
        Self {
            move_axis: Vec2::new(x, 0.0),
            ..Default::default()
        }
    }

    /// Input with a fresh jump press (and the button held)
    pub fn jump() -> Self {
        Self {
            jump_down: true,
            jump_held: true,
            ..Default::default()
        }
    }

    /// Clamp axes into range and zero those inside the dead zones
    pub fn sanitized(mut self, horizontal_dead_zone: f32, vertical_dead_zone: f32) -> Self {
        self.move_axis = self.move_axis.clamp(Vec2::NEG_ONE, Vec2::ONE);
        if self.move_axis.x.abs() < horizontal_dead_zone {
            self.move_axis.x = 0.0;
        }
        if self.move_axis.y.abs() < vertical_dead_zone {
            self.move_axis.y = 0.0;
        }
        self
    }
}

/// Source of per-tick input (keyboard, gamepad, AI, replay...)
pub trait InputProvider {
    /// Sample the current input. Called once per input tick
    fn gather(&mut self) -> FrameInput;
}

/// Replays a fixed sequence of inputs, then repeats a fallback forever
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<FrameInput>,
    fallback: FrameInput,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = FrameInput>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fallback: FrameInput::default(),
        }
    }

    /// Input returned after the script runs out
    pub fn then_repeat(mut self, fallback: FrameInput) -> Self {
        self.fallback = fallback;
        self
    }

    /// Append `count` copies of `input`
    pub fn push_repeated(&mut self, input: FrameInput, count: usize) {
        self.frames.extend(std::iter::repeat(input).take(count));
    }

    /// Frames left before the fallback kicks in
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputProvider for ScriptedInput {
    fn gather(&mut self) -> FrameInput {
        self.frames.pop_front().unwrap_or(self.fallback)
    }
}
