// Saved controller state

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Snapshot of a character at the end of a tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub position: Vec2,
    /// Radians, counter-clockwise
    pub rotation: f32,
    pub velocity: Vec2,
    pub grounded: bool,
}

/// Holds the latest snapshot, replaced once per tick
#[derive(Debug, Clone, Default)]
pub struct ControllerStateStore {
    current: ControllerState,
    captures: u64,
}

impl ControllerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot
    pub fn capture(&mut self, state: ControllerState) {
        self.current = state;
        self.captures += 1;
    }

    pub fn current(&self) -> ControllerState {
        self.current
    }

    /// Number of snapshots taken so far
    pub fn captures(&self) -> u64 {
        self.captures
    }
}
