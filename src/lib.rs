// Rusted Controller: a kinematic 2D platformer character controller
//
// - `core`: math helpers
// - `engine`: fixed-step loop, physics backends, input and events
// - `game`: the character controller and the simulator driving it

pub mod core;
pub mod engine;
pub mod game;
