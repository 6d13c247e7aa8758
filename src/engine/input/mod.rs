// Input handling system
//
// The controller never polls devices. The host feeds key/button events into a
// `PlayerInput` (or any other `InputProvider`) on its own cadence, and the
// simulator samples one immutable `FrameInput` per controller per frame.
//
// ## Architecture
//
// - `action`: Controller actions
// - `frame`: The per-tick `FrameInput` snapshot and the `InputProvider` trait
// - `player`: Per-player button state with edge detection and the grow toggle

pub mod action;
pub mod frame;
pub mod player;

// Re-export commonly used types
pub use action::Action;
pub use frame::{FrameInput, InputProvider, ScriptedInput};
pub use player::PlayerInput;
