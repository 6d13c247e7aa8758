// Game modules

pub mod character;
pub mod simulator;

pub use simulator::{ControllerId, Simulator};
