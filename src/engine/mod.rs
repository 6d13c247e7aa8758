// Engine modules: fixed-step loop, physics, input, events

pub mod events;
pub mod game_loop;
pub mod input;
pub mod physics;
