//! Terminal front end. Nothing here mutates `GameState` directly.

pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;
pub mod trail;
