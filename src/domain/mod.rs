//! Pure game rules: geometry, pieces, targets, scoring. No I/O.

pub mod action;
pub mod cell;
pub mod piece;
pub mod rules;
pub mod scoring;
pub mod target;
