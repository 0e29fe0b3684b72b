//! Events emitted by state transitions.
//! The presentation layer consumes these for trail, sound, and messages.

use crate::domain::action::Action;
use crate::domain::cell::Cell;
use crate::domain::piece::Rotation;
use crate::domain::scoring::LevelResult;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PieceMoved { from: Cell, to: Cell },
    PieceRotated { rotation: Rotation },
    /// Newly painted cells from one paint action (never empty).
    CellsPainted { cells: Vec<Cell>, counted: bool },
    /// Geometrically impossible request (UI feedback only).
    InvalidAction(Action),
    Paused,
    Resumed,
    Ticked { elapsed_secs: u32 },
    LevelReset,
    LevelWon(LevelResult),
}
