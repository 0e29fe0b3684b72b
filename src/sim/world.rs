//! GameState: everything one play session owns.
//!
//! ## Lifecycle
//!   - `GameState::new(level)`: piece at the start pose; multi-cell pieces
//!     have their start footprint pre-painted.
//!   - Transitions in `sim::step` mutate it while `Active`.
//!   - The first transition that completes the target freezes it in `Won`.
//!   - `step::reset` reinitializes it; leaving the level drops it.
//!
//! Fields are only visible inside `sim`: all mutation goes through `sim::step`, so the
//! invariants below hold for every reachable state.
//!   - every footprint cell of `pose` is on the grid
//!   - every painted cell is on the grid
//!   - `result.is_some()` ⇔ `phase == Won`

use std::collections::HashSet;

use crate::domain::cell::Cell;
use crate::domain::piece::Pose;
use crate::domain::rules;
use crate::domain::scoring::LevelResult;
use crate::sim::level::LevelDef;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Active,
    Paused,
    Won,
}

#[derive(Clone, Debug)]
pub struct GameState {
    pub(super) level: LevelDef,
    pub(super) pose: Pose,
    pub(super) painted: HashSet<Cell>,
    pub(super) moves: u32,
    pub(super) elapsed_secs: u32,
    pub(super) phase: Phase,
    pub(super) result: Option<LevelResult>,
}

impl GameState {
    pub fn new(level: LevelDef) -> Self {
        let mut state = GameState {
            pose: level.start(),
            level,
            painted: HashSet::new(),
            moves: 0,
            elapsed_secs: 0,
            phase: Phase::Active,
            result: None,
        };
        state.seed();
        state
    }

    /// Back to the level-entry state.
    pub(super) fn reinit(&mut self) {
        self.pose = self.level.start();
        self.painted.clear();
        self.moves = 0;
        self.elapsed_secs = 0;
        self.phase = Phase::Active;
        self.result = None;
        self.seed();
    }

    fn seed(&mut self) {
        if self.level.seeds_start() {
            let cells: Vec<Cell> = self.footprint().collect();
            self.painted.extend(cells);
        }
    }
}

// ── Queries (output surface for presentation) ──

impl GameState {
    pub fn level(&self) -> &LevelDef { &self.level }
    pub fn pose(&self) -> Pose { self.pose }
    pub fn painted(&self) -> &HashSet<Cell> { &self.painted }
    pub fn moves(&self) -> u32 { self.moves }
    pub fn elapsed_secs(&self) -> u32 { self.elapsed_secs }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn result(&self) -> Option<LevelResult> { self.result }

    pub fn is_won(&self) -> bool {
        self.phase == Phase::Won
    }

    /// Cells currently under the piece.
    pub fn footprint(&self) -> impl Iterator<Item = Cell> + '_ {
        self.level.piece().footprint(self.pose)
    }

    pub fn is_painted(&self, cell: Cell) -> bool {
        self.painted.contains(&cell)
    }

    pub fn painted_target_count(&self) -> usize {
        self.level.target().covered_by(&self.painted)
    }

    /// `|painted ∩ target| / |target|`.
    pub fn completion(&self) -> f32 {
        rules::completion(self.level.target(), &self.painted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::piece::Rotation;
    use crate::sim::level::builtin_levels;

    #[test]
    fn single_cell_level_starts_unpainted() {
        let s = GameState::new(builtin_levels().remove(0));
        assert!(s.painted().is_empty());
        assert_eq!(s.pose(), Pose::at(0, 0));
        assert_eq!(s.moves(), 0);
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.completion(), 0.0);
    }

    #[test]
    fn multi_cell_level_seeds_start_footprint() {
        let s = GameState::new(builtin_levels().remove(2));
        assert_eq!(s.pose().rotation, Rotation::R0);
        let expected: HashSet<Cell> = [Cell::new(4, 4), Cell::new(5, 4), Cell::new(4, 3)].into_iter().collect();
        assert_eq!(s.painted(), &expected);
        assert_eq!(s.painted_target_count(), 3);
        assert_eq!(s.moves(), 0);
        assert!(!s.is_won());
    }
}
