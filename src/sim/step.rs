//! State transitions of the painting engine.
//!
//! Every transition runs to completion before returning, and win detection
//! happens inside the transition that completes the target, so callers never
//! observe a finished board that is still `Active`.
//!
//! ## Acceptance by phase
//! ┌──────────────────┬────────┬────────┬──────┐
//! │ Transition        │ Active │ Paused │ Won  │
//! ├──────────────────┼────────┼────────┼──────┤
//! │ move / rotate     │ yes    │ reject │ reject │
//! │ paint             │ yes    │ reject │ reject │
//! │ toggle_pause      │ yes    │ yes    │ reject │
//! │ tick              │ +1s    │ no-op  │ no-op  │
//! │ reset             │ yes    │ yes    │ yes    │
//! └──────────────────┴────────┴────────┴──────┘
//!
//! ## Move counting
//! One paint action counts one move iff it newly paints at least one target
//! cell, however many cells it adds. Non-target cells are still recorded in
//! `painted`. A successful rotation counts exactly one move on its own.

use tracing::{debug, info};

use crate::domain::action::{Action, MoveDir};
use crate::domain::cell::Cell;
use crate::domain::piece::Pose;
use crate::domain::rules;
use crate::domain::scoring::{self, LevelResult};
use super::event::GameEvent;
use super::world::{GameState, Phase};

/// What a transition did. `Invalid` is for UI feedback; it is not an error.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Applied,
    NoChange,
    Invalid,
    Rejected,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// Apply one player action and return the events it produced.
pub fn apply(state: &mut GameState, action: Action) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let outcome = match action {
        Action::Move(dir) => move_piece(state, dir, &mut events),
        Action::Rotate => rotate(state, &mut events),
        Action::Paint => paint_at_cursor(state, &mut events),
        Action::TogglePause => toggle_pause(state, &mut events),
        Action::Reset => reset(state, &mut events),
    };
    debug!(?action, ?outcome, moves = state.moves, "action applied");
    events
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

pub fn move_piece(state: &mut GameState, dir: MoveDir, events: &mut Vec<GameEvent>) -> Outcome {
    let (dx, dy) = dir.delta();
    move_by(state, dx, dy, events)
}

/// Move the pivot by `(dx, dy)`, clamped so the footprint stays on the grid,
/// then paint the new footprint.
pub fn move_by(state: &mut GameState, dx: i32, dy: i32, events: &mut Vec<GameEvent>) -> Outcome {
    if state.phase != Phase::Active {
        return Outcome::Rejected;
    }

    let from = state.pose.position;
    let clamped = state
        .level
        .board()
        .clamp(state.pose.rotation, from.offset(dx, dy));
    let to = match clamped {
        Some(c) if c != from => c,
        _ => return Outcome::NoChange,
    };

    state.pose.position = to;
    events.push(GameEvent::PieceMoved { from, to });
    paint_and_count(state, events);
    finish_if_won(state, events);
    Outcome::Applied
}

// ══════════════════════════════════════════════════════════════
// Rotation
// ══════════════════════════════════════════════════════════════

/// Turn to the next supported rotation about the current pivot. No kicks:
/// if the new footprint would leave the grid nothing changes.
pub fn rotate(state: &mut GameState, events: &mut Vec<GameEvent>) -> Outcome {
    if state.phase != Phase::Active {
        return Outcome::Rejected;
    }

    let candidate = state
        .level
        .piece()
        .next_rotation(state.pose.rotation)
        .map(|r| Pose::new(state.pose.position, r))
        .filter(|&p| state.level.board().fits(p));

    let Some(pose) = candidate else {
        events.push(GameEvent::InvalidAction(Action::Rotate));
        return Outcome::Invalid;
    };

    state.pose = pose;
    state.moves += 1;
    events.push(GameEvent::PieceRotated { rotation: pose.rotation });

    let fresh = paint_footprint(state);
    if !fresh.is_empty() {
        events.push(GameEvent::CellsPainted { cells: fresh, counted: false });
    }
    finish_if_won(state, events);
    Outcome::Applied
}

// ══════════════════════════════════════════════════════════════
// Painting
// ══════════════════════════════════════════════════════════════

/// Explicit paint request at the current pose.
pub fn paint_at_cursor(state: &mut GameState, events: &mut Vec<GameEvent>) -> Outcome {
    if state.phase != Phase::Active {
        return Outcome::Rejected;
    }
    if !paint_and_count(state, events) {
        return Outcome::NoChange;
    }
    finish_if_won(state, events);
    Outcome::Applied
}

/// Paint the footprint and apply the move-counting rule.
/// Returns whether anything new was painted.
fn paint_and_count(state: &mut GameState, events: &mut Vec<GameEvent>) -> bool {
    let fresh = paint_footprint(state);
    if fresh.is_empty() {
        return false;
    }
    let counted = fresh.iter().any(|&c| state.level.target().contains(c));
    if counted {
        state.moves += 1;
    }
    events.push(GameEvent::CellsPainted { cells: fresh, counted });
    true
}

/// Add unpainted footprint cells to `painted`; returns the newly added ones.
fn paint_footprint(state: &mut GameState) -> Vec<Cell> {
    let fresh: Vec<Cell> = state
        .footprint()
        .filter(|c| !state.painted.contains(c))
        .collect();
    state.painted.extend(fresh.iter().copied());
    fresh
}

// ══════════════════════════════════════════════════════════════
// Pause / clock / reset
// ══════════════════════════════════════════════════════════════

pub fn toggle_pause(state: &mut GameState, events: &mut Vec<GameEvent>) -> Outcome {
    match state.phase {
        Phase::Active => {
            state.phase = Phase::Paused;
            events.push(GameEvent::Paused);
            Outcome::Applied
        }
        Phase::Paused => {
            state.phase = Phase::Active;
            events.push(GameEvent::Resumed);
            Outcome::Applied
        }
        Phase::Won => Outcome::Rejected,
    }
}

/// One wall-clock second. The caller fires this once per second regardless
/// of phase; it only counts while `Active`.
pub fn tick(state: &mut GameState, events: &mut Vec<GameEvent>) -> Outcome {
    if state.phase != Phase::Active {
        return Outcome::NoChange;
    }
    state.elapsed_secs += 1;
    events.push(GameEvent::Ticked { elapsed_secs: state.elapsed_secs });
    Outcome::Applied
}

/// Restart the level from its start pose. Accepted in every phase.
pub fn reset(state: &mut GameState, events: &mut Vec<GameEvent>) -> Outcome {
    state.reinit();
    events.push(GameEvent::LevelReset);
    Outcome::Applied
}

// ══════════════════════════════════════════════════════════════
// Win check
// ══════════════════════════════════════════════════════════════

/// Every target cell painted.
pub fn check_win(state: &GameState) -> bool {
    rules::is_complete(state.level.target(), &state.painted)
}

fn finish_if_won(state: &mut GameState, events: &mut Vec<GameEvent>) {
    if state.phase != Phase::Active || !check_win(state) {
        return;
    }
    let stars = scoring::rate(state.moves, state.elapsed_secs, &state.level.par());
    let result = LevelResult { stars, moves: state.moves, time_secs: state.elapsed_secs };
    state.phase = Phase::Won;
    state.result = Some(result);
    info!(
        level = state.level.name(),
        moves = result.moves,
        time_secs = result.time_secs,
        stars = stars.count(),
        "level cleared"
    );
    events.push(GameEvent::LevelWon(result));
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::piece::Rotation;
    use crate::domain::scoring::Stars;
    use crate::sim::level::{builtin_levels, parse_level};

    fn square() -> GameState {
        GameState::new(builtin_levels().remove(0))
    }

    fn star() -> GameState {
        GameState::new(builtin_levels().remove(2))
    }

    fn tiny() -> GameState {
        GameState::new(parse_level("# Tiny\n@ par 5 5\nP##\n").unwrap())
    }

    fn run(state: &mut GameState, dir: MoveDir, n: usize) {
        for _ in 0..n {
            apply(state, Action::Move(dir));
        }
    }

    fn ticks(state: &mut GameState, n: u32) {
        let mut events = vec![];
        for _ in 0..n {
            tick(state, &mut events);
        }
    }

    /// Walk the single-cell cursor to (5,5) and snake through the 6x6 target.
    /// Calls `before_last` just before the final cell is painted.
    fn clear_square(state: &mut GameState, before_last: impl FnOnce(&mut GameState)) {
        run(state, MoveDir::Right, 5);
        run(state, MoveDir::Down, 5);
        for row in 0..6 {
            let dir = if row % 2 == 0 { MoveDir::Right } else { MoveDir::Left };
            let steps = if row == 5 { 4 } else { 5 };
            run(state, dir, steps);
            if row < 5 {
                run(state, MoveDir::Down, 1);
            }
        }
        before_last(state);
        run(state, MoveDir::Left, 1);
    }

    // ── Movement ──

    #[test]
    fn move_clamps_at_edges() {
        let mut s = square();
        let mut ev = vec![];
        assert_eq!(move_by(&mut s, -1, 0, &mut ev), Outcome::NoChange);
        assert!(ev.is_empty());
        assert_eq!(move_by(&mut s, 100, -3, &mut ev), Outcome::Applied);
        assert_eq!(s.pose().position, Cell::new(15, 0));
    }

    #[test]
    fn huge_moves_clamp_to_the_edge() {
        let mut s = square();
        let mut ev = vec![];
        assert_eq!(move_by(&mut s, 1, 0, &mut ev), Outcome::Applied);
        assert_eq!(move_by(&mut s, i32::MAX, 0, &mut ev), Outcome::Applied);
        assert_eq!(s.pose().position, Cell::new(15, 0));
        assert_eq!(move_by(&mut s, i32::MIN, i32::MAX, &mut ev), Outcome::Applied);
        assert_eq!(s.pose().position, Cell::new(0, 15));
        assert_eq!(move_by(&mut s, i32::MIN, i32::MAX, &mut ev), Outcome::NoChange);
    }

    #[test]
    fn moving_outside_target_paints_without_counting() {
        let mut s = square();
        let ev = apply(&mut s, Action::Move(MoveDir::Right));
        assert!(s.is_painted(Cell::new(1, 0)));
        assert_eq!(s.moves(), 0);
        assert!(ev.contains(&GameEvent::CellsPainted { cells: vec![Cell::new(1, 0)], counted: false }));
    }

    #[test]
    fn moving_onto_target_counts_once() {
        let mut s = square();
        run(&mut s, MoveDir::Right, 5);
        run(&mut s, MoveDir::Down, 5);
        assert_eq!(s.moves(), 1);
        // Back over painted cells: no new paint, no move.
        run(&mut s, MoveDir::Up, 1);
        run(&mut s, MoveDir::Down, 1);
        assert_eq!(s.moves(), 1);
    }

    #[test]
    fn multi_cell_paint_is_one_move() {
        let mut s = star();
        // (4,4) R0 → (3,4): adds (3,4) and (3,3), both target.
        let ev = apply(&mut s, Action::Move(MoveDir::Left));
        assert_eq!(s.moves(), 1);
        let painted: Vec<&GameEvent> = ev.iter().filter(|e| matches!(e, GameEvent::CellsPainted { .. })).collect();
        assert_eq!(painted.len(), 1);
    }

    // ── Painting ──

    #[test]
    fn paint_is_idempotent() {
        let mut s = square();
        let mut ev = vec![];
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::NoChange);
        assert!(s.is_painted(Cell::new(0, 0)));
        assert_eq!(s.moves(), 0);
    }

    #[test]
    fn explicit_paint_on_target_counts() {
        let mut s = GameState::new(parse_level("# T\n@ par 5 5\n*#\n").unwrap());
        let mut ev = vec![];
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(s.moves(), 1);
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::NoChange);
        assert_eq!(s.moves(), 1);
    }

    // ── Rotation ──

    #[test]
    fn rotation_counts_as_move() {
        let mut s = star();
        let mut ev = vec![];
        assert_eq!(rotate(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(s.pose().rotation, Rotation::R90);
        assert_eq!(s.moves(), 1);
        // R90 at (4,4) adds (4,5); still a single move.
        assert!(s.is_painted(Cell::new(4, 5)));
    }

    #[test]
    fn four_rotations_return_to_start() {
        let mut s = star();
        let before: HashSet<Cell> = s.footprint().collect();
        let mut ev = vec![];
        for _ in 0..4 {
            assert_eq!(rotate(&mut s, &mut ev), Outcome::Applied);
        }
        let after: HashSet<Cell> = s.footprint().collect();
        assert_eq!(s.pose().rotation, Rotation::R0);
        assert_eq!(before, after);
        assert_eq!(s.moves(), 4);
    }

    #[test]
    fn rotation_off_grid_is_invalid() {
        let mut s = star();
        run(&mut s, MoveDir::Left, 4);
        run(&mut s, MoveDir::Down, 4);
        assert_eq!(s.pose().position, Cell::new(0, 8));
        let painted = s.painted().clone();
        let moves = s.moves();

        let mut ev = vec![];
        assert_eq!(rotate(&mut s, &mut ev), Outcome::Invalid);
        assert_eq!(ev, vec![GameEvent::InvalidAction(Action::Rotate)]);
        assert_eq!(s.pose().rotation, Rotation::R0);
        assert_eq!(s.moves(), moves);
        assert_eq!(s.painted(), &painted);
    }

    #[test]
    fn single_cell_rotation_is_invalid() {
        let mut s = square();
        let mut ev = vec![];
        assert_eq!(rotate(&mut s, &mut ev), Outcome::Invalid);
        assert_eq!(s.moves(), 0);
    }

    // ── Pause / clock ──

    #[test]
    fn paused_rejects_input_and_stops_clock() {
        let mut s = square();
        let mut ev = vec![];
        assert_eq!(toggle_pause(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(s.phase(), Phase::Paused);
        assert_eq!(move_piece(&mut s, MoveDir::Right, &mut ev), Outcome::Rejected);
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::Rejected);
        assert_eq!(rotate(&mut s, &mut ev), Outcome::Rejected);
        assert_eq!(tick(&mut s, &mut ev), Outcome::NoChange);
        assert_eq!(s.elapsed_secs(), 0);
        assert_eq!(s.pose(), Pose::at(0, 0));

        assert_eq!(toggle_pause(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(tick(&mut s, &mut ev), Outcome::Applied);
        assert_eq!(s.elapsed_secs(), 1);
    }

    // ── Win ──

    #[test]
    fn win_freezes_state() {
        let mut s = tiny();
        run(&mut s, MoveDir::Right, 2);
        assert!(s.is_won());
        assert!(check_win(&s));
        let result = s.result().unwrap();
        assert_eq!(result, LevelResult { stars: Stars::Three, moves: 2, time_secs: 0 });

        let painted = s.painted().clone();
        let mut ev = vec![];
        assert_eq!(move_piece(&mut s, MoveDir::Left, &mut ev), Outcome::Rejected);
        assert_eq!(rotate(&mut s, &mut ev), Outcome::Rejected);
        assert_eq!(paint_at_cursor(&mut s, &mut ev), Outcome::Rejected);
        assert_eq!(toggle_pause(&mut s, &mut ev), Outcome::Rejected);
        assert_eq!(tick(&mut s, &mut ev), Outcome::NoChange);
        assert!(ev.is_empty());
        assert_eq!(s.painted(), &painted);
        assert_eq!(s.moves(), 2);
        assert_eq!(s.elapsed_secs(), 0);
    }

    #[test]
    fn win_event_emitted_by_completing_move() {
        let mut s = tiny();
        apply(&mut s, Action::Move(MoveDir::Right));
        let ev = apply(&mut s, Action::Move(MoveDir::Right));
        assert!(matches!(ev.last(), Some(GameEvent::LevelWon(_))));
    }

    #[test]
    fn extra_painted_cells_do_not_block_win() {
        let mut s = tiny();
        let mut ev = vec![];
        paint_at_cursor(&mut s, &mut ev); // (0,0) is not target
        run(&mut s, MoveDir::Right, 2);
        assert!(s.is_won());
        assert_eq!(s.painted().len(), 3);
    }

    // ── Scenario: rectangle level scoring ──

    #[test]
    fn square_cleared_on_par_scores_three() {
        let mut s = square();
        clear_square(&mut s, |s| ticks(s, 30));
        assert!(s.is_won());
        let r = s.result().unwrap();
        assert_eq!(r.moves, 36);
        assert_eq!(r.time_secs, 30);
        assert_eq!(r.stars, Stars::Three);
    }

    #[test]
    fn square_cleared_slowly_scores_two() {
        let mut s = square();
        clear_square(&mut s, |s| ticks(s, 31));
        let r = s.result().unwrap();
        assert_eq!(r.moves, 36);
        assert_eq!(r.stars, Stars::Two);
    }

    #[test]
    fn clock_stops_after_win() {
        let mut s = square();
        clear_square(&mut s, |s| ticks(s, 3));
        ticks(&mut s, 10);
        assert_eq!(s.elapsed_secs(), 3);
    }

    // ── Scenario: reset ──

    #[test]
    fn reset_restores_start_footprint() {
        let mut s = star();
        let start: HashSet<Cell> = s.painted().clone();
        apply(&mut s, Action::Move(MoveDir::Left));
        apply(&mut s, Action::Rotate);
        apply(&mut s, Action::TogglePause);
        ticks(&mut s, 4);
        assert!(s.moves() > 0);

        let ev = apply(&mut s, Action::Reset);
        assert_eq!(ev, vec![GameEvent::LevelReset]);
        assert_eq!(s.painted(), &start);
        assert_eq!(s.moves(), 0);
        assert_eq!(s.elapsed_secs(), 0);
        assert_eq!(s.pose(), s.level().start());
        assert_ne!(s.phase(), Phase::Paused);
    }

    #[test]
    fn reset_leaves_won() {
        let mut s = tiny();
        run(&mut s, MoveDir::Right, 2);
        assert!(s.is_won());
        apply(&mut s, Action::Reset);
        assert_eq!(s.phase(), Phase::Active);
        assert!(s.result().is_none());
        assert!(s.painted().is_empty());
    }

    // ══════════════════════════════════════════════════════════
    // Property tests
    // ══════════════════════════════════════════════════════════

    mod props {
        use proptest::prelude::*;

        use super::super::*;
        use crate::sim::level::builtin_levels;

        #[derive(Clone, Copy, Debug)]
        enum Op {
            Act(Action),
            Tick,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                8 => prop_oneof![
                    Just(MoveDir::Left),
                    Just(MoveDir::Right),
                    Just(MoveDir::Up),
                    Just(MoveDir::Down),
                ].prop_map(|d| Op::Act(Action::Move(d))),
                2 => Just(Op::Act(Action::Rotate)),
                2 => Just(Op::Act(Action::Paint)),
                1 => Just(Op::Act(Action::TogglePause)),
                1 => Just(Op::Act(Action::Reset)),
                3 => Just(Op::Tick),
            ]
        }

        fn run_op(state: &mut GameState, op: Op) {
            match op {
                Op::Act(a) => {
                    apply(state, a);
                }
                Op::Tick => {
                    tick(state, &mut vec![]);
                }
            }
        }

        proptest! {
            #[test]
            fn painted_and_pose_stay_on_grid(level in 0usize..3, ops in proptest::collection::vec(op(), 0..200)) {
                let mut s = GameState::new(builtin_levels().remove(level));
                let grid = s.level().grid();
                for op in ops {
                    run_op(&mut s, op);
                    prop_assert!(s.painted().iter().all(|&c| grid.contains(c)));
                    prop_assert!(s.level().board().fits(s.pose()));
                }
            }

            #[test]
            fn moves_only_drop_on_reset(level in 0usize..3, ops in proptest::collection::vec(op(), 0..200)) {
                let mut s = GameState::new(builtin_levels().remove(level));
                for op in ops {
                    let before = s.moves();
                    run_op(&mut s, op);
                    if !matches!(op, Op::Act(Action::Reset)) {
                        prop_assert!(s.moves() >= before);
                    }
                }
            }

            #[test]
            fn won_iff_target_covered(level in 0usize..3, ops in proptest::collection::vec(op(), 0..300)) {
                let mut s = GameState::new(builtin_levels().remove(level));
                for op in ops {
                    run_op(&mut s, op);
                    let covered = s.level().target().iter().all(|c| s.is_painted(c));
                    prop_assert_eq!(check_win(&s), covered);
                    prop_assert_eq!(s.is_won(), covered);
                    prop_assert_eq!(s.result().is_some(), s.is_won());
                }
            }

            #[test]
            fn won_state_ignores_play_input(ops in proptest::collection::vec(op(), 0..50)) {
                let mut s = GameState::new(crate::sim::level::parse_level("# T\n@ par 5 5\nP##\n").unwrap());
                apply(&mut s, Action::Move(MoveDir::Right));
                apply(&mut s, Action::Move(MoveDir::Right));
                prop_assert!(s.is_won());
                let painted = s.painted().clone();
                for op in ops {
                    if matches!(op, Op::Act(Action::Reset)) {
                        continue;
                    }
                    run_op(&mut s, op);
                    prop_assert!(s.is_won());
                    prop_assert_eq!(s.painted(), &painted);
                    prop_assert_eq!(s.moves(), 2);
                    prop_assert_eq!(s.elapsed_secs(), 0);
                }
            }
        }
    }
}
