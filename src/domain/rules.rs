//! Placement rules: pure queries over grid + piece geometry.
//!
//! These encode "what is legal" without performing the action.
//!
//! ## Placement Truth Table
//!
//! ### Fit (is a pose legal?)
//! ┌───────────────────────────────┬──────────┐
//! │ Condition                      │ Fits?    │
//! ├───────────────────────────────┼──────────┤
//! │ rotation unsupported by piece  │ NO       │
//! │ any footprint cell off-grid    │ NO       │
//! │ otherwise                      │ YES      │
//! └───────────────────────────────┴──────────┘
//!
//! ### Move (clamp)
//! ┌───────────────────────────────┬──────────────────────────────┐
//! │ Axis                           │ Pivot range                  │
//! ├───────────────────────────────┼──────────────────────────────┤
//! │ x                              │ [−min_dx, cols − 1 − max_dx] │
//! │ y                              │ [−min_dy, rows − 1 − max_dy] │
//! └───────────────────────────────┴──────────────────────────────┘
//! Each axis is clamped independently, so pushing diagonally into a wall
//! still slides along the free axis.
//!
//! ### Rotate
//! Allowed iff the current pivot fits with the next rotation's footprint.
//! No wall kicks: the pivot never moves during a rotation.

use std::collections::HashSet;

use super::cell::{Cell, Grid};
use super::piece::{PieceShape, Pose, Rotation};
use super::target::TargetRegion;

/// Immutable view of grid + piece for rule queries.
pub struct BoardView<'a> {
    pub grid: Grid,
    pub piece: &'a PieceShape,
}

impl<'a> BoardView<'a> {
    pub fn new(grid: Grid, piece: &'a PieceShape) -> Self {
        BoardView { grid, piece }
    }

    /// See the fit table above.
    pub fn fits(&self, pose: Pose) -> bool {
        match self.piece.offsets(pose.rotation) {
            Some(offsets) => offsets
                .iter()
                .all(|&o| self.grid.contains(pose.position.translate(o))),
            None => false,
        }
    }

    /// Pivot range `(min, max)` per axis for a rotation, or `None` when the
    /// footprint cannot fit anywhere on the grid.
    pub fn pivot_range(&self, rotation: Rotation) -> Option<((i32, i32), (i32, i32))> {
        let (min_dx, min_dy, max_dx, max_dy) = self.piece.extents(rotation)?;
        let xr = (min_dx.saturating_neg(), (self.grid.cols - 1).saturating_sub(max_dx));
        let yr = (min_dy.saturating_neg(), (self.grid.rows - 1).saturating_sub(max_dy));
        if xr.0 > xr.1 || yr.0 > yr.1 {
            return None;
        }
        Some((xr, yr))
    }

    /// Clamp a proposed pivot so the whole footprint stays on the grid.
    pub fn clamp(&self, rotation: Rotation, proposed: Cell) -> Option<Cell> {
        let ((x0, x1), (y0, y1)) = self.pivot_range(rotation)?;
        Some(Cell::new(proposed.x.clamp(x0, x1), proposed.y.clamp(y0, y1)))
    }

    /// Can any legal pose paint `cell`?
    pub fn can_cover(&self, cell: Cell) -> bool {
        self.piece.rotations().any(|r| {
            self.piece.offsets(r).unwrap_or(&[]).iter().any(|&o| {
                let pivot = cell.offset(o.x.saturating_neg(), o.y.saturating_neg());
                self.fits(Pose::new(pivot, r))
            })
        })
    }
}

// ── Win / progress ──

/// Every target cell painted. Extra painted cells never block.
pub fn is_complete(target: &TargetRegion, painted: &HashSet<Cell>) -> bool {
    target.iter().all(|c| painted.contains(&c))
}

/// `|painted ∩ target| / |target|`, in `[0, 1]`.
pub fn completion(target: &TargetRegion, painted: &HashSet<Cell>) -> f32 {
    if target.is_empty() {
        return 1.0;
    }
    target.covered_by(painted) as f32 / target.len() as f32
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
