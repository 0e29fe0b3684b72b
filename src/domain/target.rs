//! Target region: the cells that must all be painted to clear a level.

use std::collections::{BTreeSet, HashSet};

use super::cell::{Cell, Grid};

/// A rectangular target as written in a level file, before expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetRect {
    pub origin: Cell,
    pub width: i32,
    pub height: i32,
}

impl TargetRect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// First cell (in `Cell` order, x then y) that lies outside `grid`, or
    /// `None` when the whole rectangle is on it. Never walks the cells, so an
    /// oversized rectangle costs nothing to reject.
    pub fn first_outside(&self, grid: Grid) -> Option<Cell> {
        if self.is_empty() {
            return None;
        }
        let Cell { x, y } = self.origin;
        let right = i64::from(x) + i64::from(self.width);
        let bottom = i64::from(y) + i64::from(self.height);
        if !grid.contains(self.origin) {
            Some(self.origin)
        } else if bottom > i64::from(grid.rows) {
            Some(Cell::new(x, grid.rows))
        } else if right > i64::from(grid.cols) {
            Some(Cell::new(grid.cols, y))
        } else {
            None
        }
    }
}

/// Normalized target. Ordered so iteration (rendering, errors) is stable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRegion {
    cells: BTreeSet<Cell>,
}

impl TargetRegion {
    /// Expand a rectangle to its cells. Check it with
    /// [`TargetRect::first_outside`] first when the size is untrusted.
    pub fn from_rect(rect: TargetRect) -> Self {
        let TargetRect { origin, width, height } = rect;
        let cells = (0..height)
            .flat_map(|dy| (0..width).map(move |dx| origin.offset(dx, dy)))
            .collect();
        TargetRegion { cells }
    }

    pub fn rect(origin: Cell, width: i32, height: i32) -> Self {
        Self::from_rect(TargetRect { origin, width, height })
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    /// Number of target cells present in `painted`.
    pub fn covered_by(&self, painted: &HashSet<Cell>) -> usize {
        self.cells.iter().filter(|c| painted.contains(c)).count()
    }
}

impl FromIterator<Cell> for TargetRegion {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        TargetRegion { cells: iter.into_iter().collect() }
    }
}
