//! Grid coordinates and bounds.
//!
//! A `Cell` is identified canonically by its `"x,y"` key (see `Display` /
//! `FromStr`), the same form used in level files for piece offsets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const ORIGIN: Cell = Cell { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    /// The cell displaced by `(dx, dy)`. Saturates at the `i32` range, which
    /// lies outside any grid.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Cell {
        Cell { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy) }
    }

    /// Translate by another cell used as an offset vector.
    #[inline]
    pub fn translate(self, by: Cell) -> Cell {
        self.offset(by.x, by.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cell key {input:?} (expected \"x,y\")")]
pub struct ParseCellError {
    pub input: String,
}

impl FromStr for Cell {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellError { input: s.to_string() };
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse().map_err(|_| err())?;
        let y = y.trim().parse().map_err(|_| err())?;
        Ok(Cell { x, y })
    }
}

/// Grid dimensions. Both are positive for any grid owned by a validated level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
}

impl Grid {
    pub const fn new(cols: i32, rows: i32) -> Self {
        Grid { cols, rows }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.cols && cell.y >= 0 && cell.y < self.rows
    }

    /// Every cell, row-major.
    #[cfg(test)]
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |y| (0..self.cols).map(move |x| Cell::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(Cell::new(3, 12).to_string(), "3,12");
        assert_eq!(Cell::new(-1, 0).to_string(), "-1,0");
    }

    #[test]
    fn key_parse() {
        assert_eq!("3,12".parse::<Cell>(), Ok(Cell::new(3, 12)));
        assert_eq!(" 0 , -1 ".parse::<Cell>(), Ok(Cell::new(0, -1)));
        assert!("3".parse::<Cell>().is_err());
        assert!("a,b".parse::<Cell>().is_err());
        assert!("1,2,3".parse::<Cell>().is_err());
    }

    #[test]
    fn offset_saturates_instead_of_wrapping() {
        let c = Cell::new(1, -1).offset(i32::MAX, i32::MIN);
        assert_eq!(c, Cell::new(i32::MAX, i32::MIN));
        assert!(!Grid::new(16, 16).contains(c));
    }

    #[test]
    fn grid_bounds() {
        let g = Grid::new(4, 3);
        assert!(g.contains(Cell::new(0, 0)));
        assert!(g.contains(Cell::new(3, 2)));
        assert!(!g.contains(Cell::new(4, 0)));
        assert!(!g.contains(Cell::new(0, 3)));
        assert!(!g.contains(Cell::new(-1, 1)));
        assert_eq!(g.cells().count(), 12);
    }
}
