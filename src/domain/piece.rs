//! Pieces: the movable footprint the player steers around the grid.
//!
//! A piece has one or more rotation states. Each state is an ordered list of
//! offsets from the pivot cell. The simplest piece is the single cell
//! `[(0,0)]` with only `R0`.

use thiserror::Error;

use super::cell::Cell;

/// Discrete rotation state. The full cycle is R0 → R90 → R180 → R270 → R0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    pub fn from_degrees(deg: u16) -> Option<Rotation> {
        match deg {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    /// Next state in the full cycle (ignores which states a piece supports).
    pub fn next(self) -> Rotation {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    fn quarter_turns(self) -> u8 {
        (self.degrees() / 90) as u8
    }

    /// Rotate an offset clockwise on screen (y grows downward): (x, y) → (−y, x).
    pub fn apply(self, offset: Cell) -> Cell {
        let mut c = offset;
        for _ in 0..self.quarter_turns() {
            c = Cell::new(c.y.saturating_neg(), c.x);
        }
        c
    }
}

/// Position + rotation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pose {
    pub position: Cell,
    pub rotation: Rotation,
}

impl Pose {
    pub fn new(position: Cell, rotation: Rotation) -> Self {
        Pose { position, rotation }
    }

    pub fn at(x: i32, y: i32) -> Self {
        Pose { position: Cell::new(x, y), rotation: Rotation::R0 }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("piece has no rotation states")]
    NoStates,
    #[error("rotation {deg} has no cells", deg = .0.degrees())]
    EmptyState(Rotation),
    #[error("rotation {deg} lists offset {offset} twice", deg = .rotation.degrees())]
    DuplicateOffset { rotation: Rotation, offset: Cell },
    #[error("rotation {deg} is defined twice", deg = .0.degrees())]
    DuplicateState(Rotation),
}

/// Offsets per supported rotation, kept in cycle order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PieceShape {
    states: Vec<(Rotation, Vec<Cell>)>,
}

impl PieceShape {
    /// The one-cell cursor used by simple levels.
    pub fn single() -> Self {
        PieceShape { states: vec![(Rotation::R0, vec![Cell::ORIGIN])] }
    }

    /// Derive each supported state by rotating `base` (the R0 layout).
    pub fn from_base(base: &[Cell], rotations: &[Rotation]) -> Result<Self, ShapeError> {
        let states = rotations
            .iter()
            .map(|&r| (r, base.iter().map(|&c| r.apply(c)).collect()))
            .collect();
        Self::from_states(states)
    }

    /// Explicit offsets per rotation.
    pub fn from_states(mut states: Vec<(Rotation, Vec<Cell>)>) -> Result<Self, ShapeError> {
        if states.is_empty() {
            return Err(ShapeError::NoStates);
        }
        states.sort_by_key(|(r, _)| *r);
        for pair in states.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(ShapeError::DuplicateState(pair[0].0));
            }
        }
        for (rotation, offsets) in &states {
            if offsets.is_empty() {
                return Err(ShapeError::EmptyState(*rotation));
            }
            for (i, offset) in offsets.iter().enumerate() {
                if offsets[..i].contains(offset) {
                    return Err(ShapeError::DuplicateOffset { rotation: *rotation, offset: *offset });
                }
            }
        }
        Ok(PieceShape { states })
    }

    pub fn offsets(&self, rotation: Rotation) -> Option<&[Cell]> {
        self.states
            .iter()
            .find(|(r, _)| *r == rotation)
            .map(|(_, o)| o.as_slice())
    }

    pub fn supports(&self, rotation: Rotation) -> bool {
        self.offsets(rotation).is_some()
    }

    pub fn rotations(&self) -> impl Iterator<Item = Rotation> + '_ {
        self.states.iter().map(|(r, _)| *r)
    }

    pub fn is_rotatable(&self) -> bool {
        self.states.len() > 1
    }

    /// More than one cell in any state.
    pub fn is_multi_cell(&self) -> bool {
        self.states.iter().any(|(_, o)| o.len() > 1)
    }

    /// Next supported state after `current`, walking the full cycle.
    /// `None` when the piece only has one state.
    pub fn next_rotation(&self, current: Rotation) -> Option<Rotation> {
        if !self.is_rotatable() {
            return None;
        }
        let mut r = current.next();
        while r != current {
            if self.supports(r) {
                return Some(r);
            }
            r = r.next();
        }
        None
    }

    /// Cells covered by the piece at `pose`. Empty if the rotation is unsupported.
    pub fn footprint(&self, pose: Pose) -> impl Iterator<Item = Cell> + '_ {
        self.offsets(pose.rotation)
            .unwrap_or(&[])
            .iter()
            .map(move |&o| pose.position.translate(o))
    }

    /// Offset extents `(min_dx, min_dy, max_dx, max_dy)` for one state.
    pub fn extents(&self, rotation: Rotation) -> Option<(i32, i32, i32, i32)> {
        let offsets = self.offsets(rotation)?;
        let init = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        Some(offsets.iter().fold(init, |(x0, y0, x1, y1), c| {
            (x0.min(c.x), y0.min(c.y), x1.max(c.x), y1.max(c.y))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_tromino() -> PieceShape {
        let base = [Cell::new(0, 0), Cell::new(1, 0), Cell::new(0, -1)];
        PieceShape::from_base(&base, &Rotation::ALL).unwrap()
    }

    #[test]
    fn rotation_cycle() {
        let mut r = Rotation::R0;
        for _ in 0..4 {
            r = r.next();
        }
        assert_eq!(r, Rotation::R0);
        assert_eq!(Rotation::from_degrees(270), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn quarter_turn_is_clockwise_on_screen() {
        // Right of pivot turns into below pivot.
        assert_eq!(Rotation::R90.apply(Cell::new(1, 0)), Cell::new(0, 1));
        assert_eq!(Rotation::R180.apply(Cell::new(1, 0)), Cell::new(-1, 0));
        assert_eq!(Rotation::R270.apply(Cell::new(1, 0)), Cell::new(0, -1));
    }

    #[test]
    fn derived_states() {
        let p = l_tromino();
        assert_eq!(
            p.offsets(Rotation::R90).unwrap(),
            &[Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 0)]
        );
        assert!(p.is_rotatable());
        assert!(p.is_multi_cell());
        assert_eq!(p.extents(Rotation::R0), Some((0, -1, 1, 0)));
    }

    #[test]
    fn single_cell_does_not_rotate() {
        let p = PieceShape::single();
        assert!(!p.is_rotatable());
        assert!(!p.is_multi_cell());
        assert_eq!(p.next_rotation(Rotation::R0), None);
        let cells: Vec<Cell> = p.footprint(Pose::at(2, 3)).collect();
        assert_eq!(cells, vec![Cell::new(2, 3)]);
    }

    #[test]
    fn next_rotation_skips_unsupported() {
        let bar = [Cell::new(-1, 0), Cell::new(0, 0), Cell::new(1, 0)];
        let p = PieceShape::from_base(&bar, &[Rotation::R0, Rotation::R90]).unwrap();
        assert_eq!(p.next_rotation(Rotation::R0), Some(Rotation::R90));
        assert_eq!(p.next_rotation(Rotation::R90), Some(Rotation::R0));
    }

    #[test]
    fn shape_validation() {
        assert_eq!(PieceShape::from_states(vec![]), Err(ShapeError::NoStates));
        assert_eq!(
            PieceShape::from_states(vec![(Rotation::R0, vec![])]),
            Err(ShapeError::EmptyState(Rotation::R0))
        );
        assert_eq!(
            PieceShape::from_states(vec![(Rotation::R0, vec![Cell::ORIGIN, Cell::ORIGIN])]),
            Err(ShapeError::DuplicateOffset { rotation: Rotation::R0, offset: Cell::ORIGIN })
        );
        assert_eq!(
            PieceShape::from_states(vec![
                (Rotation::R90, vec![Cell::ORIGIN]),
                (Rotation::R90, vec![Cell::ORIGIN]),
            ]),
            Err(ShapeError::DuplicateState(Rotation::R90))
        );
    }
}
