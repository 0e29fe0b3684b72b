//! Input surface of the painting engine. Key/button bindings live in the UI.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// One discrete player command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Move(MoveDir),
    Rotate,
    Paint,
    TogglePause,
    Reset,
}
