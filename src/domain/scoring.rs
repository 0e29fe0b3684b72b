//! Star rating against par.
//!
//! ┌─────────────────────────────────────────┬───────┐
//! │ Condition                                │ Stars │
//! ├─────────────────────────────────────────┼───────┤
//! │ moves ≤ par.moves AND time ≤ par.time    │ 3     │
//! │ moves ≤ par.moves                        │ 2     │
//! │ otherwise                                │ 1     │
//! └─────────────────────────────────────────┴───────┘

/// Move/time thresholds. Both positive for a validated level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Par {
    pub moves: u32,
    pub time_secs: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Stars {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Stars {
    pub fn count(self) -> u8 {
        self as u8
    }

    /// Clamp a stored value back into a rating.
    pub fn from_count(n: u8) -> Stars {
        match n {
            0 | 1 => Stars::One,
            2 => Stars::Two,
            _ => Stars::Three,
        }
    }
}

/// Frozen at the instant a level is won.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelResult {
    pub stars: Stars,
    pub moves: u32,
    pub time_secs: u32,
}

pub fn rate(moves: u32, time_secs: u32, par: &Par) -> Stars {
    if moves <= par.moves && time_secs <= par.time_secs {
        Stars::Three
    } else if moves <= par.moves {
        Stars::Two
    } else {
        Stars::One
    }
}
