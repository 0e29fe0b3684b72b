//! Fading trail of recently painted cells.
//!
//! Driven by `GameEvent`s with timestamps taken by the caller, so the engine
//! itself never sees wall time.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::domain::cell::Cell;
use crate::sim::event::GameEvent;

pub struct Trail {
    ttl: Duration,
    marks: VecDeque<(Cell, Instant)>,
}

impl Trail {
    pub fn new(ttl: Duration) -> Self {
        Trail {
            ttl,
            marks: VecDeque::new(),
        }
    }

    pub fn observe(&mut self, events: &[GameEvent], now: Instant) {
        for ev in events {
            match ev {
                GameEvent::CellsPainted { cells, .. } => {
                    self.marks.extend(cells.iter().map(|&c| (c, now)));
                }
                GameEvent::LevelReset => self.clear(),
                _ => {}
            }
        }
    }

    /// Drop marks older than the fade duration.
    pub fn prune(&mut self, now: Instant) {
        // Marks are pushed in time order, so expired ones sit at the front.
        while let Some(&(_, t)) = self.marks.front() {
            if now.saturating_duration_since(t) < self.ttl {
                break;
            }
            self.marks.pop_front();
        }
    }

    /// 1.0 when freshly painted, fading to 0.0. `None` if not on the trail.
    pub fn intensity(&self, cell: Cell, now: Instant) -> Option<f32> {
        if self.ttl.is_zero() {
            return None;
        }
        let t = self.marks.iter().rev().find(|(c, _)| *c == cell).map(|&(_, t)| t)?;
        let age = now.saturating_duration_since(t);
        if age >= self.ttl {
            return None;
        }
        Some(1.0 - age.as_secs_f32() / self.ttl.as_secs_f32())
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.marks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painted(cells: &[(i32, i32)]) -> GameEvent {
        GameEvent::CellsPainted {
            cells: cells.iter().map(|&(x, y)| Cell::new(x, y)).collect(),
            counted: true,
        }
    }

    #[test]
    fn fades_and_expires() {
        let t0 = Instant::now();
        let mut trail = Trail::new(Duration::from_millis(400));
        trail.observe(&[painted(&[(1, 1), (2, 1)])], t0);

        assert_eq!(trail.intensity(Cell::new(1, 1), t0), Some(1.0));
        let half = trail.intensity(Cell::new(2, 1), t0 + Duration::from_millis(200)).unwrap();
        assert!((half - 0.5).abs() < 1e-3);
        assert_eq!(trail.intensity(Cell::new(3, 3), t0), None);
        assert_eq!(trail.intensity(Cell::new(1, 1), t0 + Duration::from_millis(400)), None);
    }

    #[test]
    fn prune_drops_only_old_marks() {
        let t0 = Instant::now();
        let mut trail = Trail::new(Duration::from_millis(100));
        trail.observe(&[painted(&[(0, 0)])], t0);
        trail.observe(&[painted(&[(1, 0)])], t0 + Duration::from_millis(80));
        trail.prune(t0 + Duration::from_millis(120));
        assert_eq!(trail.len(), 1);
        assert!(trail.intensity(Cell::new(1, 0), t0 + Duration::from_millis(120)).is_some());
    }

    #[test]
    fn reset_event_clears() {
        let t0 = Instant::now();
        let mut trail = Trail::new(Duration::from_secs(1));
        trail.observe(&[painted(&[(0, 0)]), GameEvent::LevelReset], t0);
        assert_eq!(trail.len(), 0);
    }

    #[test]
    fn moves_alone_leave_no_trail() {
        let t0 = Instant::now();
        let mut trail = Trail::new(Duration::from_secs(1));
        trail.observe(&[GameEvent::PieceMoved { from: Cell::new(0, 0), to: Cell::new(1, 0) }], t0);
        assert_eq!(trail.len(), 0);
    }
}
