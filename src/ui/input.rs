//! Keyboard input.
//!
//! Every Press or Repeat event becomes one discrete command, so holding a
//! key steps the piece at the terminal's auto-repeat rate. Release events
//! are ignored. Key bindings:
//!
//!   Arrows / WASD   →  Move (list cursor on the level screen)
//!   Space           →  Action (rotate if the piece rotates, else paint)
//!   F               →  Paint
//!   P / F1          →  Pause
//!   R / F2          →  Reset
//!   Enter           →  Confirm
//!   Esc             →  Back
//!   Ctrl+C          →  Quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::action::MoveDir;

/// Device-independent UI command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(MoveDir),
    Primary,
    Paint,
    Pause,
    Reset,
    Confirm,
    Back,
    Quit,
}

pub struct InputState {
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            commands: Vec::with_capacity(8),
        }
    }

    /// Drain pending terminal events without blocking. Call once per frame.
    pub fn drain_events(&mut self) -> &[Command] {
        self.commands.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if let Some(cmd) = map_key(&key) {
                    self.commands.push(cmd);
                }
            }
        }

        &self.commands
    }
}

pub fn map_key(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Quit),
            _ => None,
        };
    }

    let cmd = match key.code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Move(MoveDir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Move(MoveDir::Right),
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Move(MoveDir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Move(MoveDir::Down),
        KeyCode::Char(' ') => Command::Primary,
        KeyCode::Char('f') | KeyCode::Char('F') => Command::Paint,
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::F(1) => Command::Pause,
        KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::F(2) => Command::Reset,
        KeyCode::Enter => Command::Confirm,
        KeyCode::Esc => Command::Back,
        _ => return None,
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_wasd_move() {
        assert_eq!(map_key(&key(KeyCode::Left)), Some(Command::Move(MoveDir::Left)));
        assert_eq!(map_key(&key(KeyCode::Char('w'))), Some(Command::Move(MoveDir::Up)));
        assert_eq!(map_key(&key(KeyCode::Char('S'))), Some(Command::Move(MoveDir::Down)));
    }

    #[test]
    fn play_keys() {
        assert_eq!(map_key(&key(KeyCode::Char(' '))), Some(Command::Primary));
        assert_eq!(map_key(&key(KeyCode::Char('f'))), Some(Command::Paint));
        assert_eq!(map_key(&key(KeyCode::F(1))), Some(Command::Pause));
        assert_eq!(map_key(&key(KeyCode::Char('r'))), Some(Command::Reset));
        assert_eq!(map_key(&key(KeyCode::Esc)), Some(Command::Back));
        assert_eq!(map_key(&key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn release_is_ignored() {
        let ev = KeyEvent {
            code: KeyCode::Left,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_key(&ev), None);
    }

    #[test]
    fn ctrl_c_quits() {
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ev), Some(Command::Quit));
        // Ctrl+D is not a move
        let ev = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ev), None);
    }
}
