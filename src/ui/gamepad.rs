//! Gamepad input tracker using gilrs.
//!
//! Button mapping is loaded from config.toml via `load_button_config()`.
//! Default mapping:
//!   D-pad / Left Stick    →  Move (one step per press)
//!   A                     →  Action (rotate or paint)
//!   X                     →  Paint
//!   Start                 →  Pause
//!   Y                     →  Reset
//!   Select / B            →  Back

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::info;

use crate::config::GamepadConfig;
use crate::domain::action::MoveDir;
use crate::ui::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Command-to-button mapping (loaded from config).
#[derive(Debug)]
struct ActionMap {
    action: Vec<Btn>,
    paint: Vec<Btn>,
    pause: Vec<Btn>,
    reset: Vec<Btn>,
    back: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            action: vec![Btn::A],
            paint:  vec![Btn::X],
            pause:  vec![Btn::Start],
            reset:  vec![Btn::Y],
            back:   vec![Btn::Select, Btn::B],
        }
    }
}

impl ActionMap {
    /// Commands for one freshly pressed button, in a fixed priority order.
    fn commands_for(&self, btn: Btn) -> impl Iterator<Item = Command> + '_ {
        [
            (&self.action, Command::Primary),
            (&self.paint, Command::Paint),
            (&self.pause, Command::Pause),
            (&self.reset, Command::Reset),
            (&self.back, Command::Back),
        ]
        .into_iter()
        .filter(move |(btns, _)| btns.contains(&btn))
        .map(|(_, cmd)| cmd)
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // Edge-triggered presses collected this frame
    pressed: Vec<Btn>,
    dpad: Vec<MoveDir>,

    // Stick direction currently past the deadzone
    stick_dir: Option<MoveDir>,
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(_) => (None, false),
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            pressed: Vec::with_capacity(BTN_COUNT),
            dpad: Vec::with_capacity(4),
            stick_dir: None,
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        for (names, slot) in [
            (&cfg.action, &mut map.action),
            (&cfg.paint, &mut map.paint),
            (&cfg.pause, &mut map.pause),
            (&cfg.reset, &mut map.reset),
            (&cfg.back, &mut map.back),
        ] {
            let btns = parse_list(names);
            if !btns.is_empty() {
                *slot = btns;
            }
        }
    }

    /// Poll the pad and return this frame's commands.
    pub fn update(&mut self) -> Vec<Command> {
        self.pressed.clear();
        self.dpad.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.commands()
    }

    fn commands(&self) -> Vec<Command> {
        let mut out: Vec<Command> = self.dpad.iter().map(|&d| Command::Move(d)).collect();
        for &btn in &self.pressed {
            out.extend(self.action_map.commands_for(btn));
        }
        out
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.press(btn);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                }
                _ => {}
            }
        }

        // The stick acts like a D-pad: one step each time it leaves the center
        let dir = stick_direction(self.stick_x, self.stick_y);
        if dir.is_some() && dir != self.stick_dir {
            self.dpad.extend(dir);
        }
        self.stick_dir = dir;
    }

    #[cfg(feature = "gamepad")]
    fn press(&mut self, gilrs_btn: Button) {
        // D-pad is not in the Btn enum
        let dir = match gilrs_btn {
            Button::DPadUp    => Some(MoveDir::Up),
            Button::DPadDown  => Some(MoveDir::Down),
            Button::DPadLeft  => Some(MoveDir::Left),
            Button::DPadRight => Some(MoveDir::Right),
            _ => None,
        };
        if let Some(d) = dir {
            self.dpad.push(d);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.pressed.push(btn);
        }
    }
}

/// Dominant stick axis past the deadzone. gilrs reports +Y as up.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
fn stick_direction(x: f32, y: f32) -> Option<MoveDir> {
    if x.abs() < STICK_DEADZONE && y.abs() < STICK_DEADZONE {
        return None;
    }
    Some(if x.abs() >= y.abs() {
        if x < 0.0 { MoveDir::Left } else { MoveDir::Right }
    } else if y > 0.0 {
        MoveDir::Up
    } else {
        MoveDir::Down
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names() {
        assert_eq!(Btn::from_name("a"), Some(Btn::A));
        assert_eq!(Btn::from_name("RB"), Some(Btn::R1));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Turbo"), None);
    }

    #[test]
    fn config_overrides_and_ignores_unknown() {
        let mut pad = GamepadState::new();
        let cfg = GamepadConfig {
            action: vec!["R1".into()],
            paint: vec!["nope".into()],
            pause: vec![],
            reset: vec!["L1".into(), "L2".into()],
            back: vec!["Select".into()],
        };
        pad.load_button_config(&cfg);
        assert_eq!(pad.action_map.action, vec![Btn::R1]);
        assert_eq!(pad.action_map.paint, vec![Btn::X]);
        assert_eq!(pad.action_map.pause, vec![Btn::Start]);
        assert_eq!(pad.action_map.reset, vec![Btn::L1, Btn::L2]);
        assert_eq!(pad.action_map.back, vec![Btn::Select]);
    }

    #[test]
    fn pressed_buttons_become_commands() {
        let mut pad = GamepadState::new();
        pad.dpad.push(MoveDir::Left);
        pad.pressed.push(Btn::A);
        pad.pressed.push(Btn::B);
        assert_eq!(
            pad.commands(),
            vec![Command::Move(MoveDir::Left), Command::Primary, Command::Back]
        );
    }

    #[test]
    fn stick_picks_dominant_axis() {
        assert_eq!(stick_direction(0.1, -0.2), None);
        assert_eq!(stick_direction(-0.9, 0.3), Some(MoveDir::Left));
        assert_eq!(stick_direction(0.2, 0.8), Some(MoveDir::Up));
        assert_eq!(stick_direction(0.0, -0.7), Some(MoveDir::Down));
    }
}
