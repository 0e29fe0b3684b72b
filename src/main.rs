//! Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use config::GameConfig;
use domain::action::Action;
use sim::event::GameEvent;
use sim::level::{load_levels, LevelDef};
use sim::save::{self, FileStore, LevelId, ProgressStore};
use sim::step;
use sim::world::GameState;
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::{Renderer, Screen};
use ui::sound::{self, SoundEngine};
use ui::trail::Trail;

const ONE_SECOND: Duration = Duration::from_secs(1);

fn main() {
    let config = GameConfig::load();

    if logging::init(&config.log) {
        logging::report_startup_warnings(&config.load_warnings);
    } else {
        for w in &config.load_warnings {
            eprintln!("Warning: {w}");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "tilepaint starting");

    let levels = load_levels(&config);
    if levels.is_empty() {
        error!("no playable levels");
        eprintln!("No playable levels found.");
        return;
    }

    let store = FileStore::open(&config.progress_path);
    info!(path = %store.path().display(), "progress store opened");
    let mut app = App::new(levels, store, &config);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut app, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    info!("tilepaint exiting");
    println!("Thanks for playing Tile Paint!");
}

fn game_loop<S: ProgressStore>(
    app: &mut App<S>,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let frame = Duration::from_millis(config.display.frame_ms);

    loop {
        let now = Instant::now();

        let mut commands: Vec<Command> = kb.drain_events().to_vec();
        commands.extend(gp.update());

        for cmd in commands {
            let events = match app.handle(cmd, now) {
                Flow::Quit => return Ok(()),
                Flow::Continue(events) => events,
            };
            if let Some(sfx) = sound {
                sound::react(sfx, &events);
            }
        }

        app.advance_clock(now);

        let screen = app.screen();
        renderer.render(&screen, now)?;
        std::thread::sleep(frame);
    }
}

// ══════════════════════════════════════════════════════════════
// Application state
// ══════════════════════════════════════════════════════════════

/// One play session. Dropped on leaving the level, trail and clock with it.
struct Session {
    level_id: LevelId,
    state: GameState,
    trail: Trail,
    clock: Duration,
    last_frame: Instant,
    message: Option<(String, Instant)>,
}

enum Mode {
    Select { cursor: usize },
    Playing(Session),
}

enum Flow {
    Continue(Vec<GameEvent>),
    Quit,
}

struct App<S> {
    levels: Vec<LevelDef>,
    store: S,
    mode: Mode,
    trail_ttl: Duration,
    flash: Duration,
}

impl<S: ProgressStore> App<S> {
    fn new(levels: Vec<LevelDef>, store: S, config: &GameConfig) -> Self {
        // Open on the first level not yet completed
        let cursor = (0..levels.len())
            .find(|&i| store.record(id_of(i)).map_or(true, |r| !r.completed))
            .unwrap_or(0);
        App {
            levels,
            store,
            mode: Mode::Select { cursor },
            trail_ttl: Duration::from_millis(config.display.trail_ms),
            flash: Duration::from_millis(config.display.invalid_flash_ms),
        }
    }

    fn handle(&mut self, cmd: Command, now: Instant) -> Flow {
        if cmd == Command::Quit {
            return Flow::Quit;
        }
        match &mut self.mode {
            Mode::Select { cursor } => {
                let cursor = *cursor;
                self.handle_select(cmd, cursor, now)
            }
            Mode::Playing(_) => self.handle_playing(cmd, now),
        }
    }

    // ── Level select ──

    fn handle_select(&mut self, cmd: Command, cursor: usize, now: Instant) -> Flow {
        use domain::action::MoveDir;

        let last = self.levels.len().saturating_sub(1);
        match cmd {
            Command::Move(MoveDir::Up) => {
                self.mode = Mode::Select { cursor: cursor.saturating_sub(1) };
            }
            Command::Move(MoveDir::Down) => {
                self.mode = Mode::Select { cursor: (cursor + 1).min(last) };
            }
            Command::Confirm | Command::Primary => {
                if !self.start_level(cursor, now) {
                    debug!(level = id_of(cursor), "level is locked");
                }
            }
            Command::Back => return Flow::Quit,
            _ => {}
        }
        Flow::Continue(vec![])
    }

    /// Enter a level if it is unlocked.
    fn start_level(&mut self, index: usize, now: Instant) -> bool {
        let id = id_of(index);
        let Some(level) = self.levels.get(index) else { return false };
        if !self.store.is_unlocked(id) {
            return false;
        }
        info!(level = id, name = level.name(), "level started");
        self.mode = Mode::Playing(Session {
            level_id: id,
            state: GameState::new(level.clone()),
            trail: Trail::new(self.trail_ttl),
            clock: Duration::ZERO,
            last_frame: now,
            message: None,
        });
        true
    }

    fn leave_level(&mut self) {
        if let Mode::Playing(session) = &self.mode {
            let cursor = index_of(session.level_id);
            debug!(level = session.level_id, "left level");
            self.mode = Mode::Select { cursor };
        }
    }

    // ── Playing ──

    fn handle_playing(&mut self, cmd: Command, now: Instant) -> Flow {
        let Mode::Playing(session) = &mut self.mode else {
            return Flow::Continue(vec![]);
        };

        let action = match cmd {
            Command::Move(dir) => Action::Move(dir),
            Command::Primary if session.state.level().piece().is_rotatable() => Action::Rotate,
            Command::Primary | Command::Paint => Action::Paint,
            Command::Pause => Action::TogglePause,
            Command::Reset => Action::Reset,
            Command::Confirm => {
                if session.state.is_won() {
                    let next = index_of(session.level_id) + 1;
                    if !self.start_level(next, now) {
                        self.leave_level();
                    }
                }
                return Flow::Continue(vec![]);
            }
            Command::Back => {
                self.leave_level();
                return Flow::Continue(vec![]);
            }
            Command::Quit => return Flow::Quit,
        };

        let events = step::apply(&mut session.state, action);
        session.trail.observe(&events, now);

        for ev in &events {
            match ev {
                GameEvent::InvalidAction(_) => {
                    session.message = Some(("Can't do that here".into(), now + self.flash));
                }
                GameEvent::LevelWon(result) => {
                    if let Err(e) = save::record_result(&mut self.store, session.level_id, result) {
                        warn!(level = session.level_id, error = %e, "progress not saved");
                        session.message = Some((format!("Progress not saved: {e}"), now + 3 * ONE_SECOND));
                    }
                }
                _ => {}
            }
        }

        Flow::Continue(events)
    }

    /// Fire `tick` once for every whole second of wall time.
    fn advance_clock(&mut self, now: Instant) {
        let Mode::Playing(session) = &mut self.mode else { return };
        session.clock += now.saturating_duration_since(session.last_frame);
        session.last_frame = now;

        let mut events = vec![];
        while session.clock >= ONE_SECOND {
            session.clock -= ONE_SECOND;
            step::tick(&mut session.state, &mut events);
        }
        session.trail.prune(now);
        if session.message.as_ref().map_or(false, |(_, until)| now >= *until) {
            session.message = None;
        }
    }

    fn screen(&self) -> Screen<'_> {
        match &self.mode {
            Mode::Select { cursor } => Screen::Select {
                levels: &self.levels,
                store: &self.store,
                cursor: *cursor,
            },
            Mode::Playing(session) => Screen::Playing {
                level_id: session.level_id,
                state: &session.state,
                trail: &session.trail,
                message: session.message.as_ref().map(|(m, _)| m.as_str()),
            },
        }
    }
}

/// Level ids are 1-based list positions.
fn id_of(index: usize) -> LevelId {
    index as LevelId + 1
}

fn index_of(id: LevelId) -> usize {
    id.saturating_sub(1) as usize
}
