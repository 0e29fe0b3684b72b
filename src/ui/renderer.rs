//! Presentation layer: double-buffered, diff-based terminal renderer.
//!
//! How it works:
//!   1. Build the next frame into the `front` buffer
//!   2. Compare each glyph with the `back` buffer (previous frame)
//!   3. Only emit terminal commands for glyphs that changed
//!   4. All commands are batched with `queue!`, flushed once at the end
//!   5. Swap front/back

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::cell::Cell;
use crate::domain::scoring::Stars;
use crate::sim::level::LevelDef;
use crate::sim::save::{LevelId, ProgressStore};
use crate::sim::world::{GameState, Phase};
use crate::ui::trail::Trail;

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    /// Explicit background for every "empty" cell, also used for Clear, so
    /// inter-row gaps on VTE terminals match the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: Glyph::BASE_BG };

    /// Never equal to a real glyph; forces a full repaint.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Glyph { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Glyph::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── What to draw ──

pub enum Screen<'a> {
    Select {
        levels: &'a [LevelDef],
        store: &'a dyn ProgressStore,
        cursor: usize,
    },
    Playing {
        level_id: LevelId,
        state: &'a GameState,
        trail: &'a Trail,
        message: Option<&'a str>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ScreenKind {
    Select,
    Playing,
}

impl Screen<'_> {
    fn kind(&self) -> ScreenKind {
        match self {
            Screen::Select { .. } => ScreenKind::Select,
            Screen::Playing { .. } => ScreenKind::Playing,
        }
    }
}

// ── Renderer ──

/// Each board cell is two terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const TITLE: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const DIM: Color = Color::DarkGrey;
const TARGET: Color = Color::Rgb { r: 120, g: 110, b: 60 };
const PAINT: Color = Color::Rgb { r: 60, g: 170, b: 110 };
const PAINT_OFF_TARGET: Color = Color::Rgb { r: 70, g: 70, b: 90 };
const PIECE: Color = Color::Rgb { r: 255, g: 240, b: 120 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<ScreenKind>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Glyph::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, screen: &Screen<'_>, now: Instant) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        // Screen change → clear for a clean transition
        if self.last_screen != Some(screen.kind()) {
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen.kind());
        }

        self.compose(screen, now);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn compose(&mut self, screen: &Screen<'_>, now: Instant) {
        self.front.clear();
        match *screen {
            Screen::Select { levels, store, cursor } => {
                self.compose_level_select(levels, store, cursor);
            }
            Screen::Playing { level_id, state, trail, message } => {
                self.compose_game(level_id, state, trail, now);
                match state.phase() {
                    Phase::Paused => self.compose_pause_overlay(state),
                    Phase::Won => self.compose_won_banner(state),
                    Phase::Active => {}
                }
                self.compose_footer(state, message);
            }
        }
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Glyph::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }

                queue!(self.writer, Print(g.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: level select ──

    fn compose_level_select(&mut self, levels: &[LevelDef], store: &dyn ProgressStore, cursor: usize) {
        let hi = Color::Rgb { r: 80, g: 255, b: 80 };
        let normal = Color::White;
        let cursor_bg = Color::Rgb { r: 30, g: 60, b: 30 };

        self.front.put_str(2, 1, "╔══════════════════════════════════════════╗", TITLE, Color::Reset);
        self.front.put_str(2, 2, "║              T I L E   P A I N T         ║", TITLE, Color::Reset);
        self.front.put_str(2, 3, "╚══════════════════════════════════════════╝", TITLE, Color::Reset);

        let list_top = 5;
        let visible = 16_usize.min(self.front.height.saturating_sub(list_top + 3)).max(1);
        let scroll = cursor.saturating_sub(visible - 1);

        for (i, level) in levels.iter().enumerate().skip(scroll).take(visible) {
            let row = list_top + (i - scroll);
            let id = (i + 1) as LevelId;
            let unlocked = store.is_unlocked(id);
            let record = store.record(id);

            let num = format!("{:>3}.", id);
            let name: String = level.name().chars().take(24).collect();
            let stars = star_string(record.and_then(|r| r.stars()));
            let best = match record.and_then(|r| r.best_moves.zip(r.best_time)) {
                Some((m, t)) => format!("{m:>3} moves {}", format_clock(t)),
                None => String::new(),
            };
            let lock = if unlocked { ' ' } else { '×' };

            let (fg, bg) = if i == cursor {
                for x in 0..52.min(self.front.width) {
                    self.front.set(x, row, Glyph::new(' ', normal, cursor_bg));
                }
                self.front.put_str(2, row, "▸", hi, cursor_bg);
                (hi, cursor_bg)
            } else if unlocked {
                (normal, Color::Reset)
            } else {
                (DIM, Color::Reset)
            };

            self.front.put_str(3, row, &num, fg, bg);
            self.front.set(8, row, Glyph::new(lock, DIM, bg));
            self.front.put_str(10, row, &name, fg, bg);
            self.front.put_str(35, row, &stars, TITLE, bg);
            self.front.put_str(40, row, &best, DIM, bg);
        }

        let footer_row = list_top + visible + 1;
        self.front.put_str(2, footer_row, "ENTER/SPACE: Play   ↑↓: Select   ESC: Quit", DIM, Color::Reset);
    }

    // ── Compose: play screen ──

    fn compose_game(&mut self, level_id: LevelId, state: &GameState, trail: &Trail, now: Instant) {
        let level = state.level();
        let par = level.par();

        let hud = format!(
            "{}. {}   Moves {}/{}   Time {}/{}   {}/{} {:>3.0}%",
            level_id,
            level.name(),
            state.moves(),
            par.moves,
            format_clock(state.elapsed_secs()),
            format_clock(par.time_secs),
            state.painted_target_count(),
            level.target().len(),
            state.completion() * 100.0,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Color::Reset);

        let footprint: Vec<Cell> = state.footprint().collect();
        let grid = level.grid();
        for gy in 0..grid.rows {
            let row = MAP_ROW + gy as usize;
            if row >= self.front.height { break; }
            for gx in 0..grid.cols {
                let col = gx as usize * CELL_W;
                if col + 1 >= self.front.width { break; }
                let cell = Cell::new(gx, gy);
                let (ch, fg, bg) = cell_style(state, trail, &footprint, cell, now);
                self.front.set(col, row, Glyph::new(ch, fg, bg));
                self.front.set(col + 1, row, Glyph::new(ch, fg, bg));
            }
        }
    }

    fn compose_footer(&mut self, state: &GameState, message: Option<&str>) {
        let below = MAP_ROW + state.level().grid().rows as usize + 1;
        if let Some(msg) = message {
            self.front.put_str(0, below, msg, Color::Rgb { r: 255, g: 120, b: 120 }, Color::Reset);
        }
        let help = if state.level().piece().is_rotatable() {
            "←↑↓→ Move  SPACE Rotate  F Paint  P Pause  R Reset  ESC Levels"
        } else {
            "←↑↓→ Move  SPACE/F Paint  P Pause  R Reset  ESC Levels"
        };
        self.front.put_str(0, below + 1, help, DIM, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, state: &GameState) {
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };
        let (x, y) = self.banner_origin(state, 22, 3);
        for dy in 0..3 {
            for dx in 0..22 {
                self.front.set(x + dx, y + dy, Glyph::new(' ', Color::Reset, bg));
            }
        }
        self.front.put_str(x + 6, y + 1, "P A U S E D", TITLE, bg);
    }

    fn compose_won_banner(&mut self, state: &GameState) {
        let Some(result) = state.result() else { return };
        let bg = Color::Rgb { r: 20, g: 50, b: 30 };
        let (x, y) = self.banner_origin(state, 26, 5);
        for dy in 0..5 {
            for dx in 0..26 {
                self.front.set(x + dx, y + dy, Glyph::new(' ', Color::Reset, bg));
            }
        }
        self.front.put_str(x + 7, y + 1, "LEVEL CLEAR!", TITLE, bg);
        self.front.put_str(x + 10, y + 2, &star_string(Some(result.stars)), TITLE, bg);
        let line = format!("{} moves  {}", result.moves, format_clock(result.time_secs));
        self.front.put_str(x + 13usize.saturating_sub(line.len() / 2), y + 3, &line, Color::White, bg);
    }

    /// Top-left of a `w`×`h` box centered on the board.
    fn banner_origin(&self, state: &GameState, w: usize, h: usize) -> (usize, usize) {
        let grid = state.level().grid();
        let board_w = grid.cols as usize * CELL_W;
        let board_h = grid.rows as usize;
        (board_w.saturating_sub(w) / 2, MAP_ROW + board_h.saturating_sub(h) / 2)
    }
}

/// Character and colors for one board cell.
fn cell_style(state: &GameState, trail: &Trail, footprint: &[Cell], cell: Cell, now: Instant) -> (char, Color, Color) {
    let is_target = state.level().target().contains(cell);
    let painted = state.is_painted(cell);

    if footprint.contains(&cell) {
        return ('█', PIECE, Color::Reset);
    }
    match (is_target, painted) {
        (true, true) => {
            let glow = trail.intensity(cell, now).unwrap_or(0.0);
            ('█', lerp(PAINT, Color::Rgb { r: 170, g: 255, b: 200 }, glow), Color::Reset)
        }
        (false, true) => {
            let glow = trail.intensity(cell, now).unwrap_or(0.0);
            ('░', lerp(PAINT_OFF_TARGET, Color::Rgb { r: 150, g: 150, b: 180 }, glow), Color::Reset)
        }
        (true, false) => ('·', TARGET, Color::Reset),
        (false, false) => (' ', Color::Reset, Color::Reset),
    }
}

fn lerp(a: Color, b: Color, t: f32) -> Color {
    match (a, b) {
        (Color::Rgb { r: r0, g: g0, b: b0 }, Color::Rgb { r: r1, g: g1, b: b1 }) => {
            let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t.clamp(0.0, 1.0)).round() as u8;
            Color::Rgb { r: mix(r0, r1), g: mix(g0, g1), b: mix(b0, b1) }
        }
        _ => a,
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn star_string(stars: Option<Stars>) -> String {
    let n = stars.map_or(0, |s| s.count() as usize);
    (0..3).map(|i| if i < n { '★' } else { '☆' }).collect()
}
