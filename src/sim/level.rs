//! Level descriptors: validation, text format, and sources.
//!
//! ## Sources (priority order):
//!   1. `levels/` directory (every `.txt` file, sorted by file name)
//!   2. Built-in embedded pack
//!
//! ## Level format (`.txt`):
//!   ```text
//!   # Level Name
//!   @ par <moves> <seconds>
//!   @ piece 0,0 1,0 0,-1        (optional, default single cell)
//!   @ rotate 0 90 180 270       (optional, default 0)
//!   @ start <x> <y> [degrees]   (optional when the map has a pivot marker)
//!   @ grid <cols> <rows>        (rect targets only)
//!   @ rect <x> <y> <w> <h>      (rect targets only)
//!   <map rows>
//!   ```
//!
//! Several levels may share a file, separated by a line containing only `---`.
//! Lines starting with `;` are comments and are skipped. `#` cannot mark a
//! comment because map rows are made of `#`.
//!
//! ## Map legend:
//!   '#' = Target cell            '*' = Target cell + start pivot
//!   'P' = Start pivot            '.' or ' ' = Empty

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::cell::{Cell, Grid};
use crate::domain::piece::{PieceShape, Pose, Rotation, ShapeError};
use crate::domain::rules::BoardView;
use crate::domain::scoring::Par;
use crate::domain::target::{TargetRect, TargetRegion};

/// Largest grid side a level may declare.
pub const MAX_GRID_SIDE: i32 = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("grid must be at least 1x1 (got {cols}x{rows})")]
    BadGrid { cols: i32, rows: i32 },
    #[error("grid {cols}x{rows} is larger than {max}x{max}", max = MAX_GRID_SIDE)]
    GridTooLarge { cols: i32, rows: i32 },
    #[error("target is empty")]
    EmptyTarget,
    #[error("target cell {0} is outside the grid")]
    TargetOutOfBounds(Cell),
    #[error("par must be positive (moves {moves}, time {time_secs}s)")]
    ZeroPar { moves: u32, time_secs: u32 },
    #[error("piece does not support start rotation {deg}", deg = .0.degrees())]
    UnsupportedStartRotation(Rotation),
    #[error("start footprint at {0} leaves the grid")]
    StartOutOfBounds(Cell),
    #[error("no piece pose can paint target cell {0}")]
    Uncoverable(Cell),
    #[error("start footprint already covers the whole target")]
    AlreadySolved,
    #[error("bad piece: {0}")]
    Shape(#[from] ShapeError),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

fn parse_err(line: usize, message: impl Into<String>) -> LevelError {
    LevelError::Parse { line, message: message.into() }
}

/// Immutable level geometry and scoring parameters.
///
/// Only obtainable through [`LevelDef::new`], so every descriptor the engine
/// sees has passed validation.
#[derive(Clone, Debug)]
pub struct LevelDef {
    name: String,
    grid: Grid,
    piece: PieceShape,
    start: Pose,
    target: TargetRegion,
    par: Par,
}

impl LevelDef {
    pub fn new(
        name: impl Into<String>,
        grid: Grid,
        piece: PieceShape,
        start: Pose,
        target: TargetRegion,
        par: Par,
    ) -> Result<Self, LevelError> {
        check_grid(grid)?;
        if target.is_empty() {
            return Err(LevelError::EmptyTarget);
        }
        if let Some(c) = target.iter().find(|&c| !grid.contains(c)) {
            return Err(LevelError::TargetOutOfBounds(c));
        }
        if par.moves == 0 || par.time_secs == 0 {
            return Err(LevelError::ZeroPar { moves: par.moves, time_secs: par.time_secs });
        }
        if !piece.supports(start.rotation) {
            return Err(LevelError::UnsupportedStartRotation(start.rotation));
        }

        let board = BoardView::new(grid, &piece);
        if !board.fits(start) {
            return Err(LevelError::StartOutOfBounds(start.position));
        }
        if let Some(c) = target.iter().find(|&c| !board.can_cover(c)) {
            return Err(LevelError::Uncoverable(c));
        }
        if piece.is_multi_cell() && target.iter().all(|c| piece.footprint(start).any(|f| f == c)) {
            return Err(LevelError::AlreadySolved);
        }

        Ok(LevelDef { name: name.into(), grid, piece, start, target, par })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn grid(&self) -> Grid { self.grid }
    pub fn piece(&self) -> &PieceShape { &self.piece }
    pub fn start(&self) -> Pose { self.start }
    pub fn target(&self) -> &TargetRegion { &self.target }
    pub fn par(&self) -> Par { self.par }

    pub fn board(&self) -> BoardView<'_> {
        BoardView::new(self.grid, &self.piece)
    }

    /// Multi-cell pieces start with their footprint already painted.
    pub fn seeds_start(&self) -> bool {
        self.piece.is_multi_cell()
    }
}

fn check_grid(grid: Grid) -> Result<(), LevelError> {
    let Grid { cols, rows } = grid;
    if cols <= 0 || rows <= 0 {
        return Err(LevelError::BadGrid { cols, rows });
    }
    if cols > MAX_GRID_SIDE || rows > MAX_GRID_SIDE {
        return Err(LevelError::GridTooLarge { cols, rows });
    }
    Ok(())
}

/// Same checks `LevelDef::new` makes on a target, done on the rectangle
/// before it is expanded to cells.
fn check_rect(grid: Grid, rect: TargetRect) -> Result<(), LevelError> {
    check_grid(grid)?;
    if rect.is_empty() {
        return Err(LevelError::EmptyTarget);
    }
    match rect.first_outside(grid) {
        Some(c) => Err(LevelError::TargetOutOfBounds(c)),
        None => Ok(()),
    }
}

// ══════════════════════════════════════════════════════════════
// Public API: level sources
// ══════════════════════════════════════════════════════════════

/// Levels for this run: the levels directory if it yields any valid level,
/// otherwise the built-in pack.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir);
        if !levels.is_empty() {
            info!(dir = %dir.display(), count = levels.len(), "loaded levels from directory");
            return levels;
        }
        warn!(dir = %dir.display(), "levels directory has no valid levels, using built-in pack");
    }
    builtin_levels()
}

pub fn builtin_levels() -> Vec<LevelDef> {
    collect_valid(parse_pack(BUILTIN_PACK), "built-in")
}

/// Parse every level of a pack. Each entry is validated independently.
pub fn parse_pack(content: &str) -> Vec<Result<LevelDef, LevelError>> {
    let mut levels = vec![];
    let mut section: Vec<(usize, &str)> = vec![];

    for (i, line) in content.lines().enumerate() {
        if line.trim() == "---" {
            flush_section(&mut section, &mut levels);
            continue;
        }
        if line.trim_start().starts_with(';') {
            continue;
        }
        section.push((i + 1, line));
    }
    flush_section(&mut section, &mut levels);

    levels
}

/// Parse a single level.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let lines: Vec<(usize, &str)> = content.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();
    parse_lines(&lines)
}

fn flush_section(section: &mut Vec<(usize, &str)>, out: &mut Vec<Result<LevelDef, LevelError>>) {
    if section.iter().any(|(_, l)| !l.trim().is_empty()) {
        out.push(parse_lines(section));
    }
    section.clear();
}

fn collect_valid(parsed: Vec<Result<LevelDef, LevelError>>, source: &str) -> Vec<LevelDef> {
    parsed
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| match r {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(source, index = i + 1, error = %e, "skipping invalid level");
                None
            }
        })
        .collect()
}

fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read levels directory");
            return vec![];
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();

    let mut levels = vec![];
    for path in files {
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let source = path.display().to_string();
                levels.extend(collect_valid(parse_pack(&content), &source));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read level file"),
        }
    }
    levels
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

#[derive(Default)]
struct RawLevel {
    name: Option<String>,
    par: Option<Par>,
    piece: Option<Vec<Cell>>,
    rotations: Option<Vec<Rotation>>,
    start: Option<(usize, Cell, Option<Rotation>)>,
    grid: Option<Grid>,
    rect: Option<TargetRect>,
    map: Vec<(usize, String)>,
}

fn parse_lines(lines: &[(usize, &str)]) -> Result<LevelDef, LevelError> {
    let mut raw = RawLevel::default();
    let first_line = lines.first().map_or(1, |(n, _)| *n);

    for &(n, line) in lines {
        if raw.name.is_none() && raw.map.is_empty() && is_name_line(line) {
            raw.name = Some(line[1..].trim().to_string());
        } else if let Some(rest) = line.strip_prefix('@') {
            parse_directive(&mut raw, n, rest)?;
        } else if raw.map.is_empty() && line.trim().is_empty() {
            // blank lines before the map
        } else {
            raw.map.push((n, line.trim_end().to_string()));
        }
    }

    while raw.map.last().map_or(false, |(_, r)| r.trim().is_empty()) {
        raw.map.pop();
    }

    build(raw, first_line)
}

fn parse_directive(raw: &mut RawLevel, n: usize, rest: &str) -> Result<(), LevelError> {
    let mut words = rest.split_whitespace();
    let key = words.next().ok_or_else(|| parse_err(n, "empty directive"))?;
    let args: Vec<&str> = words.collect();

    let num = |s: &str| -> Result<i32, LevelError> {
        s.parse().map_err(|_| parse_err(n, format!("expected a number, got {s:?}")))
    };
    let rotation = |s: &str| -> Result<Rotation, LevelError> {
        s.parse::<u16>()
            .ok()
            .and_then(Rotation::from_degrees)
            .ok_or_else(|| parse_err(n, format!("rotation must be 0, 90, 180 or 270, got {s:?}")))
    };
    let expect = |count: usize| -> Result<(), LevelError> {
        if args.len() == count {
            Ok(())
        } else {
            Err(parse_err(n, format!("@ {key} takes {count} values, got {}", args.len())))
        }
    };
    let non_negative = |v: i32| -> Result<u32, LevelError> {
        u32::try_from(v).map_err(|_| parse_err(n, format!("@ {key} values cannot be negative")))
    };

    match key {
        "par" => {
            expect(2)?;
            raw.par = Some(Par {
                moves: non_negative(num(args[0])?)?,
                time_secs: non_negative(num(args[1])?)?,
            });
        }
        "piece" => {
            if args.is_empty() {
                return Err(parse_err(n, "@ piece needs at least one x,y offset"));
            }
            let cells = args
                .iter()
                .map(|a| a.parse::<Cell>().map_err(|e| parse_err(n, e.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            raw.piece = Some(cells);
        }
        "rotate" => {
            if args.is_empty() {
                return Err(parse_err(n, "@ rotate needs at least one rotation"));
            }
            raw.rotations = Some(args.iter().map(|a| rotation(*a)).collect::<Result<_, _>>()?);
        }
        "start" => {
            if args.len() != 2 && args.len() != 3 {
                return Err(parse_err(n, "@ start takes x y [degrees]"));
            }
            let cell = Cell::new(num(args[0])?, num(args[1])?);
            let rot = args.get(2).map(|a| rotation(*a)).transpose()?;
            raw.start = Some((n, cell, rot));
        }
        "grid" => {
            expect(2)?;
            raw.grid = Some(Grid::new(num(args[0])?, num(args[1])?));
        }
        "rect" => {
            expect(4)?;
            raw.rect = Some(TargetRect {
                origin: Cell::new(num(args[0])?, num(args[1])?),
                width: num(args[2])?,
                height: num(args[3])?,
            });
        }
        other => return Err(parse_err(n, format!("unknown directive @ {other}"))),
    }
    Ok(())
}

fn build(raw: RawLevel, first_line: usize) -> Result<LevelDef, LevelError> {
    let par = raw.par.ok_or_else(|| parse_err(first_line, "missing @ par"))?;

    let (grid, target, marker) = if raw.map.is_empty() {
        let grid = raw.grid.ok_or_else(|| parse_err(first_line, "missing map or @ grid"))?;
        let rect = raw.rect.ok_or_else(|| parse_err(first_line, "missing map or @ rect"))?;
        check_rect(grid, rect)?;
        (grid, TargetRegion::from_rect(rect), None)
    } else {
        if raw.rect.is_some() {
            return Err(parse_err(raw.map[0].0, "a level takes either a map or @ rect, not both"));
        }
        let (grid, target, marker) = parse_map(&raw.map)?;
        if let Some(g) = raw.grid {
            if g != grid {
                return Err(parse_err(
                    raw.map[0].0,
                    format!("@ grid {}x{} does not match the {}x{} map", g.cols, g.rows, grid.cols, grid.rows),
                ));
            }
        }
        (grid, target, marker)
    };

    let start = match (raw.start, marker) {
        (Some((n, _, _)), Some(_)) => {
            return Err(parse_err(n, "start given by both @ start and a map marker"));
        }
        (Some((_, cell, rot)), None) => Pose::new(cell, rot.unwrap_or_default()),
        (None, Some(cell)) => Pose::new(cell, Rotation::R0),
        (None, None) => return Err(parse_err(first_line, "missing start (@ start or a 'P'/'*' marker)")),
    };

    let piece = match raw.piece {
        Some(base) => {
            let rotations = raw.rotations.unwrap_or_else(|| vec![Rotation::R0]);
            PieceShape::from_base(&base, &rotations)?
        }
        None if raw.rotations.is_some() => {
            return Err(parse_err(first_line, "@ rotate needs an @ piece"));
        }
        None => PieceShape::single(),
    };

    let name = raw.name.unwrap_or_else(|| "Untitled".to_string());
    debug!(name = %name, cols = grid.cols, rows = grid.rows, target = target.len(), "parsed level");
    LevelDef::new(name, grid, piece, start, target, par)
}

/// Returns grid, target, and the pivot marker if any.
fn parse_map(rows: &[(usize, String)]) -> Result<(Grid, TargetRegion, Option<Cell>), LevelError> {
    let width = rows.iter().map(|(_, r)| r.chars().count()).max().unwrap_or(0);
    let grid = Grid::new(width as i32, rows.len() as i32);
    let mut cells = vec![];
    let mut marker: Option<Cell> = None;

    for (y, (n, row)) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let here = Cell::new(x as i32, y as i32);
            match ch {
                '#' => cells.push(here),
                '*' | 'P' => {
                    if marker.is_some() {
                        return Err(parse_err(*n, "more than one start marker"));
                    }
                    marker = Some(here);
                    if ch == '*' {
                        cells.push(here);
                    }
                }
                '.' | ' ' => {}
                other => return Err(parse_err(*n, format!("unexpected map character {other:?}"))),
            }
        }
    }

    Ok((grid, cells.into_iter().collect(), marker))
}

/// Distinguish `# Level Name` from `#####` (map data).
/// A name line starts with `#` and contains at least one letter.
fn is_name_line(line: &str) -> bool {
    line.starts_with('#') && line[1..].chars().any(|c| c.is_alphabetic())
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

const BUILTIN_PACK: &str = "\
; Tile Paint built-in levels
# Square
@ grid 16 16
@ rect 5 5 6 6
@ start 0 0
@ par 36 30
---
# Cross
@ piece -1,0 0,0 1,0
@ rotate 0 90
@ par 10 25
.........
....#....
....#....
....#....
.###*###.
....#....
....#....
....#....
.........
---
# Star
@ piece 0,0 1,0 0,-1
@ rotate 0 90 180 270
@ par 14 45
....#....
....#....
....#....
...###...
####*####
...###...
....#....
....#....
....#....
";

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
