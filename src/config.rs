//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory, CWD, or the data
//! directories. Falls back to defaults if the file is missing or incomplete.
//! Problems are collected in `load_warnings` and logged once logging is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::sim::save;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub levels_dir: PathBuf,
    pub progress_path: PathBuf,
    pub display: DisplayConfig,
    pub gamepad: GamepadConfig,
    pub log: LogConfig,
    pub load_warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub frame_ms: u64,
    pub trail_ms: u64,
    pub invalid_flash_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub action: Vec<String>,
    pub paint: Vec<String>,
    pub pause: Vec<String>,
    pub reset: Vec<String>,
    pub back: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub filter: String,
    pub file: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    progress_file: String,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_trail_ms")]
    trail_ms: u64,
    #[serde(default = "default_invalid_flash_ms")]
    invalid_flash_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_action")]
    action: Vec<String>,
    #[serde(default = "default_paint")]
    paint: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
    #[serde(default = "default_back")]
    back: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_filter")]
    filter: String,
    #[serde(default)]
    file: String,
}

// ── Defaults ──

fn default_levels_dir() -> String { "levels".into() }
fn default_frame_ms() -> u64 { 16 }
fn default_trail_ms() -> u64 { 600 }
fn default_invalid_flash_ms() -> u64 { 400 }

fn default_action() -> Vec<String> { vec!["A".into()] }
fn default_paint() -> Vec<String> { vec!["X".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_reset() -> Vec<String> { vec!["Y".into()] }
fn default_back() -> Vec<String> { vec!["Select".into(), "B".into()] }

fn default_log_filter() -> String { "info".into() }

const LOG_FILE: &str = "tilepaint.log";

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            progress_file: String::new(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            frame_ms: default_frame_ms(),
            trail_ms: default_trail_ms(),
            invalid_flash_ms: default_invalid_flash_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            action: default_action(),
            paint: default_paint(),
            pause: default_pause(),
            reset: default_reset(),
            back: default_back(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog {
            filter: default_log_filter(),
            file: String::new(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Missing file or missing keys fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        let mut cfg = Self::resolve(toml_cfg, &search_dirs, save::save_dir);
        cfg.load_warnings = warnings;
        cfg
    }

    /// Parse config text directly; paths resolve against `base`.
    pub fn from_toml_str(text: &str, base: &Path) -> Self {
        let mut warnings = vec![];
        let toml_cfg = parse_toml(text, "config.toml", &mut warnings);
        let mut cfg = Self::resolve(toml_cfg, &[base.to_path_buf()], || base.to_path_buf());
        cfg.load_warnings = warnings;
        cfg
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf], data_dir: impl Fn() -> PathBuf) -> Self {
        // Levels folder: absolute as given, else the first candidate dir that has it
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if Path::new(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let progress_path = file_or_default(&toml_cfg.general.progress_file, || {
            data_dir().join(save::PROGRESS_FILE)
        });
        let log_file = file_or_default(&toml_cfg.log.file, || data_dir().join(LOG_FILE));

        GameConfig {
            levels_dir,
            progress_path,
            display: DisplayConfig {
                frame_ms: toml_cfg.display.frame_ms.max(1),
                trail_ms: toml_cfg.display.trail_ms,
                invalid_flash_ms: toml_cfg.display.invalid_flash_ms,
            },
            gamepad: GamepadConfig {
                action: toml_cfg.gamepad.action,
                paint: toml_cfg.gamepad.paint,
                pause: toml_cfg.gamepad.pause,
                reset: toml_cfg.gamepad.reset,
                back: toml_cfg.gamepad.back,
            },
            log: LogConfig {
                filter: toml_cfg.log.filter,
                file: log_file,
            },
            load_warnings: vec![],
        }
    }
}

fn file_or_default(configured: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    if configured.trim().is_empty() {
        default()
    } else {
        PathBuf::from(configured)
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so /usr/bin/tilepaint finds data next to the real binary
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/tilepaint)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilepaint");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/tilepaint");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First readable config.toml in the candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text, &path.display().to_string(), warnings),
                Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, source: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{source} parse error, using default settings: {e}"));
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let base = Path::new("/data");
        let cfg = GameConfig::from_toml_str("", base);
        assert!(cfg.load_warnings.is_empty());
        assert_eq!(cfg.display.frame_ms, 16);
        assert_eq!(cfg.display.trail_ms, 600);
        assert_eq!(cfg.display.invalid_flash_ms, 400);
        assert_eq!(cfg.gamepad.back, vec!["Select".to_string(), "B".to_string()]);
        assert_eq!(cfg.log.filter, "info");
        assert_eq!(cfg.progress_path, base.join("progress.toml"));
        assert_eq!(cfg.log.file, base.join("tilepaint.log"));
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = "[display]\ntrail_ms = 900\n\n[gamepad]\npaint = [\"RB\"]\n\n[general]\nprogress_file = \"/tmp/p.toml\"\n";
        let cfg = GameConfig::from_toml_str(text, Path::new("/data"));
        assert_eq!(cfg.display.trail_ms, 900);
        assert_eq!(cfg.display.frame_ms, 16);
        assert_eq!(cfg.gamepad.paint, vec!["RB".to_string()]);
        assert_eq!(cfg.gamepad.action, vec!["A".to_string()]);
        assert_eq!(cfg.progress_path, PathBuf::from("/tmp/p.toml"));
    }

    #[test]
    fn parse_error_falls_back_with_warning() {
        let cfg = GameConfig::from_toml_str("[display\nframe_ms = ", Path::new("/data"));
        assert_eq!(cfg.load_warnings.len(), 1);
        assert_eq!(cfg.display.frame_ms, 16);
    }

    #[test]
    fn zero_frame_period_is_clamped() {
        let cfg = GameConfig::from_toml_str("[display]\nframe_ms = 0\n", Path::new("/data"));
        assert_eq!(cfg.display.frame_ms, 1);
    }

    #[test]
    fn levels_dir_found_in_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("packs")).unwrap();
        let cfg = GameConfig::from_toml_str("[general]\nlevels_dir = \"packs\"\n", dir.path());
        assert_eq!(cfg.levels_dir, dir.path().join("packs"));
    }
}
