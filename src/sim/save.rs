//! Level progress: completion flags, best scores, and unlocking.
//!
//! ## Storage:
//!   One TOML file holds every level's record:
//!   ```toml
//!   [levels."1"]
//!   completed = true
//!   best_moves = 36
//!   best_time = 28
//!   stars = 3
//!   ```
//!
//! Level ids are 1-based positions in the loaded level list.
//!
//! Reads never fail: a missing or corrupt file is "no progress". Writes
//! return `StoreError` and leave the in-memory records as they were merged.

use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::scoring::{LevelResult, Stars};

pub type LevelId = u32;

pub const PROGRESS_FILE: &str = "progress.toml";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write progress: {0}")]
    Io(#[from] io::Error),
    #[error("cannot encode progress: {0}")]
    Encode(#[from] toml::ser::Error),
}

// ══════════════════════════════════════════════════════════════
// Records
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LevelRecord {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_moves: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u8>,
}

impl LevelRecord {
    /// Fold one completion in: best moves and time are minima, stars the maximum.
    pub fn merge(&mut self, moves: u32, time_secs: u32, stars: Stars) {
        self.completed = true;
        self.best_moves = Some(self.best_moves.map_or(moves, |m| m.min(moves)));
        self.best_time = Some(self.best_time.map_or(time_secs, |t| t.min(time_secs)));
        self.stars = Some(self.stars.map_or(stars.count(), |s| s.max(stars.count())));
    }

    pub fn stars(&self) -> Option<Stars> {
        self.stars.map(Stars::from_count)
    }
}

// ══════════════════════════════════════════════════════════════
// Store interface
// ══════════════════════════════════════════════════════════════

pub trait ProgressStore {
    fn record(&self, level: LevelId) -> Option<LevelRecord>;

    fn record_completion(
        &mut self,
        level: LevelId,
        moves: u32,
        time_secs: u32,
        stars: Stars,
    ) -> Result<(), StoreError>;

    fn flush(&mut self) -> Result<(), StoreError>;

    /// Level 1 is always open; level N needs level N-1 completed.
    fn is_unlocked(&self, level: LevelId) -> bool {
        level <= 1 || self.record(level - 1).map_or(false, |r| r.completed)
    }
}

/// Persist a won level's result.
pub fn record_result(
    store: &mut dyn ProgressStore,
    level: LevelId,
    result: &LevelResult,
) -> Result<(), StoreError> {
    store.record_completion(level, result.moves, result.time_secs, result.stars)
}

// ── In-memory ──

#[cfg(test)]
#[derive(Default, Debug)]
pub struct MemoryStore {
    records: HashMap<LevelId, LevelRecord>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl ProgressStore for MemoryStore {
    fn record(&self, level: LevelId) -> Option<LevelRecord> {
        self.records.get(&level).copied()
    }

    fn record_completion(
        &mut self,
        level: LevelId,
        moves: u32,
        time_secs: u32,
        stars: Stars,
    ) -> Result<(), StoreError> {
        self.records.entry(level).or_default().merge(moves, time_secs, stars);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ── TOML file ──

#[derive(Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    levels: BTreeMap<String, LevelRecord>,
}

/// Write-through file store: every completion is flushed immediately.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: BTreeMap<LevelId, LevelRecord>,
}

impl FileStore {
    /// Open the progress file. Never fails; unreadable content starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => parse_progress(&content, &path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no progress file yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read progress, starting empty");
                BTreeMap::new()
            }
        };
        info!(path = %path.display(), levels = records.len(), "progress store opened");
        FileStore { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_progress(content: &str, path: &Path) -> BTreeMap<LevelId, LevelRecord> {
    let file: ProgressFile = match toml::from_str(content) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt progress file, starting empty");
            return BTreeMap::new();
        }
    };
    file.levels
        .into_iter()
        .filter_map(|(key, rec)| match key.parse::<LevelId>() {
            Ok(id) if id > 0 => Some((id, rec)),
            _ => {
                warn!(key = %key, "ignoring progress entry with bad level id");
                None
            }
        })
        .collect()
}

impl ProgressStore for FileStore {
    fn record(&self, level: LevelId) -> Option<LevelRecord> {
        self.records.get(&level).copied()
    }

    fn record_completion(
        &mut self,
        level: LevelId,
        moves: u32,
        time_secs: u32,
        stars: Stars,
    ) -> Result<(), StoreError> {
        self.records.entry(level).or_default().merge(moves, time_secs, stars);
        self.flush()
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let file = ProgressFile {
            levels: self.records.iter().map(|(id, r)| (id.to_string(), *r)).collect(),
        };
        let text = toml::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so a crash never truncates progress.
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "progress flushed");
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Directory for progress and log files.
pub fn save_dir() -> PathBuf {
    // 1. Exe directory (local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ are not writable
            let test_path = parent.join(".write_test_tilepaint");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilepaint");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
