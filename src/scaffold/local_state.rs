//! Per-worktree state persisted next to the checkout (`.arbor.local`).
//!
//! The file is YAML. `db_suffix` is the only field the engine reads; every
//! other key is carried through untouched on rewrite. The engine never
//! deletes the file, and a missing file reads as empty state. Concurrent runs
//! against the same worktree are not supported: the last writer wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::util::fs::write_atomic;

pub const LOCAL_STATE_FILE: &str = ".arbor.local";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_suffix: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LocalState {
    pub fn path(worktree: &Path) -> PathBuf {
        worktree.join(LOCAL_STATE_FILE)
    }

    /// Read the state file; missing or empty means default state.
    pub fn load(worktree: &Path) -> Result<LocalState> {
        let path = Self::path(worktree);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LocalState::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        if text.trim().is_empty() {
            return Ok(LocalState::default());
        }
        serde_yaml::from_str(&text).with_context(|| format!("invalid local state {}", path.display()))
    }

    pub fn save(&self, worktree: &Path) -> Result<()> {
        let path = Self::path(worktree);
        let text = serde_yaml::to_string(self).context("failed to encode local state")?;
        write_atomic(&path, text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Read-modify-write of `db_suffix`, keeping unknown fields.
    pub fn persist_db_suffix(worktree: &Path, suffix: &str) -> Result<()> {
        let mut state = LocalState::load(worktree)?;
        if state.db_suffix == suffix && Self::path(worktree).is_file() {
            return Ok(());
        }
        state.db_suffix = suffix.to_string();
        state.save(worktree)
    }
}
