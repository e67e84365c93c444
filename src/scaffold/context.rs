//! Run-scoped state shared by every step of a scaffold or cleanup run.
//!
//! Invariants
//! - Identity fields are fixed once the context is handed to the executor.
//! - The variable store and the database suffix sit behind one `RwLock`;
//!   every accessor takes it exactly once, so callers see consistent values.
//! - Templates render against `snapshot_for_template()`, never live state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::util::sanitize_name;

/// Names always present in a template snapshot.
pub const BUILTIN_TEMPLATE_VARS: &[&str] = &[
    "Path",
    "RepoPath",
    "RepoName",
    "SiteName",
    "SanitizedSiteName",
    "Branch",
    "DbSuffix",
];

#[derive(Debug, Default)]
struct MutableState {
    vars: BTreeMap<String, String>,
    db_suffix: String,
}

#[derive(Debug)]
pub struct ScaffoldContext {
    worktree_path: PathBuf,
    branch: String,
    repo_name: String,
    site_name: String,
    preset: String,
    bare_path: PathBuf,
    env: BTreeMap<String, String>,
    state: RwLock<MutableState>,
}

fn basename(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ScaffoldContext {
    /// Context for `worktree_path`; chain the builder methods to fill in identity.
    pub fn new(worktree_path: impl Into<PathBuf>) -> Self {
        Self {
            worktree_path: worktree_path.into(),
            branch: String::new(),
            repo_name: String::new(),
            site_name: String::new(),
            preset: String::new(),
            bare_path: PathBuf::new(),
            env: BTreeMap::new(),
            state: RwLock::new(MutableState::default()),
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = repo_name.into();
        self
    }

    pub fn site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = site_name.into();
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn bare_path(mut self, bare_path: impl Into<PathBuf>) -> Self {
        self.bare_path = bare_path.into();
        self
    }

    /// Snapshot the current process environment (non-UTF-8 entries are dropped).
    pub fn with_process_env(mut self) -> Self {
        self.env = std::env::vars().collect();
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn worktree_path(&self) -> &Path {
        &self.worktree_path
    }

    pub fn branch_name(&self) -> &str {
        &self.branch
    }

    pub fn repo(&self) -> &str {
        &self.repo_name
    }

    pub fn site(&self) -> &str {
        &self.site_name
    }

    pub fn sanitized_site_name(&self) -> String {
        sanitize_name(&self.site_name)
    }

    pub fn preset_name(&self) -> &str {
        &self.preset
    }

    pub fn bare_repo_path(&self) -> &Path {
        &self.bare_path
    }

    /// Basename of the worktree directory.
    pub fn path_name(&self) -> String {
        basename(&self.worktree_path)
    }

    /// Basename of the worktree's parent directory.
    pub fn repo_path_name(&self) -> String {
        self.worktree_path
            .parent()
            .map(basename)
            .unwrap_or_default()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    fn read(&self) -> RwLockReadGuard<'_, MutableState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MutableState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_var(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().vars.insert(key.into(), value.into());
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.read().vars.get(key).cloned()
    }

    pub fn vars(&self) -> BTreeMap<String, String> {
        self.read().vars.clone()
    }

    pub fn set_db_suffix(&self, suffix: impl Into<String>) {
        self.write().db_suffix = suffix.into();
    }

    pub fn db_suffix(&self) -> String {
        self.read().db_suffix.clone()
    }

    pub fn clear_db_suffix(&self) {
        self.write().db_suffix.clear();
    }

    /// Point-in-time copy of every template variable.
    ///
    /// Dynamic variables are applied first; the built-in identity names win
    /// on collision.
    pub fn snapshot_for_template(&self) -> BTreeMap<String, String> {
        let (mut map, suffix) = {
            let state = self.read();
            (state.vars.clone(), state.db_suffix.clone())
        };
        map.insert(
            "Path".into(),
            self.worktree_path.to_string_lossy().into_owned(),
        );
        map.insert("RepoPath".into(), self.repo_path_name());
        map.insert("RepoName".into(), self.repo_name.clone());
        map.insert("SiteName".into(), self.site_name.clone());
        map.insert("SanitizedSiteName".into(), self.sanitized_site_name());
        map.insert("Branch".into(), self.branch.clone());
        map.insert("DbSuffix".into(), suffix);
        map
    }
}
