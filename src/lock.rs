//! Process-wide locks keyed by canonical file path.
//!
//! Used to serialise read-modify-write cycles on shared files (env files).
//! Entries live for the process lifetime; the map is bounded by the number
//! of distinct files touched.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Canonical key for `p`, resolving symlinks even when the file itself does not exist yet.
pub fn lock_key(p: &Path) -> PathBuf {
    if let Ok(canon) = fs::canonicalize(p) {
        return canon;
    }
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(p))
            .unwrap_or_else(|_| p.to_path_buf())
    };
    match (abs.parent(), abs.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or(abs.clone()),
        _ => abs,
    }
}

fn lock_for(key: PathBuf) -> Arc<Mutex<()>> {
    let mut map = PATH_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(key).or_default().clone()
}

/// Run `f` while holding the exclusive lock for `path`.
pub fn with_path_lock<T>(path: &Path, f: impl FnOnce() -> T) -> T {
    let lock = lock_for(lock_key(path));
    let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
    f()
}
