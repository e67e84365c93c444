//! Host probes used by conditions, pre-flight and steps.
//!
//! Probes never fail: I/O problems read as "not satisfied". The `_checked`
//! variants surface the I/O error for pre-flight reporting.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::context::ScaffoldContext;

/// Default env file, relative to the worktree.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Resolve `rel` against the worktree; absolute paths are kept.
pub fn resolve(root: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

pub fn file_exists_checked(root: &Path, rel: &str) -> io::Result<bool> {
    resolve(root, rel).try_exists()
}

pub fn file_exists(root: &Path, rel: &str) -> bool {
    file_exists_checked(root, rel).unwrap_or(false)
}

/// Byte-level substring search.
pub fn file_contains(root: &Path, rel: &str, pattern: &str) -> bool {
    match fs::read(resolve(root, rel)) {
        Ok(bytes) => contains_bytes(&bytes, pattern.as_bytes()),
        Err(_) => false,
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// `package.json` mentions `"<script>"`.
pub fn file_has_script(root: &Path, script: &str) -> bool {
    file_contains(root, "package.json", &format!("\"{}\"", script))
}

pub fn command_exists(name: &str) -> bool {
    !name.trim().is_empty() && which::which(name.trim()).is_ok()
}

fn normalize_os(name: &str) -> String {
    match name.trim().to_ascii_lowercase().as_str() {
        "macos" | "darwin" | "osx" | "mac" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Current OS under the names users write in config (`darwin`, `linux`, `windows`, ...).
pub fn current_os() -> String {
    normalize_os(std::env::consts::OS)
}

pub fn os_matches<S: AsRef<str>>(names: &[S]) -> bool {
    let current = current_os();
    names.iter().any(|n| normalize_os(n.as_ref()) == current)
}

pub fn env_exists(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

/// One `KEY=VALUE` line, taken literally: no `$` expansion, no escapes.
///
/// Blank lines, `#` comments and lines without `=` yield `None`. An optional
/// `export ` prefix is dropped and one matching pair of surrounding quotes is
/// stripped from the value.
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value);
    Some((key.to_string(), unquoted.to_string()))
}

/// Parse env-file content; a later line for the same key wins.
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    content.lines().filter_map(parse_env_line).collect()
}

/// Read and parse an env file (see `parse_env_line`).
pub fn read_env_file(path: &Path) -> io::Result<BTreeMap<String, String>> {
    Ok(parse_env(&fs::read_to_string(path)?))
}

/// Value of `key` in `<root>/<file>`; `None` when the file or key is missing.
pub fn env_file_value(root: &Path, file: &str, key: &str) -> Option<String> {
    let file = if file.is_empty() { DEFAULT_ENV_FILE } else { file };
    read_env_file(&resolve(root, file))
        .ok()
        .and_then(|mut vars| vars.remove(key))
}

/// Env file holds a non-empty value for `key`.
pub fn env_file_contains(root: &Path, file: &str, key: &str) -> bool {
    env_file_value(root, file, key)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

pub fn context_var_equals(ctx: &ScaffoldContext, key: &str, value: &str) -> bool {
    ctx.get_var(key).as_deref() == Some(value)
}
