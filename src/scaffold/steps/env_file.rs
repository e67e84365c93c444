//! `env.read` and `env.write`: read and upsert `KEY=VALUE` lines in env files.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::{Step, StepOptions};
use crate::config::StepConfig;
use crate::lock::with_path_lock;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::probe::{self, DEFAULT_ENV_FILE};
use crate::scaffold::template;
use crate::util::fs::write_atomic;

fn env_file_name(cfg: &StepConfig) -> &str {
    if cfg.file.is_empty() {
        DEFAULT_ENV_FILE
    } else {
        &cfg.file
    }
}

/// `env.read {key, store_as?, file?, keys?}`: copy env-file values into the context.
///
/// A missing file or key stores the empty string. Extra `keys` are stored
/// under their own names.
#[derive(Debug)]
pub struct EnvReadStep {
    cfg: StepConfig,
}

impl EnvReadStep {
    pub fn new(cfg: StepConfig) -> Self {
        Self { cfg }
    }
}

impl Step for EnvReadStep {
    fn name(&self) -> &str {
        "env.read"
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let path = probe::resolve(ctx.worktree_path(), env_file_name(&self.cfg));
        let vars = match probe::read_env_file(&path) {
            Ok(v) => v,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "env file unreadable; reading as empty");
                Default::default()
            }
        };
        let target = if self.cfg.store_as.is_empty() {
            self.cfg.key.clone()
        } else {
            self.cfg.store_as.clone()
        };
        ctx.set_var(target, vars.get(&self.cfg.key).cloned().unwrap_or_default());
        for extra in &self.cfg.keys {
            ctx.set_var(extra.clone(), vars.get(extra).cloned().unwrap_or_default());
        }
        Ok(())
    }
}

/// `env.write {key, value, file?}`: set `key` to the rendered value.
///
/// The value can instead come from a context variable (`source`) or from the
/// same key in another env file (`source_file`, rendered, worktree-relative).
#[derive(Debug)]
pub struct EnvWriteStep {
    cfg: StepConfig,
}

impl EnvWriteStep {
    pub fn new(cfg: StepConfig) -> Self {
        Self { cfg }
    }

    fn resolve_value(&self, ctx: &ScaffoldContext) -> Result<String> {
        if !self.cfg.source.is_empty() {
            return Ok(ctx.get_var(&self.cfg.source).unwrap_or_default());
        }
        if !self.cfg.source_file.is_empty() {
            let file = template::render(&self.cfg.source_file, ctx)?;
            return Ok(probe::env_file_value(ctx.worktree_path(), &file, &self.cfg.key)
                .unwrap_or_default());
        }
        template::render(&self.cfg.value, ctx)
    }
}

impl Step for EnvWriteStep {
    fn name(&self) -> &str {
        "env.write"
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let value = self.resolve_value(ctx)?;
        let path = probe::resolve(ctx.worktree_path(), env_file_name(&self.cfg));
        write_env_value(&path, &self.cfg.key, &value)
            .with_context(|| format!("failed to write {} in {}", self.cfg.key, path.display()))?;
        debug!(key = %self.cfg.key, path = %path.display(), "updated env file");
        Ok(())
    }
}

fn is_key_line(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .map(|rest| rest.starts_with('=') || rest.starts_with(' '))
        .unwrap_or(false)
}

/// Replace the first `key=`/`key ` line with `key=value` (dropping later duplicates),
/// or append it. The result always ends with a newline.
pub fn upsert_env_line(content: &str, key: &str, value: &str) -> String {
    let new_line = format!("{}={}", key, value);
    let mut out: Vec<&str> = Vec::new();
    let mut replaced = false;
    for line in content.lines() {
        if is_key_line(line, key) {
            if !replaced {
                out.push(&new_line);
                replaced = true;
            }
            continue;
        }
        out.push(line);
    }
    if !replaced {
        out.push(&new_line);
    }
    let mut s = out.join("\n");
    s.push('\n');
    s
}

/// Locked read-modify-write of one key, replaced atomically on disk.
///
/// Values must fit on one line; a line break would smuggle in extra entries.
pub fn write_env_value(path: &Path, key: &str, value: &str) -> Result<()> {
    if value.contains(|c: char| c == '\n' || c == '\r') {
        bail!("value for {} spans multiple lines; env files hold one KEY=VALUE per line", key);
    }
    with_path_lock(path, || {
        let current = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).context("failed to read env file"),
        };
        let updated = upsert_env_line(&current, key, value);
        if updated == current {
            return Ok(());
        }
        write_atomic(path, updated.as_bytes()).context("failed to replace env file")
    })
}
