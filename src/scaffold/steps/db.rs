//! `db.create` and `db.destroy`.
//!
//! Every database a run creates is named `<prefix>_<suffix>` with one shared
//! `<adjective>_<noun>` suffix per worktree; cleanup drops whatever matches
//! that suffix.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use super::{Step, StepOptions};
use crate::config::StepConfig;
use crate::errors::is_database_exists_error;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::db::{
    detect_engine, like_suffix_pattern, ClientGuard, ConnectionOptions, DatabaseClientFactory,
    DbEngine,
};
use crate::scaffold::local_state::LocalState;
use crate::scaffold::probe::{self, DEFAULT_ENV_FILE};
use crate::scaffold::prompt::Prompter;
use crate::scaffold::template;
use crate::scaffold::words;
use crate::util::fs::ensure_file_exists;

pub const MAX_CREATE_ATTEMPTS: usize = 5;
pub const DEFAULT_SQLITE_PATH: &str = "database/database.sqlite";

fn rendered_args(cfg: &StepConfig, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<Vec<String>> {
    let mut raw = cfg.args.clone();
    raw.extend(opts.args.iter().cloned());
    template::render_all(&raw, ctx)
}

fn env_value(ctx: &ScaffoldContext, key: &str) -> Option<String> {
    probe::env_file_value(ctx.worktree_path(), DEFAULT_ENV_FILE, key).filter(|v| !v.is_empty())
}

/// `db.create {args, type?}`: create the worktree's database, or a sqlite file.
pub struct DbCreateStep {
    cfg: StepConfig,
    factory: Arc<dyn DatabaseClientFactory>,
}

impl DbCreateStep {
    pub fn new(cfg: StepConfig, factory: Arc<dyn DatabaseClientFactory>) -> Self {
        Self { cfg, factory }
    }

    fn sqlite_path(&self, ctx: &ScaffoldContext, conn: &ConnectionOptions) -> PathBuf {
        let file = conn
            .database
            .clone()
            .or_else(|| env_value(ctx, "DB_DATABASE"))
            .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string());
        probe::resolve(ctx.worktree_path(), &file)
    }

    fn create_sqlite(&self, ctx: &ScaffoldContext, conn: &ConnectionOptions) -> Result<()> {
        let path = self.sqlite_path(ctx, conn);
        if !path.exists() {
            ensure_file_exists(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            info!(path = %path.display(), "created sqlite database");
        }
        Ok(())
    }

    fn prefix(&self, ctx: &ScaffoldContext, conn: &ConnectionOptions) -> String {
        conn.prefix
            .clone()
            .or_else(|| Some(ctx.site().to_string()).filter(|s| !s.is_empty()))
            .or_else(|| env_value(ctx, "APP_NAME"))
            .unwrap_or_else(|| words::FALLBACK_PREFIX.to_string())
    }
}

impl Step for DbCreateStep {
    fn name(&self) -> &str {
        "db.create"
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let Some(engine) = detect_engine(&self.cfg.db_type, ctx.worktree_path()) else {
            debug!("no known database engine configured; nothing to create");
            return Ok(());
        };
        let args = rendered_args(&self.cfg, ctx, opts)?;
        let conn = ConnectionOptions::from_args(engine, &args);
        if engine == DbEngine::Sqlite {
            return self.create_sqlite(ctx, &conn);
        }

        let client = match self.factory.connect(engine, &conn) {
            Ok(c) => c,
            Err(e) => {
                info!(engine = engine.as_str(), error = %e, "database server unavailable; skipping create");
                return Ok(());
            }
        };
        let mut guard = ClientGuard::new(client);
        if let Err(e) = guard.client().ping() {
            info!(engine = engine.as_str(), host = %conn.host, error = %e, "database server unreachable; skipping create");
            return Ok(());
        }

        let prefix = self.prefix(ctx, &conn);
        let mut tried: Vec<String> = Vec::new();
        let mut last_err = None;
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let existing = ctx.db_suffix();
            let (name, suffix) = if existing.is_empty() {
                let (name, suffix) = words::generate_database_name(&prefix, &tried)?;
                ctx.set_db_suffix(suffix.clone());
                (name, suffix)
            } else {
                (words::database_name(&prefix, &existing), existing)
            };
            tried.push(suffix.clone());

            match guard.client().create_database(&name) {
                Ok(()) => {
                    LocalState::persist_db_suffix(ctx.worktree_path(), &suffix)?;
                    info!(database = %name, "created database");
                    return Ok(());
                }
                Err(e) if is_database_exists_error(&e) => {
                    debug!(database = %name, attempt, "database exists; picking a new suffix");
                    ctx.clear_db_suffix();
                    last_err = Some(e);
                }
                Err(e) => return Err(e.context(format!("failed to create database {}", name))),
            }
        }
        let last = last_err.map(|e| format!("{:#}", e)).unwrap_or_default();
        Err(anyhow!(
            "could not find a free database name after {} attempts: {}",
            MAX_CREATE_ATTEMPTS,
            last
        ))
    }
}

/// `db.destroy {args, type?}`: drop every database carrying this worktree's suffix.
///
/// Never fails on a missing server or a single failed drop.
pub struct DbDestroyStep {
    cfg: StepConfig,
    factory: Arc<dyn DatabaseClientFactory>,
    prompter: Arc<dyn Prompter>,
}

impl DbDestroyStep {
    pub fn new(
        cfg: StepConfig,
        factory: Arc<dyn DatabaseClientFactory>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            cfg,
            factory,
            prompter,
        }
    }

    fn suffix(&self, ctx: &ScaffoldContext) -> String {
        let current = ctx.db_suffix();
        if !current.is_empty() {
            return current;
        }
        match LocalState::load(ctx.worktree_path()) {
            Ok(state) => state.db_suffix,
            Err(e) => {
                warn!(error = %e, "could not read local state");
                String::new()
            }
        }
    }
}

impl Step for DbDestroyStep {
    fn name(&self) -> &str {
        "db.destroy"
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let suffix = self.suffix(ctx);
        if suffix.is_empty() {
            debug!("no database suffix recorded; nothing to drop");
            return Ok(());
        }
        let engine = match detect_engine(&self.cfg.db_type, ctx.worktree_path()) {
            Some(DbEngine::Sqlite) | None => {
                debug!("no server database engine configured; nothing to drop");
                return Ok(());
            }
            Some(e) => e,
        };
        let args = rendered_args(&self.cfg, ctx, opts)?;
        let conn = ConnectionOptions::from_args(engine, &args);

        let client = match self.factory.connect(engine, &conn) {
            Ok(c) => c,
            Err(e) => {
                info!(engine = engine.as_str(), error = %e, "database server unavailable; skipping drop");
                return Ok(());
            }
        };
        let mut guard = ClientGuard::new(client);
        if let Err(e) = guard.client().ping() {
            info!(engine = engine.as_str(), error = %e, "database server unreachable; skipping drop");
            return Ok(());
        }

        let names = match guard.client().list_databases(&like_suffix_pattern(&suffix)) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "failed to list databases");
                return Ok(());
            }
        };
        for name in names {
            if opts.dry_run {
                info!(database = %name, "would drop database");
                continue;
            }
            if opts.prompt.allows_prompt()
                && !self.prompter.confirm(&format!("Drop database {}?", name))
            {
                info!(database = %name, "kept database");
                continue;
            }
            match guard.client().drop_database(&name) {
                Ok(()) => info!(database = %name, "dropped database"),
                Err(e) => warn!(database = %name, error = %e, "failed to drop database"),
            }
        }
        Ok(())
    }
}
