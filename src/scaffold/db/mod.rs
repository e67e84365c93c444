//! Database engines, connection options and the client seam used by
//! `db.create` / `db.destroy`.

pub mod cli;

use std::path::Path;

use anyhow::Result;

use super::probe::{self, DEFAULT_ENV_FILE};
use crate::errors::DbError;

pub use cli::CliClientFactory;
pub use crate::errors::is_database_exists_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Mysql,
    Pgsql,
    Sqlite,
}

impl DbEngine {
    /// Accepts the canonical names and the common aliases.
    pub fn parse(s: &str) -> Option<DbEngine> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(DbEngine::Mysql),
            "pgsql" | "postgres" | "postgresql" => Some(DbEngine::Pgsql),
            "sqlite" => Some(DbEngine::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbEngine::Mysql => "mysql",
            DbEngine::Pgsql => "pgsql",
            DbEngine::Sqlite => "sqlite",
        }
    }

    pub fn default_username(&self) -> &'static str {
        match self {
            DbEngine::Pgsql => "postgres",
            _ => "root",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DbEngine::Pgsql => 5432,
            _ => 3306,
        }
    }
}

/// Engine from the step's `type`, else `DB_CONNECTION` in the worktree `.env`.
pub fn detect_engine(step_type: &str, worktree: &Path) -> Option<DbEngine> {
    if !step_type.trim().is_empty() {
        return DbEngine::parse(step_type);
    }
    probe::env_file_value(worktree, DEFAULT_ENV_FILE, "DB_CONNECTION")
        .and_then(|v| DbEngine::parse(&v))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub prefix: Option<String>,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
}

pub const DEFAULT_HOST: &str = "127.0.0.1";

impl ConnectionOptions {
    pub fn defaults(engine: DbEngine) -> Self {
        Self {
            prefix: None,
            username: engine.default_username().to_string(),
            password: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: engine.default_port(),
            database: None,
        }
    }

    /// Harvest `--prefix`, `--username`, `--password`, `--host`, `--port`, `--database`
    /// (as `--flag value` or `--flag=value`); anything else is ignored.
    pub fn from_args(engine: DbEngine, args: &[String]) -> Self {
        let mut opts = Self::defaults(engine);
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
                _ => (arg.as_str(), None),
            };
            let known = matches!(
                flag,
                "--prefix" | "--username" | "--password" | "--host" | "--port" | "--database"
            );
            if !known {
                i += 1;
                continue;
            }
            let value = match inline {
                Some(v) => v,
                None => {
                    i += 1;
                    match args.get(i) {
                        Some(v) => v.clone(),
                        None => break,
                    }
                }
            };
            match flag {
                "--prefix" => opts.prefix = Some(value).filter(|v| !v.is_empty()),
                "--username" => opts.username = value,
                "--password" => opts.password = value,
                "--host" => opts.host = value,
                "--port" => {
                    if let Ok(p) = value.parse() {
                        opts.port = p;
                    }
                }
                "--database" => opts.database = Some(value).filter(|v| !v.is_empty()),
                _ => {}
            }
            i += 1;
        }
        opts
    }
}

pub trait DatabaseClient {
    /// Server reachable with these credentials.
    fn ping(&mut self) -> Result<()>;
    /// Fails with `DbError::Exists` when the name is taken.
    fn create_database(&mut self, name: &str) -> Result<()>;
    /// Names matching a LIKE pattern.
    fn list_databases(&mut self, pattern: &str) -> Result<Vec<String>>;
    fn drop_database(&mut self, name: &str) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

pub trait DatabaseClientFactory: Send + Sync {
    fn connect(&self, engine: DbEngine, opts: &ConnectionOptions) -> Result<Box<dyn DatabaseClient>>;
}

/// Owns a client for one step invocation and closes it on every exit path.
pub struct ClientGuard {
    client: Box<dyn DatabaseClient>,
}

impl ClientGuard {
    pub fn new(client: Box<dyn DatabaseClient>) -> Self {
        Self { client }
    }

    pub fn client(&mut self) -> &mut dyn DatabaseClient {
        self.client.as_mut()
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        if let Err(e) = self.client.close() {
            tracing::debug!(error = %e, "closing database client failed");
        }
    }
}

/// Reject anything but `[A-Za-z0-9_]` before a name reaches a statement.
pub fn validate_database_name(name: &str) -> Result<(), DbError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DbError::InvalidName(name.to_string()))
    }
}

/// LIKE pattern for every database ending in `_<suffix>` (`_` escaped as a literal).
pub fn like_suffix_pattern(suffix: &str) -> String {
    format!("%{}", format!("_{}", suffix).replace('_', "\\_"))
}
