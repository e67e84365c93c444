//! `DatabaseClient` backed by the `mysql` / `psql` command-line clients.
//!
//! Each call is one short-lived process. Passwords go through `MYSQL_PWD` /
//! `PGPASSWORD`, never on the argument vector.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::debug;

use super::{validate_database_name, ConnectionOptions, DatabaseClient, DatabaseClientFactory, DbEngine};
use crate::errors::DbError;
use crate::util::exec::{ExecRequest, ExecService};

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT_SECS: &str = "5";

/// Connects by locating the engine's CLI on PATH.
#[derive(Debug, Clone)]
pub struct CliClientFactory {
    exec: ExecService,
}

impl CliClientFactory {
    pub fn new() -> Self {
        Self {
            exec: ExecService::new(QUERY_TIMEOUT),
        }
    }
}

impl Default for CliClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseClientFactory for CliClientFactory {
    fn connect(&self, engine: DbEngine, opts: &ConnectionOptions) -> Result<Box<dyn DatabaseClient>> {
        let program = match engine {
            DbEngine::Mysql => "mysql",
            DbEngine::Pgsql => "psql",
            DbEngine::Sqlite => return Err(anyhow!("sqlite databases are plain files; no client needed")),
        };
        let path = which::which(program)
            .map_err(|_| anyhow!("'{}' client not found in PATH", program))?;
        Ok(Box::new(CliClient {
            engine,
            program: path.to_string_lossy().into_owned(),
            opts: opts.clone(),
            exec: self.exec.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct CliClient {
    engine: DbEngine,
    program: String,
    opts: ConnectionOptions,
    exec: ExecService,
}

impl CliClient {
    fn request(&self, statement: &str) -> ExecRequest {
        let port = self.opts.port.to_string();
        let req = ExecRequest::new(&self.program).capture_output(true);
        match self.engine {
            DbEngine::Pgsql => req
                .args(["-h", self.opts.host.as_str(), "-p", port.as_str(), "-U", self.opts.username.as_str()])
                .args(["-d", self.opts.database.as_deref().unwrap_or("postgres")])
                .args(["-w", "-X", "-q", "-t", "-A", "-v", "ON_ERROR_STOP=1", "-c", statement])
                .env("PGPASSWORD", &self.opts.password)
                .env("PGCONNECT_TIMEOUT", CONNECT_TIMEOUT_SECS),
            _ => req
                .args(["--protocol=TCP", "-h", self.opts.host.as_str(), "-P", port.as_str()])
                .args(["-u", self.opts.username.as_str()])
                .arg(format!("--connect-timeout={}", CONNECT_TIMEOUT_SECS))
                .args(["-N", "-B", "-e", statement])
                .env("MYSQL_PWD", &self.opts.password),
        }
    }

    fn query(&self, statement: &str) -> Result<String> {
        debug!(engine = self.engine.as_str(), statement, "running database statement");
        let out = self.exec.run(self.request(statement))?;
        if out.status.success() {
            return Ok(out.stdout);
        }
        Err(DbError::Query {
            statement: statement.to_string(),
            output: out.combined(),
        }
        .into())
    }
}

impl DatabaseClient for CliClient {
    fn ping(&mut self) -> Result<()> {
        self.query("SELECT 1").map(|_| ())
    }

    fn create_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        let statement = format!("CREATE DATABASE {}", quote_identifier(self.engine, name));
        match self.query(&statement) {
            Err(e) if is_exists_output(&e) => Err(DbError::Exists(name.to_string()).into()),
            other => other.map(|_| ()),
        }
    }

    fn list_databases(&mut self, pattern: &str) -> Result<Vec<String>> {
        let statement = list_statement(self.engine, pattern)?;
        let out = self.query(&statement)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn drop_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        let statement = format!("DROP DATABASE IF EXISTS {}", quote_identifier(self.engine, name));
        self.query(&statement).map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn quote_identifier(engine: DbEngine, name: &str) -> String {
    match engine {
        DbEngine::Pgsql => format!("\"{}\"", name),
        _ => format!("`{}`", name),
    }
}

fn list_statement(engine: DbEngine, pattern: &str) -> Result<String> {
    if !pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '%' | '\\'))
    {
        return Err(DbError::InvalidName(pattern.to_string()).into());
    }
    Ok(match engine {
        DbEngine::Pgsql => format!(
            "SELECT datname FROM pg_database WHERE datname LIKE '{}' ORDER BY datname",
            pattern
        ),
        _ => format!("SHOW DATABASES LIKE '{}'", pattern),
    })
}

/// MySQL error 1007, PostgreSQL SQLSTATE 42P04, or the plain diagnostic text.
fn is_exists_output(e: &anyhow::Error) -> bool {
    match e.downcast_ref::<DbError>() {
        Some(DbError::Query { output, .. }) => {
            output.contains("ERROR 1007")
                || output.contains("42P04")
                || output.to_ascii_lowercase().contains("already exists")
        }
        _ => false,
    }
}
