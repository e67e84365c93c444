//! Error values surfaced by the scaffold engine.
//!
//! Error mapping guide:
//! - Everything propagates as `anyhow::Error`; callers inspect with `downcast_ref`.
//! - Configuration problems are raised before any side effect (`ConfigError`).
//! - Pre-flight failures carry the grouped report (`PreflightError`).
//! - Step runtime failures are wrapped once by the executor (`StepError`).
//! - Map io::ErrorKind::NotFound to exit code 127, pre-flight to 2, all others to 1.
use std::fmt;
use std::io;

/// Invalid step declarations and registry misuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownStep { name: String, registered: Vec<String> },
    MissingField { step: String, field: &'static str },
    DuplicateStep(String),
    UnknownPreset { name: String, available: Vec<String> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownStep { name, registered } => {
                if name.is_empty() {
                    write!(f, "step is missing a name; known steps: {}", registered.join(", "))
                } else {
                    write!(
                        f,
                        "unknown step '{}'; known steps: {}",
                        name,
                        registered.join(", ")
                    )
                }
            }
            ConfigError::MissingField { step, field } => {
                write!(f, "step '{}' requires a non-empty '{}' field", step, field)
            }
            ConfigError::DuplicateStep(name) => {
                write!(f, "step '{}' is already registered", name)
            }
            ConfigError::UnknownPreset { name, available } => write!(
                f,
                "unknown preset '{}'; available presets: {}",
                name,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Grouped report of everything a failed pre-flight condition was missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightError {
    pub missing_env: Vec<String>,
    pub missing_commands: Vec<String>,
    pub missing_files: Vec<String>,
    pub file_errors: Vec<String>,
}

impl PreflightError {
    pub fn is_empty(&self) -> bool {
        self.missing_env.is_empty()
            && self.missing_commands.is_empty()
            && self.missing_files.is_empty()
            && self.file_errors.is_empty()
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    write!(f, "\n{}:", title)?;
    for item in items {
        write!(f, "\n  - {}", item)?;
    }
    Ok(())
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pre-flight checks failed")?;
        if self.is_empty() {
            return write!(f, "\n  - pre-flight condition not satisfied");
        }
        write_group(f, "Missing environment variables", &self.missing_env)?;
        write_group(f, "Missing commands", &self.missing_commands)?;
        write_group(f, "Missing files", &self.missing_files)?;
        write_group(f, "File check errors", &self.file_errors)
    }
}

impl std::error::Error for PreflightError {}

/// A step's `run` failed; the executor stops at the first one.
#[derive(Debug)]
pub struct StepError {
    pub step: String,
    pub source: anyhow::Error,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} failed: {:#}", self.step, self.source)
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = self.source.as_ref();
        Some(cause)
    }
}

/// Database-level failures the steps need to tell apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    Exists(String),
    InvalidName(String),
    Query { statement: String, output: String },
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Exists(name) => write!(f, "database '{}' already exists", name),
            DbError::InvalidName(name) => write!(
                f,
                "refusing to use database name '{}': only [A-Za-z0-9_] allowed",
                name
            ),
            DbError::Query { statement, output } => {
                write!(f, "database query failed ({}): {}", statement, output.trim())
            }
        }
    }
}

impl std::error::Error for DbError {}

/// True when any error in the chain reports an already-existing database.
pub fn is_database_exists_error(e: &anyhow::Error) -> bool {
    e.chain()
        .any(|cause| matches!(cause.downcast_ref::<DbError>(), Some(DbError::Exists(_))))
}

/// An external process exited unsuccessfully.
#[derive(Debug, Clone)]
pub struct CommandError {
    pub command: String,
    pub status: Option<i32>,
    pub output: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "command `{}` exited with status {}", self.command, code)?,
            None => write!(f, "command `{}` was terminated by a signal", self.command)?,
        }
        let out = self.output.trim();
        if !out.is_empty() {
            write!(f, "\n{}", out)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Exit code for an engine error as surfaced by the CLI.
pub fn exit_code_for_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<PreflightError>().is_some() {
        return 2;
    }
    for cause in e.chain() {
        if let Some(ioe) = cause.downcast_ref::<io::Error>() {
            return exit_code_for_io_error(ioe);
        }
    }
    1
}
