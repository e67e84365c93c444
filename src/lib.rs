#![allow(clippy::module_name_repetitions)]
//! Arbor: declarative scaffold and cleanup for git worktrees.
//!
//! The library holds the engine (`scaffold`) and its host adapters; the
//! `arbor` binary is a thin driver over `ScaffoldManager`.

pub mod color;
pub mod config;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod scaffold;
pub mod util;

pub use color::{
    color_enabled_stderr, color_enabled_stdout, log_error_stderr, log_info_stderr,
    log_warn_stderr, paint, set_color_mode, ColorMode,
};
pub use config::{CleanupStepConfig, Config, EffectiveConfig, StepConfig};
pub use errors::{
    exit_code_for_error, exit_code_for_io_error, is_database_exists_error, CommandError,
    ConfigError, DbError, PreflightError, StepError,
};
pub use scaffold::{
    default_registry, ExecutionResult, PromptMode, ScaffoldContext, ScaffoldManager,
    ScaffoldRequest, Step, StepDeps, StepOptions, StepRegistry,
};
pub use util::sanitize_name;
