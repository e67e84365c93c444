//! Step interface and the built-in step implementations.
//!
//! A step owns its declaration. The executor evaluates the declared
//! `enabled`/`condition` first, then the step's own `condition` gate, then
//! calls `run`.

pub mod binary;
pub mod db;
pub mod env_file;
pub mod file_copy;
pub mod shell;

use anyhow::Result;

use super::context::ScaffoldContext;
use super::prompt::PromptMode;
use crate::config::StepConfig;

pub use binary::{BinaryStep, BINARY_STEPS};
pub use db::{DbCreateStep, DbDestroyStep};
pub use env_file::{EnvReadStep, EnvWriteStep};
pub use file_copy::FileCopyStep;
pub use shell::ShellStep;

/// Invocation options shared by every step in a run.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Extra arguments appended to each step's own.
    pub args: Vec<String>,
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub prompt: PromptMode,
}

pub trait Step: Send + Sync {
    /// Step type identifier, e.g. `env.write`.
    fn name(&self) -> &str;

    /// The declaration this step was built from.
    fn config(&self) -> &StepConfig;

    /// Gate checked after the declared condition; false skips the step.
    fn condition(&self, _ctx: &ScaffoldContext) -> bool {
        true
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()>;
}
