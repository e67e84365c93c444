//! Declarative scaffold and cleanup engine for worktrees.
//!
//! A run merges preset defaults with project steps, builds them through a
//! `StepRegistry`, checks pre-flight, and executes them in order against a
//! shared `ScaffoldContext`.

pub mod condition;
pub mod context;
pub mod db;
pub mod executor;
pub mod local_state;
pub mod manager;
pub mod preflight;
pub mod presets;
pub mod probe;
pub mod prompt;
pub mod registry;
pub mod steps;
pub mod template;
pub mod words;

pub use condition::{evaluate_condition, Condition};
pub use context::{ScaffoldContext, BUILTIN_TEMPLATE_VARS};
pub use db::{
    ConnectionOptions, DatabaseClient, DatabaseClientFactory, DbEngine,
};
pub use executor::{ExecutionResult, StepExecutor};
pub use local_state::{LocalState, LOCAL_STATE_FILE};
pub use manager::{ScaffoldManager, ScaffoldRequest};
pub use preflight::run_preflight;
pub use presets::{detect_preset, preset_by_name, presets, Preset};
pub use prompt::{FixedPrompter, PromptMode, Prompter, TerminalPrompter};
pub use registry::{default_registry, factory, StepDeps, StepFactory, StepRegistry};
pub use steps::{Step, StepOptions};
