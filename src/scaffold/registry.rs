//! Step name to factory mapping.
//!
//! Registries are plain values; `default_registry()` is a lazily built
//! instance holding every built-in step with the production database client
//! and terminal prompter.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;

use super::db::{CliClientFactory, DatabaseClientFactory};
use super::prompt::{Prompter, TerminalPrompter};
use super::steps::{
    BinaryStep, DbCreateStep, DbDestroyStep, EnvReadStep, EnvWriteStep, FileCopyStep, ShellStep,
    Step, BINARY_STEPS,
};
use crate::config::StepConfig;
use crate::errors::ConfigError;

pub type StepFactory = Arc<dyn Fn(StepConfig) -> Box<dyn Step> + Send + Sync>;

/// Wrap a constructor closure as a `StepFactory`.
pub fn factory<F>(f: F) -> StepFactory
where
    F: Fn(StepConfig) -> Box<dyn Step> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Host capabilities injected into steps that need them.
#[derive(Clone)]
pub struct StepDeps {
    pub db_factory: Arc<dyn DatabaseClientFactory>,
    pub prompter: Arc<dyn Prompter>,
}

impl Default for StepDeps {
    fn default() -> Self {
        Self {
            db_factory: Arc::new(CliClientFactory::new()),
            prompter: Arc::new(TerminalPrompter),
        }
    }
}

#[derive(Clone, Default)]
pub struct StepRegistry {
    factories: BTreeMap<String, StepFactory>,
}

static DEFAULT_REGISTRY: Lazy<StepRegistry> =
    Lazy::new(|| StepRegistry::with_builtins(StepDeps::default()));

/// Process-wide registry seeded with the built-in steps.
pub fn default_registry() -> &'static StepRegistry {
    &DEFAULT_REGISTRY
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in steps wired to `deps`.
    pub fn with_builtins(deps: StepDeps) -> Self {
        let mut r = Self::new();
        r.insert_builtin("file.copy", factory(|c| Box::new(FileCopyStep::new(c)) as Box<dyn Step>));
        r.insert_builtin("bash.run", factory(|c| Box::new(ShellStep::bash(c)) as Box<dyn Step>));
        r.insert_builtin("command.run", factory(|c| Box::new(ShellStep::command(c)) as Box<dyn Step>));
        r.insert_builtin("env.read", factory(|c| Box::new(EnvReadStep::new(c)) as Box<dyn Step>));
        r.insert_builtin("env.write", factory(|c| Box::new(EnvWriteStep::new(c)) as Box<dyn Step>));

        let db = deps.db_factory.clone();
        r.insert_builtin(
            "db.create",
            factory(move |c| Box::new(DbCreateStep::new(c, db.clone())) as Box<dyn Step>),
        );
        let db = deps.db_factory.clone();
        let prompter = deps.prompter.clone();
        r.insert_builtin(
            "db.destroy",
            factory(move |c| {
                Box::new(DbDestroyStep::new(c, db.clone(), prompter.clone())) as Box<dyn Step>
            }),
        );

        for &(step_name, binary) in BINARY_STEPS {
            r.insert_builtin(
                step_name,
                factory(move |c| Box::new(BinaryStep::new(step_name, binary, c)) as Box<dyn Step>),
            );
        }
        r
    }

    fn insert_builtin(&mut self, name: &str, factory: StepFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Add a step type; a name can only be registered once.
    pub fn register(&mut self, name: impl Into<String>, factory: StepFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ConfigError::DuplicateStep(name).into());
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Validate `cfg` and build the step registered under `name`.
    pub fn create(&self, name: &str, mut cfg: StepConfig) -> Result<Box<dyn Step>> {
        let make = self.factories.get(name).ok_or_else(|| ConfigError::UnknownStep {
            name: name.to_string(),
            registered: self.list(),
        })?;
        validate(name, &cfg)?;
        if cfg.name.is_empty() {
            cfg.name = name.to_string();
        }
        Ok(make(cfg))
    }

    /// Build a whole step list in order, failing on the first invalid declaration.
    pub fn build_all(&self, configs: &[StepConfig]) -> Result<Vec<Box<dyn Step>>> {
        configs
            .iter()
            .map(|c| self.create(&c.name, c.clone()))
            .collect()
    }
}

fn require(step: &str, field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            step: step.to_string(),
            field,
        })
    } else {
        Ok(())
    }
}

/// Required fields per built-in step type. Unknown names only need a name.
pub fn validate(name: &str, cfg: &StepConfig) -> Result<(), ConfigError> {
    match name {
        "file.copy" => {
            require(name, "from", &cfg.from)?;
            require(name, "to", &cfg.to)
        }
        "bash.run" | "command.run" => require(name, "command", &cfg.command),
        "env.read" | "env.write" => require(name, "key", &cfg.key),
        _ => require(name, "name", name),
    }
}
