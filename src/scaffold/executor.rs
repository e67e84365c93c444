//! Sequential step execution with per-step results.

use anyhow::Result;
use tracing::{debug, info};

use super::condition::evaluate_condition;
use super::context::ScaffoldContext;
use super::steps::{Step, StepOptions};
use crate::errors::StepError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub step: String,
    pub error: Option<String>,
    pub skipped: bool,
}

impl ExecutionResult {
    fn ok(step: &str) -> Self {
        Self {
            step: step.to_string(),
            error: None,
            skipped: false,
        }
    }

    fn skipped(step: &str) -> Self {
        Self {
            step: step.to_string(),
            error: None,
            skipped: true,
        }
    }

    /// `ok`, `skipped` or `failed`.
    pub fn status(&self) -> &'static str {
        if self.error.is_some() {
            "failed"
        } else if self.skipped {
            "skipped"
        } else {
            "ok"
        }
    }
}

/// Runs steps strictly in order; the first failing step stops the run.
#[derive(Debug, Default)]
pub struct StepExecutor {
    results: Vec<ExecutionResult>,
}

impl StepExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ExecutionResult> {
        self.results
    }

    pub fn execute(
        &mut self,
        steps: &[Box<dyn Step>],
        ctx: &ScaffoldContext,
        opts: &StepOptions,
    ) -> Result<()> {
        for step in steps {
            let name = step.name();
            let cfg = step.config();
            if !cfg.is_enabled() {
                debug!(step = name, "disabled");
                self.results.push(ExecutionResult::skipped(name));
                continue;
            }
            if !evaluate_condition(cfg.condition.as_ref(), ctx) {
                debug!(step = name, "condition not met");
                self.results.push(ExecutionResult::skipped(name));
                continue;
            }
            if !step.condition(ctx) {
                debug!(step = name, "step precondition not met");
                self.results.push(ExecutionResult::skipped(name));
                continue;
            }
            if opts.dry_run {
                info!(step = name, args = ?cfg.args, "dry run: would run step");
                self.results.push(ExecutionResult::ok(name));
                continue;
            }
            debug!(step = name, "running");
            if let Err(e) = step.run(ctx, opts) {
                self.results.push(ExecutionResult {
                    step: name.to_string(),
                    error: Some(format!("{:#}", e)),
                    skipped: false,
                });
                return Err(StepError {
                    step: name.to_string(),
                    source: e,
                }
                .into());
            }
            self.results.push(ExecutionResult::ok(name));
        }
        Ok(())
    }
}
