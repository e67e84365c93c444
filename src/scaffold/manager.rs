//! Orchestrates scaffold and cleanup runs for one worktree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::context::ScaffoldContext;
use super::executor::{ExecutionResult, StepExecutor};
use super::local_state::LocalState;
use super::preflight::run_preflight;
use super::presets::{detect_preset, preset_by_name, Preset};
use super::prompt::PromptMode;
use super::registry::{default_registry, StepRegistry};
use super::steps::{Step, StepOptions};
use super::words;
use crate::config::Config;

/// Identity and options for one run.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldRequest {
    pub worktree: PathBuf,
    pub branch: String,
    pub repo_name: String,
    pub site_name: String,
    /// Explicit preset; empty falls back to the config, then to detection.
    pub preset: String,
    pub bare_path: Option<PathBuf>,
    pub prompt: PromptMode,
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl ScaffoldRequest {
    pub fn new(worktree: impl Into<PathBuf>) -> Self {
        Self {
            worktree: worktree.into(),
            ..Self::default()
        }
    }

    fn options(&self) -> StepOptions {
        StepOptions {
            args: Vec::new(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            prompt: self.prompt,
        }
    }

    fn context(&self, preset: Option<&Preset>) -> ScaffoldContext {
        let mut ctx = ScaffoldContext::new(&self.worktree)
            .branch(&self.branch)
            .repo_name(&self.repo_name)
            .site_name(&self.site_name)
            .preset(preset.map(Preset::name).unwrap_or_default())
            .with_process_env();
        if let Some(bare) = &self.bare_path {
            ctx = ctx.bare_path(bare);
        }
        ctx
    }
}

pub struct ScaffoldManager {
    registry: StepRegistry,
    results: Vec<ExecutionResult>,
}

impl Default for ScaffoldManager {
    fn default() -> Self {
        Self::new(default_registry().clone())
    }
}

impl ScaffoldManager {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            results: Vec::new(),
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Per-step outcomes of the most recent run, including a failed one.
    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    /// Explicit preset name, else the config's, else the first detected one.
    pub fn resolve_preset(req: &ScaffoldRequest, config: &Config) -> Result<Option<&'static Preset>> {
        let explicit = if req.preset.trim().is_empty() {
            config.preset.trim()
        } else {
            req.preset.trim()
        };
        if !explicit.is_empty() {
            return Ok(Some(preset_by_name(explicit)?));
        }
        Ok(detect_preset(&req.worktree))
    }

    fn build(&self, configs: &[crate::config::StepConfig]) -> Result<Vec<Box<dyn Step>>> {
        self.registry.build_all(configs)
    }

    fn execute(
        &mut self,
        steps: &[Box<dyn Step>],
        ctx: &ScaffoldContext,
        opts: &StepOptions,
    ) -> Result<()> {
        let mut executor = StepExecutor::new();
        let outcome = executor.execute(steps, ctx, opts);
        self.results = executor.into_results();
        outcome
    }

    /// Pre-flight, suffix bootstrap, then the merged scaffold steps in order.
    ///
    /// Step declarations are validated before anything touches the worktree.
    pub fn run_scaffold(&mut self, req: &ScaffoldRequest, config: &Config) -> Result<()> {
        self.results.clear();
        let preset = Self::resolve_preset(req, config)?;
        let steps = self.build(&config.scaffold_steps(preset))?;
        let ctx = req.context(preset);

        run_preflight(config.scaffold.pre_flight_condition(), &ctx)?;

        let state = LocalState::load(&req.worktree)?;
        if state.db_suffix.is_empty() {
            let suffix = words::generate_suffix()?;
            debug!(suffix = %suffix, "generated database suffix");
            if !req.dry_run {
                LocalState::persist_db_suffix(&req.worktree, &suffix)
                    .context("failed to persist local state")?;
            }
            ctx.set_db_suffix(suffix);
        } else {
            ctx.set_db_suffix(state.db_suffix);
        }

        info!(
            worktree = %req.worktree.display(),
            preset = ctx.preset_name(),
            steps = steps.len(),
            "scaffolding worktree"
        );
        self.execute(&steps, &ctx, &req.options())
    }

    /// Merged cleanup steps in order; no pre-flight and no local-state writes.
    pub fn run_cleanup(&mut self, req: &ScaffoldRequest, config: &Config) -> Result<()> {
        self.results.clear();
        let preset = Self::resolve_preset(req, config)?;
        let steps = self.build(&config.cleanup_steps(preset))?;
        let ctx = req.context(preset);
        info!(
            worktree = %req.worktree.display(),
            preset = ctx.preset_name(),
            steps = steps.len(),
            "cleaning up worktree"
        );
        self.execute(&steps, &ctx, &req.options())
    }
}
