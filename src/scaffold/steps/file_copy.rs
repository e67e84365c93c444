use std::fs;

use anyhow::{Context, Result};
use tracing::debug;

use super::{Step, StepOptions};
use crate::config::StepConfig;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::probe;
use crate::util::fs::{set_file_mode, DEFAULT_FILE_MODE};

/// `file.copy {from, to}`: copy a file inside the worktree. Paths are used verbatim.
#[derive(Debug)]
pub struct FileCopyStep {
    cfg: StepConfig,
}

impl FileCopyStep {
    pub fn new(cfg: StepConfig) -> Self {
        Self { cfg }
    }
}

impl Step for FileCopyStep {
    fn name(&self) -> &str {
        "file.copy"
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        probe::file_exists(ctx.worktree_path(), &self.cfg.from)
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let root = ctx.worktree_path();
        let from = probe::resolve(root, &self.cfg.from);
        let to = probe::resolve(root, &self.cfg.to);
        let data =
            fs::read(&from).with_context(|| format!("failed to read {}", from.display()))?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&to, data).with_context(|| format!("failed to write {}", to.display()))?;
        set_file_mode(&to, DEFAULT_FILE_MODE)
            .with_context(|| format!("failed to set permissions on {}", to.display()))?;
        debug!(from = %from.display(), to = %to.display(), "copied file");
        Ok(())
    }
}
