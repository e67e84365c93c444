use anyhow::Result;
use tracing::debug;

use super::{Step, StepOptions};
use crate::config::StepConfig;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::template;
use crate::util::exec::{ExecRequest, ExecService};

/// Step names bound to fixed executables (optionally with a fixed leading argument).
pub const BINARY_STEPS: &[(&str, &str)] = &[
    ("php", "php"),
    ("php.composer", "composer"),
    ("php.laravel", "php artisan"),
    ("node.npm", "npm"),
    ("node.yarn", "yarn"),
    ("node.pnpm", "pnpm"),
    ("node.bun", "bun"),
    ("herd", "herd"),
];

/// Executable binding for a binary step name.
pub fn binary_for(step_name: &str) -> Option<&'static str> {
    BINARY_STEPS
        .iter()
        .find(|(name, _)| *name == step_name)
        .map(|(_, bin)| *bin)
}

/// Runs its bound executable with templated args in the worktree.
///
/// Skipped (condition false) when the executable is not on PATH. The tool gets
/// the terminal (stdin included) unless the run is quiet, in which case output is
/// captured and only shown on failure.
#[derive(Debug)]
pub struct BinaryStep {
    step_name: String,
    binary: &'static str,
    cfg: StepConfig,
    exec: ExecService,
}

impl BinaryStep {
    pub fn new(step_name: impl Into<String>, binary: &'static str, cfg: StepConfig) -> Self {
        Self {
            step_name: step_name.into(),
            binary,
            cfg,
            exec: ExecService::default(),
        }
    }

    fn program_and_prefix(&self) -> (&'static str, Vec<&'static str>) {
        let mut words = self.binary.split_whitespace();
        let program = words.next().unwrap_or(self.binary);
        (program, words.collect())
    }

    /// Full argument vector: fixed prefix, declared args, invocation args.
    pub fn argv(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<Vec<String>> {
        let (_, prefix) = self.program_and_prefix();
        let mut raw: Vec<String> = self.cfg.args.clone();
        raw.extend(opts.args.iter().cloned());
        let mut argv: Vec<String> = prefix.into_iter().map(String::from).collect();
        argv.extend(template::render_all(&raw, ctx)?);
        Ok(argv)
    }

    /// Quiet runs capture output; otherwise the tool gets the terminal.
    pub fn request(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<ExecRequest> {
        let (program, _) = self.program_and_prefix();
        Ok(ExecRequest::new(program)
            .args(self.argv(ctx, opts)?)
            .cwd(ctx.worktree_path())
            .capture_output(opts.quiet))
    }
}

impl Step for BinaryStep {
    fn name(&self) -> &str {
        &self.step_name
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn condition(&self, _ctx: &ScaffoldContext) -> bool {
        let (program, _) = self.program_and_prefix();
        let found = which::which(program).is_ok();
        if !found {
            debug!(step = %self.step_name, program, "executable not on PATH; skipping");
        }
        found
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let req = self.request(ctx, opts)?;
        debug!(step = %self.step_name, command = %req.display(), "running");
        self.exec.run_checked(req)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings() {
        assert_eq!(binary_for("php.laravel"), Some("php artisan"));
        assert_eq!(binary_for("node.pnpm"), Some("pnpm"));
        assert_eq!(binary_for("ruby"), None);
        assert_eq!(BINARY_STEPS.len(), 8);
    }

    #[test]
    fn test_argv_prefix_and_templating() {
        let ctx = ScaffoldContext::new("/w/shop/feat").site_name("Feat Shop");
        let step = BinaryStep::new(
            "php.laravel",
            "php artisan",
            StepConfig::new("php.laravel").with_args(["db:seed", "--class={{ .SanitizedSiteName }}"]),
        );
        let opts = StepOptions {
            args: vec!["--force".into()],
            ..StepOptions::default()
        };
        assert_eq!(
            step.argv(&ctx, &opts).expect("argv"),
            vec!["artisan", "db:seed", "--class=feat_shop", "--force"]
        );
        assert_eq!(step.program_and_prefix().0, "php");
    }

    #[test]
    fn test_interactive_run_keeps_terminal_stdin() {
        let ctx = ScaffoldContext::new("/w/shop/feat");
        let step = BinaryStep::new("php.composer", "composer", StepConfig::new("php.composer"));
        let loud = step.request(&ctx, &StepOptions::default()).expect("request");
        assert!(loud.inherits_stdin());
        let quiet = StepOptions {
            quiet: true,
            ..StepOptions::default()
        };
        assert!(!step.request(&ctx, &quiet).expect("request").inherits_stdin());
    }

    #[test]
    fn test_condition_false_for_missing_binary() {
        let ctx = ScaffoldContext::new("/tmp");
        let step = BinaryStep::new(
            "custom",
            "arbor-definitely-missing-binary",
            StepConfig::new("custom"),
        );
        assert!(!step.condition(&ctx));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        if which::which("sh").is_err() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path());
        let step = BinaryStep::new("sh", "sh", StepConfig::new("sh").with_args(["-c", "exit 7"]));
        let opts = StepOptions {
            quiet: true,
            ..StepOptions::default()
        };
        let err = step.run(&ctx, &opts).expect_err("should fail");
        assert!(err.to_string().contains("status 7"), "{err}");
    }
}
