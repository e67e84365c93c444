use anyhow::Result;
use tracing::debug;

use super::{Step, StepOptions};
use crate::config::StepConfig;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::template;
use crate::util::exec::{ExecRequest, ExecService};

/// `bash.run` and `command.run`: run a shell command in the worktree.
///
/// `bash.run` renders the command as a template and prefers bash;
/// `command.run` uses the string verbatim with the portable shell. Declared
/// args become positional parameters (`$1`, `$2`, ...). With `store_as`,
/// trimmed output lands in the context only when the command succeeds.
#[derive(Debug)]
pub struct ShellStep {
    cfg: StepConfig,
    templated: bool,
    exec: ExecService,
}

impl ShellStep {
    pub fn bash(cfg: StepConfig) -> Self {
        Self {
            cfg,
            templated: true,
            exec: ExecService::default(),
        }
    }

    pub fn command(cfg: StepConfig) -> Self {
        Self {
            cfg,
            templated: false,
            exec: ExecService::default(),
        }
    }
}

impl Step for ShellStep {
    fn name(&self) -> &str {
        if self.templated {
            "bash.run"
        } else {
            "command.run"
        }
    }

    fn config(&self) -> &StepConfig {
        &self.cfg
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let command = if self.templated {
            template::render(&self.cfg.command, ctx)?
        } else {
            self.cfg.command.clone()
        };
        let mut positional: Vec<String> = self.cfg.args.clone();
        positional.extend(opts.args.iter().cloned());
        if self.templated {
            positional = template::render_all(&positional, ctx)?;
        }

        let mut req = ExecRequest::shell(&command, self.templated)
            .cwd(ctx.worktree_path())
            .capture_output(true);
        if !positional.is_empty() && !cfg!(windows) {
            req = req.arg("arbor").args(positional);
        }
        debug!(step = self.name(), command = %command, "running shell command");

        let out = self.exec.run_checked(req)?;
        let combined = out.combined();
        if opts.verbose && !opts.quiet && !combined.trim().is_empty() {
            eprint!("{}", combined);
        }
        if !self.cfg.store_as.is_empty() {
            ctx.set_var(self.cfg.store_as.clone(), combined.trim_end().to_string());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::CommandError;

    fn have_sh() -> bool {
        which::which("sh").is_ok()
    }

    fn cfg(command: &str, store_as: &str) -> StepConfig {
        StepConfig {
            command: command.into(),
            store_as: store_as.into(),
            ..StepConfig::new("bash.run")
        }
    }

    #[test]
    fn test_bash_run_renders_and_stores() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path()).site_name("shop");
        ShellStep::bash(cfg("echo {{ .SiteName }}-db", "DbName"))
            .run(&ctx, &StepOptions::default())
            .expect("run");
        assert_eq!(ctx.get_var("DbName").as_deref(), Some("shop-db"));
    }

    #[test]
    fn test_bash_run_keeps_parameter_length_syntax() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path()).site_name("shop");
        ShellStep::bash(cfg("X=abc; echo ${#X}-{{ .SiteName }}", "Len"))
            .run(&ctx, &StepOptions::default())
            .expect("run");
        assert_eq!(ctx.get_var("Len").as_deref(), Some("3-shop"));
    }

    #[test]
    fn test_command_run_is_verbatim() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path()).site_name("shop");
        ShellStep::command(cfg("printf '%s' '{{ .SiteName }}'", "Raw"))
            .run(&ctx, &StepOptions::default())
            .expect("run");
        assert_eq!(ctx.get_var("Raw").as_deref(), Some("{{ .SiteName }}"));
    }

    #[test]
    fn test_runs_in_worktree_dir() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path());
        ShellStep::command(cfg("touch marker.txt", ""))
            .run(&ctx, &StepOptions::default())
            .expect("run");
        assert!(td.path().join("marker.txt").is_file());
    }

    #[test]
    fn test_failure_keeps_output_and_skips_store() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path());
        let err = ShellStep::command(cfg("echo broken >&2; exit 4", "Out"))
            .run(&ctx, &StepOptions::default())
            .expect_err("should fail");
        let ce = err.downcast_ref::<CommandError>().expect("command error");
        assert_eq!(ce.status, Some(4));
        assert!(ce.output.contains("broken"));
        assert_eq!(ctx.get_var("Out"), None);
    }

    #[test]
    fn test_positional_args() {
        if !have_sh() {
            eprintln!("skipping: sh not found in PATH");
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path()).branch("feature/x");
        let mut c = cfg("echo \"$1:$2\"", "Joined");
        c.args = vec!["{{ .Branch }}".into(), "two".into()];
        ShellStep::bash(c).run(&ctx, &StepOptions::default()).expect("run");
        assert_eq!(ctx.get_var("Joined").as_deref(), Some("feature/x:two"));
    }

    #[test]
    fn test_undefined_template_var_fails_before_running() {
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = ScaffoldContext::new(td.path());
        let err = ShellStep::bash(cfg("touch {{ .Missing }}", ""))
            .run(&ctx, &StepOptions::default())
            .expect_err("should fail");
        assert!(err.to_string().contains("Missing"));
    }
}
