use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use arbor::scaffold::presets::{detect_preset, presets};
use arbor::{
    color_enabled_stderr, color_enabled_stdout, default_registry, exit_code_for_error,
    log_error_stderr, log_info_stderr, log_warn_stderr, paint, Config, ExecutionResult,
    ScaffoldManager, ScaffoldRequest, StepError,
};

mod cli;

use cli::{Cli, Command, RunArgs};

#[derive(Clone, Copy)]
enum Mode {
    Scaffold,
    Cleanup,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Scaffold => "scaffold",
            Mode::Cleanup => "cleanup",
        }
    }
}

fn print_results(results: &[ExecutionResult]) {
    let use_err = color_enabled_stderr();
    for r in results {
        let code = match r.status() {
            "ok" => "\x1b[32m",
            "skipped" => "\x1b[90m",
            _ => "\x1b[31m",
        };
        eprintln!("  {:<8} {}", paint(use_err, code, r.status()), r.step);
    }
}

/// Step failures already carry their cause in the message.
fn describe_error(e: &anyhow::Error) -> String {
    if e.downcast_ref::<StepError>().is_some() {
        e.to_string()
    } else {
        format!("{:#}", e)
    }
}

fn run(mode: Mode, args: &RunArgs, verbose: bool, quiet: bool) -> ExitCode {
    let use_err = color_enabled_stderr();
    let worktree = args.worktree();
    let config = match Config::discover(&worktree, args.bare_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            log_error_stderr(use_err, &format!("arbor: {}", describe_error(&e)));
            return ExitCode::from(exit_code_for_error(&e));
        }
    };
    let req = args.request(&worktree, &config, verbose, quiet);
    let mut manager = ScaffoldManager::default();
    let outcome = match mode {
        Mode::Scaffold => manager.run_scaffold(&req, &config),
        Mode::Cleanup => manager.run_cleanup(&req, &config),
    };
    if (verbose || args.dry_run) && !quiet {
        print_results(manager.results());
    }
    match outcome {
        Ok(()) => {
            if !quiet && manager.results().is_empty() {
                log_warn_stderr(
                    use_err,
                    &format!(
                        "arbor: no {} steps configured for {}",
                        mode.label(),
                        worktree.display()
                    ),
                );
            } else if !quiet {
                let skipped = manager.results().iter().filter(|r| r.skipped).count();
                log_info_stderr(
                    use_err,
                    &format!(
                        "arbor: {} {} for {} ({} steps, {} skipped){}",
                        mode.label(),
                        if args.dry_run { "planned" } else { "complete" },
                        req.site_name,
                        manager.results().len(),
                        skipped,
                        if args.dry_run { " [dry-run]" } else { "" }
                    ),
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_error_stderr(use_err, &format!("arbor: {} failed: {}", mode.label(), describe_error(&e)));
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

fn show_config(path: Option<&Path>, preset: Option<&str>, json: bool) -> anyhow::Result<()> {
    let worktree = cli::resolve_worktree(path);
    let config = Config::discover(&worktree, None)?;
    let req = ScaffoldRequest {
        preset: preset.unwrap_or_default().to_string(),
        ..ScaffoldRequest::new(&worktree)
    };
    let effective = config.effective(ScaffoldManager::resolve_preset(&req, &config)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        print!("{}", serde_yaml::to_string(&effective)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        arbor::set_color_mode(mode);
    }
    arbor::logging::init(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Scaffold(args) => run(Mode::Scaffold, args, cli.verbose, cli.quiet),
        Command::Cleanup(args) => run(Mode::Cleanup, args, cli.verbose, cli.quiet),
        Command::Steps => {
            for name in default_registry().list() {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
        Command::Presets { path } => {
            let worktree = cli::resolve_worktree(path.as_deref());
            let detected = detect_preset(&worktree).map(|p| p.name().to_string());
            let use_out = color_enabled_stdout();
            for p in presets() {
                if detected.as_deref() == Some(p.name()) {
                    println!("{} {}", p.name(), paint(use_out, "\x1b[32m", "(detected)"));
                } else {
                    println!("{}", p.name());
                }
            }
            ExitCode::SUCCESS
        }
        Command::Config { path, preset, json } => {
            match show_config(path.as_deref(), preset.as_deref(), *json) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log_error_stderr(color_enabled_stderr(), &format!("arbor: {:#}", e));
                    ExitCode::from(exit_code_for_error(&e))
                }
            }
        }
    }
}
