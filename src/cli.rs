use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use arbor::{sanitize_name, ColorMode, Config, PromptMode, ScaffoldRequest};

const FALLBACK_DEFAULT_BRANCH: &str = "main";

#[derive(Parser, Debug)]
#[command(
    name = "arbor",
    version,
    about = "Scaffold and tear down git worktrees from declarative steps."
)]
pub(crate) struct Cli {
    /// Print detailed execution info
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    /// Colorize output: auto|always|never
    #[arg(long, value_enum, global = true)]
    pub(crate) color: Option<ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Run the scaffold steps for a worktree
    Scaffold(RunArgs),
    /// Run the cleanup steps for a worktree
    Cleanup(RunArgs),
    /// List registered step types
    Steps,
    /// List presets and the one detected for PATH
    Presets {
        /// Worktree to inspect (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Print the merged steps a run would use
    Config {
        /// Worktree to inspect (defaults to the current directory)
        path: Option<PathBuf>,

        /// Preset to use instead of the configured or detected one
        #[arg(long)]
        preset: Option<String>,

        /// Emit JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunArgs {
    /// Worktree directory (defaults to the current directory)
    pub(crate) path: Option<PathBuf>,

    /// Branch checked out in the worktree (defaults to the directory name)
    #[arg(long)]
    pub(crate) branch: Option<String>,

    /// Repository name (defaults to the parent directory name)
    #[arg(long = "repo-name")]
    pub(crate) repo_name: Option<String>,

    /// Site name used for URLs and database prefixes
    #[arg(long = "site-name")]
    pub(crate) site_name: Option<String>,

    /// Preset to use instead of the configured or detected one
    #[arg(long)]
    pub(crate) preset: Option<String>,

    /// Path to the bare repository, when the project uses one
    #[arg(long = "bare-path")]
    pub(crate) bare_path: Option<PathBuf>,

    /// Print what would run without changing anything
    #[arg(long = "dry-run")]
    pub(crate) dry_run: bool,

    /// Never ask for confirmation
    #[arg(long = "no-interactive")]
    pub(crate) no_interactive: bool,

    /// Proceed without confirmation prompts
    #[arg(long)]
    pub(crate) force: bool,
}

/// Absolute worktree path; falls back to the path as given when it cannot be resolved.
pub(crate) fn resolve_worktree(path: Option<&Path>) -> PathBuf {
    let p = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    std::fs::canonicalize(&p).unwrap_or(p)
}

fn dir_name(p: Option<&Path>) -> String {
    p.and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Configured site name on the default branch, otherwise the sanitized branch.
pub(crate) fn default_site_name(config: &Config, branch: &str) -> String {
    let default_branch = if config.default_branch.trim().is_empty() {
        FALLBACK_DEFAULT_BRANCH
    } else {
        config.default_branch.trim()
    };
    if branch == default_branch && !config.site_name.trim().is_empty() {
        return config.site_name.trim().to_string();
    }
    sanitize_name(branch)
}

impl RunArgs {
    pub(crate) fn worktree(&self) -> PathBuf {
        resolve_worktree(self.path.as_deref())
    }

    pub(crate) fn request(&self, worktree: &Path, config: &Config, verbose: bool, quiet: bool) -> ScaffoldRequest {
        let branch = self
            .branch
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| dir_name(Some(worktree)));
        let repo_name = self
            .repo_name
            .clone()
            .unwrap_or_else(|| dir_name(worktree.parent()));
        let site_name = self
            .site_name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_site_name(config, &branch));
        ScaffoldRequest {
            worktree: worktree.to_path_buf(),
            branch,
            repo_name,
            site_name,
            preset: self.preset.clone().unwrap_or_default(),
            bare_path: self.bare_path.clone(),
            prompt: PromptMode::detect(self.no_interactive, self.force),
            dry_run: self.dry_run,
            verbose,
            quiet,
        }
    }
}
