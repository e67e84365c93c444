//! Pre-flight: one condition tree checked before any step runs.

use serde_yaml::Value;

use super::condition::Condition;
use super::context::ScaffoldContext;
use super::probe;
use crate::errors::PreflightError;

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Evaluate the pre-flight tree; on failure, report what is missing.
pub fn run_preflight(condition: Option<&Value>, ctx: &ScaffoldContext) -> Result<(), PreflightError> {
    let tree = Condition::from_option(condition);
    if tree.evaluate(ctx) {
        return Ok(());
    }
    Err(build_report(&tree, ctx))
}

/// Collect unmet resources from every `env_exists`, `command_exists` and
/// `file_exists` node, including those under `not`, in depth-first order.
pub fn build_report(tree: &Condition, ctx: &ScaffoldContext) -> PreflightError {
    let root = ctx.worktree_path();
    let mut report = PreflightError::default();
    tree.walk(&mut |node| match node {
        Condition::EnvExists(names) => {
            for n in names.iter().filter(|n| !probe::env_exists(n)) {
                push_unique(&mut report.missing_env, n.clone());
            }
        }
        Condition::CommandExists(cmds) => {
            for c in cmds.iter().filter(|c| !probe::command_exists(c)) {
                push_unique(&mut report.missing_commands, c.clone());
            }
        }
        Condition::FileExists(files) => {
            for f in files {
                let resolved = probe::resolve(root, f);
                match resolved.try_exists() {
                    Ok(true) => {}
                    Ok(false) => {
                        push_unique(&mut report.missing_files, resolved.display().to_string())
                    }
                    Err(e) => push_unique(
                        &mut report.file_errors,
                        format!("{}: {}", resolved.display(), e),
                    ),
                }
            }
        }
        _ => {}
    });
    report
}
