mod support;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn arbor(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_arbor");
    Command::new(bin)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("ARBOR_LOG")
        .output()
        .expect("failed to run arbor")
}

fn describe(out: &Output) -> String {
    format!(
        "status {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

/// `<tmp>/project/arbor.yaml` plus an empty `<tmp>/project/<branch>` worktree.
fn project(config: &str, branch: &str) -> (tempfile::TempDir, PathBuf) {
    let td = tempfile::tempdir().expect("tmpdir");
    support::write(td.path(), "project/arbor.yaml", config);
    let worktree = td.path().join("project").join(branch);
    std::fs::create_dir_all(&worktree).expect("worktree");
    (td, worktree)
}

fn path_arg(p: &Path) -> &str {
    p.to_str().expect("utf-8 temp path")
}

#[test]
fn test_cli_steps_lists_builtins() {
    let out = arbor(&["steps"]);
    assert!(out.status.success(), "{}", describe(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let names: Vec<&str> = stdout.lines().collect();
    assert!(names.contains(&"db.create"));
    assert!(names.contains(&"node.bun"));
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_cli_presets_marks_detected() {
    let td = tempfile::tempdir().expect("tmpdir");
    support::write(td.path(), "composer.json", "{}");
    let out = arbor(&["presets", path_arg(td.path())]);
    assert!(out.status.success(), "{}", describe(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.lines().any(|l| l == "php (detected)"), "{}", describe(&out));
    assert!(stdout.lines().any(|l| l == "laravel"));
}

#[test]
fn test_cli_scaffold_writes_env_with_derived_site_name() {
    let (_td, worktree) = project(
        r#"
site_name: shop
default_branch: main
scaffold:
  steps:
    - name: env.write
      key: APP_URL
      value: "https://{{ .SanitizedSiteName }}.test"
"#,
        "Feature-Login",
    );
    let out = arbor(&["scaffold", path_arg(&worktree), "--no-interactive"]);
    assert!(out.status.success(), "{}", describe(&out));
    let env = std::fs::read_to_string(worktree.join(".env")).expect("env");
    assert_eq!(env, "APP_URL=https://feature_login.test\n");
    assert!(worktree.join(".arbor.local").is_file());
}

#[test]
fn test_cli_scaffold_dry_run_reports_steps() {
    let (_td, worktree) = project(
        "scaffold:\n  steps:\n    - name: env.write\n      key: A\n      value: b\n",
        "main",
    );
    let out = arbor(&["scaffold", path_arg(&worktree), "--dry-run"]);
    assert!(out.status.success(), "{}", describe(&out));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("env.write"), "{}", describe(&out));
    assert!(stderr.contains("[dry-run]"), "{}", describe(&out));
    assert!(!worktree.join(".env").exists());
    assert!(!worktree.join(".arbor.local").exists());
}

#[test]
fn test_cli_preflight_failure_exit_code() {
    let (_td, worktree) = project(
        r#"
scaffold:
  pre_flight:
    condition:
      env_exists: ARBOR_CLI_REQUIRED_TOKEN
"#,
        "main",
    );
    let out = arbor(&["scaffold", path_arg(&worktree)]);
    assert_eq!(out.status.code(), Some(2), "{}", describe(&out));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Missing environment variables"), "{}", describe(&out));
    assert!(stderr.contains("ARBOR_CLI_REQUIRED_TOKEN"));
}

#[test]
fn test_cli_unknown_step_fails() {
    let (_td, worktree) = project(
        "scaffold:\n  steps:\n    - name: rails.migrate\n",
        "main",
    );
    let out = arbor(&["--quiet", "scaffold", path_arg(&worktree)]);
    assert_eq!(out.status.code(), Some(1), "{}", describe(&out));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown step 'rails.migrate'"));
}

#[test]
fn test_cli_config_json_shows_merged_steps() {
    let (_td, worktree) = project(
        "preset: php\ncleanup:\n  steps:\n    - name: db.destroy\n",
        "main",
    );
    let out = arbor(&["config", path_arg(&worktree), "--json"]);
    assert!(out.status.success(), "{}", describe(&out));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(v["preset"], "php");
    assert_eq!(v["scaffold"][0]["name"], "php.composer");
    assert_eq!(v["cleanup"][0]["name"], "db.destroy");

    let out = arbor(&["config", path_arg(&worktree), "--preset", "django"]);
    assert_eq!(out.status.code(), Some(1), "{}", describe(&out));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown preset 'django'"));
}
