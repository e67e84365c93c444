mod support;

use std::fs;
use std::sync::Arc;
use std::thread;

use arbor::scaffold::steps::env_file::write_env_value;
use arbor::scaffold::steps::EnvWriteStep;
use arbor::{ScaffoldContext, Step, StepConfig, StepOptions};

#[test]
fn test_concurrent_writes_keep_one_line_per_key() {
    let td = tempfile::tempdir().expect("tmpdir");
    support::write(td.path(), ".env", "APP_NAME=shop\n# keep me\n");
    let path = Arc::new(td.path().join(".env"));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let path = path.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    write_env_value(&path, &format!("KEY_{}", t), &i.to_string())
                        .expect("write");
                    write_env_value(&path, "SHARED", &format!("{}-{}", t, i)).expect("write");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }

    let content = fs::read_to_string(&*path).expect("read");
    for t in 0..8 {
        let key = format!("KEY_{}=", t);
        let lines: Vec<&str> = content.lines().filter(|l| l.starts_with(&key)).collect();
        assert_eq!(lines, vec![format!("KEY_{}=24", t)], "{content}");
    }
    let shared: Vec<&str> = content.lines().filter(|l| l.starts_with("SHARED=")).collect();
    assert_eq!(shared.len(), 1, "{content}");
    assert!(shared[0].ends_with("-24"), "{content}");
    assert!(content.starts_with("APP_NAME=shop\n# keep me\n"));
}

#[test]
fn test_steps_on_shared_context_from_threads() {
    let td = tempfile::tempdir().expect("tmpdir");
    let ctx = Arc::new(ScaffoldContext::new(td.path()).site_name("shop"));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                ctx.set_var(format!("Value{}", t), format!("v{}", t));
                let step = EnvWriteStep::new(StepConfig {
                    key: format!("K{}", t),
                    value: format!("{{{{ .Value{} }}}}-{{{{ .SanitizedSiteName }}}}", t),
                    ..StepConfig::new("env.write")
                });
                step.run(&ctx, &StepOptions::default()).expect("run");
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }
    let content = fs::read_to_string(td.path().join(".env")).expect("read");
    for t in 0..4 {
        assert!(content.contains(&format!("K{}=v{}-shop\n", t, t)), "{content}");
    }
    assert_eq!(content.lines().count(), 4);
}

#[cfg(unix)]
#[test]
fn test_write_preserves_permission_bits() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempfile::tempdir().expect("tmpdir");
    let p = td.path().join(".env");
    fs::write(&p, "A=1\n").expect("seed");
    fs::set_permissions(&p, fs::Permissions::from_mode(0o600)).expect("chmod");
    write_env_value(&p, "B", "2").expect("write");
    let mode = fs::metadata(&p).expect("meta").permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    assert_eq!(fs::read_to_string(&p).expect("read"), "A=1\nB=2\n");

    let fresh = td.path().join("nested/.env.local");
    write_env_value(&fresh, "C", "3").expect("write");
    let mode = fs::metadata(&fresh).expect("meta").permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}
