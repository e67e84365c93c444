#![allow(clippy::module_name_repetitions)]
//! Small utilities: shell quoting, name sanitisation, filesystem helpers, process execution.

pub mod exec;
pub mod fs;

pub use exec::{ExecOutput, ExecRequest, ExecService};

pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=./:@".contains(c))
    {
        s.to_string()
    } else {
        let escaped = s.replace('\'', "'\"'\"'");
        format!("'{}'", escaped)
    }
}

/// Lowercase, map every char outside `[a-z0-9_]` to `_`, collapse `_` runs, trim `_` at both ends.
///
/// Used for `SanitizedSiteName` and for database name prefixes. Idempotent.
pub fn sanitize_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_underscore = false;
    for ch in s.chars().flat_map(char::to_lowercase) {
        let c = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '_'
        };
        if c == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape_simple() {
        assert_eq!(shell_escape("abc-123_./:@"), "abc-123_./:@");
    }

    #[test]
    fn test_shell_escape_with_spaces_and_quotes() {
        assert_eq!(shell_escape("a b c"), "'a b c'");
        assert_eq!(shell_escape("O'Reilly"), "'O'\"'\"'Reilly'");
    }

    #[test]
    fn test_shell_join() {
        let args = vec!["php".to_string(), "artisan".to_string(), "db seed".to_string()];
        assert_eq!(shell_join(&args), "php artisan 'db seed'");
    }

    #[test]
    fn test_sanitize_name_rules() {
        assert_eq!(sanitize_name("My-App.Test"), "my_app_test");
        assert_eq!(sanitize_name("__feature//login__"), "feature_login");
        assert_eq!(sanitize_name("a   b"), "a_b");
        assert_eq!(sanitize_name("Ünïcode"), "n_code");
        assert_eq!(sanitize_name("---"), "");
        assert_eq!(sanitize_name("already_clean_1"), "already_clean_1");
    }

    #[test]
    fn test_sanitize_name_idempotent() {
        for s in ["Feature/ABC-123", "  spaced out  ", "x__y", "émoji🙂site", ""] {
            let once = sanitize_name(s);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {s:?}");
        }
    }
}
