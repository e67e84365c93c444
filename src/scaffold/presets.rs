//! Built-in presets: default scaffold and cleanup steps for common stacks.
//!
//! The catalog is ordered most specific first; detection returns the first match.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use crate::config::{CleanupStepConfig, StepConfig};
use crate::errors::ConfigError;

const LARAVEL_STEPS: &str = r#"
- name: php.composer
  args: [install]
- name: file.copy
  from: .env.example
  to: .env
  condition:
    file_exists: .env.example
    not:
      file_exists: .env
- name: env.write
  key: APP_URL
  value: "https://{{ .SanitizedSiteName }}.test"
- name: php.laravel
  args: ["key:generate"]
  condition:
    env_file_missing: APP_KEY
- name: db.create
- name: php.laravel
  args: [migrate, --seed, --force]
- name: node.npm
  args: [ci]
  condition:
    file_exists: package-lock.json
- name: node.npm
  args: [run, build]
  condition:
    file_has_script: build
- name: herd
  args: [link, --secure, "{{ .SanitizedSiteName }}"]
  condition:
    command_exists: herd
"#;

const LARAVEL_CLEANUP: &str = r#"
- name: herd
- name: db.destroy
"#;

const PHP_STEPS: &str = r#"
- name: php.composer
  args: [install]
"#;

const NODE_STEPS: &str = r#"
- name: node.npm
  args: [ci]
  condition:
    file_exists: package-lock.json
"#;

#[derive(Debug, Clone)]
pub struct Preset {
    name: &'static str,
    marker: &'static str,
    default_steps: Vec<StepConfig>,
    cleanup_steps: Vec<CleanupStepConfig>,
}

fn parse_list<T: DeserializeOwned>(preset: &str, yaml: &str) -> Vec<T> {
    match serde_yaml::from_str(yaml) {
        Ok(list) => list,
        Err(e) => {
            tracing::error!(preset, error = %e, "built-in preset steps failed to parse");
            Vec::new()
        }
    }
}

impl Preset {
    fn builtin(name: &'static str, marker: &'static str, steps: &str, cleanup: &str) -> Self {
        Self {
            name,
            marker,
            default_steps: parse_list(name, steps),
            cleanup_steps: parse_list(name, cleanup),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// True when the preset's marker file exists in `worktree`.
    pub fn detect(&self, worktree: &Path) -> bool {
        worktree.join(self.marker).is_file()
    }

    pub fn default_steps(&self) -> Vec<StepConfig> {
        self.default_steps.clone()
    }

    pub fn cleanup_steps(&self) -> Vec<CleanupStepConfig> {
        self.cleanup_steps.clone()
    }
}

static PRESETS: Lazy<Vec<Preset>> = Lazy::new(|| {
    vec![
        Preset::builtin("laravel", "artisan", LARAVEL_STEPS, LARAVEL_CLEANUP),
        Preset::builtin("php", "composer.json", PHP_STEPS, "[]"),
        Preset::builtin("node", "package.json", NODE_STEPS, "[]"),
    ]
});

/// Every built-in preset in catalog order.
pub fn presets() -> &'static [Preset] {
    &PRESETS
}

pub fn preset_names() -> Vec<String> {
    presets().iter().map(|p| p.name.to_string()).collect()
}

pub fn preset_by_name(name: &str) -> Result<&'static Preset, ConfigError> {
    presets()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ConfigError::UnknownPreset {
            name: name.to_string(),
            available: preset_names(),
        })
}

/// First preset whose marker is present in `worktree`.
pub fn detect_preset(worktree: &Path) -> Option<&'static Preset> {
    presets().iter().find(|p| p.detect(worktree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::registry::{validate, StepRegistry};
    use std::fs;

    #[test]
    fn test_builtin_steps_parse_and_validate() {
        let registry = StepRegistry::with_builtins(Default::default());
        for p in presets() {
            assert!(!p.default_steps().is_empty(), "{} has no steps", p.name());
            for s in p.default_steps() {
                assert!(registry.contains(&s.name), "{}: {}", p.name(), s.name);
                validate(&s.name, &s).expect("valid");
            }
            for c in p.cleanup_steps() {
                assert!(registry.contains(&c.name), "{}: {}", p.name(), c.name);
            }
        }
    }

    #[test]
    fn test_laravel_shape() {
        let p = preset_by_name("Laravel").expect("laravel");
        let names: Vec<String> = p.default_steps().into_iter().map(|s| s.name).collect();
        assert_eq!(names.first().map(String::as_str), Some("php.composer"));
        assert!(names.iter().any(|n| n == "db.create"));
        let cleanup: Vec<String> = p.cleanup_steps().into_iter().map(|c| c.name).collect();
        assert_eq!(cleanup, vec!["herd", "db.destroy"]);
        assert!(p.default_steps()[3].condition.is_some());
    }

    #[test]
    fn test_detect_most_specific_first() {
        let td = tempfile::tempdir().expect("tmpdir");
        assert!(detect_preset(td.path()).is_none());
        fs::write(td.path().join("package.json"), "{}").expect("seed");
        assert_eq!(detect_preset(td.path()).map(Preset::name), Some("node"));
        fs::write(td.path().join("composer.json"), "{}").expect("seed");
        assert_eq!(detect_preset(td.path()).map(Preset::name), Some("php"));
        fs::write(td.path().join("artisan"), "#!/usr/bin/env php").expect("seed");
        assert_eq!(detect_preset(td.path()).map(Preset::name), Some("laravel"));
    }

    #[test]
    fn test_unknown_preset_lists_catalog() {
        let err = preset_by_name("rails").expect_err("unknown");
        assert_eq!(err.to_string(), "unknown preset 'rails'; available presets: laravel, php, node");
    }
}
