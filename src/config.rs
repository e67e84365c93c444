//! Project configuration (`arbor.yaml`) and step declarations.
//!
//! The file is optional; a missing file behaves like an empty config and the
//! preset (explicit or detected) supplies the steps.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::scaffold::presets::Preset;

/// Config file names looked up in the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["arbor.yaml", ".arbor.yaml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preset: String,
    pub site_name: String,
    pub default_branch: String,
    pub scaffold: ScaffoldConfig,
    pub cleanup: CleanupConfig,
    pub tools: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Either a condition mapping or `{ condition: <mapping> }`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_flight: Option<Value>,
    pub steps: Vec<StepConfig>,
    #[serde(rename = "override")]
    pub override_steps: bool,
}

impl ScaffoldConfig {
    /// The pre-flight condition tree with the optional `condition:` wrapper removed.
    pub fn pre_flight_condition(&self) -> Option<&Value> {
        let pf = self.pre_flight.as_ref()?;
        if let Value::Mapping(map) = pf {
            if map.len() == 1 {
                if let Some(inner) = map.get("condition") {
                    return Some(inner);
                }
            }
        }
        Some(pf)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub steps: Vec<CleanupStepConfig>,
    #[serde(rename = "override")]
    pub override_steps: bool,
}

/// One step declaration. Only the fields relevant to `name` are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub store_as: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_file: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub db_type: String,
}

impl StepConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a condition written as YAML (e.g. `"file_exists: artisan"`).
    ///
    /// Malformed YAML leaves the condition unset; callers pass literals.
    pub fn with_condition_yaml(mut self, yaml: &str) -> Self {
        self.condition = serde_yaml::from_str::<Value>(yaml).ok();
        self
    }

    /// Absent means enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Cleanup entries only name a built-in step and an optional condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupStepConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl CleanupStepConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
        }
    }

    /// Map to a full step declaration, adding the fixed arguments the teardown form needs.
    pub fn to_step_config(&self) -> StepConfig {
        let args: Vec<String> = match self.name.as_str() {
            "herd" => vec!["unlink".to_string()],
            _ => Vec::new(),
        };
        StepConfig {
            name: self.name.clone(),
            condition: self.condition.clone(),
            args,
            ..StepConfig::default()
        }
    }
}

fn merge<T: Clone>(preset_steps: Vec<T>, project: &[T], override_steps: bool) -> Vec<T> {
    if override_steps {
        return project.to_vec();
    }
    let mut out = preset_steps;
    out.extend(project.iter().cloned());
    out
}

/// The steps a run would build after preset merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectiveConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub site_name: String,
    pub default_branch: String,
    pub scaffold: Vec<StepConfig>,
    pub cleanup: Vec<StepConfig>,
}

impl Config {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Config::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Config> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// First config file found in `dirs`, if any.
    pub fn find(dirs: &[PathBuf]) -> Option<PathBuf> {
        dirs.iter()
            .flat_map(|d| CONFIG_FILE_NAMES.iter().map(move |n| d.join(n)))
            .find(|p| p.is_file())
    }

    /// Look for the project config next to the bare repo, then in the worktree's
    /// parent (the shared project root), then in the worktree itself.
    pub fn discover(worktree: &Path, bare_path: Option<&Path>) -> Result<Config> {
        let mut dirs = Vec::new();
        if let Some(bare) = bare_path {
            if let Some(parent) = bare.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
        if let Some(parent) = worktree.parent() {
            dirs.push(parent.to_path_buf());
        }
        dirs.push(worktree.to_path_buf());
        match Config::find(&dirs) {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading project config");
                Config::load(&p)
            }
            None => Ok(Config::default()),
        }
    }

    /// Preset defaults followed by (or replaced with) project scaffold steps.
    pub fn scaffold_steps(&self, preset: Option<&Preset>) -> Vec<StepConfig> {
        let defaults = preset.map(Preset::default_steps).unwrap_or_default();
        merge(defaults, &self.scaffold.steps, self.scaffold.override_steps)
    }

    /// Preset cleanup followed by (or replaced with) project cleanup steps.
    pub fn cleanup_steps(&self, preset: Option<&Preset>) -> Vec<StepConfig> {
        let defaults = preset.map(Preset::cleanup_steps).unwrap_or_default();
        merge(defaults, &self.cleanup.steps, self.cleanup.override_steps)
            .iter()
            .map(CleanupStepConfig::to_step_config)
            .collect()
    }

    pub fn effective(&self, preset: Option<&Preset>) -> EffectiveConfig {
        EffectiveConfig {
            preset: preset.map(|p| p.name().to_string()),
            site_name: self.site_name.clone(),
            default_branch: self.default_branch.clone(),
            scaffold: self.scaffold_steps(preset),
            cleanup: self.cleanup_steps(preset),
        }
    }
}
