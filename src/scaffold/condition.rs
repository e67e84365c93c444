//! Condition trees gating steps and pre-flight.
//!
//! The YAML form is a mapping (implicit AND of its keys), a list (AND of its
//! elements) or a scalar (always true). It is lowered into `Condition` before
//! evaluation.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::context::ScaffoldContext;
use super::probe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    All(Vec<Condition>),
    Not(Box<Condition>),
    FileExists(Vec<String>),
    FileContains { file: String, pattern: String },
    FileHasScript(String),
    CommandExists(Vec<String>),
    Os(Vec<String>),
    EnvExists(Vec<String>),
    EnvNotExists(Vec<String>),
    EnvFileContains { file: String, key: String },
    EnvFileMissing { file: String, key: String },
    ContextVar { key: String, value: String },
    /// Key outside the known set; evaluates true.
    Unknown(String),
    /// Known key with an argument of the wrong shape; evaluates false.
    Invalid { key: String, reason: String },
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String, list of strings, or `{<field>: string | list}`.
fn string_list(v: &Value, field: &str) -> Result<Vec<String>, String> {
    match v {
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_string(item).ok_or_else(|| "list items must be strings".to_string()))
            .collect(),
        Value::Mapping(map) => match map.get(field) {
            Some(inner) if !matches!(inner, Value::Mapping(_)) => string_list(inner, field),
            _ => Err(format!("expected a '{}' field", field)),
        },
        other => scalar_string(other)
            .map(|s| vec![s])
            .ok_or_else(|| "expected a string or list".to_string()),
    }
}

fn map_field(map: &Mapping, field: &str) -> Option<String> {
    map.get(field).and_then(scalar_string)
}

fn env_file_args(v: &Value) -> Result<(String, String), String> {
    match v {
        Value::Mapping(map) => {
            let key = map_field(map, "key").ok_or_else(|| "expected a 'key' field".to_string())?;
            let file = map_field(map, "file").unwrap_or_else(|| probe::DEFAULT_ENV_FILE.to_string());
            Ok((file, key))
        }
        other => scalar_string(other)
            .map(|key| (probe::DEFAULT_ENV_FILE.to_string(), key))
            .ok_or_else(|| "expected a key or {file, key}".to_string()),
    }
}

fn lower_entry(key: &str, arg: &Value) -> Condition {
    let parsed: Result<Condition, String> = match key {
        "file_exists" => string_list(arg, "file").map(Condition::FileExists),
        "file_contains" => match arg {
            Value::Mapping(map) => match (map_field(map, "file"), map_field(map, "pattern")) {
                (Some(file), Some(pattern)) => Ok(Condition::FileContains { file, pattern }),
                _ => Err("expected {file, pattern}".to_string()),
            },
            _ => Err("expected {file, pattern}".to_string()),
        },
        "file_has_script" => scalar_string(arg)
            .map(Condition::FileHasScript)
            .ok_or_else(|| "expected a script name".to_string()),
        "command_exists" => string_list(arg, "command").map(Condition::CommandExists),
        "os" => string_list(arg, "os").map(Condition::Os),
        "env_exists" => string_list(arg, "env").map(Condition::EnvExists),
        "env_not_exists" => string_list(arg, "env").map(Condition::EnvNotExists),
        "env_file_contains" => {
            env_file_args(arg).map(|(file, key)| Condition::EnvFileContains { file, key })
        }
        "env_file_missing" => {
            env_file_args(arg).map(|(file, key)| Condition::EnvFileMissing { file, key })
        }
        "context_var" => match arg {
            Value::Mapping(map) => match map_field(map, "key") {
                Some(key) => Ok(Condition::ContextVar {
                    key,
                    value: map_field(map, "value").unwrap_or_default(),
                }),
                None => Err("expected {key, value}".to_string()),
            },
            _ => Err("expected {key, value}".to_string()),
        },
        "not" => Ok(Condition::Not(Box::new(Condition::parse(arg)))),
        other => Ok(Condition::Unknown(other.to_string())),
    };
    parsed.unwrap_or_else(|reason| Condition::Invalid {
        key: key.to_string(),
        reason,
    })
}

impl Condition {
    /// Lower a YAML condition into a tree.
    pub fn parse(value: &Value) -> Condition {
        match value {
            Value::Null => Condition::Always,
            Value::Mapping(map) => {
                let mut parts = Vec::with_capacity(map.len());
                for (k, v) in map {
                    match k.as_str() {
                        Some(key) => parts.push(lower_entry(key, v)),
                        None => parts.push(Condition::Invalid {
                            key: format!("{:?}", k),
                            reason: "condition keys must be strings".to_string(),
                        }),
                    }
                }
                Condition::all(parts)
            }
            Value::Sequence(items) => Condition::all(items.iter().map(Condition::parse).collect()),
            Value::Tagged(tagged) => Condition::parse(&tagged.value),
            _ => Condition::Always,
        }
    }

    /// Optional YAML; absent means always true.
    pub fn from_option(value: Option<&Value>) -> Condition {
        value.map(Condition::parse).unwrap_or(Condition::Always)
    }

    fn all(mut parts: Vec<Condition>) -> Condition {
        match parts.len() {
            0 => Condition::Always,
            1 => parts.remove(0),
            _ => Condition::All(parts),
        }
    }

    pub fn evaluate(&self, ctx: &ScaffoldContext) -> bool {
        let root = ctx.worktree_path();
        match self {
            Condition::Always => true,
            Condition::All(parts) => parts.iter().all(|c| c.evaluate(ctx)),
            Condition::Not(inner) => !inner.evaluate(ctx),
            Condition::FileExists(files) => files.iter().all(|f| probe::file_exists(root, f)),
            Condition::FileContains { file, pattern } => probe::file_contains(root, file, pattern),
            Condition::FileHasScript(script) => probe::file_has_script(root, script),
            Condition::CommandExists(cmds) => cmds.iter().all(|c| probe::command_exists(c)),
            Condition::Os(names) => probe::os_matches(names),
            Condition::EnvExists(names) => names.iter().all(|n| probe::env_exists(n)),
            Condition::EnvNotExists(names) => !names.iter().all(|n| probe::env_exists(n)),
            Condition::EnvFileContains { file, key } => probe::env_file_contains(root, file, key),
            Condition::EnvFileMissing { file, key } => !probe::env_file_contains(root, file, key),
            Condition::ContextVar { key, value } => probe::context_var_equals(ctx, key, value),
            Condition::Unknown(key) => {
                debug!(key = %key, "ignoring unknown condition key");
                true
            }
            Condition::Invalid { key, reason } => {
                debug!(key = %key, reason = %reason, "malformed condition evaluates false");
                false
            }
        }
    }

    /// Depth-first, pre-order visit of every node, descending into `not`.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Condition)) {
        f(self);
        match self {
            Condition::All(parts) => {
                for p in parts {
                    p.walk(f);
                }
            }
            Condition::Not(inner) => inner.walk(f),
            _ => {}
        }
    }
}

/// Evaluate an optional YAML condition against the context.
pub fn evaluate_condition(value: Option<&Value>, ctx: &ScaffoldContext) -> bool {
    Condition::from_option(value).evaluate(ctx)
}
