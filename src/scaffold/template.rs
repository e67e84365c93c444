//! Step templates: `{{ .Name }}` placeholders rendered against a context snapshot.
//!
//! Dotted references are checked against the snapshot first so a typo fails
//! with the missing name. Each block is rewritten and rendered by minijinja in
//! strict mode, which also allows filters such as `{{ .SiteName | lower }}`.
//! Text outside `{{ }}` is never parsed.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use minijinja::{Environment, UndefinedBehavior};
use once_cell::sync::Lazy;
use regex::Regex;

use super::context::ScaffoldContext;

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("block regex should be valid"));
static DOT_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s(|,!])\.([A-Za-z_][A-Za-z0-9_]*)").expect("reference regex should be valid")
});

fn has_placeholder(s: &str) -> bool {
    s.contains("{{")
}

/// Names referenced as `.Name` inside `{{ }}` blocks, in order of appearance.
pub fn referenced_names(template: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for block in BLOCK_RE.captures_iter(template) {
        for r in DOT_REF_RE.captures_iter(&block[1]) {
            let name = r[2].to_string();
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

/// Render `template` against `vars`, failing on any undefined reference.
///
/// Only `{{ ... }}` blocks are evaluated, one at a time; everything between
/// them is copied verbatim so shell text such as `${#X}` or `{%` survives.
pub fn render_with(template: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    if !has_placeholder(template) {
        return Ok(template.to_string());
    }
    if let Some(missing) = referenced_names(template)
        .into_iter()
        .find(|n| !vars.contains_key(n))
    {
        return Err(anyhow!(
            "template references undefined variable '{}' in {:?}",
            missing,
            template
        ));
    }
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for block in BLOCK_RE.captures_iter(template) {
        let (Some(whole), Some(inner)) = (block.get(0), block.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        let expr = DOT_REF_RE.replace_all(inner.as_str(), "${1}${2}");
        let rendered = env
            .render_str(&format!("{{{{{}}}}}", expr), vars)
            .with_context(|| format!("failed to render template {:?}", template))?;
        out.push_str(&rendered);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Render against a fresh snapshot of the context.
pub fn render(template: &str, ctx: &ScaffoldContext) -> Result<String> {
    render_with(template, &ctx.snapshot_for_template())
}

/// Render every item, stopping at the first failure.
pub fn render_all(templates: &[String], ctx: &ScaffoldContext) -> Result<Vec<String>> {
    if !templates.iter().any(|t| has_placeholder(t)) {
        return Ok(templates.to_vec());
    }
    let snapshot = ctx.snapshot_for_template();
    templates.iter().map(|t| render_with(t, &snapshot)).collect()
}
