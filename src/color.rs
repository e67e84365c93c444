#![allow(clippy::module_name_repetitions)]
//! Color mode configuration and ANSI painting helpers.
//!
//! Logging helpers policy (stderr one-liners):
//! - Use log_info_stderr for progress, log_warn_stderr for notes and
//!   log_error_stderr for failures.
//! - Precompute once per scope and reuse:
//!     let use_err = arbor::color_enabled_stderr();
//! - Diagnostic detail goes through `tracing`, not these helpers.

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn parse(s: &str) -> Option<ColorMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" | "on" | "true" | "yes" | "1" => Some(ColorMode::Always),
            "never" | "off" | "false" | "no" | "0" => Some(ColorMode::Never),
            _ => None,
        }
    }

    fn resolve(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_tty,
        }
    }
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Programmatic override (the `--color` flag); first call wins.
pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

fn color_enabled_for(is_tty: bool) -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Some(mode) = COLOR_MODE.get().copied() {
        return mode.resolve(is_tty);
    }
    std::env::var("ARBOR_COLOR")
        .ok()
        .and_then(|v| ColorMode::parse(&v))
        .unwrap_or(ColorMode::Auto)
        .resolve(is_tty)
}

pub fn color_enabled_stdout() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stdout))
}

pub fn color_enabled_stderr() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stderr))
}

/// Wrap string with ANSI color code when enabled; otherwise return unchanged.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[36;1m", msg));
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[33m", msg));
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[31;1m", msg));
}
