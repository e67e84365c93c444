//! Interactive confirmation for steps that may ask before destroying things.
use std::io::{BufRead, Write};

/// Flags that decide whether a step may ask the user anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptMode {
    pub interactive: bool,
    pub no_interactive: bool,
    pub force: bool,
    pub ci: bool,
}

impl PromptMode {
    /// Interactive unless stdin is not a TTY, `CI` is set, or the caller opted out.
    pub fn detect(no_interactive: bool, force: bool) -> Self {
        Self {
            interactive: atty::is(atty::Stream::Stdin),
            no_interactive,
            force,
            ci: std::env::var("CI")
                .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(false),
        }
    }

    pub fn allows_prompt(&self) -> bool {
        self.interactive && !self.no_interactive && !self.force && !self.ci
    }
}

pub trait Prompter: Send + Sync {
    /// Ask a yes/no question; anything but an explicit yes is a no.
    fn confirm(&self, message: &str) -> bool;
}

/// Reads the answer from stdin; refuses on non-interactive stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            return false;
        }
        let use_err = crate::color_enabled_stderr();
        eprint!("{}", crate::paint(use_err, "\x1b[33m", &format!("{} [y/N] ", message)));
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        is_yes(&line)
    }
}

/// Answers every question with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub bool);

impl Prompter for FixedPrompter {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
