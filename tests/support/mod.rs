/*!
Test support helpers shared across integration tests.

- MockDb / MockDbFactory: recording database client with scripted failures
- RecordingPrompter: answers confirmations and remembers the questions
- have_sh(): check for a POSIX shell on PATH
- write(dir, rel, content): seed a file, creating parents

Helpers do not print skip messages themselves so each test keeps its own
"skipping: ..." line.
*/
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use arbor::scaffold::db::{ConnectionOptions, DatabaseClient, DatabaseClientFactory, DbEngine};
use arbor::scaffold::prompt::Prompter;
use arbor::DbError;

/// One recorded call against the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbCall {
    Connect(DbEngine, ConnectionOptions),
    Ping,
    Create(String),
    List(String),
    Drop(String),
    Close,
}

#[derive(Default)]
struct MockState {
    calls: Vec<DbCall>,
    databases: Vec<String>,
    /// Scripted results for successive `create_database` calls; empty means success.
    create_script: VecDeque<CreateOutcome>,
    fail_drop: Vec<String>,
    ping_fails: bool,
    connect_fails: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum CreateOutcome {
    Exists,
    Fail,
}

/// Shared handle to an in-memory server; clones see the same state.
#[derive(Clone, Default)]
pub struct MockDb {
    state: Arc<Mutex<MockState>>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> Arc<dyn DatabaseClientFactory> {
        Arc::new(MockDbFactory { db: self.clone() })
    }

    fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut guard = self.state.lock().expect("mock db lock");
        f(&mut guard)
    }

    pub fn with_databases(self, names: &[&str]) -> Self {
        self.with(|s| s.databases.extend(names.iter().map(|n| n.to_string())));
        self
    }

    pub fn script_create(self, outcomes: &[CreateOutcome]) -> Self {
        self.with(|s| s.create_script.extend(outcomes.iter().copied()));
        self
    }

    pub fn fail_drop_of(self, name: &str) -> Self {
        self.with(|s| s.fail_drop.push(name.to_string()));
        self
    }

    pub fn unreachable(self) -> Self {
        self.with(|s| s.ping_fails = true);
        self
    }

    pub fn refuse_connect(self) -> Self {
        self.with(|s| s.connect_fails = true);
        self
    }

    pub fn calls(&self) -> Vec<DbCall> {
        self.with(|s| s.calls.clone())
    }

    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DbCall::Create(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn dropped(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DbCall::Drop(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn databases(&self) -> Vec<String> {
        self.with(|s| s.databases.clone())
    }
}

struct MockDbFactory {
    db: MockDb,
}

impl DatabaseClientFactory for MockDbFactory {
    fn connect(&self, engine: DbEngine, opts: &ConnectionOptions) -> Result<Box<dyn DatabaseClient>> {
        let refuse = self.db.with(|s| {
            s.calls.push(DbCall::Connect(engine, opts.clone()));
            s.connect_fails
        });
        if refuse {
            return Err(anyhow!("connection refused"));
        }
        Ok(Box::new(MockClient { db: self.db.clone() }))
    }
}

struct MockClient {
    db: MockDb,
}

/// Minimal LIKE matcher: `%` wildcard, `\` escapes the next character.
fn like_matches(pattern: &str, name: &str) -> bool {
    fn go(p: &[char], n: &[char]) -> bool {
        match p.first() {
            None => n.is_empty(),
            Some('%') => (0..=n.len()).any(|i| go(&p[1..], &n[i..])),
            Some('\\') if p.len() > 1 => n.first() == Some(&p[1]) && go(&p[2..], &n[1..]),
            Some('_') => !n.is_empty() && go(&p[1..], &n[1..]),
            Some(c) => n.first() == Some(c) && go(&p[1..], &n[1..]),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    go(&p, &n)
}

impl DatabaseClient for MockClient {
    fn ping(&mut self) -> Result<()> {
        let fails = self.db.with(|s| {
            s.calls.push(DbCall::Ping);
            s.ping_fails
        });
        if fails {
            return Err(anyhow!("server unreachable"));
        }
        Ok(())
    }

    fn create_database(&mut self, name: &str) -> Result<()> {
        self.db.with(|s| {
            s.calls.push(DbCall::Create(name.to_string()));
            match s.create_script.pop_front() {
                Some(CreateOutcome::Exists) => Err(DbError::Exists(name.to_string()).into()),
                Some(CreateOutcome::Fail) => Err(anyhow!("access denied for user")),
                None if s.databases.iter().any(|d| d == name) => {
                    Err(DbError::Exists(name.to_string()).into())
                }
                None => {
                    s.databases.push(name.to_string());
                    Ok(())
                }
            }
        })
    }

    fn list_databases(&mut self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.db.with(|s| {
            s.calls.push(DbCall::List(pattern.to_string()));
            s.databases
                .iter()
                .filter(|d| like_matches(pattern, d))
                .cloned()
                .collect()
        }))
    }

    fn drop_database(&mut self, name: &str) -> Result<()> {
        self.db.with(|s| {
            s.calls.push(DbCall::Drop(name.to_string()));
            if s.fail_drop.iter().any(|d| d == name) {
                return Err(anyhow!("drop refused"));
            }
            s.databases.retain(|d| d != name);
            Ok(())
        })
    }

    fn close(&mut self) -> Result<()> {
        self.db.with(|s| s.calls.push(DbCall::Close));
        Ok(())
    }
}

/// Answers every confirmation with `answer` and records the questions.
pub struct RecordingPrompter {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl RecordingPrompter {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("prompter lock").clone()
    }
}

impl Prompter for RecordingPrompter {
    fn confirm(&self, message: &str) -> bool {
        self.asked
            .lock()
            .expect("prompter lock")
            .push(message.to_string());
        self.answer
    }
}

/// Return true if `sh` is available on PATH.
pub fn have_sh() -> bool {
    which::which("sh").is_ok()
}

/// Write `content` to `dir/rel`, creating parent directories.
pub fn write(dir: &Path, rel: &str, content: &str) {
    let p = dir.join(rel);
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&p, content).expect("write file");
}

