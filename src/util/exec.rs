use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

use crate::errors::CommandError;

/// Structured command execution with optional timeouts.
///
/// A zero timeout waits indefinitely; scaffold steps run that way.
#[derive(Debug, Clone)]
pub struct ExecService {
    default_timeout: Duration,
}

impl ExecService {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args);
        if let Some(ref cwd) = request.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        if request.inherits_stdin() {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }
        if request.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let display = request.display();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", display))?;

        // Drain both pipes while the child runs so a chatty process cannot block on a full pipe.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let timeout = self.default_timeout;
        let started = Instant::now();
        let status = if timeout.is_zero() {
            child.wait().context("failed to wait for process")?
        } else {
            match child
                .wait_timeout(timeout)
                .context("failed to wait with timeout")?
            {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(anyhow!("command `{}` timed out after {:?}", display, timeout));
                }
            }
        };

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;
        Ok(ExecOutput {
            display,
            status,
            duration: started.elapsed(),
            stdout,
            stderr,
        })
    }

    /// Run and turn a non-zero exit into a `CommandError` carrying the captured output.
    pub fn run_checked(&self, request: ExecRequest) -> Result<ExecOutput> {
        let out = self.run(request)?;
        if out.status.success() {
            Ok(out)
        } else {
            Err(out.into_error().into())
        }
    }
}

fn spawn_reader<R: io::Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn join_reader(handle: Option<thread::JoinHandle<io::Result<String>>>) -> Result<String> {
    match handle {
        None => Ok(String::new()),
        Some(h) => h
            .join()
            .map_err(|_| anyhow!("output reader thread panicked"))?
            .context("failed to read process output"),
    }
}

impl Default for ExecService {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[derive(Debug, Default)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    capture_output: bool,
}

impl ExecRequest {
    /// New request; the child inherits the parent environment plus any `env` pairs.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// `<shell> -c <script>`, preferring bash when `bash` is true and available.
    pub fn shell(script: &str, bash: bool) -> Self {
        if cfg!(windows) {
            return Self::new("cmd").arg("/C").arg(script);
        }
        let shell = if bash && which::which("bash").is_ok() {
            "bash"
        } else {
            "sh"
        };
        Self::new(shell).arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// An uncaptured child talks to the terminal, stdin included, so tools
    /// that prompt (`composer`, `npm init`) can be answered. A captured child
    /// reads from `/dev/null`.
    pub fn inherits_stdin(&self) -> bool {
        !self.capture_output
    }

    /// Shell-quoted rendering used in logs and errors.
    pub fn display(&self) -> String {
        let mut words = vec![self.program.to_string_lossy().into_owned()];
        words.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        super::shell_join(&words)
    }
}

#[derive(Debug)]
pub struct ExecOutput {
    pub display: String,
    pub status: ExitStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut s = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !s.is_empty() && !s.ends_with('\n') {
                s.push('\n');
            }
            s.push_str(&self.stderr);
        }
        s
    }

    pub fn into_error(self) -> CommandError {
        CommandError {
            output: self.combined(),
            command: self.display,
            status: self.status.code(),
        }
    }
}
