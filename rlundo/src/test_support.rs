//! Test-only helpers: scripted engine seams and a host-process runner.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use nix::errno::Errno;
use nix::unistd::Pid;
use wait_timeout::ChildExt;

use crate::core::signal::ExitSignal;
use crate::error::CheckpointError;
use crate::io::process::{Branch, ProcessControl};
use crate::io::reader::LineReader;

/// Reader that returns queued lines, then end of input.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    lines: VecDeque<String>,
    reads: usize,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            reads: 0,
        }
    }

    /// Number of `read_line` calls so far, including the end-of-input one.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl LineReader for ScriptedReader {
    type Line = String;

    fn read_line(&mut self) -> Result<Option<String>, CheckpointError> {
        self.reads += 1;
        Ok(self.lines.pop_front())
    }
}

/// Process control that follows a script instead of forking.
///
/// Each `fork` pops the next [`Branch`] (defaulting to `Child`); each `wait`
/// pops the next [`ExitSignal`] (defaulting to `CleanExit`). Queued errors take
/// precedence over the scripted results.
#[derive(Debug)]
pub struct ScriptedProcess {
    pid: u32,
    branches: VecDeque<Branch>,
    signals: VecDeque<ExitSignal>,
    fork_error: Option<Errno>,
    wait_error: Option<Errno>,
    emit_error: Option<io::ErrorKind>,
    pub forks: usize,
    pub waits: Vec<Pid>,
    pub emitted: Vec<String>,
}

impl ScriptedProcess {
    pub fn new() -> Self {
        Self {
            pid: 100,
            branches: VecDeque::new(),
            signals: VecDeque::new(),
            fork_error: None,
            wait_error: None,
            emit_error: None,
            forks: 0,
            waits: Vec::new(),
            emitted: Vec::new(),
        }
    }

    /// Queue fork branches.
    pub fn with_branches(mut self, branches: impl IntoIterator<Item = Branch>) -> Self {
        self.branches.extend(branches);
        self
    }

    /// Queue exit signals observed by `wait`.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = ExitSignal>) -> Self {
        self.signals.extend(signals);
        self
    }

    /// Make the next `fork` fail with `errno`.
    pub fn with_fork_error(mut self, errno: Errno) -> Self {
        self.fork_error = Some(errno);
        self
    }

    /// Make the next `wait` fail with `errno`.
    pub fn with_wait_error(mut self, errno: Errno) -> Self {
        self.wait_error = Some(errno);
        self
    }

    /// Make the next `emit` fail with an I/O error of `kind`.
    pub fn with_emit_error(mut self, kind: io::ErrorKind) -> Self {
        self.emit_error = Some(kind);
        self
    }
}

impl Default for ScriptedProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for ScriptedProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn fork(&mut self) -> Result<Branch, CheckpointError> {
        self.forks += 1;
        if let Some(errno) = self.fork_error.take() {
            return Err(CheckpointError::Fork(errno));
        }
        let branch = self.branches.pop_front().unwrap_or(Branch::Child);
        if branch == Branch::Child {
            self.pid += 1;
        }
        Ok(branch)
    }

    fn wait(&mut self, child: Pid) -> Result<ExitSignal, CheckpointError> {
        self.waits.push(child);
        if let Some(source) = self.wait_error.take() {
            return Err(CheckpointError::Wait {
                pid: child.as_raw(),
                source,
            });
        }
        Ok(self.signals.pop_front().unwrap_or(ExitSignal::CleanExit))
    }

    fn emit(&mut self, text: &str) -> Result<(), CheckpointError> {
        if let Some(kind) = self.emit_error.take() {
            return Err(CheckpointError::Output(io::Error::from(kind)));
        }
        self.emitted.push(text.to_string());
        Ok(())
    }
}

/// Captured result of running a host binary to completion.
#[derive(Debug)]
pub struct HostRun {
    pub code: Option<i32>,
    /// Lossy UTF-8 view of `stdout_bytes`.
    pub stdout: String,
    pub stdout_bytes: Vec<u8>,
    pub stderr: String,
}

/// Run `binary` with `input` on stdin and the given extra environment.
///
/// Fails if the whole process tree has not exited within `timeout`.
pub fn run_host(
    binary: &Path,
    args: &[&str],
    input: impl AsRef<[u8]>,
    env: &[(&str, &str)],
    timeout: Duration,
) -> Result<HostRun> {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove(crate::io::config::ENV_CONFIG)
        .env_remove(crate::io::config::ENV_ROOT_UNDO);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", binary.display()))?;
    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        stdin.write_all(input.as_ref()).context("write stdin")?;
    }

    let status = match child.wait_timeout(timeout).context("wait for host")? {
        Some(status) => status,
        None => {
            child.kill().context("kill host")?;
            child.wait().context("wait host after kill")?;
            bail!("host {} timed out", binary.display());
        }
    };

    let mut stdout_bytes = Vec::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout_bytes).context("read stdout")?;
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_string(&mut stderr).context("read stderr")?;
    }

    Ok(HostRun {
        code: status.code(),
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stdout_bytes,
        stderr,
    })
}
