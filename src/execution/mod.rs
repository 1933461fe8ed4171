//! Execution unit: run one invocation as a child process and classify it.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::template::Invocation;

pub mod process;

pub use process::ProcessGroups;

/// Terminal classification of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process exited on its own, whatever its exit code.
    Completed {
        duration: Duration,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// The timeout elapsed first and the process tree was killed.
    TimedOut,
    /// The process could not be started or observed.
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Environment handed to every child process.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Snapshot of the current process environment.
    pub fn inherit() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value.into()));
        self
    }

    pub fn vars(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter().map(|(k, v)| (k, v))
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    env: Environment,
    groups: ProcessGroups,
}

impl ExecutionUnit {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            groups: ProcessGroups::default(),
        }
    }

    /// Groups of the children this unit (and its clones) currently run.
    pub fn groups(&self) -> ProcessGroups {
        self.groups.clone()
    }

    /// Run the invocation to completion, or until `timeout` elapses.
    ///
    /// Without a timeout this waits for the process to exit on its own.
    pub async fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> ExecutionOutcome {
        let Some((program, args)) = invocation.tokens().split_first() else {
            return ExecutionOutcome::Failed("empty invocation".to_string());
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .envs(self.env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        process::isolate(&mut command);

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(%invocation, error = %e, "spawn failed");
                return ExecutionOutcome::Failed(format!("failed to start {program:?}: {e}"));
            }
        };
        let pid = child.id();
        let group = pid.map(|pid| self.groups.register(pid));
        debug!(%invocation, ?pid, "spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = {
            let collect = async {
                tokio::join!(child.wait(), read_all(stdout), read_all(stderr))
            };
            match timeout {
                Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
                None => Some(collect.await),
            }
        };

        // Anything that would have arrived after the deadline is dropped with `collect`.
        let Some((status, stdout, stderr)) = finished else {
            warn!(%invocation, ?pid, "timeout elapsed, killing process tree");
            // The group id recorded at spawn, even if the leader was already reaped.
            if let Some(group) = &group {
                process::kill_tree(group.pgid());
            }
            let _ = child.kill().await;
            return ExecutionOutcome::TimedOut;
        };
        let duration = started.elapsed();

        let status = match status {
            Ok(status) => status,
            Err(e) => return ExecutionOutcome::Failed(format!("failed to wait for process: {e}")),
        };
        let (stdout, stderr) = match (stdout, stderr) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                return ExecutionOutcome::Failed(format!("failed to read process output: {e}"))
            }
        };

        ExecutionOutcome::Completed {
            duration,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
