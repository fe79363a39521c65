//! Spawning agent binaries as process groups.

use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use thiserror::Error;
use tokio::process::{ChildStderr, ChildStdout, Command};

use crate::shell::{Platform, get_shell_command, needs_shell};

/// Variables that make an agent CLI believe it is running inside another
/// instance of itself. Always removed from the child environment.
pub const STRIPPED_ENV_VARS: [&str; 2] = ["CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT"];

/// Launch error.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Spawn failed for {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("Child process has no {0} pipe")]
    MissingPipe(&'static str),
}

/// What to run and where.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Agent binary to execute.
    pub binary: PathBuf,
    /// Arguments, including the full prompt.
    pub args: Vec<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
    /// Variables layered over the inherited environment.
    pub extra_env: HashMap<String, String>,
}

impl LaunchSpec {
    /// Create a spec with no arguments and no extra environment.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            extra_env: HashMap::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }

    /// Shell-quoted rendering of the invocation, for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        let binary = self.binary.to_string_lossy();
        let parts = std::iter::once(binary.as_ref()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts.clone()).unwrap_or_else(|_| parts.collect::<Vec<_>>().join(" "))
    }
}

/// A running agent process group.
pub struct ProcessGroup {
    child: AsyncGroupChild,
}

impl std::fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl ProcessGroup {
    /// OS process id of the group leader, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Ask the process group to terminate. Does not wait.
    ///
    /// # Errors
    /// Returns error if the signal cannot be delivered.
    pub fn request_termination(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use command_group::{Signal, UnixChildExt};
            self.child.signal(Signal::SIGTERM)
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()
        }
    }

    /// Wait for the group leader to exit.
    ///
    /// # Errors
    /// Returns error if the OS wait fails.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// A launched agent: process group plus its output channels.
///
/// The input channel is already closed.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub group: ProcessGroup,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawn the agent described by `spec`.
///
/// # Errors
/// Returns error if the OS refuses to start the process.
pub fn launch(spec: &LaunchSpec) -> Result<LaunchedProcess, LaunchError> {
    let mut command = build_command(spec, Platform::current());
    tracing::debug!(
        command = %spec.command_line(),
        cwd = %spec.cwd.display(),
        "Launching headless agent"
    );

    let mut child = command.group_spawn().map_err(|source| LaunchError::Spawn {
        binary: spec.binary.display().to_string(),
        source,
    })?;

    // One-shot: the prompt travels in the arguments.
    drop(child.inner().stdin.take());

    let pipes = child
        .inner()
        .stdout
        .take()
        .ok_or(LaunchError::MissingPipe("stdout"))
        .and_then(|stdout| {
            child
                .inner()
                .stderr
                .take()
                .map(|stderr| (stdout, stderr))
                .ok_or(LaunchError::MissingPipe("stderr"))
        });

    match pipes {
        Ok((stdout, stderr)) => Ok(LaunchedProcess {
            group: ProcessGroup { child },
            stdout,
            stderr,
        }),
        Err(e) => {
            let _ = child.start_kill();
            Err(e)
        }
    }
}

fn build_command(spec: &LaunchSpec, platform: Platform) -> Command {
    let mut command = if needs_shell(platform, &spec.binary) {
        let (shell, shell_arg) = get_shell_command(platform);
        let mut command = Command::new(shell);
        command.arg(shell_arg).arg(&spec.binary);
        command
    } else {
        Command::new(&spec.binary)
    };

    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .envs(&spec.extra_env);
    for var in STRIPPED_ENV_VARS {
        command.env_remove(var);
    }

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}
