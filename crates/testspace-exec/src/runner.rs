use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use testspace_core::observability;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::common::{group_of, kill_group, terminate, Drain, KILL_GRACE_MS};
use crate::context::{CancelReason, ExecContext};
use crate::env::apply_overlay;
use crate::error::ExecError;

/// Interpreter for every workspace script, always invoked as `SHELL -c <script>`.
pub const SHELL: &str = "/bin/sh";

/// Captured result of a child that ran to completion
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
    pub duration: Duration,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// `None` when the child was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// What to run, where, and with which environment overlay.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    env: Vec<String>,
    stdin: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
            stdin: false,
        }
    }

    /// `/bin/sh -c <script>`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new(SHELL).arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append `KEY=VALUE` overlay entries.
    pub fn env<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Leave stdin open as a pipe. Only honored by the streaming path.
    pub fn stdin(mut self, enabled: bool) -> Self {
        self.stdin = enabled;
        self
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn get_env(&self) -> &[String] {
        &self.env
    }

    pub fn stdin_enabled(&self) -> bool {
        self.stdin
    }

    fn build(&self, stdin: bool) -> Result<Command, ExecError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.dir {
            cmd.current_dir(dir);
        }
        apply_overlay(&mut cmd, &self.env)?;

        cmd.stdin(if stdin { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Own process group, so cancellation can take down the whole pipeline.
        #[cfg(unix)]
        cmd.process_group(0);

        Ok(cmd)
    }

    fn cwd_display(&self) -> String {
        self.dir
            .as_ref()
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// A spawned child with its drain tasks attached.
pub(crate) struct Running {
    pub child: Child,
    pub pgid: Option<i32>,
    pub stdout: Drain,
    pub stderr: Drain,
    pub started: Instant,
}

pub(crate) fn start(spec: &CommandSpec, stdin: bool) -> Result<Running, ExecError> {
    let mut cmd = spec.build(stdin)?;

    let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
    observability::audit_execution_started(&spec.program, &args, &spec.cwd_display());

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    let pgid = group_of(&child);
    tracing::debug!(
        program = %spec.program,
        cwd = %spec.cwd_display(),
        pid = ?child.id(),
        stdin,
        "spawned child process"
    );

    let stdout = Drain::spawn::<ChildStdout>(child.stdout.take());
    let stderr = Drain::spawn::<ChildStderr>(child.stderr.take());
    Ok(Running {
        child,
        pgid,
        stdout,
        stderr,
        started,
    })
}

impl Running {
    /// The shell exited: gather the streams and classify the exit status.
    ///
    /// Background jobs the script left behind keep the pipes open, so the
    /// gathering still observes `ctx`. If it finishes first the whole group is
    /// killed and the run counts as canceled.
    pub(crate) async fn finish(
        mut self,
        spec: &CommandSpec,
        status: ExitStatus,
        ctx: &ExecContext,
    ) -> Result<ExecOutput, ExecError> {
        let interrupted = {
            let streams = async {
                self.stdout.join().await;
                self.stderr.join().await;
            };
            tokio::select! {
                biased;
                _ = streams => None,
                reason = ctx.done() => Some(reason),
            }
        };
        if let Some(reason) = interrupted {
            tracing::debug!(
                program = %spec.program,
                exit_code = ?status.code(),
                "shell exited but its pipes are still open"
            );
            kill_group(self.pgid);
            return Err(self.canceled(spec, reason, Some(status)).await);
        }

        let output = ExecOutput {
            stdout: self.stdout.into_string(),
            stderr: self.stderr.into_string(),
            status,
            duration: self.started.elapsed(),
        };

        tracing::debug!(
            program = %spec.program,
            exit_code = ?output.code(),
            duration_ms = output.duration.as_millis() as u64,
            "child process finished"
        );
        observability::audit_execution_completed(
            &spec.program,
            output.code(),
            output.duration.as_millis() as u64,
            output.stdout.len(),
        );

        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::Exit {
                output: Box::new(output),
            })
        }
    }

    /// Context is done while the shell runs: kill the group, reap, and keep
    /// whatever output made it out.
    pub(crate) async fn abort(mut self, spec: &CommandSpec, reason: CancelReason) -> ExecError {
        terminate(self.pgid, &mut self.child);
        let status = self.child.wait().await.ok();
        self.canceled(spec, reason, status).await
    }

    async fn canceled(
        mut self,
        spec: &CommandSpec,
        reason: CancelReason,
        status: Option<ExitStatus>,
    ) -> ExecError {
        let grace = Duration::from_millis(KILL_GRACE_MS);
        self.stdout.join_within(grace).await;
        self.stderr.join_within(grace).await;

        let stdout = self.stdout.into_string();
        tracing::debug!(
            program = %spec.program,
            reason = %reason,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "child process terminated"
        );
        observability::audit_execution_completed(
            &spec.program,
            status.and_then(|s| s.code()),
            self.started.elapsed().as_millis() as u64,
            stdout.len(),
        );

        ExecError::Canceled {
            reason,
            stdout,
            stderr: self.stderr.into_string(),
        }
    }
}

/// Blocking mode: run `spec` to completion and return its captured output.
///
/// A non-zero exit is `ExecError::Exit` with the full output attached. If `ctx`
/// is already done nothing is spawned; if it finishes while the child runs, the
/// child's process group is killed and `ExecError::Canceled` is returned.
pub async fn execute(ctx: &ExecContext, spec: &CommandSpec) -> Result<ExecOutput, ExecError> {
    if let Some(reason) = ctx.err() {
        return Err(ExecError::Canceled {
            reason,
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    let mut running = start(spec, false)?;
    tokio::select! {
        status = running.child.wait() => {
            let status = status.map_err(|source| ExecError::Wait { source })?;
            running.finish(spec, status, ctx).await
        }
        reason = ctx.done() => Err(running.abort(spec, reason).await),
    }
}
