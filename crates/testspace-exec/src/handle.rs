//! Streaming mode: a live child whose stdin the caller feeds.
//!
//! WARNING: call [`CommandHandle::wait`] once you are done writing. Dropping the
//! handle instead kills the child, so the work it had not finished is lost.

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;

use crate::context::ExecContext;
use crate::error::ExecError;
use crate::runner::{start, CommandSpec, ExecOutput, Running};

pub struct CommandHandle {
    running: Running,
    stdin: Option<ChildStdin>,
    stdin_enabled: bool,
    spec: CommandSpec,
    ctx: ExecContext,
}

impl std::fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandle")
            .field("program", &self.spec.get_program())
            .field("pid", &self.running.child.id())
            .field("stdin_open", &self.stdin.is_some())
            .finish()
    }
}

/// Spawn `spec` and return immediately with a live handle.
///
/// stdin is piped when `spec.stdin(true)` was set. stdout/stderr are drained in
/// the background and returned by `wait`.
pub async fn spawn(ctx: &ExecContext, spec: CommandSpec) -> Result<CommandHandle, ExecError> {
    if let Some(reason) = ctx.err() {
        return Err(ExecError::Canceled {
            reason,
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    let stdin_enabled = spec.stdin_enabled();
    let mut running = start(&spec, stdin_enabled)?;
    let stdin = running.child.stdin.take();
    Ok(CommandHandle {
        running,
        stdin,
        stdin_enabled,
        spec,
        ctx: ctx.clone(),
    })
}

impl CommandHandle {
    /// OS pid while the child has not been reaped.
    pub fn id(&self) -> Option<u32> {
        self.running.child.id()
    }

    /// Forward `data` to the child's stdin verbatim and flush.
    ///
    /// No framing is added: line-oriented consumers need the caller's `\n`.
    /// Blocks while the OS pipe is full. Fails with `ExecError::Stdin` once the
    /// child has exited and closed its end, and with `ExecError::Canceled` when
    /// the context finishes first (the child is left for `wait` to reap).
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ExecError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ExecError::StdinUnavailable);
        };
        if let Some(reason) = self.ctx.err() {
            return Err(ExecError::Canceled {
                reason,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        let ctx = &self.ctx;
        let written = async {
            stdin.write_all(data).await?;
            stdin.flush().await
        };
        tokio::select! {
            result = written => result.map_err(|source| ExecError::Stdin { source }),
            reason = ctx.done() => Err(ExecError::Canceled {
                reason,
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }

    /// Send EOF to the child. Later writes fail with `StdinUnavailable`.
    pub fn close_stdin(&mut self) {
        self.stdin.take();
    }

    pub fn stdin_enabled(&self) -> bool {
        self.stdin_enabled
    }

    /// Close stdin, reap the child, and return its output.
    ///
    /// Same outcomes as blocking execution: non-zero exit is `ExecError::Exit`,
    /// a finished context kills the process group and yields `ExecError::Canceled`.
    pub async fn wait(mut self) -> Result<ExecOutput, ExecError> {
        self.close_stdin();
        let Self {
            mut running,
            spec,
            ctx,
            ..
        } = self;

        if let Some(reason) = ctx.err() {
            return Err(running.abort(&spec, reason).await);
        }
        tokio::select! {
            status = running.child.wait() => {
                let status = status.map_err(|source| ExecError::Wait { source })?;
                running.finish(&spec, status, &ctx).await
            }
            reason = ctx.done() => Err(running.abort(&spec, reason).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelReason;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_lines_to_child() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = CommandSpec::shell("while read -r line; do echo \"got:$line\"; done")
            .current_dir(tmp.path())
            .stdin(true);
        let mut handle = spawn(&ExecContext::background(), spec).await.unwrap();
        handle.write(b"one\n").await.unwrap();
        handle.write(b"two\n").await.unwrap();
        let output = handle.wait().await.unwrap();
        assert_eq!(output.stdout, "got:one\ngot:two\n");
    }

    #[tokio::test]
    async fn test_each_line_takes_effect() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a"), "").unwrap();
        std::fs::write(tmp.path().join("b"), "").unwrap();
        let spec = CommandSpec::shell("while read -r op name; do [ \"$op\" = delete ] && rm \"$name\"; done")
            .current_dir(tmp.path())
            .stdin(true);
        let mut handle = spawn(&ExecContext::background(), spec).await.unwrap();
        handle.write(b"delete a\n").await.unwrap();
        handle.write(b"delete b\n").await.unwrap();
        handle.wait().await.unwrap();
        assert!(!tmp.path().join("a").exists());
        assert!(!tmp.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_write_without_stdin_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = CommandSpec::shell("true").current_dir(tmp.path());
        let mut handle = spawn(&ExecContext::background(), spec).await.unwrap();
        assert!(matches!(
            handle.write(b"x\n").await,
            Err(ExecError::StdinUnavailable)
        ));
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_after_exit_fails_without_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = CommandSpec::shell("exit 0").current_dir(tmp.path()).stdin(true);
        let mut handle = spawn(&ExecContext::background(), spec).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // The pipe may still accept a small write into its buffer; keep writing
        // until the broken pipe surfaces.
        let chunk = vec![b'x'; 64 * 1024];
        let mut result = Ok(());
        for _ in 0..16 {
            result = handle.write(&chunk).await;
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(ExecError::Stdin { .. })));
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_reports_non_zero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = CommandSpec::shell("read -r line; echo \"$line\" >&2; exit 4")
            .current_dir(tmp.path())
            .stdin(true);
        let mut handle = spawn(&ExecContext::background(), spec).await.unwrap();
        handle.write(b"bad input\n").await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.exit_code(), Some(4));
        assert_eq!(err.stderr(), Some("bad input\n"));
    }

    #[tokio::test]
    async fn test_cancel_unblocks_wait() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ExecContext::background();
        let spec = CommandSpec::shell("sleep 30").current_dir(tmp.path()).stdin(true);
        let handle = spawn(&ctx, spec).await.unwrap();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let waited = tokio::time::timeout(Duration::from_secs(10), handle.wait())
            .await
            .expect("wait must return after cancellation");
        assert_eq!(
            waited.unwrap_err().cancel_reason(),
            Some(CancelReason::Canceled)
        );
    }

    #[tokio::test]
    async fn test_cancel_unblocks_pending_write() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ExecContext::with_timeout(Duration::from_millis(300));
        // Never reads stdin, so the pipe fills and the write blocks.
        let spec = CommandSpec::shell("sleep 30").current_dir(tmp.path()).stdin(true);
        let mut handle = spawn(&ctx, spec).await.unwrap();

        let big = vec![b'x'; 4 * 1024 * 1024];
        let err = handle.write(&big).await.unwrap_err();
        assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert!(handle.wait().await.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn test_deadline_applies_after_shell_exits() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ExecContext::with_timeout(Duration::from_millis(300));
        let spec = CommandSpec::shell("sleep 30 & read -r line; echo \"$line\"")
            .current_dir(tmp.path())
            .stdin(true);
        let mut handle = spawn(&ctx, spec).await.unwrap();
        handle.write(b"done\n").await.unwrap();

        let started = std::time::Instant::now();
        let err = handle.wait().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(err.stdout(), Some("done\n"));
    }
}
