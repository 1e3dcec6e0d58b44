//! Shared process plumbing for the blocking and streaming paths.
//!
//! stdout/stderr are drained by background tasks *while* the child runs.
//! Reading only after exit would deadlock once the child fills a pipe buffer
//! (~64KB) and blocks on write.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

/// How long pipe readers may keep running after the child was killed.
/// A grandchild that escaped the process group can hold the pipe open forever.
pub const KILL_GRACE_MS: u64 = 500;

/// Read buffer size for stream drains
pub const READ_CHUNK: usize = 8192;

/// One child stream being read into memory on a background task.
///
/// `join` can be interrupted (e.g. raced against a context) and called again
/// later without losing what the reader has gathered.
#[derive(Debug)]
pub struct Drain {
    handle: Option<JoinHandle<Vec<u8>>>,
    bytes: Vec<u8>,
}

impl Drain {
    pub fn spawn<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let handle = stream.map(|mut s| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = vec![0u8; READ_CHUNK];
                loop {
                    match s.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::debug!(error = %e, read = buf.len(), "pipe read failed, keeping partial output");
                            break;
                        }
                    }
                }
                buf
            })
        });
        Self {
            handle,
            bytes: Vec::new(),
        }
    }

    /// Wait until the reader hits EOF.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            let joined = handle.await;
            self.handle = None;
            match joined {
                Ok(bytes) => self.bytes = bytes,
                Err(e) => tracing::debug!(error = %e, "pipe reader task failed"),
            }
        }
    }

    /// `join` bounded by `grace`. A reader that overruns is aborted and its output is lost.
    pub async fn join_within(&mut self, grace: Duration) {
        if tokio::time::timeout(grace, self.join()).await.is_err() {
            if let Some(handle) = self.handle.take() {
                handle.abort();
            }
            tracing::debug!(grace_ms = grace.as_millis() as u64, "pipe still open after kill, dropping reader");
        }
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Process group id of a freshly spawned child. Children are spawned as group
/// leaders (see `runner::CommandSpec::build`), so this is their pid. Capture it
/// before reaping: `Child::id` is `None` afterwards.
pub fn group_of(child: &Child) -> Option<i32> {
    child.id().and_then(|pid| i32::try_from(pid).ok())
}

/// SIGKILL every process in group `pgid`. Reaches pipelines, subshells and
/// background jobs started by the script, even after the leader has exited.
pub fn kill_group(pgid: Option<i32>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Some(pgid) = pgid {
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::debug!(pgid, error = %e, "killpg failed");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Kill the child's group, then the child itself in case it left the group.
pub fn terminate(pgid: Option<i32>, child: &mut Child) {
    kill_group(pgid);
    if let Err(e) = child.start_kill() {
        tracing::debug!(pid = ?child.id(), error = %e, "start_kill failed");
    }
}
