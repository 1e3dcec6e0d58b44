use std::io;

use thiserror::Error;

use crate::context::CancelReason;
use crate::runner::ExecOutput;

/// Errors returned by the command runner.
///
/// `Exit` and `Canceled` still carry whatever output was captured so callers can
/// assert on it; `Spawn` means the process never started and carries none.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid environment entry '{entry}': expected KEY=VALUE")]
    InvalidEnv { entry: String },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("command exited with {}: {}", .output.status, .output.stderr.trim_end())]
    Exit { output: Box<ExecOutput> },

    #[error("{reason}")]
    Canceled {
        reason: CancelReason,
        stdout: String,
        stderr: String,
    },

    #[error("failed to wait for child process: {source}")]
    Wait {
        #[source]
        source: io::Error,
    },

    #[error("failed to write to child stdin: {source}")]
    Stdin {
        #[source]
        source: io::Error,
    },

    #[error("stdin was not enabled for this command")]
    StdinUnavailable,
}

impl ExecError {
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Exit { output } => Some(&output.stdout),
            Self::Canceled { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exit { output } => Some(&output.stderr),
            Self::Canceled { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Exit code of a child that ran to a non-zero exit. `None` for every other kind.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { output } => output.code(),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Canceled { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Recover the full output of a non-zero exit.
    pub fn into_output(self) -> Option<ExecOutput> {
        match self {
            Self::Exit { output } => Some(*output),
            _ => None,
        }
    }
}
