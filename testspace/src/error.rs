use std::io;
use std::path::PathBuf;

use testspace_exec::{ExecError, ExecOutput};
use thiserror::Error;

/// Errors from workspace provisioning, execution and cleanup.
#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("cannot create workspace directory {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The initial script failed; the directory has already been removed.
    #[error("initial script failed in {}: {source}", .path.display())]
    Provision {
        path: PathBuf,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("command was expected to fail but exited successfully")]
    UnexpectedSuccess { output: Box<ExecOutput> },

    #[error("the workspace path is empty, please check and delete it manually")]
    InvalidPath,

    #[error("failed to remove workspace {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SpaceError {
    /// The execution failure underneath, if any.
    pub fn exec_error(&self) -> Option<&ExecError> {
        match self {
            Self::Provision { source, .. } => Some(source),
            Self::Exec(e) => Some(e),
            _ => None,
        }
    }

    /// Captured stdout of the failed run, for diagnostics.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::UnexpectedSuccess { output } => Some(&output.stdout),
            _ => self.exec_error().and_then(ExecError::stdout),
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::UnexpectedSuccess { output } => Some(&output.stderr),
            _ => self.exec_error().and_then(ExecError::stderr),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.exec_error().is_some_and(ExecError::is_cancellation)
    }
}
