//! testspace: disposable shell workspaces for fixture-driven tests.
//!
//! A [`Workspace`] is a fresh directory (optionally `git init`-ed) plus an
//! environment overlay and a script template. Every script runs through
//! `/bin/sh -c` with the template prepended, and stdout/stderr come back as
//! strings for assertions.
//!
//! ```no_run
//! # async fn demo() -> Result<(), testspace::SpaceError> {
//! use testspace::{CreateOptions, ExecContext, Workspace};
//!
//! let ctx = ExecContext::background();
//! let mut space = Workspace::create(
//!     CreateOptions::new()
//!         .git_defaults()
//!         .shell("test_tick && git commit --allow-empty -m init"),
//! )
//! .await?;
//! let out = space.execute(&ctx, "git log --format=%s").await?;
//! assert_eq!(out.stdout, "init\n");
//! space.cleanup()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod git;
pub mod options;
pub mod workspace;

pub use error::SpaceError;
pub use options::CreateOptions;
pub use workspace::{Expect, SpaceGuard, Workspace};

pub use testspace_core::observability::init_tracing;
pub use testspace_exec::{
    CancelReason, CommandHandle, CommandSpec, ExecContext, ExecError, ExecOutput,
};
