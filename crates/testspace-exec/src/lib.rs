//! Command runner for testspace workspaces.
//!
//! Two modes over one spawn primitive: [`execute`] runs a command to completion
//! and returns its captured output; [`spawn`] returns a live [`CommandHandle`]
//! whose stdin the caller writes to before calling [`CommandHandle::wait`].
//! Both observe an [`ExecContext`] for cancellation and deadlines.

pub mod common;
pub mod context;
pub mod env;
pub mod error;
pub mod handle;
pub mod log;
pub mod runner;

pub use context::{CancelReason, ExecContext};
pub use error::ExecError;
pub use handle::{spawn, CommandHandle};
pub use runner::{execute, CommandSpec, ExecOutput, SHELL};
