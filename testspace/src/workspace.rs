//! Workspace lifecycle: provision a directory, run scripts in it, remove it.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;

use testspace_core::config::SpaceConfig;
use testspace_core::path_validation::clamp_join;
use testspace_exec::env::validate_overlay;
use testspace_exec::{execute, spawn, CommandHandle, CommandSpec, ExecContext, ExecError, ExecOutput};

use crate::error::SpaceError;
use crate::git;
use crate::options::CreateOptions;

/// Which exit status [`Workspace::execute_expecting`] treats as the good outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Success,
    /// A non-zero exit is returned as `Ok`; exit 0 becomes `UnexpectedSuccess`.
    Failure,
    Any,
}

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    env: Vec<String>,
    template: String,
    last_script: String,
    last_stdout: String,
    last_stderr: String,
}

impl Workspace {
    /// Provision a workspace with no cancellation or deadline.
    pub async fn create(options: CreateOptions) -> Result<Self, SpaceError> {
        Self::create_with_context(&ExecContext::background(), options).await
    }

    /// Provision a workspace. `ctx` bounds the git init and the initial script.
    ///
    /// An existing directory is reused. If the initial script fails,
    /// `SpaceError::Provision` carries the captured output and a directory
    /// created by this call is removed again; a reused one is left as it is.
    pub async fn create_with_context(
        ctx: &ExecContext,
        options: CreateOptions,
    ) -> Result<Self, SpaceError> {
        Self::provision(ctx, options, &SpaceConfig::from_env()).await
    }

    pub(crate) async fn provision(
        ctx: &ExecContext,
        options: CreateOptions,
        cfg: &SpaceConfig,
    ) -> Result<Self, SpaceError> {
        let opts = options.resolve(cfg)?;
        validate_overlay(&opts.environments)?;

        let existed = tokio::fs::try_exists(&opts.path).await.unwrap_or(false);
        tokio::fs::create_dir_all(&opts.path)
            .await
            .map_err(|source| SpaceError::Config {
                path: opts.path.clone(),
                source,
            })?;

        let mut space = Workspace {
            path: opts.path,
            env: opts.environments,
            template: opts.template,
            last_script: String::new(),
            last_stdout: String::new(),
            last_stderr: String::new(),
        };

        if opts.init_vcs {
            space.init_vcs(ctx, cfg.vcs_init_timeout).await;
        }

        match space.execute(ctx, &opts.shell).await {
            Ok(_) => {
                testspace_exec::info_log!(path = %space.path.display(), "workspace ready");
                Ok(space)
            }
            Err(err) => {
                if existed {
                    tracing::warn!(
                        path = %space.path.display(),
                        "initial script failed in a directory that already existed, leaving it in place"
                    );
                } else if let Err(e) = space.cleanup() {
                    tracing::warn!(error = %e, "failed to remove workspace after provisioning error");
                }
                match err {
                    SpaceError::Exec(source) => Err(SpaceError::Provision {
                        path: space.path.clone(),
                        source,
                    }),
                    other => Err(other),
                }
            }
        }
    }

    async fn init_vcs(&self, ctx: &ExecContext, timeout: Duration) {
        if !git::git_available() {
            tracing::warn!(
                path = %self.path.display(),
                "git not found on PATH, workspace is not a repository"
            );
            return;
        }
        if let Err(e) = git::init_repository(ctx, &self.path, &self.env, timeout).await {
            tracing::warn!(path = %self.path.display(), error = %e, "git init failed, continuing without a repository");
        }
    }

    /// Remove the workspace directory tree. Succeeds when it is already gone.
    pub fn cleanup(&self) -> Result<(), SpaceError> {
        if self.path.as_os_str().is_empty() {
            return Err(SpaceError::InvalidPath);
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                testspace_exec::info_log!(path = %self.path.display(), "workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SpaceError::Cleanup {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `subdir` joined onto the workspace path. `..` segments never climb
    /// above the workspace root and absolute inputs are treated as relative.
    pub fn get_path(&self, subdir: &str) -> PathBuf {
        clamp_join(&self.path, subdir)
    }

    /// Environment overlay in the order it is applied.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Composed text (template + script) of the most recent blocking run.
    pub fn last_script(&self) -> &str {
        &self.last_script
    }

    pub fn last_stdout(&self) -> &str {
        &self.last_stdout
    }

    pub fn last_stderr(&self) -> &str {
        &self.last_stderr
    }

    /// Run `script` to completion. A non-zero exit is `SpaceError::Exec`
    /// wrapping `ExecError::Exit`, with the captured streams attached.
    pub async fn execute(
        &mut self,
        ctx: &ExecContext,
        script: &str,
    ) -> Result<ExecOutput, SpaceError> {
        self.execute_expecting(ctx, script, Expect::Success).await
    }

    /// Run `script` and judge the exit status against `expect`.
    ///
    /// Spawn failures and cancellation are errors regardless of `expect`.
    pub async fn execute_expecting(
        &mut self,
        ctx: &ExecContext,
        script: &str,
        expect: Expect,
    ) -> Result<ExecOutput, SpaceError> {
        let composed = self.compose(script);
        let result = execute(ctx, &self.command(&composed)).await;

        self.last_script = composed;
        match &result {
            Ok(output) => self.record(&output.stdout, &output.stderr),
            Err(e) => self.record(
                e.stdout().unwrap_or_default(),
                e.stderr().unwrap_or_default(),
            ),
        }

        match (result, expect) {
            (Ok(output), Expect::Success | Expect::Any) => Ok(output),
            (Ok(output), Expect::Failure) => Err(SpaceError::UnexpectedSuccess {
                output: Box::new(output),
            }),
            (Err(ExecError::Exit { output }), Expect::Failure | Expect::Any) => Ok(*output),
            (Err(e), _) => Err(e.into()),
        }
    }

    /// Start `script` with stdin piped and return the live handle.
    ///
    /// Write to it, then call `wait`. The last-run fields are not updated.
    pub async fn execute_with_stdin(
        &self,
        ctx: &ExecContext,
        script: &str,
    ) -> Result<CommandHandle, SpaceError> {
        let spec = self.command(&self.compose(script)).stdin(true);
        Ok(spawn(ctx, spec).await?)
    }

    /// Remove the directory when the returned guard is dropped.
    pub fn into_guard(self) -> SpaceGuard {
        SpaceGuard { space: self }
    }

    fn compose(&self, script: &str) -> String {
        format!("{}\n{}", self.template, script)
    }

    fn command(&self, script: &str) -> CommandSpec {
        CommandSpec::shell(script)
            .current_dir(&self.path)
            .env(self.env.iter().cloned())
    }

    fn record(&mut self, stdout: &str, stderr: &str) {
        self.last_stdout = stdout.to_string();
        self.last_stderr = stderr.to_string();
    }
}

/// Owns a [`Workspace`] and removes its directory on drop.
#[derive(Debug)]
pub struct SpaceGuard {
    space: Workspace,
}

impl Deref for SpaceGuard {
    type Target = Workspace;

    fn deref(&self) -> &Workspace {
        &self.space
    }
}

impl DerefMut for SpaceGuard {
    fn deref_mut(&mut self) -> &mut Workspace {
        &mut self.space
    }
}

impl Drop for SpaceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.space.cleanup() {
            tracing::warn!(error = %e, "workspace cleanup on drop failed");
        }
    }
}
