//! Workspace construction options.
//!
//! Builder calls apply in order. Scalar settings (path, template, initial
//! script, VCS init) are last-write-wins; environment entries accumulate.

use std::path::{Path, PathBuf};

use testspace_core::config::SpaceConfig;

use crate::error::SpaceError;
use crate::git;

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    path: Option<PathBuf>,
    environments: Vec<String>,
    template: String,
    shell: String,
    caller: Option<PathBuf>,
    init_vcs: Option<bool>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace directory. Relative paths are resolved against the current directory.
    /// Default: `<TESTSPACE_ROOT or temp dir>/testspace-<uuid>`.
    ///
    /// An existing directory is reused as is. Provisioning never deletes it,
    /// even when the initial script fails, but an explicit `Workspace::cleanup`
    /// (or a `SpaceGuard` going out of scope) removes it recursively.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Append `KEY=VALUE` entries to the environment overlay.
    pub fn env<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Replace the template prepended to every script.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Add to the template, newline-separated from what is already there.
    pub fn append_template(mut self, snippet: impl AsRef<str>) -> Self {
        if !self.template.is_empty() && !self.template.ends_with('\n') {
            self.template.push('\n');
        }
        self.template.push_str(snippet.as_ref());
        self
    }

    /// Script run once while the workspace is provisioned.
    pub fn shell(mut self, script: impl Into<String>) -> Self {
        self.shell = script.into();
        self
    }

    /// Record the file that builds this fixture. Scripts see it as `$CALLER`
    /// and its directory as `$CALLER_DIR`, e.g. to copy fixture files that sit
    /// next to the test: `.caller(file!())` or an absolute path.
    pub fn caller(mut self, file: impl AsRef<Path>) -> Self {
        self.caller = Some(file.as_ref().to_path_buf());
        self
    }

    /// Override `TESTSPACE_INIT_VCS` for this workspace.
    pub fn init_vcs(mut self, enabled: bool) -> Self {
        self.init_vcs = Some(enabled);
        self
    }

    /// Deterministic git fixture preset: a `test_tick` helper in the template
    /// plus fixed author/committer identity and `master` as the initial branch.
    pub fn git_defaults(self) -> Self {
        self.append_template(git::TEST_TICK_TEMPLATE)
            .env(git::fixture_env())
    }

    pub(crate) fn resolve(self, cfg: &SpaceConfig) -> Result<ResolvedOptions, SpaceError> {
        let path = match self.path {
            Some(p) if p.is_absolute() => p,
            Some(p) => std::env::current_dir()
                .map(|cwd| cwd.join(&p))
                .map_err(|source| SpaceError::Config { path: p, source })?,
            None => cfg
                .root
                .join(format!("testspace-{}", uuid::Uuid::new_v4().simple())),
        };

        let mut environments = self.environments;
        if let Some(caller) = self.caller {
            environments.push(format!("CALLER={}", caller.display()));
            let dir = caller.parent().map(Path::to_path_buf).unwrap_or_default();
            environments.push(format!("CALLER_DIR={}", dir.display()));
        }

        Ok(ResolvedOptions {
            path,
            environments,
            template: self.template,
            shell: self.shell,
            init_vcs: self.init_vcs.unwrap_or(cfg.init_vcs),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub path: PathBuf,
    pub environments: Vec<String>,
    pub template: String,
    pub shell: String,
    pub init_vcs: bool,
}
