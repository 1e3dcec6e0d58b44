//! git plumbing for workspaces: repository init during provisioning and the
//! deterministic fixture preset behind `CreateOptions::git_defaults`.

use std::path::Path;
use std::time::Duration;

use testspace_exec::{execute, CommandSpec, ExecContext, ExecError};

/// `test_tick` advances a fake clock by 60s per call and exports it as the
/// author and committer date, so commit ids are stable across runs. Same
/// convention as git's own test suite.
pub const TEST_TICK_TEMPLATE: &str = r#"test_tick () {
	if test -z "${test_tick+set}"
	then
		test_tick=1112911993
	else
		test_tick=$(($test_tick + 60))
	fi
	GIT_COMMITTER_DATE="$test_tick -0700"
	GIT_AUTHOR_DATE="$test_tick -0700"
	export GIT_COMMITTER_DATE GIT_AUTHOR_DATE
}"#;

/// Fixed identity, no system config, `master` as the initial branch.
pub fn fixture_env() -> Vec<String> {
    [
        "GIT_AUTHOR_NAME=A U Thor",
        "GIT_AUTHOR_EMAIL=author@example.com",
        "GIT_COMMITTER_NAME=C O Mitter",
        "GIT_COMMITTER_EMAIL=committer@example.com",
        "GIT_CONFIG_NOSYSTEM=1",
        "GIT_CONFIG_COUNT=1",
        "GIT_CONFIG_KEY_0=init.defaultBranch",
        "GIT_CONFIG_VALUE_0=master",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// `git init .` in `path`, so stray writes into a real checkout get noticed by git.
pub(crate) async fn init_repository(
    ctx: &ExecContext,
    path: &Path,
    env: &[String],
    timeout: Duration,
) -> Result<(), ExecError> {
    let spec = CommandSpec::new("git")
        .args(["init", "."])
        .current_dir(path)
        .env(env.iter().cloned());
    execute(&ctx.timeout(timeout), &spec).await.map(|_| ())
}
