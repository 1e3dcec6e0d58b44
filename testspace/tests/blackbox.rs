//! End-to-end tests through the public API only.
//!
//! Every workspace lives under a per-test temp dir so nothing leaks into the
//! real TESTSPACE_ROOT. git scenarios are skipped when git is not installed.

use std::time::Duration;

use testspace::{CreateOptions, ExecContext, Expect, SpaceError, Workspace};

fn in_tmp(tmp: &tempfile::TempDir) -> CreateOptions {
    CreateOptions::new().path(tmp.path().join("space"))
}

fn have_git() -> bool {
    if testspace::git::git_available() {
        return true;
    }
    eprintln!("git not installed, skipping");
    false
}

// =============================================================================
// Basic scripts
// =============================================================================

mod basics {
    use super::*;

    #[tokio::test]
    async fn test_printf_hello() {
        let tmp = tempfile::tempdir().unwrap();
        let space = Workspace::create(in_tmp(&tmp).init_vcs(false).shell("printf \"hello\""))
            .await
            .expect("create workspace");
        assert_eq!(space.last_stdout(), "hello");
        space.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_environment_overlay() {
        let tmp = tempfile::tempdir().unwrap();
        let space = Workspace::create(
            in_tmp(&tmp)
                .init_vcs(false)
                .env(["Testing1=aa", "Testing2=bb"])
                .shell("printf \"%s, %s\" $Testing1 $Testing2"),
        )
        .await
        .expect("create workspace");
        assert_eq!(space.last_stdout(), "aa, bb");
        space.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_template_function() {
        let tmp = tempfile::tempdir().unwrap();
        let space = Workspace::create(
            in_tmp(&tmp)
                .init_vcs(false)
                .template("\ntest(){\n\tprintf \"this is a test from test method\"\n}\n")
                .shell("test"),
        )
        .await
        .expect("create workspace");
        assert_eq!(space.last_stdout(), "this is a test from test method");
        space.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_custom_path() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("testing_folder");
        let space = Workspace::create(CreateOptions::new().path(&target).init_vcs(false))
            .await
            .expect("create workspace");
        assert_eq!(space.path(), target);
        assert!(target.is_dir());

        space.cleanup().unwrap();
        assert!(!target.exists());
        // Second cleanup is a no-op.
        space.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_failed_initial_script_reports_output() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("space");
        let err = Workspace::create(
            in_tmp(&tmp)
                .init_vcs(false)
                .shell("echo 'fatal: no such ref' >&2; exit 128"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SpaceError::Provision { .. }));
        assert_eq!(err.stderr(), Some("fatal: no such ref\n"));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_expect_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut space = Workspace::create(in_tmp(&tmp).init_vcs(false))
            .await
            .unwrap()
            .into_guard();
        let out = space
            .execute_expecting(&ExecContext::background(), "ls missing-file", Expect::Failure)
            .await
            .unwrap();
        assert!(!out.success());
        assert!(!out.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_returns_promptly() {
        let tmp = tempfile::tempdir().unwrap();
        let mut space = Workspace::create(in_tmp(&tmp).init_vcs(false))
            .await
            .unwrap()
            .into_guard();
        let ctx = ExecContext::with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = space.execute(&ctx, "sleep 30 & wait").await.unwrap_err();
        assert!(err.is_cancellation());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

// =============================================================================
// git fixtures
// =============================================================================

mod git_fixtures {
    use super::*;

    const BARE_WITH_ONE_COMMIT: &str = r#"
git init --bare test.git &&
git clone test.git test &&
(
	cd test &&
	printf "this is a test\n" >init.js &&
	git add init.js &&
	test_tick &&
	git commit -m "this is the first commit" &&
	git push origin master
) &&
rm -rf test
"#;

    #[tokio::test]
    async fn test_workspace_is_git_repository() {
        if !have_git() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let mut space = Workspace::create(in_tmp(&tmp).init_vcs(true).git_defaults())
            .await
            .unwrap()
            .into_guard();
        let out = space
            .execute(&ExecContext::background(), "git rev-parse --is-inside-work-tree")
            .await
            .unwrap();
        assert_eq!(out.stdout, "true\n");
    }

    #[tokio::test]
    async fn test_bare_repository_history() {
        if !have_git() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let mut space = Workspace::create(in_tmp(&tmp).git_defaults().shell(BARE_WITH_ONE_COMMIT))
            .await
            .expect("create workspace")
            .into_guard();

        let ctx = ExecContext::background();
        space
            .execute(
                &ctx,
                r#"
git clone test.git test &&
(
	cd test &&
	printf "add a new file\n" >main.go &&
	git add main.go &&
	test_tick &&
	git commit -m "this is the second commit" &&
	git push origin master
) &&
rm -rf test
"#,
            )
            .await
            .expect("second commit");

        let out = space
            .execute(&ctx, "cd test.git && git log --format=%s")
            .await
            .unwrap();
        assert_eq!(
            out.stdout.trim(),
            "this is the second commit\nthis is the first commit"
        );

        // Each run is a fresh shell, so test_tick restarts from its fixed epoch.
        let out = space
            .execute(&ctx, "cd test.git && git log --format=%at")
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "1112911993\n1112911993");
    }

    #[tokio::test]
    async fn test_delete_branches_through_stdin() {
        if !have_git() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let mut space = Workspace::create(in_tmp(&tmp).git_defaults().shell(
            r#"
git init --bare test.git &&
git clone test.git test &&
(
	cd test &&
	printf "this is a test" >init.js &&
	git add init.js &&
	test_tick &&
	git commit -m "this is the first commit" &&
	git push origin master &&
	printf "the js file content" >resource.js &&
	git add resource.js &&
	test_tick &&
	git commit -m "the second commit" &&
	git branch branch1 &&
	printf "the go file" >main.go &&
	git add main.go &&
	test_tick &&
	git commit -m "the third commit" &&
	git branch branch2 &&
	git push --all origin
) &&
rm -rf test
"#,
        ))
        .await
        .expect("create workspace")
        .into_guard();

        let ctx = ExecContext::background();
        let mut handle = space
            .execute_with_stdin(&ctx, "cd test.git && git update-ref --stdin")
            .await
            .expect("spawn update-ref");
        handle.write(b"delete refs/heads/branch1\n").await.unwrap();
        handle.write(b"delete refs/heads/branch2\n").await.unwrap();
        handle.wait().await.expect("update-ref");

        let out = space
            .execute(&ctx, "cd test.git && git branch --format=\"%(refname)\"")
            .await
            .unwrap();
        assert_eq!(out.stdout, "refs/heads/master\n");
    }
}
