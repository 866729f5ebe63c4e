// End-to-end checks for the git runner against a real `git` binary,
// pushing to a local bare repository standing in for the remote.

use std::path::Path;
use std::process::Command;

use autopush_core::git::{GitRunner, PushOutcome};
use tempfile::TempDir;

#[test]
fn setup_and_repeated_pushes_reach_the_remote() {
    let temp = TempDir::new().expect("tempdir should be created");
    let remote_path = temp.path().join("remote.git");
    let repo_path = temp.path().join("workspace");

    run_git(temp.path(), &["init", "--bare", remote_path.to_str().expect("utf8 remote path")]);

    // Pre-create the workspace repo so commit identity and branch name
    // don't depend on the machine's global git config; the runner's own
    // `git init` is a harmless re-init on top of this.
    std::fs::create_dir_all(&repo_path).expect("workspace dir should be created");
    run_git(temp.path(), &["init", "-b", "main", repo_path.to_str().expect("utf8 repo path")]);
    run_git(&repo_path, &["config", "user.name", "AutoPush Tests"]);
    run_git(&repo_path, &["config", "user.email", "autopush-tests@example.test"]);

    std::fs::write(repo_path.join("README.md"), "# demo\n").expect("seed file should be written");

    let runner = GitRunner::new(&repo_path);
    let remote_url = remote_path.to_str().expect("utf8 remote path");

    let outcome = runner
        .setup_and_first_push(remote_url, "origin", "main")
        .expect("initial setup should succeed");
    assert_eq!(outcome, PushOutcome::Pushed);

    let initial_message = run_git_capture(&repo_path, &["log", "-1", "--pretty=%s"]);
    assert_eq!(initial_message.trim(), "Initial commit");

    // A clean tree is a successful no-op pass.
    let outcome = runner.push_changes().expect("clean-tree pass should succeed");
    assert_eq!(outcome, PushOutcome::NoChanges);

    // A content change produces an auto-update commit on the remote.
    std::fs::write(repo_path.join("README.md"), "# demo\n\nupdated\n")
        .expect("updated file should be written");
    let outcome = runner.push_changes().expect("push pass should succeed");
    assert_eq!(outcome, PushOutcome::Pushed);

    let latest_message = run_git_capture(&repo_path, &["log", "-1", "--pretty=%s"]);
    assert_eq!(latest_message.trim(), "Auto update");

    let local_head = run_git_capture(&repo_path, &["rev-parse", "HEAD"]);
    let remote_head = run_git_capture(
        temp.path(),
        &[
            "--git-dir",
            remote_path.to_str().expect("utf8 remote path"),
            "rev-parse",
            "refs/heads/main",
        ],
    );
    assert_eq!(local_head.trim(), remote_head.trim(), "remote should receive pushed commit");
}

#[test]
fn setup_twice_in_the_same_workspace_is_tolerated() {
    let temp = TempDir::new().expect("tempdir should be created");
    let remote_path = temp.path().join("remote.git");
    let repo_path = temp.path().join("workspace");

    run_git(temp.path(), &["init", "--bare", remote_path.to_str().expect("utf8 remote path")]);
    std::fs::create_dir_all(&repo_path).expect("workspace dir should be created");
    run_git(temp.path(), &["init", "-b", "main", repo_path.to_str().expect("utf8 repo path")]);
    run_git(&repo_path, &["config", "user.name", "AutoPush Tests"]);
    run_git(&repo_path, &["config", "user.email", "autopush-tests@example.test"]);

    std::fs::write(repo_path.join("notes.txt"), "first\n").expect("seed file should be written");

    let runner = GitRunner::new(&repo_path);
    let remote_url = remote_path.to_str().expect("utf8 remote path");

    runner
        .setup_and_first_push(remote_url, "origin", "main")
        .expect("first setup should succeed");

    // Second setup: re-init, `remote add` fails with "already exists"
    // and is tolerated, and the clean tree skips the first-push step.
    let outcome = runner
        .setup_and_first_push(remote_url, "origin", "main")
        .expect("repeated setup should succeed");
    assert_eq!(outcome, PushOutcome::NoChanges);
}

fn run_git(cwd: &Path, args: &[&str]) {
    let output =
        Command::new("git").args(args).current_dir(cwd).output().expect("git command should run");
    assert!(
        output.status.success(),
        "git {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn run_git_capture(cwd: &Path, args: &[&str]) -> String {
    let output =
        Command::new("git").args(args).current_dir(cwd).output().expect("git command should run");
    assert!(
        output.status.success(),
        "git {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8 output")
}
