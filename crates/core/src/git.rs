// Git subprocess runner.
//
// Every operation is one `git` invocation with a fixed argument list,
// run in the session's working directory. Each step returns a Result
// and multi-step sequences short-circuit on the first failure; the
// common "nothing to commit" case is detected and reported as a
// successful no-op rather than an error.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Commit message for the very first commit after `git init`.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";
/// Commit message for every watcher-triggered commit.
pub const AUTO_COMMIT_MESSAGE: &str = "Auto update";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },
    #[error("`{command}` failed with code {code:?}: {stderr}")]
    Command { command: String, code: Option<i32>, stderr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Result of a commit-and-push pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// A commit was created and pushed.
    Pushed,
    /// The working tree was clean; nothing was committed or pushed.
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GitRunner<E = ProcessCommandExecutor> {
    workdir: PathBuf,
    executor: E,
}

impl GitRunner<ProcessCommandExecutor> {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitRunner<E> {
    pub fn with_executor(workdir: impl Into<PathBuf>, executor: E) -> Self {
        Self { workdir: workdir.into(), executor }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn init(&self) -> Result<GitOutput, GitError> {
        self.run(vec!["init".to_string()])
    }

    pub fn remote_add(&self, remote: &str, url: &str) -> Result<GitOutput, GitError> {
        self.run(vec![
            "remote".to_string(),
            "add".to_string(),
            remote.to_string(),
            url.to_string(),
        ])
    }

    pub fn add_all(&self) -> Result<GitOutput, GitError> {
        self.run(vec!["add".to_string(), ".".to_string()])
    }

    pub fn commit(&self, message: &str) -> Result<GitOutput, GitError> {
        self.run(vec!["commit".to_string(), "-m".to_string(), message.to_string()])
    }

    /// `git push -u <remote> <branch>` — sets the upstream on first push.
    pub fn push_upstream(&self, remote: &str, branch: &str) -> Result<GitOutput, GitError> {
        self.run(vec![
            "push".to_string(),
            "-u".to_string(),
            remote.to_string(),
            branch.to_string(),
        ])
    }

    pub fn push(&self) -> Result<GitOutput, GitError> {
        self.run(vec!["push".to_string()])
    }

    /// One-time setup: init, attach the remote, stage everything, create
    /// the initial commit, and push the branch upstream.
    ///
    /// Steps short-circuit on failure, with two carve-outs:
    /// - `remote add` against an already-configured remote is tolerated,
    ///   so a session can be restarted in the same workspace;
    /// - an initial commit that finds nothing to commit completes the
    ///   setup without pushing (fresh empty workspace).
    pub fn setup_and_first_push(
        &self,
        remote_url: &str,
        remote: &str,
        branch: &str,
    ) -> Result<PushOutcome, GitError> {
        self.init()?;

        match self.remote_add(remote, remote_url) {
            Ok(_) => {}
            Err(error) if remote_already_exists(&error) => {
                tracing::debug!(remote, "remote already configured, keeping existing URL");
            }
            Err(error) => return Err(error),
        }

        self.add_all()?;

        match self.commit(INITIAL_COMMIT_MESSAGE) {
            Ok(_) => {
                self.push_upstream(remote, branch)?;
                Ok(PushOutcome::Pushed)
            }
            Err(error) if is_nothing_to_commit(&error) => Ok(PushOutcome::NoChanges),
            Err(error) => Err(error),
        }
    }

    /// Repeated pass: stage everything, commit, push. A clean working
    /// tree is success (`NoChanges`); the push only runs after a commit
    /// was actually created.
    pub fn push_changes(&self) -> Result<PushOutcome, GitError> {
        self.add_all()?;

        match self.commit(AUTO_COMMIT_MESSAGE) {
            Ok(_) => {
                self.push()?;
                Ok(PushOutcome::Pushed)
            }
            Err(error) if is_nothing_to_commit(&error) => Ok(PushOutcome::NoChanges),
            Err(error) => Err(error),
        }
    }

    fn run(&self, args: Vec<String>) -> Result<GitOutput, GitError> {
        let command = format!("git {}", args.join(" "));
        let result = self.executor.execute("git", &args, &self.workdir).map_err(|error| {
            GitError::Spawn { command: command.clone(), message: error.to_string() }
        })?;

        if result.success {
            return Ok(GitOutput { stdout: result.stdout, stderr: result.stderr });
        }

        // git writes "nothing to commit" to stdout; keep whichever
        // stream carries the diagnostic.
        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitError::Command { command, code: result.code, stderr })
    }
}

/// A failed commit whose diagnostic says the working tree is clean.
fn is_nothing_to_commit(error: &GitError) -> bool {
    match error {
        GitError::Command { stderr, .. } => {
            stderr.contains("nothing to commit")
                || stderr.contains("nothing added to commit")
                || stderr.contains("no changes added to commit")
        }
        GitError::Spawn { .. } => false,
    }
}

fn remote_already_exists(error: &GitError) -> bool {
    matches!(error, GitError::Command { stderr, .. } if stderr.contains("already exists"))
}
