// Session controller: owns the running flag and drives the setup and
// teardown sequences.
//
// start(): credentials → identity lookup → remote creation → local git
// setup and first push → watcher attach. stop(): clear the flag and
// detach the watcher. File events flow through the debouncer into a
// capacity-1 trigger channel, so concurrent bursts coalesce into at
// most one in-flight push plus one queued follow-up — never two `git`
// processes against the same working directory.
//
// Stopping only prevents new pushes from being scheduled; an in-flight
// `git` subprocess is left to finish on its own.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::WorkspaceConfig;
use crate::git::{CommandExecutor, GitError, GitRunner, ProcessCommandExecutor, PushOutcome};
use crate::github::{GithubClient, GithubError, RemoteRepo, RepoService};
use crate::secrets::{CredentialStore, SecretError};
use crate::watcher::debounce::{DebounceConfig, PushDebouncer};
use crate::watcher::{FileWatcher, FsEvent};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no GitHub token stored; run `autopush set-token` first")]
    MissingToken,
    #[error("workspace directory does not exist: {}", .0.display())]
    NoWorkspace(PathBuf),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Github(#[from] GithubError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("failed to start file watcher: {0}")]
    Watcher(String),
}

pub struct Session<E: CommandExecutor + Send + Sync + 'static = ProcessCommandExecutor> {
    workdir: PathBuf,
    config: WorkspaceConfig,
    credentials: CredentialStore,
    github: Arc<dyn RepoService>,
    git: Arc<GitRunner<E>>,
    running: Arc<AtomicBool>,
    watcher: Option<FileWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session<ProcessCommandExecutor> {
    /// Production session for a workspace: keychain credentials, real
    /// GitHub client, real `git` subprocesses, workspace config from
    /// `<workspace>/.autopush/workspace.toml`.
    pub fn open(workdir: impl Into<PathBuf>, api_url: &str) -> Self {
        let workdir = workdir.into();
        let config = WorkspaceConfig::load(&workdir);
        let git = GitRunner::new(workdir.clone());
        Self::new(
            workdir,
            config,
            CredentialStore::new(),
            Arc::new(GithubClient::new(api_url)),
            git,
        )
    }
}

impl<E: CommandExecutor + Send + Sync + 'static> Session<E> {
    pub fn new(
        workdir: impl Into<PathBuf>,
        config: WorkspaceConfig,
        credentials: CredentialStore,
        github: Arc<dyn RepoService>,
        git: GitRunner<E>,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            config,
            credentials,
            github,
            git: Arc::new(git),
            running: Arc::new(AtomicBool::new(false)),
            watcher: None,
            tasks: Vec::new(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One-time setup, then attach the watcher and mark the session
    /// running. Fails fast, with no state change, if no token is stored
    /// or the workspace directory is missing.
    pub async fn start(&mut self, repo_name: &str) -> Result<RemoteRepo, SessionError> {
        if !self.workdir.is_dir() {
            return Err(SessionError::NoWorkspace(self.workdir.clone()));
        }

        let token = self.credentials.get()?.ok_or(SessionError::MissingToken)?;

        let owner = self.github.resolve_username(&token).await?;
        let repo = RemoteRepo { owner, name: repo_name.to_string() };
        info!(%repo, "creating remote repository");

        if let Err(error) = self.github.create_repository(&token, repo_name).await {
            if self.config.git.require_remote {
                return Err(SessionError::Github(error));
            }
            warn!(%error, "remote creation failed, continuing without it");
        }

        let outcome = self.git.setup_and_first_push(
            &repo.https_url(),
            &self.config.git.remote,
            &self.config.git.branch,
        )?;
        match outcome {
            PushOutcome::Pushed => {
                info!(branch = %self.config.git.branch, "initial commit pushed")
            }
            PushOutcome::NoChanges => info!("workspace is empty, skipping first push"),
        }

        // A repeated start must not leak the previous subscription.
        self.detach();
        self.attach()?;
        self.running.store(true, Ordering::SeqCst);

        info!(path = %self.workdir.display(), "session running");
        Ok(repo)
    }

    /// Clear the running flag and detach the watcher. Calling stop on a
    /// session that never started is a safe no-op.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.detach();
        if was_running {
            info!("session stopped");
        } else {
            debug!("stop requested but session was not running");
        }
    }

    fn attach(&mut self) -> Result<(), SessionError> {
        let (watcher, events) = FileWatcher::start(&self.workdir)
            .map_err(|error| SessionError::Watcher(format!("{error:#}")))?;

        let (push_tx, push_rx) = mpsc::channel::<()>(1);
        let worker = tokio::spawn(push_worker(push_rx, self.running.clone(), self.git.clone()));
        let pump = tokio::spawn(debounce_pump(
            events,
            push_tx,
            DebounceConfig::with_millis(self.config.watch.debounce_ms),
        ));

        self.watcher = Some(watcher);
        self.tasks = vec![pump, worker];
        Ok(())
    }

    fn detach(&mut self) {
        self.watcher = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<E: CommandExecutor + Send + Sync + 'static> Drop for Session<E> {
    fn drop(&mut self) {
        // No dangling subscriptions past the session's lifetime.
        self.detach();
    }
}

/// Feed watcher events through the debouncer; once a burst settles,
/// schedule a push. `try_send` on the capacity-1 channel is what bounds
/// concurrency: a full slot means a push is already pending and this
/// trigger coalesces into it.
async fn debounce_pump(
    mut events: mpsc::Receiver<FsEvent>,
    push_tx: mpsc::Sender<()>,
    config: DebounceConfig,
) {
    let mut debouncer = PushDebouncer::new(config);
    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    trace!(path = %event.path.display(), kind = ?event.kind, "file event");
                    debouncer.record(event.path);
                }
                None => break, // watcher disposed
            },
            _ = sleep_until_or_forever(deadline) => {
                if let Some(paths) = debouncer.take_ready() {
                    debug!(changed = paths.len(), "change burst settled, scheduling push");
                    if push_tx.try_send(()).is_err() {
                        trace!("push already pending, coalescing trigger");
                    }
                }
            }
        }
    }
}

async fn sleep_until_or_forever(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Run pushes one at a time. The running flag gates every trigger: after
/// stop, queued triggers are drained without spawning anything.
async fn push_worker<E: CommandExecutor + Send + Sync + 'static>(
    mut triggers: mpsc::Receiver<()>,
    running: Arc<AtomicBool>,
    git: Arc<GitRunner<E>>,
) {
    while triggers.recv().await.is_some() {
        if !running.load(Ordering::SeqCst) {
            trace!("session not running, ignoring push trigger");
            continue;
        }

        let runner = Arc::clone(&git);
        match tokio::task::spawn_blocking(move || runner.push_changes()).await {
            Ok(Ok(PushOutcome::Pushed)) => info!("changes pushed"),
            Ok(Ok(PushOutcome::NoChanges)) => debug!("nothing to commit"),
            // A failed push ends this pass only; the session stays up.
            Ok(Err(error)) => warn!(%error, "push failed"),
            Err(error) => warn!(%error, "push task aborted"),
        }
    }
}
