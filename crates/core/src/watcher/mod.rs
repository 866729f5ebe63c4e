// File watcher: raw create/modify/delete detection for the workspace tree.
//
// Events under version-control and build directories are filtered out
// here; pushing a commit touches `.git/`, and without the filter every
// push would trigger the next one.

pub mod debounce;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Directory names excluded from the watch set, at any depth.
const EXCLUDED_DIRS: &[&str] = &[".git", ".autopush", "target", "node_modules"];

/// Capacity for the internal event channel.
const EVENT_CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// File was created or first detected.
    Create,
    /// File content was modified.
    Modify,
    /// File was deleted.
    Remove,
}

/// A raw filesystem event inside the watched workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

/// Watches a workspace directory recursively using the OS-native
/// backend (fsevents on macOS, inotify on Linux).
///
/// Events are sent to the returned receiver. Dropping the watcher
/// unsubscribes; no further events are delivered after that.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<FsEvent>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let root_for_filter = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Some(events) = translate_event(&event, &root_for_filter) {
                        for raw in events {
                            if tx.blocking_send(raw).is_err() {
                                // Receiver dropped — watcher will be cleaned up.
                                debug!("event channel closed, stopping event dispatch");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "file watcher error");
                }
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        debug!(path = %root.display(), "file watcher started");

        Ok((Self { _watcher: watcher, root }, rx))
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Returns true if any component of `path` below `root` is an excluded
/// directory name.
fn is_excluded(path: &Path, root: &Path) -> bool {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel,
        // Outside the root — handled separately.
        Err(_) => return false,
    };

    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    })
}

/// Returns true if the path is inside the watched root (guards against symlink escapes).
fn is_inside_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Translate a `notify::Event` into zero or more `FsEvent`s, dropping
/// excluded paths and non-content event kinds.
fn translate_event(event: &Event, root: &Path) -> Option<Vec<FsEvent>> {
    let kind = match &event.kind {
        EventKind::Create(_) => FsEventKind::Create,
        EventKind::Modify(modify_kind) => {
            use notify::event::ModifyKind;
            match modify_kind {
                ModifyKind::Data(_) => FsEventKind::Modify,
                // Renames land as name changes; treat as a content change.
                ModifyKind::Name(_) => FsEventKind::Modify,
                // Metadata-only changes (permissions, timestamps) — skip.
                ModifyKind::Metadata(_) => {
                    trace!("skipping metadata-only modify event");
                    return None;
                }
                _ => FsEventKind::Modify,
            }
        }
        EventKind::Remove(_) => FsEventKind::Remove,
        // Access, Other, Any — not actionable for content tracking.
        _ => {
            trace!(kind = ?event.kind, "skipping non-content event");
            return None;
        }
    };

    let events: Vec<FsEvent> = event
        .paths
        .iter()
        .filter(|p| {
            if is_inside_root(p, root) {
                true
            } else {
                warn!(path = %p.display(), "ignoring event outside watch root (possible symlink escape)");
                false
            }
        })
        .filter(|p| {
            if is_excluded(p, root) {
                trace!(path = %p.display(), "ignoring event in excluded directory");
                false
            } else {
                true
            }
        })
        .map(|p| FsEvent { kind, path: p.clone() })
        .collect();

    if events.is_empty() {
        None
    } else {
        Some(events)
    }
}
