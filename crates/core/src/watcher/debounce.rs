// Push-trigger debouncer.
//
// A push covers the whole working tree, so there is no point tracking
// per-path timers: any burst of filesystem events collapses into one
// trigger once the workspace has been quiet for the window. The set of
// dirty paths is kept only for logging.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Default quiet window before a push is triggered.
const DEFAULT_WINDOW_MS: u64 = 500;
/// Minimum allowed window.
const MIN_WINDOW_MS: u64 = 100;
/// Maximum allowed window.
const MAX_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_WINDOW_MS) }
    }
}

impl DebounceConfig {
    /// Create a config with the given window in milliseconds, clamped to [100, 5000].
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_WINDOW_MS, MAX_WINDOW_MS);
        Self { window: Duration::from_millis(clamped) }
    }
}

/// Coalesces rapid filesystem events into a single push trigger.
///
/// Call `record()` for each incoming event, then `take_ready()` when
/// the deadline passes; it returns the dirty paths once the quiet
/// window has elapsed since the last event.
pub struct PushDebouncer {
    config: DebounceConfig,
    dirty: HashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl PushDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config, dirty: HashSet::new(), last_event: None }
    }

    /// Record a filesystem event. Every event resets the quiet window.
    pub fn record(&mut self, path: PathBuf) {
        self.record_at(path, Instant::now());
    }

    fn record_at(&mut self, path: PathBuf, now: Instant) {
        self.dirty.insert(path);
        self.last_event = Some(now);
    }

    /// If the quiet window has elapsed, drain and return the dirty
    /// paths. Returns `None` while events are still arriving.
    pub fn take_ready(&mut self) -> Option<Vec<PathBuf>> {
        self.take_ready_at(Instant::now())
    }

    fn take_ready_at(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        let last = self.last_event?;
        if now.duration_since(last) < self.config.window {
            return None;
        }

        self.last_event = None;
        let mut paths: Vec<PathBuf> = self.dirty.drain().collect();
        paths.sort();
        Some(paths)
    }

    /// When the pending trigger becomes ready, or `None` if idle.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_event.map(|t| t + self.config.window)
    }

    /// Number of distinct dirty paths waiting in the window.
    pub fn pending_count(&self) -> usize {
        self.dirty.len()
    }
}
