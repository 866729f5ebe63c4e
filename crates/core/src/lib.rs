// autopush-core: session engine for auto-committing workspace changes
// to a GitHub repository.

pub mod config;
pub mod control;
pub mod git;
pub mod github;
pub mod secrets;
pub mod session;
pub mod watcher;
