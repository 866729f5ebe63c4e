// `autopush stop`: ask the session in another terminal to shut down.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use autopush_core::control::{self, ControlPaths};

#[derive(Args)]
pub struct StopArgs {
    /// Workspace directory of the running session
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

pub async fn run(args: StopArgs) -> Result<()> {
    let workdir = args
        .path
        .canonicalize()
        .with_context(|| format!("workspace directory not found: {}", args.path.display()))?;

    let paths = ControlPaths::for_workspace(&workdir);
    if control::request_stop(&paths.socket_path).await? {
        println!("autopush session stopped.");
    } else {
        // Stopping when nothing is running is a no-op, not an error.
        println!("no autopush session running in {}", workdir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stop_without_session_succeeds() {
        let tmp = TempDir::new().unwrap();
        let args = StopArgs { path: tmp.path().to_path_buf() };
        run(args).await.expect("stop against an idle workspace should succeed");
    }

    #[tokio::test]
    async fn stop_with_missing_workspace_fails() {
        let tmp = TempDir::new().unwrap();
        let args = StopArgs { path: tmp.path().join("missing") };
        run(args).await.expect_err("stop should fail for a nonexistent directory");
    }
}
