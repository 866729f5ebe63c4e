// `autopush start`: one-time setup, then watch and push until stopped.
//
// The session runs in the foreground. It exits on Ctrl-C or when
// `autopush stop` reaches it over the workspace control socket.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use autopush_core::config::GlobalConfig;
use autopush_core::control::{self, ControlPaths};
use autopush_core::session::Session;

use crate::prompt;

#[derive(Args)]
pub struct StartArgs {
    /// Name for the GitHub repository (prompted for when omitted)
    pub name: Option<String>,

    /// Workspace directory to watch (defaults to the current directory)
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

pub async fn run(args: StartArgs) -> Result<()> {
    let workdir = args
        .path
        .canonicalize()
        .with_context(|| format!("workspace directory not found: {}", args.path.display()))?;

    let paths = ControlPaths::for_workspace(&workdir);
    if control::is_session_running(&paths.socket_path).await {
        bail!("a session is already running in {}", workdir.display());
    }

    let repo_name = match args.name {
        Some(name) => name,
        None => match prompt::read_line("Repository name: ")? {
            Some(name) => name,
            // Cancelled: nothing to do, not an error.
            None => return Ok(()),
        },
    };

    let api_url = GlobalConfig::load().effective_api_url();
    let mut session = Session::open(workdir.clone(), &api_url);

    let repo = session.start(&repo_name).await?;
    println!("autopush session started: pushing to {repo}");
    println!("Press Ctrl-C or run `autopush stop` to stop.");

    let listener = control::bind(&paths).await?;
    tokio::select! {
        _ = control::serve_until_stop(listener) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(error) = result {
                warn!(%error, "failed to listen for ctrl-c");
            }
            info!("interrupt received");
        }
    }

    session.stop();
    control::cleanup(&paths);
    println!("autopush session stopped.");
    Ok(())
}
