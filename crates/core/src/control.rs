// Control socket: lets `autopush stop` reach a session running in
// another terminal.
//
// The session binds a Unix socket at `<workspace>/.autopush/control.sock`
// and serves newline-delimited requests; `stop` replies `ok` and
// resolves the shutdown future. A PID file next to the socket is kept
// for diagnostics only.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::config::workspace_dir;

const SOCKET_NAME: &str = "control.sock";
const PID_FILE_NAME: &str = "autopush.pid";

const STOP_REQUEST: &str = "stop";
const STOP_REPLY: &str = "ok";

/// Resolved paths for a session's runtime files.
pub struct ControlPaths {
    pub base_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
}

impl ControlPaths {
    /// Resolve paths under `<workspace>/.autopush/`.
    pub fn for_workspace(workspace_root: &Path) -> Self {
        let base_dir = workspace_dir(workspace_root);
        Self {
            socket_path: base_dir.join(SOCKET_NAME),
            pid_path: base_dir.join(PID_FILE_NAME),
            base_dir,
        }
    }
}

/// Bind the control socket and write the PID file.
/// Removes a stale socket left behind by a dead session first.
pub async fn bind(paths: &ControlPaths) -> Result<UnixListener> {
    fs::create_dir_all(&paths.base_dir)
        .with_context(|| format!("failed to create `{}`", paths.base_dir.display()))?;

    if paths.socket_path.exists() {
        fs::remove_file(&paths.socket_path).context("failed to remove stale control socket")?;
    }

    let listener =
        UnixListener::bind(&paths.socket_path).context("failed to bind control socket")?;
    write_pid_file(&paths.pid_path)?;
    debug!(path = %paths.socket_path.display(), "control socket ready");
    Ok(listener)
}

/// Serve the control socket until a `stop` request arrives, then return.
/// Unknown requests get an error reply and the connection is dropped.
pub async fn serve_until_stop(listener: UnixListener) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(error) => {
                warn!(%error, "control socket accept failed");
                continue;
            }
        };

        match handle_connection(stream).await {
            Ok(true) => {
                info!("stop requested over control socket");
                return;
            }
            Ok(false) => {}
            Err(error) => debug!(%error, "control connection failed"),
        }
    }
}

async fn handle_connection(stream: UnixStream) -> Result<bool> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.context("failed to read control request")?;

    let stream = reader.get_mut();
    if line.trim() == STOP_REQUEST {
        stream.write_all(STOP_REPLY.as_bytes()).await.context("failed to send stop reply")?;
        stream.write_all(b"\n").await.context("failed to send stop reply terminator")?;
        stream.flush().await.ok();
        Ok(true)
    } else {
        stream.write_all(b"err unknown command\n").await.ok();
        Ok(false)
    }
}

/// Ask a running session to stop. Returns `false` when no session is
/// listening (dead or never started) — callers treat that as "already
/// stopped".
pub async fn request_stop(socket_path: &Path) -> Result<bool> {
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(stream) => stream,
        Err(_) => return Ok(false),
    };

    stream.write_all(STOP_REQUEST.as_bytes()).await.context("failed to send stop request")?;
    stream.write_all(b"\n").await.context("failed to send stop request terminator")?;
    stream.flush().await.context("failed to flush stop request")?;

    let mut reader = BufReader::new(stream);
    let mut reply = String::new();
    let bytes_read =
        reader.read_line(&mut reply).await.context("failed to read stop reply")?;

    // A session that died mid-reply still got the request; either way
    // there is nothing left to stop.
    Ok(bytes_read == 0 || reply.trim() == STOP_REPLY)
}

/// Check whether a session is accepting connections on the socket.
pub async fn is_session_running(socket_path: &Path) -> bool {
    UnixStream::connect(socket_path).await.is_ok()
}

/// Remove the socket and PID file on shutdown.
pub fn cleanup(paths: &ControlPaths) {
    remove_quietly(&paths.socket_path);
    remove_quietly(&paths.pid_path);
}

fn write_pid_file(path: &Path) -> Result<()> {
    let pid = std::process::id();
    let mut file = fs::File::create(path).context("failed to create PID file")?;
    write!(file, "{pid}").context("failed to write PID")?;
    debug!(pid, path = %path.display(), "wrote PID file");
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, path = %path.display(), "failed to remove runtime file");
        }
    }
}
