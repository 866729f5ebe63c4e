// Local configuration files.
//
// Global config: `~/.autopush/config.toml`
// Workspace config: `<workspace>/.autopush/workspace.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::github::DEFAULT_API_URL;

/// Root directory for AutoPush global state: `~/.autopush/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".autopush"))
}

/// Path to the global config file: `~/.autopush/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Per-workspace state directory: `<root>/.autopush/`.
pub fn workspace_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".autopush")
}

/// Path to the workspace config file: `<root>/.autopush/workspace.toml`.
pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_dir(workspace_root).join("workspace.toml")
}

// ── Global config ──────────────────────────────────────────────────

/// Global configuration at `~/.autopush/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// GitHub API base URL (override for GitHub Enterprise).
    pub api_url: Option<String>,
}

impl GlobalConfig {
    /// Load from `~/.autopush/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        save_owner_only(path, self)
    }

    /// The API URL to use, falling back to the public endpoint when the
    /// configured value is missing or not a valid URL.
    pub fn effective_api_url(&self) -> String {
        match &self.api_url {
            Some(configured) => match url::Url::parse(configured) {
                Ok(_) => configured.clone(),
                Err(error) => {
                    warn!(%error, configured, "invalid api_url in config, using default");
                    DEFAULT_API_URL.to_string()
                }
            },
            None => DEFAULT_API_URL.to_string(),
        }
    }
}

// ── Workspace config ───────────────────────────────────────────────

/// Per-workspace configuration at `<root>/.autopush/workspace.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Git settings for this workspace.
    pub git: GitConfig,
    /// Watcher settings.
    pub watch: WatchConfig,
}

impl WorkspaceConfig {
    /// Load from `<root>/.autopush/workspace.toml`. Returns defaults if
    /// the file doesn't exist.
    pub fn load(workspace_root: &Path) -> Self {
        let path = workspace_config_path(workspace_root);
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `<root>/.autopush/workspace.toml`.
    pub fn save(&self, workspace_root: &Path) -> Result<(), ConfigError> {
        self.save_to(&workspace_config_path(workspace_root))
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        save_owner_only(path, self)
    }
}

/// Git settings per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// Git remote name (defaults to `"origin"`).
    pub remote: String,
    /// Branch pushed upstream on first push (defaults to `"main"`).
    pub branch: String,
    /// Abort session start when remote repository creation fails.
    /// Set to `false` to log the failure and continue anyway.
    pub require_remote: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { remote: "origin".into(), branch: "main".into(), require_remote: true }
    }
}

/// Watcher settings per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet window in milliseconds before a change burst triggers a push.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

// ── Persistence helpers ────────────────────────────────────────────

fn save_owner_only<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        ensure_owner_only_dir(parent).map_err(ConfigError::Io)?;
    }
    let contents = toml::to_string_pretty(value).map_err(ConfigError::Serialize)?;
    std::fs::write(path, contents).map_err(ConfigError::Io)?;
    ensure_owner_only_file(path).map_err(ConfigError::Io)
}

fn ensure_owner_only_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
            if mode != 0o700 {
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

fn ensure_owner_only_file(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
            if mode != 0o600 {
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
