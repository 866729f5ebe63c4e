// GitHub token storage in the OS keychain.
//
// The token never touches disk or the log output; it lives in the
// platform credential store (Keychain on macOS, Secret Service on
// Linux, Credential Manager on Windows) and is read on demand.

use thiserror::Error;

const KEYRING_SERVICE: &str = "dev.autopush.cli";
const TOKEN_ACCOUNT: &str = "github_token";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("token must not be empty")]
    Empty,
    #[error("keychain error: {0}")]
    Backend(String),
}

/// Abstraction over the OS credential store for testability.
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError>;
    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError>;
    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError>;
}

/// Production store backed by the `keyring` crate.
pub struct KeyringSecretStore;

impl SecretStore for KeyringSecretStore {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        let entry = entry(service, account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(SecretError::Backend(error.to_string())),
        }
    }

    fn set(&self, service: &str, account: &str, value: &str) -> Result<(), SecretError> {
        let entry = entry(service, account)?;
        entry.set_password(value).map_err(|error| SecretError::Backend(error.to_string()))
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        let entry = entry(service, account)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(SecretError::Backend(error.to_string())),
        }
    }
}

fn entry(service: &str, account: &str) -> Result<keyring::Entry, SecretError> {
    keyring::Entry::new(service, account).map_err(|error| SecretError::Backend(error.to_string()))
}

/// The one secret AutoPush keeps: a GitHub personal access token.
pub struct CredentialStore {
    store: Box<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self { store: Box::new(KeyringSecretStore) }
    }

    pub fn with_store(store: Box<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Read the stored token. Returns `None` if no token was ever set.
    pub fn get(&self) -> Result<Option<String>, SecretError> {
        self.store.get(KEYRING_SERVICE, TOKEN_ACCOUNT)
    }

    /// Store a token, overwriting any prior value. The value is not
    /// validated beyond being non-empty.
    pub fn set(&self, token: &str) -> Result<(), SecretError> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SecretError::Empty);
        }
        self.store.set(KEYRING_SERVICE, TOKEN_ACCOUNT, trimmed)
    }

    /// Remove the stored token. Removing a token that was never set is a no-op.
    pub fn clear(&self) -> Result<(), SecretError> {
        self.store.delete(KEYRING_SERVICE, TOKEN_ACCOUNT)
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
