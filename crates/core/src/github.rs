// GitHub REST client: identity lookup and repository creation.
//
// Exactly two outbound calls, both authenticated with the stored
// personal access token:
//   GET  {api_url}/user        → account login
//   POST {api_url}/user/repos  → create a repository under that account
//
// No retries; a failed call surfaces once to the caller.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use thiserror::Error;

/// Public GitHub API endpoint. Overridable via the global config for
/// GitHub Enterprise (and pointed at a local mock server in tests).
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub requires a User-Agent on all API requests.
const USER_AGENT: &str = concat!("autopush/", env!("CARGO_PKG_VERSION"));

/// Maximum length of a response body excerpt carried in an error.
const ERROR_BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum GithubError {
    /// The token was rejected (non-2xx from the identity endpoint).
    #[error("GitHub rejected the token (HTTP {status}); check `autopush set-token`")]
    Auth { status: u16 },
    /// The identity response had no usable login field.
    #[error("GitHub identity response did not include a login")]
    MissingLogin,
    /// Repository creation failed (name collision, invalid name, missing scope).
    #[error("repository creation failed (HTTP {status}): {body}")]
    RemoteCreation { status: u16, body: String },
    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The remote repository a session pushes to: owner login from the
/// identity lookup, name from the user. Derived once per session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub owner: String,
    pub name: String,
}

impl RemoteRepo {
    /// HTTPS clone/push URL for this repository.
    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

impl std::fmt::Display for RemoteRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: Option<String>,
}

/// Abstraction over the repository service for testability.
///
/// In production this is `GithubClient`; session tests inject a mock
/// that records calls and returns canned results.
pub trait RepoService: Send + Sync {
    fn resolve_username<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GithubError>> + Send + 'a>>;

    fn create_repository<'a>(
        &'a self,
        token: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GithubError>> + Send + 'a>>;
}

pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { http: reqwest::Client::new(), api_url }
    }

    /// Look up the account login for the given token.
    pub async fn resolve_username(&self, token: &str) -> Result<String, GithubError> {
        let response = self
            .http
            .get(format!("{}/user", self.api_url))
            .header("Authorization", format!("token {token}"))
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GithubError::Auth { status: response.status().as_u16() });
        }

        let body: UserResponse = response.json().await?;
        body.login.filter(|login| !login.is_empty()).ok_or(GithubError::MissingLogin)
    }

    /// Create a repository named `name` under the token's account.
    pub async fn create_repository(&self, token: &str, name: &str) -> Result<(), GithubError> {
        let response = self
            .http
            .post(format!("{}/user/repos", self.api_url))
            .header("Authorization", format!("token {token}"))
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(GithubError::RemoteCreation { status, body: excerpt(&body) })
    }
}

impl RepoService for GithubClient {
    fn resolve_username<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GithubError>> + Send + 'a>> {
        Box::pin(GithubClient::resolve_username(self, token))
    }

    fn create_repository<'a>(
        &'a self,
        token: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GithubError>> + Send + 'a>> {
        Box::pin(GithubClient::create_repository(self, token, name))
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_EXCERPT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ── RemoteRepo ─────────────────────────────────────────────────

    #[test]
    fn https_url_combines_owner_and_name() {
        let repo = RemoteRepo { owner: "alice".into(), name: "demo".into() };
        assert_eq!(repo.https_url(), "https://github.com/alice/demo.git");
        assert_eq!(repo.to_string(), "alice/demo");
    }

    #[test]
    fn client_strips_trailing_slash_from_api_url() {
        let client = GithubClient::new("https://api.github.com/");
        assert_eq!(client.api_url, "https://api.github.com");
    }

    // ── resolve_username ───────────────────────────────────────────

    #[tokio::test]
    async fn resolve_username_returns_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "token ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "login": "alice",
                "id": 42,
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri());
        let login = client.resolve_username("ghp_test").await.expect("lookup should succeed");
        assert_eq!(login, "alice");
    }

    #[tokio::test]
    async fn resolve_username_maps_unauthorized_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Bad credentials",
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri());
        let error = client.resolve_username("expired").await.expect_err("lookup should fail");
        assert!(matches!(error, GithubError::Auth { status: 401 }));
    }

    #[tokio::test]
    async fn resolve_username_without_login_field_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri());
        let error = client.resolve_username("ghp_test").await.expect_err("lookup should fail");
        assert!(matches!(error, GithubError::MissingLogin));
    }

    // ── create_repository ──────────────────────────────────────────

    #[tokio::test]
    async fn create_repository_posts_name_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .and(header("Authorization", "token ghp_test"))
            .and(body_json(serde_json::json!({ "name": "demo" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "full_name": "alice/demo",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri());
        client.create_repository("ghp_test", "demo").await.expect("creation should succeed");
    }

    #[tokio::test]
    async fn create_repository_surfaces_non_2xx_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "name already exists on this account",
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri());
        let error =
            client.create_repository("ghp_test", "demo").await.expect_err("creation should fail");
        match error {
            GithubError::RemoteCreation { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("already exists"));
            }
            other => panic!("expected RemoteCreation, got {other:?}"),
        }
    }

    // ── excerpt ────────────────────────────────────────────────────

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert!(cut.chars().count() <= ERROR_BODY_EXCERPT + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn excerpt_keeps_short_bodies_intact() {
        assert_eq!(excerpt("  not found \n"), "not found");
    }
}
