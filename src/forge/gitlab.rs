//! forge::gitlab
//!
//! GitLab forge implementation using the v4 REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitLab. Every operation is a
//! single authenticated REST call; responses are deserialized into the typed
//! structures in [`crate::core::types`] at this boundary, so no identifier is
//! ever scraped out of a raw body. Failures are distinguished by HTTP status
//! class: 404 becomes `ForgeError::NotFound`, everything else surfaces as an
//! auth, rate-limit, API, or network error.
//!
//! # Authentication
//!
//! A static personal access token is sent on each request in GitLab's
//! `PRIVATE-TOKEN` header. The client performs no token refresh and no
//! automatic retries; retry policy belongs to the caller's transport, not
//! here.
//!
//! # Example
//!
//! ```ignore
//! use glmirror::forge::gitlab::GitLabForge;
//! use glmirror::forge::Forge;
//!
//! let forge = GitLabForge::new("gitlab.example.com", "glpat-xxx");
//! let project = forge.project_by_path("acme/svc").await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{Forge, ForgeError};
use crate::core::types::{
    AccessLevel, Namespace, NamespaceId, ProjectSpec, ProtectionRule, RemoteProject, Visibility,
};

/// GitLab's per-request authentication header.
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "glmirror-cli";

/// GitLab forge implementation.
///
/// One instance targets one GitLab host (gitlab.com or self-hosted) with one
/// token; the same instance serves every call of a reconciliation run.
pub struct GitLabForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token sent on each request
    token: String,
    /// Host without scheme (e.g. "gitlab.example.com"), used for repo URLs
    host: String,
    /// API base URL (e.g. "https://gitlab.example.com/api/v4")
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabForge")
            .field("has_token", &!self.token.is_empty())
            .field("host", &self.host)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabForge {
    /// Create a new GitLab forge.
    ///
    /// The host may be given with or without a scheme; it is normalized and
    /// the API is reached over HTTPS at `<host>/api/v4`.
    ///
    /// # Arguments
    ///
    /// * `host` - GitLab host (e.g. "gitlab.com" or "https://gitlab.example.com")
    /// * `token` - Personal access token
    ///
    /// # Example
    ///
    /// ```
    /// use glmirror::forge::gitlab::GitLabForge;
    ///
    /// let forge = GitLabForge::new("https://gitlab.example.com/", "glpat-xxx");
    /// assert_eq!(forge.api_base(), "https://gitlab.example.com/api/v4");
    /// ```
    pub fn new(host: impl AsRef<str>, token: impl Into<String>) -> Self {
        let host = normalize_host(host.as_ref());
        let api_base = format!("https://{}/api/v4", host);
        Self {
            client: Client::new(),
            token: token.into(),
            host,
            api_base,
        }
    }

    /// Create a GitLab forge with an explicit API base URL.
    ///
    /// Use this when the API is not at the default `https://<host>/api/v4`
    /// location; tests point it at a local mock server.
    pub fn with_api_base(
        host: impl AsRef<str>,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            host: normalize_host(host.as_ref()),
            api_base: api_base.into(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the host (without scheme).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            PRIVATE_TOKEN_HEADER,
            HeaderValue::from_str(&self.token)
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Build URL for a project-scoped endpoint.
    fn project_url(&self, project_id: u64, path: &str) -> String {
        format!("{}/projects/{}/{}", self.api_base, project_id, path)
    }

    /// Handle an API response, deserializing the body on success.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an API response where the success body is irrelevant.
    async fn handle_empty_response(&self, response: Response) -> Result<(), ForgeError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        let message = match response.json::<GitLabErrorBody>().await {
            Ok(body) => body.into_message(),
            Err(_) => "unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => {
                ForgeError::AuthFailed(format!("permission denied: {}", message))
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitLab server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for GitLabForge {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn repo_url(&self, path: &str) -> String {
        format!("https://{}/{}.git", self.host, path)
    }

    async fn project_by_path(&self, path: &str) -> Result<Option<RemoteProject>, ForgeError> {
        let url = format!("{}/projects/{}", self.api_base, urlencoding::encode(path));

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        // 404 is the existence predicate, not an error. Every other failure
        // must surface so a broken query is never read as an absent project.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let project: RemoteProject = self.handle_response(response).await?;
        Ok(Some(project))
    }

    async fn search_namespaces(&self, name: &str) -> Result<Vec<Namespace>, ForgeError> {
        let url = format!(
            "{}/namespaces?search={}",
            self.api_base,
            urlencoding::encode(name)
        );

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn create_project(
        &self,
        namespace: NamespaceId,
        spec: &ProjectSpec,
    ) -> Result<RemoteProject, ForgeError> {
        let url = format!("{}/projects", self.api_base);

        let body = CreateProjectBody {
            name: spec.name(),
            namespace_id: namespace,
            description: spec.description(),
            visibility: spec.visibility(),
            default_branch: spec.default_branch(),
            initialize_with_readme: false,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn update_project(
        &self,
        project_id: u64,
        description: &str,
        default_branch: &str,
    ) -> Result<(), ForgeError> {
        let url = format!("{}/projects/{}", self.api_base, project_id);

        let body = UpdateProjectBody {
            description,
            default_branch,
        };

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        self.handle_empty_response(response).await
    }

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), ForgeError> {
        let url = self.project_url(
            project_id,
            &format!("protected_branches/{}", urlencoding::encode(branch)),
        );

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        self.handle_empty_response(response).await
    }

    async fn protect_branch(
        &self,
        project_id: u64,
        branch: &str,
    ) -> Result<ProtectionRule, ForgeError> {
        let url = self.project_url(project_id, "protected_branches");

        let body = ProtectBranchBody {
            name: branch,
            push_access_level: AccessLevel::HIGHEST.ordinal(),
            merge_access_level: AccessLevel::HIGHEST.ordinal(),
            allow_force_push: true,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let wire: GitLabProtectedBranch = self.handle_response(response).await?;
        rule_from_wire(wire)
    }
}

// --------------------------------------------------------------------------
// Host normalization
// --------------------------------------------------------------------------

/// Normalize a host argument to a bare hostname.
///
/// Accepts "gitlab.com", "https://gitlab.example.com" or
/// "http://gitlab.example.com/", returning the host without scheme or
/// trailing slash.
pub fn normalize_host(host: &str) -> String {
    host.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

// --------------------------------------------------------------------------
// Wire types
// --------------------------------------------------------------------------

/// Request body for project creation.
#[derive(Debug, Serialize)]
struct CreateProjectBody<'a> {
    name: &'a str,
    namespace_id: NamespaceId,
    description: &'a str,
    visibility: Visibility,
    default_branch: &'a str,
    initialize_with_readme: bool,
}

/// Request body for project settings update.
#[derive(Debug, Serialize)]
struct UpdateProjectBody<'a> {
    description: &'a str,
    default_branch: &'a str,
}

/// Request body for protection rule creation.
#[derive(Debug, Serialize)]
struct ProtectBranchBody<'a> {
    name: &'a str,
    push_access_level: u64,
    merge_access_level: u64,
    allow_force_push: bool,
}

/// A protected branch as GitLab returns it.
#[derive(Debug, Deserialize)]
struct GitLabProtectedBranch {
    name: String,
    #[serde(default)]
    push_access_levels: Vec<GitLabAccessEntry>,
    #[serde(default)]
    merge_access_levels: Vec<GitLabAccessEntry>,
    #[serde(default)]
    allow_force_push: bool,
}

/// One entry of a protected branch's access level arrays.
#[derive(Debug, Deserialize)]
struct GitLabAccessEntry {
    access_level: u64,
}

/// Convert GitLab's protected branch payload to the domain rule.
fn rule_from_wire(wire: GitLabProtectedBranch) -> Result<ProtectionRule, ForgeError> {
    let malformed = |what: &str| ForgeError::ApiError {
        status: 200,
        message: format!("malformed protected branch response: {}", what),
    };

    let push = wire
        .push_access_levels
        .first()
        .ok_or_else(|| malformed("missing push access level"))?;
    let merge = wire
        .merge_access_levels
        .first()
        .ok_or_else(|| malformed("missing merge access level"))?;

    Ok(ProtectionRule {
        branch: wire.name,
        push_access: AccessLevel::try_from(push.access_level)
            .map_err(|e| malformed(&e.to_string()))?,
        merge_access: AccessLevel::try_from(merge.access_level)
            .map_err(|e| malformed(&e.to_string()))?,
        allow_force_push: wire.allow_force_push,
    })
}

/// GitLab error body.
///
/// GitLab reports errors as either `{"message": ...}` where the message may
/// be a string or a structured validation object, or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct GitLabErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl GitLabErrorBody {
    fn into_message(self) -> String {
        if let Some(message) = self.message {
            return match message {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
        }
        self.error.unwrap_or_else(|| "unknown error".to_string())
    }
}
