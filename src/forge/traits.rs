//! forge::traits
//!
//! Forge trait definition for interacting with the remote hosting provider.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! All methods return `Result` so the reconciler can distinguish a
//! provider-confirmed absence (`ForgeError::NotFound`, or `Ok(None)` from
//! [`Forge::project_by_path`]) from a query that failed outright. That
//! distinction is what keeps a transient auth or network failure from being
//! misread as "project does not exist" and triggering a duplicate create.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{Namespace, NamespaceId, ProjectSpec, ProtectionRule, RemoteProject};

/// Errors from forge operations.
///
/// These map to the common failure modes of a hosted-API exchange. Only
/// `NotFound` carries existence information; every other variant means the
/// exchange itself could not be completed meaningfully.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider positively reported the resource absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The API returned an error response.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// True when the provider positively reported the resource absent,
    /// as opposed to the query failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }
}

/// The Forge trait for interacting with the remote hosting provider.
///
/// Implementations must be `Send + Sync` so the trait object can cross the
/// runtime boundary in the CLI layer.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers rely on `NotFound`
/// being reserved for provider-confirmed absence; implementations must not
/// map transport, auth, or payload failures onto it.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "gitlab").
    fn name(&self) -> &'static str;

    /// Repository push URL for a project path on this forge.
    fn repo_url(&self, path: &str) -> String;

    /// Look up a project by its full path.
    ///
    /// # Returns
    ///
    /// `Ok(Some(project))` when the project exists, `Ok(None)` only when the
    /// provider confirmed absence with a 404.
    ///
    /// # Errors
    ///
    /// Any non-404 failure (auth, rate limit, malformed payload, network) is
    /// an error, never `Ok(None)`.
    async fn project_by_path(&self, path: &str) -> Result<Option<RemoteProject>, ForgeError>;

    /// Search namespaces by name.
    ///
    /// Returns every candidate the provider's search yields; selection is
    /// the caller's concern.
    async fn search_namespaces(&self, name: &str) -> Result<Vec<Namespace>, ForgeError>;

    /// Create a project under a resolved namespace.
    ///
    /// The repository is created empty: no initial commit, no seeded README.
    ///
    /// # Errors
    ///
    /// Any non-success response (name collision, permission denial, invalid
    /// visibility) is an error; the caller treats it as fatal.
    async fn create_project(
        &self,
        namespace: NamespaceId,
        spec: &ProjectSpec,
    ) -> Result<RemoteProject, ForgeError>;

    /// Update a project's description and default branch.
    ///
    /// Idempotent from the provider's perspective: repeating the call with
    /// the same values is a no-op.
    async fn update_project(
        &self,
        project_id: u64,
        description: &str,
        default_branch: &str,
    ) -> Result<(), ForgeError>;

    /// Remove the protection rule for a branch.
    ///
    /// # Errors
    ///
    /// `NotFound` when no rule exists for the branch; callers on the
    /// reconcile path treat that as expected.
    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), ForgeError>;

    /// Create a protection rule for a branch with push and merge access at
    /// the highest tier and force-push allowed.
    ///
    /// # Errors
    ///
    /// Fails when the branch does not exist yet (fresh project with no
    /// commits) or when a rule for the branch is already present.
    async fn protect_branch(
        &self,
        project_id: u64,
        branch: &str,
    ) -> Result<ProtectionRule, ForgeError>;
}
