//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ProjectSpec`] - Validated desired state for one project
//! - [`Visibility`] - Project visibility level
//! - [`AccessLevel`] - Provider privilege tier for branch rules
//! - [`NamespaceId`] / [`Namespace`] - Namespace identity and search results
//! - [`RemoteProject`] - Observed or created remote project state
//! - [`ProtectionRule`] - A branch protection rule as the provider reports it
//!
//! # Validation
//!
//! [`ProjectSpec`] enforces validity at construction time: a spec with an
//! empty namespace or name cannot be represented, so the reconciler never
//! has to re-check its inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("invalid project name: {0}")]
    InvalidProjectName(String),

    #[error("invalid default branch: {0}")]
    InvalidDefaultBranch(String),

    #[error("invalid visibility '{0}': expected private, internal, or public")]
    InvalidVisibility(String),

    #[error("invalid access level ordinal: {0}")]
    InvalidAccessLevel(u64),
}

/// Project visibility level.
///
/// Serialized in the provider's lowercase wire format.
///
/// # Example
///
/// ```
/// use glmirror::core::types::Visibility;
///
/// let vis: Visibility = "internal".parse().unwrap();
/// assert_eq!(vis, Visibility::Internal);
/// assert_eq!(vis.to_string(), "internal");
///
/// assert!("secret".parse::<Visibility>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to project members only
    Private,
    /// Visible to any authenticated user on the instance
    Internal,
    /// Visible to everyone
    Public,
}

impl Visibility {
    /// Get the visibility name as the provider's wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            "public" => Ok(Visibility::Public),
            other => Err(TypeError::InvalidVisibility(other.to_string())),
        }
    }
}

/// Provider privilege tier for branch push/merge access.
///
/// GitLab defines the ordinals 0 (no access), 30 (developer),
/// 40 (maintainer), and 60 (admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    /// No one may perform the action
    NoAccess,
    /// Developers and above
    Developer,
    /// Maintainers and above
    Maintainer,
    /// Instance administrators
    Admin,
}

impl AccessLevel {
    /// The highest tier the provider defines.
    pub const HIGHEST: AccessLevel = AccessLevel::Admin;

    /// The provider's numeric ordinal for this tier.
    pub fn ordinal(&self) -> u64 {
        match self {
            AccessLevel::NoAccess => 0,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Admin => 60,
        }
    }
}

impl TryFrom<u64> for AccessLevel {
    type Error = TypeError;

    fn try_from(ordinal: u64) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(AccessLevel::NoAccess),
            30 => Ok(AccessLevel::Developer),
            40 => Ok(AccessLevel::Maintainer),
            60 => Ok(AccessLevel::Admin),
            other => Err(TypeError::InvalidAccessLevel(other)),
        }
    }
}

/// Provider-assigned numeric namespace identifier.
///
/// Resolved once per run from a namespace name and used only to parameterize
/// project creation; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub u64);

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A namespace as returned by the provider's namespace search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Namespace {
    /// Provider-assigned identifier
    pub id: NamespaceId,
    /// Last path segment (e.g. "acme")
    pub path: String,
    /// Full path including parent groups (e.g. "corp/acme")
    pub full_path: String,
    /// Namespace kind ("group" or "user")
    pub kind: String,
}

/// Observed or created remote project state.
///
/// Deserialized directly from the provider's project representation. The
/// identifier is provider-assigned and stable for the project's lifetime;
/// the remaining fields are the mutable attributes reconciliation may update
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProject {
    /// Provider-assigned numeric identifier
    pub id: u64,
    /// Full project path ("namespace/name")
    pub path_with_namespace: String,
    /// Project description (may be absent)
    #[serde(default)]
    pub description: Option<String>,
    /// Project visibility
    pub visibility: Visibility,
    /// Default branch; absent on repositories with no commits
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A branch protection rule as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionRule {
    /// Protected branch name
    pub branch: String,
    /// Minimum tier allowed to push
    pub push_access: AccessLevel,
    /// Minimum tier allowed to merge
    pub merge_access: AccessLevel,
    /// Whether history-rewriting pushes are allowed
    pub allow_force_push: bool,
}

impl ProtectionRule {
    /// The rule mirroring requires on the default branch: both access levels
    /// at the highest tier, force-push allowed.
    pub fn mirror_target(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            push_access: AccessLevel::HIGHEST,
            merge_access: AccessLevel::HIGHEST,
            allow_force_push: true,
        }
    }
}

/// Validated desired state for one project.
///
/// Immutable after construction. Namespace and name are guaranteed
/// non-empty; the reconciler and forge layers rely on that.
///
/// # Example
///
/// ```
/// use glmirror::core::types::{ProjectSpec, Visibility};
///
/// let spec = ProjectSpec::new("acme", "svc", "", Visibility::Private, "main").unwrap();
/// assert_eq!(spec.path(), "acme/svc");
///
/// assert!(ProjectSpec::new("", "svc", "", Visibility::Private, "main").is_err());
/// assert!(ProjectSpec::new("acme", "", "", Visibility::Private, "main").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    namespace: String,
    name: String,
    description: String,
    visibility: Visibility,
    default_branch: String,
}

impl ProjectSpec {
    /// Create a new validated project spec.
    ///
    /// # Errors
    ///
    /// Returns `TypeError` if the namespace or name is empty or contains
    /// whitespace, or if the default branch is empty.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        visibility: Visibility,
        default_branch: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let namespace = namespace.into();
        let name = name.into();
        let default_branch = default_branch.into();

        if namespace.trim().is_empty() {
            return Err(TypeError::InvalidNamespace(
                "namespace cannot be empty".into(),
            ));
        }
        if namespace.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidNamespace(
                "namespace cannot contain whitespace".into(),
            ));
        }
        if name.trim().is_empty() {
            return Err(TypeError::InvalidProjectName(
                "project name cannot be empty".into(),
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidProjectName(
                "project name cannot contain whitespace".into(),
            ));
        }
        if default_branch.is_empty() {
            return Err(TypeError::InvalidDefaultBranch(
                "default branch cannot be empty".into(),
            ));
        }

        Ok(Self {
            namespace,
            name,
            description: description.into(),
            visibility,
            default_branch,
        })
    }

    /// Namespace (group or user) the project lives under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Desired project description (may be empty).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Desired visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Default branch to reconcile and protect.
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Full project path ("namespace/name").
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}
