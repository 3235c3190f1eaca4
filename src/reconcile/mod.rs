//! reconcile
//!
//! The reconciliation logic: observe the remote project's current state and
//! issue the minimal operations to converge it onto a [`ProjectSpec`].
//!
//! # Algorithm
//!
//! 1. Look the project up by path. `None` (a provider-confirmed 404) is the
//!    only signal that creation is needed; any lookup failure is fatal so a
//!    broken query can never cause a duplicate create.
//! 2. On a miss, resolve the namespace to its numeric id (exact-name match
//!    required) and create the project.
//! 3. Push description and default branch onto the project, best-effort.
//! 4. Converge branch protection: remove any existing rule, then create the
//!    desired one (force-push allowed, highest access tiers). Removal before
//!    creation is the one place operation order matters; see
//!    [`reconcile_protection`].
//!
//! Steps 3 and 4 accumulate warnings instead of failing the run; the whole
//! sequence is idempotent and safe to re-run after any partial failure.

use std::fmt;

use thiserror::Error;

use crate::core::types::{NamespaceId, ProjectSpec};
use crate::forge::{Forge, ForgeError};

/// Fatal reconciliation errors.
///
/// Any of these aborts the run: nothing is rolled back, because every step
/// is safe to re-run instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The project lookup could not be completed; existence is unknown.
    #[error("project lookup failed: {0}")]
    Lookup(ForgeError),

    /// The namespace search could not be completed.
    #[error("namespace search failed: {0}")]
    NamespaceSearch(ForgeError),

    /// No namespace matched the requested name exactly.
    #[error("namespace '{name}' not found")]
    NamespaceNotFound { name: String },

    /// More than one namespace matched the requested name exactly.
    #[error("namespace '{name}' is ambiguous: {count} exact matches")]
    NamespaceAmbiguous { name: String, count: usize },

    /// The provider rejected project creation.
    #[error("project creation failed: {0}")]
    Create(ForgeError),
}

/// A non-fatal failure recorded during reconciliation.
///
/// Warnings mark a degraded-but-successful run: the project exists and its
/// identifier is valid, but some advisory step did not converge this time.
#[derive(Debug)]
pub enum Warning {
    /// The settings update failed; description or default branch may drift.
    Settings(ForgeError),

    /// An existing protection rule could not be removed.
    Unprotect { branch: String, error: ForgeError },

    /// The protection rule could not be created.
    Protect { branch: String, error: ForgeError },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Settings(error) => {
                write!(f, "project settings were not updated: {}", error)
            }
            Warning::Unprotect { branch, error } => {
                write!(
                    f,
                    "existing protection rule on '{}' was not removed: {}",
                    branch, error
                )
            }
            Warning::Protect { branch, error } => {
                write!(
                    f,
                    "branch '{}' was not protected (a branch only becomes \
                     protectable after the first push): {}",
                    branch, error
                )
            }
        }
    }
}

/// Result of a successful reconciliation run.
#[derive(Debug)]
pub struct Outcome {
    /// Provider-assigned project identifier
    pub project_id: u64,
    /// Repository push URL for the mirroring pipeline
    pub repo_url: String,
    /// Whether this run created the project
    pub created: bool,
    /// Non-fatal failures recorded along the way
    pub warnings: Vec<Warning>,
}

/// Converge the remote project onto the desired spec.
///
/// Safe to re-run: a second invocation with the same spec observes the state
/// the first one left behind and issues only the operations still needed.
///
/// # Errors
///
/// Returns [`ReconcileError`] when existence cannot be determined, the
/// namespace cannot be resolved unambiguously, or creation is rejected.
/// Settings and protection failures are returned as warnings inside
/// [`Outcome`] instead.
pub async fn reconcile(forge: &dyn Forge, spec: &ProjectSpec) -> Result<Outcome, ReconcileError> {
    let path = spec.path();

    let existing = forge
        .project_by_path(&path)
        .await
        .map_err(ReconcileError::Lookup)?;

    let (project, created) = match existing {
        Some(project) => (project, false),
        None => {
            let namespace = resolve_namespace(forge, spec.namespace()).await?;
            let project = forge
                .create_project(namespace, spec)
                .await
                .map_err(ReconcileError::Create)?;
            (project, true)
        }
    };

    let mut warnings = Vec::new();

    if let Err(error) = forge
        .update_project(project.id, spec.description(), spec.default_branch())
        .await
    {
        warnings.push(Warning::Settings(error));
    }

    reconcile_protection(forge, project.id, spec.default_branch(), &mut warnings).await;

    Ok(Outcome {
        project_id: project.id,
        repo_url: forge.repo_url(&path),
        created,
        warnings,
    })
}

/// Resolve a namespace name to its numeric identifier.
///
/// The provider's search is a substring match, so the result set is filtered
/// down to exact matches on `path` or `full_path`. Exactly one exact match
/// is required: silently picking the first of several candidates could
/// create the project under the wrong owner.
async fn resolve_namespace(
    forge: &dyn Forge,
    name: &str,
) -> Result<NamespaceId, ReconcileError> {
    let candidates = forge
        .search_namespaces(name)
        .await
        .map_err(ReconcileError::NamespaceSearch)?;

    let exact: Vec<_> = candidates
        .iter()
        .filter(|ns| ns.path == name || ns.full_path == name)
        .collect();

    match exact.as_slice() {
        [] => Err(ReconcileError::NamespaceNotFound {
            name: name.to_string(),
        }),
        [ns] => Ok(ns.id),
        many => Err(ReconcileError::NamespaceAmbiguous {
            name: name.to_string(),
            count: many.len(),
        }),
    }
}

/// Converge a branch's protection rule to the mirroring target state.
///
/// The rule is removed and recreated rather than updated in place: the
/// provider does not guarantee an update can alter every field of an
/// existing rule, so replacement is the only transition that converges from
/// any starting state. Removal must come first; creating against a stale
/// rule collides.
///
/// Absence of a prior rule is expected. All other failures become warnings:
/// a commitless project has no branch to protect yet, and the rule will be
/// installed by the next run after the first push.
async fn reconcile_protection(
    forge: &dyn Forge,
    project_id: u64,
    branch: &str,
    warnings: &mut Vec<Warning>,
) {
    match forge.unprotect_branch(project_id, branch).await {
        Ok(()) => {}
        Err(error) if error.is_not_found() => {}
        Err(error) => warnings.push(Warning::Unprotect {
            branch: branch.to_string(),
            error,
        }),
    }

    if let Err(error) = forge.protect_branch(project_id, branch).await {
        warnings.push(Warning::Protect {
            branch: branch.to_string(),
            error,
        });
    }
}
