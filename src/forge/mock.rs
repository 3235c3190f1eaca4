//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides an in-memory implementation of the `Forge` trait.
//! It models the provider state the reconciler cares about: projects keyed
//! by path, the branches that actually exist in each repository (a freshly
//! created project has none until the first push), and one protection rule
//! per branch. Failure scenarios are injected per operation and every call
//! is recorded for verification.
//!
//! # Example
//!
//! ```
//! use glmirror::forge::mock::MockForge;
//! use glmirror::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_namespace(7, "acme", "acme", "group");
//!
//! let found = forge.project_by_path("acme/svc").await.unwrap();
//! assert!(found.is_none());
//!
//! let namespaces = forge.search_namespaces("acme").await.unwrap();
//! assert_eq!(namespaces.len(), 1);
//! # });
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{Forge, ForgeError};
use crate::core::types::{
    Namespace, NamespaceId, ProjectSpec, ProtectionRule, RemoteProject, Visibility,
};

/// Host used for mock repository URLs.
const MOCK_HOST: &str = "gitlab.test";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Known namespaces, returned by substring search.
    namespaces: Vec<Namespace>,
    /// Projects keyed by full path.
    projects: HashMap<String, RemoteProject>,
    /// Branches that exist in each project's repository.
    branches: HashMap<u64, HashSet<String>>,
    /// Protection rules per project, keyed by branch name.
    rules: HashMap<u64, HashMap<String, ProtectionRule>>,
    /// Next project id to assign.
    next_project_id: u64,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail project_by_path with the given error.
    ProjectByPath(ForgeError),
    /// Fail search_namespaces with the given error.
    SearchNamespaces(ForgeError),
    /// Fail create_project with the given error.
    CreateProject(ForgeError),
    /// Fail update_project with the given error.
    UpdateProject(ForgeError),
    /// Fail unprotect_branch with the given error.
    UnprotectBranch(ForgeError),
    /// Fail protect_branch with the given error.
    ProtectBranch(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ProjectByPath {
        path: String,
    },
    SearchNamespaces {
        name: String,
    },
    CreateProject {
        namespace: NamespaceId,
        path: String,
    },
    UpdateProject {
        project_id: u64,
        description: String,
        default_branch: String,
    },
    UnprotectBranch {
        project_id: u64,
        branch: String,
    },
    ProtectBranch {
        project_id: u64,
        branch: String,
    },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                namespaces: Vec::new(),
                projects: HashMap::new(),
                branches: HashMap::new(),
                rules: HashMap::new(),
                next_project_id: 1,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Add a known namespace.
    pub fn with_namespace(
        self,
        id: u64,
        path: impl Into<String>,
        full_path: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.namespaces.push(Namespace {
                id: NamespaceId(id),
                path: path.into(),
                full_path: full_path.into(),
                kind: kind.into(),
            });
        }
        self
    }

    /// Add a pre-existing project.
    ///
    /// The project's default branch (when present) is seeded as an existing
    /// repository branch, matching a project that has received pushes.
    pub fn with_project(self, project: RemoteProject) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.next_project_id = inner.next_project_id.max(project.id + 1);
            if let Some(branch) = project.default_branch.clone() {
                inner.branches.entry(project.id).or_default().insert(branch);
            }
            inner
                .projects
                .insert(project.path_with_namespace.clone(), project);
        }
        self
    }

    /// Add a pre-existing protection rule for a project branch.
    pub fn with_rule(self, project_id: u64, rule: ProtectionRule) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner
                .rules
                .entry(project_id)
                .or_default()
                .insert(rule.branch.clone(), rule);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use glmirror::forge::mock::{FailOn, MockForge};
    /// use glmirror::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::ProjectByPath(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Make a repository branch exist, as a push to the project would.
    pub fn add_branch(&self, project_id: u64, branch: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .branches
            .entry(project_id)
            .or_default()
            .insert(branch.into());
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Get a project by path (for test verification).
    pub fn project(&self, path: &str) -> Option<RemoteProject> {
        let inner = self.inner.lock().unwrap();
        inner.projects.get(path).cloned()
    }

    /// Get the protection rule for a project branch (for test verification).
    pub fn rule(&self, project_id: u64, branch: &str) -> Option<ProtectionRule> {
        let inner = self.inner.lock().unwrap();
        inner
            .rules
            .get(&project_id)
            .and_then(|rules| rules.get(branch))
            .cloned()
    }

    /// Get the count of projects.
    pub fn project_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.projects.len()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail<T>(&self, expected: &str) -> Option<Result<T, ForgeError>> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::ProjectByPath(e)) if expected == "project_by_path" => {
                Some(Err(e.clone()))
            }
            Some(FailOn::SearchNamespaces(e)) if expected == "search_namespaces" => {
                Some(Err(e.clone()))
            }
            Some(FailOn::CreateProject(e)) if expected == "create_project" => Some(Err(e.clone())),
            Some(FailOn::UpdateProject(e)) if expected == "update_project" => Some(Err(e.clone())),
            Some(FailOn::UnprotectBranch(e)) if expected == "unprotect_branch" => {
                Some(Err(e.clone()))
            }
            Some(FailOn::ProtectBranch(e)) if expected == "protect_branch" => Some(Err(e.clone())),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn repo_url(&self, path: &str) -> String {
        format!("https://{}/{}.git", MOCK_HOST, path)
    }

    async fn project_by_path(&self, path: &str) -> Result<Option<RemoteProject>, ForgeError> {
        self.record(MockOperation::ProjectByPath {
            path: path.to_string(),
        });
        if let Some(result) = self.check_fail("project_by_path") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.projects.get(path).cloned())
    }

    async fn search_namespaces(&self, name: &str) -> Result<Vec<Namespace>, ForgeError> {
        self.record(MockOperation::SearchNamespaces {
            name: name.to_string(),
        });
        if let Some(result) = self.check_fail("search_namespaces") {
            return result;
        }

        // Provider search is a substring match; exact selection is the
        // caller's job.
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .namespaces
            .iter()
            .filter(|ns| ns.path.contains(name) || ns.full_path.contains(name))
            .cloned()
            .collect())
    }

    async fn create_project(
        &self,
        namespace: NamespaceId,
        spec: &ProjectSpec,
    ) -> Result<RemoteProject, ForgeError> {
        self.record(MockOperation::CreateProject {
            namespace,
            path: spec.path(),
        });
        if let Some(result) = self.check_fail("create_project") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.projects.contains_key(&spec.path()) {
            return Err(ForgeError::ApiError {
                status: 400,
                message: "name has already been taken".to_string(),
            });
        }

        let id = inner.next_project_id;
        inner.next_project_id += 1;

        // A new project records its default branch attribute but has no
        // repository branches until the first push.
        let project = RemoteProject {
            id,
            path_with_namespace: spec.path(),
            description: Some(spec.description().to_string()),
            visibility: spec.visibility(),
            default_branch: Some(spec.default_branch().to_string()),
        };
        inner.projects.insert(spec.path(), project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: u64,
        description: &str,
        default_branch: &str,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateProject {
            project_id,
            description: description.to_string(),
            default_branch: default_branch.to_string(),
        });
        if let Some(result) = self.check_fail("update_project") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        let project = inner
            .projects
            .values_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| ForgeError::NotFound(format!("project {}", project_id)))?;

        project.description = Some(description.to_string());
        project.default_branch = Some(default_branch.to_string());
        Ok(())
    }

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), ForgeError> {
        self.record(MockOperation::UnprotectBranch {
            project_id,
            branch: branch.to_string(),
        });
        if let Some(result) = self.check_fail("unprotect_branch") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        let removed = inner
            .rules
            .get_mut(&project_id)
            .and_then(|rules| rules.remove(branch));

        match removed {
            Some(_) => Ok(()),
            None => Err(ForgeError::NotFound(format!(
                "protected branch '{}'",
                branch
            ))),
        }
    }

    async fn protect_branch(
        &self,
        project_id: u64,
        branch: &str,
    ) -> Result<ProtectionRule, ForgeError> {
        self.record(MockOperation::ProtectBranch {
            project_id,
            branch: branch.to_string(),
        });
        if let Some(result) = self.check_fail("protect_branch") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();

        let branch_exists = inner
            .branches
            .get(&project_id)
            .is_some_and(|branches| branches.contains(branch));
        if !branch_exists {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("branch '{}' does not exist", branch),
            });
        }

        let rules = inner.rules.entry(project_id).or_default();
        if rules.contains_key(branch) {
            return Err(ForgeError::ApiError {
                status: 409,
                message: format!("protected branch '{}' already exists", branch),
            });
        }

        let rule = ProtectionRule::mirror_target(branch);
        rules.insert(branch.to_string(), rule.clone());
        Ok(rule)
    }
}

/// Convenience constructor for a pre-existing project in tests.
pub fn existing_project(
    id: u64,
    path: &str,
    description: Option<&str>,
    visibility: Visibility,
    default_branch: Option<&str>,
) -> RemoteProject {
    RemoteProject {
        id,
        path_with_namespace: path.to_string(),
        description: description.map(str::to_string),
        visibility,
        default_branch: default_branch.map(str::to_string),
    }
}
