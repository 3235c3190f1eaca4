//! HTTP-level tests for the GitLab forge implementation.
//!
//! These tests run GitLabForge against a wiremock server and verify the
//! request shapes (paths, auth header, JSON bodies) and the status-class
//! error mapping, in particular that 404 is the only status ever read as
//! absence.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glmirror::core::types::{NamespaceId, ProjectSpec, ProtectionRule, Visibility};
use glmirror::forge::gitlab::GitLabForge;
use glmirror::forge::{Forge, ForgeError};

const TOKEN: &str = "glpat-test-token";

fn forge_for(server: &MockServer) -> GitLabForge {
    GitLabForge::with_api_base("gitlab.test", TOKEN, format!("{}/api/v4", server.uri()))
}

fn project_json() -> serde_json::Value {
    json!({
        "id": 42,
        "path_with_namespace": "acme/svc",
        "description": "mirror of svc",
        "visibility": "private",
        "default_branch": "main"
    })
}

fn spec() -> ProjectSpec {
    ProjectSpec::new("acme", "svc", "mirror of svc", Visibility::Private, "main").unwrap()
}

// =============================================================================
// Project lookup
// =============================================================================

mod project_by_path {
    use super::*;

    #[tokio::test]
    async fn found_project_is_deserialized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/acme%2Fsvc"))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(project_json()))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let project = forge.project_by_path("acme/svc").await.unwrap().unwrap();

        assert_eq!(project.id, 42);
        assert_eq!(project.path_with_namespace, "acme/svc");
        assert_eq!(project.visibility, Visibility::Private);
        assert_eq!(project.default_branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn not_found_is_absence_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/acme%2Fsvc"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "404 Project Not Found"})),
            )
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let result = forge.project_by_path("acme/svc").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn auth_failure_is_an_error_not_absence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/acme%2Fsvc"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "401 Unauthorized"})),
            )
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.project_by_path("acme/svc").await.unwrap_err();

        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn server_error_is_an_error_not_absence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/acme%2Fsvc"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.project_by_path("acme/svc").await.unwrap_err();

        assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/acme%2Fsvc"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.project_by_path("acme/svc").await.unwrap_err();

        assert!(matches!(err, ForgeError::RateLimited));
    }
}

// =============================================================================
// Namespace search
// =============================================================================

mod search_namespaces {
    use super::*;

    #[tokio::test]
    async fn sends_search_query_and_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/namespaces"))
            .and(query_param("search", "acme"))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 7, "path": "acme", "full_path": "acme", "kind": "group"},
                {"id": 9, "path": "acme-labs", "full_path": "acme-labs", "kind": "group"}
            ])))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let namespaces = forge.search_namespaces("acme").await.unwrap();

        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[0].id, NamespaceId(7));
        assert_eq!(namespaces[0].kind, "group");
        assert_eq!(namespaces[1].path, "acme-labs");
    }

    #[tokio::test]
    async fn empty_result_set_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let namespaces = forge.search_namespaces("nobody").await.unwrap();

        assert!(namespaces.is_empty());
    }
}

// =============================================================================
// Project creation and settings
// =============================================================================

mod create_and_update {
    use super::*;

    #[tokio::test]
    async fn create_sends_namespace_visibility_and_no_readme() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects"))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .and(body_partial_json(json!({
                "name": "svc",
                "namespace_id": 7,
                "description": "mirror of svc",
                "visibility": "private",
                "default_branch": "main",
                "initialize_with_readme": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(project_json()))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let project = forge.create_project(NamespaceId(7), &spec()).await.unwrap();

        assert_eq!(project.id, 42);
    }

    #[tokio::test]
    async fn create_rejection_surfaces_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": {"name": ["has already been taken"]}
            })))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.create_project(NamespaceId(7), &spec()).await.unwrap_err();

        match err {
            ForgeError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("has already been taken"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_sends_exactly_description_and_default_branch() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v4/projects/42"))
            .and(body_partial_json(json!({
                "description": "mirror of svc",
                "default_branch": "main"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(project_json()))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        forge
            .update_project(42, "mirror of svc", "main")
            .await
            .unwrap();
    }
}

// =============================================================================
// Branch protection
// =============================================================================

mod protection {
    use super::*;

    #[tokio::test]
    async fn unprotect_deletes_the_rule() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v4/projects/42/protected_branches/main"))
            .and(header("PRIVATE-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        forge.unprotect_branch(42, "main").await.unwrap();
    }

    #[tokio::test]
    async fn unprotect_missing_rule_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v4/projects/42/protected_branches/main"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"message": "404 Protected Branch Not Found"})),
            )
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.unprotect_branch(42, "main").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn protect_requests_force_push_at_highest_tier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/protected_branches"))
            .and(body_partial_json(json!({
                "name": "main",
                "push_access_level": 60,
                "merge_access_level": 60,
                "allow_force_push": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1,
                "name": "main",
                "push_access_levels": [{"id": 1, "access_level": 60}],
                "merge_access_levels": [{"id": 2, "access_level": 60}],
                "allow_force_push": true
            })))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let rule = forge.protect_branch(42, "main").await.unwrap();

        assert_eq!(rule, ProtectionRule::mirror_target("main"));
    }

    #[tokio::test]
    async fn protect_conflict_surfaces_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/protected_branches"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "Protected branch 'main' already exists"
            })))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        let err = forge.protect_branch(42, "main").await.unwrap_err();

        assert!(matches!(err, ForgeError::ApiError { status: 409, .. }));
    }

    #[tokio::test]
    async fn branch_with_slash_is_encoded_in_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v4/projects/42/protected_branches/release%2Fv1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let forge = forge_for(&server);
        forge.unprotect_branch(42, "release/v1").await.unwrap();
    }
}
