//! Container session server (spec §4.I): the HTTP surface a
//! [`skill_runtime::executor::ContainerExecutor`] speaks to — `/execute`,
//! `/reset`, `/health`, and CRUD over tools/skills/artifacts/deps — guarded
//! by bearer-token auth that fails closed at startup when no token is
//! configured and auth isn't explicitly disabled (spec I7, scenario S6).
//!
//! Grounded directly in `skill-http::server::{AppState, HttpServerConfig}`
//! and `skill-http::routes::create_app`, generalized from a bespoke
//! skill-install REST API to a thin HTTP façade over `skill_runtime::Session`.

#![warn(missing_docs)]
#![allow(rustdoc::missing_doc_code_examples)]

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use server::{AppState, HttpServer, HttpServerConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use skill_runtime::deps::DepsPolicy;
    use skill_runtime::DepsConfig;
    use skill_runtime::SessionConfig;
    use skill_context::StorageAccess;
    use tower::ServiceExt;

    async fn test_state(dir: &std::path::Path, token: Option<&str>, auth_disabled: bool) -> std::sync::Arc<AppState> {
        let tools_dir = dir.join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        let config = HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            token: token.map(str::to_string),
            auth_disabled,
            session: SessionConfig {
                storage_access: StorageAccess::File { base_path: dir.join("store") },
                tools_path: tools_dir,
                deps_config: DepsConfig { policy: DepsPolicy::Allow, ..Default::default() },
                embedder: None,
                sync_deps_on_start: false,
            },
        };
        AppState::new(config).await.unwrap()
    }

    /// Scenario S6: no token configured and auth not disabled -> startup fails.
    #[tokio::test]
    async fn s6_refuses_to_start_without_auth_configured() {
        let dir = tempfile::tempdir().unwrap();
        let tools_dir = dir.path().join("tools");
        std::fs::create_dir_all(&tools_dir).unwrap();
        let config = HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            token: None,
            auth_disabled: false,
            session: SessionConfig {
                storage_access: StorageAccess::File { base_path: dir.path().join("store") },
                tools_path: tools_dir,
                deps_config: DepsConfig { policy: DepsPolicy::Allow, ..Default::default() },
                embedder: None,
                sync_deps_on_start: false,
            },
        };
        assert!(AppState::new(config).await.is_err());
    }

    /// Scenario S6: missing/bad token -> 401; valid token -> 200 with the
    /// expected execution-result wire form.
    #[tokio::test]
    async fn s6_bearer_auth_gate_on_execute() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Some("T"), false).await;
        let router = routes::build_router(state);

        let unauthed = Request::builder()
            .method("POST")
            .uri("/execute")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"1+1"}"#))
            .unwrap();
        let resp = router.clone().oneshot(unauthed).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let authed = Request::builder()
            .method("POST")
            .uri("/execute")
            .header("content-type", "application/json")
            .header("authorization", "Bearer T")
            .body(Body::from(r#"{"code":"1+1"}"#))
            .unwrap();
        let resp = router.oneshot(authed).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["value"], serde_json::json!(2));
        assert!(json["error"].is_null());
    }

    #[tokio::test]
    async fn health_and_reset_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, true).await;
        let router = routes::build_router(state);

        let resp = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = router
            .oneshot(Request::builder().method("POST").uri("/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn skill_crud_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, true).await;
        let router = routes::build_router(state);

        let create = Request::builder()
            .method("POST")
            .uri("/skills")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"name":"greet","source":"function run(params) return 1 end","description":"says hi"}"#,
            ))
            .unwrap();
        let resp = router.clone().oneshot(create).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let list = Request::builder().uri("/skills").body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(list).await.unwrap();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/skills/greet")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(delete).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
