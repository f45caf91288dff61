use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::engine::UsageEngine;
use crate::usage::types::UsageSummary;

use super::dto::*;

/// Shared application state
pub struct AppState {
    pub engine: Arc<UsageEngine>,
}

/// Last good snapshot; 503 until the first refresh has produced one
pub async fn get_usage(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.current().await {
        Some(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<UsageSummary>::error("no usage data yet")),
        ),
    }
}

/// Run a refresh pass now
pub async fn refresh_usage(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.refresh().await {
        Ok(summary) => Json(ApiResponse::success(summary)),
        Err(e) => Json(ApiResponse::<UsageSummary>::error(e.to_string())),
    }
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(ConfigDto::from(state.engine.config())))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthDto {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        has_snapshot: state.engine.current().await.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::router::create_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn app(root: &std::path::Path) -> (axum::Router, Arc<UsageEngine>) {
        let mut config = Config::default();
        config.logs.roots = vec![root.to_string_lossy().to_string()];
        config.remote.enabled = false;
        let engine = Arc::new(UsageEngine::from_parts(config, None, None));
        let router = create_router(Arc::new(AppState {
            engine: Arc::clone(&engine),
        }));
        (router, engine)
    }

    async fn call(router: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_usage_before_first_refresh() {
        let dir = tempdir().unwrap();
        let (router, _) = app(dir.path());

        let (status, body) = call(router, Method::GET, "/api/usage").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_refresh_then_get_usage() {
        let dir = tempdir().unwrap();
        let (router, _) = app(dir.path());

        let (status, body) = call(router.clone(), Method::POST, "/api/usage/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["rate_limits"]["session"]["source"], "empty");

        let (status, body) = call(router, Method::GET, "/api/usage").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["today_tokens"], 0);
    }

    #[tokio::test]
    async fn test_config_and_health() {
        let dir = tempdir().unwrap();
        let (router, _) = app(dir.path());

        let (_, body) = call(router.clone(), Method::GET, "/api/config").await;
        assert_eq!(body["data"]["plan"], "pro");
        assert_eq!(body["data"]["session_token_limit"], 44_000);
        assert_eq!(body["data"]["remote_enabled"], false);

        let (status, body) = call(router, Method::GET, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["has_snapshot"], false);
    }
}
