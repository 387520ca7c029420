//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod analyze;
pub mod containers;
pub mod health;
pub mod history;
pub mod manual_paths;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// 构建完整的 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Docker status
        .merge(health::router())
        // Containers
        .merge(containers::router())
        // Analysis & jobs
        .merge(analyze::router())
        // Manual paths
        .merge(manual_paths::router())
        // Analyses & mappings
        .merge(history::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::domain::ContainerRecord;
    use crate::infra::testing::StaticSource;
    use crate::infra::JsonFileStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(source: StaticSource) -> Router {
        let state = AppState::with_services(
            EnvConfig::default(),
            Arc::new(source),
            Arc::new(JsonFileStore::in_memory()),
        );
        router(Arc::new(state))
    }

    fn media_stack() -> StaticSource {
        StaticSource::new(vec![
            ContainerRecord::new("1", "sonarr", "linuxserver/sonarr", "running")
                .with_volume("/data", "/data/tv"),
            ContainerRecord::new("2", "radarr", "linuxserver/radarr", "running")
                .with_volume("/data", "/data/movies"),
        ])
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(media_stack());
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["docker_connected"], true);
    }

    #[tokio::test]
    async fn test_containers_unavailable_is_503() {
        let app = app(StaticSource::unavailable());
        let (status, body) = send(&app, Method::GET, "/api/containers", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "service_unavailable");

        let (status, body) = send(&app, Method::GET, "/api/docker/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn test_analyze() {
        let app = app(media_stack());
        let (status, body) = send(&app, Method::POST, "/api/analyze", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["status"], "needs_attention");
        assert_eq!(body["conflicts"][0]["type"], "multiple_sources");
        assert_eq!(body["conflicts"][0]["severity"], "high");
        assert_eq!(body["analysis_id"], 1);

        let (status, body) = send(&app, Method::GET, "/api/analyses/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);

        let (status, _) = send(&app, Method::GET, "/api/analyses/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_no_data() {
        let app = app(StaticSource::new(Vec::new()));
        let (status, body) = send(&app, Method::POST, "/api/analyze", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_platform() {
        let app = app(media_stack());
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/analyze/jobs",
            Some(json!({"platform_hint": "beos"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_job_endpoints() {
        let app = app(media_stack());
        let (status, body) = send(&app, Method::POST, "/api/analyze/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "queued");
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(
            body["stream_url"],
            format!("/api/analyze/jobs/{}/stream", job_id)
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/analyze/jobs/{}/stream", job_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let events: Vec<Value> = String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.last().unwrap()["status"], "complete");
        assert_eq!(events.last().unwrap()["progress"], 100);

        let (status, body) =
            send(&app, Method::GET, &format!("/api/analyze/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "complete");

        let (status, _) = send(&app, Method::GET, "/api/analyze/jobs/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, "/api/analyze/jobs/unknown/stream", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recommendations() {
        let app = app(StaticSource::unavailable());
        let (status, body) = send(&app, Method::GET, "/api/recommendations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"][0]["title"], "Connect Docker Socket");

        let app = self::app(media_stack());
        let (_, body) = send(&app, Method::GET, "/api/recommendations", None).await;
        assert_eq!(body["platform"], "docker");
        assert_eq!(body["recommendations"][0]["priority"], "critical");
        assert_eq!(body["hardlink_layout"]["template"], "standard");
    }

    #[tokio::test]
    async fn test_manual_paths() {
        let app = app(StaticSource::new(Vec::new()));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/manual-paths",
            Some(json!({"container_name": "sonarr", "host_path": "/mnt/user/tv", "container_path": "/tv"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/manual-paths",
            Some(json!({"container_name": "sonarr", "host_path": "/mnt/user/tv", "container_path": "tv"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/manual-paths/batch",
            Some(json!({
                "platform": "unraid",
                "paths": [
                    {"container_name": "radarr", "host_path": "/mnt/user/movies", "container_path": "/movies"},
                    {"container_name": "qbit", "host_path": "/mnt/user/dl", "container_path": "/downloads"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["count"], 2);
        assert_eq!(body["manual_paths"][0]["platform_hint"], "unraid");

        let (_, body) = send(&app, Method::GET, "/api/manual-paths", None).await;
        assert_eq!(body["total"], 3);

        // 旧客户端使用 entries 字段
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/manual-paths/batch",
            Some(json!({
                "entries": [
                    {"container_name": "sonarr", "host_path": "/mnt/user/tv4k", "container_path": "/tv4k"},
                    {"container_name": "radarr", "host_path": "/mnt/user/movies4k", "container_path": "/movies4k"}
                ],
                "platform": "linux"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["manual_paths"][1]["platform_hint"], "linux");

        let (_, body) = send(&app, Method::GET, "/api/manual-paths", None).await;
        assert_eq!(body["total"], 5);

        // 仅有手动路径时也能分析
        let (_, body) = send(&app, Method::POST, "/api/analyze", None).await;
        assert_eq!(body["platform"], "unraid");
        assert_eq!(body["summary"]["manual_paths_analyzed"], 5);

        let (status, _) = send(&app, Method::DELETE, "/api/manual-paths/2", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::DELETE, "/api/manual-paths/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mappings() {
        let app = app(media_stack());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/save-mapping",
            Some(json!({"mapping": {"sonarr": "/data"}, "notes": "unify"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "saved");
        assert_eq!(body["mapping"]["sonarr"], "/data");

        send(&app, Method::POST, "/api/save-mapping", Some(json!({"radarr": "/data"}))).await;

        let (_, body) = send(&app, Method::GET, "/api/mappings", None).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["mappings"][0]["mapping"]["radarr"], "/data");
        assert_eq!(body["mappings"][1]["notes"], "unify");
    }
}
