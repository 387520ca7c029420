//! 健康检查和 Docker 状态 API
//!
//! 包含 /health, /api/docker/status 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::infra::DiscoveryStatus;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    uptime_secs: i64,
    docker_connected: bool,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/docker/status", get(docker_status))
}

/// 健康检查
///
/// GET /health
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let docker = state.discovery.status().await;

    Json(HealthResponse {
        status: "healthy",
        service: "maparr",
        version: VERSION,
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.uptime_secs(),
        docker_connected: docker.connected,
    })
}

/// Docker 连接状态
///
/// GET /api/docker/status
async fn docker_status(State(state): State<Arc<AppState>>) -> Json<DiscoveryStatus> {
    Json(state.discovery.status().await)
}
