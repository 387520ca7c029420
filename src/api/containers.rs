//! 容器 API
//!
//! 包含 /api/containers, /api/arr-configs 端点

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::container::ContainersResponse;
use crate::domain::ArrConfig;
use crate::error::ApiResult;
use crate::services::analysis::detect_arr_configs;
use crate::state::AppState;

/// 创建容器路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/containers", get(list_containers))
        .route("/api/arr-configs", get(arr_configs))
}

/// 列出容器及其卷挂载
///
/// GET /api/containers
/// Docker 不可达时返回 503
async fn list_containers(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ContainersResponse>> {
    let containers = state
        .discovery
        .list_containers(state.config.include_stopped)
        .await?;
    info!(count = containers.len(), "Listed containers");

    Ok(Json(ContainersResponse {
        total: containers.len(),
        containers,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
struct ArrConfigsResponse {
    arr_configs: Vec<ArrConfig>,
    total: usize,
}

/// *arr 应用配置探测
///
/// GET /api/arr-configs
async fn arr_configs(State(state): State<Arc<AppState>>) -> ApiResult<Json<ArrConfigsResponse>> {
    let containers = state
        .discovery
        .list_containers(state.config.include_stopped)
        .await?;
    let arr_configs = detect_arr_configs(&containers);

    Ok(Json(ArrConfigsResponse {
        total: arr_configs.len(),
        arr_configs,
    }))
}
