//! 手动路径 API
//!
//! 包含 /api/manual-paths/* 端点。手动路径不依赖运行中的容器，
//! 在分析时与容器卷一起参与目标路径冲突检测和平台推断。

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::domain::{ManualPathEntry, Platform};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 创建手动路径路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/manual-paths", get(list_manual_paths).post(add_manual_path))
        .route("/api/manual-paths/batch", post(add_manual_paths))
        .route("/api/manual-paths/:id", delete(delete_manual_path))
}

#[derive(Debug, Serialize)]
struct ManualPathsResponse {
    manual_paths: Vec<ManualPathEntry>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    manual_paths: Vec<ManualPathEntry>,
    total: usize,
    /// 本次新增数量
    count: usize,
}

/// 批量添加请求
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(alias = "entries")]
    pub paths: Vec<ManualPathEntry>,
    /// 为未指定平台的条目统一设置
    #[serde(default, alias = "platform")]
    pub platform_hint: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: bool,
    id: u64,
}

/// 校验单个条目
fn validate(entry: &ManualPathEntry) -> ApiResult<()> {
    if entry.host_path.trim().is_empty() {
        return Err(ApiError::bad_request("host_path is required"));
    }
    if entry.container_path.trim().is_empty() {
        return Err(ApiError::bad_request("container_path is required"));
    }
    if !entry.container_path.starts_with('/') {
        return Err(ApiError::bad_request(format!(
            "container_path must be absolute: '{}'",
            entry.container_path
        )));
    }
    if let Some(hint) = entry.platform_hint.as_deref() {
        if Platform::parse(hint).is_none() {
            return Err(ApiError::bad_request(format!("Unknown platform '{}'", hint)));
        }
    }
    Ok(())
}

/// 列出手动路径
///
/// GET /api/manual-paths
async fn list_manual_paths(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ManualPathsResponse>> {
    let manual_paths = state.store.get_manual_paths().await?;
    Ok(Json(ManualPathsResponse {
        total: manual_paths.len(),
        manual_paths,
    }))
}

/// 添加手动路径
///
/// POST /api/manual-paths
async fn add_manual_path(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<ManualPathEntry>,
) -> ApiResult<Json<ManualPathEntry>> {
    validate(&entry)?;
    let saved = state.store.add_manual_path(entry).await?;
    info!(id = ?saved.id, container = %saved.origin_name(), "Added manual path");
    Ok(Json(saved))
}

/// 批量添加手动路径，任一条目无效时整体拒绝
///
/// POST /api/manual-paths/batch
async fn add_manual_paths(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    if request.paths.is_empty() {
        return Err(ApiError::bad_request("paths must not be empty"));
    }

    let entries: Vec<ManualPathEntry> = request
        .paths
        .into_iter()
        .map(|mut entry| {
            if entry.platform_hint.is_none() {
                entry.platform_hint = request.platform_hint.clone();
            }
            entry
        })
        .collect();
    for entry in &entries {
        validate(entry)?;
    }

    let manual_paths = state.store.add_manual_paths(entries).await?;
    info!(count = manual_paths.len(), "Added manual paths");
    Ok(Json(BatchResponse {
        total: manual_paths.len(),
        count: manual_paths.len(),
        manual_paths,
    }))
}

/// 删除手动路径
///
/// DELETE /api/manual-paths/:id
async fn delete_manual_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.store.delete_manual_path(id).await? {
        return Err(ApiError::not_found(format!("Manual path {}", id)));
    }
    Ok(Json(DeleteResponse { deleted: true, id }))
}
