//! 历史记录 API
//!
//! 包含 /api/analyses/*, /api/save-mapping, /api/mappings 端点

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::env::constants::{DEFAULT_ANALYSES_LIMIT, MAX_ANALYSES_LIMIT};
use crate::domain::{AnalysisRow, SavedMapping, StoredAnalysis};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 创建历史记录路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analyses", get(list_analyses))
        .route("/api/analyses/:id", get(get_analysis))
        .route("/api/save-mapping", post(save_mapping))
        .route("/api/mappings", get(list_mappings))
}

#[derive(Debug, Deserialize)]
pub struct AnalysesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_ANALYSES_LIMIT
}

#[derive(Debug, Serialize)]
struct AnalysesResponse {
    analyses: Vec<AnalysisRow>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct SaveMappingResponse {
    status: &'static str,
    id: u64,
    mapping: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct MappingsResponse {
    mappings: Vec<SavedMapping>,
    total: usize,
}

/// 最近的分析
///
/// GET /api/analyses?limit=20
async fn list_analyses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysesQuery>,
) -> ApiResult<Json<AnalysesResponse>> {
    let limit = query.limit.clamp(1, MAX_ANALYSES_LIMIT);
    let analyses = state.store.list_analyses(limit).await?;
    Ok(Json(AnalysesResponse {
        total: analyses.len(),
        analyses,
    }))
}

/// 单个分析（含完整报告）
///
/// GET /api/analyses/:id
async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<StoredAnalysis>> {
    state
        .store
        .get_analysis(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Analysis {}", id)))
}

/// 保存映射决策
///
/// POST /api/save-mapping
/// 请求体为 `{mapping, notes?}`；没有 `mapping` 字段时整个请求体作为映射保存
async fn save_mapping(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<SaveMappingResponse>> {
    let notes = body
        .get("notes")
        .and_then(|n| n.as_str())
        .map(str::to_string);
    let mapping = body.get("mapping").cloned().unwrap_or(body);

    let saved = state.store.save_mapping(mapping, notes).await?;
    info!(mapping_id = saved.id, "Saved mapping");

    Ok(Json(SaveMappingResponse {
        status: "saved",
        id: saved.id,
        mapping: saved.mapping,
        notes: saved.notes,
        timestamp: saved.created_at,
    }))
}

/// 已保存的映射，最新在前
///
/// GET /api/mappings
async fn list_mappings(State(state): State<Arc<AppState>>) -> ApiResult<Json<MappingsResponse>> {
    let mappings = state.store.list_mappings().await?;
    Ok(Json(MappingsResponse {
        total: mappings.len(),
        mappings,
    }))
}
