//! 分析 API
//!
//! 包含 /api/analyze, /api/analyze/jobs/*, /api/recommendations 端点

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Job, JobStatus, Platform};
use crate::error::{AnalysisError, ApiError, ApiResult};
use crate::services::analysis::{recommend, run_recommendations_now};
use crate::state::AppState;

/// 创建分析路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/jobs", post(start_job))
        .route("/api/analyze/jobs/:id", get(get_job))
        .route("/api/analyze/jobs/:id/stream", get(stream_job))
        .route("/api/recommendations", get(recommendations))
}

/// 分析请求（请求体可省略）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    #[serde(alias = "platform")]
    pub platform_hint: Option<String>,
}

impl AnalyzeRequest {
    /// 校验平台提示
    fn platform(&self) -> ApiResult<Option<Platform>> {
        match self.platform_hint.as_deref() {
            None | Some("") => Ok(None),
            Some(hint) => Platform::parse(hint)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown platform '{}'", hint))),
        }
    }
}

/// 启动任务响应
#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub stream_url: String,
}

/// 同步分析
///
/// POST /api/analyze
/// 没有容器时返回 `{status: "no_data"}`
async fn analyze(
    State(state): State<Arc<AppState>>,
    request: Option<Json<AnalyzeRequest>>,
) -> ApiResult<Response> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let platform = request.platform()?;

    match state.pipeline.analyze_now(platform).await {
        Ok((analysis_id, report)) => {
            let mut body = serde_json::to_value(&report)
                .map_err(|e| ApiError::internal(format!("Failed to encode report: {}", e)))?;
            if let Some(obj) = body.as_object_mut() {
                obj.insert("analysis_id".to_string(), json!(analysis_id));
            }
            Ok(Json(body).into_response())
        }
        Err(AnalysisError::NoContainers) => Ok(Json(json!({
            "error": AnalysisError::NoContainers.to_string(),
            "status": "no_data",
        }))
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// 启动后台分析任务
///
/// POST /api/analyze/jobs
async fn start_job(
    State(state): State<Arc<AppState>>,
    request: Option<Json<AnalyzeRequest>>,
) -> ApiResult<Json<StartJobResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    request.platform()?;

    let job_id = state
        .pipeline
        .start(request.platform_hint.filter(|h| !h.is_empty()))
        .await;

    Ok(Json(StartJobResponse {
        stream_url: format!("/api/analyze/jobs/{}/stream", job_id),
        job_id,
        status: JobStatus::Queued,
    }))
}

/// 任务快照
///
/// GET /api/analyze/jobs/:id
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(state.pipeline.get(&job_id).await?))
}

/// 任务事件流（NDJSON，每行一个快照）
///
/// GET /api/analyze/jobs/:id/stream
async fn stream_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let events = state.pipeline.stream_events(&job_id).await?;
    info!(job_id = %job_id, "Job stream opened");

    let lines = events.map(move |event| {
        let mut line = serde_json::to_vec(&event).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode job event");
            Vec::new()
        });
        line.push(b'\n');
        Ok::<_, Infallible>(line)
    });

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(lines),
    )
        .into_response())
}

/// 当前配置的建议
///
/// GET /api/recommendations
/// Docker 不可达时只返回连接建议
async fn recommendations(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let containers = match state
        .discovery
        .list_containers(state.config.include_stopped)
        .await
    {
        Ok(containers) => containers,
        Err(AnalysisError::DiscoveryUnavailable(reason)) => {
            warn!(reason = %reason, "Docker unavailable, returning degraded recommendations");
            return Ok(Json(json!({ "recommendations": recommend::degraded() })).into_response());
        }
        Err(e) => return Err(e.into()),
    };
    let manual_paths = state.store.get_manual_paths().await?;

    let snapshot = run_recommendations_now(containers, manual_paths, &state.config.analysis);
    Ok(Json(snapshot).into_response())
}
