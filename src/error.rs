//! 统一错误处理
//!
//! - `AnalysisError`：分析核心的错误分类
//! - `ApiError`：实现 `IntoResponse`，在 HTTP 边界统一转换

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 分析核心错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// 容器运行时不可达
    #[error("Docker not connected: {0}")]
    DiscoveryUnavailable(String),

    /// 没有可分析的容器
    #[error("No containers found")]
    NoContainers,

    /// 检测或生成建议时出现意外错误
    #[error("Analysis failed: {0}")]
    AnalysisFailure(String),

    /// 未知的任务、分析或手动路径 ID
    #[error("{0} not found")]
    NotFound(String),

    /// 持久化失败
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AnalysisError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 404 - 资源未找到
    NotFound(String),
    /// 400 - 请求无效
    BadRequest(String),
    /// 500 - 内部错误
    Internal(String),
    /// 503 - Docker 不可用
    ServiceUnavailable(String),
}

impl ApiError {
    /// 创建未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 创建服务不可用错误
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::DiscoveryUnavailable(_) => ApiError::ServiceUnavailable(
                "Docker not connected. Check docker socket mount.".to_string(),
            ),
            AnalysisError::NotFound(resource) => ApiError::NotFound(resource),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", resource),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorResponse::new(error_type, message);
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(r) => write!(f, "Not found: {}", r),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
            ApiError::ServiceUnavailable(m) => write!(f, "Service unavailable: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("test_error", "Test message");
        assert_eq!(resp.error, "test_error");
        assert_eq!(resp.message, "Test message");
        assert!(resp.details.is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let resp = ErrorResponse::new("test_error", "Test message").with_details("Extra info");
        assert_eq!(resp.details, Some("Extra info".to_string()));
    }

    #[test]
    fn test_analysis_error_mapping() {
        let api: ApiError = AnalysisError::DiscoveryUnavailable("socket missing".into()).into();
        assert!(matches!(api, ApiError::ServiceUnavailable(_)));

        let api: ApiError = AnalysisError::not_found("Job 'x'").into();
        assert!(matches!(api, ApiError::NotFound(ref r) if r == "Job 'x'"));

        let api: ApiError = AnalysisError::NoContainers.into();
        assert!(matches!(api, ApiError::Internal(_)));
    }

    #[test]
    fn test_analysis_error_display() {
        assert_eq!(AnalysisError::NoContainers.to_string(), "No containers found");
        assert_eq!(
            AnalysisError::not_found("Analysis 7").to_string(),
            "Analysis 7 not found"
        );
    }
}
