//! 分析任务领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::AnalysisReport;

/// 分析任务状态
///
/// queued → detecting → analyzing → complete | error
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Detecting,
    Analyzing,
    Complete,
    Error,
}

impl JobStatus {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Detecting => "detecting",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// 状态机中的位置，两个终态同级
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Detecting => 1,
            JobStatus::Analyzing => 2,
            JobStatus::Complete | JobStatus::Error => 3,
        }
    }

    /// 是否允许从当前状态转换到 `next`（允许保持同一状态以更新进度）
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }
}

/// 分析任务
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result: Option<AnalysisReport>,
    /// 持久化后的分析 ID
    pub analysis_id: Option<u64>,
    /// 调用方提供的平台提示
    pub platform_hint: Option<String>,
}

impl Job {
    /// 创建排队中的任务
    pub fn new(id: String, platform_hint: Option<String>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            result: None,
            analysis_id: None,
            platform_hint,
        }
    }

    /// 事件流中的快照
    pub fn event(&self) -> JobEvent {
        JobEvent {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
            analysis_id: self.analysis_id,
            result: if self.status == JobStatus::Complete {
                self.result.clone()
            } else {
                None
            },
        }
    }
}

/// 任务事件（部分任务快照）
#[derive(Clone, Debug, Serialize)]
pub struct JobEvent {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisReport>,
}

impl JobEvent {
    /// 可观察字段是否与另一个快照不同
    pub fn differs_from(&self, other: &JobEvent) -> bool {
        self.status != other.status
            || self.progress != other.progress
            || self.error != other.error
            || self.analysis_id != other.analysis_id
    }
}
