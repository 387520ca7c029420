//! 持久化记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::{AnalysisReport, Platform};

/// 已保存的分析
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: u64,
    pub platform: Platform,
    pub containers_analyzed: usize,
    pub conflicts_found: usize,
    pub created_at: DateTime<Utc>,
    pub result: AnalysisReport,
}

impl StoredAnalysis {
    /// 列表视图（不含完整报告）
    pub fn row(&self) -> AnalysisRow {
        AnalysisRow {
            id: self.id,
            platform: self.platform,
            containers_analyzed: self.containers_analyzed,
            conflicts_found: self.conflicts_found,
            created_at: self.created_at,
        }
    }
}

/// 分析列表条目
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRow {
    pub id: u64,
    pub platform: Platform,
    pub containers_analyzed: usize,
    pub conflicts_found: usize,
    pub created_at: DateTime<Utc>,
}

/// 用户保存的映射决策
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedMapping {
    pub id: u64,
    /// 原样保存的映射内容
    pub mapping: serde_json::Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
