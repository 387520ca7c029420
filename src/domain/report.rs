//! 分析报告领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conflict::{Conflict, Severity};
use super::container::{ContainerRecord, ManualPathEntry};

/// 主机平台
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Wsl2,
    Unraid,
    Synology,
    Linux,
    Docker,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Wsl2 => "wsl2",
            Platform::Unraid => "unraid",
            Platform::Synology => "synology",
            Platform::Linux => "linux",
            Platform::Docker => "docker",
            Platform::Unknown => "unknown",
        }
    }

    /// 从字符串解析，无法识别返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Some(Platform::Windows),
            "wsl2" | "wsl" => Some(Platform::Wsl2),
            "unraid" => Some(Platform::Unraid),
            "synology" => Some(Platform::Synology),
            "linux" => Some(Platform::Linux),
            "docker" => Some(Platform::Docker),
            "unknown" => Some(Platform::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 建议优先级
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Info,
}

/// 修复建议
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl Recommendation {
    pub fn new(
        priority: Priority,
        title: impl Into<String>,
        description: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            title: title.into(),
            description: description.into(),
            action: action.into(),
            examples: Vec::new(),
        }
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }
}

/// 硬链接安全目录布局模板
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutTemplate {
    Standard,
    Unraid,
    Synology,
}

/// 硬链接安全布局建议
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HardlinkLayout {
    pub template: LayoutTemplate,
    /// 单一根目录
    pub root: String,
    /// 目录树（多行文本）
    pub structure: String,
    /// 各容器的卷映射示例
    pub volume_mapping: Vec<String>,
    pub explanation: String,
}

/// 单个 *arr 应用的配置探测结果
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArrConfig {
    pub container_name: String,
    pub app_type: String,
    pub config_path: Option<String>,
    pub detected_root_folder: Option<String>,
    pub download_paths: Vec<String>,
    pub issues: Vec<String>,
}

/// 分析状态
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Healthy,
    NeedsAttention,
}

/// 分析摘要
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    pub platform_detected: Platform,
    pub containers_analyzed: usize,
    pub manual_paths_analyzed: usize,
    /// 高严重程度冲突数
    pub conflicts_found: usize,
    /// 中等严重程度冲突数
    pub warnings_found: usize,
    pub status: AnalysisStatus,
}

impl AnalysisSummary {
    pub fn build(
        platform: Platform,
        containers: usize,
        manual_paths: usize,
        conflicts: &[Conflict],
    ) -> Self {
        let conflicts_found = conflicts
            .iter()
            .filter(|c| c.severity == Severity::High)
            .count();
        let warnings_found = conflicts
            .iter()
            .filter(|c| c.severity == Severity::Medium)
            .count();

        Self {
            platform_detected: platform,
            containers_analyzed: containers,
            manual_paths_analyzed: manual_paths,
            conflicts_found,
            warnings_found,
            status: if conflicts_found == 0 {
                AnalysisStatus::Healthy
            } else {
                AnalysisStatus::NeedsAttention
            },
        }
    }
}

/// 完整分析报告，生成后不再修改
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub platform: Platform,
    pub containers: Vec<ContainerRecord>,
    pub manual_paths: Vec<ManualPathEntry>,
    pub conflicts: Vec<Conflict>,
    pub recommendations: Vec<Recommendation>,
    pub hardlink_layout: HardlinkLayout,
    #[serde(default)]
    pub arr_configs: Vec<ArrConfig>,
    pub summary: AnalysisSummary,
    pub analyzed_at: DateTime<Utc>,
}

/// 仅建议部分的报告快照
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RecommendationSnapshot {
    pub platform: Platform,
    pub recommendations: Vec<Recommendation>,
    pub conflicts: Vec<Conflict>,
    pub hardlink_layout: HardlinkLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conflict::ConflictKind;

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("Unraid"), Some(Platform::Unraid));
        assert_eq!(Platform::parse(" wsl "), Some(Platform::Wsl2));
        assert_eq!(Platform::parse("beos"), None);
        assert_eq!(Platform::Synology.to_string(), "synology");
    }

    #[test]
    fn test_summary_status_ignores_warnings() {
        let warning = Conflict::new(
            ConflictKind::PermissionWarning {
                container: "sonarr".into(),
            },
            "",
            None,
        );
        let summary = AnalysisSummary::build(Platform::Docker, 2, 0, &[warning]);
        assert_eq!(summary.status, AnalysisStatus::Healthy);
        assert_eq!(summary.warnings_found, 1);
        assert_eq!(summary.conflicts_found, 0);
    }
}
