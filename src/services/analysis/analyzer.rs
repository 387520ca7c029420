//! 分析编排
//!
//! 平台推断一次，然后依次运行冲突检测和建议生成，组装为一份报告

use chrono::Utc;

use crate::config::AnalysisSettings;
use crate::domain::{
    AnalysisReport, AnalysisSummary, Conflict, ContainerRecord, ManualPathEntry, Platform,
    Recommendation, RecommendationSnapshot,
};

use super::arr_config::detect_arr_configs;
use super::conflicts::ConflictDetector;
use super::platform::classify;
use super::recommend;

/// 路径分析器
///
/// 持有一次分析的输入快照；平台在构造时推断，可被调用方覆盖
pub struct PathAnalyzer {
    containers: Vec<ContainerRecord>,
    manual_paths: Vec<ManualPathEntry>,
    settings: AnalysisSettings,
    platform: Platform,
}

impl PathAnalyzer {
    pub fn new(
        containers: Vec<ContainerRecord>,
        manual_paths: Vec<ManualPathEntry>,
        settings: AnalysisSettings,
    ) -> Self {
        let inferred = classify(
            containers
                .iter()
                .flat_map(|c| c.volumes.values())
                .chain(manual_paths.iter().map(|m| &m.host_path)),
        );
        // 路径无法判断时采用手动条目声明的平台
        let platform = match inferred {
            Platform::Unknown => manual_paths
                .iter()
                .filter_map(|m| m.platform_hint.as_deref())
                .filter_map(Platform::parse)
                .find(|p| *p != Platform::Unknown)
                .unwrap_or(Platform::Unknown),
            platform => platform,
        };

        Self {
            containers,
            manual_paths,
            settings,
            platform,
        }
    }

    /// 用调用方提供的平台覆盖推断结果
    pub fn with_platform_hint(mut self, hint: Option<Platform>) -> Self {
        if let Some(platform) = hint {
            self.platform = platform;
        }
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        ConflictDetector::new(&self.containers, &self.manual_paths, &self.settings).detect()
    }

    pub fn recommendations(&self, conflicts: &[Conflict]) -> Vec<Recommendation> {
        recommend::generate(self.platform, conflicts)
    }

    /// 组装最终报告
    pub fn into_report(
        self,
        conflicts: Vec<Conflict>,
        recommendations: Vec<Recommendation>,
    ) -> AnalysisReport {
        let summary = AnalysisSummary::build(
            self.platform,
            self.containers.len(),
            self.manual_paths.len(),
            &conflicts,
        );

        AnalysisReport {
            platform: self.platform,
            hardlink_layout: recommend::hardlink_layout(self.platform),
            arr_configs: detect_arr_configs(&self.containers),
            containers: self.containers,
            manual_paths: self.manual_paths,
            conflicts,
            recommendations,
            summary,
            analyzed_at: Utc::now(),
        }
    }

    /// 一次性完成全部分析
    pub fn analyze(self) -> AnalysisReport {
        let conflicts = self.detect_conflicts();
        let recommendations = self.recommendations(&conflicts);
        self.into_report(conflicts, recommendations)
    }

    /// 只需要建议部分时使用
    pub fn snapshot(&self) -> RecommendationSnapshot {
        let conflicts = self.detect_conflicts();
        RecommendationSnapshot {
            platform: self.platform,
            recommendations: self.recommendations(&conflicts),
            hardlink_layout: recommend::hardlink_layout(self.platform),
            conflicts,
        }
    }
}

/// 同步生成建议快照
pub fn run_recommendations_now(
    containers: Vec<ContainerRecord>,
    manual_paths: Vec<ManualPathEntry>,
    settings: &AnalysisSettings,
) -> RecommendationSnapshot {
    PathAnalyzer::new(containers, manual_paths, settings.clone()).snapshot()
}
