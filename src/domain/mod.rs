//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod conflict;
pub mod container;
pub mod job;
pub mod record;
pub mod report;

// Re-exports for convenience
pub use conflict::{Conflict, ConflictFix, ConflictKind, Severity};
pub use container::{ContainerRecord, ManualPathEntry, VolumeMap};
pub use job::{Job, JobEvent, JobStatus};
pub use record::{AnalysisRow, SavedMapping, StoredAnalysis};
pub use report::{
    AnalysisReport, AnalysisStatus, AnalysisSummary, ArrConfig, HardlinkLayout, LayoutTemplate,
    Platform, Priority, Recommendation, RecommendationSnapshot,
};
