//! 冲突相关领域模型
//!
//! 每种冲突是一个带数据的枚举变体，严重程度只由冲突类型决定

use serde::{Deserialize, Serialize};

/// 严重程度
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

/// 修复建议
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConflictFix {
    pub action: String,
    /// 建议统一使用的主机路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// 冲突类型及其专属字段
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictKind {
    /// 同一目标路径映射到多个不同的主机路径
    MultipleSources {
        destination: String,
        containers: Vec<String>,
        sources: Vec<String>,
    },
    /// *arr 应用之间的路径结构不一致
    ArrPathMismatch {
        container: String,
        missing_paths: Vec<String>,
        overlap: f64,
    },
    /// *arr 与下载客户端不在同一根目录，无法硬链接
    HardlinkBroken {
        arr_containers: Vec<String>,
        download_clients: Vec<String>,
        arr_roots: Vec<String>,
        download_roots: Vec<String>,
    },
    /// *arr 容器未设置 PUID/PGID
    PermissionWarning { container: String },
    /// *arr 容器之间 UID/GID 不一致
    PermissionMismatch {
        containers: Vec<String>,
        uids: Vec<String>,
        gids: Vec<String>,
    },
}

impl ConflictKind {
    /// 类型标识
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::MultipleSources { .. } => "multiple_sources",
            ConflictKind::ArrPathMismatch { .. } => "arr_path_mismatch",
            ConflictKind::HardlinkBroken { .. } => "hardlink_broken",
            ConflictKind::PermissionWarning { .. } => "permission_warning",
            ConflictKind::PermissionMismatch { .. } => "permission_mismatch",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ConflictKind::MultipleSources { .. }
            | ConflictKind::HardlinkBroken { .. }
            | ConflictKind::PermissionMismatch { .. } => Severity::High,
            ConflictKind::ArrPathMismatch { .. } | ConflictKind::PermissionWarning { .. } => {
                Severity::Medium
            }
        }
    }
}

/// 冲突
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    #[serde(flatten)]
    pub kind: ConflictKind,
    pub severity: Severity,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<ConflictFix>,
}

impl Conflict {
    pub fn new(kind: ConflictKind, note: impl Into<String>, fix: Option<ConflictFix>) -> Self {
        let severity = kind.severity();
        Self {
            kind,
            severity,
            note: note.into(),
            fix,
        }
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }

    /// 一行摘要，用于汇总建议
    pub fn headline(&self) -> String {
        match &self.kind {
            ConflictKind::MultipleSources {
                destination,
                sources,
                ..
            } => format!("{} is mapped from {} different host paths", destination, sources.len()),
            ConflictKind::ArrPathMismatch {
                container,
                missing_paths,
                ..
            } => format!("{} is missing {} shared path(s)", container, missing_paths.len()),
            ConflictKind::HardlinkBroken { .. } => {
                "*arr apps and download clients use different root folders".to_string()
            }
            ConflictKind::PermissionWarning { container } => {
                format!("{} has no PUID/PGID set", container)
            }
            ConflictKind::PermissionMismatch { uids, gids, .. } => format!(
                "*arr apps run as different users (UIDs: {}; GIDs: {})",
                uids.join(", "),
                gids.join(", ")
            ),
        }
    }
}
