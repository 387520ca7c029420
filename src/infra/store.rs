//! 分析结果持久化
//!
//! 所有数据保存在数据目录下的单个 `maparr.json` 中，每次修改后原子写入
//! （先写临时文件再重命名）。不指定路径时只保存在内存中。

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::env::constants::DEFAULT_MAX_STORED_ANALYSES;
use crate::domain::{AnalysisReport, AnalysisRow, ManualPathEntry, SavedMapping, StoredAnalysis};
use crate::error::AnalysisError;

/// 存储文件名
const STORE_FILE_NAME: &str = "maparr.json";

/// 分析存储
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// 保存分析报告，返回分配的 ID
    async fn save_analysis(&self, report: &AnalysisReport) -> Result<u64, AnalysisError>;

    async fn get_analysis(&self, id: u64) -> Result<Option<StoredAnalysis>, AnalysisError>;

    /// 最近的分析，按时间倒序
    async fn list_analyses(&self, limit: usize) -> Result<Vec<AnalysisRow>, AnalysisError>;

    async fn save_mapping(
        &self,
        mapping: serde_json::Value,
        notes: Option<String>,
    ) -> Result<SavedMapping, AnalysisError>;

    async fn list_mappings(&self) -> Result<Vec<SavedMapping>, AnalysisError>;

    async fn add_manual_path(&self, entry: ManualPathEntry)
        -> Result<ManualPathEntry, AnalysisError>;

    async fn add_manual_paths(
        &self,
        entries: Vec<ManualPathEntry>,
    ) -> Result<Vec<ManualPathEntry>, AnalysisError>;

    async fn get_manual_paths(&self) -> Result<Vec<ManualPathEntry>, AnalysisError>;

    /// 删除手动路径，ID 不存在时返回 false
    async fn delete_manual_path(&self, id: u64) -> Result<bool, AnalysisError>;
}

/// 存储文件内容
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreData {
    version: u32,
    next_analysis_id: u64,
    next_mapping_id: u64,
    next_manual_path_id: u64,
    analyses: Vec<StoredAnalysis>,
    mappings: Vec<SavedMapping>,
    manual_paths: Vec<ManualPathEntry>,
}

impl StoreData {
    fn new() -> Self {
        Self {
            version: 1,
            next_analysis_id: 1,
            next_mapping_id: 1,
            next_manual_path_id: 1,
            ..Self::default()
        }
    }

    fn take_manual_path_id(&mut self) -> u64 {
        let id = self.next_manual_path_id.max(1);
        self.next_manual_path_id = id + 1;
        id
    }

    fn insert_manual_path(&mut self, mut entry: ManualPathEntry) -> ManualPathEntry {
        entry.id = Some(self.take_manual_path_id());
        entry.created_at = Some(Utc::now());
        self.manual_paths.push(entry.clone());
        entry
    }
}

/// JSON 文件存储
pub struct JsonFileStore {
    /// None 表示纯内存模式
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
    /// 最多保留的分析数，超出时丢弃最旧的
    max_analyses: usize,
}

impl JsonFileStore {
    /// 打开数据目录下的存储文件，文件不存在时创建空存储
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let path = data_dir.join(STORE_FILE_NAME);
        let data = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<StoreData>(&content) {
                Ok(data) => {
                    info!(
                        path = %path.display(),
                        analyses = data.analyses.len(),
                        manual_paths = data.manual_paths.len(),
                        "Loaded store"
                    );
                    data
                }
                Err(e) => {
                    // 保留损坏的文件，从空存储开始
                    let backup = path.with_extension("json.corrupt");
                    warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e,
                        "Failed to parse store file, starting empty"
                    );
                    fs::rename(&path, &backup).await?;
                    StoreData::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            max_analyses: DEFAULT_MAX_STORED_ANALYSES,
        })
    }

    /// 纯内存存储
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::new()),
            max_analyses: DEFAULT_MAX_STORED_ANALYSES,
        }
    }

    /// 设置分析保留上限（至少 1）
    pub fn with_max_analyses(mut self, max_analyses: usize) -> Self {
        self.max_analyses = max_analyses.max(1);
        self
    }

    /// 原子写入
    async fn persist(&self, data: &StoreData) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let temp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(data)?;
        fs::write(&temp_path, &content)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    /// 在写锁内修改数据并持久化；写入失败时回滚内存中的修改
    async fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T, AnalysisError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = f(&mut next);
        self.persist(&next).await.map_err(|e| {
            warn!(error = %e, "Failed to persist store");
            AnalysisError::storage(format!("{:#}", e))
        })?;
        *data = next;
        Ok(out)
    }
}

#[async_trait]
impl AnalysisStore for JsonFileStore {
    async fn save_analysis(&self, report: &AnalysisReport) -> Result<u64, AnalysisError> {
        let stored_report = report.clone();
        let max_analyses = self.max_analyses;
        let (id, evicted) = self
            .mutate(move |data| {
                let id = data.next_analysis_id.max(1);
                data.next_analysis_id = id + 1;
                data.analyses.push(StoredAnalysis {
                    id,
                    platform: stored_report.platform,
                    containers_analyzed: stored_report.summary.containers_analyzed,
                    conflicts_found: stored_report.summary.conflicts_found,
                    created_at: Utc::now(),
                    result: stored_report,
                });

                let evicted = data.analyses.len().saturating_sub(max_analyses);
                data.analyses.drain(..evicted);
                (id, evicted)
            })
            .await?;
        if evicted > 0 {
            debug!(evicted, "Evicted oldest analyses");
        }
        info!(analysis_id = id, "Saved analysis");
        Ok(id)
    }

    async fn get_analysis(&self, id: u64) -> Result<Option<StoredAnalysis>, AnalysisError> {
        let data = self.data.read().await;
        Ok(data.analyses.iter().find(|a| a.id == id).cloned())
    }

    async fn list_analyses(&self, limit: usize) -> Result<Vec<AnalysisRow>, AnalysisError> {
        let data = self.data.read().await;
        Ok(data
            .analyses
            .iter()
            .rev()
            .take(limit)
            .map(StoredAnalysis::row)
            .collect())
    }

    async fn save_mapping(
        &self,
        mapping: serde_json::Value,
        notes: Option<String>,
    ) -> Result<SavedMapping, AnalysisError> {
        self.mutate(move |data| {
            let id = data.next_mapping_id.max(1);
            data.next_mapping_id = id + 1;
            let saved = SavedMapping {
                id,
                mapping,
                notes,
                created_at: Utc::now(),
            };
            data.mappings.push(saved.clone());
            saved
        })
        .await
    }

    async fn list_mappings(&self) -> Result<Vec<SavedMapping>, AnalysisError> {
        let data = self.data.read().await;
        Ok(data.mappings.iter().rev().cloned().collect())
    }

    async fn add_manual_path(
        &self,
        entry: ManualPathEntry,
    ) -> Result<ManualPathEntry, AnalysisError> {
        self.mutate(move |data| data.insert_manual_path(entry)).await
    }

    async fn add_manual_paths(
        &self,
        entries: Vec<ManualPathEntry>,
    ) -> Result<Vec<ManualPathEntry>, AnalysisError> {
        self.mutate(move |data| {
            entries
                .into_iter()
                .map(|entry| data.insert_manual_path(entry))
                .collect()
        })
        .await
    }

    async fn get_manual_paths(&self) -> Result<Vec<ManualPathEntry>, AnalysisError> {
        let data = self.data.read().await;
        Ok(data.manual_paths.clone())
    }

    async fn delete_manual_path(&self, id: u64) -> Result<bool, AnalysisError> {
        let exists = self
            .data
            .read()
            .await
            .manual_paths
            .iter()
            .any(|m| m.id == Some(id));
        if !exists {
            return Ok(false);
        }

        self.mutate(move |data| {
            data.manual_paths.retain(|m| m.id != Some(id));
        })
        .await?;
        info!(manual_path_id = id, "Deleted manual path");
        Ok(true)
    }
}
