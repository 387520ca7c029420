//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 全局 shutdown token，用于优雅关闭所有后台任务
static GLOBAL_SHUTDOWN: std::sync::OnceLock<CancellationToken> = std::sync::OnceLock::new();

/// 获取全局 shutdown token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN
        .get_or_init(CancellationToken::new)
        .clone()
}

/// 触发全局 shutdown
pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

use crate::config::EnvConfig;
use crate::infra::{AnalysisStore, ContainerSource, DockerCli, JsonFileStore};
use crate::services::jobs::JobPipeline;

use super::job_store::JobStore;

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,

    /// 容器发现
    pub discovery: Arc<dyn ContainerSource>,
    /// 分析存储
    pub store: Arc<dyn AnalysisStore>,
    /// 任务存储
    pub jobs: Arc<JobStore>,
    /// 任务流水线
    pub pipeline: JobPipeline,
}

impl AppState {
    /// 使用 docker CLI 和数据目录下的 JSON 存储创建
    pub async fn new(config: EnvConfig) -> anyhow::Result<Self> {
        let discovery: Arc<dyn ContainerSource> = Arc::new(DockerCli::new(&config.docker_bin));
        let store: Arc<dyn AnalysisStore> = Arc::new(
            JsonFileStore::open(&config.data_dir)
                .await?
                .with_max_analyses(config.max_stored_analyses),
        );

        tracing::info!(
            port = config.port,
            data_dir = %config.data_dir.display(),
            docker_bin = %config.docker_bin,
            include_stopped = config.include_stopped,
            "AppState initialized"
        );

        Ok(Self::with_services(config, discovery, store))
    }

    /// 注入指定的发现客户端和存储
    pub fn with_services(
        config: EnvConfig,
        discovery: Arc<dyn ContainerSource>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        let jobs = Arc::new(JobStore::with_config(&config.jobs));
        let pipeline = JobPipeline::new(
            jobs.clone(),
            discovery.clone(),
            store.clone(),
            config.analysis.clone(),
            config.include_stopped,
            config.event_poll_interval,
        );

        Self {
            config,
            started_at: Utc::now(),
            discovery,
            store,
            jobs,
            pipeline,
        }
    }

    /// 运行时长（秒）
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
