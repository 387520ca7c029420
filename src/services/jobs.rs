//! 分析任务流水线
//!
//! 任务在后台运行，按检查点推进进度：
//! 25 快照 → 35 平台 → 50 冲突 → 65 建议 → 80 持久化 → 100 完成。
//! 检查点之间让出执行权，调用方可以通过轮询或事件流观察进度。

use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::env::constants::JOB_SWEEP_INTERVAL_SECS;
use crate::config::AnalysisSettings;
use crate::domain::{
    AnalysisReport, ContainerRecord, Job, JobEvent, JobStatus, ManualPathEntry, Platform,
};
use crate::error::AnalysisError;
use crate::infra::{AnalysisStore, ContainerSource};
use crate::services::analysis::PathAnalyzer;
use crate::state::JobStore;

/// 任务流水线
#[derive(Clone)]
pub struct JobPipeline {
    jobs: Arc<JobStore>,
    discovery: Arc<dyn ContainerSource>,
    store: Arc<dyn AnalysisStore>,
    settings: AnalysisSettings,
    include_stopped: bool,
    poll_interval: Duration,
}

impl JobPipeline {
    pub fn new(
        jobs: Arc<JobStore>,
        discovery: Arc<dyn ContainerSource>,
        store: Arc<dyn AnalysisStore>,
        settings: AnalysisSettings,
        include_stopped: bool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            jobs,
            discovery,
            store,
            settings,
            include_stopped,
            poll_interval,
        }
    }

    /// 创建任务并在后台运行，立即返回任务 ID
    pub async fn start(&self, platform_hint: Option<String>) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .create(Job::new(job_id.clone(), platform_hint.clone()))
            .await;
        info!(job_id = %job_id, platform_hint = ?platform_hint, "Analysis job queued");

        let pipeline = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            pipeline.run(id, platform_hint).await;
        });

        job_id
    }

    pub async fn get(&self, job_id: &str) -> Result<Job, AnalysisError> {
        self.jobs
            .get(job_id)
            .await
            .ok_or_else(|| AnalysisError::not_found(format!("Job '{}'", job_id)))
    }

    /// 任务事件流
    ///
    /// 先发出当前快照，之后只在可观察字段变化时发出，到达终态后结束。
    /// 调用方断开不会影响任务本身。
    pub async fn stream_events(
        &self,
        job_id: &str,
    ) -> Result<BoxStream<'static, JobEvent>, AnalysisError> {
        let first = self.get(job_id).await?.event();
        let jobs = self.jobs.clone();
        let interval = self.poll_interval;
        let job_id = job_id.to_string();

        let stream = async_stream::stream! {
            let mut last = first;
            let mut terminal = last.status.is_terminal();
            yield last.clone();

            while !terminal {
                tokio::time::sleep(interval).await;
                let Some(job) = jobs.get(&job_id).await else {
                    warn!(job_id = %job_id, "Job evicted while streaming");
                    break;
                };
                let event = job.event();
                terminal = event.status.is_terminal();
                if event.differs_from(&last) {
                    last = event.clone();
                    yield event;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// 同步执行一次完整分析并持久化
    pub async fn analyze_now(
        &self,
        platform_hint: Option<Platform>,
    ) -> Result<(u64, AnalysisReport), AnalysisError> {
        let (containers, manual_paths) = self.snapshot().await?;
        let report = PathAnalyzer::new(containers, manual_paths, self.settings.clone())
            .with_platform_hint(platform_hint)
            .analyze();
        let analysis_id = self.store.save_analysis(&report).await?;
        info!(
            analysis_id,
            platform = report.platform.as_str(),
            conflicts = report.summary.conflicts_found,
            warnings = report.summary.warnings_found,
            "Analysis complete"
        );
        Ok((analysis_id, report))
    }

    /// 读取容器和手动路径；两者都为空时视为没有数据
    async fn snapshot(&self) -> Result<(Vec<ContainerRecord>, Vec<ManualPathEntry>), AnalysisError> {
        let containers = self.discovery.list_containers(self.include_stopped).await?;
        let manual_paths = self.store.get_manual_paths().await?;
        if containers.is_empty() && manual_paths.is_empty() {
            return Err(AnalysisError::NoContainers);
        }
        Ok((containers, manual_paths))
    }

    /// 在独立任务中执行分析，panic 也会被记录为任务失败
    async fn run(self, job_id: String, platform_hint: Option<String>) {
        let hint = platform_hint.as_deref().and_then(|h| {
            let parsed = Platform::parse(h);
            if parsed.is_none() {
                warn!(job_id = %job_id, hint = %h, "Ignoring unknown platform hint");
            }
            parsed
        });

        let worker = self.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { worker.execute(&id, hint).await });

        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(AnalysisError::AnalysisFailure(format!(
                "analysis task aborted: {}",
                e
            ))),
        };

        if let Err(e) = outcome {
            error!(job_id = %job_id, error = %e, "Analysis job failed");
            self.jobs.fail(&job_id, e.to_string()).await;
        }
    }

    async fn execute(&self, job_id: &str, hint: Option<Platform>) -> Result<(), AnalysisError> {
        self.jobs.advance(job_id, JobStatus::Detecting, 0).await;
        let (containers, manual_paths) = self.snapshot().await?;
        self.checkpoint(job_id, 25).await;

        let analyzer = PathAnalyzer::new(containers, manual_paths, self.settings.clone())
            .with_platform_hint(hint);
        self.checkpoint(job_id, 35).await;

        let conflicts = analyzer.detect_conflicts();
        self.checkpoint(job_id, 50).await;

        let recommendations = analyzer.recommendations(&conflicts);
        self.checkpoint(job_id, 65).await;

        let report = analyzer.into_report(conflicts, recommendations);
        let analysis_id = self.store.save_analysis(&report).await?;
        self.checkpoint(job_id, 80).await;

        info!(
            job_id = %job_id,
            analysis_id,
            platform = report.platform.as_str(),
            conflicts = report.summary.conflicts_found,
            "Analysis job complete"
        );
        self.jobs.complete(job_id, report, analysis_id).await;
        Ok(())
    }

    async fn checkpoint(&self, job_id: &str, progress: u8) {
        self.jobs
            .advance(job_id, JobStatus::Analyzing, progress)
            .await;
        tokio::task::yield_now().await;
    }
}

/// 定期清理过期任务，直到收到关闭信号
pub fn spawn_sweeper(jobs: Arc<JobStore>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(JOB_SWEEP_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Job sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    jobs.cleanup_stale().await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisRow, SavedMapping, StoredAnalysis};
    use crate::infra::testing::StaticSource;
    use crate::infra::JsonFileStore;
    use async_trait::async_trait;
    use futures::StreamExt;

    fn pipeline_with(source: StaticSource, store: Arc<dyn AnalysisStore>) -> JobPipeline {
        JobPipeline::new(
            Arc::new(JobStore::new()),
            Arc::new(source),
            store,
            AnalysisSettings::default(),
            false,
            Duration::from_millis(300),
        )
    }

    fn pipeline(source: StaticSource) -> JobPipeline {
        pipeline_with(source, Arc::new(JsonFileStore::in_memory()))
    }

    fn media_stack() -> Vec<ContainerRecord> {
        vec![
            ContainerRecord::new("1", "sonarr", "linuxserver/sonarr", "running")
                .with_volume("/data", "/mnt/user/data/tv"),
            ContainerRecord::new("2", "radarr", "linuxserver/radarr", "running")
                .with_volume("/data", "/mnt/user/data/movies"),
        ]
    }

    async fn wait_terminal(pipeline: &JobPipeline, job_id: &str) -> Job {
        let events: Vec<JobEvent> = pipeline.stream_events(job_id).await.unwrap().collect().await;
        assert!(events.last().unwrap().status.is_terminal());
        pipeline.get(job_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_job_completes() {
        let pipeline = pipeline(StaticSource::new(media_stack()));
        let job_id = pipeline.start(None).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        assert!(job.analysis_id.is_some());
        let report = job.result.unwrap();
        assert_eq!(report.platform, Platform::Unraid);
        assert_eq!(report.summary.containers_analyzed, 2);
    }

    #[tokio::test]
    async fn test_discovery_unavailable() {
        let pipeline = pipeline(StaticSource::unavailable());
        let job_id = pipeline.start(None).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.unwrap().contains("Docker not connected"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_no_data_is_error() {
        let pipeline = pipeline(StaticSource::new(Vec::new()));
        let job_id = pipeline.start(None).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("No containers found"));
    }

    #[tokio::test]
    async fn test_manual_paths_alone_are_analyzed() {
        let store = Arc::new(JsonFileStore::in_memory());
        store
            .add_manual_path(ManualPathEntry::new("sonarr", "/volume1/data/tv", "/tv"))
            .await
            .unwrap();
        let pipeline = pipeline_with(StaticSource::new(Vec::new()), store);
        let job_id = pipeline.start(None).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.result.unwrap().platform, Platform::Synology);
    }

    #[tokio::test]
    async fn test_platform_hint_applied() {
        let pipeline = pipeline(StaticSource::new(media_stack()));
        let job_id = pipeline.start(Some("synology".into())).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.result.unwrap().platform, Platform::Synology);
        assert_eq!(job.platform_hint.as_deref(), Some("synology"));
    }

    #[tokio::test]
    async fn test_stream_is_monotonic_and_deduplicated() {
        let pipeline = pipeline(StaticSource::new(media_stack()));
        let job_id = pipeline.start(None).await;

        let events: Vec<JobEvent> = pipeline.stream_events(&job_id).await.unwrap().collect().await;
        for pair in events.windows(2) {
            assert!(pair[1].progress >= pair[0].progress);
            assert!(pair[1].differs_from(&pair[0]));
        }
        let last = events.last().unwrap();
        assert_eq!(last.status, JobStatus::Complete);
        assert!(last.result.is_some());
        assert!(events[..events.len() - 1].iter().all(|e| e.result.is_none()));
    }

    #[tokio::test]
    async fn test_stream_of_finished_job_ends_immediately() {
        let pipeline = pipeline(StaticSource::unavailable());
        let job_id = pipeline.start(None).await;
        wait_terminal(&pipeline, &job_id).await;

        let events: Vec<JobEvent> = pipeline.stream_events(&job_id).await.unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, JobStatus::Error);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let pipeline = pipeline(StaticSource::new(Vec::new()));
        assert!(matches!(
            pipeline.get("nope").await,
            Err(AnalysisError::NotFound(_))
        ));
        assert!(pipeline.stream_events("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_analyze_now() {
        let pipeline = pipeline(StaticSource::new(media_stack()));
        let (id, report) = pipeline.analyze_now(None).await.unwrap();
        assert_eq!(id, 1);
        assert!(report.summary.conflicts_found >= 1);

        let empty = pipeline_with(
            StaticSource::new(Vec::new()),
            Arc::new(JsonFileStore::in_memory()),
        );
        assert!(matches!(
            empty.analyze_now(None).await,
            Err(AnalysisError::NoContainers)
        ));
    }

    /// 保存时 panic 的存储
    struct PanickingStore;

    #[async_trait]
    impl AnalysisStore for PanickingStore {
        async fn save_analysis(&self, _report: &AnalysisReport) -> Result<u64, AnalysisError> {
            panic!("disk on fire");
        }
        async fn get_analysis(&self, _id: u64) -> Result<Option<StoredAnalysis>, AnalysisError> {
            Ok(None)
        }
        async fn list_analyses(&self, _limit: usize) -> Result<Vec<AnalysisRow>, AnalysisError> {
            Ok(Vec::new())
        }
        async fn save_mapping(
            &self,
            _mapping: serde_json::Value,
            _notes: Option<String>,
        ) -> Result<SavedMapping, AnalysisError> {
            Err(AnalysisError::storage("read-only"))
        }
        async fn list_mappings(&self) -> Result<Vec<SavedMapping>, AnalysisError> {
            Ok(Vec::new())
        }
        async fn add_manual_path(
            &self,
            _entry: ManualPathEntry,
        ) -> Result<ManualPathEntry, AnalysisError> {
            Err(AnalysisError::storage("read-only"))
        }
        async fn add_manual_paths(
            &self,
            _entries: Vec<ManualPathEntry>,
        ) -> Result<Vec<ManualPathEntry>, AnalysisError> {
            Err(AnalysisError::storage("read-only"))
        }
        async fn get_manual_paths(&self) -> Result<Vec<ManualPathEntry>, AnalysisError> {
            Ok(Vec::new())
        }
        async fn delete_manual_path(&self, _id: u64) -> Result<bool, AnalysisError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_panic_marks_job_failed() {
        let pipeline = pipeline_with(StaticSource::new(media_stack()), Arc::new(PanickingStore));
        let job_id = pipeline.start(None).await;

        let job = wait_terminal(&pipeline, &job_id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.unwrap().contains("aborted"));
        assert!(job.result.is_none());
        assert!(job.analysis_id.is_none());
    }
}
