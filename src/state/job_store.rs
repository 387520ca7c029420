//! 任务存储
//!
//! 所有分析任务保存在一个由互斥锁保护的 map 中。每次更新都是
//! 读取 → 修改副本 → 写回，终态任务不再被修改。

use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::JobRetention;
use crate::domain::{AnalysisReport, Job, JobStatus};

/// 任务存储
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
    /// 最多保留的终态任务数
    max_jobs: usize,
    /// 终态任务保留时间
    retention: Duration,
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_config(&JobRetention::default())
    }

    /// 使用自定义保留策略创建
    pub fn with_config(retention: &JobRetention) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            max_jobs: retention.max_jobs.max(1),
            retention: Duration::hours(retention.retention_hours),
        }
    }

    /// 登记新任务
    pub async fn create(&self, job: Job) -> String {
        let job_id = job.id.clone();
        let mut jobs = self.jobs.lock().await;
        jobs.insert(job_id.clone(), job);
        Self::enforce_cap(&mut jobs, self.max_jobs);
        job_id
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        let jobs = self.jobs.lock().await;
        jobs.get(job_id).cloned()
    }

    /// 推进状态和进度
    ///
    /// 终态任务、状态回退和未知任务都会被忽略；进度只增不减。
    /// 返回是否发生了更新。
    pub async fn advance(&self, job_id: &str, status: JobStatus, progress: u8) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(current) = jobs.get(job_id) else {
            return false;
        };
        if !current.status.can_advance_to(status) || status.is_terminal() {
            return false;
        }

        let mut next = current.clone();
        if next.started_at.is_none() && status != JobStatus::Queued {
            next.started_at = Some(Utc::now());
        }
        next.status = status;
        next.progress = next.progress.max(progress.min(100));
        debug!(job_id = %job_id, status = status.as_str(), progress = next.progress, "Job advanced");
        jobs.insert(job_id.to_string(), next);
        true
    }

    /// 标记完成并附带结果
    pub async fn complete(&self, job_id: &str, report: AnalysisReport, analysis_id: u64) -> bool {
        self.finish(job_id, |job| {
            job.status = JobStatus::Complete;
            job.progress = 100;
            job.result = Some(report);
            job.analysis_id = Some(analysis_id);
        })
        .await
    }

    /// 标记失败，不附带任何部分结果
    pub async fn fail(&self, job_id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        self.finish(job_id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(message);
            job.result = None;
        })
        .await
    }

    async fn finish(&self, job_id: &str, apply: impl FnOnce(&mut Job)) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(current) = jobs.get(job_id) else {
            return false;
        };
        if current.status.is_terminal() {
            return false;
        }

        let mut next = current.clone();
        apply(&mut next);
        next.finished_at = Some(Utc::now());
        if next.started_at.is_none() {
            next.started_at = next.finished_at;
        }
        jobs.insert(job_id.to_string(), next);
        true
    }

    /// 清理过期任务
    ///
    /// 移除超过保留时间的终态任务，返回移除数量
    pub async fn cleanup_stale(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !job.status.is_terminal() || job.finished_at.map_or(true, |t| t > cutoff)
        });
        let removed = before - jobs.len();
        if removed > 0 {
            info!(removed, remaining = jobs.len(), "Evicted stale jobs");
        }
        removed
    }

    /// 终态任务超过上限时移除最早结束的
    fn enforce_cap(jobs: &mut HashMap<String, Job>, max_jobs: usize) {
        let mut terminal: Vec<(String, chrono::DateTime<Utc>)> = jobs
            .values()
            .filter(|j| j.status.is_terminal())
            .map(|j| (j.id.clone(), j.finished_at.unwrap_or(j.created_at)))
            .collect();
        if terminal.len() <= max_jobs {
            return;
        }

        terminal.sort_by_key(|(_, finished)| *finished);
        let excess = terminal.len() - max_jobs;
        for (id, _) in terminal.into_iter().take(excess) {
            jobs.remove(&id);
        }
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
