//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use self::constants::{
    DEFAULT_ARR_OVERLAP_THRESHOLD, DEFAULT_EVENT_POLL_MS, DEFAULT_JOB_RETENTION_HOURS,
    DEFAULT_MAX_JOBS, DEFAULT_MAX_STORED_ANALYSES, DEFAULT_PORT, DEFAULT_ROOT_SEGMENTS, MAX_EVENT_POLL_MS, MIN_EVENT_POLL_MS,
};

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// 数据目录（存放 maparr.json）
    pub data_dir: PathBuf,
    /// docker 可执行文件
    pub docker_bin: String,
    /// 发现容器时是否包含已停止的容器
    pub include_stopped: bool,
    /// 事件流轮询间隔
    pub event_poll_interval: Duration,
    /// 分析参数
    pub analysis: AnalysisSettings,
    /// 任务保留策略
    pub jobs: JobRetention,
    /// 存储中最多保留的分析数
    pub max_stored_analyses: usize,
}

/// 分析参数
///
/// 阈值没有推导依据，保留为可配置常量
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSettings {
    /// *arr 路径重合率低于此值视为不一致
    pub arr_overlap_threshold: f64,
    /// 计算路径"根"时取的段数
    pub root_segments: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            arr_overlap_threshold: DEFAULT_ARR_OVERLAP_THRESHOLD,
            root_segments: DEFAULT_ROOT_SEGMENTS,
        }
    }
}

/// 任务保留策略
#[derive(Clone, Debug)]
pub struct JobRetention {
    pub max_jobs: usize,
    pub retention_hours: i64,
}

impl Default for JobRetention {
    fn default() -> Self {
        Self {
            max_jobs: DEFAULT_MAX_JOBS,
            retention_hours: DEFAULT_JOB_RETENTION_HOURS,
        }
    }
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let port = load_with_fallback("MAPARR_PORT", "PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        // MAPARR_DB 指向旧版数据库文件时取其所在目录
        let data_dir = load_with_fallback("MAPARR_DATA_DIR", "DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                env::var("MAPARR_DB").ok().and_then(|db| {
                    warn!("MAPARR_DB is deprecated, use MAPARR_DATA_DIR");
                    PathBuf::from(db).parent().map(PathBuf::from)
                })
            })
            .unwrap_or_else(|| PathBuf::from("./data"));

        let docker_bin = env::var("DOCKER_BIN").unwrap_or_else(|_| "docker".to_string());

        let include_stopped = env::var("MAPARR_INCLUDE_STOPPED")
            .ok()
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let poll_ms = env::var("MAPARR_EVENT_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EVENT_POLL_MS);

        let analysis = AnalysisSettings {
            arr_overlap_threshold: env::var("MAPARR_ARR_OVERLAP_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(DEFAULT_ARR_OVERLAP_THRESHOLD),
            root_segments: env::var("MAPARR_ROOT_SEGMENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_ROOT_SEGMENTS),
        };

        let jobs = JobRetention {
            max_jobs: env::var("MAPARR_MAX_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_JOBS),
            retention_hours: env::var("MAPARR_JOB_RETENTION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JOB_RETENTION_HOURS),
        };

        let max_stored_analyses = env::var("MAPARR_MAX_ANALYSES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_STORED_ANALYSES);

        Self {
            port,
            data_dir,
            docker_bin,
            include_stopped,
            event_poll_interval: clamp_poll_interval(poll_ms),
            analysis,
            jobs,
            max_stored_analyses,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("./data"),
            docker_bin: "docker".to_string(),
            include_stopped: false,
            event_poll_interval: Duration::from_millis(DEFAULT_EVENT_POLL_MS),
            analysis: AnalysisSettings::default(),
            jobs: JobRetention::default(),
            max_stored_analyses: DEFAULT_MAX_STORED_ANALYSES,
        }
    }
}

/// 事件流轮询间隔限制在 300-400ms
pub fn clamp_poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_EVENT_POLL_MS, MAX_EVENT_POLL_MS))
}

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}

/// 加载环境变量，支持 fallback
fn load_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary).ok().or_else(|| env::var(fallback).ok())
}

/// 常量
pub mod constants {
    /// 默认端口
    pub const DEFAULT_PORT: u16 = 9900;

    /// *arr 路径重合率阈值
    pub const DEFAULT_ARR_OVERLAP_THRESHOLD: f64 = 0.70;

    /// 路径根段数
    pub const DEFAULT_ROOT_SEGMENTS: usize = 2;

    /// 事件流轮询间隔（毫秒）
    pub const DEFAULT_EVENT_POLL_MS: u64 = 350;
    pub const MIN_EVENT_POLL_MS: u64 = 300;
    pub const MAX_EVENT_POLL_MS: u64 = 400;

    /// 内存中最多保留的已结束任务数
    pub const DEFAULT_MAX_JOBS: usize = 100;

    /// 已结束任务保留时间（小时）
    pub const DEFAULT_JOB_RETENTION_HOURS: i64 = 24;

    /// 任务清理间隔（秒）
    pub const JOB_SWEEP_INTERVAL_SECS: u64 = 300;

    /// 分析列表默认返回数量
    pub const DEFAULT_ANALYSES_LIMIT: usize = 20;
    pub const MAX_ANALYSES_LIMIT: usize = 500;

    /// 存储中最多保留的分析数
    pub const DEFAULT_MAX_STORED_ANALYSES: usize = 200;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
