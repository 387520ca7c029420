//! 容器发现
//!
//! 通过 docker CLI 读取容器元数据：
//! - `docker version` 探测连接
//! - `docker ps -q` 列出容器 ID
//! - `docker inspect` 读取挂载、环境变量和标签

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::domain::container::EnvFilter;
use crate::domain::ContainerRecord;
use crate::error::AnalysisError;

/// 连接失败时返回给调用方的提示
pub const DISCONNECTED_MESSAGE: &str =
    "Could not connect to Docker. Please check docker socket mount.";

/// 发现客户端连接状态
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DiscoveryStatus {
    pub connected: bool,
    pub method: Option<String>,
    pub error: Option<String>,
}

impl DiscoveryStatus {
    pub fn connected(method: impl Into<String>) -> Self {
        Self {
            connected: true,
            method: Some(method.into()),
            error: None,
        }
    }

    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            method: None,
            error: Some(error.into()),
        }
    }
}

/// 容器来源
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// 当前连接状态
    async fn status(&self) -> DiscoveryStatus;

    /// 列出容器快照
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerRecord>, AnalysisError>;
}

/// docker CLI 客户端
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// 执行 docker 子命令，无法启动时视为连接不可用
    async fn exec(&self, args: &[&str]) -> Result<Output, AnalysisError> {
        Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                error!(bin = %self.bin, error = %e, "Failed to run docker");
                AnalysisError::DiscoveryUnavailable(e.to_string())
            })
    }

    /// 执行 docker 子命令，非零退出码视为连接不可用
    async fn run(&self, args: &[&str]) -> Result<String, AnalysisError> {
        let output = self.exec(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(args = ?args, stderr = %stderr, "Docker command failed");
            return Err(AnalysisError::DiscoveryUnavailable(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// 读取容器详情
    ///
    /// `ps` 与 `inspect` 之间被删除的容器会让 inspect 以非零码退出，
    /// 但 stdout 仍包含其余容器；此时只丢弃消失的容器
    async fn inspect(&self, ids: &[&str]) -> Result<Vec<ContainerRecord>, AnalysisError> {
        let mut args = vec!["inspect"];
        args.extend_from_slice(ids);
        let output = self.exec(&args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if output.status.success() {
            return parse_inspect_output(&stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_inspect_output(&stdout) {
            Ok(containers) => {
                for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    warn!(detail = %line, "Container disappeared before inspect, skipping");
                }
                Ok(containers)
            }
            Err(_) => {
                let stderr = stderr.trim().to_string();
                warn!(stderr = %stderr, "Docker inspect failed");
                Err(AnalysisError::DiscoveryUnavailable(stderr))
            }
        }
    }

    fn method() -> &'static str {
        if std::env::var("DOCKER_HOST").is_ok() {
            "docker_host_env"
        } else if cfg!(windows) {
            "windows_pipe"
        } else {
            "unix_socket"
        }
    }
}

#[async_trait]
impl ContainerSource for DockerCli {
    async fn status(&self) -> DiscoveryStatus {
        match self
            .run(&["version", "--format", "{{.Server.Version}}"])
            .await
        {
            Ok(version) => {
                debug!(version = %version.trim(), "Docker reachable");
                DiscoveryStatus::connected(Self::method())
            }
            Err(_) => DiscoveryStatus::disconnected(DISCONNECTED_MESSAGE),
        }
    }

    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerRecord>, AnalysisError> {
        let mut ps_args = vec!["ps", "-q", "--no-trunc"];
        if include_stopped {
            ps_args.push("-a");
        }
        let ids_output = self.run(&ps_args).await?;
        let ids: Vec<&str> = ids_output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if ids.is_empty() {
            info!("No containers found");
            return Ok(Vec::new());
        }

        let containers = self.inspect(&ids).await?;
        info!(count = containers.len(), "Found containers");
        Ok(containers)
    }
}

/// 解析 `docker inspect` 的 JSON 数组输出
pub fn parse_inspect_output(output: &str) -> Result<Vec<ContainerRecord>, AnalysisError> {
    let value: Value = serde_json::from_str(output).map_err(|e| {
        AnalysisError::DiscoveryUnavailable(format!("Unexpected docker inspect output: {}", e))
    })?;

    match value {
        Value::Array(items) => Ok(items.iter().map(parse_inspect).collect()),
        _ => Err(AnalysisError::DiscoveryUnavailable(
            "Unexpected docker inspect output: expected an array".to_string(),
        )),
    }
}

/// 将单个 inspect 对象转换为容器记录，缺失字段取默认值
pub fn parse_inspect(value: &Value) -> ContainerRecord {
    let text = |v: &Value| v.as_str().unwrap_or_default().to_string();

    let id: String = text(&value["Id"]).chars().take(12).collect();
    let name = text(&value["Name"]).trim_start_matches('/').to_string();
    let image = value["Config"]["Image"]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();
    let status = text(&value["State"]["Status"]);

    let mut record = ContainerRecord::new(id, name, image, status);

    if let Some(mounts) = value["Mounts"].as_array() {
        for mount in mounts {
            let source = text(&mount["Source"]);
            let destination = text(&mount["Destination"]);
            if !source.is_empty() && !destination.is_empty() {
                record.volumes.insert(destination, source);
            }
        }
    }

    if let Some(env) = value["Config"]["Env"].as_array() {
        record.env_vars = env
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|var| var.split_once('='))
            .filter(|(key, _)| EnvFilter::keep(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    if let Some(labels) = value["Config"]["Labels"].as_object() {
        record.labels = labels
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect::<BTreeMap<_, _>>();
    }

    record
}
