//! 测试用的容器来源

use async_trait::async_trait;

use super::docker::{ContainerSource, DiscoveryStatus, DISCONNECTED_MESSAGE};
use crate::domain::ContainerRecord;
use crate::error::AnalysisError;

/// 返回固定容器列表的来源；`available = false` 时模拟 Docker 不可达
pub struct StaticSource {
    pub containers: Vec<ContainerRecord>,
    pub available: bool,
}

impl StaticSource {
    pub fn new(containers: Vec<ContainerRecord>) -> Self {
        Self {
            containers,
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            containers: Vec::new(),
            available: false,
        }
    }
}

#[async_trait]
impl ContainerSource for StaticSource {
    async fn status(&self) -> DiscoveryStatus {
        if self.available {
            DiscoveryStatus::connected("static")
        } else {
            DiscoveryStatus::disconnected(DISCONNECTED_MESSAGE)
        }
    }

    async fn list_containers(
        &self,
        _include_stopped: bool,
    ) -> Result<Vec<ContainerRecord>, AnalysisError> {
        if self.available {
            Ok(self.containers.clone())
        } else {
            Err(AnalysisError::DiscoveryUnavailable(
                DISCONNECTED_MESSAGE.to_string(),
            ))
        }
    }
}
