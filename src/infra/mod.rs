//! 基础设施模块
//!
//! 封装外部依赖（docker CLI、JSON 文件存储）

pub mod docker;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use docker::{ContainerSource, DiscoveryStatus, DockerCli};
pub use store::{AnalysisStore, JsonFileStore};
