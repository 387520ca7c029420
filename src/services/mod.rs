//! 服务层模块
//!
//! 包含核心业务逻辑

pub mod analysis;
pub mod jobs;

pub use jobs::JobPipeline;
