//! 运行时状态模块
//!
//! 管理应用状态和任务存储

pub mod app_state;
pub mod job_store;

pub use app_state::AppState;
pub use job_store::JobStore;
