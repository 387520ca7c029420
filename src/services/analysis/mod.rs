//! 路径分析引擎
//!
//! 平台推断、冲突检测、建议生成与 *arr 配置探测；全部是纯函数，不访问文件系统

pub mod analyzer;
pub mod arr_config;
pub mod conflicts;
pub mod platform;
pub mod recommend;

pub use analyzer::{run_recommendations_now, PathAnalyzer};
pub use arr_config::detect_arr_configs;
pub use conflicts::ConflictDetector;
pub use platform::classify;
