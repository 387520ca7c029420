//! MapArr - *arr 容器路径映射分析
//!
//! 读取容器卷挂载，推断主机平台，检测破坏硬链接的路径冲突并给出修复建议

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::env::constants::VERSION;
use crate::config::EnvConfig;
use crate::state::app_state::{get_shutdown_token, trigger_shutdown};
use crate::state::AppState;

/// 命令行覆盖项
#[derive(Debug, Default, Clone)]
pub struct RuntimeConfig {
    /// 覆盖监听端口
    pub port_override: Option<u16>,
    /// 未设置 RUST_LOG 时使用 debug 级别
    pub debug: bool,
}

/// 初始化日志
///
/// 优先级：RUST_LOG > --debug > info
pub fn init_logging(debug: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

/// 启动服务，直到收到 Ctrl+C
pub async fn init_and_run(runtime: RuntimeConfig) -> anyhow::Result<()> {
    init_logging(runtime.debug);

    let mut config = EnvConfig::from_env();
    if let Some(port) = runtime.port_override {
        config.port = port;
    }
    let port = config.port;

    tracing::info!(version = VERSION, "MapArr starting up");

    let state = Arc::new(AppState::new(config).await?);
    let docker = state.discovery.status().await;
    if docker.connected {
        tracing::info!(method = ?docker.method, "Docker connected");
    } else {
        tracing::warn!(error = ?docker.error, "Docker NOT connected");
    }

    let shutdown = get_shutdown_token();
    let sweeper = services::jobs::spawn_sweeper(state.jobs.clone(), shutdown.clone());

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            trigger_shutdown();
        }
    });

    let app = api::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    let _ = sweeper.await;
    tracing::info!("MapArr shut down");
    Ok(())
}
