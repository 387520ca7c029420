//! MapArr - *arr 容器路径映射分析服务
//!
//! Usage:
//! - Normal mode: `maparr`
//! - With custom port: `maparr --port 9901`
//! - Verbose logging: `maparr --debug`

use maparr::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                if config.port_override.is_none() {
                    eprintln!("Invalid port: {}", args[i + 1]);
                    std::process::exit(2);
                }
                i += 2;
            }
            "--debug" => {
                config.debug = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("MapArr - path mapping analysis for *arr containers");
    println!();
    println!("USAGE:");
    println!("    maparr [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port (default 9900)");
    println!("    --debug          Enable debug logging when RUST_LOG is not set");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    MAPARR_PORT, MAPARR_DATA_DIR, DOCKER_BIN, MAPARR_INCLUDE_STOPPED,");
    println!("    MAPARR_EVENT_POLL_MS, MAPARR_ARR_OVERLAP_THRESHOLD, MAPARR_ROOT_SEGMENTS,");
    println!("    MAPARR_JOB_RETENTION_HOURS, MAPARR_MAX_JOBS, MAPARR_MAX_ANALYSES, RUST_LOG");
}

fn main() {
    let config = parse_args();

    // 单线程协作式运行时
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(maparr::init_and_run(config)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
