use anyhow::{Context, Result};
use proxycheck::config::{Config, LogConfig};
use proxycheck::{check_connectivity_with, check_server_reachable, Client};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&path)?;

    // 初始化日志系统
    init_logging(&config.log);
    info!("Configuration loaded from {}", path);

    let proxy = &config.proxy;
    info!("SOCKS5 proxy: {}:{}", proxy.host, proxy.port);

    // 预检：代理端口是否可以直接连接
    if let Err(e) = check_server_reachable(&proxy.host, proxy.port).await {
        error!("Proxy {}:{} is not reachable: {}", proxy.host, proxy.port, e);
    }

    let client = match proxy.credentials() {
        Some((username, password)) => {
            Client::with_credentials(&proxy.host, proxy.port, username, password).await
        }
        None => Client::new(&proxy.host, proxy.port).await,
    }
    .context("Failed to create SOCKS5 client")?;

    let outcome = check_connectivity_with(&client, &config.probe)
        .await
        .context("Connectivity check could not run")?;

    match outcome.error() {
        None => info!("Connectivity check passed"),
        Some(e) => error!("Connectivity check failed with {}: {}", outcome.status(), e),
    }

    println!("{}", outcome.code());
    std::process::exit(outcome.code());
}

/// 初始化日志系统
fn init_logging(log: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if log.format == "json" {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(true))
            .init();
    }
}
