//! 连通性检查
//!
//! 并发执行 TCP 和 UDP 探测，两者都结束后再归约为一个状态码。
//! 另外提供不经过代理协议的 TCP 可达性预检。

pub mod status;
pub mod tcp;
pub mod udp;

pub use status::{CheckOutcome, StatusCode};

use crate::client::Client;
use crate::config::{ProbeConfig, REACHABILITY_TIMEOUT};
use crate::endpoint::strip_brackets;
use crate::error::{CheckError, TcpProbeError, UdpProbeError};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// 使用默认探测参数检查代理能否中继 TCP 和 UDP
pub async fn check_connectivity(client: &Client) -> Result<CheckOutcome, CheckError> {
    check_connectivity_with(client, &ProbeConfig::default()).await
}

/// 使用指定探测参数检查代理能否中继 TCP 和 UDP
///
/// 探测失败不会返回 `Err`，而是体现在状态码里；只有探测无法启动
/// (参数无效) 时才返回错误。
///
/// 两个探测是同一个 future 里的并发分支，future 被 drop 时两者的
/// 连接一起释放。
pub async fn check_connectivity_with(
    client: &Client,
    config: &ProbeConfig,
) -> Result<CheckOutcome, CheckError> {
    config.validate()?;

    debug!("Checking connectivity via proxy {}", client.endpoint());

    let (tcp_result, udp_result) = tokio::join!(
        tcp::probe(client.stream_dialer(), config),
        udp::probe(client.packet_listener(), config),
    );

    if let Err(e) = &tcp_result {
        debug!("TCP probe failed: {}", e);
    }
    if let Err(e) = &udp_result {
        debug!("UDP probe failed: {}", e);
    }

    let outcome = reduce(tcp_result, udp_result);
    match outcome.error() {
        None => info!("Proxy {} relays TCP and UDP", client.endpoint()),
        Some(e) => warn!(
            "Connectivity check via {} returned {}: {}",
            client.endpoint(),
            outcome.status(),
            e
        ),
    }
    Ok(outcome)
}

/// 将两个探测结果归约为状态码，按顺序第一个匹配的规则生效
///
/// TCP 失败时总是附带 TCP 的错误。
pub fn reduce(
    tcp: Result<(), TcpProbeError>,
    udp: Result<(), UdpProbeError>,
) -> CheckOutcome {
    match (tcp, udp) {
        (Ok(()), Ok(())) => CheckOutcome::success(),
        (Err(e), _) if e.is_authentication() => {
            CheckOutcome::failure(StatusCode::AuthenticationFailure, e.into())
        }
        (Err(e), _) if e.is_unreachable() => {
            CheckOutcome::failure(StatusCode::Unreachable, e.into())
        }
        (Ok(()), Err(e)) => CheckOutcome::failure(StatusCode::UdpConnectivity, e.into()),
        (Err(e), _) => CheckOutcome::failure(StatusCode::Unexpected, e.into()),
    }
}

/// 检查 `host:port` 是否能通过 TCP 直接连接 (不经过代理协议)
///
/// 成功后立即关闭连接；失败时原样返回底层错误。
pub async fn check_server_reachable(host: &str, port: u16) -> io::Result<()> {
    check_server_reachable_within(host, port, REACHABILITY_TIMEOUT).await
}

pub async fn check_server_reachable_within(
    host: &str,
    port: u16,
    timeout: Duration,
) -> io::Result<()> {
    let host = strip_brackets(host);
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(stream) => {
            drop(stream?);
            debug!("Server {}:{} is reachable", host, port);
            Ok(())
        }
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connection to {}:{} timed out after {:?}", host, port, timeout),
        )),
    }
}
