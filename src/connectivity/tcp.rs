/// TCP 探测
///
/// 通过 StreamDialer 连接到探测目标，发送一个最小的 HTTP HEAD 请求，
/// 收到 HTTP 状态行即认为 TCP 中继可用。
use crate::config::ProbeConfig;
use crate::error::TcpProbeError;
use crate::socks5::StreamDialer;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

const HTTP_PREFIX: &[u8] = b"HTTP/";

pub async fn probe(dialer: &StreamDialer, config: &ProbeConfig) -> Result<(), TcpProbeError> {
    let timeout = config.tcp_timeout();
    let deadline = Instant::now() + timeout;
    let host = config.tcp_target_host.as_str();

    // 建立连接阶段超时视为代理不可达
    let mut stream = match timeout_at(deadline, dialer.dial(host, config.tcp_target_port)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(TcpProbeError::Unreachable(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "no SOCKS5 connection via {} within {:?}",
                    dialer.endpoint(),
                    timeout
                ),
            )))
        }
    };

    timeout_at(deadline, http_head(&mut stream, host))
        .await
        .map_err(|_| TcpProbeError::Timeout(timeout))??;

    debug!("TCP probe to {}:{} succeeded", host, config.tcp_target_port);
    Ok(())
}

/// 发送 HEAD 请求并检查响应的状态行前缀
async fn http_head<S>(stream: &mut S, host: &str) -> Result<(), TcpProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "HEAD / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        host
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(TcpProbeError::Io)?;
    stream.flush().await.map_err(TcpProbeError::Io)?;

    let mut prefix = [0u8; HTTP_PREFIX.len()];
    match stream.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(TcpProbeError::BadResponse(
                "connection closed before status line".to_string(),
            ))
        }
        Err(e) => return Err(TcpProbeError::Io(e)),
    }

    if prefix != HTTP_PREFIX {
        return Err(TcpProbeError::BadResponse(format!(
            "expected HTTP status line, got {:?}",
            String::from_utf8_lossy(&prefix)
        )));
    }
    Ok(())
}
