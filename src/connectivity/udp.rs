/// UDP 探测
///
/// 通过 UDP ASSOCIATE 会话向 DNS 服务器发送 A 查询，收到匹配的响应即认为
/// UDP 中继可用。每次尝试单独超时，整个探测另有总超时。
use crate::config::ProbeConfig;
use crate::dns;
use crate::error::UdpProbeError;
use crate::socks5::{PacketListener, PacketSession};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const MAX_DNS_PACKET: usize = 512;

pub async fn probe(listener: &PacketListener, config: &ProbeConfig) -> Result<(), UdpProbeError> {
    let timeout = config.udp_timeout();
    tokio::time::timeout(timeout, run(listener, config))
        .await
        .map_err(|_| UdpProbeError::Timeout(timeout))?
}

async fn run(listener: &PacketListener, config: &ProbeConfig) -> Result<(), UdpProbeError> {
    let session = listener.listen().await?;

    let base_id = initial_query_id();
    let mut sent_ids = Vec::with_capacity(config.udp_attempts as usize);
    let mut buf = [0u8; MAX_DNS_PACKET];

    for attempt in 0..config.udp_attempts {
        let id = base_id.wrapping_add(attempt as u16);
        let query = dns::build_query(id, &config.udp_query_name)
            .map_err(|e| UdpProbeError::Io(e.to_string()))?;

        session.send_to(&query, config.udp_resolver).await?;
        sent_ids.push(id);

        // 较早尝试的迟到响应同样有效
        match tokio::time::timeout(
            config.udp_attempt_timeout(),
            wait_response(&session, &mut buf, &sent_ids),
        )
        .await
        {
            Ok(result) => {
                result?;
                debug!(
                    "UDP probe to {} succeeded after {} attempt(s)",
                    config.udp_resolver,
                    attempt + 1
                );
                return Ok(());
            }
            Err(_) => {
                debug!(
                    "UDP probe attempt {}/{} to {} timed out",
                    attempt + 1,
                    config.udp_attempts,
                    config.udp_resolver
                );
            }
        }
    }

    Err(UdpProbeError::NoResponse {
        attempts: config.udp_attempts,
    })
}

async fn wait_response(
    session: &PacketSession,
    buf: &mut [u8],
    ids: &[u16],
) -> Result<(), UdpProbeError> {
    loop {
        let n = session.recv(buf).await?;
        let data = &buf[..n];
        if ids
            .iter()
            .any(|&id| dns::is_response_to(data, id).unwrap_or(false))
        {
            return Ok(());
        }
        debug!("Ignoring unrelated {} byte datagram", n);
    }
}

fn initial_query_id() -> u16 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u16)
        .unwrap_or(0)
}
