/// 代理地址解析
///
/// 将主机名解析为唯一的 IP 地址，生成 `IP:PORT` 形式的连接目标。
use crate::error::ClientError;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// 已解析的代理端点 (不可变)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyEndpoint {
    addr: SocketAddr,
}

impl ProxyEndpoint {
    /// 解析代理地址
    ///
    /// 只取一个地址：优先第一个 IPv4 地址，否则取第一个地址。
    /// 不做多地址轮询或基于延迟的选择。
    pub async fn resolve(host: &str, port: u16) -> Result<Self, ClientError> {
        if port == 0 {
            return Err(ClientError::InvalidPort(port));
        }

        // 字面 IP 不需要查询
        if let Ok(ip) = strip_brackets(host).parse::<IpAddr>() {
            return Ok(Self::from_addr(SocketAddr::new(ip, port)));
        }

        let resolution_error = |source: io::Error| ClientError::Resolution {
            host: host.to_string(),
            source,
        };

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(resolution_error)?
            .collect();

        let addr = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| {
                resolution_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })?;

        debug!("Resolved proxy {}:{} to {}", host, port, addr);
        Ok(Self::from_addr(addr))
    }

    pub fn from_addr(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// 连接目标字符串，IPv6 带方括号
    pub fn target(&self) -> String {
        self.addr.to_string()
    }
}

/// 去掉成对的方括号 (`[::1]` -> `::1`)，不成对时原样返回
pub(crate) fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}
