use crate::endpoint::ProxyEndpoint;
use crate::error::{ClientError, UdpProbeError};
use crate::socks5::client::Credentials;
use fast_socks5::client::Socks5Datagram;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// UDP 数据报中继能力 (SOCKS5 UDP ASSOCIATE, 使用 fast-socks5)
///
/// 与 [`StreamDialer`](crate::socks5::StreamDialer) 绑定同一个代理端点，
/// 但是独立的对象，两者互不共享可变状态。
#[derive(Debug, Clone)]
pub struct PacketListener {
    endpoint: ProxyEndpoint,
    /// 可选的认证信息
    auth: Option<Credentials>,
    /// 本地 UDP 绑定地址 (不限制端口)
    bind_addr: SocketAddr,
}

impl PacketListener {
    /// 创建绑定到代理端点的 PacketListener，并启用 UDP 中继
    pub fn new(endpoint: ProxyEndpoint, auth: Option<Credentials>) -> Result<Self, ClientError> {
        if let Some(credentials) = &auth {
            credentials.validate("PacketListener")?;
        }

        let unspecified: IpAddr = if endpoint.ip().is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let bind_addr = SocketAddr::new(unspecified, 0);

        Ok(Self {
            endpoint,
            auth,
            bind_addr,
        })
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// 建立 UDP ASSOCIATE 会话
    ///
    /// 会话持有控制用的 TCP 连接，drop 时关闭。
    pub async fn listen(&self) -> Result<PacketSession, UdpProbeError> {
        let proxy_addr = self.endpoint.addr();
        debug!("SOCKS5 UDP ASSOCIATE via proxy {}", proxy_addr);

        // 1. 先建立 TCP 连接到 SOCKS5 代理
        let tcp_stream = TcpStream::connect(proxy_addr)
            .await
            .map_err(|e| UdpProbeError::Associate(format!("Failed to connect to SOCKS5 proxy: {}", e)))?;

        // 2. 使用 fast-socks5 建立 UDP ASSOCIATE
        let datagram = if let Some(credentials) = &self.auth {
            Socks5Datagram::bind_with_password(
                tcp_stream,
                self.bind_addr,
                &credentials.username,
                &credentials.password,
            )
            .await
        } else {
            Socks5Datagram::bind(tcp_stream, self.bind_addr).await
        }
        .map_err(|e| UdpProbeError::Associate(e.to_string()))?;

        info!("SOCKS5 UDP ASSOCIATE established via {}", proxy_addr);

        Ok(PacketSession { datagram })
    }
}

/// 一次 UDP ASSOCIATE 会话
pub struct PacketSession {
    datagram: Socks5Datagram<TcpStream>,
}

impl PacketSession {
    /// 通过代理发送数据报
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<usize, UdpProbeError> {
        self.datagram
            .send_to(data, target)
            .await
            .map_err(|e| UdpProbeError::Io(e.to_string()))
    }

    /// 接收经代理转发回来的数据报，返回长度
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize, UdpProbeError> {
        let (len, from) = self
            .datagram
            .recv_from(buf)
            .await
            .map_err(|e| UdpProbeError::Io(e.to_string()))?;
        debug!("Received {} bytes from {:?} via UDP relay", len, from);
        Ok(len)
    }
}
