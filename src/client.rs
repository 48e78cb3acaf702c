/// 双能力代理客户端
///
/// 同一个代理端点上构建两个独立的 SOCKS5 客户端：一个负责 TCP 流中继，
/// 一个负责 UDP 数据报中继。
use crate::endpoint::ProxyEndpoint;
use crate::error::ClientError;
use crate::socks5::{Credentials, PacketListener, StreamDialer};
use tracing::info;

/// 连接到远程 SOCKS5 代理的客户端
///
/// 构建后不可变，可以在多个连通性检查之间共享。
#[derive(Debug, Clone)]
pub struct Client {
    stream_dialer: StreamDialer,
    packet_listener: PacketListener,
}

impl Client {
    /// 解析代理地址并构建客户端 (无认证)
    pub async fn new(host: &str, port: u16) -> Result<Self, ClientError> {
        let endpoint = ProxyEndpoint::resolve(host, port).await?;
        Self::from_endpoint(endpoint, None)
    }

    /// 解析代理地址并构建带用户名/密码认证的客户端
    pub async fn with_credentials(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let endpoint = ProxyEndpoint::resolve(host, port).await?;
        Self::from_endpoint(endpoint, Some(Credentials::new(username, password)))
    }

    /// 在已解析的端点上构建两个能力
    ///
    /// 任一能力构建失败则整体失败，不返回部分构建的客户端。不进行网络 I/O。
    pub fn from_endpoint(
        endpoint: ProxyEndpoint,
        auth: Option<Credentials>,
    ) -> Result<Self, ClientError> {
        let stream_dialer = StreamDialer::new(endpoint, auth.clone())?;

        // 第二个 SOCKS5 客户端，使用同一个端点，启用 UDP
        let packet_listener = PacketListener::new(endpoint, auth)?;

        info!("SOCKS5 client created for proxy {}", endpoint);

        Ok(Self {
            stream_dialer,
            packet_listener,
        })
    }

    pub fn stream_dialer(&self) -> &StreamDialer {
        &self.stream_dialer
    }

    pub fn packet_listener(&self) -> &PacketListener {
        &self.packet_listener
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        self.stream_dialer.endpoint()
    }
}
