use crate::endpoint::ProxyEndpoint;
use crate::error::{ClientError, TcpProbeError};
use fast_socks5::client::{Config, Socks5Stream};
use fast_socks5::util::target_addr::ToTargetAddr;
use fast_socks5::{AuthenticationMethod, Socks5Command, SocksError};
use std::fmt;
use std::io;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// RFC 1929 用户名/密码的最大长度
const MAX_CREDENTIAL_LEN: usize = 255;

/// SOCKS5 用户名/密码认证信息
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 检查长度是否符合 RFC 1929 (1..=255 字节)
    pub(crate) fn validate(&self, capability: &'static str) -> Result<(), ClientError> {
        for (field, value) in [("username", &self.username), ("password", &self.password)] {
            if value.is_empty() || value.len() > MAX_CREDENTIAL_LEN {
                return Err(ClientError::ProtocolSetup {
                    capability,
                    reason: format!(
                        "{} must be 1 to {} bytes, got {}",
                        field,
                        MAX_CREDENTIAL_LEN,
                        value.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

// 不在日志中输出密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TCP 流中继能力 (SOCKS5 CONNECT, 使用 fast-socks5 库)
#[derive(Debug, Clone)]
pub struct StreamDialer {
    endpoint: ProxyEndpoint,
    /// 可选的认证信息
    auth: Option<Credentials>,
}

impl StreamDialer {
    /// 创建绑定到代理端点的 StreamDialer
    ///
    /// 只做参数检查，不进行任何网络 I/O。
    pub fn new(endpoint: ProxyEndpoint, auth: Option<Credentials>) -> Result<Self, ClientError> {
        if let Some(credentials) = &auth {
            credentials.validate("StreamDialer")?;
        }
        Ok(Self { endpoint, auth })
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }

    /// 通过代理连接到目标服务器
    ///
    /// # 参数
    /// * `target` - 目标主机 (域名或IP)，域名由代理解析
    /// * `port` - 目标端口
    pub async fn dial(
        &self,
        target: &str,
        port: u16,
    ) -> Result<Socks5Stream<TcpStream>, TcpProbeError> {
        let proxy_addr = self.endpoint.addr();
        debug!(
            "SOCKS5 CONNECT to {}:{} via proxy {}",
            target, port, proxy_addr
        );

        // 1. 先建立 TCP 连接到 SOCKS5 代理
        let socket = TcpStream::connect(proxy_addr)
            .await
            .map_err(proxy_connect_error)?;

        // 2. 握手和认证
        let auth = self.auth.as_ref().map(|credentials| AuthenticationMethod::Password {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        });
        let mut stream = Socks5Stream::use_stream(socket, auth, Config::default())
            .await
            .map_err(classify_socks_error)?;

        // 3. CONNECT，域名由代理解析
        let target_addr = (target, port)
            .to_target_addr()
            .map_err(|e| TcpProbeError::Rejected(e.to_string()))?;
        stream
            .request(Socks5Command::TCPConnect, target_addr)
            .await
            .map_err(classify_socks_error)?;

        info!(
            "SOCKS5 CONNECT established: {}:{} via {}",
            target, port, proxy_addr
        );

        Ok(stream)
    }
}

/// 连接代理本身失败
///
/// 只有这一步的失败代表代理不可达；握手之后的错误 (包括代理回复的
/// ConnectionRefused) 都与目标有关。
fn proxy_connect_error(err: io::Error) -> TcpProbeError {
    if is_unreachable(&err) {
        TcpProbeError::Unreachable(err)
    } else {
        TcpProbeError::Io(err)
    }
}

/// 将 fast-socks5 的握手/请求错误归类
pub(crate) fn classify_socks_error(err: SocksError) -> TcpProbeError {
    match err {
        SocksError::AuthenticationRejected(_)
        | SocksError::AuthenticationFailed(_)
        | SocksError::AuthMethodUnacceptable(_) => TcpProbeError::Authentication(err.to_string()),
        err => TcpProbeError::Rejected(err.to_string()),
    }
}

/// 网络层面无法到达代理
pub(crate) fn is_unreachable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::TimedOut
    )
}
