//! 客户端构建与连通性探测的错误类型
use std::io;
use std::time::Duration;
use thiserror::Error;

/// 构建客户端时可能出现的错误
///
/// 这些错误在构建阶段直接返回给调用方，永远不会被转换为状态码。
#[derive(Error, Debug)]
pub enum ClientError {
    /// 端口号无效 (0)
    #[error("Invalid proxy port: {0}")]
    InvalidPort(u16),

    /// 代理地址无法解析
    #[error("Failed to resolve proxy address {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    /// SOCKS5 客户端对象无法构建
    #[error("Failed to create {capability}: {reason}")]
    ProtocolSetup {
        capability: &'static str,
        reason: String,
    },
}

/// TCP 探测失败
#[derive(Error, Debug)]
pub enum TcpProbeError {
    /// 代理拒绝了认证
    #[error("Proxy rejected authentication: {0}")]
    Authentication(String),

    /// 无法连接到代理
    #[error("Proxy unreachable: {0}")]
    Unreachable(#[source] io::Error),

    /// 超时
    #[error("TCP probe timed out after {0:?}")]
    Timeout(Duration),

    /// 代理拒绝了请求或握手失败
    #[error("SOCKS5 connection failed: {0}")]
    Rejected(String),

    /// 连接建立后的读写失败
    #[error("TCP relay I/O failed: {0}")]
    Io(#[source] io::Error),

    /// 目标返回了无法识别的响应
    #[error("Unexpected response from probe target: {0}")]
    BadResponse(String),
}

impl TcpProbeError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, TcpProbeError::Authentication(_))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, TcpProbeError::Unreachable(_))
    }
}

/// UDP 探测失败
#[derive(Error, Debug)]
pub enum UdpProbeError {
    /// UDP ASSOCIATE 失败
    #[error("SOCKS5 UDP ASSOCIATE failed: {0}")]
    Associate(String),

    /// 数据报收发失败
    #[error("UDP relay I/O failed: {0}")]
    Io(String),

    /// 所有尝试都没有收到响应
    #[error("No UDP response after {attempts} attempts")]
    NoResponse { attempts: u32 },

    /// 超时
    #[error("UDP probe timed out after {0:?}")]
    Timeout(Duration),
}

/// 单个探测的失败原因
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Tcp(#[from] TcpProbeError),

    #[error(transparent)]
    Udp(#[from] UdpProbeError),
}

/// 探测无法启动时的错误 (对应 Unexpected)
#[derive(Error, Debug)]
pub enum CheckError {
    /// 探测配置无效
    #[error("Invalid probe configuration: {0}")]
    InvalidConfig(String),
}
