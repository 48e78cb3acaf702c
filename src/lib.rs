//! proxycheck 库
//!
//! SOCKS5 代理客户端：在把默认路由切换到代理之前，检查代理能否同时中继 TCP 和 UDP

pub mod client;
pub mod config;
pub mod connectivity;
pub mod dns;
pub mod endpoint;
pub mod error;
pub mod socks5;

// 重新导出常用类型
pub use client::Client;
pub use config::{Config, ProbeConfig};
pub use connectivity::{
    check_connectivity, check_connectivity_with, check_server_reachable, CheckOutcome, StatusCode,
};
pub use endpoint::ProxyEndpoint;
pub use error::{CheckError, ClientError, ProbeError};
