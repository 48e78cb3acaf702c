use crate::error::CheckError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// 可达性探测的固定超时
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// SOCKS5 代理主机名或 IP
    pub host: String,
    /// SOCKS5 代理端口
    pub port: u16,
    /// 可选: SOCKS5 认证 - 用户名
    #[serde(default)]
    pub username: Option<String>,
    /// 可选: SOCKS5 认证 - 密码
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// 用户名和密码都配置时才启用认证
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// 连通性探测参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// TCP 探测目标主机 (由代理解析)
    pub tcp_target_host: String,
    /// TCP 探测目标端口
    pub tcp_target_port: u16,
    /// UDP 探测使用的 DNS 服务器
    pub udp_resolver: SocketAddr,
    /// UDP 探测查询的域名
    pub udp_query_name: String,
    /// TCP 探测总超时(毫秒)
    pub tcp_timeout_ms: u64,
    /// UDP 探测总超时(毫秒)
    pub udp_timeout_ms: u64,
    /// 每次 UDP 尝试的超时(毫秒)
    pub udp_attempt_timeout_ms: u64,
    /// UDP 最大尝试次数
    pub udp_attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tcp_target_host: "example.com".to_string(),
            tcp_target_port: 80,
            udp_resolver: SocketAddr::from(([1, 1, 1, 1], 53)),
            udp_query_name: "example.com".to_string(),
            tcp_timeout_ms: 10_000,
            udp_timeout_ms: 10_000,
            udp_attempt_timeout_ms: 1_000,
            udp_attempts: 5,
        }
    }
}

impl ProbeConfig {
    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_millis(self.tcp_timeout_ms)
    }

    pub fn udp_timeout(&self) -> Duration {
        Duration::from_millis(self.udp_timeout_ms)
    }

    pub fn udp_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.udp_attempt_timeout_ms)
    }

    /// 检查参数；探测超时不能比可达性探测的超时更宽松
    pub fn validate(&self) -> std::result::Result<(), CheckError> {
        let invalid = |msg: String| Err(CheckError::InvalidConfig(msg));

        if self.tcp_target_host.is_empty() {
            return invalid("tcp_target_host is empty".to_string());
        }
        if self.tcp_target_port == 0 {
            return invalid("tcp_target_port is 0".to_string());
        }
        if self.udp_resolver.port() == 0 {
            return invalid("udp_resolver port is 0".to_string());
        }
        if self.udp_attempts == 0 {
            return invalid("udp_attempts is 0".to_string());
        }
        for (name, value) in [
            ("tcp_timeout_ms", self.tcp_timeout()),
            ("udp_timeout_ms", self.udp_timeout()),
            ("udp_attempt_timeout_ms", self.udp_attempt_timeout()),
        ] {
            if value.is_zero() {
                return invalid(format!("{} is 0", name));
            }
            if value > REACHABILITY_TIMEOUT {
                return invalid(format!(
                    "{} exceeds {:?}",
                    name, REACHABILITY_TIMEOUT
                ));
            }
        }
        crate::dns::build_query(0, &self.udp_query_name)
            .map_err(|e| CheckError::InvalidConfig(format!("udp_query_name: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 日志格式: json, pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// 从文件加载配置
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config
            .probe
            .validate()
            .with_context(|| format!("Invalid probe settings in {}", path))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }
}
