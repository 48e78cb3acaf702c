use crate::error::ProbeError;
use std::fmt;

/// 连通性检查的状态码
///
/// 数值是跨语言边界的二进制契约：只能追加，永远不能重新编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    NoError = 0,
    Unexpected = 1,
    /// 保留，未使用
    NoVpnPermissions = 2,
    AuthenticationFailure = 3,
    UdpConnectivity = 4,
    Unreachable = 5,
    /// 保留，未使用
    VpnStartFailure = 6,
    /// 保留
    IllegalConfiguration = 7,
    /// 保留，未使用
    Socks5StartFailure = 8,
    /// 保留，未使用
    ConfigureSystemProxyFailure = 9,
    /// 保留，未使用
    NoAdminPermissions = 10,
    /// 保留，未使用
    UnsupportedRoutingTable = 11,
    /// 保留
    SystemMisconfigured = 12,
}

impl StatusCode {
    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::NoError => "NoError",
            StatusCode::Unexpected => "Unexpected",
            StatusCode::NoVpnPermissions => "NoVpnPermissions",
            StatusCode::AuthenticationFailure => "AuthenticationFailure",
            StatusCode::UdpConnectivity => "UdpConnectivity",
            StatusCode::Unreachable => "Unreachable",
            StatusCode::VpnStartFailure => "VpnStartFailure",
            StatusCode::IllegalConfiguration => "IllegalConfiguration",
            StatusCode::Socks5StartFailure => "Socks5StartFailure",
            StatusCode::ConfigureSystemProxyFailure => "ConfigureSystemProxyFailure",
            StatusCode::NoAdminPermissions => "NoAdminPermissions",
            StatusCode::UnsupportedRoutingTable => "UnsupportedRoutingTable",
            StatusCode::SystemMisconfigured => "SystemMisconfigured",
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> i32 {
        code.number()
    }
}

impl TryFrom<i32> for StatusCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        let code = match value {
            0 => StatusCode::NoError,
            1 => StatusCode::Unexpected,
            2 => StatusCode::NoVpnPermissions,
            3 => StatusCode::AuthenticationFailure,
            4 => StatusCode::UdpConnectivity,
            5 => StatusCode::Unreachable,
            6 => StatusCode::VpnStartFailure,
            7 => StatusCode::IllegalConfiguration,
            8 => StatusCode::Socks5StartFailure,
            9 => StatusCode::ConfigureSystemProxyFailure,
            10 => StatusCode::NoAdminPermissions,
            11 => StatusCode::UnsupportedRoutingTable,
            12 => StatusCode::SystemMisconfigured,
            other => return Err(other),
        };
        Ok(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.number())
    }
}

/// 一次连通性检查的结果
#[derive(Debug)]
pub struct CheckOutcome {
    code: StatusCode,
    error: Option<ProbeError>,
}

impl CheckOutcome {
    pub(crate) fn success() -> Self {
        Self {
            code: StatusCode::NoError,
            error: None,
        }
    }

    pub(crate) fn failure(code: StatusCode, error: ProbeError) -> Self {
        debug_assert_ne!(code, StatusCode::NoError);
        Self {
            code,
            error: Some(error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code
    }

    /// 跨边界传递的整数状态码
    pub fn code(&self) -> i32 {
        self.code.number()
    }

    /// 仅用于诊断，调用方不应依赖它做分支判断
    pub fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::NoError
    }

    pub fn into_parts(self) -> (i32, Option<ProbeError>) {
        (self.code.number(), self.error)
    }
}
