//! UDP 探测使用的最小 DNS 报文编码
//!
//! 只构造单个 A 记录查询，并检查响应头部。
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const TYPE_A: u16 = 1;
pub const CLASS_IN: u16 = 1;

const FLAG_QR: u16 = 1 << 15;
const FLAG_RD: u16 = 1 << 8;
const HEADER_LEN: usize = 12;

/// DNS 编解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("dns: invalid name")]
    InvalidName,

    #[error("dns: label too long (max 63)")]
    LabelTooLong,

    #[error("dns: name too long")]
    NameTooLong,

    #[error("dns: message truncated ({0} bytes)")]
    Truncated(usize),
}

/// 构造一个递归 A 记录查询
pub fn build_query(id: u16, name: &str) -> Result<Bytes, DnsError> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + name.len() + 6);

    buf.put_u16(id);
    buf.put_u16(FLAG_RD);
    buf.put_u16(1); // QDCOUNT
    buf.put_u16(0); // ANCOUNT
    buf.put_u16(0); // NSCOUNT
    buf.put_u16(0); // ARCOUNT

    encode_name(&mut buf, name)?;
    buf.put_u16(TYPE_A);
    buf.put_u16(CLASS_IN);

    Ok(buf.freeze())
}

fn encode_name(buf: &mut BytesMut, name: &str) -> Result<(), DnsError> {
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        buf.put_u8(0);
        return Ok(());
    }

    let mut total_len = 0;
    for label in name.split('.') {
        if label.is_empty() {
            return Err(DnsError::InvalidName);
        }
        if label.len() > 63 {
            return Err(DnsError::LabelTooLong);
        }
        total_len += 1 + label.len();
        if total_len > 253 {
            return Err(DnsError::NameTooLong);
        }
        buf.put_u8(label.len() as u8);
        buf.put_slice(label.as_bytes());
    }
    buf.put_u8(0);
    Ok(())
}

/// 检查 `data` 是否是对查询 `id` 的响应
///
/// 不关心 RCODE：任何响应都说明 UDP 中继是通的。
pub fn is_response_to(data: &[u8], id: u16) -> Result<bool, DnsError> {
    if data.len() < HEADER_LEN {
        return Err(DnsError::Truncated(data.len()));
    }
    let resp_id = u16::from_be_bytes([data[0], data[1]]);
    let flags = u16::from_be_bytes([data[2], data[3]]);
    Ok(resp_id == id && flags & FLAG_QR != 0)
}
