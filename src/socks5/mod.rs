pub mod client;
pub mod udp;

// 重新导出常用类型
pub use client::{Credentials, StreamDialer};
pub use udp::{PacketListener, PacketSession};
