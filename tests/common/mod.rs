//! 集成测试用的本地 SOCKS5 代理、HTTP 目标和 DNS 响应器
#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

const VER: u8 = 5;
const NO_AUTH: u8 = 0;
const USER_PASS: u8 = 2;
const NO_ACCEPTABLE: u8 = 0xFF;

const CMD_CONNECT: u8 = 1;
const CMD_UDP_ASSOCIATE: u8 = 3;

const ATYP_IPV4: u8 = 1;
const ATYP_DOMAIN: u8 = 3;
const ATYP_IPV6: u8 = 4;

const REP_SUCCESS: u8 = 0;
const REP_CONNECTION_REFUSED: u8 = 5;
const REP_COMMAND_NOT_SUPPORTED: u8 = 7;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UdpMode {
    /// 正常转发数据报
    Relay,
    /// ASSOCIATE 成功，但丢弃所有数据报
    Drop,
}

#[derive(Clone)]
pub struct MockOptions {
    pub credentials: Option<(String, String)>,
    pub udp: UdpMode,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            udp: UdpMode::Relay,
        }
    }
}

/// 本地 SOCKS5 代理，记录仍在处理中的连接数
pub struct MockProxy {
    pub addr: SocketAddr,
    active: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockProxy {
    pub async fn start(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));

        let handle = {
            let active = active.clone();
            let accepted = accepted.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let guard = ActiveGuard::new(active.clone());
                    let options = options.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        let _ = handle_client(stream, options).await;
                    });
                }
            })
        };

        Self {
            addr,
            active,
            accepted,
            handle,
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// 等待所有连接处理结束
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.active() == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.active() == 0
    }
}

impl Drop for MockProxy {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn handle_client(mut stream: TcpStream, options: MockOptions) -> io::Result<()> {
    if !negotiate(&mut stream, &options).await? {
        return Ok(());
    }

    let mut req = [0u8; 4];
    stream.read_exact(&mut req).await?;
    if req[0] != VER {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad version"));
    }
    let target = read_addr(&mut stream, req[3]).await?;

    match req[1] {
        CMD_CONNECT => handle_connect(stream, target).await,
        CMD_UDP_ASSOCIATE => handle_udp_associate(stream, options.udp).await,
        _ => reply(&mut stream, REP_COMMAND_NOT_SUPPORTED, unspecified()).await,
    }
}

/// 方法协商和 RFC 1929 认证，返回是否继续
async fn negotiate(stream: &mut TcpStream, options: &MockOptions) -> io::Result<bool> {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await?;
    if head[0] != VER {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad version"));
    }
    let mut methods = vec![0u8; head[1] as usize];
    stream.read_exact(&mut methods).await?;

    let Some((username, password)) = &options.credentials else {
        let method = if methods.contains(&NO_AUTH) {
            NO_AUTH
        } else {
            NO_ACCEPTABLE
        };
        stream.write_all(&[VER, method]).await?;
        return Ok(method == NO_AUTH);
    };

    if !methods.contains(&USER_PASS) {
        stream.write_all(&[VER, NO_ACCEPTABLE]).await?;
        return Ok(false);
    }
    stream.write_all(&[VER, USER_PASS]).await?;

    let mut ver_len = [0u8; 2];
    stream.read_exact(&mut ver_len).await?;
    let mut user = vec![0u8; ver_len[1] as usize];
    stream.read_exact(&mut user).await?;
    let mut plen = [0u8; 1];
    stream.read_exact(&mut plen).await?;
    let mut pass = vec![0u8; plen[0] as usize];
    stream.read_exact(&mut pass).await?;

    let ok = user == username.as_bytes() && pass == password.as_bytes();
    stream.write_all(&[1, if ok { 0 } else { 1 }]).await?;
    Ok(ok)
}

async fn read_addr(stream: &mut TcpStream, atyp: u8) -> io::Result<String> {
    let host = match atyp {
        ATYP_IPV4 => {
            let mut ip = [0u8; 4];
            stream.read_exact(&mut ip).await?;
            Ipv4Addr::from(ip).to_string()
        }
        ATYP_IPV6 => {
            let mut ip = [0u8; 16];
            stream.read_exact(&mut ip).await?;
            format!("[{}]", std::net::Ipv6Addr::from(ip))
        }
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            stream.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).to_string()
        }
        _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "bad atyp")),
    };
    let mut port = [0u8; 2];
    stream.read_exact(&mut port).await?;
    Ok(format!("{}:{}", host, u16::from_be_bytes(port)))
}

fn unspecified() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
}

async fn reply(stream: &mut TcpStream, rep: u8, bind: SocketAddr) -> io::Result<()> {
    let mut packet = vec![VER, rep, 0];
    push_addr(&mut packet, bind);
    stream.write_all(&packet).await
}

fn push_addr(packet: &mut Vec<u8>, addr: SocketAddr) {
    match addr {
        SocketAddr::V4(addr) => {
            packet.push(ATYP_IPV4);
            packet.extend_from_slice(&addr.ip().octets());
        }
        SocketAddr::V6(addr) => {
            packet.push(ATYP_IPV6);
            packet.extend_from_slice(&addr.ip().octets());
        }
    }
    packet.extend_from_slice(&addr.port().to_be_bytes());
}

async fn handle_connect(mut stream: TcpStream, target: String) -> io::Result<()> {
    let upstream = match TcpStream::connect(&target).await {
        Ok(upstream) => upstream,
        Err(_) => return reply(&mut stream, REP_CONNECTION_REFUSED, unspecified()).await,
    };
    reply(&mut stream, REP_SUCCESS, unspecified()).await?;

    let (mut client_read, mut client_write) = stream.split();
    let mut upstream = upstream;
    let (mut upstream_read, mut upstream_write) = upstream.split();

    // 任一方向结束即关闭
    tokio::select! {
        _ = tokio::io::copy(&mut client_read, &mut upstream_write) => {}
        _ = tokio::io::copy(&mut upstream_read, &mut client_write) => {}
    }
    Ok(())
}

async fn handle_udp_associate(mut stream: TcpStream, mode: UdpMode) -> io::Result<()> {
    let relay = UdpSocket::bind("127.0.0.1:0").await?;
    reply(&mut stream, REP_SUCCESS, relay.local_addr()?).await?;

    // 控制连接关闭时会话结束
    let mut buf = [0u8; 64];
    tokio::select! {
        _ = async {
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        } => {}
        _ = relay_udp(relay, mode) => {}
    }
    Ok(())
}

async fn relay_udp(relay: UdpSocket, mode: UdpMode) -> io::Result<()> {
    let upstream = UdpSocket::bind("127.0.0.1:0").await?;
    let mut client_addr: Option<SocketAddr> = None;
    let mut buf = [0u8; 2048];
    let mut upstream_buf = [0u8; 2048];

    loop {
        tokio::select! {
            result = relay.recv_from(&mut buf) => {
                let (n, from) = result?;
                if mode == UdpMode::Drop {
                    continue;
                }
                client_addr = Some(from);
                if let Some((target, offset)) = parse_udp_header(&buf[..n]) {
                    upstream.send_to(&buf[offset..n], target).await?;
                }
            }
            result = upstream.recv_from(&mut upstream_buf) => {
                let (n, from) = result?;
                if let Some(client) = client_addr {
                    let mut packet = vec![0, 0, 0];
                    push_addr(&mut packet, from);
                    packet.extend_from_slice(&upstream_buf[..n]);
                    relay.send_to(&packet, client).await?;
                }
            }
        }
    }
}

/// 解析 SOCKS5 UDP 头部，返回 (目标地址, 数据偏移)
fn parse_udp_header(data: &[u8]) -> Option<(SocketAddr, usize)> {
    if data.len() < 4 || data[2] != 0 {
        return None;
    }
    match data[3] {
        ATYP_IPV4 if data.len() >= 10 => {
            let ip = Ipv4Addr::new(data[4], data[5], data[6], data[7]);
            let port = u16::from_be_bytes([data[8], data[9]]);
            Some((SocketAddr::V4(SocketAddrV4::new(ip, port)), 10))
        }
        ATYP_IPV6 if data.len() >= 22 => {
            let mut ip = [0u8; 16];
            ip.copy_from_slice(&data[4..20]);
            let port = u16::from_be_bytes([data[20], data[21]]);
            Some((SocketAddr::V6(SocketAddrV6::new(ip.into(), port, 0, 0)), 22))
        }
        _ => None,
    }
}

/// 本地 TCP 目标，对每个连接返回固定响应；`response` 为空时只读不写
pub async fn start_tcp_target(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                if !response.is_empty() {
                    let _ = stream.read(&mut buf).await;
                    let _ = stream.write_all(response).await;
                }
                while let Ok(n) = stream.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// 本地 DNS 响应器：原样返回查询并置 QR 位
pub async fn start_dns_responder() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((n, from)) = socket.recv_from(&mut buf).await {
            if n >= 12 {
                buf[2] |= 0x80;
                let _ = socket.send_to(&buf[..n], from).await;
            }
        }
    });
    addr
}

/// 已绑定但不监听的本地端口，连接会被立即拒绝
///
/// 持有期间端口不会被其他测试占用。
pub struct ClosedPort {
    _socket: TcpSocket,
    pub port: u16,
}

pub fn closed_port() -> ClosedPort {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let port = socket.local_addr().unwrap().port();
    ClosedPort {
        _socket: socket,
        port,
    }
}

/// 监听队列已满且从不 accept 的本地端口，新的 SYN 得不到应答
pub struct SaturatedPort {
    _listener: TcpListener,
    _pending: Vec<TcpStream>,
    pub port: u16,
}

pub async fn saturated_port() -> SaturatedPort {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut pending = Vec::new();
    for _ in 0..16 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => pending.push(stream),
            _ => break,
        }
    }

    SaturatedPort {
        _listener: listener,
        _pending: pending,
        port: addr.port(),
    }
}
