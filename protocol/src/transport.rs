//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 目前有三种实现：
//! - TCP 帧（版本号 + 长度头 + JSON 负载）
//! - WebSocket 文本帧
//! - 进程内通道（嵌入式使用与测试）

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ProtocolError, Result};
use crate::{CONNECT_TIMEOUT, MAX_FRAME_SIZE, PROTOCOL_VERSION};

/// 传输协议类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Tcp,
    #[default]
    WebSocket,
}

/// 发送端
#[async_trait]
pub trait FrameSink: Send {
    /// 发送消息
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()>;

    /// 关闭发送端
    async fn close(&mut self) -> Result<()>;
}

/// 接收端
#[async_trait]
pub trait FrameSource: Send {
    /// 接收消息
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M>;
}

/// 连接抽象 trait（核心抽象，用于业务层）
///
/// 整体使用时可直接收发；需要并发读写时拆分为两端。
pub trait Connection: FrameSink + FrameSource + Sized {
    type Sink: FrameSink + 'static;
    type Source: FrameSource + 'static;

    /// 分离读写端
    fn split(self) -> (Self::Sink, Self::Source);

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（服务端 / 测试桩使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }
}

#[async_trait]
impl FrameSink for TcpConnection {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.writer.write_frame(msg).await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }
}

#[async_trait]
impl FrameSource for TcpConnection {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        self.reader.read_frame().await
    }
}

impl Connection for TcpConnection {
    type Sink = FrameWriter<OwnedWriteHalf>;
    type Source = FrameReader<OwnedReadHalf>;

    fn split(self) -> (Self::Sink, Self::Source) {
        (self.writer, self.reader)
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 帧编解码
// ============================================================================

/// 帧头大小: 1 字节版本 + 4 字节长度
const HEADER_SIZE: usize = 5;

fn map_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// 读取并解码一帧消息
    pub async fn read_frame<M: DeserializeOwned>(&mut self) -> Result<M> {
        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header).await.map_err(map_eof)?;

        let version = header[0];
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: version,
            });
        }

        // 长度（大端序）
        let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }

        if self.buffer.len() < length {
            self.buffer.resize(length, 0);
        }
        self.reader
            .read_exact(&mut self.buffer[..length])
            .await
            .map_err(map_eof)?;

        let msg = serde_json::from_slice(&self.buffer[..length])?;
        Ok(msg)
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for FrameReader<R> {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        self.read_frame().await
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 编码并写入一帧消息
    pub async fn write_frame<M: Serialize>(&mut self, msg: &M) -> Result<()> {
        let payload = serde_json::to_vec(msg)?;

        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let length = payload.len() as u32;
        let mut header = [0u8; HEADER_SIZE];
        header[0] = PROTOCOL_VERSION;
        header[1..5].copy_from_slice(&length.to_be_bytes());

        self.writer.write_all(&header).await?;
        self.writer.write_all(&payload).await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// 关闭写入端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for FrameWriter<W> {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.write_frame(msg).await
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await
    }
}

// ============================================================================
// WebSocket 实现
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket 连接器，地址形如 `ws://host:port/path`
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)??;

        let (sink, stream) = stream.split();
        Ok(WsConnection {
            sink: WsSink { sink },
            source: WsSource { stream },
            peer_addr: Some(addr.to_string()),
        })
    }
}

/// WebSocket 连接
pub struct WsConnection {
    sink: WsSink,
    source: WsSource,
    peer_addr: Option<String>,
}

/// WebSocket 发送端
pub struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

/// WebSocket 接收端
pub struct WsSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.sink.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Binary(bytes))) => return Ok(serde_json::from_slice(&bytes)?),
                Some(Ok(Message::Close(_))) | None => return Err(ProtocolError::ConnectionClosed),
                // Ping/Pong 由 tungstenite 自动处理
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl FrameSink for WsConnection {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.sink.send(msg).await
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await
    }
}

#[async_trait]
impl FrameSource for WsConnection {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        self.source.recv().await
    }
}

impl Connection for WsConnection {
    type Sink = WsSink;
    type Source = WsSource;

    fn split(self) -> (Self::Sink, Self::Source) {
        (self.sink, self.source)
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

// ============================================================================
// 进程内通道
// ============================================================================

/// 进程内连接，消息以 JSON 值传递
pub struct ChannelConnection {
    sink: ChannelSink,
    source: ChannelSource,
}

/// 通道发送端
pub struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<serde_json::Value>>,
}

/// 通道接收端
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<serde_json::Value>,
}

impl ChannelConnection {
    /// 创建一对互相连通的连接
    pub fn pair() -> (ChannelConnection, ChannelConnection) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            ChannelConnection {
                sink: ChannelSink { tx: Some(a_tx) },
                source: ChannelSource { rx: a_rx },
            },
            ChannelConnection {
                sink: ChannelSink { tx: Some(b_tx) },
                source: ChannelSource { rx: b_rx },
            },
        )
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        let value = serde_json::to_value(msg)?;
        let tx = self.tx.as_ref().ok_or(ProtocolError::ConnectionClosed)?;
        tx.send(value).map_err(|_| ProtocolError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        let value = self.rx.recv().await.ok_or(ProtocolError::ConnectionClosed)?;
        Ok(M::deserialize(value)?)
    }
}

#[async_trait]
impl FrameSink for ChannelConnection {
    async fn send<M: Serialize + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.sink.send(msg).await
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await
    }
}

#[async_trait]
impl FrameSource for ChannelConnection {
    async fn recv<M: DeserializeOwned>(&mut self) -> Result<M> {
        self.source.recv().await
    }
}

impl Connection for ChannelConnection {
    type Sink = ChannelSink;
    type Source = ChannelSource;

    fn split(self) -> (Self::Sink, Self::Source) {
        (self.sink, self.source)
    }

    fn peer_addr(&self) -> Option<String> {
        None
    }
}
