//! 网络连接管理
//!
//! 使用 protocol 库的传输层抽象。连接拆成读写两端，各由一个任务驱动，
//! 会话通过通道收发，自身不直接接触 IO。

use chess_protocol::{Connection, Envelope, FrameSink, FrameSource, ProtocolError, Request};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::RequestSink;

/// 请求发送端（发出即忘，不重试）
#[derive(Debug, Clone)]
pub struct Gateway {
    tx: mpsc::UnboundedSender<Request>,
}

/// 服务端消息的有序队列
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Gateway {
    /// 拆分连接并启动读写任务
    pub fn spawn<C: Connection>(conn: C) -> (Gateway, Inbox) {
        let peer = conn.peer_addr().unwrap_or_else(|| "in-process".to_string());
        let (mut sink, mut source) = conn.split();
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Request>();
        let (envelope_tx, envelope_rx) = mpsc::unbounded_channel::<Envelope>();

        let writer = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                tracing::debug!(kind = ?request.kind(), "Sending request");
                if let Err(e) = sink.send(&request).await {
                    tracing::error!("Failed to send request: {}", e);
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                tracing::debug!("Close failed: {}", e);
            }
        });

        let reader = tokio::spawn(async move {
            loop {
                match source.recv::<Envelope>().await {
                    Ok(envelope) => {
                        if envelope_tx.send(envelope).is_err() {
                            break;
                        }
                    }
                    Err(ProtocolError::Json(e)) => {
                        tracing::warn!("Skipping undecodable frame: {}", e);
                    }
                    Err(ProtocolError::ConnectionClosed) => {
                        tracing::info!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Receive error: {}", e);
                        break;
                    }
                }
            }
        });

        tracing::info!(%peer, "Gateway started");
        (
            Gateway { tx: request_tx },
            Inbox {
                rx: envelope_rx,
                reader,
                writer,
            },
        )
    }

    /// 加入发送队列
    pub fn send(&self, request: Request) {
        if self.tx.send(request).is_err() {
            tracing::warn!("Gateway writer is gone, request dropped");
        }
    }
}

impl RequestSink for Gateway {
    fn send(&mut self, request: Request) {
        Gateway::send(self, request);
    }
}

impl Inbox {
    /// 下一条消息，连接关闭后返回 None
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
