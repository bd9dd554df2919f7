//! 错误类型定义

use thiserror::Error;

/// 棋盘数据错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChessError {
    /// 无效的坐标（越界或格式错误）
    #[error("Invalid coordinate: {input}")]
    InvalidCoordinate { input: String },

    /// 无法解析的局面字符串
    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// 无效的棋子名称
    #[error("Invalid piece: {name}")]
    InvalidPiece { name: String },
}

impl ChessError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ChessError::MalformedSnapshot {
            reason: reason.into(),
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket 错误
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 棋盘数据错误
    #[error("Chess error: {0}")]
    Chess(#[from] ChessError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
