//! 消息类型定义
//!
//! 线上格式为 JSON 信封：`{ "type": ..., "data": {...}, "error": <int> }`。
//! 请求只带 `type` 和 `data`。

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::piece::PromotionPiece;
use crate::square::Square;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// 初始局面
    Init,
    /// 结果码表
    Config,
    /// 走棋
    MakeMove,
    /// 可走位置提示
    PossibleMoves,
    /// 兵升变
    PromotePawn,
    /// 未知类型（忽略）
    #[serde(other)]
    Unknown,
}

/// 服务端下发的消息信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: serde_json::Value,
    /// 负数表示失败
    #[serde(default)]
    pub error: i64,
}

impl Envelope {
    pub fn new(kind: MessageType, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            error: 0,
        }
    }

    /// 是否为传输层报告的失败
    pub fn is_error(&self) -> bool {
        self.error < 0
    }

    /// 按类型解码 data 字段
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// 客户端发送给服务端的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// 请求初始局面
    Init,
    /// 请求结果码表
    Config,
    /// 走棋
    MakeMove {
        from_position: Square,
        to_position: Square,
    },
    /// 查询某格棋子的可走位置
    PossibleMoves { position: Square },
    /// 兵升变
    PromotePawn {
        position: Square,
        promote_to: PromotionPiece,
    },
}

impl Request {
    pub fn kind(&self) -> MessageType {
        match self {
            Request::Init => MessageType::Init,
            Request::Config => MessageType::Config,
            Request::MakeMove { .. } => MessageType::MakeMove,
            Request::PossibleMoves { .. } => MessageType::PossibleMoves,
            Request::PromotePawn { .. } => MessageType::PromotePawn,
        }
    }
}

/// INIT 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitData {
    #[serde(alias = "fen")]
    pub position: String,
}

/// CONFIG 响应：符号名 -> 线上编码
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(default)]
    pub constants: HashMap<String, i64>,
}

/// MAKE_MOVE / PROMOTE_PAWN 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResultData {
    #[serde(default)]
    pub move_success: bool,
    #[serde(default, alias = "fen")]
    pub position: Option<String>,
    #[serde(default)]
    pub is_kill: Option<i64>,
    #[serde(default)]
    pub special: Option<i64>,
}

/// POSSIBLE_MOVES 响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PossibleMovesData {
    #[serde(default)]
    pub possible_moves: Vec<Square>,
}
