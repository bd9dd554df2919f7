//! 协议常量定义

use std::time::Duration;

/// 帧协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 棋盘边长（行数 = 列数）
pub const BOARD_SIZE: usize = 8;

/// 最小行/列编号
pub const MIN_RANK: u8 = 1;

/// 最大行/列编号
pub const MAX_RANK: u8 = 8;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 初始局面 FEN
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
