//! 国际象棋视图同步协议库
//!
//! 包含:
//! - 坐标编解码 (Square)
//! - 棋子、棋盘、局面快照 (FEN)
//! - 消息信封与请求/响应负载
//! - 结果编码表 (CONFIG 协商)
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod board;
mod constants;
mod error;
mod message;
mod outcome;
mod piece;
mod snapshot;
mod square;
mod transport;

pub use board::{Board, Cell};
pub use constants::*;
pub use error::{ChessError, ProtocolError, Result};
pub use message::{
    ConfigData, Envelope, InitData, MessageType, MoveResultData, PossibleMovesData, Request,
};
pub use outcome::{OutcomeCodes, SpecialTag};
pub use piece::{Color, Piece, PieceKind, PromotionPiece};
pub use snapshot::Snapshot;
pub use square::Square;
pub use transport::{
    ChannelConnection, ChannelSink, ChannelSource, Connection, Connector, FrameReader,
    FrameSink, FrameSource, FrameWriter, Listener, TcpConnection, TcpConnector, TcpListener,
    TransportType, WsConnection, WsConnector, WsSink, WsSource,
};
