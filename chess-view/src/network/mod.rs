//! 网络通信模块

mod connection;

pub use connection::*;

use chess_protocol::{Connector, TcpConnector, TransportType, WsConnector};

/// 按传输类型连接服务端并启动网关
pub async fn connect(transport: TransportType, addr: &str) -> anyhow::Result<(Gateway, Inbox)> {
    let pair = match transport {
        TransportType::Tcp => open(TcpConnector, addr).await?,
        TransportType::WebSocket => open(WsConnector, addr).await?,
    };
    Ok(pair)
}

async fn open<C: Connector>(connector: C, addr: &str) -> anyhow::Result<(Gateway, Inbox)> {
    let conn = connector.connect(addr).await?;
    tracing::info!("Connected to server: {}", addr);
    Ok(Gateway::spawn(conn))
}
