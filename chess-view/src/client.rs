//! 会话驱动
//!
//! 单线程协作式事件循环：服务端消息、用户命令和下一个动画到期时间
//! 三者择一处理，时钟以循环开始时刻为零点。

use anyhow::{Context, Result};
use chess_protocol::{PromotionPiece, Square};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::animation::Cadence;
use crate::effects::EffectSink;
use crate::network::{Gateway, Inbox};
use crate::session::{Handled, Session};

/// 用户命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Click(Square),
    Promote(PromotionPiece),
    /// 重新输出当前局面
    Redraw,
    Quit,
}

/// 运行会话直到连接关闭或用户退出，返回结束时的会话
pub async fn run<S: EffectSink>(
    gateway: Gateway,
    mut inbox: Inbox,
    mut commands: mpsc::Receiver<UserCommand>,
    sink: S,
    cadence: Cadence,
) -> Result<Session<Gateway, S>> {
    let origin = Instant::now();
    let mut session = Session::new(gateway, sink, cadence);
    session.start();

    loop {
        let deadline = session.next_deadline().map(|d| origin + d);

        tokio::select! {
            envelope = inbox.next() => {
                let Some(envelope) = envelope else {
                    tracing::info!("Connection closed, ending session");
                    break;
                };
                let handled = session
                    .handle_envelope(&envelope, origin.elapsed())
                    .context("Session aborted")?;
                if let Handled::Animating(_) = handled {
                    tracing::debug!("Move animation started");
                }
            }
            command = commands.recv() => {
                let now = origin.elapsed();
                match command {
                    Some(UserCommand::Click(square)) => {
                        let intent = session.click(square, now);
                        tracing::debug!(?intent, "Click handled");
                    }
                    Some(UserCommand::Promote(kind)) => {
                        session.choose_promotion(kind);
                    }
                    Some(UserCommand::Redraw) => session.redraw(now),
                    Some(UserCommand::Quit) | None => {
                        tracing::info!("Quit requested");
                        break;
                    }
                }
            }
            _ = wait(deadline) => session.tick(origin.elapsed()),
        }
    }

    Ok(session)
}

async fn wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
