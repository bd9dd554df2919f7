//! 会话
//!
//! 独占游戏状态、视觉格子表和动画序列器。所有输入（服务端消息、点击、
//! 升变选择、时钟）都在同一个线程上按顺序进入，`now` 为自会话开始起的时间。

use std::time::Duration;

use chess_protocol::{ChessError, Color, PromotionPiece, Request, Snapshot, Square};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::animation::{Action, Cadence, EndgameSignal, PlanCompletion, Sequencer};
use crate::effects::{Cue, Effect, EffectSink};
use crate::game::{GameStore, Intent, MoveIntentBuilder, PromotionPrompt};
use crate::view::BoardView;

/// 请求出口（网关或测试替身）
pub trait RequestSink {
    fn send(&mut self, request: Request);
}

/// 会话错误，出现后会话无法继续
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Authoritative snapshot rejected: {0}")]
    Snapshot(#[from] ChessError),
}

/// 一条服务端消息的处理结果
#[derive(Debug)]
pub enum Handled {
    /// error < 0 或负载无法解码
    Dropped,
    /// 无需处理（未知类型、过期提示等）
    Ignored,
    /// 状态已更新
    Applied,
    /// 服务端拒绝了走棋或升变
    Rejected,
    /// 走棋动画已开始
    Animating(PlanCompletion),
    /// 局面已直接提交
    Committed,
}

/// 视图同步会话
pub struct Session<R: RequestSink, S: EffectSink> {
    pub(crate) store: GameStore,
    pub(crate) view: BoardView,
    pub(crate) sequencer: Sequencer,
    pub(crate) requests: R,
    pub(crate) sink: S,
}

impl<R: RequestSink, S: EffectSink> Session<R, S> {
    pub fn new(requests: R, sink: S, cadence: Cadence) -> Self {
        Self {
            store: GameStore::new(),
            view: BoardView::mount(),
            sequencer: Sequencer::new(cadence),
            requests,
            sink,
        }
    }

    /// 请求初始局面和结果编码表
    pub fn start(&mut self) {
        tracing::info!("Session started, requesting initial position and outcome codes");
        self.requests.send(Request::Init);
        self.requests.send(Request::Config);
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn requests(&self) -> &R {
        &self.requests
    }

    /// 有走棋在等待响应、动画/信号在进行或升变未完成
    pub fn is_busy(&self) -> bool {
        self.store.pending().is_some()
            || self.store.promotion().is_some()
            || self.sequencer.is_busy()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.sequencer.next_deadline()
    }

    /// 点击棋盘格
    pub fn click(&mut self, square: Square, now: Duration) -> Intent {
        let intent = MoveIntentBuilder::interpret(&self.store, square, self.is_busy());
        match intent {
            Intent::Busy => {
                tracing::info!(%square, "Click rejected while a move is in flight");
            }
            Intent::Ignored => {
                tracing::debug!(%square, "Click ignored");
            }
            Intent::Select(square) => {
                self.store.select(square);
                self.emit_selection(now);
                self.requests.send(Request::PossibleMoves { position: square });
            }
            Intent::Deselect => {
                self.store.clear_selection();
                self.emit_selection(now);
            }
            Intent::Move(pending) => {
                tracing::debug!(from = %pending.from, to = %pending.to, castle = pending.is_castle(), "Dispatching move");
                self.store.set_pending(pending);
                self.store.clear_selection();
                self.emit_selection(now);
                self.requests.send(Request::MakeMove {
                    from_position: pending.from,
                    to_position: pending.to,
                });
            }
        }
        intent
    }

    /// 选择升变棋子，返回是否发出了请求
    pub fn choose_promotion(&mut self, kind: PromotionPiece) -> bool {
        let Some(prompt) = self.store.promotion_mut() else {
            tracing::warn!(piece = kind.name(), "No promotion pending");
            return false;
        };
        match prompt.choose(kind) {
            Some(request) => {
                self.requests.send(request);
                true
            }
            None => false,
        }
    }

    /// 重新输出当前局面
    pub fn redraw(&mut self, now: Duration) {
        if let Some(snapshot) = self.store.snapshot().cloned() {
            self.sink.apply(now, Effect::Committed { snapshot });
        }
    }

    /// 推进时钟，执行全部到期步骤
    pub fn tick(&mut self, now: Duration) {
        while let Some((at, action)) = self.sequencer.pop_due(now) {
            self.execute(at, action);
        }
    }

    fn execute(&mut self, at: Duration, action: Action) {
        match action {
            Action::Slide { from, to } => {
                self.view.slide(from, to);
                self.sink.apply(at, Effect::Slide { from, to });
            }
            Action::PlaySound(cue) => self.sink.apply(at, Effect::Sound(cue)),
            Action::Paint { square, tone } => {
                self.view.paint(square, tone);
                self.sink.apply(at, Effect::Paint { square, tone });
            }
            Action::OpenPromotion { square, color } => {
                // 走棋计划到此结束，完成通知随升变流程转交
                let completion = self.sequencer.finish_active().and_then(|p| p.completion);
                self.open_promotion(at, square, color, completion);
            }
            Action::BeginNestedLeg => {
                if let Err(e) = self.sequencer.begin_nested_leg(at) {
                    tracing::warn!("Cannot start rook leg: {}, committing now", e);
                    self.commit_active(at);
                }
            }
            Action::Commit => self.commit_active(at),
        }
    }

    /// 终止提交：走棋计划的局面落地，然后安排终局信号
    fn commit_active(&mut self, at: Duration) {
        let Some(mut plan) = self.sequencer.finish_active() else {
            tracing::warn!("Commit step without an active plan");
            return;
        };
        let snapshot = plan.snapshot.clone();
        self.commit_snapshot(at, snapshot.clone());
        plan.complete(&snapshot);
        if let Some(signal) = plan.follow_up {
            self.signal(at, signal, &snapshot);
        }
    }

    /// 打开升变选择并播放提示音
    pub(crate) fn open_promotion(
        &mut self,
        at: Duration,
        square: Square,
        color: Color,
        completion: Option<oneshot::Sender<Snapshot>>,
    ) {
        let prompt = PromotionPrompt::new(square, color, completion);
        let choices = prompt.choices();
        self.store.open_promotion(prompt);
        tracing::info!(%square, %color, "Promotion prompt opened");
        self.sink.apply(at, Effect::PromotionOpened { square, color, choices });
        self.sink.apply(at, Effect::Sound(Cue::Promotion));
    }

    /// 提交局面并重绘
    pub(crate) fn commit_snapshot(&mut self, at: Duration, snapshot: Snapshot) {
        tracing::debug!(position = snapshot.as_str(), "Committing snapshot");
        self.store.commit(snapshot.clone());
        for square in self.view.sync(&snapshot) {
            self.sink.apply(at, Effect::ResetTransform { square });
        }
        self.sink.apply(at, Effect::Committed { snapshot });
    }

    /// 安排终局信号
    pub(crate) fn signal(&mut self, at: Duration, signal: EndgameSignal, snapshot: &Snapshot) {
        tracing::info!(?signal, "Scheduling endgame signal");
        let plan = signal.plan(snapshot, self.sequencer.cadence());
        self.sequencer.schedule_effects(at, plan);
    }

    pub(crate) fn emit_selection(&mut self, at: Duration) {
        self.sink.apply(at, Effect::SelectionChanged {
            selection: self.store.selection(),
            hints: self.store.hints().to_vec(),
        });
    }
}
