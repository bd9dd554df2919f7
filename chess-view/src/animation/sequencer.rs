//! 动画序列器
//!
//! 把一次确认的走棋转换成计划并交给调度器。同一时刻最多一个
//! 走棋计划在进行；终局信号等纯效果计划不占用该位置，但同样让
//! [`Sequencer::is_busy`] 返回 true。

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chess_protocol::{Snapshot, SpecialTag, Square};
use thiserror::Error;
use tokio::sync::oneshot;

use super::cadence::Cadence;
use super::endgame::EndgameSignal;
use super::plan::{Action, AnimationPlan, Leg, LegFlags};
use super::scheduler::Scheduler;
use crate::game::{MoveOutcome, PendingMove};
use crate::view::BoardView;

/// 动画错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("No pending move to animate")]
    NoPendingMove,

    #[error("No piece displayed at {square}")]
    MissingAnchor { square: Square },

    #[error("Another move plan is still running")]
    PlanInFlight,

    #[error("No active move plan")]
    NoActivePlan,

    #[error("Active plan has no rook leg")]
    NoRookLeg,
}

/// 进行中的走棋计划
#[derive(Debug)]
pub struct ActivePlan {
    /// 终止步要提交的局面
    pub snapshot: Snapshot,
    /// 王车易位时尚未开始的车腿
    pub rook_leg: Option<Leg>,
    /// 提交后要播放的终局信号
    pub follow_up: Option<EndgameSignal>,
    pub completion: Option<oneshot::Sender<Snapshot>>,
}

impl ActivePlan {
    /// 通知等待方，返回 false 表示无人等待
    pub fn complete(&mut self, snapshot: &Snapshot) -> bool {
        match self.completion.take() {
            Some(tx) => tx.send(snapshot.clone()).is_ok(),
            None => false,
        }
    }
}

/// 计划完成通知，终止提交后得到已提交的局面
///
/// 升变计划的完成权转交给升变流程，在 PROMOTE_PAWN 成功后才兑现；
/// 发送端被丢弃时得到 `None`。
#[derive(Debug)]
pub struct PlanCompletion {
    rx: oneshot::Receiver<Snapshot>,
}

impl PlanCompletion {
    fn new() -> (oneshot::Sender<Snapshot>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// 非阻塞查询
    pub fn try_result(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}

impl Future for PlanCompletion {
    type Output = Option<Snapshot>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// 动画序列器
#[derive(Debug)]
pub struct Sequencer {
    cadence: Cadence,
    scheduler: Scheduler,
    active: Option<ActivePlan>,
}

impl Sequencer {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            scheduler: Scheduler::new(),
            active: None,
        }
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// 开始一次确认走棋的动画
    ///
    /// 锚点无法解析时什么都不调度，由调用方直接提交。
    pub fn start(
        &mut self,
        outcome: &MoveOutcome,
        pending: Option<&PendingMove>,
        view: &BoardView,
        now: Duration,
    ) -> Result<PlanCompletion, AnimationError> {
        if self.active.is_some() {
            return Err(AnimationError::PlanInFlight);
        }
        let pending = pending.ok_or(AnimationError::NoPendingMove)?;
        let mover = view
            .piece_at(pending.from)
            .ok_or(AnimationError::MissingAnchor {
                square: pending.from,
            })?
            .color;

        let special = outcome.special;
        let rook_leg = if special.is_castle() {
            pending.rook_leg
        } else {
            None
        };
        if special.is_castle() && rook_leg.is_none() {
            tracing::warn!(
                from = %pending.from,
                to = %pending.to,
                "Castle reported for a move without a rook leg"
            );
        }

        let flags = LegFlags {
            capture: outcome.capture,
            check: special.gives_check(),
            promotion: special == SpecialTag::PromotionPossible,
            castle: rook_leg.is_some(),
        };
        let checked_king = if flags.check {
            outcome.snapshot.king_square(mover.opponent())
        } else {
            None
        };

        let plan = AnimationPlan::king_leg(
            pending.king_leg(),
            flags,
            mover,
            checked_king,
            &self.cadence,
        );
        tracing::debug!(
            from = %pending.from,
            to = %pending.to,
            ?special,
            capture = outcome.capture,
            steps = plan.steps().len(),
            "Starting move plan"
        );
        self.scheduler.schedule(now, plan);

        let (tx, completion) = PlanCompletion::new();
        self.active = Some(ActivePlan {
            snapshot: outcome.snapshot.clone(),
            rook_leg,
            follow_up: EndgameSignal::after_move(special, &outcome.snapshot),
            completion: Some(tx),
        });
        Ok(completion)
    }

    /// 计划进行中又收到确认：只替换待提交的局面
    pub fn supersede(&mut self, snapshot: Snapshot) -> Result<(), AnimationError> {
        let active = self.active.as_mut().ok_or(AnimationError::NoActivePlan)?;
        active.snapshot = snapshot;
        Ok(())
    }

    /// 开始车的嵌套腿
    pub fn begin_nested_leg(&mut self, at: Duration) -> Result<Leg, AnimationError> {
        let active = self.active.as_mut().ok_or(AnimationError::NoActivePlan)?;
        let leg = active.rook_leg.take().ok_or(AnimationError::NoRookLeg)?;
        self.scheduler
            .schedule(at, AnimationPlan::rook_leg(leg, &self.cadence));
        Ok(leg)
    }

    /// 结束当前走棋计划（提交或交给升变流程）
    pub fn finish_active(&mut self) -> Option<ActivePlan> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&ActivePlan> {
        self.active.as_ref()
    }

    /// 调度纯效果计划（终局信号）
    pub fn schedule_effects(&mut self, at: Duration, plan: AnimationPlan) {
        if plan.commit_count() > 0 {
            tracing::warn!("Effect plan contains commit steps, they will be ignored");
        }
        self.scheduler.schedule(at, plan);
    }

    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Action)> {
        self.scheduler.pop_due(now)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// 有计划或信号在进行
    pub fn is_busy(&self) -> bool {
        self.active.is_some() || !self.scheduler.is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_protocol::PieceKind;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

    fn sq(label: &str) -> Square {
        Square::from_algebraic(label).unwrap()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn mounted() -> BoardView {
        let mut view = BoardView::mount();
        view.sync(&Snapshot::initial());
        view
    }

    fn outcome(fen: &str, special: SpecialTag) -> MoveOutcome {
        MoveOutcome {
            success: true,
            snapshot: Snapshot::parse(fen).unwrap(),
            capture: false,
            special,
        }
    }

    fn drain(seq: &mut Sequencer, now: Duration) -> Vec<(u64, Action)> {
        let mut out = Vec::new();
        while let Some((due, action)) = seq.pop_due(now) {
            out.push((due.as_millis() as u64, action));
        }
        out
    }

    #[test]
    fn test_start_requires_anchor() {
        let mut seq = Sequencer::new(Cadence::default());
        let view = mounted();
        let result = outcome(AFTER_E4, SpecialTag::None);

        assert!(matches!(
            seq.start(&result, None, &view, ms(0)),
            Err(AnimationError::NoPendingMove)
        ));

        let empty_origin = PendingMove::new(sq("e4"), sq("e5"), None);
        assert_eq!(
            seq.start(&result, Some(&empty_origin), &view, ms(0)).err(),
            Some(AnimationError::MissingAnchor { square: sq("e4") })
        );
        assert!(!seq.is_busy());
    }

    #[test]
    fn test_plain_move_schedules_single_commit() {
        let mut seq = Sequencer::new(Cadence::default());
        let view = mounted();
        let pending = PendingMove::new(sq("e2"), sq("e4"), None);

        let mut completion = seq
            .start(&outcome(AFTER_E4, SpecialTag::None), Some(&pending), &view, ms(1000))
            .unwrap();
        assert!(seq.is_busy());
        assert!(matches!(
            seq.start(&outcome(AFTER_E4, SpecialTag::None), Some(&pending), &view, ms(1000)),
            Err(AnimationError::PlanInFlight)
        ));

        let steps = drain(&mut seq, ms(2000));
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], (1500, Action::Commit));

        let mut active = seq.finish_active().unwrap();
        assert_eq!(active.snapshot.as_str(), AFTER_E4);
        let committed = active.snapshot.clone();
        assert!(active.complete(&committed));
        assert_eq!(completion.try_result().map(|s| s.as_str().to_string()), Some(AFTER_E4.to_string()));
        assert!(!seq.is_busy());
    }

    #[test]
    fn test_castle_nested_leg() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        let castled = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1 b kq - 1 1";
        let mut view = BoardView::mount();
        view.sync(&Snapshot::parse(fen).unwrap());
        assert_eq!(view.piece_at(sq("e1")).map(|p| p.kind), Some(PieceKind::King));

        let mut seq = Sequencer::new(Cadence::default());
        let pending = PendingMove::new(sq("e1"), sq("g1"), Some(Leg::new(sq("h1"), sq("f1"))));
        seq.start(&outcome(castled, SpecialTag::CastledNoCheck), Some(&pending), &view, ms(0))
            .unwrap();

        let king_steps = drain(&mut seq, ms(500));
        assert_eq!(king_steps.last(), Some(&(500, Action::BeginNestedLeg)));
        assert!(!king_steps.iter().any(|(_, a)| *a == Action::Commit));

        assert_eq!(seq.begin_nested_leg(ms(500)), Ok(Leg::new(sq("h1"), sq("f1"))));
        assert_eq!(seq.begin_nested_leg(ms(500)), Err(AnimationError::NoRookLeg));

        let rook_steps = drain(&mut seq, ms(5000));
        assert_eq!(
            rook_steps,
            vec![
                (500, Action::Slide { from: sq("h1"), to: sq("f1") }),
                (900, Action::PlaySound(crate::effects::Cue::Move)),
                (1000, Action::Commit),
            ]
        );
    }

    #[test]
    fn test_supersede_replaces_snapshot() {
        let mut seq = Sequencer::new(Cadence::default());
        assert_eq!(
            seq.supersede(Snapshot::initial()),
            Err(AnimationError::NoActivePlan)
        );

        let view = mounted();
        let pending = PendingMove::new(sq("e2"), sq("e4"), None);
        seq.start(&outcome(AFTER_E4, SpecialTag::None), Some(&pending), &view, ms(0))
            .unwrap();
        seq.supersede(Snapshot::initial()).unwrap();
        assert_eq!(seq.active().map(|a| a.snapshot.clone()), Some(Snapshot::initial()));
    }

    #[test]
    fn test_effect_plans_keep_sequencer_busy() {
        let mut seq = Sequencer::new(Cadence::default());
        let mut plan = AnimationPlan::new();
        plan.push(ms(300), Action::PlaySound(crate::effects::Cue::Stalemate));
        seq.schedule_effects(ms(100), plan);

        assert!(seq.is_busy());
        assert_eq!(seq.next_deadline(), Some(ms(400)));
        drain(&mut seq, ms(400));
        assert!(!seq.is_busy());
    }
}
