//! 动画计划
//!
//! 计划是一组 (偏移, 动作)。偏移都从计划开始计算，不串联，
//! 所以先后顺序只由偏移决定。

use std::time::Duration;

use chess_protocol::{Color, Square};

use super::cadence::Cadence;
use crate::effects::{Cue, Tone};

/// 一段棋子平移（王车易位有王和车两段）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub from: Square,
    pub to: Square,
}

impl Leg {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

/// 计划中的动作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Slide { from: Square, to: Square },
    PlaySound(Cue),
    /// 闪烁中的一帧
    Paint { square: Square, tone: Tone },
    OpenPromotion { square: Square, color: Color },
    /// 开始车的嵌套腿
    BeginNestedLeg,
    /// 提交局面（终止步）
    Commit,
}

/// 计划中的一步
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStep {
    pub offset: Duration,
    pub action: Action,
}

/// 王方腿的结果标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegFlags {
    pub capture: bool,
    pub check: bool,
    pub promotion: bool,
    pub castle: bool,
}

/// 动画计划
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationPlan {
    steps: Vec<AnimationStep>,
}

impl AnimationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, offset: Duration, action: Action) {
        self.steps.push(AnimationStep { offset, action });
    }

    pub fn steps(&self) -> &[AnimationStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<AnimationStep> {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 计划中的提交步数
    pub fn commit_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.action == Action::Commit)
            .count()
    }

    /// 闪烁：`toggles` 次在 on/off 间切换，间隔 `interval`，最后停在 off
    pub fn flicker(
        &mut self,
        start: Duration,
        square: Square,
        toggles: u32,
        interval: Duration,
        on: Tone,
        off: Tone,
    ) {
        for i in 0..toggles {
            let tone = if i % 2 == 0 { on } else { off };
            self.push(start + interval * i, Action::Paint { square, tone });
        }
        self.push(start + interval * toggles, Action::Paint { square, tone: off });
    }

    /// 王方腿（或普通走法的唯一一腿）
    ///
    /// `checked_king` 为被将军一方王所在格，用于将军闪烁。
    pub fn king_leg(
        leg: Leg,
        flags: LegFlags,
        mover: Color,
        checked_king: Option<Square>,
        cadence: &Cadence,
    ) -> Self {
        let mut plan = Self::new();
        plan.push(Duration::ZERO, Action::Slide {
            from: leg.from,
            to: leg.to,
        });

        if flags.promotion {
            // 升变：不播音效也不提交，等升变流程完成
            plan.push(cadence.cue(), Action::OpenPromotion {
                square: leg.to,
                color: mover,
            });
            return plan;
        }

        if flags.capture {
            let cue = if flags.check { Cue::CaptureCheck } else { Cue::Capture };
            plan.push(cadence.cue(), Action::PlaySound(cue));
        } else if flags.check {
            plan.push(cadence.cue(), Action::PlaySound(Cue::MoveCheck));
            plan.push(cadence.check_follow_up(), Action::PlaySound(Cue::Check));
            if let Some(king) = checked_king {
                plan.flicker(
                    cadence.check_follow_up(),
                    king,
                    cadence.check_flickers,
                    cadence.flicker_interval(),
                    Tone::Alert,
                    Tone::Base,
                );
            }
        } else {
            plan.push(cadence.cue(), Action::PlaySound(Cue::Move));
        }

        if flags.castle {
            plan.push(cadence.commit(), Action::BeginNestedLeg);
        } else {
            plan.push(cadence.commit(), Action::Commit);
        }
        plan
    }

    /// 车的嵌套腿：吃子/将军/升变标记全部忽略
    pub fn rook_leg(leg: Leg, cadence: &Cadence) -> Self {
        let mut plan = Self::new();
        plan.push(Duration::ZERO, Action::Slide {
            from: leg.from,
            to: leg.to,
        });
        plan.push(cadence.rook_cue(), Action::PlaySound(Cue::Move));
        plan.push(cadence.rook_commit(), Action::Commit);
        plan
    }
}
