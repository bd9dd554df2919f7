//! 终局信号
//!
//! 只含效果的步骤表，与走棋动画共用同一个调度器。

use std::time::Duration;

use chess_protocol::{Color, Snapshot, SpecialTag};

use super::cadence::Cadence;
use super::plan::{Action, AnimationPlan};
use crate::effects::{Cue, Tone};

/// 局面提交后要播放的信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndgameSignal {
    Checkmate { loser: Color },
    Stalemate,
    Check { checked: Color },
}

impl EndgameSignal {
    /// 走棋提交后：只有将死与逼和（将军已在走棋动画中闪烁过）
    pub fn after_move(special: SpecialTag, snapshot: &Snapshot) -> Option<Self> {
        match special {
            SpecialTag::Checkmate => Some(EndgameSignal::Checkmate {
                loser: snapshot.current_player(),
            }),
            SpecialTag::Stalemate => Some(EndgameSignal::Stalemate),
            _ => None,
        }
    }

    /// 升变提交后：升变的棋子也可能将军
    pub fn after_promotion(special: SpecialTag, snapshot: &Snapshot) -> Option<Self> {
        match special {
            SpecialTag::Check | SpecialTag::CastledCheck => Some(EndgameSignal::Check {
                checked: snapshot.current_player(),
            }),
            other => Self::after_move(other, snapshot),
        }
    }

    /// 生成步骤表（偏移从提交时刻算起）
    pub fn plan(&self, snapshot: &Snapshot, cadence: &Cadence) -> AnimationPlan {
        let mut plan = AnimationPlan::new();
        let interval = cadence.flicker_interval();

        match *self {
            EndgameSignal::Checkmate { loser } => {
                let start = Duration::from_millis(cadence.checkmate_delay_ms);
                if let Some(king) = snapshot.king_square(loser) {
                    plan.flicker(start, king, cadence.endgame_flickers, interval, Tone::Alert, Tone::Base);
                }
                plan.push(
                    start + interval * cadence.endgame_flickers,
                    Action::PlaySound(Cue::Checkmate),
                );
            }
            EndgameSignal::Stalemate => {
                let start = Duration::from_millis(cadence.stalemate_delay_ms);
                for color in [Color::White, Color::Black] {
                    if let Some(king) = snapshot.king_square(color) {
                        plan.flicker(
                            start,
                            king,
                            cadence.endgame_flickers,
                            interval,
                            Tone::DrawAlert,
                            Tone::DrawBase,
                        );
                    }
                }
                plan.push(
                    start + interval * cadence.endgame_flickers,
                    Action::PlaySound(Cue::Stalemate),
                );
            }
            EndgameSignal::Check { checked } => {
                let start = Duration::from_millis(cadence.check_delay_ms);
                plan.push(start, Action::PlaySound(Cue::Check));
                if let Some(king) = snapshot.king_square(checked) {
                    plan.flicker(start, king, cadence.check_flickers, interval, Tone::Alert, Tone::Base);
                }
            }
        }

        if plan.steps().iter().all(|s| !matches!(s.action, Action::Paint { .. })) {
            tracing::warn!(signal = ?self, "King not found on board, signal has no flicker");
        }
        plan
    }
}
