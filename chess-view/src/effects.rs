//! 视觉/音效输出
//!
//! 渲染层和音效资源都在本 crate 之外，会话只通过 [`EffectSink`]
//! 输出带时间戳的效果。

use std::time::Duration;

use chess_protocol::{Color, PromotionPiece, Snapshot, Square};

/// 音效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Move,
    /// 走棋并将军（加强音量）
    MoveCheck,
    Capture,
    /// 吃子并将军（加强音量）
    CaptureCheck,
    Check,
    Checkmate,
    Stalemate,
    Promotion,
}

impl Cue {
    /// 相对音量，将军变体更响
    pub fn gain(&self) -> u32 {
        match self {
            Cue::MoveCheck | Cue::CaptureCheck => 5,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cue::Move | Cue::MoveCheck => "move",
            Cue::Capture | Cue::CaptureCheck => "capture",
            Cue::Check => "check",
            Cue::Checkmate => "checkmate",
            Cue::Stalemate => "stalemate",
            Cue::Promotion => "promotion",
        }
    }
}

/// 格子闪烁色调
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Alert,
    Base,
    DrawAlert,
    DrawBase,
}

impl Tone {
    /// 具体颜色，深浅格各不相同
    pub fn hex(&self, square: Square) -> &'static str {
        match (self, square.is_light()) {
            (Tone::Alert, true) => "#EB896F",
            (Tone::Alert, false) => "#E2553E",
            (Tone::Base, true) => "#eeeed2",
            (Tone::Base, false) => "#769656",
            (Tone::DrawAlert, _) => "#89CFF0",
            (Tone::DrawBase, _) => "#D3D3D3",
        }
    }
}

/// 输出给渲染层的效果
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// 棋子从起点平移到终点（只改变视觉位置）
    Slide { from: Square, to: Square },
    /// 取消平移，回到格子的静态布局
    ResetTransform { square: Square },
    Sound(Cue),
    Paint { square: Square, tone: Tone },
    PromotionOpened {
        square: Square,
        color: Color,
        choices: [PromotionPiece; 4],
    },
    PromotionClosed,
    /// 局面已提交，整盘重绘
    Committed { snapshot: Snapshot },
    SelectionChanged {
        selection: Option<Square>,
        hints: Vec<Square>,
    },
}

/// 效果接收端
pub trait EffectSink {
    /// `at` 为自会话开始起的时间
    fn apply(&mut self, at: Duration, effect: Effect);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// 记录全部效果，测试用
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub effects: Vec<(Duration, Effect)>,
    }

    impl RecordingSink {
        pub fn sounds(&self) -> Vec<(u64, Cue)> {
            self.effects
                .iter()
                .filter_map(|(at, e)| match e {
                    Effect::Sound(cue) => Some((at.as_millis() as u64, *cue)),
                    _ => None,
                })
                .collect()
        }

        pub fn paints(&self, square: Square) -> Vec<(u64, Tone)> {
            self.effects
                .iter()
                .filter_map(|(at, e)| match e {
                    Effect::Paint { square: s, tone } if *s == square => {
                        Some((at.as_millis() as u64, *tone))
                    }
                    _ => None,
                })
                .collect()
        }

        pub fn commits(&self) -> Vec<(u64, Snapshot)> {
            self.effects
                .iter()
                .filter_map(|(at, e)| match e {
                    Effect::Committed { snapshot } => {
                        Some((at.as_millis() as u64, snapshot.clone()))
                    }
                    _ => None,
                })
                .collect()
        }

        pub fn slides(&self) -> Vec<(u64, Square, Square)> {
            self.effects
                .iter()
                .filter_map(|(at, e)| match e {
                    Effect::Slide { from, to } => Some((at.as_millis() as u64, *from, *to)),
                    _ => None,
                })
                .collect()
        }
    }

    impl EffectSink for RecordingSink {
        fn apply(&mut self, at: Duration, effect: Effect) {
            self.effects.push((at, effect));
        }
    }
}
