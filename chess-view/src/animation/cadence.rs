//! 动画节奏
//!
//! 所有偏移量以毫秒计，从各自计划开始计算。绝对值可调，
//! 但音效/闪烁必须严格落在平移开始之后、提交之前。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 节奏配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CadenceError {
    #[error("{earlier} ({earlier_ms} ms) must come before {later} ({later_ms} ms)")]
    Ordering {
        earlier: &'static str,
        earlier_ms: u64,
        later: &'static str,
        later_ms: u64,
    },

    #[error("flicker interval must be positive")]
    ZeroInterval,

    #[error("{field} = {value} exceeds {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// 单个偏移量的上限
pub const MAX_OFFSET_MS: u64 = 60_000;
/// 闪烁次数上限
pub const MAX_FLICKERS: u32 = 64;

/// 动画节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cadence {
    /// 王方腿：音效 / 升变弹窗
    pub cue_ms: u64,
    /// 走棋将军后，将军音效与闪烁的额外延迟
    pub check_follow_up_ms: u64,
    /// 王方腿：提交或开始车的嵌套腿
    pub commit_ms: u64,
    /// 车的嵌套腿：走棋音效
    pub rook_cue_ms: u64,
    /// 车的嵌套腿：提交
    pub rook_commit_ms: u64,
    /// 闪烁间隔
    pub flicker_interval_ms: u64,
    /// 将军闪烁次数
    pub check_flickers: u32,
    /// 将死 / 逼和闪烁次数
    pub endgame_flickers: u32,
    pub checkmate_delay_ms: u64,
    pub stalemate_delay_ms: u64,
    pub check_delay_ms: u64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            cue_ms: 200,
            check_follow_up_ms: 200,
            commit_ms: 500,
            rook_cue_ms: 400,
            rook_commit_ms: 500,
            flicker_interval_ms: 300,
            check_flickers: 2,
            endgame_flickers: 8,
            checkmate_delay_ms: 200,
            stalemate_delay_ms: 300,
            check_delay_ms: 200,
        }
    }
}

fn at_most(field: &'static str, value: u64, max: u64) -> Result<(), CadenceError> {
    if value <= max {
        Ok(())
    } else {
        Err(CadenceError::OutOfRange { field, value, max })
    }
}

fn before(
    earlier: &'static str,
    earlier_ms: u64,
    later: &'static str,
    later_ms: u64,
) -> Result<(), CadenceError> {
    if earlier_ms < later_ms {
        Ok(())
    } else {
        Err(CadenceError::Ordering {
            earlier,
            earlier_ms,
            later,
            later_ms,
        })
    }
}

impl Cadence {
    /// 校验取值范围和相对顺序
    pub fn validate(&self) -> Result<(), CadenceError> {
        for (field, value) in [
            ("cue_ms", self.cue_ms),
            ("check_follow_up_ms", self.check_follow_up_ms),
            ("commit_ms", self.commit_ms),
            ("rook_cue_ms", self.rook_cue_ms),
            ("rook_commit_ms", self.rook_commit_ms),
            ("flicker_interval_ms", self.flicker_interval_ms),
            ("checkmate_delay_ms", self.checkmate_delay_ms),
            ("stalemate_delay_ms", self.stalemate_delay_ms),
            ("check_delay_ms", self.check_delay_ms),
        ] {
            at_most(field, value, MAX_OFFSET_MS)?;
        }
        for (field, value) in [
            ("check_flickers", self.check_flickers),
            ("endgame_flickers", self.endgame_flickers),
        ] {
            at_most(field, u64::from(value), u64::from(MAX_FLICKERS))?;
        }

        let follow_up = self
            .cue_ms
            .checked_add(self.check_follow_up_ms)
            .ok_or(CadenceError::OutOfRange {
                field: "check_follow_up_ms",
                value: self.check_follow_up_ms,
                max: u64::MAX - self.cue_ms,
            })?;
        before("slide", 0, "cue", self.cue_ms)?;
        before("cue", self.cue_ms, "commit", self.commit_ms)?;
        before("check follow-up", follow_up, "commit", self.commit_ms)?;
        before("rook slide", 0, "rook cue", self.rook_cue_ms)?;
        before("rook cue", self.rook_cue_ms, "rook commit", self.rook_commit_ms)?;
        if self.flicker_interval_ms == 0 {
            return Err(CadenceError::ZeroInterval);
        }
        Ok(())
    }

    pub fn cue(&self) -> Duration {
        Duration::from_millis(self.cue_ms)
    }

    pub fn check_follow_up(&self) -> Duration {
        Duration::from_millis(self.cue_ms.saturating_add(self.check_follow_up_ms))
    }

    pub fn commit(&self) -> Duration {
        Duration::from_millis(self.commit_ms)
    }

    pub fn rook_cue(&self) -> Duration {
        Duration::from_millis(self.rook_cue_ms)
    }

    pub fn rook_commit(&self) -> Duration {
        Duration::from_millis(self.rook_commit_ms)
    }

    pub fn flicker_interval(&self) -> Duration {
        Duration::from_millis(self.flicker_interval_ms)
    }
}
