//! 走棋结果编码
//!
//! 吃子与特殊结果的线上编码由服务端在 CONFIG 中按会话下发，
//! 之后所有 `is_kill` / `special` 字段都通过此表解释。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 特殊结果标记（每个结果至多一个）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialTag {
    #[default]
    None,
    Check,
    Checkmate,
    Stalemate,
    CastledCheck,
    CastledNoCheck,
    PromotionPossible,
}

impl SpecialTag {
    /// 走棋后对方被将军（含易位将军）
    pub fn gives_check(&self) -> bool {
        matches!(self, SpecialTag::Check | SpecialTag::CastledCheck)
    }

    /// 是否为王车易位
    pub fn is_castle(&self) -> bool {
        matches!(self, SpecialTag::CastledCheck | SpecialTag::CastledNoCheck)
    }
}

/// 会话内协商的编码表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeCodes {
    kill: Option<i64>,
    check: Option<i64>,
    checkmate: Option<i64>,
    stalemate: Option<i64>,
    castled_check: Option<i64>,
    castled_no_check: Option<i64>,
    promote_possible: Option<i64>,
}

impl OutcomeCodes {
    /// 从 CONFIG 的 constants 构建
    pub fn from_constants(constants: &HashMap<String, i64>) -> Self {
        let get = |names: &[&str]| names.iter().find_map(|n| constants.get(*n).copied());
        Self {
            kill: get(&["KILL"]),
            check: get(&["CHECK"]),
            checkmate: get(&["CHECKMATE"]),
            stalemate: get(&["STALEMATE"]),
            castled_check: get(&["CASTLED_CHECK"]),
            castled_no_check: get(&["CASTLED_NO_CHECK"]),
            promote_possible: get(&["PROMOTE_POSSIBLE", "PROMOTION_POSSIBLE"]),
        }
    }

    /// 是否已收到 CONFIG
    pub fn is_configured(&self) -> bool {
        *self != Self::default()
    }

    /// 解释 `is_kill` 字段
    pub fn is_capture(&self, code: Option<i64>) -> bool {
        code.is_some() && code == self.kill
    }

    /// 解释 `special` 字段；编码冲突时按终局优先
    pub fn classify(&self, code: Option<i64>) -> SpecialTag {
        let Some(code) = code else {
            return SpecialTag::None;
        };
        let table = [
            (self.checkmate, SpecialTag::Checkmate),
            (self.stalemate, SpecialTag::Stalemate),
            (self.castled_check, SpecialTag::CastledCheck),
            (self.castled_no_check, SpecialTag::CastledNoCheck),
            (self.promote_possible, SpecialTag::PromotionPossible),
            (self.check, SpecialTag::Check),
        ];
        table
            .into_iter()
            .find(|(c, _)| *c == Some(code))
            .map(|(_, tag)| tag)
            .unwrap_or(SpecialTag::None)
    }
}
