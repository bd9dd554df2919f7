//! 客户端游戏状态
//!
//! 局面、选中格、提示、待确认走法、升变状态和结果编码表都归会话独有，
//! 只由消息路由和动画的终止提交修改。

use chess_protocol::{
    ChessError, MoveResultData, OutcomeCodes, Snapshot, SpecialTag, Square,
};

use super::promotion::PromotionPrompt;
use crate::animation::Leg;

/// 已发出、等待服务端确认的走法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub from: Square,
    pub to: Square,
    /// 王车易位时本地推导出的车腿
    pub rook_leg: Option<Leg>,
}

impl PendingMove {
    pub fn new(from: Square, to: Square, rook_leg: Option<Leg>) -> Self {
        Self { from, to, rook_leg }
    }

    pub fn king_leg(&self) -> Leg {
        Leg::new(self.from, self.to)
    }

    pub fn is_castle(&self) -> bool {
        self.rook_leg.is_some()
    }
}

/// 一次走棋的结果
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub success: bool,
    pub snapshot: Snapshot,
    pub capture: bool,
    pub special: SpecialTag,
}

impl MoveOutcome {
    /// 用协商好的编码表解释响应；局面缺失或无法解析都是错误
    pub fn decode(data: &MoveResultData, codes: &OutcomeCodes) -> Result<Self, ChessError> {
        let raw = data
            .position
            .as_deref()
            .ok_or_else(|| ChessError::MalformedSnapshot {
                reason: "missing position".to_string(),
            })?;
        Ok(Self {
            success: data.move_success,
            snapshot: Snapshot::parse(raw)?,
            capture: codes.is_capture(data.is_kill),
            special: codes.classify(data.special),
        })
    }
}

/// 会话状态
#[derive(Debug, Default)]
pub struct GameStore {
    /// INIT 之前为空
    snapshot: Option<Snapshot>,
    selection: Option<Square>,
    hints: Vec<Square>,
    pending: Option<PendingMove>,
    promotion: Option<PromotionPrompt>,
    codes: OutcomeCodes,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn selection(&self) -> Option<Square> {
        self.selection
    }

    pub fn hints(&self) -> &[Square] {
        &self.hints
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn promotion(&self) -> Option<&PromotionPrompt> {
        self.promotion.as_ref()
    }

    pub fn promotion_mut(&mut self) -> Option<&mut PromotionPrompt> {
        self.promotion.as_mut()
    }

    pub fn codes(&self) -> &OutcomeCodes {
        &self.codes
    }

    /// INIT：替换局面，清空选择
    pub fn install_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
        self.clear_selection();
    }

    pub fn install_codes(&mut self, codes: OutcomeCodes) {
        self.codes = codes;
    }

    /// 选中新格子，旧提示作废
    pub fn select(&mut self, square: Square) {
        self.selection = Some(square);
        self.hints.clear();
    }

    pub fn set_hints(&mut self, hints: Vec<Square>) {
        self.hints = hints;
    }

    /// 返回之前是否有选择或提示
    pub fn clear_selection(&mut self) -> bool {
        let had = self.selection.is_some() || !self.hints.is_empty();
        self.selection = None;
        self.hints.clear();
        had
    }

    pub fn set_pending(&mut self, pending: PendingMove) {
        self.pending = Some(pending);
    }

    pub fn clear_pending(&mut self) -> Option<PendingMove> {
        self.pending.take()
    }

    /// 终止提交：局面落地，走棋相关的临时状态全部清除
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
        self.selection = None;
        self.hints.clear();
        self.pending = None;
    }

    pub fn open_promotion(&mut self, prompt: PromotionPrompt) {
        self.promotion = Some(prompt);
    }

    pub fn take_promotion(&mut self) -> Option<PromotionPrompt> {
        self.promotion.take()
    }
}
