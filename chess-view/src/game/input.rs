//! 输入处理
//!
//! 点击 -> 选择状态机 -> 走棋意图。合法性全部交给服务端判断。

use chess_protocol::{PieceKind, Snapshot, Square};

use super::state::{GameStore, PendingMove};
use crate::animation::Leg;

/// 选择状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Armed(Square),
}

impl SelectionState {
    pub fn of(store: &GameStore) -> Self {
        match store.selection() {
            Some(square) => SelectionState::Armed(square),
            None => SelectionState::Idle,
        }
    }
}

/// 点击解释结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// 无操作
    Ignored,
    /// 有走棋/动画/升变在进行，点击被拒绝
    Busy,
    /// 选中（或改选）并请求提示
    Select(Square),
    /// 取消选择
    Deselect,
    /// 发出走棋
    Move(PendingMove),
}

/// 走棋意图构建
pub struct MoveIntentBuilder;

impl MoveIntentBuilder {
    pub fn interpret(store: &GameStore, square: Square, busy: bool) -> Intent {
        if busy {
            return Intent::Busy;
        }
        let Some(snapshot) = store.snapshot() else {
            return Intent::Ignored;
        };
        let player = snapshot.current_player();
        let own = snapshot.square_color(square) == Some(player);

        match SelectionState::of(store) {
            SelectionState::Idle if own => Intent::Select(square),
            SelectionState::Idle => Intent::Ignored,
            SelectionState::Armed(selected) if selected == square => Intent::Deselect,
            SelectionState::Armed(_) if own => Intent::Select(square),
            SelectionState::Armed(selected) => Intent::Move(PendingMove::new(
                selected,
                square,
                Self::rook_leg(snapshot, selected, square),
            )),
        }
    }

    /// 王从初始格横移两格以上时推导车腿
    pub fn rook_leg(snapshot: &Snapshot, from: Square, to: Square) -> Option<Leg> {
        let king = snapshot.piece_at(from)?;
        if king.kind != PieceKind::King {
            return None;
        }
        let home = king.color.home_rank();
        if from.rank() != home || to.rank() != home || from.file() != 5 {
            return None;
        }
        // 车落在王越过的那一格
        let (rook_file, step) = match i16::from(to.file()) - i16::from(from.file()) {
            d if d > 1 => (8, 1),
            d if d < -1 => (1, -1),
            _ => return None,
        };
        Some(Leg::new(
            Square::new_unchecked(home, rook_file),
            from.offset_file(step)?,
        ))
    }
}
