//! 棋盘视觉格子表
//!
//! 挂载时建立一次，按 (rank, file) 直接索引。记录渲染层当前显示的内容，
//! 动画据此解析起终点锚点。

use chess_protocol::{Piece, Snapshot, Square, BOARD_SIZE};

use crate::effects::Tone;

/// 单个视觉格子
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisualCell {
    /// 显示中的棋子
    pub piece: Option<Piece>,
    /// 棋子被平移到的目标格
    pub displaced_to: Option<Square>,
    /// 覆盖色调，None 表示静态样式
    pub tone: Option<Tone>,
}

/// 格子表
#[derive(Debug, Clone)]
pub struct BoardView {
    cells: Vec<VisualCell>,
}

impl BoardView {
    /// 挂载空棋盘
    pub fn mount() -> Self {
        Self {
            cells: vec![VisualCell::default(); BOARD_SIZE * BOARD_SIZE],
        }
    }

    pub fn cell(&self, square: Square) -> &VisualCell {
        &self.cells[square.to_index()]
    }

    fn cell_mut(&mut self, square: Square) -> &mut VisualCell {
        &mut self.cells[square.to_index()]
    }

    /// 锚点：起点格上显示的棋子
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.cell(square).piece
    }

    pub fn tone(&self, square: Square) -> Option<Tone> {
        self.cell(square).tone
    }

    /// 按快照重建显示内容，返回被复位的平移格
    pub fn sync(&mut self, snapshot: &Snapshot) -> Vec<Square> {
        let mut reset = Vec::new();
        for square in Square::all() {
            let cell = self.cell_mut(square);
            if let Some(target) = cell.displaced_to.take() {
                reset.push(target);
            }
            cell.piece = snapshot.piece_at(square);
        }
        reset
    }

    /// 标记平移
    pub fn slide(&mut self, from: Square, to: Square) {
        self.cell_mut(from).displaced_to = Some(to);
    }

    pub fn paint(&mut self, square: Square, tone: Tone) {
        self.cell_mut(square).tone = Some(tone);
    }
}

impl Default for BoardView {
    fn default() -> Self {
        Self::mount()
    }
}
