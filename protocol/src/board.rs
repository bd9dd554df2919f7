//! 棋盘

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;
use crate::piece::{Color, Piece, PieceKind};
use crate::square::Square;

/// 单个格子的描述（用于逐行渲染）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub square: Square,
    pub piece: Option<Piece>,
}

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 (rank - 1) * 8 + (file - 1)
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// 获取指定格子的棋子
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares.get(square.to_index()).copied().flatten()
    }

    /// 设置指定格子的棋子
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        if let Some(slot) = self.squares.get_mut(square.to_index()) {
            *slot = piece;
        }
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.all_pieces()
            .into_iter()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Square, Piece)> {
        Square::all()
            .filter_map(|sq| self.get(sq).map(|p| (sq, p)))
            .collect()
    }

    /// 获取一行（a 到 h）
    pub fn row(&self, rank: u8) -> Option<[Cell; BOARD_SIZE]> {
        let first = Square::new(rank, 1).ok()?;
        let mut cells = [Cell {
            square: first,
            piece: None,
        }; BOARD_SIZE];
        for (i, cell) in cells.iter_mut().enumerate() {
            let square = Square::new_unchecked(rank, i as u8 + 1);
            *cell = Cell {
                square,
                piece: self.get(square),
            };
        }
        Some(cells)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}
