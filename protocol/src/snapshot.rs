//! 局面快照（FEN）解析和生成
//!
//! 服务端以标准 FEN 字符串描述局面：
//! `<棋盘> <走子方> <易位权> <吃过路兵目标格> <半回合数> <回合数>`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1`

use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell};
use crate::constants::{BOARD_SIZE, START_FEN};
use crate::error::ChessError;
use crate::piece::{Color, Piece};
use crate::square::Square;

/// 局面快照
///
/// 不可变；每次确认的状态变化整体替换。原始字符串保留，
/// 走子方始终由字符串推导。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Snapshot {
    raw: String,
    board: Board,
    current_player: Color,
    castling: String,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Snapshot {
    /// 解析 FEN 字符串
    pub fn parse(fen: &str) -> Result<Snapshot, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ChessError::malformed("empty snapshot string"));
        }

        let board = Self::parse_board(parts[0])?;

        // 走子方（缺省为白方）
        let current_player = match parts.get(1) {
            Some(field) => {
                let mut chars = field.chars();
                match (chars.next().and_then(Color::from_fen_char), chars.next()) {
                    (Some(color), None) => color,
                    _ => {
                        return Err(ChessError::malformed(format!(
                            "invalid active color: {}",
                            field
                        )))
                    }
                }
            }
            None => Color::White,
        };

        let castling = parts.get(2).map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());

        let en_passant = parts
            .get(3)
            .filter(|s| **s != "-")
            .and_then(|s| Square::from_algebraic(s).ok());

        let halfmove_clock = parts.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        let fullmove_number = parts.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        Ok(Snapshot {
            raw: fen.trim().to_string(),
            board,
            current_player,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// 解析棋盘部分
    fn parse_board(placement: &str) -> Result<Board, ChessError> {
        let mut board = Board::empty();
        let rows: Vec<&str> = placement.split('/').collect();

        if rows.len() != BOARD_SIZE {
            return Err(ChessError::malformed(format!(
                "expected {} ranks, got {}",
                BOARD_SIZE,
                rows.len()
            )));
        }

        // FEN 从上到下是第 8 行到第 1 行
        for (row_idx, row) in rows.iter().enumerate() {
            let rank = (BOARD_SIZE - row_idx) as u8;
            let mut file = 0usize;

            for c in row.chars() {
                if let Some(run) = c.to_digit(10) {
                    if run == 0 {
                        return Err(ChessError::malformed(format!(
                            "zero-length empty run in rank {}",
                            rank
                        )));
                    }
                    file += run as usize;
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    file += 1;
                    if file <= BOARD_SIZE {
                        board.set(Square::new_unchecked(rank, file as u8), Some(piece));
                    }
                } else {
                    return Err(ChessError::malformed(format!(
                        "invalid piece character: {}",
                        c
                    )));
                }

                if file > BOARD_SIZE {
                    break;
                }
            }

            if file != BOARD_SIZE {
                return Err(ChessError::malformed(format!(
                    "rank {} has {} files, expected {}",
                    rank, file, BOARD_SIZE
                )));
            }
        }

        Ok(board)
    }

    /// 初始局面
    pub fn initial() -> Snapshot {
        Self::parse(START_FEN).expect("Initial FEN should be valid")
    }

    /// 原始字符串（与服务端下发的完全一致）
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 当前走子方
    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn castling(&self) -> &str {
        &self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// 指定格子上的棋子
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.get(square)
    }

    /// 按代数记法查询棋子
    pub fn piece_at_label(&self, label: &str) -> Result<Option<Piece>, ChessError> {
        Ok(self.board.get(Square::from_algebraic(label)?))
    }

    /// 指定格子上棋子的颜色
    pub fn square_color(&self, square: Square) -> Option<Color> {
        self.board.get(square).map(|p| p.color)
    }

    /// 某一行的 8 个格子（a 到 h）
    pub fn row(&self, rank: u8) -> Result<[Cell; BOARD_SIZE], ChessError> {
        self.board.row(rank).ok_or_else(|| ChessError::InvalidCoordinate {
            input: format!("rank {}", rank),
        })
    }

    /// 指定阵营王所在格子
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.board.find_king(color)
    }

    /// 重新生成 FEN 字符串
    pub fn to_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(BOARD_SIZE);

        for rank in (1..=BOARD_SIZE as u8).rev() {
            let mut row = String::new();
            let mut empty_count = 0;

            for file in 1..=BOARD_SIZE as u8 {
                match self.board.get(Square::new_unchecked(rank, file)) {
                    Some(piece) => {
                        if empty_count > 0 {
                            row.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        row.push(piece.to_fen_char());
                    }
                    None => empty_count += 1,
                }
            }

            if empty_count > 0 {
                row.push_str(&empty_count.to_string());
            }
            ranks.push(row);
        }

        format!(
            "{} {} {} {} {} {}",
            ranks.join("/"),
            self.current_player.to_fen_char(),
            self.castling,
            self.en_passant
                .map(|sq| sq.to_algebraic())
                .unwrap_or_else(|| "-".to_string()),
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl std::str::FromStr for Snapshot {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snapshot::parse(s)
    }
}

impl TryFrom<String> for Snapshot {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Snapshot::parse(&value)
    }
}

impl From<Snapshot> for String {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.raw
    }
}
