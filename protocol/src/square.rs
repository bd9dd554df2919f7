//! 坐标编解码
//!
//! (rank, file) 整数对与代数记法 `a1..h8` 之间的双向映射。

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, MAX_RANK, MIN_RANK};
use crate::error::ChessError;

/// 棋盘格子
///
/// rank 为行号 (1-8)，file 为列号 (1-8, 1 = a)。
/// 在线协议中以代数记法字符串传输。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    rank: u8,
    file: u8,
}

impl Square {
    /// 创建新格子，越界时返回错误
    pub fn new(rank: u8, file: u8) -> Result<Self, ChessError> {
        if Self::in_range(rank) && Self::in_range(file) {
            Ok(Self { rank, file })
        } else {
            Err(ChessError::InvalidCoordinate {
                input: format!("({}, {})", rank, file),
            })
        }
    }

    /// 创建新格子（不检查边界，内部使用）
    pub const fn new_unchecked(rank: u8, file: u8) -> Self {
        Self { rank, file }
    }

    fn in_range(v: u8) -> bool {
        (MIN_RANK..=MAX_RANK).contains(&v)
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    /// 列字母 (a-h)
    pub fn file_char(&self) -> char {
        (b'a' + self.file - 1) as char
    }

    /// 转换为代数记法，例如 (2, 5) -> "e2"
    pub fn to_algebraic(&self) -> String {
        format!("{}{}", self.file_char(), self.rank)
    }

    /// 从代数记法解析
    pub fn from_algebraic(label: &str) -> Result<Self, ChessError> {
        let invalid = || ChessError::InvalidCoordinate {
            input: label.to_string(),
        };

        let bytes = label.as_bytes();
        if bytes.len() != 2 {
            return Err(invalid());
        }

        let file = match bytes[0] {
            c @ b'a'..=b'h' => c - b'a' + 1,
            _ => return Err(invalid()),
        };
        let rank = match bytes[1] {
            c @ b'1'..=b'8' => c - b'0',
            _ => return Err(invalid()),
        };

        Ok(Self { rank, file })
    }

    /// 同一行内按列偏移
    pub fn offset_file(&self, delta: i8) -> Option<Square> {
        let file = self.file as i8 + delta;
        if file >= MIN_RANK as i8 && file <= MAX_RANK as i8 {
            Some(Self {
                rank: self.rank,
                file: file as u8,
            })
        } else {
            None
        }
    }

    /// 是否为浅色格（a1 为深色格）
    pub fn is_light(&self) -> bool {
        (self.rank + self.file) % 2 == 1
    }

    /// 转换为数组索引 (a1 = 0, h8 = 63)
    pub fn to_index(&self) -> usize {
        (self.rank as usize - 1) * BOARD_SIZE + (self.file as usize - 1)
    }

    /// 从数组索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_SIZE * BOARD_SIZE {
            Some(Self {
                rank: (index / BOARD_SIZE) as u8 + 1,
                file: (index % BOARD_SIZE) as u8 + 1,
            })
        } else {
            None
        }
    }

    /// 遍历全部 64 个格子 (a1, b1, ..., h8)
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE * BOARD_SIZE).filter_map(Square::from_index)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank)
    }
}

impl std::str::FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::from_algebraic(s)
    }
}

impl TryFrom<String> for Square {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Square::from_algebraic(&value)
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_algebraic()
    }
}
