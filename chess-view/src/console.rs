//! 终端渲染
//!
//! 无界面运行时的效果输出和命令解析。

use std::time::Duration;

use chess_protocol::{ChessError, PromotionPiece, Snapshot, Square, MAX_RANK, MIN_RANK};

use crate::client::UserCommand;
use crate::effects::{Effect, EffectSink};

/// 把效果写到终端和日志
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    /// 音效音量（0-100）
    volume: u32,
}

impl ConsoleSink {
    pub fn new(volume: u32) -> Self {
        Self {
            volume: volume.min(100),
        }
    }
}

impl EffectSink for ConsoleSink {
    fn apply(&mut self, at: Duration, effect: Effect) {
        let ms = at.as_millis() as u64;
        match effect {
            Effect::Slide { from, to } => tracing::debug!(ms, %from, %to, "slide"),
            Effect::ResetTransform { square } => tracing::trace!(ms, %square, "reset transform"),
            Effect::Sound(cue) => {
                let volume = (self.volume * cue.gain()).min(100);
                tracing::info!(ms, cue = cue.name(), volume, "sound");
            }
            Effect::Paint { square, tone } => {
                tracing::debug!(ms, %square, color = tone.hex(square), "paint");
            }
            Effect::PromotionOpened { square, color, choices } => {
                let names: Vec<&str> = choices.iter().map(|p| p.name()).collect();
                println!(
                    "{} pawn promotes on {}: promote <{}>",
                    color,
                    square,
                    names.join("|")
                );
            }
            Effect::PromotionClosed => tracing::debug!(ms, "promotion closed"),
            Effect::Committed { snapshot } => {
                println!("{}", render_board(&snapshot));
            }
            Effect::SelectionChanged { selection, hints } => {
                if let Some(square) = selection {
                    let hints: Vec<String> = hints.iter().map(Square::to_algebraic).collect();
                    println!("selected {} -> [{}]", square, hints.join(" "));
                }
            }
        }
    }
}

/// 文本棋盘，8 行在上
pub fn render_board(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for rank in (MIN_RANK..=MAX_RANK).rev() {
        out.push_str(&format!("{} ", rank));
        if let Ok(row) = snapshot.row(rank) {
            for cell in row {
                out.push(' ');
                out.push(cell.piece.map(|p| p.symbol()).unwrap_or('·'));
            }
        }
        out.push('\n');
    }
    out.push_str("   a b c d e f g h\n");
    out.push_str(&format!("{} to move", snapshot.current_player()));
    out
}

/// 解析一行输入；空行返回 None
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, ChessError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let command = match first.to_ascii_lowercase().as_str() {
        "quit" | "exit" => UserCommand::Quit,
        "board" => UserCommand::Redraw,
        "promote" => {
            let kind: PromotionPiece = words.next().unwrap_or_default().parse()?;
            UserCommand::Promote(kind)
        }
        label => UserCommand::Click(label.parse()?),
    };
    Ok(Some(command))
}
