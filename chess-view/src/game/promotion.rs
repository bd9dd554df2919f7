//! 兵升变流程

use chess_protocol::{Color, Piece, PieceKind, PromotionPiece, Request, Snapshot, Square};
use tokio::sync::oneshot;

/// 打开中的升变选择
#[derive(Debug)]
pub struct PromotionPrompt {
    square: Square,
    color: Color,
    /// 已发出、等待响应的选择
    chosen: Option<PromotionPiece>,
    /// 走棋计划的完成通知，升变成功后兑现
    completion: Option<oneshot::Sender<Snapshot>>,
}

impl PromotionPrompt {
    pub fn new(
        square: Square,
        color: Color,
        completion: Option<oneshot::Sender<Snapshot>>,
    ) -> Self {
        Self {
            square,
            color,
            chosen: None,
            completion,
        }
    }

    pub fn square(&self) -> Square {
        self.square
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn chosen(&self) -> Option<PromotionPiece> {
        self.chosen
    }

    /// 正好四个选项
    pub fn choices(&self) -> [PromotionPiece; 4] {
        PromotionPiece::ALL
    }

    /// 选项对应的棋子（按升变方颜色）
    pub fn pieces(&self) -> [Piece; 4] {
        self.choices().map(|p| Piece::new(p.kind(), self.color))
    }

    /// 做出选择；已有选择在等待响应时返回 None
    pub fn choose(&mut self, kind: PromotionPiece) -> Option<Request> {
        if let Some(previous) = self.chosen {
            tracing::debug!(
                previous = previous.name(),
                ignored = kind.name(),
                "Promotion already requested"
            );
            return None;
        }
        self.chosen = Some(kind);
        Some(Request::PromotePawn {
            position: self.square,
            promote_to: kind,
        })
    }

    /// 服务端拒绝：允许重新选择
    pub fn reopen(&mut self) {
        self.chosen = None;
    }

    /// 在局面中找到待升变的兵
    ///
    /// 优先取走法终点；没有走法时在双方的最后一行查找兵。
    pub fn locate(snapshot: &Snapshot, target: Option<Square>) -> Option<(Square, Color)> {
        let pawn_at = |square: Square| {
            snapshot
                .piece_at(square)
                .filter(|p| p.kind == PieceKind::Pawn && square.rank() == p.color.opponent().home_rank())
                .map(|p| (square, p.color))
        };
        target.and_then(pawn_at).or_else(|| {
            [Color::White, Color::Black]
                .into_iter()
                .flat_map(|color| snapshot.row(color.opponent().home_rank()).ok())
                .flatten()
                .find_map(|cell| pawn_at(cell.square))
        })
    }

    /// 升变成功，兑现完成通知
    pub fn finish(mut self, snapshot: &Snapshot) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(snapshot.clone());
        }
    }
}
