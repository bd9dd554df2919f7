//! 游戏状态与输入

mod input;
mod promotion;
mod state;

pub use input::{Intent, MoveIntentBuilder, SelectionState};
pub use promotion::PromotionPrompt;
pub use state::{GameStore, MoveOutcome, PendingMove};
