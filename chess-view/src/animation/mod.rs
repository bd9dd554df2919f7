//! 走棋动画与终局信号

mod cadence;
mod endgame;
mod plan;
mod scheduler;
mod sequencer;

pub use cadence::{Cadence, CadenceError};
pub use endgame::EndgameSignal;
pub use plan::{Action, AnimationPlan, AnimationStep, Leg, LegFlags};
pub use scheduler::Scheduler;
pub use sequencer::{ActivePlan, AnimationError, PlanCompletion, Sequencer};
