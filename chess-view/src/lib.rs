//! 国际象棋视图同步客户端
//!
//! 与权威引擎通过异步消息通道保持局面同步，并编排走棋动画、
//! 音效和终局信号，保证反馈不重叠、不与权威局面脱节。

pub mod animation;
pub mod client;
pub mod console;
pub mod effects;
pub mod game;
pub mod network;
mod router;
pub mod session;
pub mod settings;
pub mod view;

pub use effects::{Cue, Effect, EffectSink, Tone};
pub use session::{Handled, RequestSink, Session, SessionError};
