//! 服务端消息分发
//!
//! 每种消息类型一个独立处理函数，互不穿透。处理完毕后推进时钟。

use std::time::Duration;

use chess_protocol::{
    ChessError, ConfigData, Envelope, InitData, MessageType, MoveResultData, OutcomeCodes,
    PossibleMovesData, Snapshot, SpecialTag,
};
use serde::de::DeserializeOwned;

use crate::animation::EndgameSignal;
use crate::effects::{Effect, EffectSink};
use crate::game::{MoveOutcome, PromotionPrompt};
use crate::session::{Handled, RequestSink, Session, SessionError};

impl<R: RequestSink, S: EffectSink> Session<R, S> {
    /// 处理一条服务端消息
    ///
    /// 只有权威局面无法解析时返回错误，此时状态未被修改。
    pub fn handle_envelope(
        &mut self,
        envelope: &Envelope,
        now: Duration,
    ) -> Result<Handled, SessionError> {
        if envelope.is_error() {
            tracing::warn!(
                kind = ?envelope.kind,
                error = envelope.error,
                "Dropping failed message"
            );
            return Ok(Handled::Dropped);
        }

        tracing::debug!(kind = ?envelope.kind, "Dispatching message");
        let handled = match envelope.kind {
            MessageType::Init => self.on_init(envelope, now)?,
            MessageType::Config => self.on_config(envelope),
            MessageType::MakeMove => self.on_make_move(envelope, now)?,
            MessageType::PossibleMoves => self.on_possible_moves(envelope, now),
            MessageType::PromotePawn => self.on_promote_pawn(envelope, now)?,
            MessageType::Unknown => {
                tracing::debug!(data = %envelope.data, "Ignoring unknown message type");
                Handled::Ignored
            }
        };

        self.tick(now);
        Ok(handled)
    }

    fn on_init(&mut self, envelope: &Envelope, now: Duration) -> Result<Handled, SessionError> {
        let data: InitData = decode(envelope).ok_or_else(missing_position)?;
        let snapshot = Snapshot::parse(&data.position)?;

        tracing::info!(
            position = snapshot.as_str(),
            player = %snapshot.current_player(),
            "Initial position received"
        );
        self.store.install_snapshot(snapshot.clone());
        for square in self.view.sync(&snapshot) {
            self.sink.apply(now, Effect::ResetTransform { square });
        }
        self.sink.apply(now, Effect::Committed { snapshot });
        self.emit_selection(now);
        Ok(Handled::Applied)
    }

    fn on_config(&mut self, envelope: &Envelope) -> Handled {
        let Some(data) = decode::<ConfigData>(envelope) else {
            return Handled::Dropped;
        };
        let codes = OutcomeCodes::from_constants(&data.constants);
        if !codes.is_configured() {
            tracing::warn!("CONFIG carried no known outcome codes");
        }
        tracing::info!(count = data.constants.len(), "Outcome codes installed");
        self.store.install_codes(codes);
        Handled::Applied
    }

    fn on_make_move(
        &mut self,
        envelope: &Envelope,
        now: Duration,
    ) -> Result<Handled, SessionError> {
        let Some(data) = decode::<MoveResultData>(envelope) else {
            return Ok(Handled::Dropped);
        };

        if !data.move_success {
            let pending = self.store.clear_pending();
            tracing::info!(?pending, "Move rejected by server");
            if self.store.clear_selection() {
                self.emit_selection(now);
            }
            return Ok(Handled::Rejected);
        }

        // 先解析，失败时不修改任何状态
        let outcome = MoveOutcome::decode(&data, self.store.codes())?;
        if self.store.clear_selection() {
            self.emit_selection(now);
        }

        if self.sequencer.active().is_some() {
            tracing::warn!("Move confirmed while a plan is running, replacing its snapshot");
            self.sequencer.supersede(outcome.snapshot).ok();
            return Ok(Handled::Applied);
        }

        match self
            .sequencer
            .start(&outcome, self.store.pending(), &self.view, now)
        {
            Ok(completion) => Ok(Handled::Animating(completion)),
            Err(e) => {
                tracing::warn!("Cannot animate move: {}, committing directly", e);
                let target = self.store.pending().map(|p| p.to);
                self.commit_snapshot(now, outcome.snapshot.clone());
                if outcome.special == SpecialTag::PromotionPossible {
                    // 服务端在等待 PROMOTE_PAWN，升变流程必须照常打开
                    match PromotionPrompt::locate(&outcome.snapshot, target) {
                        Some((square, color)) => self.open_promotion(now, square, color, None),
                        None => tracing::warn!("Promotion reported but no pawn on a last rank"),
                    }
                } else if let Some(signal) =
                    EndgameSignal::after_move(outcome.special, &outcome.snapshot)
                {
                    self.signal(now, signal, &outcome.snapshot);
                }
                Ok(Handled::Committed)
            }
        }
    }

    fn on_possible_moves(&mut self, envelope: &Envelope, now: Duration) -> Handled {
        let Some(data) = decode::<PossibleMovesData>(envelope) else {
            return Handled::Dropped;
        };
        if self.store.selection().is_none() {
            tracing::debug!("Stale hints arrived after selection was cleared");
            return Handled::Ignored;
        }
        self.store.set_hints(data.possible_moves);
        self.emit_selection(now);
        Handled::Applied
    }

    fn on_promote_pawn(
        &mut self,
        envelope: &Envelope,
        now: Duration,
    ) -> Result<Handled, SessionError> {
        let Some(data) = decode::<MoveResultData>(envelope) else {
            return Ok(Handled::Dropped);
        };
        let Some(prompt) = self.store.promotion_mut() else {
            tracing::warn!("Promotion result without an open prompt");
            return Ok(Handled::Ignored);
        };

        if !data.move_success {
            tracing::info!(square = %prompt.square(), "Promotion rejected, awaiting a new choice");
            prompt.reopen();
            let (square, color, choices) = (prompt.square(), prompt.color(), prompt.choices());
            self.sink.apply(now, Effect::PromotionOpened { square, color, choices });
            return Ok(Handled::Rejected);
        }

        let outcome = MoveOutcome::decode(&data, self.store.codes())?;
        if let Some(prompt) = self.store.take_promotion() {
            prompt.finish(&outcome.snapshot);
        }
        self.sink.apply(now, Effect::PromotionClosed);
        self.commit_snapshot(now, outcome.snapshot.clone());
        if let Some(signal) = EndgameSignal::after_promotion(outcome.special, &outcome.snapshot) {
            self.signal(now, signal, &outcome.snapshot);
        }
        Ok(Handled::Committed)
    }
}

/// 解码负载，失败时记录并丢弃
fn decode<T: DeserializeOwned>(envelope: &Envelope) -> Option<T> {
    match envelope.decode() {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(kind = ?envelope.kind, "Dropping undecodable payload: {}", e);
            None
        }
    }
}

fn missing_position() -> SessionError {
    SessionError::Snapshot(ChessError::MalformedSnapshot {
        reason: "missing position".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Cadence;
    use crate::effects::testing::RecordingSink;
    use crate::effects::{Cue, Tone};
    use crate::game::Intent;
    use crate::session::testing::RecordingRequests;
    use chess_protocol::{PieceKind, PromotionPiece, Request, Square, START_FEN};
    use serde_json::json;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
    const BEFORE_EXD5: &str = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
    const AFTER_EXD5: &str = "rnbqkbnr/ppp1pppp/8/3P4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2";
    const AFTER_BB5: &str = "rnbqkbnr/ppp1pppp/8/1B1p4/4P3/8/PPPP1PPP/RNBQK1NR b KQkq - 1 2";
    const CASTLE_READY: &str = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
    const CASTLED: &str = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1 b kq - 1 1";
    const PAWN_ON_D7: &str = "k7/3P4/8/8/8/8/8/4K3 w - - 0 1";
    const PAWN_ON_D8: &str = "k2P4/8/8/8/8/8/8/4K3 w - - 0 1";
    const KNIGHT_ON_D8: &str = "k2N4/8/8/8/8/8/8/4K3 b - - 0 1";
    const BEFORE_QH5: &str = "rnbqkbnr/ppppp2p/5p2/6p1/4P3/8/PPPP1PPP/RNBQKBNR w KQkq g6 0 3";
    const BLACK_MATED: &str = "rnbqkbnr/ppppp2p/5p2/6pQ/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 3";
    const BEFORE_QF7: &str = "7k/4Q3/6K1/8/8/8/8/8 w - - 0 1";
    const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 1 1";
    const CASTLE_INTO_CHECK: &str = "5k2/8/8/8/8/8/8/4K2R w K - 0 1";
    const CASTLED_CHECK: &str = "5k2/8/8/8/8/8/8/5RK1 b - - 1 1";
    const QUEEN_ON_D8: &str = "k2Q4/8/8/8/8/8/8/4K3 b - - 0 1";
    const PAWN_ON_D7_MATE: &str = "k7/3P4/1K6/8/8/8/8/8 w - - 0 1";
    const PAWN_ON_D8_MATE: &str = "k2P4/8/1K6/8/8/8/8/8 w - - 0 1";
    const QUEEN_MATES: &str = "k2Q4/8/1K6/8/8/8/8/8 b - - 0 1";

    type TestSession = Session<RecordingRequests, RecordingSink>;

    fn sq(label: &str) -> Square {
        Square::from_algebraic(label).unwrap()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn envelope(value: serde_json::Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    fn move_result(kind: &str, position: &str, is_kill: i64, special: i64) -> Envelope {
        envelope(json!({
            "type": kind,
            "data": {
                "move_success": true,
                "position": position,
                "is_kill": is_kill,
                "special": special,
            },
            "error": 0,
        }))
    }

    /// 已收到 INIT 和 CONFIG 的会话
    fn session_at(fen: &str) -> TestSession {
        let mut session = Session::new(
            RecordingRequests::default(),
            RecordingSink::default(),
            Cadence::default(),
        );
        session.start();
        session
            .handle_envelope(&envelope(json!({"type": "INIT", "data": {"position": fen}})), ms(0))
            .unwrap();
        session
            .handle_envelope(
                &envelope(json!({
                    "type": "CONFIG",
                    "data": {"constants": {
                        "KILL": 3, "NO_KILL": 2,
                        "CHECK": 1, "NO_CHECK": 0,
                        "CHECKMATE": 2, "STALEMATE": 3,
                        "CASTLED_CHECK": 4, "CASTLED_NO_CHECK": 5,
                        "PROMOTE_POSSIBLE": 6,
                    }},
                })),
                ms(0),
            )
            .unwrap();
        session.sink.effects.clear();
        session
    }

    fn play(session: &mut TestSession, from: &str, to: &str) {
        assert_eq!(session.click(sq(from), ms(0)), Intent::Select(sq(from)));
        assert!(matches!(session.click(sq(to), ms(0)), Intent::Move(_)));
    }

    fn run_until(session: &mut TestSession, end: u64) {
        while let Some(deadline) = session.next_deadline() {
            if deadline > ms(end) {
                break;
            }
            session.tick(deadline);
        }
    }

    #[test]
    fn test_init_installs_snapshot() {
        let session = session_at(START_FEN);
        let snapshot = session.store().snapshot().unwrap();
        assert_eq!(snapshot.as_str(), START_FEN);
        assert_eq!(
            session.view().piece_at(sq("e1")).map(|p| p.kind),
            Some(PieceKind::King)
        );
    }

    #[test]
    fn test_init_accepts_fen_alias() {
        let mut session = session_at(START_FEN);
        session
            .handle_envelope(&envelope(json!({"type": "INIT", "data": {"fen": AFTER_E4}})), ms(5))
            .unwrap();
        assert_eq!(session.store().snapshot().map(|s| s.as_str()), Some(AFTER_E4));
    }

    #[test]
    fn test_plain_move() {
        let mut session = session_at(START_FEN);
        play(&mut session, "e2", "e4");

        let Handled::Animating(mut completion) = session
            .handle_envelope(&move_result("MAKE_MOVE", AFTER_E4, 2, 0), ms(0))
            .unwrap()
        else {
            panic!("expected animation");
        };
        assert_eq!(session.click(sq("e7"), ms(100)), Intent::Busy);

        run_until(&mut session, 10_000);
        let sink = session.sink();
        assert_eq!(sink.slides(), vec![(0, sq("e2"), sq("e4"))]);
        assert_eq!(sink.sounds(), vec![(200, Cue::Move)]);
        assert!(sink.paints(sq("e8")).is_empty());
        let commits = sink.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0, 500);
        assert_eq!(commits[0].1.as_str(), AFTER_E4);

        assert_eq!(completion.try_result().map(|s| s.as_str().to_string()), Some(AFTER_E4.to_string()));
        assert_eq!(session.store().snapshot().map(|s| s.as_str()), Some(AFTER_E4));
        assert!(session.store().pending().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_capture_cue() {
        let mut session = session_at(BEFORE_EXD5);
        play(&mut session, "e4", "d5");
        session
            .handle_envelope(&move_result("MAKE_MOVE", AFTER_EXD5, 3, 0), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);

        assert_eq!(session.sink().sounds(), vec![(200, Cue::Capture)]);
        assert_eq!(session.sink().commits().len(), 1);
    }

    #[test]
    fn test_check_flickers_checked_king() {
        let mut session = session_at(BEFORE_EXD5);
        play(&mut session, "f1", "b5");
        session
            .handle_envelope(&move_result("MAKE_MOVE", AFTER_BB5, 2, 1), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);

        let sink = session.sink();
        assert_eq!(sink.sounds(), vec![(200, Cue::MoveCheck), (400, Cue::Check)]);
        assert_eq!(
            sink.paints(sq("e8")),
            vec![(400, Tone::Alert), (700, Tone::Base), (1000, Tone::Base)]
        );
        assert_eq!(sink.commits().len(), 1);
        assert_eq!(sink.commits()[0].1.as_str(), AFTER_BB5);
    }

    #[test]
    fn test_castling_two_legs_one_commit() {
        let mut session = session_at(CASTLE_READY);
        play(&mut session, "e1", "g1");
        let pending = session.store().pending().copied().unwrap();
        assert!(pending.is_castle());

        session
            .handle_envelope(&move_result("MAKE_MOVE", CASTLED, 2, 5), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);

        let sink = session.sink();
        assert_eq!(
            sink.slides(),
            vec![(0, sq("e1"), sq("g1")), (500, sq("h1"), sq("f1"))]
        );
        assert_eq!(sink.sounds(), vec![(200, Cue::Move), (900, Cue::Move)]);
        let commits = sink.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0, 1000);
        assert_eq!(commits[0].1.as_str(), CASTLED);
    }

    #[test]
    fn test_promotion_to_knight() {
        let mut session = session_at(PAWN_ON_D7);
        play(&mut session, "d7", "d8");
        let Handled::Animating(mut completion) = session
            .handle_envelope(&move_result("MAKE_MOVE", PAWN_ON_D8, 2, 6), ms(0))
            .unwrap()
        else {
            panic!("expected animation");
        };
        run_until(&mut session, 10_000);

        assert!(session.sink().commits().is_empty());
        assert_eq!(session.sink().sounds(), vec![(200, Cue::Promotion)]);
        let prompt = session.store().promotion().unwrap();
        assert_eq!(prompt.square(), sq("d8"));
        assert_eq!(prompt.choices().len(), 4);
        assert!(session.is_busy());

        assert!(session.choose_promotion(PromotionPiece::Knight));
        assert!(!session.choose_promotion(PromotionPiece::Queen));
        assert_eq!(
            serde_json::to_value(session.requests().sent.last().unwrap()).unwrap(),
            json!({"type": "PROMOTE_PAWN", "data": {"position": "d8", "promote_to": "knight"}})
        );

        let handled = session
            .handle_envelope(&move_result("PROMOTE_PAWN", KNIGHT_ON_D8, 2, 0), ms(3000))
            .unwrap();
        assert!(matches!(handled, Handled::Committed));
        assert!(session.store().promotion().is_none());
        assert!(session.store().pending().is_none());
        assert_eq!(
            session.store().snapshot().and_then(|s| s.piece_at(sq("d8"))).map(|p| p.kind),
            Some(PieceKind::Knight)
        );
        assert_eq!(completion.try_result().map(|s| s.as_str().to_string()), Some(KNIGHT_ON_D8.to_string()));
        assert!(session.sink().effects.contains(&(ms(3000), Effect::PromotionClosed)));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_promotion_rejection_reopens_prompt() {
        let mut session = session_at(PAWN_ON_D7);
        play(&mut session, "d7", "d8");
        session
            .handle_envelope(&move_result("MAKE_MOVE", PAWN_ON_D8, 2, 6), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);
        session.choose_promotion(PromotionPiece::Rook);

        let handled = session
            .handle_envelope(
                &envelope(json!({"type": "PROMOTE_PAWN", "data": {"move_success": false}})),
                ms(1000),
            )
            .unwrap();
        assert!(matches!(handled, Handled::Rejected));
        assert!(session.store().promotion().is_some());
        assert!(session.choose_promotion(PromotionPiece::Queen));
    }

    #[test]
    fn test_promotion_opens_without_animation() {
        let mut session = session_at(PAWN_ON_D7);
        let handled = session
            .handle_envelope(&move_result("MAKE_MOVE", PAWN_ON_D8, 2, 6), ms(0))
            .unwrap();
        assert!(matches!(handled, Handled::Committed));
        run_until(&mut session, 10_000);

        let prompt = session.store().promotion().unwrap();
        assert_eq!(prompt.square(), sq("d8"));
        assert_eq!(prompt.color(), chess_protocol::Color::White);
        assert!(session.sink().effects.iter().any(|(_, e)| matches!(
            e,
            Effect::PromotionOpened { square, .. } if *square == sq("d8")
        )));
        assert_eq!(session.sink().sounds(), vec![(0, Cue::Promotion)]);
        assert!(session.is_busy());
        assert_eq!(session.click(sq("e1"), ms(100)), Intent::Busy);

        assert!(session.choose_promotion(PromotionPiece::Knight));
        session
            .handle_envelope(&move_result("PROMOTE_PAWN", KNIGHT_ON_D8, 2, 0), ms(2000))
            .unwrap();
        assert!(session.store().promotion().is_none());
        assert_eq!(session.store().snapshot().map(|s| s.as_str()), Some(KNIGHT_ON_D8));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_stalemate_signal_after_move() {
        let mut session = session_at(BEFORE_QF7);
        play(&mut session, "e7", "f7");
        session
            .handle_envelope(&move_result("MAKE_MOVE", STALEMATE, 2, 3), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);

        let sink = session.sink();
        assert_eq!(sink.commits().len(), 1);
        assert_eq!(sink.commits()[0].0, 500);
        for king in [sq("h8"), sq("g6")] {
            let frames = sink.paints(king);
            assert_eq!(frames.len(), 9);
            assert_eq!(frames[0], (800, Tone::DrawAlert));
            assert_eq!(frames[8], (3200, Tone::DrawBase));
        }
        assert_eq!(sink.sounds(), vec![(200, Cue::Move), (3200, Cue::Stalemate)]);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_castling_with_check() {
        let mut session = session_at(CASTLE_INTO_CHECK);
        play(&mut session, "e1", "g1");
        session
            .handle_envelope(&move_result("MAKE_MOVE", CASTLED_CHECK, 2, 4), ms(0))
            .unwrap();
        run_until(&mut session, 10_000);

        let sink = session.sink();
        assert_eq!(
            sink.slides(),
            vec![(0, sq("e1"), sq("g1")), (500, sq("h1"), sq("f1"))]
        );
        assert_eq!(
            sink.sounds(),
            vec![(200, Cue::MoveCheck), (400, Cue::Check), (900, Cue::Move)]
        );
        assert_eq!(
            sink.paints(sq("f8")),
            vec![(400, Tone::Alert), (700, Tone::Base), (1000, Tone::Base)]
        );
        let commits = sink.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0, 1000);
        assert_eq!(commits[0].1.as_str(), CASTLED_CHECK);
    }

    #[test]
    fn test_promotion_with_check() {
        let mut session = session_at(PAWN_ON_D7);
        play(&mut session, "d7", "d8");
        session
            .handle_envelope(&move_result("MAKE_MOVE", PAWN_ON_D8, 2, 6), ms(0))
            .unwrap();
        run_until(&mut session, 1000);
        session.choose_promotion(PromotionPiece::Queen);

        session
            .handle_envelope(&move_result("PROMOTE_PAWN", QUEEN_ON_D8, 2, 1), ms(3000))
            .unwrap();
        assert!(session.is_busy());
        run_until(&mut session, 10_000);

        let sink = session.sink();
        assert_eq!(sink.sounds(), vec![(200, Cue::Promotion), (3200, Cue::Check)]);
        assert_eq!(
            sink.paints(sq("a8")),
            vec![(3200, Tone::Alert), (3500, Tone::Base), (3800, Tone::Base)]
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn test_promotion_with_checkmate() {
        let mut session = session_at(PAWN_ON_D7_MATE);
        play(&mut session, "d7", "d8");
        session
            .handle_envelope(&move_result("MAKE_MOVE", PAWN_ON_D8_MATE, 2, 6), ms(0))
            .unwrap();
        run_until(&mut session, 1000);
        session.choose_promotion(PromotionPiece::Queen);

        session
            .handle_envelope(&move_result("PROMOTE_PAWN", QUEEN_MATES, 2, 2), ms(3000))
            .unwrap();
        run_until(&mut session, 10_000);

        let sink = session.sink();
        let frames = sink.paints(sq("a8"));
        assert_eq!(frames.len(), 9);
        assert_eq!(frames[0], (3200, Tone::Alert));
        assert_eq!(frames[8], (5600, Tone::Base));
        assert_eq!(sink.sounds(), vec![(200, Cue::Promotion), (5600, Cue::Checkmate)]);
        assert!(sink.paints(sq("b6")).is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_black_checkmate_signal() {
        let mut session = session_at(BEFORE_QH5);
        play(&mut session, "d1", "h5");
        session
            .handle_envelope(&move_result("MAKE_MOVE", BLACK_MATED, 2, 2), ms(0))
            .unwrap();

        run_until(&mut session, 600);
        assert_eq!(session.sink().commits().len(), 1);
        assert!(session.is_busy());
        assert_eq!(session.click(sq("e7"), ms(600)), Intent::Busy);

        run_until(&mut session, 10_000);
        let frames = session.sink().paints(sq("e8"));
        assert_eq!(frames.len(), 9);
        assert_eq!(frames[0], (700, Tone::Alert));
        assert_eq!(frames[8], (3100, Tone::Base));
        assert_eq!(frames.iter().filter(|(_, t)| *t == Tone::Alert).count(), 4);
        let checkmates: Vec<_> = session
            .sink()
            .sounds()
            .into_iter()
            .filter(|(_, cue)| *cue == Cue::Checkmate)
            .collect();
        assert_eq!(checkmates, vec![(3100, Cue::Checkmate)]);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_error_envelope_changes_nothing() {
        let mut session = session_at(START_FEN);
        play(&mut session, "e2", "e4");
        session.sink.effects.clear();

        let failed = envelope(json!({
            "type": "MAKE_MOVE",
            "data": {"move_success": true, "position": AFTER_E4},
            "error": -1,
        }));
        let handled = session.handle_envelope(&failed, ms(0)).unwrap();
        assert!(matches!(handled, Handled::Dropped));
        assert!(session.sink().effects.is_empty());
        assert_eq!(session.store().snapshot().map(|s| s.as_str()), Some(START_FEN));
        assert!(session.store().pending().is_some());
    }

    #[test]
    fn test_rejected_move_reopens_gate() {
        let mut session = session_at(START_FEN);
        play(&mut session, "e2", "e5");
        let handled = session
            .handle_envelope(
                &envelope(json!({"type": "MAKE_MOVE", "data": {"move_success": false}})),
                ms(0),
            )
            .unwrap();
        assert!(matches!(handled, Handled::Rejected));
        assert!(session.store().pending().is_none());
        assert!(!session.is_busy());
        assert_eq!(session.click(sq("e2"), ms(10)), Intent::Select(sq("e2")));
    }

    #[test]
    fn test_malformed_snapshot_is_fatal() {
        let mut session = session_at(START_FEN);
        play(&mut session, "e2", "e4");
        session.sink.effects.clear();

        let result = session.handle_envelope(&move_result("MAKE_MOVE", "8/8/8 w", 2, 0), ms(0));
        assert!(matches!(result, Err(SessionError::Snapshot(_))));
        assert!(session.sink().effects.is_empty());
        assert_eq!(session.store().snapshot().map(|s| s.as_str()), Some(START_FEN));

        let missing = envelope(json!({"type": "INIT", "data": {}}));
        assert!(session.handle_envelope(&missing, ms(0)).is_err());
    }

    #[test]
    fn test_missing_anchor_commits_directly() {
        let mut session = session_at(START_FEN);
        let handled = session
            .handle_envelope(&move_result("MAKE_MOVE", AFTER_E4, 2, 0), ms(0))
            .unwrap();
        assert!(matches!(handled, Handled::Committed));
        assert_eq!(session.sink().commits().len(), 1);
        assert!(session.sink().slides().is_empty());
    }

    #[test]
    fn test_hints_and_stale_hints() {
        let mut session = session_at(START_FEN);
        session.click(sq("e2"), ms(0));
        let hints = envelope(json!({
            "type": "POSSIBLE_MOVES",
            "data": {"possible_moves": ["e3", "e4"]},
        }));
        assert!(matches!(session.handle_envelope(&hints, ms(0)).unwrap(), Handled::Applied));
        assert_eq!(session.store().hints(), &[sq("e3"), sq("e4")]);

        session.click(sq("e2"), ms(10));
        assert!(matches!(session.handle_envelope(&hints, ms(20)).unwrap(), Handled::Ignored));
        assert!(session.store().hints().is_empty());
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let mut session = session_at(START_FEN);
        let handled = session
            .handle_envelope(&envelope(json!({"type": "UNDO", "data": {}})), ms(0))
            .unwrap();
        assert!(matches!(handled, Handled::Ignored));
    }

    #[test]
    fn test_start_sends_handshake() {
        let session = session_at(START_FEN);
        assert_eq!(session.requests().sent[..2], [Request::Init, Request::Config]);
    }
}
