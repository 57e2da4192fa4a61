mod stubs;

use blockparty::{
    classic_fallback, BlockpartyError, BlockpartyEvent, FallbackSource, GenerateError,
    LocalBroadcastHub, PieceId, PlayerId, SessionBuilder, SessionPhase, Timestamp, GAME_DURATION,
};
use stubs::{one_move_puzzle, team_of, RecordingLedger, ScriptedSource};

fn millis(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn hour_later(start: Timestamp) -> Timestamp {
    Timestamp::from_millis(start.as_millis() + GAME_DURATION.as_millis() as u64)
}

#[test]
fn lobby_to_playing_to_won_credits_every_streak() {
    stubs::init_test_tracing();
    let hub = LocalBroadcastHub::new();
    let ledger = RecordingLedger::new();
    let mut session = SessionBuilder::new()
        .with_ledger(ledger.handle())
        .start_session(hub.participant());

    let team = team_of(3);
    for player in &team {
        session.join_team(player.clone()).unwrap();
    }
    assert_eq!(session.phase(), SessionPhase::Lobby);

    let mut source = ScriptedSource::new().then(Ok(one_move_puzzle()));
    session.start_game(&mut source, millis(1_000)).unwrap();
    assert_eq!(session.phase(), SessionPhase::Playing);

    // Drag the goal piece three cells down onto the goal cell.
    session.apply_move(PieceId::new(1), 0.2, 3.4).unwrap();
    assert_eq!(session.phase(), SessionPhase::Won);

    for player in &team {
        assert_eq!(ledger.streak(player), 1, "streak for {player}");
    }
    assert_eq!(ledger.increment_calls(), 1);

    let events: Vec<_> = session.events().collect();
    assert!(events.contains(&BlockpartyEvent::PhaseChanged {
        from: SessionPhase::Lobby,
        to: SessionPhase::Playing,
    }));
    assert!(events.contains(&BlockpartyEvent::MoveApplied {
        piece: PieceId::new(1),
        x: 1,
        y: 3,
    }));
    assert!(events.contains(&BlockpartyEvent::PhaseChanged {
        from: SessionPhase::Playing,
        to: SessionPhase::Won,
    }));
}

#[test]
fn winning_move_lands_as_a_single_snapshot() {
    // The winning move must never be observable as a separate "still
    // playing" snapshot: a peer draining the channel sees the move and the
    // won phase in the same frame.
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    let mut observer = SessionBuilder::new().start_session(hub.participant());

    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    let mut source = ScriptedSource::new().then(Ok(one_move_puzzle()));
    session.start_game(&mut source, millis(0)).unwrap();
    observer.pump();
    assert_eq!(observer.phase(), SessionPhase::Playing);

    session.apply_move(PieceId::new(1), 0.0, 3.0).unwrap();
    assert_eq!(observer.pump(), 1, "move and win arrive as one frame");
    assert_eq!(observer.phase(), SessionPhase::Won);
    let goal = observer.puzzle().unwrap().goal_piece().unwrap();
    assert_eq!((goal.x, goal.y), (1, 3));
}

#[test]
fn undersized_team_cannot_start() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    for player in team_of(2) {
        session.join_team(player).unwrap();
    }
    assert_eq!(
        session.start_game(&mut FallbackSource, millis(0)),
        Err(BlockpartyError::TeamSize { size: 2 })
    );
    assert_eq!(session.phase(), SessionPhase::Lobby);
    assert!(session.puzzle().is_none());
}

#[test]
fn expiry_resets_every_streak() {
    let hub = LocalBroadcastHub::new();
    let ledger = RecordingLedger::new();
    let mut session = SessionBuilder::new()
        .with_ledger(ledger.handle())
        .start_session(hub.participant());

    let team = team_of(4);
    for player in &team {
        session.join_team(player.clone()).unwrap();
    }

    // Bank a win first so the reset is observable.
    let mut source = ScriptedSource::new()
        .then(Ok(one_move_puzzle()))
        .then(Ok(classic_fallback()));
    session.start_game(&mut source, millis(0)).unwrap();
    session.apply_move(PieceId::new(1), 0.0, 3.0).unwrap();
    session.reset_to_lobby().unwrap();
    for player in &team {
        session.join_team(player.clone()).unwrap();
    }
    for player in &team {
        assert_eq!(ledger.streak(player), 1);
    }

    let start = millis(10_000);
    session.start_game(&mut source, start).unwrap();
    assert_eq!(session.phase(), SessionPhase::Playing);

    // An hour passes without a solve.
    session.tick(hour_later(start)).unwrap();
    assert_eq!(session.phase(), SessionPhase::Expired);
    for player in &team {
        assert_eq!(ledger.streak(player), 0);
    }
    assert_eq!(ledger.reset_calls(), 1);
    assert!(session.puzzle().is_none());
    assert!(session.snapshot().started_at.is_none());
}

#[test]
fn expiry_is_idempotent_and_resets_the_ledger_once() {
    let hub = LocalBroadcastHub::new();
    let ledger = RecordingLedger::new();
    let mut session = SessionBuilder::new()
        .with_ledger(ledger.handle())
        .start_session(hub.participant());

    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    let start = millis(0);
    session.start_game(&mut FallbackSource, start).unwrap();

    let due = hour_later(start);
    session.time_expire(due).unwrap();
    assert_eq!(session.phase(), SessionPhase::Expired);

    // Duplicate timer firings are no-ops.
    session.time_expire(due).unwrap();
    session.time_expire(hour_later(due)).unwrap();
    assert_eq!(session.phase(), SessionPhase::Expired);
    assert_eq!(ledger.reset_calls(), 1);
}

#[test]
fn win_is_monotonic_until_reset() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    let mut source = ScriptedSource::new().then(Ok(one_move_puzzle()));
    session.start_game(&mut source, millis(0)).unwrap();
    session.apply_move(PieceId::new(1), 0.0, 3.0).unwrap();
    assert_eq!(session.phase(), SessionPhase::Won);

    assert_eq!(
        session.apply_move(PieceId::new(1), 0.0, -1.0),
        Err(BlockpartyError::NotPlaying {
            phase: SessionPhase::Won
        })
    );
    assert_eq!(session.phase(), SessionPhase::Won);

    session.reset_to_lobby().unwrap();
    assert_eq!(session.phase(), SessionPhase::Lobby);
    assert!(session.team().is_empty());
}

#[test]
fn expiry_timer_cannot_fire_after_a_win() {
    let hub = LocalBroadcastHub::new();
    let ledger = RecordingLedger::new();
    let mut session = SessionBuilder::new()
        .with_ledger(ledger.handle())
        .start_session(hub.participant());

    let team = team_of(3);
    for player in &team {
        session.join_team(player.clone()).unwrap();
    }
    let start = millis(0);
    let mut source = ScriptedSource::new().then(Ok(one_move_puzzle()));
    session.start_game(&mut source, start).unwrap();
    session.apply_move(PieceId::new(1), 0.0, 3.0).unwrap();

    // A stale local timer fires an hour later; the won outcome stands.
    session.tick(hour_later(start)).unwrap();
    assert_eq!(session.phase(), SessionPhase::Won);
    assert_eq!(ledger.reset_calls(), 0);
    for player in &team {
        assert_eq!(ledger.streak(player), 1);
    }
}

#[test]
fn blocked_drag_travels_only_the_free_corridor() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    // Classic layout: the single at (1, 3) has exactly one free cell below.
    session
        .start_game(&mut FallbackSource, millis(0))
        .unwrap();
    session.apply_move(PieceId::new(7), 0.0, 3.0).unwrap();
    let piece = session.puzzle().unwrap().piece(PieceId::new(7)).unwrap();
    assert_eq!((piece.x, piece.y), (1, 4));
}

#[test]
fn noop_drag_publishes_nothing() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    let mut observer = SessionBuilder::new().start_session(hub.participant());

    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    session
        .start_game(&mut FallbackSource, millis(0))
        .unwrap();
    observer.pump();
    let before = observer.snapshot().revision;

    // The goal piece is fully boxed in at game start; the gesture resolves
    // to its current position.
    session.apply_move(PieceId::new(1), 0.0, 2.0).unwrap();
    assert_eq!(observer.pump(), 0);
    assert_eq!(observer.snapshot().revision, before);
}

#[test]
fn generator_failure_is_recovered_with_the_fallback_layout() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    for player in team_of(3) {
        session.join_team(player).unwrap();
    }
    let mut source = ScriptedSource::new().then(Err(GenerateError::new("backend 503")));
    session.start_game(&mut source, millis(0)).unwrap();
    assert_eq!(session.phase(), SessionPhase::Playing);
    assert_eq!(session.puzzle(), Some(&classic_fallback()));
}

#[test]
fn join_team_upserts_into_the_ledger() {
    let hub = LocalBroadcastHub::new();
    let ledger = RecordingLedger::new();
    let mut session = SessionBuilder::new()
        .with_ledger(ledger.handle())
        .start_session(hub.participant());

    let alice = PlayerId::new("alice");
    session.join_team(alice.clone()).unwrap();
    assert_eq!(session.streak(&alice), 0);
    assert_eq!(ledger.streak(&alice), 0);
}

#[test]
fn leave_then_rejoin_keeps_the_roster_consistent() {
    let hub = LocalBroadcastHub::new();
    let mut session = SessionBuilder::new().start_session(hub.participant());
    let team = team_of(4);
    for player in &team {
        session.join_team(player.clone()).unwrap();
    }
    session.leave_team(&team[1]).unwrap();
    assert_eq!(session.team().len(), 3);
    assert!(!session.team().contains(&team[1]));

    session.join_team(team[1].clone()).unwrap();
    assert_eq!(session.team().len(), 4);
}
