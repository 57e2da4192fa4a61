//! The cooperative session state machine.
//!
//! Each participant runs its own [`CoopSession`]: a single-threaded,
//! event-driven copy of the shared session logic. A local action (join,
//! start, drag, timer tick) reads the current [`SessionSnapshot`], computes a
//! successor, publishes it through the sync channel and only then adopts it.
//! Remote snapshots arriving through [`CoopSession::pump`] replace the local
//! view wholesale: last write wins, no merging.
//!
//! Ledger side effects (streak increment on win, streak reset on expiry)
//! fire exactly once per game generation, inside the transition that caused
//! them, never on snapshot replay. The `generation` counter in the snapshot
//! is the fencing token that keeps a resurrected stale snapshot from
//! re-triggering them.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::board::{classic_fallback, Puzzle};
use crate::channel::SnapshotChannel;
use crate::codec;
use crate::error::BlockpartyError;
use crate::event_drain::EventDrain;
use crate::generator::{GenerateError, PuzzleSeed, PuzzleSource};
use crate::ledger::{MemoryLedger, StreakLedger};
use crate::resolver;
use crate::snapshot::SessionSnapshot;
use crate::{
    BlockpartyEvent, PieceId, PlayerId, SessionPhase, Timestamp, GAME_DURATION, MAX_PLAYERS,
};

/// Default maximum number of events to queue before oldest are dropped.
///
/// This prevents unbounded memory growth if events aren't being consumed.
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100;

/// The [`SessionBuilder`] configures and creates a [`CoopSession`].
///
/// ```
/// use blockparty::{LocalBroadcastHub, MemoryLedger, SessionBuilder};
///
/// let hub = LocalBroadcastHub::new();
/// let session = SessionBuilder::new()
///     .with_ledger(MemoryLedger::new())
///     .start_session(hub.participant());
/// ```
#[must_use = "SessionBuilder must be consumed by calling start_session"]
pub struct SessionBuilder {
    ledger: Box<dyn StreakLedger>,
    event_queue_capacity: usize,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            ledger: _,
            event_queue_capacity,
        } = self;

        f.debug_struct("SessionBuilder")
            .field("event_queue_capacity", event_queue_capacity)
            .finish()
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Construct a new builder with all values set to their defaults.
    pub fn new() -> Self {
        Self {
            ledger: Box::new(MemoryLedger::new()),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }

    /// Sets the streak ledger the session reports win/loss outcomes to.
    ///
    /// Defaults to an in-process [`MemoryLedger`].
    pub fn with_ledger(mut self, ledger: impl StreakLedger + 'static) -> Self {
        self.ledger = Box::new(ledger);
        self
    }

    /// Sets the bound on the internal event queue. Oldest events are dropped
    /// past this size. Clamped to at least 1.
    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }

    /// Consumes the builder and creates a session connected to `channel`,
    /// seeded with a fresh lobby snapshot.
    pub fn start_session(self, channel: impl SnapshotChannel + 'static) -> CoopSession {
        CoopSession {
            snapshot: SessionSnapshot::lobby(),
            channel: Box::new(channel),
            ledger: self.ledger,
            event_queue: VecDeque::new(),
            event_queue_capacity: self.event_queue_capacity,
            pending_start: None,
            settled_generation: None,
        }
    }
}

/// One participant's copy of the collaborative session engine.
///
/// See the [module documentation](self) for the replication model.
pub struct CoopSession {
    /// The participant's current view of the shared session.
    snapshot: SessionSnapshot,
    /// The session uses this channel to broadcast and receive snapshot
    /// frames.
    channel: Box<dyn SnapshotChannel>,
    /// External per-player streak store.
    ledger: Box<dyn StreakLedger>,
    /// Contains all events to be forwarded to the user.
    event_queue: VecDeque<BlockpartyEvent>,
    event_queue_capacity: usize,
    /// Seed of the start that is awaiting the puzzle generator, if any.
    /// While set, every other local transition is rejected.
    pending_start: Option<PuzzleSeed>,
    /// The game generation whose outcome has already been reported to the
    /// ledger. Guards against double-crediting a win (or double-resetting)
    /// when a stale snapshot resurrects an already-settled game.
    settled_generation: Option<u64>,
}

impl std::fmt::Debug for CoopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            snapshot,
            channel: _,
            ledger: _,
            event_queue,
            event_queue_capacity,
            pending_start,
            settled_generation,
        } = self;

        f.debug_struct("CoopSession")
            .field("snapshot", snapshot)
            .field("queued_events", &event_queue.len())
            .field("event_queue_capacity", event_queue_capacity)
            .field("pending_start", pending_start)
            .field("settled_generation", settled_generation)
            .finish()
    }
}

impl CoopSession {
    // ###############
    // # ACCESSORS   #
    // ###############

    /// The current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.snapshot.phase
    }

    /// The current team roster.
    #[must_use]
    pub fn team(&self) -> &[PlayerId] {
        &self.snapshot.team
    }

    /// The puzzle in play, if any.
    #[must_use]
    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.snapshot.puzzle.as_ref()
    }

    /// True while a game start awaits the puzzle generator.
    #[must_use]
    pub fn start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Reads a player's current streak from the ledger.
    #[must_use]
    pub fn streak(&self, player: &PlayerId) -> u32 {
        self.ledger.get(player)
    }

    /// Drains all queued events.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }

    // ###############
    // # TRANSITIONS #
    // ###############

    /// Adds `player` to the team. Valid only in the lobby.
    ///
    /// The player is upserted into the streak ledger so a record exists
    /// before their first game resolves.
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartPending`] while a start is in flight.
    /// - [`BlockpartyError::NotInLobby`] outside the lobby phase.
    /// - [`BlockpartyError::AlreadyOnTeam`] on duplicate joins.
    /// - [`BlockpartyError::TeamFull`] past [`MAX_PLAYERS`].
    pub fn join_team(&mut self, player: PlayerId) -> Result<(), BlockpartyError> {
        self.reject_if_pending()?;
        if self.snapshot.phase != SessionPhase::Lobby {
            return Err(BlockpartyError::NotInLobby {
                phase: self.snapshot.phase,
            });
        }
        if self.snapshot.contains(&player) {
            return Err(BlockpartyError::AlreadyOnTeam { player });
        }
        if self.snapshot.team.len() >= MAX_PLAYERS {
            return Err(BlockpartyError::TeamFull { max: MAX_PLAYERS });
        }

        let mut next = self.snapshot.clone();
        next.team.push(player.clone());
        next.revision += 1;
        self.commit(next)?;
        self.ledger.upsert(&player);
        let size = self.snapshot.team.len();
        self.push_event(BlockpartyEvent::TeamChanged { size });
        debug!(player = %player, size, "player joined team");
        Ok(())
    }

    /// Removes `player` from the team. Valid only in the lobby.
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartPending`] while a start is in flight.
    /// - [`BlockpartyError::NotInLobby`] outside the lobby phase.
    /// - [`BlockpartyError::NotOnTeam`] for unknown players.
    pub fn leave_team(&mut self, player: &PlayerId) -> Result<(), BlockpartyError> {
        self.reject_if_pending()?;
        if self.snapshot.phase != SessionPhase::Lobby {
            return Err(BlockpartyError::NotInLobby {
                phase: self.snapshot.phase,
            });
        }
        if !self.snapshot.contains(player) {
            return Err(BlockpartyError::NotOnTeam {
                player: player.clone(),
            });
        }

        let mut next = self.snapshot.clone();
        next.team.retain(|p| p != player);
        next.revision += 1;
        self.commit(next)?;
        let size = self.snapshot.team.len();
        self.push_event(BlockpartyEvent::TeamChanged { size });
        debug!(player = %player, size, "player left team");
        Ok(())
    }

    /// Marks a game start as in flight while the external puzzle generator
    /// runs.
    ///
    /// This is the suspension point of the engine: between `begin_start` and
    /// [`complete_start`] every other local transition is rejected with
    /// [`BlockpartyError::StartPending`], so timer ticks and user actions
    /// racing the generator are well-defined. Remote snapshots are still
    /// delivered through [`pump`].
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartPending`] when a start is already in flight.
    /// - [`BlockpartyError::NotInLobby`] outside the lobby phase.
    /// - [`BlockpartyError::TeamSize`] when the team is outside the
    ///   startable band.
    ///
    /// [`complete_start`]: Self::complete_start
    /// [`pump`]: Self::pump
    pub fn begin_start(&mut self, seed: PuzzleSeed) -> Result<(), BlockpartyError> {
        self.reject_if_pending()?;
        if self.snapshot.phase != SessionPhase::Lobby {
            return Err(BlockpartyError::NotInLobby {
                phase: self.snapshot.phase,
            });
        }
        if !self.snapshot.team_is_startable() {
            return Err(BlockpartyError::TeamSize {
                size: self.snapshot.team.len(),
            });
        }
        self.pending_start = Some(seed);
        trace!(%seed, "game start awaiting puzzle generation");
        Ok(())
    }

    /// Completes an in-flight game start with the generator's outcome.
    ///
    /// A failed generation (or a generated layout that violates the board
    /// invariants) falls back to the canned classic layout; generation
    /// failure never strands the session and is never surfaced as an error.
    /// Records `started_at = now` once, bumps the game generation and
    /// transitions to playing.
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartNotPending`] with no start in flight.
    /// - [`BlockpartyError::NotInLobby`] when a remote participant replaced
    ///   the session out of the lobby while the generator ran; the pending
    ///   start is abandoned.
    pub fn complete_start(
        &mut self,
        outcome: Result<Puzzle, GenerateError>,
        now: Timestamp,
    ) -> Result<(), BlockpartyError> {
        let seed = self
            .pending_start
            .take()
            .ok_or(BlockpartyError::StartNotPending)?;
        if self.snapshot.phase != SessionPhase::Lobby {
            debug!(%seed, phase = ?self.snapshot.phase, "abandoning pending start, session left the lobby");
            return Err(BlockpartyError::NotInLobby {
                phase: self.snapshot.phase,
            });
        }

        let puzzle = match outcome {
            Ok(generated) => match generated.validate() {
                Ok(()) => generated,
                Err(error) => {
                    warn!(%seed, %error, "generated puzzle violates board invariants, using fallback layout");
                    classic_fallback()
                }
            },
            Err(error) => {
                warn!(%seed, %error, "puzzle generation failed, using fallback layout");
                classic_fallback()
            }
        };

        let mut next = self.snapshot.clone();
        next.phase = SessionPhase::Playing;
        next.puzzle = Some(puzzle);
        next.started_at = Some(now);
        next.generation += 1;
        next.revision += 1;
        self.commit(next)?;
        self.push_event(BlockpartyEvent::PhaseChanged {
            from: SessionPhase::Lobby,
            to: SessionPhase::Playing,
        });
        debug!(
            generation = self.snapshot.generation,
            team_size = self.snapshot.team.len(),
            "game started"
        );
        Ok(())
    }

    /// Starts a game by driving the generator synchronously: [`begin_start`],
    /// one `source.request(...)` call, [`complete_start`].
    ///
    /// The seed is derived from the calendar date of `now`, so every lobby
    /// starting on the same day plays the same board.
    ///
    /// # Errors
    ///
    /// Whatever [`begin_start`] or [`complete_start`] reject with. Generator
    /// failure is not an error; it falls back to the canned layout.
    ///
    /// [`begin_start`]: Self::begin_start
    /// [`complete_start`]: Self::complete_start
    pub fn start_game(
        &mut self,
        source: &mut dyn PuzzleSource,
        now: Timestamp,
    ) -> Result<(), BlockpartyError> {
        let seed = PuzzleSeed::for_date(now);
        self.begin_start(seed)?;
        let outcome = source.request(seed);
        self.complete_start(outcome, now)
    }

    /// Applies a drag gesture to a piece. Valid only while playing.
    ///
    /// Delegates to the move resolver; a gesture that resolves to the start
    /// position is a successful no-op (nothing is published and the caller
    /// should visually restore the piece). A move that solves the puzzle
    /// transitions to won **in the same snapshot** (no intermediate
    /// "still playing" state is ever observable) and increments every team
    /// member's streak, once per game generation.
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartPending`] while a start is in flight.
    /// - [`BlockpartyError::NotPlaying`] outside the playing phase (in
    ///   particular, once won: win is monotonic until reset).
    /// - [`BlockpartyError::UnknownPiece`] for ids not in the puzzle.
    pub fn apply_move(
        &mut self,
        piece: PieceId,
        dx: f32,
        dy: f32,
    ) -> Result<(), BlockpartyError> {
        self.reject_if_pending()?;
        if self.snapshot.phase != SessionPhase::Playing {
            return Err(BlockpartyError::NotPlaying {
                phase: self.snapshot.phase,
            });
        }
        let Some(puzzle) = self.snapshot.puzzle.as_ref() else {
            warn!("playing phase without a puzzle, rejecting move");
            return Err(BlockpartyError::NotPlaying {
                phase: self.snapshot.phase,
            });
        };
        let Some(dragged) = puzzle.piece(piece).copied() else {
            return Err(BlockpartyError::UnknownPiece { piece });
        };

        let (x, y) = resolver::resolve_drag(puzzle, &dragged, dx, dy);
        if (x, y) == (dragged.x, dragged.y) {
            trace!(piece = %piece, "drag resolved to a no-op");
            return Ok(());
        }

        let mut next = self.snapshot.clone();
        let mut solved = false;
        if let Some(next_puzzle) = next.puzzle.as_mut() {
            for p in &mut next_puzzle.pieces {
                if p.id == piece {
                    p.x = x;
                    p.y = y;
                }
            }
            solved = next_puzzle.is_solved();
        }
        if solved {
            next.phase = SessionPhase::Won;
        }
        next.revision += 1;
        self.commit(next)?;

        self.push_event(BlockpartyEvent::MoveApplied { piece, x, y });
        trace!(piece = %piece, x, y, "move applied");
        if solved {
            self.push_event(BlockpartyEvent::PhaseChanged {
                from: SessionPhase::Playing,
                to: SessionPhase::Won,
            });
            self.settle_won();
        }
        Ok(())
    }

    /// Expires the game once the clock has run out.
    ///
    /// Only transitions when the session is playing **and** the elapsed
    /// wall-clock time since the published `started_at` has reached
    /// [`GAME_DURATION`]; in every other case this is an idempotent no-op,
    /// which makes duplicate timer firings across participants harmless.
    /// On expiry every team member's streak is reset, once per game
    /// generation.
    ///
    /// # Errors
    ///
    /// Only [`BlockpartyError::SerializationFailed`] from the publish path;
    /// guard misses are no-ops, not errors.
    pub fn time_expire(&mut self, now: Timestamp) -> Result<(), BlockpartyError> {
        if self.pending_start.is_some() {
            return Ok(());
        }
        if self.snapshot.phase != SessionPhase::Playing {
            trace!(phase = ?self.snapshot.phase, "expiry check outside playing is a no-op");
            return Ok(());
        }
        let Some(started_at) = self.snapshot.started_at else {
            warn!("playing phase without a start time, skipping expiry check");
            return Ok(());
        };
        if now.saturating_duration_since(started_at) < GAME_DURATION {
            return Ok(());
        }

        let mut next = self.snapshot.clone();
        next.phase = SessionPhase::Expired;
        next.puzzle = None;
        next.started_at = None;
        next.revision += 1;
        self.commit(next)?;
        self.push_event(BlockpartyEvent::PhaseChanged {
            from: SessionPhase::Playing,
            to: SessionPhase::Expired,
        });
        self.settle_expired();
        debug!(generation = self.snapshot.generation, "game expired");
        Ok(())
    }

    /// The ≈1 Hz local timer hook.
    ///
    /// Detects time expiry locally and forwards to [`time_expire`]; the
    /// authoritative timeline is still the published `started_at`, so every
    /// participant's timer converges on the same deadline.
    ///
    /// # Errors
    ///
    /// See [`time_expire`].
    ///
    /// [`time_expire`]: Self::time_expire
    pub fn tick(&mut self, now: Timestamp) -> Result<(), BlockpartyError> {
        self.time_expire(now)
    }

    /// Returns the session to a fresh lobby after a finished game.
    ///
    /// Clears the team, puzzle and start time. Valid from won or expired;
    /// idempotent from the lobby. The game generation carries over so the
    /// fencing token stays monotonic across games.
    ///
    /// # Errors
    ///
    /// - [`BlockpartyError::StartPending`] while a start is in flight.
    /// - [`BlockpartyError::NotFinished`] while a game is still playing.
    pub fn reset_to_lobby(&mut self) -> Result<(), BlockpartyError> {
        self.reject_if_pending()?;
        match self.snapshot.phase {
            SessionPhase::Lobby => Ok(()),
            SessionPhase::Playing => Err(BlockpartyError::NotFinished {
                phase: self.snapshot.phase,
            }),
            SessionPhase::Won | SessionPhase::Expired => {
                let from = self.snapshot.phase;
                let mut next = SessionSnapshot::lobby();
                next.generation = self.snapshot.generation;
                next.revision = self.snapshot.revision + 1;
                self.commit(next)?;
                self.push_event(BlockpartyEvent::PhaseChanged {
                    from,
                    to: SessionPhase::Lobby,
                });
                debug!("session reset to lobby");
                Ok(())
            }
        }
    }

    // ###############
    // # REPLICATION #
    // ###############

    /// Drains the sync channel and applies every delivered snapshot.
    ///
    /// Each well-formed frame replaces the local view verbatim (last write
    /// wins, no merge). Malformed frames are logged and skipped. Returns the
    /// number of snapshots applied.
    ///
    /// A frame identical to the current snapshot (typically this
    /// participant's own publish echoing back) is applied silently, without
    /// events.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        for frame in self.channel.drain() {
            match codec::decode::<SessionSnapshot>(&frame) {
                Ok(incoming) => {
                    applied += 1;
                    if incoming == self.snapshot {
                        continue;
                    }
                    let from = self.snapshot.phase;
                    let (generation, revision) = (incoming.generation, incoming.revision);
                    let to = incoming.phase;
                    self.snapshot = incoming;
                    if to != from {
                        self.push_event(BlockpartyEvent::PhaseChanged { from, to });
                    }
                    self.push_event(BlockpartyEvent::SnapshotReplaced {
                        generation,
                        revision,
                    });
                    trace!(generation, revision, "snapshot replaced from channel");
                }
                Err(error) => {
                    warn!(%error, bytes = frame.len(), "discarding malformed snapshot frame");
                }
            }
        }
        applied
    }

    /// Adopts a previously stored snapshot frame, e.g. on reconnect.
    ///
    /// A missing or unreadable frame is treated as "no session yet": the
    /// session re-initializes to a fresh lobby snapshot instead of failing.
    /// Any in-flight start is abandoned.
    pub fn hydrate(&mut self, frame: Option<&[u8]>) {
        self.pending_start = None;
        match frame {
            Some(bytes) => match codec::decode::<SessionSnapshot>(bytes) {
                Ok(snapshot) => {
                    debug!(
                        generation = snapshot.generation,
                        revision = snapshot.revision,
                        "hydrated session from stored snapshot"
                    );
                    self.snapshot = snapshot;
                }
                Err(error) => {
                    warn!(%error, "stored snapshot unreadable, reinitializing to a fresh lobby");
                    self.snapshot = SessionSnapshot::lobby();
                }
            },
            None => {
                debug!("no stored snapshot, seeding a fresh lobby");
                self.snapshot = SessionSnapshot::lobby();
            }
        }
    }

    // ###############
    // # INTERNALS   #
    // ###############

    fn reject_if_pending(&self) -> Result<(), BlockpartyError> {
        if self.pending_start.is_some() {
            return Err(BlockpartyError::StartPending);
        }
        Ok(())
    }

    /// Publishes `next` and adopts it. Encode happens before the swap: a
    /// serialization failure leaves the session on its previous snapshot.
    fn commit(&mut self, next: SessionSnapshot) -> Result<(), BlockpartyError> {
        debug_assert!(next.is_consistent());
        let frame = codec::encode(&next)?;
        self.channel.publish(&frame);
        self.snapshot = next;
        Ok(())
    }

    /// Credits the current team's win, once per game generation.
    fn settle_won(&mut self) {
        let generation = self.snapshot.generation;
        if self.settled_generation == Some(generation) {
            debug!(generation, "win already settled for this generation, skipping streak award");
            return;
        }
        self.ledger.increment_all(&self.snapshot.team);
        self.settled_generation = Some(generation);
        debug!(
            generation,
            team_size = self.snapshot.team.len(),
            "team streaks incremented"
        );
    }

    /// Applies the current team's expiry penalty, once per game generation.
    fn settle_expired(&mut self) {
        let generation = self.snapshot.generation;
        if self.settled_generation == Some(generation) {
            debug!(generation, "outcome already settled for this generation, skipping streak reset");
            return;
        }
        self.ledger.reset_all(&self.snapshot.team);
        self.settled_generation = Some(generation);
        debug!(
            generation,
            team_size = self.snapshot.team.len(),
            "team streaks reset"
        );
    }

    fn push_event(&mut self, event: BlockpartyEvent) {
        if self.event_queue.len() >= self.event_queue_capacity {
            self.event_queue.pop_front();
        }
        self.event_queue.push_back(event);
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::channel::LocalBroadcastHub;
    use crate::generator::FallbackSource;

    fn lobby_session() -> CoopSession {
        let hub = LocalBroadcastHub::new();
        SessionBuilder::new().start_session(hub.participant())
    }

    fn session_with_team(n: usize) -> CoopSession {
        let mut session = lobby_session();
        for i in 0..n {
            session.join_team(PlayerId::new(format!("p{i}"))).unwrap();
        }
        session
    }

    #[test]
    fn fresh_session_sits_in_an_empty_lobby() {
        let session = lobby_session();
        assert_eq!(session.phase(), SessionPhase::Lobby);
        assert!(session.team().is_empty());
        assert!(session.puzzle().is_none());
        assert!(!session.start_pending());
    }

    #[test]
    fn duplicate_join_is_rejected_without_mutation() {
        let mut session = lobby_session();
        let alice = PlayerId::new("alice");
        session.join_team(alice.clone()).unwrap();
        assert_eq!(
            session.join_team(alice.clone()),
            Err(BlockpartyError::AlreadyOnTeam { player: alice })
        );
        assert_eq!(session.team().len(), 1);
    }

    #[test]
    fn sixth_join_is_rejected() {
        let mut session = session_with_team(5);
        assert_eq!(
            session.join_team(PlayerId::new("overflow")),
            Err(BlockpartyError::TeamFull { max: MAX_PLAYERS })
        );
        assert_eq!(session.team().len(), 5);
    }

    #[test]
    fn leave_of_unknown_player_is_rejected() {
        let mut session = session_with_team(3);
        let ghost = PlayerId::new("ghost");
        assert_eq!(
            session.leave_team(&ghost),
            Err(BlockpartyError::NotOnTeam { player: ghost })
        );
        assert_eq!(session.team().len(), 3);
    }

    #[test]
    fn start_requires_a_legal_team_size() {
        let mut session = session_with_team(2);
        let mut source = FallbackSource;
        assert_eq!(
            session.start_game(&mut source, Timestamp::from_millis(0)),
            Err(BlockpartyError::TeamSize { size: 2 })
        );
        assert_eq!(session.phase(), SessionPhase::Lobby);
    }

    #[test]
    fn pending_start_blocks_local_transitions() {
        let mut session = session_with_team(3);
        session.begin_start(PuzzleSeed::new(1)).unwrap();

        assert_eq!(
            session.join_team(PlayerId::new("late")),
            Err(BlockpartyError::StartPending)
        );
        assert_eq!(
            session.apply_move(PieceId::new(1), 1.0, 0.0),
            Err(BlockpartyError::StartPending)
        );
        assert_eq!(
            session.begin_start(PuzzleSeed::new(2)),
            Err(BlockpartyError::StartPending)
        );
        assert_eq!(session.reset_to_lobby(), Err(BlockpartyError::StartPending));

        session
            .complete_start(Ok(classic_fallback()), Timestamp::from_millis(10))
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert!(!session.start_pending());
    }

    #[test]
    fn complete_without_begin_is_rejected() {
        let mut session = session_with_team(3);
        assert_eq!(
            session.complete_start(Ok(classic_fallback()), Timestamp::from_millis(0)),
            Err(BlockpartyError::StartNotPending)
        );
    }

    #[test]
    fn generation_failure_falls_back_to_the_classic_layout() {
        let mut session = session_with_team(3);
        session.begin_start(PuzzleSeed::new(1)).unwrap();
        session
            .complete_start(
                Err(GenerateError::new("generator offline")),
                Timestamp::from_millis(0),
            )
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.puzzle(), Some(&classic_fallback()));
    }

    #[test]
    fn invalid_generated_layout_falls_back_too() {
        let mut session = session_with_team(3);
        let broken = Puzzle {
            width: 2,
            height: 2,
            pieces: vec![
                crate::board::BoardPiece::new(PieceId::new(1), 0, 0, 2, 2, true),
                crate::board::BoardPiece::new(PieceId::new(2), 1, 1, 1, 1, false),
            ],
            goal: (0, 0),
        };
        session.begin_start(PuzzleSeed::new(1)).unwrap();
        session
            .complete_start(Ok(broken), Timestamp::from_millis(0))
            .unwrap();
        assert_eq!(session.puzzle(), Some(&classic_fallback()));
    }

    #[test]
    fn start_records_time_and_bumps_generation() {
        let mut session = session_with_team(4);
        let mut source = FallbackSource;
        let now = Timestamp::from_millis(1_700_000_000_000);
        session.start_game(&mut source, now).unwrap();
        assert_eq!(session.snapshot().started_at, Some(now));
        assert_eq!(session.snapshot().generation, 1);
        assert!(session.snapshot().is_consistent());
    }

    #[test]
    fn event_queue_is_bounded_and_drops_oldest() {
        let hub = LocalBroadcastHub::new();
        let mut session = SessionBuilder::new()
            .with_event_queue_capacity(3)
            .start_session(hub.participant());

        for i in 0..5 {
            session.join_team(PlayerId::new(format!("p{i}"))).unwrap();
        }
        let events: Vec<_> = session.events().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], BlockpartyEvent::TeamChanged { size: 3 });
        assert_eq!(events[2], BlockpartyEvent::TeamChanged { size: 5 });
    }

    #[test]
    fn reset_is_idempotent_from_the_lobby() {
        let mut session = lobby_session();
        assert_eq!(session.reset_to_lobby(), Ok(()));
        assert_eq!(session.phase(), SessionPhase::Lobby);
    }

    #[test]
    fn reset_is_rejected_mid_game() {
        let mut session = session_with_team(3);
        let mut source = FallbackSource;
        session
            .start_game(&mut source, Timestamp::from_millis(0))
            .unwrap();
        assert_eq!(
            session.reset_to_lobby(),
            Err(BlockpartyError::NotFinished {
                phase: SessionPhase::Playing
            })
        );
    }

    #[test]
    fn premature_expiry_is_a_no_op() {
        let mut session = session_with_team(3);
        let mut source = FallbackSource;
        let start = Timestamp::from_millis(0);
        session.start_game(&mut source, start).unwrap();

        let early = Timestamp::from_millis(GAME_DURATION.as_millis() as u64 - 1);
        session.time_expire(early).unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);

        let due = Timestamp::from_millis(GAME_DURATION.as_millis() as u64);
        session.time_expire(due).unwrap();
        assert_eq!(session.phase(), SessionPhase::Expired);
        assert!(session.snapshot().is_consistent());
    }
}
