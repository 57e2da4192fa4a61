//! The shared session aggregate that every participant replicates.
//!
//! A [`SessionSnapshot`] is only ever replaced wholesale: a transition reads
//! the current value, computes a successor and publishes it through the sync
//! channel. The broadcast channel's last-write-wins model depends on this
//! discipline; nothing patches a snapshot in place across the wire.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::board::Puzzle;
use crate::{PlayerId, SessionPhase, Timestamp, MAX_PLAYERS};

/// The team roster. Bounded by [`MAX_PLAYERS`], so it lives on the stack.
pub type TeamRoster = SmallVec<[PlayerId; MAX_PLAYERS]>;

/// One immutable published version of the shared session state.
///
/// # Invariants
///
/// - `puzzle` and `started_at` are both present iff `phase` is
///   [`SessionPhase::Playing`] or [`SessionPhase::Won`], and both absent
///   otherwise.
/// - `team` contains no duplicates and at most [`MAX_PLAYERS`] entries.
/// - `generation` increases by one on every game start and never decreases
///   within a single participant's causal chain; it fences ledger side
///   effects against resurrected stale snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Where the session is in its lifecycle.
    pub phase: SessionPhase,
    /// Ordered set of players committed to the current game.
    pub team: TeamRoster,
    /// The board in play. Present only while playing or won.
    pub puzzle: Option<Puzzle>,
    /// When the current game started. Recorded once at game start and
    /// immutable for that game instance.
    pub started_at: Option<Timestamp>,
    /// Game-instance counter, bumped on every successful start.
    pub generation: u64,
    /// Publisher-local monotonic counter, bumped on every transition.
    pub revision: u64,
}

impl SessionSnapshot {
    /// The seed snapshot: lobby phase, empty team, no puzzle, no clock.
    #[must_use]
    pub fn lobby() -> Self {
        Self {
            phase: SessionPhase::Lobby,
            team: SmallVec::new(),
            puzzle: None,
            started_at: None,
            generation: 0,
            revision: 0,
        }
    }

    /// True when `player` is on the team.
    #[must_use]
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.team.iter().any(|p| p == player)
    }

    /// True when the team size permits starting a game.
    #[must_use]
    pub fn team_is_startable(&self) -> bool {
        (crate::MIN_PLAYERS..=MAX_PLAYERS).contains(&self.team.len())
    }

    /// Checks the phase/payload presence invariant.
    ///
    /// `puzzle` and `started_at` must both be present in `Playing`/`Won` and
    /// both absent in `Lobby`/`Expired`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let in_game = matches!(self.phase, SessionPhase::Playing | SessionPhase::Won);
        self.puzzle.is_some() == in_game && self.started_at.is_some() == in_game
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::lobby()
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
    use crate::board::classic_fallback;

    #[test]
    fn lobby_seed_is_consistent() {
        let snapshot = SessionSnapshot::lobby();
        assert_eq!(snapshot.phase, SessionPhase::Lobby);
        assert!(snapshot.team.is_empty());
        assert!(snapshot.puzzle.is_none());
        assert!(snapshot.started_at.is_none());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn startable_band_is_three_to_five() {
        let mut snapshot = SessionSnapshot::lobby();
        for n in 1..=6 {
            snapshot.team.push(PlayerId::new(format!("p{n}")));
            assert_eq!(snapshot.team_is_startable(), (3..=5).contains(&n));
        }
    }

    #[test]
    fn consistency_tracks_phase_and_payload() {
        let mut snapshot = SessionSnapshot::lobby();
        snapshot.phase = SessionPhase::Playing;
        assert!(!snapshot.is_consistent());

        snapshot.puzzle = Some(classic_fallback());
        snapshot.started_at = Some(Timestamp::from_millis(1));
        assert!(snapshot.is_consistent());

        snapshot.phase = SessionPhase::Expired;
        assert!(!snapshot.is_consistent());

        snapshot.puzzle = None;
        snapshot.started_at = None;
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn contains_matches_roster() {
        let mut snapshot = SessionSnapshot::lobby();
        let alice = PlayerId::new("alice");
        assert!(!snapshot.contains(&alice));
        snapshot.team.push(alice.clone());
        assert!(snapshot.contains(&alice));
        assert!(!snapshot.contains(&PlayerId::new("bob")));
    }
}
