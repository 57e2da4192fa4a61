//! # Blockparty
//!
//! Blockparty is a transport-agnostic cooperative session engine for
//! sliding-block ("Klotski"-style) puzzles. A small team of players shares a
//! single session (lobby, team roster, puzzle, timer and outcome) and every
//! participant runs its own copy of the engine, kept consistent by
//! broadcasting whole-snapshot replacements over a pluggable sync channel.
//!
//! The engine owns the two pieces with real invariants: the session state
//! machine (with its win/expiry ledger side effects) and the move resolver
//! that turns a freeform drag gesture into a legal discrete board move.
//! Rendering, audio, profile storage, puzzle content generation and the real
//! transport are external collaborators reached through the [`SnapshotChannel`],
//! [`StreakLedger`] and [`PuzzleSource`] ports.
//!
//! Consistency is intentionally weak: the channel is last-write-wins and
//! concurrent edits from different participants may be lost. The engine is
//! designed to tolerate that model, not to hide it; see the documentation on
//! [`CoopSession::pump`] and [`SessionSnapshot`].
//!
//! ```
//! use blockparty::{FallbackSource, LocalBroadcastHub, PlayerId, SessionBuilder, Timestamp};
//!
//! let hub = LocalBroadcastHub::new();
//! let mut session = SessionBuilder::new().start_session(hub.participant());
//! for name in ["ada", "grace", "edsger"] {
//!     session.join_team(PlayerId::new(name))?;
//! }
//! session.start_game(&mut FallbackSource, Timestamp::now())?;
//! assert!(session.puzzle().is_some());
//! # Ok::<(), blockparty::BlockpartyError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use serde::{Deserialize, Serialize};
use web_time::{Duration, SystemTime, UNIX_EPOCH};

pub use board::{classic_fallback, BoardPiece, LayoutError, Puzzle};
pub use channel::{LocalBroadcast, LocalBroadcastHub, LossyChannel, SnapshotChannel};
pub use error::BlockpartyError;
pub use event_drain::EventDrain;
pub use generator::{FallbackSource, GenerateError, PuzzleSeed, PuzzleSource};
pub use ledger::{MemoryLedger, StreakLedger};
pub use resolver::{dominant_axis, resolve_drag, DragAxis};
pub use session::{CoopSession, SessionBuilder};
pub use snapshot::{SessionSnapshot, TeamRoster};

pub mod board;
pub mod channel;
/// Binary codec for snapshot frames.
///
/// Centralizes the bincode configuration so every participant encodes
/// snapshots identically. See the module documentation for details.
pub mod codec;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod event_drain;
pub mod generator;
pub mod ledger;
pub mod prelude;
pub mod resolver;
/// Minimal PCG32 PRNG used by the lossy test channel.
///
/// Replaces a `rand` dependency for the one place the crate needs cheap,
/// seedable randomness.
pub mod rng;
#[doc(hidden)]
pub mod session;
pub mod snapshot;

// #############
// # CONSTANTS #
// #############

/// Smallest team allowed to start a game.
pub const MIN_PLAYERS: usize = 3;

/// Largest team a session accepts.
pub const MAX_PLAYERS: usize = 5;

/// How long a started game runs before it expires.
pub const GAME_DURATION: Duration = Duration::from_secs(3600);

// #############
// # NEWTYPES  #
// #############

/// A unique identifier for a piece within a puzzle.
///
/// `PieceId` is a newtype wrapper around `u32` that keeps piece identifiers
/// from mixing with coordinates or other integers.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a new `PieceId` from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        PieceId(id)
    }

    /// Returns the underlying `u32` value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PieceId {
    #[inline]
    fn from(value: u32) -> Self {
        PieceId(value)
    }
}

/// A player identifier, unique within a session's team and within the streak
/// ledger.
///
/// Blockparty does not authenticate players; identifiers come from the
/// embedding application (a login name, a device id, …) and are treated as
/// opaque ordered strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a new `PlayerId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        PlayerId(value.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        PlayerId(value)
    }
}

/// A wall-clock instant in unix milliseconds.
///
/// Snapshots carry the game's start time across the wire, so the engine
/// works with serializable wall-clock values instead of process-local
/// `Instant`s. All transition methods that consult the clock take an explicit
/// `Timestamp`, which keeps the state machine deterministic under test;
/// [`Timestamp::now`] is the production convenience.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Returns the value in unix milliseconds.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The current wall-clock time.
    ///
    /// A clock reading before the unix epoch collapses to zero rather than
    /// failing.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }

    /// Elapsed time since `earlier`, saturating to zero when `earlier` is in
    /// the future.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// #############
// #   ENUMS   #
// #############

/// The lifecycle phase of a shared session.
///
/// Transitions: `Lobby → Playing → {Won, Expired}`, then back to a fresh
/// `Lobby` via reset. The only path into `Won` is a solving move: win is
/// detected, never commanded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Players are assembling a team; no puzzle exists.
    Lobby,
    /// A game is running against the clock.
    Playing,
    /// The goal piece reached the goal cell; streaks were credited.
    Won,
    /// The clock ran out before a solve; streaks were reset.
    Expired,
}

/// Notifications that you can receive from the session. Handling them is up
/// to the user; unconsumed events are dropped oldest-first once the bounded
/// queue fills.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new event types may be
/// added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockpartyEvent {
    /// The session moved to a different phase, locally or via a delivered
    /// snapshot.
    PhaseChanged {
        /// The phase before the transition.
        from: SessionPhase,
        /// The phase after the transition.
        to: SessionPhase,
    },
    /// The lobby roster changed.
    TeamChanged {
        /// Team size after the change.
        size: usize,
    },
    /// A local drag gesture moved a piece.
    MoveApplied {
        /// The piece that moved.
        piece: PieceId,
        /// Its new column.
        x: i32,
        /// Its new row.
        y: i32,
    },
    /// A snapshot delivered through the sync channel replaced the local view.
    SnapshotReplaced {
        /// Generation of the adopted snapshot.
        generation: u64,
        /// Revision of the adopted snapshot.
        revision: u64,
    },
}

// ###################
// # UNIT TESTS      #
// ###################

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn piece_id_display_and_value() {
        let id = PieceId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(format!("{id}"), "7");
        assert_eq!(PieceId::from(7), id);
    }

    #[test]
    fn player_id_is_ordered_by_content() {
        let a = PlayerId::new("alice");
        let b = PlayerId::new("bob");
        assert!(a < b);
        assert_eq!(a.as_str(), "alice");
        assert_eq!(PlayerId::from("alice"), a);
    }

    #[test]
    fn timestamp_elapsed_saturates() {
        let early = Timestamp::from_millis(100);
        let late = Timestamp::from_millis(350);
        assert_eq!(
            late.saturating_duration_since(early),
            Duration::from_millis(250)
        );
        assert_eq!(
            early.saturating_duration_since(late),
            Duration::from_millis(0)
        );
    }

    #[test]
    fn game_duration_is_one_hour() {
        assert_eq!(GAME_DURATION.as_secs(), 3600);
    }

    #[test]
    fn player_band_is_three_to_five() {
        assert_eq!(MIN_PLAYERS, 3);
        assert_eq!(MAX_PLAYERS, 5);
    }
}
