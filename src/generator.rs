//! The puzzle source port.
//!
//! Puzzle *content* comes from an external generator keyed by a date-based
//! seed (everyone playing on the same day gets the same board). The engine
//! only consumes the result; when generation fails, or the generated layout
//! violates a board invariant, it substitutes the canned classic layout and
//! keeps going. Generation failure is never surfaced to players.

use std::fmt;

use crate::board::{classic_fallback, Puzzle};
use crate::Timestamp;

const MILLIS_PER_DAY: u64 = 86_400_000;

/// A date-derived seed handed to the external puzzle generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PuzzleSeed(u32);

impl PuzzleSeed {
    /// Creates a seed from a raw value.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        PuzzleSeed(seed)
    }

    /// Derives the seed for the calendar day containing `now`: the number of
    /// whole days since the unix epoch.
    #[must_use]
    pub const fn for_date(now: Timestamp) -> Self {
        PuzzleSeed((now.as_millis() / MILLIS_PER_DAY) as u32)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PuzzleSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The generator could not produce a puzzle.
///
/// Carries a human-readable reason for the log line; the engine recovers by
/// falling back to [`classic_fallback`] and the error never propagates
/// further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateError {
    /// Why generation failed.
    pub context: String,
}

impl GenerateError {
    /// Creates a new error with the given context.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "puzzle generation failed: {}", self.context)
    }
}

impl std::error::Error for GenerateError {}

/// Port to the external puzzle generator.
///
/// Any puzzle returned is expected to satisfy the board invariants
/// (in-bounds, non-overlapping, exactly one goal piece); the session
/// validates defensively and treats a violating layout like a generation
/// failure.
pub trait PuzzleSource {
    /// Produces the puzzle for `seed`, or fails.
    ///
    /// # Errors
    ///
    /// [`GenerateError`] when no puzzle can be produced; the caller falls
    /// back to the canned layout.
    fn request(&mut self, seed: PuzzleSeed) -> Result<Puzzle, GenerateError>;
}

/// A source that always serves the canned classic layout.
///
/// The degenerate-but-dependable source: useful as a default and wherever
/// the real generator is not wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSource;

impl PuzzleSource for FallbackSource {
    fn request(&mut self, _seed: PuzzleSeed) -> Result<Puzzle, GenerateError> {
        Ok(classic_fallback())
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_stable_within_a_day() {
        let morning = Timestamp::from_millis(1_700_000_000_000);
        let later = Timestamp::from_millis(1_700_000_000_000 + 3_600_000);
        assert_eq!(PuzzleSeed::for_date(morning), PuzzleSeed::for_date(later));
    }

    #[test]
    fn seed_changes_across_days() {
        let today = Timestamp::from_millis(1_700_000_000_000);
        let tomorrow = Timestamp::from_millis(1_700_000_000_000 + MILLIS_PER_DAY);
        assert_ne!(PuzzleSeed::for_date(today), PuzzleSeed::for_date(tomorrow));
    }

    #[test]
    fn fallback_source_serves_a_valid_puzzle() {
        let puzzle = FallbackSource.request(PuzzleSeed::new(0)).unwrap();
        assert!(puzzle.validate().is_ok());
    }
}
