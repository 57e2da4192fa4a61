//! The streak ledger port.
//!
//! Per-player win streaks are owned by an external store (a profile database
//! in production). The engine only ever reads current values and requests
//! bulk increment/reset against the current team; it fires each request once
//! per game generation inside the transition itself, never on snapshot
//! replay.

use std::collections::BTreeMap;

use crate::PlayerId;

/// Port to the external per-player streak store.
pub trait StreakLedger {
    /// Ensures a record exists for `player`, seeding the streak at zero.
    fn upsert(&mut self, player: &PlayerId);

    /// Current streak for `player`; zero for unknown players.
    fn get(&self, player: &PlayerId) -> u32;

    /// Increments every listed player's streak by one. Fired on the
    /// transition to won.
    fn increment_all(&mut self, players: &[PlayerId]);

    /// Resets every listed player's streak to zero. Fired on the transition
    /// to expired.
    fn reset_all(&mut self, players: &[PlayerId]);
}

/// In-memory reference implementation, used by the simulated deployment and
/// by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: BTreeMap<PlayerId, u32>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no players are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StreakLedger for MemoryLedger {
    fn upsert(&mut self, player: &PlayerId) {
        self.records.entry(player.clone()).or_insert(0);
    }

    fn get(&self, player: &PlayerId) -> u32 {
        self.records.get(player).copied().unwrap_or(0)
    }

    fn increment_all(&mut self, players: &[PlayerId]) {
        for player in players {
            *self.records.entry(player.clone()).or_insert(0) += 1;
        }
    }

    fn reset_all(&mut self, players: &[PlayerId]) {
        for player in players {
            self.records.insert(player.clone(), 0);
        }
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn team() -> Vec<PlayerId> {
        vec![
            PlayerId::new("alice"),
            PlayerId::new("bob"),
            PlayerId::new("carol"),
        ]
    }

    #[test]
    fn unknown_player_reads_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get(&PlayerId::new("nobody")), 0);
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut ledger = MemoryLedger::new();
        let alice = PlayerId::new("alice");
        ledger.upsert(&alice);
        ledger.increment_all(std::slice::from_ref(&alice));
        ledger.upsert(&alice);
        assert_eq!(ledger.get(&alice), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn increment_and_reset_cover_the_whole_team() {
        let mut ledger = MemoryLedger::new();
        let team = team();
        ledger.increment_all(&team);
        ledger.increment_all(&team);
        for player in &team {
            assert_eq!(ledger.get(player), 2);
        }
        ledger.reset_all(&team);
        for player in &team {
            assert_eq!(ledger.get(player), 0);
        }
    }
}
