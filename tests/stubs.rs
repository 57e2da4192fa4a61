use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

/// Routes engine tracing into the test harness output. Safe to call from
/// every test; repeat initialization is ignored.
#[allow(dead_code)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

use blockparty::{
    BoardPiece, GenerateError, PieceId, PlayerId, Puzzle, PuzzleSeed, PuzzleSource, StreakLedger,
};

/// What the recording ledger saw, for asserting fire-once semantics.
#[derive(Debug, Default)]
pub struct LedgerLog {
    pub records: BTreeMap<PlayerId, u32>,
    pub increment_calls: usize,
    pub reset_calls: usize,
}

/// A streak ledger that counts bulk operations and shares its state with the
/// test through an `Arc`, since the session takes ownership of its ledger.
#[derive(Debug, Clone, Default)]
pub struct RecordingLedger {
    log: Arc<Mutex<LedgerLog>>,
}

impl RecordingLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle observing the same underlying log.
    #[must_use]
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn streak(&self, player: &PlayerId) -> u32 {
        self.log.lock().records.get(player).copied().unwrap_or(0)
    }

    pub fn increment_calls(&self) -> usize {
        self.log.lock().increment_calls
    }

    pub fn reset_calls(&self) -> usize {
        self.log.lock().reset_calls
    }
}

impl StreakLedger for RecordingLedger {
    fn upsert(&mut self, player: &PlayerId) {
        self.log.lock().records.entry(player.clone()).or_insert(0);
    }

    fn get(&self, player: &PlayerId) -> u32 {
        self.streak(player)
    }

    fn increment_all(&mut self, players: &[PlayerId]) {
        let mut log = self.log.lock();
        log.increment_calls += 1;
        for player in players {
            *log.records.entry(player.clone()).or_insert(0) += 1;
        }
    }

    fn reset_all(&mut self, players: &[PlayerId]) {
        let mut log = self.log.lock();
        log.reset_calls += 1;
        for player in players {
            log.records.insert(player.clone(), 0);
        }
    }
}

/// A puzzle source that serves a scripted queue of outcomes.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    outcomes: VecDeque<Result<Puzzle, GenerateError>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, outcome: Result<Puzzle, GenerateError>) -> Self {
        self.outcomes.push_back(outcome);
        self
    }
}

impl PuzzleSource for ScriptedSource {
    fn request(&mut self, _seed: PuzzleSeed) -> Result<Puzzle, GenerateError> {
        self.outcomes
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::new("script exhausted")))
    }
}

/// A 4x5 board holding only the 2x2 goal piece at (1, 0), three cells of
/// open corridor above the goal cell (1, 3). Solvable in a single drag.
#[must_use]
pub fn one_move_puzzle() -> Puzzle {
    Puzzle {
        width: 4,
        height: 5,
        pieces: vec![BoardPiece::new(PieceId::new(1), 1, 0, 2, 2, true)],
        goal: (1, 3),
    }
}

#[must_use]
pub fn team_of(n: usize) -> Vec<PlayerId> {
    (0..n).map(|i| PlayerId::new(format!("player-{i}"))).collect()
}
