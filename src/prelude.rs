//! Convenient re-exports for common usage.
//!
//! This module provides a "prelude" that re-exports the most commonly used
//! types from Blockparty, allowing you to import them all at once.
//!
//! # Usage
//!
//! ```rust
//! use blockparty::prelude::*;
//! ```
//!
//! # What's Included
//!
//! - **Session types**: [`CoopSession`], [`SessionBuilder`]
//! - **Ports**: [`SnapshotChannel`], [`StreakLedger`], [`PuzzleSource`]
//! - **In-process implementations**: [`LocalBroadcastHub`], [`MemoryLedger`], [`FallbackSource`]
//! - **Board types**: [`Puzzle`], [`BoardPiece`]
//! - **Fundamental types**: [`PieceId`], [`PlayerId`], [`Timestamp`], [`PuzzleSeed`]
//! - **Session state**: [`SessionPhase`], [`SessionSnapshot`], [`BlockpartyEvent`]
//! - **Error handling**: [`BlockpartyError`]

// Core session types
pub use crate::session::{CoopSession, SessionBuilder};

// Ports to external collaborators
pub use crate::channel::SnapshotChannel;
pub use crate::generator::PuzzleSource;
pub use crate::ledger::StreakLedger;

// In-process implementations
pub use crate::channel::{LocalBroadcast, LocalBroadcastHub};
pub use crate::generator::FallbackSource;
pub use crate::ledger::MemoryLedger;

// Board model
pub use crate::board::{BoardPiece, Puzzle};

// Fundamental types
pub use crate::generator::PuzzleSeed;
pub use crate::{PieceId, PlayerId, Timestamp};

// Session state
pub use crate::snapshot::SessionSnapshot;
pub use crate::{BlockpartyEvent, SessionPhase};

// Error handling
pub use crate::error::BlockpartyError;

// Constants
pub use crate::{GAME_DURATION, MAX_PLAYERS, MIN_PLAYERS};
