use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::board::LayoutError;
use crate::codec::CodecError;
use crate::{PieceId, PlayerId, SessionPhase};

/// This enum contains all error messages this library can return. Most API
/// functions will generally return a [`Result<(), BlockpartyError>`].
///
/// Rejected transitions never mutate session state: callers that gate calls
/// on the current phase can treat every rejection as a silent no-op.
///
/// [`Result<(), BlockpartyError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlockpartyError {
    /// The transition is only valid while the session sits in the lobby.
    NotInLobby {
        /// The phase the session was actually in.
        phase: SessionPhase,
    },
    /// The transition is only valid while a game is being played.
    NotPlaying {
        /// The phase the session was actually in.
        phase: SessionPhase,
    },
    /// Reset is only valid once the game has finished (or idempotently from
    /// the lobby).
    NotFinished {
        /// The phase the session was actually in.
        phase: SessionPhase,
    },
    /// Starting a game requires a team size within the allowed band.
    TeamSize {
        /// The team size at the time of the attempt.
        size: usize,
    },
    /// The team roster is already at capacity.
    TeamFull {
        /// The fixed roster capacity.
        max: usize,
    },
    /// The player is already on the team.
    AlreadyOnTeam {
        /// The duplicate player.
        player: PlayerId,
    },
    /// The player is not on the team.
    NotOnTeam {
        /// The unknown player.
        player: PlayerId,
    },
    /// A game start is in flight; local transitions are rejected until the
    /// puzzle generator call completes.
    StartPending,
    /// `complete_start` was called with no start in flight.
    StartNotPending,
    /// The referenced piece does not exist in the current puzzle.
    UnknownPiece {
        /// The unknown piece id.
        piece: PieceId,
    },
    /// A puzzle layout violated a board invariant.
    InvalidLayout {
        /// The violated invariant.
        error: LayoutError,
    },
    /// Encoding a snapshot frame for publish failed; the transition was not
    /// applied.
    SerializationFailed {
        /// A description of what failed to serialize.
        context: String,
    },
}

impl Display for BlockpartyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockpartyError::NotInLobby { phase } => {
                write!(f, "transition requires the lobby phase, session is {phase:?}")
            }
            BlockpartyError::NotPlaying { phase } => {
                write!(f, "transition requires the playing phase, session is {phase:?}")
            }
            BlockpartyError::NotFinished { phase } => {
                write!(
                    f,
                    "reset requires a finished game (won or expired), session is {phase:?}"
                )
            }
            BlockpartyError::TeamSize { size } => {
                write!(
                    f,
                    "team size {} is outside the startable band of {}..={} players",
                    size,
                    crate::MIN_PLAYERS,
                    crate::MAX_PLAYERS
                )
            }
            BlockpartyError::TeamFull { max } => {
                write!(f, "team roster is full ({max} players)")
            }
            BlockpartyError::AlreadyOnTeam { player } => {
                write!(f, "player {player} is already on the team")
            }
            BlockpartyError::NotOnTeam { player } => {
                write!(f, "player {player} is not on the team")
            }
            BlockpartyError::StartPending => {
                write!(f, "a game start is awaiting the puzzle generator")
            }
            BlockpartyError::StartNotPending => {
                write!(f, "no game start is in flight")
            }
            BlockpartyError::UnknownPiece { piece } => {
                write!(f, "piece {piece} does not exist in the current puzzle")
            }
            BlockpartyError::InvalidLayout { error } => {
                write!(f, "invalid puzzle layout: {error}")
            }
            BlockpartyError::SerializationFailed { context } => {
                write!(f, "snapshot serialization failed: {context}")
            }
        }
    }
}

impl Error for BlockpartyError {}

impl From<LayoutError> for BlockpartyError {
    fn from(error: LayoutError) -> Self {
        BlockpartyError::InvalidLayout { error }
    }
}

impl From<CodecError> for BlockpartyError {
    fn from(error: CodecError) -> Self {
        BlockpartyError::SerializationFailed {
            context: error.to_string(),
        }
    }
}
