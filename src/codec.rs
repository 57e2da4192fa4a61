//! Binary codec for snapshot frames.
//!
//! Centralizes the bincode configuration so every participant encodes
//! snapshots identically. The sync channel carries opaque byte frames; this
//! module is the only place that knows what is inside them.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

// Fixed-size integer encoding keeps frame sizes deterministic across
// publishes of structurally identical snapshots.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Errors that can occur while encoding or decoding a snapshot frame.
///
/// Messages are stored as `String` because the underlying bincode errors are
/// opaque and only expose a `Display` implementation. Codec errors are off
/// the hot path (they signal corrupted or foreign frames), so the allocation
/// does not matter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The encoding operation failed.
    Encode {
        /// The underlying bincode error message.
        message: String,
    },
    /// The decoding operation failed.
    Decode {
        /// The underlying bincode error message.
        message: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode { message } => write!(f, "frame encoding failed: {message}"),
            Self::Decode { message } => write!(f, "frame decoding failed: {message}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value into a new byte frame.
///
/// # Errors
///
/// [`CodecError::Encode`] when bincode rejects the value.
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config()).map_err(|e| CodecError::Encode {
        message: e.to_string(),
    })
}

/// Decodes a value from a byte frame, ignoring trailing bytes.
///
/// # Errors
///
/// [`CodecError::Decode`] when the frame is malformed for `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    bincode::serde::decode_from_slice(bytes, config())
        .map(|(value, _)| value)
        .map_err(|e| CodecError::Decode {
            message: e.to_string(),
        })
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
    use crate::snapshot::SessionSnapshot;
    use crate::{PlayerId, SessionPhase, Timestamp};

    #[test]
    fn snapshot_roundtrip() {
        let mut snapshot = SessionSnapshot::lobby();
        snapshot.phase = SessionPhase::Playing;
        snapshot.team.push(PlayerId::new("alice"));
        snapshot.team.push(PlayerId::new("bob"));
        snapshot.team.push(PlayerId::new("carol"));
        snapshot.puzzle = Some(classic_fallback());
        snapshot.started_at = Some(Timestamp::from_millis(1_700_000_000_000));
        snapshot.generation = 3;
        snapshot.revision = 41;

        let frame = encode(&snapshot).unwrap();
        let decoded: SessionSnapshot = decode(&frame).unwrap();
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn garbage_frame_is_a_decode_error() {
        let result: CodecResult<SessionSnapshot> = decode(&[0xFF, 0x00, 0x13, 0x37]);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn empty_frame_is_a_decode_error() {
        let result: CodecResult<SessionSnapshot> = decode(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn identical_snapshots_encode_identically() {
        let snapshot = SessionSnapshot::lobby();
        assert_eq!(encode(&snapshot).unwrap(), encode(&snapshot).unwrap());
    }
}
