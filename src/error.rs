//! Error types for roomwire-client.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::room::RoomStatus;

/// Main error type for all room operations.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Malformed or truncated wire bytes.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Well-formed frame with semantics the session does not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command was issued while the room was not joined.
    #[error("Room is not joined (status: {0:?})")]
    NotJoined(RoomStatus),

    /// A join was issued while a join is in flight or already complete.
    #[error("Room is already joining or joined (status: {0:?})")]
    AlreadyJoined(RoomStatus),

    /// The room was closed before the operation could complete.
    #[error("Room closed")]
    RoomClosed,

    /// The transport reports the room handle is gone.
    #[error("Transport closed")]
    TransportClosed,

    /// The transport queue is full.
    #[error("Transport backpressure")]
    Backpressure,

    /// The correlation table is at capacity.
    #[error("Too many pending calls (limit {0})")]
    TooManyPendingCalls(usize),

    /// No free media id is left in the pool handed out on join.
    #[error("No free media id available")]
    NoFreeMediaId,

    /// MsgPack serialization error (serde bridge).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error (serde bridge).
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The injected cipher rejected the bytes.
    #[error("Cipher error: {0}")]
    Cipher(String),
}

impl RoomError {
    /// Whether this error means the room can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoomError::TransportClosed | RoomError::RoomClosed)
    }
}

/// Result type alias using RoomError.
pub type Result<T> = std::result::Result<T, RoomError>;
