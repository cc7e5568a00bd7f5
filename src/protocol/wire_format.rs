//! RPC framing layout.
//!
//! Every frame is one top-level MessagePack array whose first element is the
//! frame type:
//!
//! ```text
//! ┌───┬────────────┬────────────────┬──────────┐
//! │ 0 │ msg_id u32 │ method string  │ params   │  Request
//! ├───┼────────────┼────────────────┼──────────┤
//! │ 1 │ msg_id u32 │ error str|nil  │ result   │  Response
//! ├───┼────────────┼────────────────┼──────────┘
//! │ 2 │ method str │ params         │             Notification
//! └───┴────────────┴────────────────┘
//! ```
//!
//! Index positions are fixed; nothing is negotiated.

use crate::error::{Result, RoomError};

/// Frame type discriminant (element 0 of every frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Request = 0,
    Response = 1,
    Notification = 2,
}

impl FrameType {
    /// Number of elements in the top-level array.
    pub fn arity(self) -> u32 {
        match self {
            FrameType::Request | FrameType::Response => 4,
            FrameType::Notification => 3,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for FrameType {
    type Error = RoomError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(FrameType::Request),
            1 => Ok(FrameType::Response),
            2 => Ok(FrameType::Notification),
            other => Err(RoomError::Protocol(format!(
                "Unknown frame type {}",
                other
            ))),
        }
    }
}

/// Element positions inside a frame.
pub mod index {
    pub const TYPE: usize = 0;
    /// Request / Response.
    pub const MSG_ID: usize = 1;
    pub const REQUEST_METHOD: usize = 2;
    pub const REQUEST_PARAMS: usize = 3;
    pub const RESPONSE_ERROR: usize = 2;
    pub const RESPONSE_RESULT: usize = 3;
    pub const NOTIFICATION_METHOD: usize = 1;
    pub const NOTIFICATION_PARAMS: usize = 2;
}

/// Method names used on the wire.
pub mod methods {
    // Outbound commands
    pub const JOIN_ROOM: &str = "JoinRoom";
    pub const START_MEDIA: &str = "StartMedia";
    pub const STOP_MEDIA: &str = "StopMedia";
    pub const PAUSE_MEDIA: &str = "PauseMedia";
    pub const RESUME_MEDIA: &str = "ResumeMedia";
    pub const UPDATE_PEER: &str = "UpdatePeer";
    pub const SET_PEER_POSITION: &str = "SetPeerPosition";
    pub const SEND_MESSAGE: &str = "SendMessage";

    // Inbound notifications
    pub const ROOM_STATUS_CHANGED: &str = "RoomStatusChanged";
    pub const ROOM_UPDATED: &str = "RoomUpdated";
    pub const PEER_UPDATED: &str = "PeerUpdated";
    pub const MESSAGE_RECEIVED: &str = "MessageReceived";
}

/// Map keys used in params and notification payloads.
pub mod keys {
    pub const STATUS: &str = "status";
    pub const MESSAGE: &str = "message";
    pub const UPDATES: &str = "updates";
    pub const KIND: &str = "kind";
    pub const REASON: &str = "reason";
    pub const ROOM: &str = "room";
    pub const ROOM_ID: &str = "room_id";
    pub const ID: &str = "id";
    pub const CUSTOMER: &str = "customer";
    pub const USER_DATA: &str = "user_data";
    pub const USER_ID: &str = "user_id";
    pub const OWN_PEER_ID: &str = "own_peer_id";
    pub const MEDIA_IDS: &str = "media_ids";
    pub const PEERS: &str = "peers";
    pub const PEER: &str = "peer";
    pub const PEER_ID: &str = "peer_id";
    pub const MEDIAS: &str = "medias";
    pub const MEDIA: &str = "media";
    pub const MEDIA_ID: &str = "media_id";
    pub const PROPERTIES: &str = "properties";
    pub const UID: &str = "uid";
    pub const PAUSED: &str = "paused";
    pub const POSITION: &str = "position";
    pub const COORDINATES: &str = "coordinates";
    pub const SENDER_PEER_ID: &str = "sender_peer_id";
    pub const TARGET_PEER_IDS: &str = "target_peer_ids";
}

/// Error string sent back when the server issues a Request to this client.
pub const DEFAULT_REQUEST_REJECTION: &str = "requests are not supported by this client";
