//! Session configuration.
//!
//! # Example
//!
//! ```
//! use roomwire_client::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "notification_commands": true }"#).unwrap();
//! assert!(config.notification_commands);
//! assert_eq!(config.max_pending_calls, 1024);
//! ```

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::DEFAULT_REQUEST_REJECTION;

/// Default correlation table capacity.
pub const DEFAULT_MAX_PENDING_CALLS: usize = 1024;

/// Per-room settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Send `UpdatePeer`, `SetPeerPosition` and `SendMessage` as
    /// Notifications. Their handles then resolve as soon as the transport
    /// accepts the bytes.
    pub notification_commands: bool,
    /// Maximum in-flight Requests. 0 means unlimited.
    pub max_pending_calls: usize,
    /// Error string sent back when the server issues a Request.
    pub request_rejection: String,
}

impl SessionConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            notification_commands: false,
            max_pending_calls: DEFAULT_MAX_PENDING_CALLS,
            request_rejection: DEFAULT_REQUEST_REJECTION.to_string(),
        }
    }
}
