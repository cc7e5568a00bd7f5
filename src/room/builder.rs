use std::sync::Arc;

use super::session::Room;
use crate::config::SessionConfig;
use crate::handler::{EventHandler, LogEvents};
use crate::transport::{Cipher, Transport};

/// Builder for configuring and creating a [`Room`].
///
/// ```
/// use roomwire_client::handler::RoomEvent;
/// use roomwire_client::room::Room;
/// use roomwire_client::transport::ChannelTransport;
///
/// let (transport, _outbound) = ChannelTransport::with_default_capacity();
/// let room = Room::builder()
///     .notification_commands(true)
///     .max_pending_calls(64)
///     .event_handler(|event: RoomEvent| println!("{:?}", event))
///     .build(transport);
/// assert!(room.config().notification_commands);
/// ```
pub struct RoomBuilder {
    config: SessionConfig,
    events: Option<Arc<dyn EventHandler>>,
    cipher: Option<Arc<dyn Cipher>>,
}

impl RoomBuilder {
    /// Create a new room builder.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            events: None,
            cipher: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Send user data, position and message commands as Notifications.
    ///
    /// Default: false
    pub fn notification_commands(mut self, enabled: bool) -> Self {
        self.config.notification_commands = enabled;
        self
    }

    /// Set the maximum number of in-flight Requests (0 = unlimited).
    ///
    /// Default: 1024
    pub fn max_pending_calls(mut self, limit: usize) -> Self {
        self.config.max_pending_calls = limit;
        self
    }

    /// Set the error string sent back for server-issued Requests.
    pub fn request_rejection(mut self, message: impl Into<String>) -> Self {
        self.config.request_rejection = message.into();
        self
    }

    /// Receive room events. Without a handler, events are only logged.
    pub fn event_handler(mut self, handler: impl EventHandler) -> Self {
        self.events = Some(Arc::new(handler));
        self
    }

    /// Encrypt and decrypt datagrams with `cipher`.
    pub fn cipher(mut self, cipher: impl Cipher) -> Self {
        self.cipher = Some(Arc::new(cipher));
        self
    }

    /// Build the room on top of `transport`.
    pub fn build(self, transport: impl Transport) -> Room {
        self.build_shared(Arc::new(transport))
    }

    /// Build the room on a transport shared with other code.
    pub fn build_shared(self, transport: Arc<dyn Transport>) -> Room {
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(LogEvents) as Arc<dyn EventHandler>);
        Room::from_parts(self.config, transport, events, self.cipher)
    }
}

impl Default for RoomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomStatus;
    use crate::transport::ChannelTransport;

    #[test]
    fn test_builder_applies_config() {
        let (transport, _rx) = ChannelTransport::new(4);
        let room = RoomBuilder::new()
            .config(SessionConfig::from_json(r#"{"max_pending_calls": 3}"#).unwrap())
            .request_rejection("go away")
            .build(transport);
        assert_eq!(room.config().max_pending_calls, 3);
        assert_eq!(room.config().request_rejection, "go away");
        assert_eq!(room.status(), RoomStatus::Unjoined);
    }

    #[test]
    fn test_build_shared() {
        let (transport, _rx) = ChannelTransport::new(4);
        let shared: Arc<dyn Transport> = Arc::new(transport);
        let room = RoomBuilder::default().build_shared(shared.clone());
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(room);
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
