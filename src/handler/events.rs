//! Room events and the application callback seam.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::room::{MediaRef, Peer, RoomStatus};

/// Something the application may want to react to.
///
/// Events are raised after the room's state has been updated and the room
/// lock released, so a handler may call back into the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    StatusChanged {
        old: RoomStatus,
        new: RoomStatus,
        message: Option<String>,
    },
    /// A `Joined` snapshot replaced the roster.
    Joined {
        room_id: String,
        own_peer_id: u64,
        peers: Vec<Peer>,
    },
    Left {
        reason: String,
    },
    RoomUserDataChanged {
        user_data: Bytes,
    },
    PeerJoined {
        peer: Peer,
    },
    /// The peer and every media it owned are gone.
    PeerLeft {
        peer: Peer,
    },
    PeerUserDataChanged {
        peer_id: u64,
        user_data: Bytes,
    },
    MediaStarted {
        peer_id: u64,
        media: MediaRef,
    },
    MediaStopped {
        peer_id: u64,
        media: MediaRef,
    },
    MessageReceived {
        sender_peer_id: u64,
        message: Bytes,
    },
    /// A decrypted inbound datagram.
    DatagramReceived {
        payload: Bytes,
    },
    /// The server closed a joined room without a request or a message.
    /// Reconnecting is left to the application.
    InconsistentClose {
        detail: String,
    },
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::StatusChanged { .. } => "StatusChanged",
            RoomEvent::Joined { .. } => "Joined",
            RoomEvent::Left { .. } => "Left",
            RoomEvent::RoomUserDataChanged { .. } => "RoomUserDataChanged",
            RoomEvent::PeerJoined { .. } => "PeerJoined",
            RoomEvent::PeerLeft { .. } => "PeerLeft",
            RoomEvent::PeerUserDataChanged { .. } => "PeerUserDataChanged",
            RoomEvent::MediaStarted { .. } => "MediaStarted",
            RoomEvent::MediaStopped { .. } => "MediaStopped",
            RoomEvent::MessageReceived { .. } => "MessageReceived",
            RoomEvent::DatagramReceived { .. } => "DatagramReceived",
            RoomEvent::InconsistentClose { .. } => "InconsistentClose",
        }
    }
}

/// Receives room events.
///
/// Implemented for closures and for unbounded channel senders:
///
/// ```
/// use roomwire_client::handler::{EventHandler, RoomEvent};
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RoomEvent>();
/// tx.on_event(RoomEvent::Left { reason: "bye".into() });
/// assert!(rx.try_recv().is_ok());
///
/// let log = |event: RoomEvent| println!("{}", event.name());
/// log.on_event(RoomEvent::Left { reason: "bye".into() });
/// ```
pub trait EventHandler: Send + Sync + 'static {
    fn on_event(&self, event: RoomEvent);
}

impl<F> EventHandler for F
where
    F: Fn(RoomEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: RoomEvent) {
        self(event)
    }
}

impl EventHandler for mpsc::UnboundedSender<RoomEvent> {
    fn on_event(&self, event: RoomEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

/// Handler used when the application installs none: log everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEvents;

impl EventHandler for LogEvents {
    fn on_event(&self, event: RoomEvent) {
        match &event {
            RoomEvent::MessageReceived {
                sender_peer_id,
                message,
            } => {
                tracing::info!(
                    "Message from peer {} ({} bytes, no handler installed)",
                    sender_peer_id,
                    message.len()
                );
            }
            other => tracing::debug!("Room event: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = move |event: RoomEvent| sink.lock().unwrap().push(event.name());

        handler.on_event(RoomEvent::Left { reason: "x".into() });
        handler.on_event(RoomEvent::DatagramReceived { payload: Bytes::new() });
        assert_eq!(*seen.lock().unwrap(), vec!["Left", "DatagramReceived"]);
    }

    #[test]
    fn test_channel_handler_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.on_event(RoomEvent::Left { reason: "x".into() });
    }

    #[test]
    fn test_log_handler_accepts_everything() {
        LogEvents.on_event(RoomEvent::MessageReceived {
            sender_peer_id: 1,
            message: Bytes::from_static(b"hi"),
        });
        LogEvents.on_event(RoomEvent::InconsistentClose { detail: "x".into() });
    }
}
