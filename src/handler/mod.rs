//! Handler module - inbound notifications and outbound events.
//!
//! Provides:
//! - [`Notification`] - typed server notifications, parsed once per frame
//! - [`RoomEvent`] - what the application is told after state changes
//! - [`EventHandler`] - the application callback seam
//!
//! # Example
//!
//! ```
//! use roomwire_client::handler::RoomEvent;
//! use roomwire_client::room::Room;
//! use roomwire_client::transport::ChannelTransport;
//!
//! let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel::<RoomEvent>();
//! let (transport, _outbound) = ChannelTransport::with_default_capacity();
//! let _room = Room::builder().event_handler(events_tx).build(transport);
//! ```

mod events;
mod notification;

pub use events::{EventHandler, LogEvents, RoomEvent};
pub use notification::{Notification, PeerUpdate, RoomSnapshot, RoomUpdate, StatusChange};
