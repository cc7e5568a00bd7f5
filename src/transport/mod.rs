//! Transport module - where outbound bytes go.
//!
//! The room never owns a socket. The host hands it something implementing
//! [`Transport`] and feeds inbound bytes back through
//! [`Room::handle_rpc_bytes`](crate::room::Room::handle_rpc_bytes) and
//! [`Room::handle_datagram_bytes`](crate::room::Room::handle_datagram_bytes).
//!
//! Provides:
//! - [`Transport`] - the outbound seam
//! - [`ChannelTransport`] - a bounded in-process queue implementation
//! - [`Cipher`] - optional datagram encryption hook

mod channel;
mod cipher;

use bytes::Bytes;

use crate::error::Result;

pub use channel::{ChannelTransport, Outbound, TransportReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use cipher::Cipher;

/// Outbound side of one room connection.
///
/// Both send methods must return without blocking. A full queue is reported
/// as [`RoomError::Backpressure`](crate::RoomError::Backpressure); a
/// connection that is gone as
/// [`RoomError::TransportClosed`](crate::RoomError::TransportClosed), which
/// closes the room.
///
/// An implementation may feed a reply straight back into
/// [`Room::handle_rpc_bytes`](crate::room::Room::handle_rpc_bytes) or
/// [`Room::handle_datagram_bytes`](crate::room::Room::handle_datagram_bytes)
/// from inside a send. The room is still locked at that point, so anything
/// else on the room (commands, accessors) must not be called from there.
pub trait Transport: Send + Sync + 'static {
    /// Hand one complete RPC frame to the transport.
    fn send_rpc(&self, frame: Bytes) -> Result<()>;

    /// Hand one (already encrypted, if a cipher is set) datagram to the transport.
    fn send_datagram(&self, payload: Bytes) -> Result<()>;

    /// Release the connection. Called once when the room closes.
    fn close(&self) {}
}
