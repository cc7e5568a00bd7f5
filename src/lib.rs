//! # roomwire-client
//!
//! Protocol core of a voice-chat client: the MessagePack codec, RPC
//! framing, request/response correlation, notification routing and the
//! per-room session state machine.
//!
//! The crate does no I/O of its own. The host owns the connection, hands
//! each [`Room`] a [`Transport`](transport::Transport) for outbound bytes and
//! feeds inbound RPC frames and datagrams back in.
//!
//! ## Architecture
//!
//! - **RPC channel**: MessagePack arrays `[type, ...]` carrying Requests,
//!   Responses and Notifications
//! - **Datagram channel**: opaque media payloads, optionally run through a
//!   [`Cipher`](transport::Cipher)
//!
//! ## Example
//!
//! ```
//! use roomwire_client::handler::RoomEvent;
//! use roomwire_client::room::{JoinParams, Room, RoomStatus};
//! use roomwire_client::transport::ChannelTransport;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> roomwire_client::Result<()> {
//!     let (transport, mut outbound) = ChannelTransport::with_default_capacity();
//!     let room = Room::builder()
//!         .event_handler(|event: RoomEvent| println!("{}", event.name()))
//!         .build(transport);
//!
//!     let join = room.join(JoinParams::new("lobby"))?;
//!     let request = outbound.recv().await.expect("join request queued");
//!     assert!(request.is_rpc());
//!     assert_eq!(room.status(), RoomStatus::Joining);
//!
//!     // Bytes from the server go to room.handle_rpc_bytes(..); closing the
//!     // room fails everything still pending.
//!     room.close();
//!     assert!(join.await.is_err());
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod pool;
pub mod protocol;
pub mod room;
pub mod rpc;
pub mod transport;

pub use config::SessionConfig;
pub use error::{Result, RoomError};
pub use handler::{EventHandler, RoomEvent};
pub use pool::{ConnectionPool, RoomHandle};
pub use room::{JoinParams, Room, RoomBuilder, RoomStatus};
pub use rpc::{CommandHandle, CommandOutcome, CommandReply};
