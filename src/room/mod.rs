//! Room module - session state machine and command surface.
//!
//! Provides:
//! - [`Room`] - one room connection
//! - [`RoomBuilder`] - fluent configuration
//! - [`RoomStatus`], [`Peer`], [`MediaRef`], [`InputMedia`] - state snapshots

mod builder;
mod session;
mod state;

pub use builder::RoomBuilder;
pub use session::{JoinParams, Room, CLOSED_BY_SERVER, LEFT_BY_APPLICATION, TRANSPORT_CLOSED};
pub use state::{InputMedia, MediaRef, Peer, RoomStatus};
