//! Connection pool: explicit ownership of every open room.
//!
//! The host's network layer knows rooms only by [`RoomHandle`]. Inbound
//! bytes are routed to the owning [`Room`]; bytes for a handle that is not
//! (or no longer) registered are dropped.
//!
//! # Example
//!
//! ```
//! use roomwire_client::pool::ConnectionPool;
//! use roomwire_client::room::Room;
//! use roomwire_client::transport::ChannelTransport;
//!
//! let pool = ConnectionPool::new();
//! let (transport, _outbound) = ChannelTransport::with_default_capacity();
//! let handle = pool.insert(Room::builder().build(transport));
//!
//! assert!(pool.get(handle).is_some());
//! pool.remove(handle);
//! assert!(!pool.on_rpc_bytes(handle, &[0x90]));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::room::Room;

/// Opaque identifier of a pooled room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomHandle(u64);

impl RoomHandle {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// Map of open rooms keyed by handle.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    rooms: RwLock<HashMap<RoomHandle, Arc<Room>>>,
    next_handle: AtomicU64,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `room` and return its handle.
    pub fn insert(&self, room: Room) -> RoomHandle {
        self.insert_shared(Arc::new(room))
    }

    pub fn insert_shared(&self, room: Arc<Room>) -> RoomHandle {
        let handle = RoomHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.rooms.write().insert(handle, room);
        handle
    }

    pub fn get(&self, handle: RoomHandle) -> Option<Arc<Room>> {
        self.rooms.read().get(&handle).cloned()
    }

    /// Route one inbound RPC frame. Returns `false` if the handle is unknown.
    pub fn on_rpc_bytes(&self, handle: RoomHandle, bytes: &[u8]) -> bool {
        match self.get(handle) {
            Some(room) => {
                room.handle_rpc_bytes(bytes);
                true
            }
            None => {
                tracing::debug!("Dropping {} byte frame for unknown {}", bytes.len(), handle);
                false
            }
        }
    }

    /// Route one inbound datagram. Returns `false` if the handle is unknown.
    pub fn on_datagram_bytes(&self, handle: RoomHandle, bytes: &[u8]) -> bool {
        match self.get(handle) {
            Some(room) => {
                room.handle_datagram_bytes(bytes);
                true
            }
            None => {
                tracing::debug!("Dropping datagram for unknown {}", handle);
                false
            }
        }
    }

    /// Close and forget one room.
    pub fn remove(&self, handle: RoomHandle) -> Option<Arc<Room>> {
        let room = self.rooms.write().remove(&handle)?;
        room.close();
        Some(room)
    }

    /// Close and forget every room.
    pub fn close_all(&self) {
        let rooms: Vec<Arc<Room>> = self.rooms.write().drain().map(|(_, room)| room).collect();
        for room in rooms {
            room.close();
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }

    /// Handles of all pooled rooms, in creation order.
    pub fn handles(&self) -> Vec<RoomHandle> {
        let mut handles: Vec<RoomHandle> = self.rooms.read().keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}
