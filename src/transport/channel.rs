//! Bounded channel transport.
//!
//! Outbound frames are queued on an mpsc channel and drained by whatever
//! task owns the real connection. Sending never waits: a full queue is
//! backpressure, a dropped receiver is a closed transport.
//!
//! # Architecture
//!
//! ```text
//! Room commands ─┐
//! Auto replies  ─┼─► mpsc::Sender<Outbound> ─► host task ─► socket
//! Datagrams     ─┘
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::Transport;
use crate::error::{Result, RoomError};

/// Default queue capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// One queued outbound item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Rpc(Bytes),
    Datagram(Bytes),
}

impl Outbound {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Outbound::Rpc(bytes) | Outbound::Datagram(bytes) => bytes,
        }
    }

    pub fn is_rpc(&self) -> bool {
        matches!(self, Outbound::Rpc(_))
    }
}

/// Sending half, handed to the room.
///
/// [`Transport::close`] drops the sender, so the receiver sees the end of
/// the stream once everything already queued has been taken.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Mutex<Option<mpsc::Sender<Outbound>>>,
    /// Items queued but not yet received.
    pending: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

/// Receiving half, owned by the host's I/O task.
#[derive(Debug)]
pub struct TransportReceiver {
    rx: mpsc::Receiver<Outbound>,
    pending: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl ChannelTransport {
    /// Create a transport whose queue holds at most `capacity` items.
    pub fn new(capacity: usize) -> (Self, TransportReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx: Mutex::new(Some(tx)),
                pending: pending.clone(),
                closed: closed.clone(),
            },
            TransportReceiver {
                rx,
                pending,
                closed,
            },
        )
    }

    /// Create a transport with [`DEFAULT_CHANNEL_CAPACITY`].
    pub fn with_default_capacity() -> (Self, TransportReceiver) {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Get current queued item count.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }

    fn try_send(&self, item: Outbound) -> Result<()> {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(RoomError::TransportClosed);
        };

        self.pending.fetch_add(1, Ordering::AcqRel);

        tx.try_send(item).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::Release);
            match e {
                mpsc::error::TrySendError::Full(_) => RoomError::Backpressure,
                mpsc::error::TrySendError::Closed(_) => RoomError::TransportClosed,
            }
        })
    }
}

impl Transport for ChannelTransport {
    fn send_rpc(&self, frame: Bytes) -> Result<()> {
        self.try_send(Outbound::Rpc(frame))
    }

    fn send_datagram(&self, payload: Bytes) -> Result<()> {
        self.try_send(Outbound::Datagram(payload))
    }

    fn close(&self) {
        if self.tx.lock().take().is_some() {
            self.closed.store(true, Ordering::Release);
            tracing::debug!("Channel transport closed");
        }
    }
}

impl TransportReceiver {
    /// Wait for the next item. Returns `None` once the transport is closed
    /// (or dropped) and the queue is empty.
    pub async fn recv(&mut self) -> Option<Outbound> {
        let item = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::Release);
        Some(item)
    }

    /// Take the next item if one is queued.
    pub fn try_recv(&mut self) -> Option<Outbound> {
        let item = self.rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::Release);
        Some(item)
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Some(item) = self.try_recv() {
            items.push(item);
        }
        items
    }

    /// Whether the sending side called [`Transport::close`].
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
