//! Correlation table for in-flight Requests.
//!
//! Every Request is registered here under its message id *before* its bytes
//! are handed to the transport, so a Response can never race ahead of its
//! entry. Each entry is removed exactly once: by [`CorrelationTable::resolve`],
//! [`CorrelationTable::cancel`] or [`CorrelationTable::fail_all`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::command::CommandReply;
use crate::error::{Result, RoomError};
use crate::protocol::ReplyValue;

/// Completion side of one in-flight Request.
#[derive(Debug)]
pub struct PendingCall {
    /// Method name, echoed back in the reply.
    pub method: &'static str,
    completion: oneshot::Sender<Result<CommandReply>>,
}

/// Message id allocator plus the table of calls awaiting a Response.
#[derive(Debug)]
pub struct CorrelationTable {
    calls: Mutex<HashMap<u32, PendingCall>>,
    next_msg_id: AtomicU32,
    /// 0 means unlimited.
    capacity: usize,
}

impl CorrelationTable {
    /// Create a table. `capacity == 0` disables the limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            next_msg_id: AtomicU32::new(1),
            capacity,
        }
    }

    /// Allocate the next message id. Ids increase monotonically and wrap.
    pub fn next_msg_id(&self) -> u32 {
        self.next_msg_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a call and return the receiver its reply will arrive on.
    pub fn register(
        &self,
        msg_id: u32,
        method: &'static str,
    ) -> Result<oneshot::Receiver<Result<CommandReply>>> {
        let mut calls = self.calls.lock();
        if self.capacity != 0 && calls.len() >= self.capacity {
            return Err(RoomError::TooManyPendingCalls(self.capacity));
        }
        if calls.contains_key(&msg_id) {
            // Only reachable after the id counter wrapped onto a call that
            // never got an answer.
            return Err(RoomError::Protocol(format!(
                "message id {} is still in flight",
                msg_id
            )));
        }
        let (tx, rx) = oneshot::channel();
        calls.insert(
            msg_id,
            PendingCall {
                method,
                completion: tx,
            },
        );
        Ok(rx)
    }

    /// Complete the call registered under `msg_id`.
    ///
    /// Returns `false` when no such call exists (late, duplicate or never
    /// issued); the caller decides how loudly to log that.
    pub fn resolve(&self, msg_id: u32, error: Option<String>, value: ReplyValue) -> bool {
        let Some(call) = self.calls.lock().remove(&msg_id) else {
            return false;
        };
        let reply = CommandReply {
            id: msg_id,
            name: call.method.to_string(),
            error,
            value,
        };
        // The handle may have been dropped; that is not an error.
        let _ = call.completion.send(Ok(reply));
        true
    }

    /// Remove a call without completing it, e.g. when its bytes could not
    /// be sent. The receiver observes [`RoomError::RoomClosed`].
    pub fn cancel(&self, msg_id: u32) -> Option<PendingCall> {
        self.calls.lock().remove(&msg_id)
    }

    /// Fail every outstanding call with [`RoomError::RoomClosed`].
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<PendingCall> = self.calls.lock().drain().map(|(_, call)| call).collect();
        let count = drained.len();
        for call in drained {
            let _ = call.completion.send(Err(RoomError::RoomClosed));
        }
        if count > 0 {
            tracing::debug!("Failed {} pending calls on close", count);
        }
        count
    }

    /// Number of calls awaiting a Response.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Ids of all in-flight calls, in ascending order.
    pub fn pending_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.calls.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new(0)
    }
}
