//! Command results.
//!
//! Every command returns a [`CommandHandle`] synchronously. Awaiting it
//! yields a [`CommandOutcome`]: `Sent` for commands delivered as
//! Notifications (no reply ever arrives), `Acknowledged` once the matching
//! Response has been received.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Result, RoomError};
use crate::protocol::ReplyValue;

/// The server's answer to one Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Message id the Request was sent under.
    pub id: u32,
    /// Method name of the Request.
    pub name: String,
    /// Error string from the Response, if the server rejected the call.
    pub error: Option<String>,
    pub value: ReplyValue,
}

impl CommandReply {
    /// Whether the server accepted the call.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Turn a server-side rejection into an error.
    pub fn into_result(self) -> Result<ReplyValue> {
        match self.error {
            None => Ok(self.value),
            Some(message) => Err(RoomError::Protocol(format!(
                "{} rejected: {}",
                self.name, message
            ))),
        }
    }
}

/// What a completed command resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Handed to the transport as a Notification.
    Sent { name: &'static str },
    /// The Response for this Request arrived.
    Acknowledged(CommandReply),
}

impl CommandOutcome {
    pub fn name(&self) -> &str {
        match self {
            CommandOutcome::Sent { name } => name,
            CommandOutcome::Acknowledged(reply) => &reply.name,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CommandOutcome::Sent { .. } => None,
            CommandOutcome::Acknowledged(reply) => reply.error.as_deref(),
        }
    }

    pub fn reply(&self) -> Option<&CommandReply> {
        match self {
            CommandOutcome::Sent { .. } => None,
            CommandOutcome::Acknowledged(reply) => Some(reply),
        }
    }
}

#[derive(Debug)]
enum HandleState {
    Sent,
    Pending {
        msg_id: u32,
        rx: oneshot::Receiver<Result<CommandReply>>,
    },
}

/// Future for one issued command.
///
/// Dropping the handle does not cancel the command; a Response that later
/// arrives for it is consumed and discarded.
#[derive(Debug)]
#[must_use = "the command is already sent; await the handle to observe its reply"]
pub struct CommandHandle {
    name: &'static str,
    state: HandleState,
}

impl CommandHandle {
    pub(crate) fn sent(name: &'static str) -> Self {
        Self {
            name,
            state: HandleState::Sent,
        }
    }

    pub(crate) fn pending(
        name: &'static str,
        msg_id: u32,
        rx: oneshot::Receiver<Result<CommandReply>>,
    ) -> Self {
        Self {
            name,
            state: HandleState::Pending { msg_id, rx },
        }
    }

    /// Method name on the wire.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Message id, for commands sent as Requests.
    pub fn msg_id(&self) -> Option<u32> {
        match &self.state {
            HandleState::Sent => None,
            HandleState::Pending { msg_id, .. } => Some(*msg_id),
        }
    }

    /// Whether a Response is expected for this command.
    pub fn expects_reply(&self) -> bool {
        matches!(self.state, HandleState::Pending { .. })
    }
}

impl Future for CommandHandle {
    type Output = Result<CommandOutcome>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            HandleState::Sent => Poll::Ready(Ok(CommandOutcome::Sent { name: this.name })),
            HandleState::Pending { rx, .. } => match Pin::new(rx).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(Ok(reply))) => Poll::Ready(Ok(CommandOutcome::Acknowledged(reply))),
                Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
                // Sender dropped without an answer: the call was cancelled.
                Poll::Ready(Err(_)) => Poll::Ready(Err(RoomError::RoomClosed)),
            },
        }
    }
}
