//! Request/response correlation.
//!
//! - [`CorrelationTable`] - message ids and the calls awaiting a Response
//! - [`CommandHandle`] - future returned by every room command

mod command;
mod pending;

pub use command::{CommandHandle, CommandOutcome, CommandReply};
pub use pending::{CorrelationTable, PendingCall};
