//! Protocol module - RPC frame layout, building and classification.
//!
//! - Three fixed-shape frames: Request, Response, Notification
//! - Builders that write frames with a caller-supplied params closure
//! - [`IncomingFrame`] classification with lazy params

mod frame;
mod wire_format;

pub use frame::{
    build_notification, build_request, build_response, IncomingFrame, MediaProperties,
    ReplyValue,
};
pub use wire_format::{index, keys, methods, FrameType, DEFAULT_REQUEST_REJECTION};
