//! Frame building and classification.
//!
//! Outbound frames are written straight into an [`Encoder`]; the caller
//! supplies a closure that writes the params value. Inbound frames are
//! classified with [`IncomingFrame::parse`], which reads only the fixed
//! header positions and hands back a cursor at the params so notification
//! payloads are decoded lazily.
//!
//! # Example
//!
//! ```
//! use roomwire_client::protocol::{build_request, IncomingFrame};
//!
//! let bytes = build_request(7, "StopMedia", |enc| {
//!     enc.write_map_len(1);
//!     enc.write_str("media_id");
//!     enc.write_uint(3);
//! });
//!
//! match IncomingFrame::parse(&bytes).unwrap() {
//!     IncomingFrame::Request { msg_id, method, .. } => {
//!         assert_eq!(msg_id, 7);
//!         assert_eq!(method, "StopMedia");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use bytes::Bytes;

use super::wire_format::{index, keys, FrameType};
use crate::codec::{Decoder, Encoder};
use crate::error::{Result, RoomError};

/// Stream properties attached to a media (what it carries and who owns it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaProperties {
    pub kind: Option<String>,
    pub uid: Option<String>,
}

impl MediaProperties {
    /// Properties for an audio stream.
    pub fn audio(uid: impl Into<String>) -> Self {
        Self {
            kind: Some("audio".to_string()),
            uid: Some(uid.into()),
        }
    }

    /// Write as a map, omitting absent fields.
    pub fn encode(&self, enc: &mut Encoder) -> usize {
        let len = self.kind.is_some() as u32 + self.uid.is_some() as u32;
        let mut n = enc.write_map_len(len);
        if let Some(kind) = &self.kind {
            n += enc.write_str(keys::KIND);
            n += enc.write_str(kind);
        }
        if let Some(uid) = &self.uid {
            n += enc.write_str(keys::UID);
            n += enc.write_str(uid);
        }
        n
    }

    /// Read from a map. Fields that are missing or not strings are `None`.
    pub fn decode(dec: &Decoder<'_>) -> Result<Self> {
        Ok(Self {
            kind: optional_string(dec, keys::KIND)?,
            uid: optional_string(dec, keys::UID)?,
        })
    }
}

fn optional_string(map: &Decoder<'_>, key: &str) -> Result<Option<String>> {
    let Some(mut value) = map.map_find(key)? else {
        return Ok(None);
    };
    if value.peek_marker()?.is_str() {
        Ok(Some(value.read_string()?))
    } else {
        Ok(None)
    }
}

/// The polymorphic `result` slot of a Response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReplyValue {
    /// Nil or any shape this client does not interpret.
    #[default]
    Empty,
    /// A plain string result.
    Text(String),
    /// A map carrying a `properties` sub-map.
    MediaProperties(MediaProperties),
}

impl ReplyValue {
    fn decode(dec: &Decoder<'_>) -> Result<Self> {
        let mut cursor = *dec;
        let marker = cursor.peek_marker()?;
        if marker.is_str() {
            return Ok(ReplyValue::Text(cursor.read_string()?));
        }
        if marker.is_map() {
            if let Some(props) = cursor.map_find(keys::PROPERTIES)? {
                if props.peek_marker()?.is_map() {
                    return Ok(ReplyValue::MediaProperties(MediaProperties::decode(&props)?));
                }
            }
        }
        Ok(ReplyValue::Empty)
    }

    fn encode(&self, enc: &mut Encoder) -> usize {
        match self {
            ReplyValue::Empty => enc.write_nil(),
            ReplyValue::Text(text) => enc.write_str(text),
            ReplyValue::MediaProperties(props) => {
                enc.write_map_len(1) + enc.write_str(keys::PROPERTIES) + props.encode(enc)
            }
        }
    }
}

/// One classified inbound frame.
///
/// Request and Notification params stay undecoded: `params` is a cursor at
/// the params value inside the original buffer.
#[derive(Debug, Clone)]
pub enum IncomingFrame<'a> {
    Request {
        msg_id: u32,
        method: &'a str,
        params: Decoder<'a>,
    },
    Response {
        msg_id: u32,
        error: Option<String>,
        result: ReplyValue,
    },
    Notification {
        method: &'a str,
        params: Decoder<'a>,
    },
}

impl<'a> IncomingFrame<'a> {
    /// Classify one complete frame.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let frame = Decoder::new(bytes);
        let len = Decoder::new(bytes).read_array_len()?;
        let frame_type = FrameType::try_from(frame.array_at(index::TYPE)?.read_i64()?)?;
        if len < frame_type.arity() as usize {
            return Err(RoomError::Protocol(format!(
                "{:?} frame has {} elements, expected {}",
                frame_type,
                len,
                frame_type.arity()
            )));
        }

        match frame_type {
            FrameType::Request => Ok(IncomingFrame::Request {
                msg_id: frame.array_at(index::MSG_ID)?.read_u32()?,
                method: frame.array_at(index::REQUEST_METHOD)?.read_str()?,
                params: frame.array_at(index::REQUEST_PARAMS)?,
            }),
            FrameType::Response => {
                let msg_id = frame.array_at(index::MSG_ID)?.read_u32()?;
                let mut error_slot = frame.array_at(index::RESPONSE_ERROR)?;
                let error = if error_slot.try_read_nil() {
                    None
                } else {
                    Some(error_slot.read_string()?)
                };
                let result = ReplyValue::decode(&frame.array_at(index::RESPONSE_RESULT)?)?;
                Ok(IncomingFrame::Response {
                    msg_id,
                    error,
                    result,
                })
            }
            FrameType::Notification => Ok(IncomingFrame::Notification {
                method: frame.array_at(index::NOTIFICATION_METHOD)?.read_str()?,
                params: frame.array_at(index::NOTIFICATION_PARAMS)?,
            }),
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            IncomingFrame::Request { .. } => FrameType::Request,
            IncomingFrame::Response { .. } => FrameType::Response,
            IncomingFrame::Notification { .. } => FrameType::Notification,
        }
    }
}

/// Build a Request frame: `[0, msg_id, method, params]`.
pub fn build_request<F>(msg_id: u32, method: &str, write_params: F) -> Bytes
where
    F: FnOnce(&mut Encoder),
{
    let mut enc = Encoder::new();
    enc.write_array_len(FrameType::Request.arity());
    enc.write_int(FrameType::Request.as_i64());
    enc.write_uint(msg_id as u64);
    enc.write_str(method);
    write_params(&mut enc);
    enc.into_bytes()
}

/// Build a Notification frame: `[2, method, params]`.
pub fn build_notification<F>(method: &str, write_params: F) -> Bytes
where
    F: FnOnce(&mut Encoder),
{
    let mut enc = Encoder::new();
    enc.write_array_len(FrameType::Notification.arity());
    enc.write_int(FrameType::Notification.as_i64());
    enc.write_str(method);
    write_params(&mut enc);
    enc.into_bytes()
}

/// Build a Response frame: `[1, msg_id, error, result]`.
pub fn build_response(msg_id: u32, error: Option<&str>, result: &ReplyValue) -> Bytes {
    let mut enc = Encoder::new();
    enc.write_array_len(FrameType::Response.arity());
    enc.write_int(FrameType::Response.as_i64());
    enc.write_uint(msg_id as u64);
    match error {
        Some(message) => enc.write_str(message),
        None => enc.write_nil(),
    };
    result.encode(&mut enc);
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;

    #[test]
    fn test_request_shape() {
        let bytes = build_request(42, "PauseMedia", |enc| {
            enc.write_nil();
        });
        let value = Value::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::UInt(0),
                Value::UInt(42),
                Value::from("PauseMedia"),
                Value::Nil,
            ])
        );
    }

    #[test]
    fn test_notification_shape() {
        let bytes = build_notification("SendMessage", |enc| {
            enc.write_map_len(0);
        });
        assert_eq!(bytes[0], 0x93);
        assert_eq!(bytes[1], 0x02);
        match IncomingFrame::parse(&bytes).unwrap() {
            IncomingFrame::Notification { method, mut params } => {
                assert_eq!(method, "SendMessage");
                assert_eq!(params.read_map_len().unwrap(), 0);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_response_shape() {
        let bytes = build_response(9, Some("nope"), &ReplyValue::Empty);
        assert_eq!(bytes[0], 0x94);
        assert_eq!(bytes[1], 0x01);
        match IncomingFrame::parse(&bytes).unwrap() {
            IncomingFrame::Response {
                msg_id,
                error,
                result,
            } => {
                assert_eq!(msg_id, 9);
                assert_eq!(error.as_deref(), Some("nope"));
                assert_eq!(result, ReplyValue::Empty);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_response_result_variants() {
        let props = MediaProperties::audio("mic-1");
        for expected in [
            ReplyValue::Empty,
            ReplyValue::Text("ok".to_string()),
            ReplyValue::MediaProperties(props),
        ] {
            let bytes = build_response(1, None, &expected);
            match IncomingFrame::parse(&bytes).unwrap() {
                IncomingFrame::Response { result, error, .. } => {
                    assert!(error.is_none());
                    assert_eq!(result, expected);
                }
                other => panic!("unexpected frame {:?}", other),
            }
        }
    }

    #[test]
    fn test_unrecognised_result_is_empty() {
        // Map without `properties`, and an integer result
        for write in [
            Box::new(|e: &mut Encoder| {
                e.write_map_len(1);
                e.write_str("other");
                e.write_uint(1);
            }) as Box<dyn Fn(&mut Encoder)>,
            Box::new(|e: &mut Encoder| {
                e.write_uint(5);
            }),
        ] {
            let mut enc = Encoder::new();
            enc.write_array_len(4);
            enc.write_uint(1);
            enc.write_uint(3);
            enc.write_nil();
            write(&mut enc);
            match IncomingFrame::parse(enc.as_slice()).unwrap() {
                IncomingFrame::Response { result, .. } => assert_eq!(result, ReplyValue::Empty),
                other => panic!("unexpected frame {:?}", other),
            }
        }
    }

    #[test]
    fn test_msg_id_width_tolerated() {
        // Server encodes the id as uint32 even though it would fit a fixint
        let mut enc = Encoder::new();
        enc.write_array_len(4);
        enc.write_u8(1);
        enc.write_u32(5);
        enc.write_nil();
        enc.write_nil();
        match IncomingFrame::parse(enc.as_slice()).unwrap() {
            IncomingFrame::Response { msg_id, .. } => assert_eq!(msg_id, 5),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_short_frame_rejected() {
        let mut enc = Encoder::new();
        enc.write_array_len(2);
        enc.write_uint(1);
        enc.write_uint(5);
        assert!(matches!(
            IncomingFrame::parse(enc.as_slice()),
            Err(RoomError::Protocol(_))
        ));
    }

    #[test]
    fn test_not_an_array_rejected() {
        assert!(matches!(
            IncomingFrame::parse(&[0x81, 0xa1, b'a', 0x01]),
            Err(RoomError::Decode(_))
        ));
        assert!(matches!(IncomingFrame::parse(&[]), Err(RoomError::Decode(_))));
    }

    #[test]
    fn test_unknown_discriminant_rejected() {
        let mut enc = Encoder::new();
        enc.write_array_len(3);
        enc.write_uint(9);
        enc.write_str("x");
        enc.write_nil();
        assert!(matches!(
            IncomingFrame::parse(enc.as_slice()),
            Err(RoomError::Protocol(_))
        ));
    }

    #[test]
    fn test_media_properties_partial() {
        let mut enc = Encoder::new();
        enc.write_map_len(2);
        enc.write_str("kind");
        enc.write_str("audio");
        enc.write_str("uid");
        enc.write_uint(4);
        let props = MediaProperties::decode(&Decoder::new(enc.as_slice())).unwrap();
        assert_eq!(props.kind.as_deref(), Some("audio"));
        assert_eq!(props.uid, None);
    }
}
