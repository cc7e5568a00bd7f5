//! Typed server notifications.
//!
//! Method and `kind` strings are matched exactly once, here, into closed
//! enums. Anything unrecognised lands in an explicit `Unknown` variant so the
//! room can log it and carry on.
//!
//! # Example
//!
//! ```
//! use roomwire_client::codec::{Decoder, Encoder};
//! use roomwire_client::handler::Notification;
//! use roomwire_client::room::RoomStatus;
//!
//! let mut enc = Encoder::new();
//! enc.write_str("Joined");
//! let bytes = enc.into_bytes();
//!
//! let parsed = Notification::parse("RoomStatusChanged", Decoder::new(&bytes)).unwrap();
//! match parsed {
//!     Notification::RoomStatusChanged(change) => assert_eq!(change.status, RoomStatus::Joined),
//!     _ => unreachable!(),
//! }
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::codec::{Decoder, Value};
use crate::error::{Result, RoomError};
use crate::protocol::{keys, methods, MediaProperties};
use crate::room::{MediaRef, Peer, RoomStatus};

/// Payload of `RoomStatusChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: RoomStatus,
    /// Optional server message; an empty string is treated like none.
    pub message: Option<String>,
}

/// The authoritative room state delivered by a `Joined` update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub own_peer_id: u64,
    pub room_id: String,
    pub customer: String,
    pub user_data: Bytes,
    /// Media ids this client may use for its own streams.
    pub media_ids: Vec<u16>,
    pub peers: Vec<Peer>,
}

/// One entry of a `RoomUpdated` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    Joined(RoomSnapshot),
    Left { reason: String },
    PeerJoined(Peer),
    PeerLeft { peer_id: u64 },
    UserDataChanged { user_data: Bytes },
    Unknown { kind: String },
}

/// Payload of `PeerUpdated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerUpdate {
    MediaStarted { peer_id: u64, media: MediaRef },
    MediaStopped { peer_id: u64, media_id: u16 },
    UserDataChanged { peer_id: u64, user_data: Bytes },
    Unknown { peer_id: u64, kind: String },
}

/// One decoded server notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    RoomStatusChanged(StatusChange),
    /// Updates in wire order.
    RoomUpdated(Vec<RoomUpdate>),
    PeerUpdated(PeerUpdate),
    MessageReceived { sender_peer_id: u64, message: Bytes },
    /// Method not known to this client; params kept for logging.
    Unknown { method: String, params: Value },
}

impl Notification {
    /// Decode the params of notification `method`.
    pub fn parse(method: &str, params: Decoder<'_>) -> Result<Self> {
        match method {
            methods::ROOM_STATUS_CHANGED => {
                Ok(Notification::RoomStatusChanged(parse_status_change(params)?))
            }
            methods::ROOM_UPDATED => {
                let mut list = params.map_get(keys::UPDATES)?;
                let mut updates = Vec::new();
                for update in list.array_iter()? {
                    updates.push(parse_room_update(&update?)?);
                }
                Ok(Notification::RoomUpdated(updates))
            }
            methods::PEER_UPDATED => Ok(Notification::PeerUpdated(parse_peer_update(&params)?)),
            methods::MESSAGE_RECEIVED => Ok(Notification::MessageReceived {
                sender_peer_id: params.map_get(keys::SENDER_PEER_ID)?.read_u64()?,
                message: read_blob(&params, keys::MESSAGE)?,
            }),
            other => {
                let mut cursor = params;
                // Params of an unknown method are informational only.
                let params = Value::decode(&mut cursor).unwrap_or(Value::Nil);
                Ok(Notification::Unknown {
                    method: other.to_string(),
                    params,
                })
            }
        }
    }

    /// Method name this notification arrived under.
    pub fn method(&self) -> &str {
        match self {
            Notification::RoomStatusChanged(_) => methods::ROOM_STATUS_CHANGED,
            Notification::RoomUpdated(_) => methods::ROOM_UPDATED,
            Notification::PeerUpdated(_) => methods::PEER_UPDATED,
            Notification::MessageReceived { .. } => methods::MESSAGE_RECEIVED,
            Notification::Unknown { method, .. } => method,
        }
    }
}

fn parse_status_name(name: &str) -> Result<RoomStatus> {
    match name {
        "Joining" => Ok(RoomStatus::Joining),
        "Joined" => Ok(RoomStatus::Joined),
        "Closed" => Ok(RoomStatus::Closed),
        other => Err(RoomError::Protocol(format!("Unknown room status {:?}", other))),
    }
}

/// Accepts a bare status string or a `{status, message?}` map.
fn parse_status_change(params: Decoder<'_>) -> Result<StatusChange> {
    let mut cursor = params;
    if cursor.peek_marker()?.is_str() {
        return Ok(StatusChange {
            status: parse_status_name(cursor.read_str()?)?,
            message: None,
        });
    }
    let status = parse_status_name(params.map_get(keys::STATUS)?.read_str()?)?;
    let message = match params.map_find(keys::MESSAGE)? {
        Some(mut value) if value.peek_marker()?.is_str() => Some(value.read_string()?),
        _ => None,
    };
    Ok(StatusChange { status, message })
}

fn parse_room_update(update: &Decoder<'_>) -> Result<RoomUpdate> {
    let kind = update.map_get(keys::KIND)?.read_str()?;
    match kind {
        "Joined" => Ok(RoomUpdate::Joined(parse_snapshot(update)?)),
        "Left" => Ok(RoomUpdate::Left {
            reason: parse_left_reason(update)?,
        }),
        "PeerJoined" => Ok(RoomUpdate::PeerJoined(parse_peer(&update.map_get(keys::PEER)?)?)),
        "PeerLeft" => Ok(RoomUpdate::PeerLeft {
            peer_id: update.map_get(keys::PEER_ID)?.read_u64()?,
        }),
        "UserDataChanged" => Ok(RoomUpdate::UserDataChanged {
            user_data: read_blob(update, keys::USER_DATA)?,
        }),
        other => Ok(RoomUpdate::Unknown {
            kind: other.to_string(),
        }),
    }
}

fn parse_left_reason(update: &Decoder<'_>) -> Result<String> {
    let Some(mut reason) = update.map_find(keys::REASON)? else {
        return Ok("no reason given".to_string());
    };
    let marker = reason.peek_marker()?;
    if marker.is_str() {
        let text = reason.read_string()?;
        if !text.is_empty() {
            return Ok(text);
        }
        return Ok("no reason given".to_string());
    }
    Ok(format!("unrecognized reason ({})", marker.family()))
}

fn parse_snapshot(update: &Decoder<'_>) -> Result<RoomSnapshot> {
    let own_peer_id = update.map_get(keys::OWN_PEER_ID)?.read_u64()?;
    let room = update.map_get(keys::ROOM)?;

    let room_id = room.map_get(keys::ID)?.read_string()?;
    let customer = match room.map_find(keys::CUSTOMER)? {
        Some(mut value) => value.read_string()?,
        None => String::new(),
    };
    let user_data = read_blob(&room, keys::USER_DATA)?;

    let mut peers = Vec::new();
    if let Some(mut list) = room.map_find(keys::PEERS)? {
        for peer in list.array_iter()? {
            peers.push(parse_peer(&peer?)?);
        }
    }

    let mut media_ids = Vec::new();
    if let Some(mut list) = update.map_find(keys::MEDIA_IDS)? {
        for id in list.array_iter()? {
            media_ids.push(id?.read_u16()?);
        }
    }

    Ok(RoomSnapshot {
        own_peer_id,
        room_id,
        customer,
        user_data,
        media_ids,
        peers,
    })
}

fn parse_peer(peer: &Decoder<'_>) -> Result<Peer> {
    let id = peer.map_get(keys::ID)?.read_u64()?;
    let user_id = match peer.map_find(keys::USER_ID)? {
        Some(mut value) => value.read_string()?,
        None => String::new(),
    };
    let user_data = read_blob(peer, keys::USER_DATA)?;

    let mut medias = BTreeMap::new();
    if let Some(mut list) = peer.map_find(keys::MEDIAS)? {
        for media in list.array_iter()? {
            let media = parse_media(&media?)?;
            medias.insert(media.id, media);
        }
    }

    Ok(Peer {
        id,
        user_id,
        user_data,
        medias,
    })
}

/// `{id, properties?, paused?}`
fn parse_media(media: &Decoder<'_>) -> Result<MediaRef> {
    let id = media.map_get(keys::ID)?.read_u16()?;
    let properties = match media.map_find(keys::PROPERTIES)? {
        Some(props) if props.peek_marker()?.is_map() => MediaProperties::decode(&props)?,
        _ => MediaProperties::default(),
    };
    let paused = match media.map_find(keys::PAUSED)? {
        Some(mut value) if !value.peek_is_nil() => value.read_bool()?,
        _ => false,
    };
    Ok(MediaRef {
        id,
        kind: properties.kind,
        uid: properties.uid,
        paused,
    })
}

fn parse_peer_update(params: &Decoder<'_>) -> Result<PeerUpdate> {
    let peer_id = params.map_get(keys::PEER_ID)?.read_u64()?;
    let kind = params.map_get(keys::KIND)?.read_str()?;
    match kind {
        "MediaStarted" => Ok(PeerUpdate::MediaStarted {
            peer_id,
            media: parse_media(&params.map_get(keys::MEDIA)?)?,
        }),
        "MediaStopped" => Ok(PeerUpdate::MediaStopped {
            peer_id,
            media_id: params.map_get(keys::MEDIA_ID)?.read_u16()?,
        }),
        "UserDataChanged" => Ok(PeerUpdate::UserDataChanged {
            peer_id,
            user_data: read_blob(params, keys::USER_DATA)?,
        }),
        other => Ok(PeerUpdate::Unknown {
            peer_id,
            kind: other.to_string(),
        }),
    }
}

/// Binary, string or nil under `key`; missing reads as empty.
fn read_blob(map: &Decoder<'_>, key: &str) -> Result<Bytes> {
    match map.map_find(key)? {
        Some(mut value) => Ok(Bytes::copy_from_slice(value.read_bytes()?)),
        None => Ok(Bytes::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;

    fn encoded(value: Value) -> Vec<u8> {
        value.to_vec()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
        )
    }

    fn parse(method: &str, params: Value) -> Result<Notification> {
        let bytes = encoded(params);
        Notification::parse(method, Decoder::new(&bytes))
    }

    #[test]
    fn test_status_bare_string_and_map() {
        let bare = parse("RoomStatusChanged", Value::from("Joining")).unwrap();
        assert_eq!(
            bare,
            Notification::RoomStatusChanged(StatusChange {
                status: RoomStatus::Joining,
                message: None
            })
        );

        let keyed = parse(
            "RoomStatusChanged",
            map(vec![
                ("status", Value::from("Closed")),
                ("message", Value::from("kicked")),
            ]),
        )
        .unwrap();
        assert_eq!(
            keyed,
            Notification::RoomStatusChanged(StatusChange {
                status: RoomStatus::Closed,
                message: Some("kicked".into())
            })
        );
    }

    #[test]
    fn test_unknown_status_is_protocol_error() {
        let err = parse("RoomStatusChanged", Value::from("Dancing")).unwrap_err();
        assert!(matches!(err, RoomError::Protocol(_)));
    }

    #[test]
    fn test_joined_snapshot() {
        let params = map(vec![(
            "updates",
            Value::Array(vec![map(vec![
                ("kind", Value::from("Joined")),
                ("own_peer_id", Value::from(2u64)),
                ("media_ids", Value::Array(vec![Value::from(10u64), Value::from(11u64)])),
                (
                    "room",
                    map(vec![
                        ("id", Value::from("lobby")),
                        ("customer", Value::from("acme")),
                        ("user_data", Value::from(vec![1u8, 2])),
                        (
                            "peers",
                            Value::Array(vec![map(vec![
                                ("id", Value::from(1u64)),
                                ("user_id", Value::from("alice")),
                                ("user_data", Value::Bin(vec![])),
                                (
                                    "medias",
                                    Value::Array(vec![map(vec![
                                        ("id", Value::from(5u64)),
                                        (
                                            "properties",
                                            map(vec![
                                                ("kind", Value::from("audio")),
                                                ("uid", Value::from("mic")),
                                            ]),
                                        ),
                                        ("paused", Value::from(true)),
                                    ])]),
                                ),
                            ])]),
                        ),
                    ]),
                ),
            ])]),
        )]);

        let Notification::RoomUpdated(updates) = parse("RoomUpdated", params).unwrap() else {
            panic!("expected RoomUpdated");
        };
        let [RoomUpdate::Joined(snapshot)] = updates.as_slice() else {
            panic!("expected one Joined update");
        };
        assert_eq!(snapshot.own_peer_id, 2);
        assert_eq!(snapshot.room_id, "lobby");
        assert_eq!(snapshot.customer, "acme");
        assert_eq!(snapshot.user_data.as_ref(), &[1, 2]);
        assert_eq!(snapshot.media_ids, vec![10, 11]);
        let peer = &snapshot.peers[0];
        assert_eq!(peer.id, 1);
        assert_eq!(peer.user_id, "alice");
        let media = &peer.medias[&5];
        assert_eq!(media.kind.as_deref(), Some("audio"));
        assert_eq!(media.uid.as_deref(), Some("mic"));
        assert!(media.paused);
    }

    #[test]
    fn test_left_reason_fallbacks() {
        let with_reason = |reason: Option<Value>| {
            let mut entries = vec![("kind", Value::from("Left"))];
            if let Some(reason) = reason {
                entries.push(("reason", reason));
            }
            let params = map(vec![("updates", Value::Array(vec![map(entries)]))]);
            match parse("RoomUpdated", params).unwrap() {
                Notification::RoomUpdated(mut updates) => updates.remove(0),
                other => panic!("unexpected {:?}", other),
            }
        };

        assert_eq!(
            with_reason(Some(Value::from("kicked"))),
            RoomUpdate::Left { reason: "kicked".into() }
        );
        assert_eq!(
            with_reason(None),
            RoomUpdate::Left { reason: "no reason given".into() }
        );
        assert_eq!(
            with_reason(Some(Value::UInt(3))),
            RoomUpdate::Left { reason: "unrecognized reason (integer)".into() }
        );
    }

    #[test]
    fn test_peer_updates() {
        let started = parse(
            "PeerUpdated",
            map(vec![
                ("peer_id", Value::from(1u64)),
                ("kind", Value::from("MediaStarted")),
                ("media", map(vec![("id", Value::from(7u64))])),
            ]),
        )
        .unwrap();
        assert_eq!(
            started,
            Notification::PeerUpdated(PeerUpdate::MediaStarted {
                peer_id: 1,
                media: MediaRef {
                    id: 7,
                    kind: None,
                    uid: None,
                    paused: false
                }
            })
        );

        let stopped = parse(
            "PeerUpdated",
            map(vec![
                ("peer_id", Value::from(1u64)),
                ("kind", Value::from("MediaStopped")),
                ("media_id", Value::from(7u64)),
            ]),
        )
        .unwrap();
        assert_eq!(
            stopped,
            Notification::PeerUpdated(PeerUpdate::MediaStopped { peer_id: 1, media_id: 7 })
        );

        let unknown = parse(
            "PeerUpdated",
            map(vec![
                ("peer_id", Value::from(1u64)),
                ("kind", Value::from("Waved")),
            ]),
        )
        .unwrap();
        assert_eq!(
            unknown,
            Notification::PeerUpdated(PeerUpdate::Unknown { peer_id: 1, kind: "Waved".into() })
        );
    }

    #[test]
    fn test_message_received_accepts_str_or_bin() {
        for message in [Value::from("hi"), Value::from(b"hi".to_vec())] {
            let parsed = parse(
                "MessageReceived",
                map(vec![("sender_peer_id", Value::from(4u64)), ("message", message)]),
            )
            .unwrap();
            assert_eq!(
                parsed,
                Notification::MessageReceived {
                    sender_peer_id: 4,
                    message: Bytes::from_static(b"hi")
                }
            );
        }
    }

    #[test]
    fn test_unknown_method_keeps_params() {
        let parsed = parse("Teleported", map(vec![("x", Value::from(1u64))])).unwrap();
        assert_eq!(parsed.method(), "Teleported");
        assert!(matches!(parsed, Notification::Unknown { params: Value::Map(_), .. }));
    }

    #[test]
    fn test_truncated_update_is_decode_error() {
        let mut enc = Encoder::new();
        enc.write_map_len(1);
        enc.write_str("updates");
        enc.write_array_len(2);
        enc.write_nil();
        let bytes = enc.into_bytes();
        let err = Notification::parse("RoomUpdated", Decoder::new(&bytes)).unwrap_err();
        assert!(matches!(err, RoomError::Decode(_)));
    }
}
