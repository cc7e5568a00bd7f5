//! Room state and how notifications change it.
//!
//! [`RoomState`] is plain data: applying a [`Notification`] mutates it and
//! appends the resulting [`RoomEvent`]s to a caller-supplied buffer. Locking,
//! correlation and event dispatch live in the session.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use bytes::Bytes;

use super::session::CLOSED_BY_SERVER;
use crate::handler::{Notification, PeerUpdate, RoomEvent, RoomSnapshot, RoomUpdate, StatusChange};
use crate::protocol::MediaProperties;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoomStatus {
    #[default]
    Unjoined,
    Joining,
    Joined,
    Closed,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomStatus::Unjoined => "Unjoined",
            RoomStatus::Joining => "Joining",
            RoomStatus::Joined => "Joined",
            RoomStatus::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Control-plane record of one remote media stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub id: u16,
    pub kind: Option<String>,
    pub uid: Option<String>,
    pub paused: bool,
}

impl MediaRef {
    pub fn properties(&self) -> MediaProperties {
        MediaProperties {
            kind: self.kind.clone(),
            uid: self.uid.clone(),
        }
    }
}

/// One remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: u64,
    pub user_id: String,
    pub user_data: Bytes,
    pub medias: BTreeMap<u16, MediaRef>,
}

/// A media this client started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMedia {
    pub id: u16,
    pub properties: MediaProperties,
    pub paused: bool,
}

/// Everything the session knows about its room.
#[derive(Debug, Default)]
pub(crate) struct RoomState {
    /// Room id the application asked to join.
    pub name: String,
    /// Room id from the last snapshot.
    pub id: Option<String>,
    pub customer: String,
    pub own_peer_id: Option<u64>,
    pub status: RoomStatus,
    pub user_data: Bytes,
    pub peers: BTreeMap<u64, Peer>,
    pub input_media: BTreeMap<u16, InputMedia>,
    pub free_media_ids: VecDeque<u16>,
    /// Set once the application asked to leave; a bare `Closed` is then expected.
    pub leave_requested: bool,
}

impl RoomState {
    /// Apply one notification. Returns `true` if the room closed as a result.
    pub fn apply(&mut self, notification: Notification, events: &mut Vec<RoomEvent>) -> bool {
        match notification {
            Notification::RoomStatusChanged(change) => self.apply_status(change, events),
            Notification::RoomUpdated(updates) => {
                let total = updates.len();
                for (index, update) in updates.into_iter().enumerate() {
                    if self.apply_room_update(update, events) {
                        if index + 1 < total {
                            tracing::debug!(
                                "Ignoring {} room updates after Left",
                                total - index - 1
                            );
                        }
                        return true;
                    }
                }
                false
            }
            Notification::PeerUpdated(update) => {
                self.apply_peer_update(update, events);
                false
            }
            Notification::MessageReceived {
                sender_peer_id,
                message,
            } => {
                events.push(RoomEvent::MessageReceived {
                    sender_peer_id,
                    message,
                });
                false
            }
            Notification::Unknown { method, params } => {
                tracing::warn!("Ignoring unknown notification {}: {:?}", method, params);
                false
            }
        }
    }

    /// Move to `new`, raising `StatusChanged` if it differs.
    pub fn set_status(
        &mut self,
        new: RoomStatus,
        message: Option<String>,
        events: &mut Vec<RoomEvent>,
    ) {
        let old = self.status;
        if old == new {
            return;
        }
        self.status = new;
        if new != RoomStatus::Closed {
            self.leave_requested = false;
        }
        events.push(RoomEvent::StatusChanged { old, new, message });
    }

    /// Forget the previous session and start over for room `name`.
    ///
    /// The status is kept so the next transition reports where it came from.
    pub fn reset(&mut self, name: String) {
        *self = RoomState {
            name,
            status: self.status,
            ..Default::default()
        };
    }

    /// Close the room. Returns `false` if it was already closed.
    pub fn close(&mut self, message: Option<String>, events: &mut Vec<RoomEvent>) -> bool {
        if self.status == RoomStatus::Closed {
            return false;
        }
        self.set_status(RoomStatus::Closed, message, events);
        self.input_media.clear();
        true
    }

    fn apply_status(&mut self, change: StatusChange, events: &mut Vec<RoomEvent>) -> bool {
        let message = change.message.filter(|m| !m.is_empty());
        match change.status {
            RoomStatus::Closed => {
                if self.status == RoomStatus::Joined && !self.leave_requested && message.is_none() {
                    let detail = format!(
                        "room {:?} closed by server while joined without a leave request or message",
                        self.name
                    );
                    tracing::error!("{}", detail);
                    events.push(RoomEvent::InconsistentClose { detail });
                }
                if !self.close(message.clone(), events) {
                    return false;
                }
                events.push(RoomEvent::Left {
                    reason: message.unwrap_or_else(|| CLOSED_BY_SERVER.to_string()),
                });
                true
            }
            status => {
                self.set_status(status, message, events);
                false
            }
        }
    }

    fn apply_room_update(&mut self, update: RoomUpdate, events: &mut Vec<RoomEvent>) -> bool {
        match update {
            RoomUpdate::Joined(snapshot) => {
                self.apply_snapshot(snapshot, events);
                false
            }
            RoomUpdate::Left { reason } => {
                self.close(Some(reason.clone()), events);
                events.push(RoomEvent::Left { reason });
                true
            }
            RoomUpdate::PeerJoined(peer) => {
                if self.peers.contains_key(&peer.id) {
                    tracing::warn!("PeerJoined for known peer {}, replacing", peer.id);
                }
                self.peers.insert(peer.id, peer.clone());
                events.push(RoomEvent::PeerJoined { peer });
                false
            }
            RoomUpdate::PeerLeft { peer_id } => {
                match self.peers.remove(&peer_id) {
                    Some(peer) => events.push(RoomEvent::PeerLeft { peer }),
                    None => tracing::warn!("PeerLeft for unknown peer {}", peer_id),
                }
                false
            }
            RoomUpdate::UserDataChanged { user_data } => {
                self.user_data = user_data.clone();
                events.push(RoomEvent::RoomUserDataChanged { user_data });
                false
            }
            RoomUpdate::Unknown { kind } => {
                tracing::warn!("Ignoring unknown room update kind {}", kind);
                false
            }
        }
    }

    /// Replace everything from the authoritative snapshot.
    fn apply_snapshot(&mut self, snapshot: RoomSnapshot, events: &mut Vec<RoomEvent>) {
        self.own_peer_id = Some(snapshot.own_peer_id);
        self.id = Some(snapshot.room_id.clone());
        self.customer = snapshot.customer;
        self.user_data = snapshot.user_data;
        self.free_media_ids = snapshot.media_ids.into_iter().collect();
        self.input_media.clear();
        self.peers = snapshot
            .peers
            .iter()
            .map(|peer| (peer.id, peer.clone()))
            .collect();

        self.set_status(RoomStatus::Joined, None, events);
        events.push(RoomEvent::Joined {
            room_id: snapshot.room_id,
            own_peer_id: snapshot.own_peer_id,
            peers: snapshot.peers,
        });
    }

    fn apply_peer_update(&mut self, update: PeerUpdate, events: &mut Vec<RoomEvent>) {
        match update {
            PeerUpdate::MediaStarted { peer_id, media } => {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    tracing::warn!("MediaStarted for unknown peer {}", peer_id);
                    return;
                };
                peer.medias.insert(media.id, media.clone());
                events.push(RoomEvent::MediaStarted { peer_id, media });
            }
            PeerUpdate::MediaStopped { peer_id, media_id } => {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    tracing::warn!("MediaStopped for unknown peer {}", peer_id);
                    return;
                };
                match peer.medias.remove(&media_id) {
                    Some(media) => events.push(RoomEvent::MediaStopped { peer_id, media }),
                    None => tracing::warn!(
                        "MediaStopped for unknown media {} of peer {}",
                        media_id,
                        peer_id
                    ),
                }
            }
            PeerUpdate::UserDataChanged { peer_id, user_data } => {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    tracing::warn!("UserDataChanged for unknown peer {}", peer_id);
                    return;
                };
                peer.user_data = user_data.clone();
                events.push(RoomEvent::PeerUserDataChanged { peer_id, user_data });
            }
            PeerUpdate::Unknown { peer_id, kind } => {
                tracing::warn!("Ignoring unknown update kind {} for peer {}", kind, peer_id);
            }
        }
    }
}
