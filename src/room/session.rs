//! The room session.
//!
//! A [`Room`] owns the state of one room connection, the correlation table
//! for its Requests, and the outbound [`Transport`]. The host feeds inbound
//! bytes in with [`Room::handle_rpc_bytes`] and
//! [`Room::handle_datagram_bytes`]; commands go out synchronously and return
//! a [`CommandHandle`] to await.
//!
//! All state changes for a room happen under one lock. Inbound bytes that
//! find the lock taken (another thread, or a transport answering from
//! inside a send) are queued and applied in arrival order by whoever holds
//! it, once it lets go. Events are queued under the lock in the order the
//! state produced them and handed to the [`EventHandler`] after it is
//! released, one at a time.
//!
//! # Example
//!
//! ```
//! use roomwire_client::room::{JoinParams, Room, RoomStatus};
//! use roomwire_client::transport::ChannelTransport;
//!
//! let (transport, mut outbound) = ChannelTransport::with_default_capacity();
//! let room = Room::builder().build(transport);
//!
//! let _join = room.join(JoinParams::new("lobby")).unwrap();
//! assert_eq!(room.status(), RoomStatus::Joining);
//! assert!(outbound.try_recv().is_some());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;

use super::builder::RoomBuilder;
use super::state::{InputMedia, Peer, RoomState, RoomStatus};
use crate::codec::{Encoder, MsgPackCodec};
use crate::config::SessionConfig;
use crate::error::{Result, RoomError};
use crate::handler::{EventHandler, Notification, RoomEvent};
use crate::protocol::{
    build_notification, build_request, build_response, keys, methods, IncomingFrame,
    MediaProperties, ReplyValue,
};
use crate::rpc::{CommandHandle, CorrelationTable};
use crate::transport::{Cipher, Transport};

/// Reason attached to `Left` when the application closes the room.
pub const LEFT_BY_APPLICATION: &str = "left by application";

/// Reason attached to `Left` when the server closes the room without a message.
pub const CLOSED_BY_SERVER: &str = "closed by server";

/// Reason attached to `Left` when the transport goes away.
pub const TRANSPORT_CLOSED: &str = "transport closed";

/// Parameters of `JoinRoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinParams {
    pub room_id: String,
    pub user_data: Bytes,
    pub position: [f32; 3],
}

impl JoinParams {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            user_data: Bytes::new(),
            position: [0.0; 3],
        }
    }

    pub fn user_data(mut self, user_data: impl Into<Bytes>) -> Self {
        self.user_data = user_data.into();
        self
    }

    pub fn position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }
}

/// Bytes handed in by the host, waiting for the state lock.
#[derive(Debug)]
enum Inbound {
    Rpc(Bytes),
    Datagram(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Request,
    Notification,
}

/// One room connection.
pub struct Room {
    state: Mutex<RoomState>,
    inbound: Mutex<VecDeque<Inbound>>,
    outbox: Mutex<VecDeque<RoomEvent>>,
    dispatching: AtomicBool,
    calls: CorrelationTable,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventHandler>,
    cipher: Option<Arc<dyn Cipher>>,
    config: SessionConfig,
}

impl Room {
    /// Create a new room builder.
    pub fn builder() -> RoomBuilder {
        RoomBuilder::new()
    }

    pub(crate) fn from_parts(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventHandler>,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Self {
        Self {
            state: Mutex::new(RoomState::default()),
            inbound: Mutex::new(VecDeque::new()),
            outbox: Mutex::new(VecDeque::new()),
            dispatching: AtomicBool::new(false),
            calls: CorrelationTable::new(config.max_pending_calls),
            transport,
            events,
            cipher,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Send `JoinRoom` and move to `Joining`.
    ///
    /// Allowed from `Unjoined` and `Closed`. Whatever the previous session
    /// left behind (roster, media-id pool, snapshot fields) is dropped. The
    /// room becomes `Joined` when the server's snapshot (or a `Joined`
    /// status) arrives.
    pub fn join(&self, params: JoinParams) -> Result<CommandHandle> {
        self.with_state(|state, events| {
            if matches!(state.status, RoomStatus::Joining | RoomStatus::Joined) {
                return Err(RoomError::AlreadyJoined(state.status));
            }
            let handle =
                self.issue(state, events, methods::JOIN_ROOM, Delivery::Request, |enc| {
                    enc.write_map_len(3);
                    enc.write_str(keys::ROOM_ID);
                    enc.write_str(&params.room_id);
                    enc.write_str(keys::USER_DATA);
                    enc.write_bin(&params.user_data);
                    enc.write_str(keys::POSITION);
                    write_coordinates(enc, params.position);
                })?;
            state.reset(params.room_id);
            state.set_status(RoomStatus::Joining, None, events);
            Ok(handle)
        })
    }

    /// Take the next media id from the pool handed out on join.
    pub fn allocate_media_id(&self) -> Result<u16> {
        self.with_joined(|state, _| {
            state
                .free_media_ids
                .pop_front()
                .ok_or(RoomError::NoFreeMediaId)
        })
    }

    /// Announce a local media stream under `media_id`.
    pub fn start_media(
        &self,
        media_id: u16,
        properties: MediaProperties,
    ) -> Result<CommandHandle> {
        self.with_joined(|state, events| {
            let handle =
                self.issue(state, events, methods::START_MEDIA, Delivery::Request, |enc| {
                    enc.write_map_len(2);
                    enc.write_str(keys::MEDIA_ID);
                    enc.write_uint(media_id as u64);
                    enc.write_str(keys::PROPERTIES);
                    properties.encode(enc);
                })?;
            state.free_media_ids.retain(|&id| id != media_id);
            state.input_media.insert(
                media_id,
                InputMedia {
                    id: media_id,
                    properties,
                    paused: false,
                },
            );
            Ok(handle)
        })
    }

    /// Stop a local media stream. Its id goes back to the free pool.
    pub fn stop_media(&self, media_id: u16) -> Result<CommandHandle> {
        self.with_joined(|state, events| {
            let handle = self.issue(
                state,
                events,
                methods::STOP_MEDIA,
                Delivery::Request,
                |enc| write_media_id(enc, media_id),
            )?;
            if state.input_media.remove(&media_id).is_some()
                && !state.free_media_ids.contains(&media_id)
            {
                state.free_media_ids.push_back(media_id);
            }
            Ok(handle)
        })
    }

    pub fn pause_media(&self, media_id: u16) -> Result<CommandHandle> {
        self.set_media_paused(media_id, true)
    }

    pub fn resume_media(&self, media_id: u16) -> Result<CommandHandle> {
        self.set_media_paused(media_id, false)
    }

    fn set_media_paused(&self, media_id: u16, paused: bool) -> Result<CommandHandle> {
        let method = if paused {
            methods::PAUSE_MEDIA
        } else {
            methods::RESUME_MEDIA
        };
        self.with_joined(|state, events| {
            let handle = self.issue(state, events, method, Delivery::Request, |enc| {
                write_media_id(enc, media_id)
            })?;
            match state.input_media.get_mut(&media_id) {
                Some(media) => media.paused = paused,
                None => tracing::debug!("{} for media {} not started here", method, media_id),
            }
            Ok(handle)
        })
    }

    /// Replace this client's peer user data.
    pub fn update_user_data(&self, user_data: impl Into<Bytes>) -> Result<CommandHandle> {
        let user_data = user_data.into();
        let delivery = self.command_delivery();
        self.with_joined(|state, events| {
            let handle = self.issue(state, events, methods::UPDATE_PEER, delivery, |enc| {
                enc.write_map_len(1);
                enc.write_str(keys::USER_DATA);
                enc.write_bin(&user_data);
            })?;
            if let Some(own) = state.own_peer_id.and_then(|id| state.peers.get_mut(&id)) {
                own.user_data = user_data;
            }
            Ok(handle)
        })
    }

    /// Move this client in the room's 3D space.
    pub fn set_position(&self, x: f32, y: f32, z: f32) -> Result<CommandHandle> {
        let delivery = self.command_delivery();
        self.with_joined(|state, events| {
            self.issue(state, events, methods::SET_PEER_POSITION, delivery, |enc| {
                enc.write_map_len(1);
                enc.write_str(keys::COORDINATES);
                write_coordinates(enc, [x, y, z]);
            })
        })
    }

    /// Send an opaque message to the room, or to `targets` only.
    pub fn send_message(&self, message: &[u8], targets: Option<&[u64]>) -> Result<CommandHandle> {
        let delivery = self.command_delivery();
        self.with_joined(|state, events| {
            self.issue(state, events, methods::SEND_MESSAGE, delivery, |enc| {
                enc.write_map_len(1 + targets.is_some() as u32);
                enc.write_str(keys::MESSAGE);
                enc.write_bin(message);
                if let Some(targets) = targets {
                    enc.write_str(keys::TARGET_PEER_IDS);
                    enc.write_array_len(targets.len() as u32);
                    for &peer_id in targets {
                        enc.write_uint(peer_id);
                    }
                }
            })
        })
    }

    /// Serialize `message` with MessagePack and send it like [`Room::send_message`].
    pub fn send_typed_message<T: Serialize>(
        &self,
        message: &T,
        targets: Option<&[u64]>,
    ) -> Result<CommandHandle> {
        let bytes = MsgPackCodec::encode(message)?;
        self.send_message(&bytes, targets)
    }

    /// Send one datagram, encrypted if a cipher is installed.
    pub fn send_datagram(&self, payload: &[u8]) -> Result<()> {
        let sealed = match &self.cipher {
            Some(cipher) => cipher.encrypt(payload)?,
            None => Bytes::copy_from_slice(payload),
        };
        self.with_joined(|state, events| {
            self.transport
                .send_datagram(sealed)
                .map_err(|e| self.on_send_error(state, events, e))
        })
    }

    /// Leave the room: fail every pending call, close the transport and
    /// raise `Left`. Calling it again does nothing.
    pub fn close(&self) {
        self.with_state(|state, events| {
            state.leave_requested = true;
            self.shut_down(state, events, LEFT_BY_APPLICATION);
        })
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Process one inbound RPC frame.
    ///
    /// Never fails: a frame that cannot be decoded or understood is logged
    /// and discarded, and the room carries on. Safe to call from inside
    /// [`Transport::send_rpc`]; the frame is then applied right after the
    /// command that sent it.
    pub fn handle_rpc_bytes(&self, bytes: &[u8]) {
        self.receive(Inbound::Rpc(Bytes::copy_from_slice(bytes)));
    }

    /// Process one inbound datagram.
    pub fn handle_datagram_bytes(&self, bytes: &[u8]) {
        self.receive(Inbound::Datagram(Bytes::copy_from_slice(bytes)));
    }

    fn receive(&self, item: Inbound) {
        self.inbound.lock().push_back(item);
        // Busy means the holder is on its way out and will apply the queue
        // and deliver events itself, possibly on this very thread.
        if self.drain_inbound() {
            self.dispatch_events();
        }
    }

    /// Apply queued inbound items. Returns `false` if the state was busy.
    fn drain_inbound(&self) -> bool {
        loop {
            if self.inbound.lock().is_empty() {
                return true;
            }
            let Some(mut state) = self.state.try_lock() else {
                return false;
            };
            let mut events = Vec::new();
            loop {
                let next = self.inbound.lock().pop_front();
                let Some(item) = next else {
                    break;
                };
                self.apply_inbound(&mut state, &mut events, item);
            }
            self.outbox.lock().extend(events);
        }
    }

    fn apply_inbound(&self, state: &mut RoomState, events: &mut Vec<RoomEvent>, item: Inbound) {
        if state.status == RoomStatus::Closed {
            tracing::debug!("Dropping inbound {:?} for closed room", item);
            return;
        }
        match item {
            Inbound::Rpc(bytes) => {
                if let Err(e) = self.process_frame(state, events, &bytes) {
                    tracing::warn!("Discarding {} byte frame: {}", bytes.len(), e);
                }
            }
            Inbound::Datagram(bytes) => {
                let payload = match &self.cipher {
                    Some(cipher) => match cipher.decrypt(&bytes) {
                        Ok(plain) => plain,
                        Err(e) => {
                            tracing::warn!("Dropping datagram: {}", e);
                            return;
                        }
                    },
                    None => bytes,
                };
                events.push(RoomEvent::DatagramReceived { payload });
            }
        }
    }

    fn process_frame(
        &self,
        state: &mut RoomState,
        events: &mut Vec<RoomEvent>,
        bytes: &[u8],
    ) -> Result<()> {
        match IncomingFrame::parse(bytes)? {
            IncomingFrame::Response {
                msg_id,
                error,
                result,
            } => {
                if !self.calls.resolve(msg_id, error, result) {
                    tracing::debug!("No pending call for response {}", msg_id);
                }
            }
            IncomingFrame::Request { msg_id, method, .. } => {
                tracing::warn!("Rejecting server request {} ({})", method, msg_id);
                let reply = build_response(
                    msg_id,
                    Some(&self.config.request_rejection),
                    &ReplyValue::Empty,
                );
                self.send_rpc(state, events, reply)?;
            }
            IncomingFrame::Notification { method, params } => {
                let notification = Notification::parse(method, params)?;
                if state.apply(notification, events) {
                    self.calls.fail_all();
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn status(&self) -> RoomStatus {
        self.read(|state| state.status)
    }

    /// Room id passed to [`Room::join`].
    pub fn name(&self) -> String {
        self.read(|state| state.name.clone())
    }

    /// Room id reported by the server's snapshot.
    pub fn room_id(&self) -> Option<String> {
        self.read(|state| state.id.clone())
    }

    pub fn own_peer_id(&self) -> Option<u64> {
        self.read(|state| state.own_peer_id)
    }

    pub fn customer(&self) -> String {
        self.read(|state| state.customer.clone())
    }

    /// Room user data (not this client's peer user data).
    pub fn user_data(&self) -> Bytes {
        self.read(|state| state.user_data.clone())
    }

    /// Copy of the roster, ordered by peer id.
    pub fn peers(&self) -> Vec<Peer> {
        self.read(|state| state.peers.values().cloned().collect())
    }

    pub fn peer(&self, peer_id: u64) -> Option<Peer> {
        self.read(|state| state.peers.get(&peer_id).cloned())
    }

    /// Media ids not yet handed out, in allocation order.
    pub fn free_media_ids(&self) -> Vec<u16> {
        self.read(|state| state.free_media_ids.iter().copied().collect())
    }

    /// Local media streams, ordered by id.
    pub fn input_media(&self) -> Vec<InputMedia> {
        self.read(|state| state.input_media.values().cloned().collect())
    }

    /// Requests still awaiting a Response.
    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run `f` under the state lock, then dispatch the events it raised.
    fn with_state<R>(&self, f: impl FnOnce(&mut RoomState, &mut Vec<RoomEvent>) -> R) -> R {
        let result = {
            let mut state = self.state.lock();
            let mut events = Vec::new();
            let result = f(&mut state, &mut events);
            self.outbox.lock().extend(events);
            result
        };
        self.after_unlock();
        result
    }

    fn read<R>(&self, f: impl FnOnce(&RoomState) -> R) -> R {
        let result = f(&self.state.lock());
        self.after_unlock();
        result
    }

    /// Apply whatever arrived while the lock was held, then deliver events.
    fn after_unlock(&self) {
        self.drain_inbound();
        self.dispatch_events();
    }

    /// Deliver queued events in order. Only one thread delivers at a time;
    /// events raised meanwhile (including by the handler itself) are picked
    /// up by that thread.
    fn dispatch_events(&self) {
        loop {
            if self.dispatching.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let next = self.outbox.lock().pop_front();
                let Some(event) = next else {
                    break;
                };
                self.events.on_event(event);
            }
            self.dispatching.store(false, Ordering::Release);
            if self.outbox.lock().is_empty() {
                return;
            }
        }
    }

    fn with_joined<R>(
        &self,
        f: impl FnOnce(&mut RoomState, &mut Vec<RoomEvent>) -> Result<R>,
    ) -> Result<R> {
        self.with_state(|state, events| {
            if state.status != RoomStatus::Joined {
                return Err(RoomError::NotJoined(state.status));
            }
            f(state, events)
        })
    }

    fn command_delivery(&self) -> Delivery {
        if self.config.notification_commands {
            Delivery::Notification
        } else {
            Delivery::Request
        }
    }

    /// Frame, register (Requests only) and send one command.
    fn issue<F>(
        &self,
        state: &mut RoomState,
        events: &mut Vec<RoomEvent>,
        method: &'static str,
        delivery: Delivery,
        write_params: F,
    ) -> Result<CommandHandle>
    where
        F: FnOnce(&mut Encoder),
    {
        match delivery {
            Delivery::Notification => {
                let frame = build_notification(method, write_params);
                self.send_rpc(state, events, frame)?;
                Ok(CommandHandle::sent(method))
            }
            Delivery::Request => {
                let msg_id = self.calls.next_msg_id();
                let frame = build_request(msg_id, method, write_params);
                // Registered before the bytes leave so the Response cannot
                // arrive first.
                let rx = self.calls.register(msg_id, method)?;
                if let Err(e) = self.send_rpc(state, events, frame) {
                    self.calls.cancel(msg_id);
                    return Err(e);
                }
                Ok(CommandHandle::pending(method, msg_id, rx))
            }
        }
    }

    fn send_rpc(
        &self,
        state: &mut RoomState,
        events: &mut Vec<RoomEvent>,
        frame: Bytes,
    ) -> Result<()> {
        self.transport
            .send_rpc(frame)
            .map_err(|e| self.on_send_error(state, events, e))
    }

    fn on_send_error(
        &self,
        state: &mut RoomState,
        events: &mut Vec<RoomEvent>,
        error: RoomError,
    ) -> RoomError {
        if matches!(error, RoomError::TransportClosed) {
            tracing::error!(
                "Transport closed under room {:?} (status {})",
                state.name,
                state.status
            );
            self.shut_down(state, events, TRANSPORT_CLOSED);
        }
        error
    }

    fn shut_down(&self, state: &mut RoomState, events: &mut Vec<RoomEvent>, reason: &str) {
        if state.close(Some(reason.to_string()), events) {
            events.push(RoomEvent::Left {
                reason: reason.to_string(),
            });
        }
        self.calls.fail_all();
        self.transport.close();
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, status, peers) =
            self.read(|state| (state.name.clone(), state.status, state.peers.len()));
        f.debug_struct("Room")
            .field("name", &name)
            .field("status", &status)
            .field("peers", &peers)
            .field("pending_calls", &self.calls.len())
            .finish()
    }
}

fn write_media_id(enc: &mut Encoder, media_id: u16) {
    enc.write_map_len(1);
    enc.write_str(keys::MEDIA_ID);
    enc.write_uint(media_id as u64);
}

fn write_coordinates(enc: &mut Encoder, [x, y, z]: [f32; 3]) {
    enc.write_array_len(3);
    enc.write_f32(x);
    enc.write_f32(y);
    enc.write_f32(z);
}
