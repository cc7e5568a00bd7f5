//! Events demo - consuming room events from a channel.
//!
//! This demo shows:
//! - Installing an unbounded channel as the event handler
//! - Feeding server notifications into a room by hand
//! - Reacting to peers and media coming and going
//!
//! ```text
//! RUST_LOG=debug cargo run --example events
//! ```

use roomwire_client::codec::Encoder;
use roomwire_client::handler::RoomEvent;
use roomwire_client::room::{JoinParams, Room};
use roomwire_client::transport::ChannelTransport;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `[2, method, params]` with params written by `f`.
fn notification(method: &str, f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_array_len(3);
    enc.write_uint(2);
    enc.write_str(method);
    f(&mut enc);
    enc.into_vec()
}

fn write_peer(enc: &mut Encoder, id: u64, user_id: &str, media_ids: &[u16]) {
    enc.write_map_len(4);
    enc.write_str("id");
    enc.write_uint(id);
    enc.write_str("user_id");
    enc.write_str(user_id);
    enc.write_str("user_data");
    enc.write_bin(&[]);
    enc.write_str("medias");
    enc.write_array_len(media_ids.len() as u32);
    for &media_id in media_ids {
        enc.write_map_len(1);
        enc.write_str("id");
        enc.write_uint(media_id as u64);
    }
}

fn script() -> Vec<Vec<u8>> {
    vec![
        notification("RoomUpdated", |enc| {
            enc.write_map_len(1);
            enc.write_str("updates");
            enc.write_array_len(1);
            enc.write_map_len(4);
            enc.write_str("kind");
            enc.write_str("Joined");
            enc.write_str("own_peer_id");
            enc.write_uint(1);
            enc.write_str("media_ids");
            enc.write_array_len(0);
            enc.write_str("room");
            enc.write_map_len(2);
            enc.write_str("id");
            enc.write_str("lobby");
            enc.write_str("peers");
            enc.write_array_len(0);
        }),
        notification("RoomUpdated", |enc| {
            enc.write_map_len(1);
            enc.write_str("updates");
            enc.write_array_len(1);
            enc.write_map_len(2);
            enc.write_str("kind");
            enc.write_str("PeerJoined");
            enc.write_str("peer");
            write_peer(enc, 7, "bob", &[3]);
        }),
        notification("PeerUpdated", |enc| {
            enc.write_map_len(3);
            enc.write_str("peer_id");
            enc.write_uint(7);
            enc.write_str("kind");
            enc.write_str("MediaStarted");
            enc.write_str("media");
            enc.write_map_len(1);
            enc.write_str("id");
            enc.write_uint(4);
        }),
        notification("MessageReceived", |enc| {
            enc.write_map_len(2);
            enc.write_str("sender_peer_id");
            enc.write_uint(7);
            enc.write_str("message");
            enc.write_bin(b"hi there");
        }),
        notification("RoomUpdated", |enc| {
            enc.write_map_len(1);
            enc.write_str("updates");
            enc.write_array_len(1);
            enc.write_map_len(2);
            enc.write_str("kind");
            enc.write_str("PeerLeft");
            enc.write_str("peer_id");
            enc.write_uint(7);
        }),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let (events_tx, mut events) = mpsc::unbounded_channel::<RoomEvent>();
    let (transport, _outbound) = ChannelTransport::with_default_capacity();
    let room = Room::builder().event_handler(events_tx).build(transport);

    let _join = room.join(JoinParams::new("lobby"))?;
    for frame in script() {
        room.handle_rpc_bytes(&frame);
    }
    room.close();
    drop(room);

    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::PeerJoined { peer } => {
                println!("{} joined with {} media", peer.user_id, peer.medias.len())
            }
            RoomEvent::MediaStarted { peer_id, media } => {
                println!("peer {} started media {}", peer_id, media.id)
            }
            RoomEvent::MessageReceived {
                sender_peer_id,
                message,
            } => println!(
                "peer {} says {:?}",
                sender_peer_id,
                String::from_utf8_lossy(&message)
            ),
            RoomEvent::PeerLeft { peer } => println!(
                "{} left, releasing media {:?}",
                peer.user_id,
                peer.medias.keys().collect::<Vec<_>>()
            ),
            RoomEvent::Left { reason } => println!("left the room: {}", reason),
            other => println!("{}", other.name()),
        }
    }
    Ok(())
}
