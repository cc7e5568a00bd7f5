//! Loopback demo - a room talking to an in-process fake server.
//!
//! The fake server drains the room's [`ChannelTransport`], answers every
//! Request and pushes a `Joined` snapshot when the room asks to join.
//!
//! ```text
//! cargo run --example loopback
//! RUST_LOG=roomwire_client=debug cargo run --example loopback
//! ```

use std::sync::Arc;

use roomwire_client::codec::Value;
use roomwire_client::handler::RoomEvent;
use roomwire_client::protocol::{IncomingFrame, MediaProperties};
use roomwire_client::room::{JoinParams, Room};
use roomwire_client::transport::{ChannelTransport, Outbound, TransportReceiver};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
}

fn joined_snapshot() -> Vec<u8> {
    let peer = map(vec![
        ("id", Value::from(1u64)),
        ("user_id", Value::from("alice")),
        ("user_data", Value::Bin(vec![])),
        (
            "medias",
            Value::Array(vec![map(vec![
                ("id", Value::from(5u64)),
                ("properties", map(vec![("kind", Value::from("audio"))])),
            ])]),
        ),
    ]);
    let update = map(vec![
        ("kind", Value::from("Joined")),
        ("own_peer_id", Value::from(2u64)),
        ("media_ids", Value::Array(vec![Value::from(10u64), Value::from(11u64)])),
        (
            "room",
            map(vec![
                ("id", Value::from("lobby")),
                ("customer", Value::from("demo")),
                ("peers", Value::Array(vec![peer])),
            ]),
        ),
    ]);
    Value::Array(vec![
        Value::UInt(2),
        Value::from("RoomUpdated"),
        map(vec![("updates", Value::Array(vec![update]))]),
    ])
    .to_vec()
}

fn ok_response(msg_id: u32) -> Vec<u8> {
    Value::Array(vec![
        Value::UInt(1),
        Value::UInt(msg_id as u64),
        Value::Nil,
        Value::Nil,
    ])
    .to_vec()
}

/// Answer everything the room sends until its transport closes.
async fn fake_server(room: Arc<Room>, mut outbound: TransportReceiver) {
    while let Some(item) = outbound.recv().await {
        let Outbound::Rpc(bytes) = item else {
            tracing::info!("server got a datagram ({} bytes)", item.bytes().len());
            continue;
        };
        let reply = match IncomingFrame::parse(&bytes) {
            Ok(IncomingFrame::Request { msg_id, method, .. }) => {
                tracing::info!("server got {} #{}", method, msg_id);
                if method == "JoinRoom" {
                    room.handle_rpc_bytes(&joined_snapshot());
                }
                ok_response(msg_id)
            }
            Ok(other) => {
                tracing::info!("server got {:?}", other.frame_type());
                continue;
            }
            Err(e) => {
                tracing::warn!("server could not parse frame: {}", e);
                continue;
            }
        };
        room.handle_rpc_bytes(&reply);
    }
    tracing::info!("server: transport closed");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact())
        .init();

    let (transport, outbound) = ChannelTransport::with_default_capacity();
    let room = Arc::new(
        Room::builder()
            .event_handler(|event: RoomEvent| tracing::info!("event: {}", event.name()))
            .build(transport),
    );
    let server = tokio::spawn(fake_server(room.clone(), outbound));

    let joined = room.join(JoinParams::new("lobby").position(0.0, 0.0, 0.0))?.await?;
    tracing::info!("join acknowledged: {:?}", joined.error());
    tracing::info!(
        "peers: {:?}",
        room.peers().iter().map(|p| &p.user_id).collect::<Vec<_>>()
    );

    let media_id = room.allocate_media_id()?;
    room.start_media(media_id, MediaProperties::audio("mic"))?.await?;
    room.send_datagram(b"\x01\x02\x03")?;
    room.send_message(b"hello", None)?.await?;
    room.stop_media(media_id)?.await?;
    tracing::info!("free media ids: {:?}", room.free_media_ids());

    room.close();
    server.await?;
    Ok(())
}
