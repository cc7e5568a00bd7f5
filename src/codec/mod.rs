//! Codec module - the MessagePack wire format.
//!
//! - [`Encoder`] - appends tagged values, choosing the smallest tag family
//! - [`Decoder`] - cursor over an immutable buffer with typed reads, indexed
//!   array access, keyed map lookup, lazy iteration and type-aware skipping
//! - [`Value`] - dynamic value tree
//! - [`MsgPackCodec`] - serde bridge (`rmp-serde`) for typed application data
//!
//! # Design
//!
//! The codec is pure and stateless: no I/O, no allocation beyond the output
//! buffer. Multi-byte lengths and numbers are big-endian on the wire.
//!
//! # Example
//!
//! ```
//! use roomwire_client::codec::{Decoder, Encoder};
//!
//! let mut enc = Encoder::new();
//! enc.write_array_len(3);
//! enc.write_uint(2);
//! enc.write_str("RoomStatusChanged");
//! enc.write_nil();
//!
//! let bytes = enc.into_bytes();
//! let dec = Decoder::new(&bytes);
//! assert_eq!(dec.array_at(1).unwrap().read_str().unwrap(), "RoomStatusChanged");
//! ```

mod decode;
mod encode;
mod marker;
mod msgpack;
mod value;

pub use decode::{ArrayIter, DecodeError, DecodeResult, Decoder, MapIter};
pub use encode::Encoder;
pub use marker::{Marker, TIMESTAMP_EXT};
pub use msgpack::MsgPackCodec;
pub use value::{Value, MAX_DEPTH};
