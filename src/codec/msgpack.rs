//! Serde bridge for typed application payloads, using `rmp-serde`.
//!
//! The RPC envelope and room notifications go through the hand-written
//! [`Encoder`](super::Encoder) / [`Decoder`](super::Decoder). Application
//! payloads carried opaquely inside them (peer messages, user data) are often
//! plain structs; this codec turns those into bytes and back.
//!
//! Always uses `to_vec_named` so structs become maps, the layout every other
//! client of the backend expects.
//!
//! # Example
//!
//! ```
//! use roomwire_client::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Chat {
//!     text: String,
//! }
//!
//! let msg = Chat { text: "hi".to_string() };
//! let encoded = MsgPackCodec::encode(&msg).unwrap();
//! let decoded: Chat = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use crate::error::Result;

/// MessagePack codec for structured application data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decoder, Encoder, Value};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[test]
    fn test_structs_encode_as_maps() {
        let encoded = MsgPackCodec::encode(&Position { x: 1.0, y: 2.0, z: 3.0 }).unwrap();
        // 0x83 = fixmap with 3 entries; positional encoding would be 0x93
        assert_eq!(encoded[0], 0x83);

        let dec = Decoder::new(&encoded);
        assert_eq!(dec.map_get("y").unwrap().read_f32().unwrap(), 2.0);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<Position> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(result.is_err());
    }

    #[test]
    fn test_rmp_reads_hand_encoded_integers() {
        for v in [0i64, 127, 128, 255, 256, 65535, 65536, -1, -32, -33, -128, -129, -32768, -65536] {
            let mut enc = Encoder::new();
            enc.write_int(v);
            let decoded: i64 = MsgPackCodec::decode(enc.as_slice()).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn test_hand_decoder_reads_rmp_output() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), "x".repeat(40));
        map.insert("room".to_string(), "lobby".to_string());
        let bytes = MsgPackCodec::encode(&map).unwrap();

        let dec = Decoder::new(&bytes);
        assert_eq!(dec.map_get("room").unwrap().read_str().unwrap(), "lobby");
        assert_eq!(dec.map_get("name").unwrap().read_str().unwrap().len(), 40);
    }

    #[test]
    fn test_integer_widths_match_rmp() {
        // Both sides pick the smallest tag family.
        for v in [0u64, 127, 128, 255, 256, 65535, 65536, u32::MAX as u64 + 1] {
            let mut enc = Encoder::new();
            enc.write_uint(v);
            assert_eq!(enc.as_slice(), MsgPackCodec::encode(&v).unwrap().as_slice());
        }
        for v in [-1i64, -32, -33, -128, -129, -32768, -32769] {
            let mut enc = Encoder::new();
            enc.write_int(v);
            assert_eq!(enc.as_slice(), MsgPackCodec::encode(&v).unwrap().as_slice());
        }
    }

    #[test]
    fn test_binary_matches_serde_bytes() {
        let data: Vec<u8> = (0..=255).collect();
        let expected = MsgPackCodec::encode(&serde_bytes::Bytes::new(&data)).unwrap();
        let mut enc = Encoder::new();
        enc.write_bin(&data);
        assert_eq!(enc.as_slice(), expected.as_slice());

        let back: serde_bytes::ByteBuf = MsgPackCodec::decode(enc.as_slice()).unwrap();
        assert_eq!(back.as_ref(), data.as_slice());
    }

    #[test]
    fn test_value_tree_matches_rmp_nested() {
        #[derive(Serialize)]
        struct Outer {
            items: Vec<String>,
            flag: Option<bool>,
        }
        let bytes = MsgPackCodec::encode(&Outer {
            items: vec!["a".to_string(), "b".to_string()],
            flag: None,
        })
        .unwrap();
        let value = Value::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![
                (
                    Value::from("items"),
                    Value::Array(vec![Value::from("a"), Value::from("b")])
                ),
                (Value::from("flag"), Value::Nil),
            ])
        );
    }
}
