//! Dynamic value tree for payloads whose shape is not known up front.
//!
//! Hot paths decode straight from a [`Decoder`]; `Value` is for logging
//! unrecognised notifications and for tests.

use super::decode::{DecodeError, DecodeResult, Decoder};
use super::encode::Encoder;
use super::marker::Marker;

/// Maximum container nesting accepted by [`Value::decode`].
pub const MAX_DEPTH: usize = 64;

/// One decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Negative integers.
    Int(i64),
    /// Non-negative integers.
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    /// Key/value pairs in wire order.
    Map(Vec<(Value, Value)>),
    Ext(i8, Vec<u8>),
}

impl Value {
    /// Decode one complete value at the cursor.
    pub fn decode(dec: &mut Decoder<'_>) -> DecodeResult<Value> {
        Self::decode_at(dec, 0)
    }

    /// Decode a whole buffer holding exactly one value.
    pub fn from_slice(bytes: &[u8]) -> DecodeResult<Value> {
        Self::decode(&mut Decoder::new(bytes))
    }

    fn decode_at(dec: &mut Decoder<'_>, depth: usize) -> DecodeResult<Value> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::DepthLimit(MAX_DEPTH));
        }
        let marker = dec.peek_marker()?;
        let value = match marker {
            Marker::Nil => {
                dec.read_nil()?;
                Value::Nil
            }
            Marker::True | Marker::False => Value::Bool(dec.read_bool()?),
            Marker::F32 => Value::F32(dec.read_f32()?),
            Marker::F64 => Value::F64(dec.read_f64()?),
            Marker::NegFixInt(_) | Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
                let v = dec.read_i64()?;
                if v < 0 {
                    Value::Int(v)
                } else {
                    Value::UInt(v as u64)
                }
            }
            m if m.is_integer() => Value::UInt(dec.read_u64()?),
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                Value::Str(dec.read_string()?)
            }
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => Value::Bin(dec.read_bin()?.to_vec()),
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
                let len = dec.read_array_len()?;
                let mut items = Vec::with_capacity(len.min(dec.remaining()));
                for _ in 0..len {
                    items.push(Self::decode_at(dec, depth + 1)?);
                }
                Value::Array(items)
            }
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                let len = dec.read_map_len()?;
                let mut entries = Vec::with_capacity(len.min(dec.remaining()));
                for _ in 0..len {
                    let key = Self::decode_at(dec, depth + 1)?;
                    let value = Self::decode_at(dec, depth + 1)?;
                    entries.push((key, value));
                }
                Value::Map(entries)
            }
            Marker::Reserved => {
                return Err(DecodeError::ReservedMarker {
                    pos: dec.position(),
                })
            }
            _ => {
                let (type_id, data) = dec.read_ext()?;
                Value::Ext(type_id, data.to_vec())
            }
        };
        Ok(value)
    }

    /// Encode into a fresh buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_value(self);
        enc.into_vec()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Look up a string key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        if value < 0 {
            Value::Int(value)
        } else {
            Value::UInt(value as u64)
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bin(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_mixed_tree() {
        let value = Value::Map(vec![
            (Value::from("ints"), Value::Array(vec![
                Value::from(0i64),
                Value::from(127i64),
                Value::from(128i64),
                Value::from(65536i64),
                Value::from(-1i64),
                Value::from(-33i64),
                Value::from(-65536i64),
                Value::UInt(u64::MAX),
                Value::Int(i64::MIN),
            ])),
            (Value::from("floats"), Value::Array(vec![Value::F32(0.5), Value::F64(1e300)])),
            (Value::from("bin"), Value::from(vec![0u8, 1, 2])),
            (Value::from("nil"), Value::Nil),
            (Value::from("flag"), Value::from(true)),
            (Value::from("ext"), Value::Ext(-1, vec![0, 0, 0, 1])),
            (Value::from("long"), Value::from("x".repeat(300))),
        ]);
        let bytes = value.to_vec();
        assert_eq!(Value::from_slice(&bytes).unwrap(), value);
    }

    #[test]
    fn test_integer_boundaries_keep_their_value() {
        let magnitudes = [0i64, 127, 128, 255, 256, 65535, 65536];
        for magnitude in magnitudes {
            for v in [magnitude, -magnitude] {
                let value = Value::from(v);
                assert_eq!(Value::from_slice(&value.to_vec()).unwrap(), value, "value {}", v);
                assert_eq!(value.as_i64(), Some(v));
            }
        }
    }

    #[test]
    fn test_large_containers_cross_thresholds() {
        let array = Value::Array((0..70_000u64).map(Value::UInt).collect());
        let bytes = array.to_vec();
        assert_eq!(bytes[0], 0xdd);
        assert_eq!(Value::from_slice(&bytes).unwrap(), array);

        let map = Value::Map((0..16u64).map(|i| (Value::UInt(i), Value::Nil)).collect());
        let bytes = map.to_vec();
        assert_eq!(bytes[0], 0xde);
        assert_eq!(Value::from_slice(&bytes).unwrap(), map);
    }

    #[test]
    fn test_depth_limit() {
        let mut bytes = vec![0x91; MAX_DEPTH + 2];
        bytes.push(0xc0);
        assert_eq!(
            Value::from_slice(&bytes),
            Err(DecodeError::DepthLimit(MAX_DEPTH))
        );
        // skip() has no depth limit
        assert!(Decoder::new(&bytes).skip().is_ok());
    }

    #[test]
    fn test_get_and_accessors() {
        let value = Value::Map(vec![(Value::from("id"), Value::from(5u64))]);
        assert_eq!(value.get("id").and_then(Value::as_i64), Some(5));
        assert!(value.get("missing").is_none());
        assert_eq!(Value::from("s").as_str(), Some("s"));
    }
}
