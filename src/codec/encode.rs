//! MessagePack encoder.
//!
//! Appends tagged values to a growable [`BytesMut`]. Integer, string, binary
//! and container writers always pick the smallest tag family that fits, so
//! `127` costs one byte and a 40-byte string costs a two-byte header.
//!
//! Every writer returns the number of bytes it appended, letting callers
//! track buffer growth precisely.
//!
//! # Example
//!
//! ```
//! use roomwire_client::codec::Encoder;
//!
//! let mut enc = Encoder::new();
//! enc.write_array_len(2);
//! enc.write_str("hello");
//! enc.write_uint(300);
//! assert_eq!(enc.as_slice(), &[0x92, 0xa5, b'h', b'e', b'l', b'l', b'o', 0xcd, 0x01, 0x2c]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::marker::{self, FIXCONTAINER_MAX, FIXSTR_MAX, NEG_FIXINT_MIN, TIMESTAMP_EXT};
use super::value::Value;

/// Default initial capacity for a fresh encoder.
const DEFAULT_CAPACITY: usize = 128;

/// Growable MessagePack writer.
#[derive(Debug, Clone)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Create an encoder with a small default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Freeze the written bytes (zero-copy).
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    pub fn write_nil(&mut self) -> usize {
        self.buf.put_u8(marker::NIL);
        1
    }

    pub fn write_bool(&mut self, value: bool) -> usize {
        self.buf
            .put_u8(if value { marker::TRUE } else { marker::FALSE });
        1
    }

    /// Write an unsigned integer in the smallest form.
    pub fn write_uint(&mut self, value: u64) -> usize {
        if value <= 0x7f {
            self.buf.put_u8(value as u8);
            1
        } else if value <= u8::MAX as u64 {
            self.write_u8(value as u8)
        } else if value <= u16::MAX as u64 {
            self.write_u16(value as u16)
        } else if value <= u32::MAX as u64 {
            self.write_u32(value as u32)
        } else {
            self.write_u64(value)
        }
    }

    /// Write a signed integer in the smallest form.
    ///
    /// Non-negative values use the unsigned families, matching what other
    /// MessagePack implementations emit.
    pub fn write_int(&mut self, value: i64) -> usize {
        if value >= 0 {
            return self.write_uint(value as u64);
        }
        if value >= NEG_FIXINT_MIN {
            self.buf.put_i8(value as i8);
            1
        } else if value >= i8::MIN as i64 {
            self.write_i8(value as i8)
        } else if value >= i16::MIN as i64 {
            self.write_i16(value as i16)
        } else if value >= i32::MIN as i64 {
            self.write_i32(value as i32)
        } else {
            self.write_i64(value)
        }
    }

    pub fn write_u8(&mut self, value: u8) -> usize {
        self.buf.put_u8(marker::U8);
        self.buf.put_u8(value);
        2
    }

    pub fn write_u16(&mut self, value: u16) -> usize {
        self.buf.put_u8(marker::U16);
        self.buf.put_u16(value);
        3
    }

    pub fn write_u32(&mut self, value: u32) -> usize {
        self.buf.put_u8(marker::U32);
        self.buf.put_u32(value);
        5
    }

    pub fn write_u64(&mut self, value: u64) -> usize {
        self.buf.put_u8(marker::U64);
        self.buf.put_u64(value);
        9
    }

    pub fn write_i8(&mut self, value: i8) -> usize {
        self.buf.put_u8(marker::I8);
        self.buf.put_i8(value);
        2
    }

    pub fn write_i16(&mut self, value: i16) -> usize {
        self.buf.put_u8(marker::I16);
        self.buf.put_i16(value);
        3
    }

    pub fn write_i32(&mut self, value: i32) -> usize {
        self.buf.put_u8(marker::I32);
        self.buf.put_i32(value);
        5
    }

    pub fn write_i64(&mut self, value: i64) -> usize {
        self.buf.put_u8(marker::I64);
        self.buf.put_i64(value);
        9
    }

    pub fn write_f32(&mut self, value: f32) -> usize {
        self.buf.put_u8(marker::F32);
        self.buf.put_f32(value);
        5
    }

    pub fn write_f64(&mut self, value: f64) -> usize {
        self.buf.put_u8(marker::F64);
        self.buf.put_f64(value);
        9
    }

    /// Write a UTF-8 string with the smallest length prefix.
    pub fn write_str(&mut self, value: &str) -> usize {
        let len = value.len();
        let header = if len <= FIXSTR_MAX {
            self.buf.put_u8(marker::FIXSTR_BASE | len as u8);
            1
        } else if len <= u8::MAX as usize {
            self.buf.put_u8(marker::STR8);
            self.buf.put_u8(len as u8);
            2
        } else if len <= u16::MAX as usize {
            self.buf.put_u8(marker::STR16);
            self.buf.put_u16(len as u16);
            3
        } else {
            self.buf.put_u8(marker::STR32);
            self.buf.put_u32(len as u32);
            5
        };
        self.buf.put_slice(value.as_bytes());
        header + len
    }

    /// Write a binary blob with the smallest length prefix.
    pub fn write_bin(&mut self, value: &[u8]) -> usize {
        let len = value.len();
        let header = if len <= u8::MAX as usize {
            self.buf.put_u8(marker::BIN8);
            self.buf.put_u8(len as u8);
            2
        } else if len <= u16::MAX as usize {
            self.buf.put_u8(marker::BIN16);
            self.buf.put_u16(len as u16);
            3
        } else {
            self.buf.put_u8(marker::BIN32);
            self.buf.put_u32(len as u32);
            5
        };
        self.buf.put_slice(value);
        header + len
    }

    /// Write an array header; the caller writes `len` elements next.
    pub fn write_array_len(&mut self, len: u32) -> usize {
        self.write_container_len(len, marker::FIXARRAY_BASE, marker::ARRAY16, marker::ARRAY32)
    }

    /// Write a map header; the caller writes `len` key/value pairs next.
    pub fn write_map_len(&mut self, len: u32) -> usize {
        self.write_container_len(len, marker::FIXMAP_BASE, marker::MAP16, marker::MAP32)
    }

    fn write_container_len(&mut self, len: u32, fix_base: u8, tag16: u8, tag32: u8) -> usize {
        if len <= FIXCONTAINER_MAX {
            self.buf.put_u8(fix_base | len as u8);
            1
        } else if len <= u16::MAX as u32 {
            self.buf.put_u8(tag16);
            self.buf.put_u16(len as u16);
            3
        } else {
            self.buf.put_u8(tag32);
            self.buf.put_u32(len);
            5
        }
    }

    /// Write an extension value (type code + opaque payload).
    pub fn write_ext(&mut self, type_id: i8, data: &[u8]) -> usize {
        let len = data.len();
        let header = match len {
            1 => self.put_tag(marker::FIXEXT1),
            2 => self.put_tag(marker::FIXEXT2),
            4 => self.put_tag(marker::FIXEXT4),
            8 => self.put_tag(marker::FIXEXT8),
            16 => self.put_tag(marker::FIXEXT16),
            _ if len <= u8::MAX as usize => {
                self.buf.put_u8(marker::EXT8);
                self.buf.put_u8(len as u8);
                2
            }
            _ if len <= u16::MAX as usize => {
                self.buf.put_u8(marker::EXT16);
                self.buf.put_u16(len as u16);
                3
            }
            _ => {
                self.buf.put_u8(marker::EXT32);
                self.buf.put_u32(len as u32);
                5
            }
        };
        self.buf.put_i8(type_id);
        self.buf.put_slice(data);
        header + 1 + len
    }

    fn put_tag(&mut self, tag: u8) -> usize {
        self.buf.put_u8(tag);
        1
    }

    /// Write a timestamp extension, using the 32, 64 or 96-bit layout.
    pub fn write_timestamp(&mut self, secs: i64, nanos: u32) -> usize {
        if secs >= 0 && (secs as u64) >> 34 == 0 {
            if nanos == 0 && secs <= u32::MAX as i64 {
                return self.write_ext(TIMESTAMP_EXT, &(secs as u32).to_be_bytes());
            }
            let packed = ((nanos as u64) << 34) | secs as u64;
            return self.write_ext(TIMESTAMP_EXT, &packed.to_be_bytes());
        }
        let mut data = [0u8; 12];
        data[..4].copy_from_slice(&nanos.to_be_bytes());
        data[4..].copy_from_slice(&secs.to_be_bytes());
        self.write_ext(TIMESTAMP_EXT, &data)
    }

    /// Write a dynamic value tree.
    pub fn write_value(&mut self, value: &Value) -> usize {
        match value {
            Value::Nil => self.write_nil(),
            Value::Bool(v) => self.write_bool(*v),
            Value::Int(v) => self.write_int(*v),
            Value::UInt(v) => self.write_uint(*v),
            Value::F32(v) => self.write_f32(*v),
            Value::F64(v) => self.write_f64(*v),
            Value::Str(v) => self.write_str(v),
            Value::Bin(v) => self.write_bin(v),
            Value::Array(items) => {
                let mut n = self.write_array_len(items.len() as u32);
                for item in items {
                    n += self.write_value(item);
                }
                n
            }
            Value::Map(entries) => {
                let mut n = self.write_map_len(entries.len() as u32);
                for (k, v) in entries {
                    n += self.write_value(k);
                    n += self.write_value(v);
                }
                n
            }
            Value::Ext(type_id, data) => self.write_ext(*type_id, data),
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Encoder) -> usize) -> (Vec<u8>, usize) {
        let mut enc = Encoder::new();
        let n = f(&mut enc);
        (enc.into_vec(), n)
    }

    #[test]
    fn test_uint_thresholds() {
        assert_eq!(encoded(|e| e.write_uint(0)), (vec![0x00], 1));
        assert_eq!(encoded(|e| e.write_uint(127)), (vec![0x7f], 1));
        assert_eq!(encoded(|e| e.write_uint(128)), (vec![0xcc, 0x80], 2));
        assert_eq!(encoded(|e| e.write_uint(255)), (vec![0xcc, 0xff], 2));
        assert_eq!(encoded(|e| e.write_uint(256)), (vec![0xcd, 0x01, 0x00], 3));
        assert_eq!(encoded(|e| e.write_uint(65535)), (vec![0xcd, 0xff, 0xff], 3));
        assert_eq!(
            encoded(|e| e.write_uint(65536)),
            (vec![0xce, 0x00, 0x01, 0x00, 0x00], 5)
        );
        assert_eq!(encoded(|e| e.write_uint(u64::MAX)).1, 9);
    }

    #[test]
    fn test_int_thresholds() {
        assert_eq!(encoded(|e| e.write_int(-1)), (vec![0xff], 1));
        assert_eq!(encoded(|e| e.write_int(-32)), (vec![0xe0], 1));
        assert_eq!(encoded(|e| e.write_int(-33)), (vec![0xd0, 0xdf], 2));
        assert_eq!(encoded(|e| e.write_int(-128)), (vec![0xd0, 0x80], 2));
        assert_eq!(encoded(|e| e.write_int(-129)), (vec![0xd1, 0xff, 0x7f], 3));
        assert_eq!(encoded(|e| e.write_int(-32769)).0[0], 0xd2);
        assert_eq!(encoded(|e| e.write_int(i64::MIN)).0[0], 0xd3);
        // Positive signed values use the unsigned families.
        assert_eq!(encoded(|e| e.write_int(200)), (vec![0xcc, 200], 2));
    }

    #[test]
    fn test_multibyte_fields_are_big_endian() {
        let (bytes, _) = encoded(|e| e.write_u32(0x0102_0304));
        assert_eq!(bytes, vec![0xce, 0x01, 0x02, 0x03, 0x04]);

        let (bytes, _) = encoded(|e| e.write_f32(1.0));
        assert_eq!(bytes, vec![0xca, 0x3f, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_str_length_families() {
        let (bytes, n) = encoded(|e| e.write_str(""));
        assert_eq!((bytes, n), (vec![0xa0], 1));

        let s31 = "a".repeat(31);
        let (bytes, n) = encoded(|e| e.write_str(&s31));
        assert_eq!(bytes[0], 0xbf);
        assert_eq!(n, 32);

        let s32 = "a".repeat(32);
        let (bytes, n) = encoded(|e| e.write_str(&s32));
        assert_eq!(&bytes[..2], &[0xd9, 32]);
        assert_eq!(n, 34);

        let s256 = "a".repeat(256);
        let (bytes, n) = encoded(|e| e.write_str(&s256));
        assert_eq!(&bytes[..3], &[0xda, 0x01, 0x00]);
        assert_eq!(n, 259);

        let s65536 = "a".repeat(65536);
        let (bytes, n) = encoded(|e| e.write_str(&s65536));
        assert_eq!(&bytes[..5], &[0xdb, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(n, 65541);
    }

    #[test]
    fn test_bin_length_families() {
        assert_eq!(encoded(|e| e.write_bin(&[])), (vec![0xc4, 0x00], 2));
        assert_eq!(encoded(|e| e.write_bin(&[0u8; 256])).0[..3], [0xc5, 0x01, 0x00]);
        assert_eq!(encoded(|e| e.write_bin(&vec![0u8; 65536])).0[0], 0xc6);
    }

    #[test]
    fn test_container_headers() {
        assert_eq!(encoded(|e| e.write_array_len(0)), (vec![0x90], 1));
        assert_eq!(encoded(|e| e.write_array_len(15)), (vec![0x9f], 1));
        assert_eq!(encoded(|e| e.write_array_len(16)), (vec![0xdc, 0x00, 0x10], 3));
        assert_eq!(encoded(|e| e.write_map_len(3)), (vec![0x83], 1));
        assert_eq!(
            encoded(|e| e.write_map_len(70000)),
            (vec![0xdf, 0x00, 0x01, 0x11, 0x70], 5)
        );
    }

    #[test]
    fn test_ext_forms() {
        assert_eq!(encoded(|e| e.write_ext(5, &[1])), (vec![0xd4, 5, 1], 3));
        assert_eq!(
            encoded(|e| e.write_ext(5, &[1, 2, 3])),
            (vec![0xc7, 3, 5, 1, 2, 3], 6)
        );
    }

    #[test]
    fn test_timestamp_layouts() {
        // 32-bit: seconds only
        let (bytes, _) = encoded(|e| e.write_timestamp(1, 0));
        assert_eq!(bytes, vec![0xd6, 0xff, 0, 0, 0, 1]);

        // 64-bit: nanos present
        let (bytes, _) = encoded(|e| e.write_timestamp(1, 1));
        assert_eq!(bytes[0], 0xd7);
        assert_eq!(bytes.len(), 10);

        // 96-bit: negative seconds
        let (bytes, _) = encoded(|e| e.write_timestamp(-1, 0));
        assert_eq!(&bytes[..3], &[0xc7, 12, 0xff]);
    }

    #[test]
    fn test_write_value_counts_every_byte() {
        let value = Value::Map(vec![
            (Value::from("k"), Value::Array(vec![Value::UInt(1), Value::Nil])),
            (Value::from("b"), Value::Bin(vec![1, 2, 3])),
        ]);
        let mut enc = Encoder::new();
        let n = enc.write_value(&value);
        assert_eq!(n, enc.len());
    }
}
