//! Cursor-based MessagePack decoder.
//!
//! A [`Decoder`] borrows an immutable byte buffer and keeps an explicit read
//! position. Every `read_*` call checks the leading tag against the expected
//! value family and fails with [`DecodeError::TypeMismatch`] rather than
//! reinterpreting bytes. Running off the end of the buffer is always
//! [`DecodeError::UnexpectedEof`], never a silent zero.
//!
//! Containers can be consumed three ways:
//!
//! - indexed access into arrays ([`Decoder::array_at`], skipping prior elements)
//! - keyed lookup into maps ([`Decoder::map_get`], first matching key wins)
//! - lazy enumeration ([`Decoder::array_iter`], [`Decoder::map_iter`]), where
//!   unread elements are stepped over with [`Decoder::skip`]
//!
//! # Example
//!
//! ```
//! use roomwire_client::codec::{Decoder, Encoder};
//!
//! let mut enc = Encoder::new();
//! enc.write_map_len(1);
//! enc.write_str("id");
//! enc.write_uint(7);
//!
//! let bytes = enc.into_bytes();
//! let dec = Decoder::new(&bytes);
//! assert_eq!(dec.map_get("id").unwrap().read_i64().unwrap(), 7);
//! ```

use thiserror::Error;

use super::marker::{Marker, TIMESTAMP_EXT};

/// Errors raised while decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ended before the value did.
    #[error("unexpected end of stream at offset {pos} (needed {needed} more bytes)")]
    UnexpectedEof { pos: usize, needed: usize },

    /// The tag does not belong to the requested value family.
    #[error("expected {expected}, found {found} (tag {tag:#04x}) at offset {pos}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        tag: u8,
        pos: usize,
    },

    /// String bytes are not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {pos}")]
    InvalidUtf8 { pos: usize },

    /// Integer does not fit the requested width.
    #[error("integer {value} out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },

    /// Map lookup found no matching key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Array index past the array length.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Tag 0xc1 is never valid.
    #[error("reserved tag 0xc1 at offset {pos}")]
    ReservedMarker { pos: usize },

    /// Nesting exceeded the value decoder's depth limit.
    #[error("nesting deeper than {0} levels")]
    DepthLimit(usize),
}

/// Decode result alias.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Read cursor over an immutable buffer.
///
/// Cloning a decoder is cheap (a slice and an offset) and yields an
/// independent cursor over the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Bytes from the cursor to the end of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        let buf: &'a [u8] = self.buf;
        &buf[self.pos..]
    }

    /// Look at the next tag without consuming it.
    pub fn peek_marker(&self) -> DecodeResult<Marker> {
        self.buf
            .get(self.pos)
            .map(|&b| Marker::from_u8(b))
            .ok_or(DecodeError::UnexpectedEof {
                pos: self.pos,
                needed: 1,
            })
    }

    /// Whether the next value is nil.
    pub fn peek_is_nil(&self) -> bool {
        matches!(self.peek_marker(), Ok(Marker::Nil))
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                pos: self.pos,
                needed: n - self.remaining(),
            });
        }
        let buf: &'a [u8] = self.buf;
        let slice = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_marker(&mut self) -> DecodeResult<Marker> {
        let marker = self.peek_marker()?;
        self.pos += 1;
        Ok(marker)
    }

    fn mismatch(&self, expected: &'static str, marker: Marker) -> DecodeError {
        DecodeError::TypeMismatch {
            expected,
            found: marker.family(),
            tag: marker.to_u8(),
            pos: self.pos,
        }
    }

    /// Consume the next tag if it belongs to the expected family.
    ///
    /// On mismatch the cursor is left in front of the tag.
    fn expect<T>(
        &mut self,
        expected: &'static str,
        f: impl FnOnce(Marker) -> Option<T>,
    ) -> DecodeResult<T> {
        let marker = self.peek_marker()?;
        match f(marker) {
            Some(v) => {
                self.pos += 1;
                Ok(v)
            }
            None => Err(self.mismatch(expected, marker)),
        }
    }

    fn read_len_u8(&mut self) -> DecodeResult<usize> {
        Ok(self.take_array::<1>()?[0] as usize)
    }

    fn read_len_u16(&mut self) -> DecodeResult<usize> {
        Ok(u16::from_be_bytes(self.take_array()?) as usize)
    }

    fn read_len_u32(&mut self) -> DecodeResult<usize> {
        Ok(u32::from_be_bytes(self.take_array()?) as usize)
    }

    pub fn read_nil(&mut self) -> DecodeResult<()> {
        self.expect("nil", |m| (m == Marker::Nil).then_some(()))
    }

    /// Consume a nil if one is next; returns whether it did.
    pub fn try_read_nil(&mut self) -> bool {
        if self.peek_is_nil() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        self.expect("boolean", |m| match m {
            Marker::True => Some(true),
            Marker::False => Some(false),
            _ => None,
        })
    }

    /// Read any integer family as `i128`, sign- or zero-extending.
    fn read_integer(&mut self) -> DecodeResult<i128> {
        let start = self.pos;
        let marker = self.read_marker()?;
        let value = match marker {
            Marker::PosFixInt(v) => v as i128,
            Marker::NegFixInt(v) => v as i128,
            Marker::U8 => u8::from_be_bytes(self.take_array()?) as i128,
            Marker::U16 => u16::from_be_bytes(self.take_array()?) as i128,
            Marker::U32 => u32::from_be_bytes(self.take_array()?) as i128,
            Marker::U64 => u64::from_be_bytes(self.take_array()?) as i128,
            Marker::I8 => i8::from_be_bytes(self.take_array()?) as i128,
            Marker::I16 => i16::from_be_bytes(self.take_array()?) as i128,
            Marker::I32 => i32::from_be_bytes(self.take_array()?) as i128,
            Marker::I64 => i64::from_be_bytes(self.take_array()?) as i128,
            other => {
                self.pos = start;
                return Err(self.mismatch("integer", other));
            }
        };
        Ok(value)
    }

    fn read_ranged<T: TryFrom<i128>>(&mut self, target: &'static str) -> DecodeResult<T> {
        let start = self.pos;
        let value = self.read_integer()?;
        T::try_from(value).map_err(|_| {
            self.pos = start;
            DecodeError::OutOfRange { value, target }
        })
    }

    /// Read a "long": any integer width the server chose, as `i64`.
    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        self.read_ranged("i64")
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        self.read_ranged("i32")
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        self.read_ranged("u64")
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.read_ranged("u32")
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.read_ranged("u16")
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.read_ranged("u8")
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        match self.peek_marker()? {
            Marker::F32 => {
                self.pos += 1;
                Ok(f32::from_be_bytes(self.take_array()?))
            }
            other => Err(self.mismatch("float32", other)),
        }
    }

    /// Read a float, widening float32 and accepting integers.
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        match self.peek_marker()? {
            Marker::F64 => {
                self.pos += 1;
                Ok(f64::from_be_bytes(self.take_array()?))
            }
            Marker::F32 => Ok(self.read_f32()? as f64),
            m if m.is_integer() => Ok(self.read_integer()? as f64),
            other => Err(self.mismatch("float", other)),
        }
    }

    fn read_str_len(&mut self) -> DecodeResult<usize> {
        let marker = self.expect("string", |m| match m {
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 | Marker::Nil => {
                Some(m)
            }
            _ => None,
        })?;
        match marker {
            Marker::FixStr(n) => Ok(n as usize),
            Marker::Str8 => self.read_len_u8(),
            Marker::Str16 => self.read_len_u16(),
            Marker::Str32 => self.read_len_u32(),
            _ => Ok(0),
        }
    }

    /// Read a string borrowed from the buffer. Nil reads as `""`.
    pub fn read_str(&mut self) -> DecodeResult<&'a str> {
        let len = self.read_str_len()?;
        let start = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { pos: start })
    }

    pub fn read_string(&mut self) -> DecodeResult<String> {
        self.read_str().map(str::to_owned)
    }

    /// Read a binary blob borrowed from the buffer. Nil reads as empty.
    pub fn read_bin(&mut self) -> DecodeResult<&'a [u8]> {
        let marker = self.expect("binary", |m| match m {
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 | Marker::Nil => Some(m),
            _ => None,
        })?;
        let len = match marker {
            Marker::Bin8 => self.read_len_u8()?,
            Marker::Bin16 => self.read_len_u16()?,
            Marker::Bin32 => self.read_len_u32()?,
            _ => 0,
        };
        self.take(len)
    }

    /// Read raw bytes from either a binary or a string value.
    pub fn read_bytes(&mut self) -> DecodeResult<&'a [u8]> {
        match self.peek_marker()? {
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                let len = self.read_str_len()?;
                self.take(len)
            }
            _ => self.read_bin(),
        }
    }

    /// Read an array header and return the element count.
    pub fn read_array_len(&mut self) -> DecodeResult<usize> {
        let marker = self.expect("array", |m| match m {
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => Some(m),
            _ => None,
        })?;
        match marker {
            Marker::FixArray(n) => Ok(n as usize),
            Marker::Array16 => self.read_len_u16(),
            _ => self.read_len_u32(),
        }
    }

    /// Read a map header and return the pair count.
    pub fn read_map_len(&mut self) -> DecodeResult<usize> {
        let marker = self.expect("map", |m| match m {
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => Some(m),
            _ => None,
        })?;
        match marker {
            Marker::FixMap(n) => Ok(n as usize),
            Marker::Map16 => self.read_len_u16(),
            _ => self.read_len_u32(),
        }
    }

    /// Read an extension value as `(type code, payload)`.
    pub fn read_ext(&mut self) -> DecodeResult<(i8, &'a [u8])> {
        let marker = self.expect("extension", |m| (m.family() == "extension").then_some(m))?;
        let len = match marker {
            Marker::FixExt1 => 1,
            Marker::FixExt2 => 2,
            Marker::FixExt4 => 4,
            Marker::FixExt8 => 8,
            Marker::FixExt16 => 16,
            Marker::Ext8 => self.read_len_u8()?,
            Marker::Ext16 => self.read_len_u16()?,
            _ => self.read_len_u32()?,
        };
        let type_id = i8::from_be_bytes(self.take_array()?);
        Ok((type_id, self.take(len)?))
    }

    /// Read a timestamp extension as `(seconds, nanoseconds)`.
    pub fn read_timestamp(&mut self) -> DecodeResult<(i64, u32)> {
        let start = self.pos;
        let (type_id, data) = self.read_ext()?;
        if type_id != TIMESTAMP_EXT {
            self.pos = start;
            return Err(DecodeError::TypeMismatch {
                expected: "timestamp",
                found: "extension",
                tag: self.buf[start],
                pos: start,
            });
        }
        match data.len() {
            4 => Ok((u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as i64, 0)),
            8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(data);
                let packed = u64::from_be_bytes(raw);
                Ok(((packed & 0x3_ffff_ffff) as i64, (packed >> 34) as u32))
            }
            12 => {
                let nanos = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                let mut secs = [0u8; 8];
                secs.copy_from_slice(&data[4..]);
                Ok((i64::from_be_bytes(secs), nanos))
            }
            _ => {
                self.pos = start;
                Err(DecodeError::TypeMismatch {
                    expected: "timestamp",
                    found: "extension",
                    tag: self.buf[start],
                    pos: start,
                })
            }
        }
    }

    /// Step over one complete value of any type without decoding it.
    ///
    /// Containers are skipped by counting outstanding elements rather than
    /// recursing, so nesting depth does not consume stack.
    pub fn skip(&mut self) -> DecodeResult<()> {
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            let at = self.pos;
            let marker = self.read_marker()?;
            let payload = match marker {
                Marker::PosFixInt(_)
                | Marker::NegFixInt(_)
                | Marker::Nil
                | Marker::True
                | Marker::False => 0,
                Marker::Reserved => return Err(DecodeError::ReservedMarker { pos: at }),
                Marker::U8 | Marker::I8 => 1,
                Marker::U16 | Marker::I16 => 2,
                Marker::U32 | Marker::I32 | Marker::F32 => 4,
                Marker::U64 | Marker::I64 | Marker::F64 => 8,
                Marker::FixStr(n) => n as usize,
                Marker::Str8 | Marker::Bin8 => self.read_len_u8()?,
                Marker::Str16 | Marker::Bin16 => self.read_len_u16()?,
                Marker::Str32 | Marker::Bin32 => self.read_len_u32()?,
                Marker::FixExt1 => 2,
                Marker::FixExt2 => 3,
                Marker::FixExt4 => 5,
                Marker::FixExt8 => 9,
                Marker::FixExt16 => 17,
                Marker::Ext8 => self.read_len_u8()? + 1,
                Marker::Ext16 => self.read_len_u16()? + 1,
                Marker::Ext32 => self.read_len_u32()? + 1,
                Marker::FixArray(n) => {
                    pending += n as usize;
                    0
                }
                Marker::Array16 => {
                    pending += self.read_len_u16()?;
                    0
                }
                Marker::Array32 => {
                    pending += self.read_len_u32()?;
                    0
                }
                Marker::FixMap(n) => {
                    pending += 2 * n as usize;
                    0
                }
                Marker::Map16 => {
                    pending += 2 * self.read_len_u16()?;
                    0
                }
                Marker::Map32 => {
                    pending += 2 * self.read_len_u32()?;
                    0
                }
            };
            self.take(payload)?;
        }
        Ok(())
    }

    /// Return a cursor positioned at element `index` of the array at the
    /// cursor, skipping the elements before it. `self` is not advanced.
    pub fn array_at(&self, index: usize) -> DecodeResult<Decoder<'a>> {
        let mut cursor = *self;
        let len = cursor.read_array_len()?;
        if index >= len {
            return Err(DecodeError::IndexOutOfBounds { index, len });
        }
        for _ in 0..index {
            cursor.skip()?;
        }
        Ok(cursor)
    }

    /// Find `key` in the map at the cursor, returning a cursor at its value.
    ///
    /// Keys are compared as UTF-8 bytes; the first match wins. Non-string
    /// keys are skipped. `self` is not advanced.
    pub fn map_find(&self, key: &str) -> DecodeResult<Option<Decoder<'a>>> {
        let mut cursor = *self;
        let len = cursor.read_map_len()?;
        for _ in 0..len {
            let is_match = match cursor.peek_marker()? {
                Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                    let len = cursor.read_str_len()?;
                    cursor.take(len)? == key.as_bytes()
                }
                _ => {
                    cursor.skip()?;
                    false
                }
            };
            if is_match {
                return Ok(Some(cursor));
            }
            cursor.skip()?;
        }
        Ok(None)
    }

    /// Like [`Decoder::map_find`], but a missing key is an error.
    pub fn map_get(&self, key: &str) -> DecodeResult<Decoder<'a>> {
        self.map_find(key)?
            .ok_or_else(|| DecodeError::KeyNotFound(key.to_string()))
    }

    /// Lazily enumerate the array at the cursor.
    ///
    /// The iterator consumes the array header from `self`; once exhausted,
    /// `self` sits just past the array.
    pub fn array_iter<'d>(&'d mut self) -> DecodeResult<ArrayIter<'a, 'd>> {
        let remaining = self.read_array_len()?;
        Ok(ArrayIter {
            dec: self,
            remaining,
        })
    }

    /// Lazily enumerate the map at the cursor as `(key cursor, value cursor)`.
    pub fn map_iter<'d>(&'d mut self) -> DecodeResult<MapIter<'a, 'd>> {
        let remaining = self.read_map_len()?;
        Ok(MapIter {
            dec: self,
            remaining,
        })
    }
}

/// Lazy array enumerator.
///
/// Each item is a cursor at one element; the parent cursor is advanced past
/// that element with [`Decoder::skip`] whether or not the caller reads it.
pub struct ArrayIter<'a, 'd> {
    dec: &'d mut Decoder<'a>,
    remaining: usize,
}

impl<'a> ArrayIter<'a, '_> {
    /// Elements not yet yielded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Skip every element not yet yielded, leaving the parent cursor just
    /// past the array.
    pub fn finish(mut self) -> DecodeResult<()> {
        while self.remaining > 0 {
            self.remaining -= 1;
            self.dec.skip()?;
        }
        Ok(())
    }
}

impl<'a> Iterator for ArrayIter<'a, '_> {
    type Item = DecodeResult<Decoder<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let element = *self.dec;
        match self.dec.skip() {
            Ok(()) => Some(Ok(element)),
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Lazy map enumerator yielding `(key, value)` cursors.
pub struct MapIter<'a, 'd> {
    dec: &'d mut Decoder<'a>,
    remaining: usize,
}

impl<'a> MapIter<'a, '_> {
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn finish(mut self) -> DecodeResult<()> {
        while self.remaining > 0 {
            self.remaining -= 1;
            self.dec.skip()?;
            self.dec.skip()?;
        }
        Ok(())
    }
}

impl<'a> Iterator for MapIter<'a, '_> {
    type Item = DecodeResult<(Decoder<'a>, Decoder<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let key = *self.dec;
        let step = self.dec.skip().and_then(|_| {
            let value = *self.dec;
            self.dec.skip().map(|_| value)
        });
        match step {
            Ok(value) => Some(Ok((key, value))),
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;

    fn bytes_of(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut enc = Encoder::new();
        f(&mut enc);
        enc.into_vec()
    }

    #[test]
    fn test_integer_boundaries_roundtrip() {
        let values: [i64; 19] = [
            0, 127, 128, 255, 256, 65535, 65536, -1, -32, -33, -127, -128, -129, -255, -256,
            -32768, -65535, -65536, -65537,
        ];
        for v in values {
            let bytes = bytes_of(|e| {
                e.write_int(v);
            });
            assert_eq!(Decoder::new(&bytes).read_i64().unwrap(), v, "value {}", v);
        }
        for v in [u32::MAX as u64, u64::MAX] {
            let bytes = bytes_of(|e| {
                e.write_uint(v);
            });
            assert_eq!(Decoder::new(&bytes).read_u64().unwrap(), v);
        }
    }

    #[test]
    fn test_long_accepts_any_width() {
        // The same logical 5, encoded in every integer family
        let encodings: Vec<Vec<u8>> = vec![
            vec![0x05],
            vec![0xcc, 5],
            vec![0xd0, 5],
            vec![0xcd, 0, 5],
            vec![0xd1, 0, 5],
            vec![0xce, 0, 0, 0, 5],
            vec![0xd2, 0, 0, 0, 5],
            vec![0xd3, 0, 0, 0, 0, 0, 0, 0, 5],
        ];
        for bytes in encodings {
            assert_eq!(Decoder::new(&bytes).read_i64().unwrap(), 5, "{:02x?}", bytes);
        }
        // Sign extension
        assert_eq!(Decoder::new(&[0xd0, 0xff]).read_i64().unwrap(), -1);
        assert_eq!(Decoder::new(&[0xd1, 0xff, 0x7f]).read_i64().unwrap(), -129);
    }

    #[test]
    fn test_type_mismatch_is_an_error_not_a_reinterpretation() {
        let bytes = bytes_of(|e| {
            e.write_str("12");
        });
        let mut dec = Decoder::new(&bytes);
        let err = dec.read_i64().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch {
                expected: "integer",
                found: "string",
                ..
            }
        ));
        // Cursor untouched on mismatch
        assert_eq!(dec.position(), 0);
        assert_eq!(dec.read_str().unwrap(), "12");
    }

    #[test]
    fn test_out_of_range() {
        let mut dec = Decoder::new(&[0xcd, 0x01, 0x00]);
        assert!(matches!(
            dec.read_u8(),
            Err(DecodeError::OutOfRange { value: 256, .. })
        ));
        assert_eq!(dec.read_u16().unwrap(), 256);

        assert!(Decoder::new(&[0xff]).read_u32().is_err());
        assert!(Decoder::new(&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
            .read_i64()
            .is_err());
    }

    #[test]
    fn test_eof_is_reported() {
        assert!(matches!(
            Decoder::new(&[]).read_i64(),
            Err(DecodeError::UnexpectedEof { pos: 0, needed: 1 })
        ));
        assert!(matches!(
            Decoder::new(&[0xcd, 0x01]).read_i64(),
            Err(DecodeError::UnexpectedEof { needed: 1, .. })
        ));
        assert!(matches!(
            Decoder::new(&[0xa5, b'a']).read_str(),
            Err(DecodeError::UnexpectedEof { needed: 4, .. })
        ));
    }

    #[test]
    fn test_nil_and_empty_strings() {
        assert_eq!(Decoder::new(&[0xc0]).read_str().unwrap(), "");
        assert_eq!(Decoder::new(&[0xa0]).read_str().unwrap(), "");
        assert!(Decoder::new(&[0xc0]).read_bin().unwrap().is_empty());

        let mut dec = Decoder::new(&[0xc0, 0x01]);
        assert!(dec.try_read_nil());
        assert!(!dec.try_read_nil());
        assert_eq!(dec.read_u8().unwrap(), 1);
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            Decoder::new(&[0xa2, 0xff, 0xfe]).read_str(),
            Err(DecodeError::InvalidUtf8 { pos: 1 })
        ));
    }

    #[test]
    fn test_floats() {
        let bytes = bytes_of(|e| {
            e.write_f32(1.5);
            e.write_f64(-2.25);
            e.write_uint(3);
        });
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_f64().unwrap(), 1.5);
        assert_eq!(dec.read_f64().unwrap(), -2.25);
        assert_eq!(dec.read_f64().unwrap(), 3.0);
        assert!(Decoder::new(&[0xcb, 0, 0, 0, 0, 0, 0, 0, 0]).read_f32().is_err());
    }

    #[test]
    fn test_bytes_from_bin_or_str() {
        let bytes = bytes_of(|e| {
            e.write_bin(b"ab");
            e.write_str("cd");
            e.write_nil();
        });
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_bytes().unwrap(), b"ab");
        assert_eq!(dec.read_bytes().unwrap(), b"cd");
        assert_eq!(dec.read_bytes().unwrap(), b"");
        assert!(dec.is_at_end());
    }

    #[test]
    fn test_timestamps() {
        for (secs, nanos) in [(0, 0), (1_700_000_000, 0), (1_700_000_000, 999_999_999), (-5, 7)] {
            let bytes = bytes_of(|e| {
                e.write_timestamp(secs, nanos);
            });
            assert_eq!(
                Decoder::new(&bytes).read_timestamp().unwrap(),
                (secs, nanos)
            );
        }
        let other_ext = bytes_of(|e| {
            e.write_ext(3, &[0, 0, 0, 1]);
        });
        assert!(Decoder::new(&other_ext).read_timestamp().is_err());
    }

    #[test]
    fn test_array_at_skips_prior_elements() {
        let bytes = bytes_of(|e| {
            e.write_array_len(3);
            e.write_map_len(1);
            e.write_str("nested");
            e.write_array_len(2);
            e.write_uint(1);
            e.write_bin(&[9; 300]);
            e.write_str("second");
            e.write_int(-7);
        });
        let dec = Decoder::new(&bytes);
        assert_eq!(dec.array_at(1).unwrap().read_str().unwrap(), "second");
        assert_eq!(dec.array_at(2).unwrap().read_i64().unwrap(), -7);
        assert!(matches!(
            dec.array_at(3),
            Err(DecodeError::IndexOutOfBounds { index: 3, len: 3 })
        ));
        // Parent cursor untouched
        assert_eq!(dec.position(), 0);
    }

    #[test]
    fn test_map_lookup_first_match_wins() {
        let bytes = bytes_of(|e| {
            e.write_map_len(4);
            e.write_uint(1);
            e.write_str("int key");
            e.write_str("a");
            e.write_uint(10);
            e.write_str("b");
            e.write_array_len(1);
            e.write_nil();
            e.write_str("a");
            e.write_uint(20);
        });
        let dec = Decoder::new(&bytes);
        assert_eq!(dec.map_get("a").unwrap().read_i64().unwrap(), 10);
        assert_eq!(dec.map_get("b").unwrap().read_array_len().unwrap(), 1);
        assert!(dec.map_find("missing").unwrap().is_none());
        assert_eq!(
            dec.map_get("missing").unwrap_err(),
            DecodeError::KeyNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_skip_nested_map_then_resume() {
        let bytes = bytes_of(|e| {
            e.write_map_len(2);
            e.write_str("a");
            e.write_map_len(1);
            e.write_str("deep");
            e.write_array_len(2);
            e.write_f64(1.0);
            e.write_ext(1, &[1, 2, 3]);
            e.write_str("b");
            e.write_timestamp(1, 1);
            e.write_str("sibling");
        });
        let mut dec = Decoder::new(&bytes);
        dec.skip().unwrap();
        assert_eq!(dec.read_str().unwrap(), "sibling");
        assert!(dec.is_at_end());
    }

    #[test]
    fn test_skip_rejects_reserved_and_truncated() {
        assert!(matches!(
            Decoder::new(&[0xc1]).skip(),
            Err(DecodeError::ReservedMarker { pos: 0 })
        ));
        // Array claims two elements, holds one
        assert!(matches!(
            Decoder::new(&[0x92, 0x01]).skip(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_array_iter_partial_read() {
        let bytes = bytes_of(|e| {
            e.write_array_len(3);
            e.write_str("x");
            e.write_map_len(1);
            e.write_str("k");
            e.write_uint(1);
            e.write_uint(3);
            e.write_str("after");
        });
        let mut dec = Decoder::new(&bytes);
        {
            let mut iter = dec.array_iter().unwrap();
            assert_eq!(iter.remaining(), 3);
            let mut first = iter.next().unwrap().unwrap();
            assert_eq!(first.read_str().unwrap(), "x");
            // Second element ignored entirely
            let _ = iter.next().unwrap().unwrap();
            let mut third = iter.next().unwrap().unwrap();
            assert_eq!(third.read_u8().unwrap(), 3);
            assert!(iter.next().is_none());
        }
        assert_eq!(dec.read_str().unwrap(), "after");
    }

    #[test]
    fn test_array_iter_finish_skips_rest() {
        let bytes = bytes_of(|e| {
            e.write_array_len(3);
            e.write_uint(1);
            e.write_uint(2);
            e.write_uint(3);
            e.write_bool(true);
        });
        let mut dec = Decoder::new(&bytes);
        let mut iter = dec.array_iter().unwrap();
        iter.next().unwrap().unwrap();
        iter.finish().unwrap();
        assert!(dec.read_bool().unwrap());
    }

    #[test]
    fn test_map_iter() {
        let bytes = bytes_of(|e| {
            e.write_map_len(2);
            e.write_str("one");
            e.write_uint(1);
            e.write_str("two");
            e.write_uint(2);
        });
        let mut dec = Decoder::new(&bytes);
        let pairs: Vec<(String, u8)> = dec
            .map_iter()
            .unwrap()
            .map(|pair| {
                let (mut k, mut v) = pair.unwrap();
                (k.read_string().unwrap(), v.read_u8().unwrap())
            })
            .collect();
        assert_eq!(pairs, vec![("one".to_string(), 1), ("two".to_string(), 2)]);
        assert!(dec.is_at_end());
    }
}
