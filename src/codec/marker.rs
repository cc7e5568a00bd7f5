//! MessagePack tag byte space.
//!
//! Every value on the wire starts with one tag byte. Some tags fuse a small
//! payload (fixint, fixstr, fixarray, fixmap) into the tag itself; the rest
//! are followed by a big-endian length or value of a fixed width.
//!
//! ```text
//! 0x00..=0x7f  positive fixint     0xc0 nil        0xd0..=0xd3 int8..int64
//! 0x80..=0x8f  fixmap              0xc2/0xc3 bool  0xd4..=0xd8 fixext 1..16
//! 0x90..=0x9f  fixarray            0xc4..=0xc6 bin 0xd9..=0xdb str8..str32
//! 0xa0..=0xbf  fixstr              0xc7..=0xc9 ext 0xdc/0xdd   array16/32
//! 0xe0..=0xff  negative fixint     0xca/0xcb float 0xde/0xdf   map16/32
//!                                  0xcc..=0xcf uint8..uint64
//! ```

/// Decoded tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    PosFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    /// 0xc1, never used by MessagePack.
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    F32,
    F64,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegFixInt(i8),
}

pub(crate) const NIL: u8 = 0xc0;
pub(crate) const FALSE: u8 = 0xc2;
pub(crate) const TRUE: u8 = 0xc3;
pub(crate) const BIN8: u8 = 0xc4;
pub(crate) const BIN16: u8 = 0xc5;
pub(crate) const BIN32: u8 = 0xc6;
pub(crate) const EXT8: u8 = 0xc7;
pub(crate) const EXT16: u8 = 0xc8;
pub(crate) const EXT32: u8 = 0xc9;
pub(crate) const F32: u8 = 0xca;
pub(crate) const F64: u8 = 0xcb;
pub(crate) const U8: u8 = 0xcc;
pub(crate) const U16: u8 = 0xcd;
pub(crate) const U32: u8 = 0xce;
pub(crate) const U64: u8 = 0xcf;
pub(crate) const I8: u8 = 0xd0;
pub(crate) const I16: u8 = 0xd1;
pub(crate) const I32: u8 = 0xd2;
pub(crate) const I64: u8 = 0xd3;
pub(crate) const FIXEXT1: u8 = 0xd4;
pub(crate) const FIXEXT2: u8 = 0xd5;
pub(crate) const FIXEXT4: u8 = 0xd6;
pub(crate) const FIXEXT8: u8 = 0xd7;
pub(crate) const FIXEXT16: u8 = 0xd8;
pub(crate) const STR8: u8 = 0xd9;
pub(crate) const STR16: u8 = 0xda;
pub(crate) const STR32: u8 = 0xdb;
pub(crate) const ARRAY16: u8 = 0xdc;
pub(crate) const ARRAY32: u8 = 0xdd;
pub(crate) const MAP16: u8 = 0xde;
pub(crate) const MAP32: u8 = 0xdf;

pub(crate) const FIXMAP_BASE: u8 = 0x80;
pub(crate) const FIXARRAY_BASE: u8 = 0x90;
pub(crate) const FIXSTR_BASE: u8 = 0xa0;

/// Largest length that fits the fixstr form.
pub(crate) const FIXSTR_MAX: usize = 31;
/// Largest length that fits the fixarray / fixmap forms.
pub(crate) const FIXCONTAINER_MAX: u32 = 15;
/// Smallest value that fits a negative fixint.
pub(crate) const NEG_FIXINT_MIN: i64 = -32;

/// Extension type code for timestamps.
pub const TIMESTAMP_EXT: i8 = -1;

impl Marker {
    /// Classify a tag byte.
    pub fn from_u8(byte: u8) -> Marker {
        match byte {
            0x00..=0x7f => Marker::PosFixInt(byte),
            0x80..=0x8f => Marker::FixMap(byte & 0x0f),
            0x90..=0x9f => Marker::FixArray(byte & 0x0f),
            0xa0..=0xbf => Marker::FixStr(byte & 0x1f),
            NIL => Marker::Nil,
            0xc1 => Marker::Reserved,
            FALSE => Marker::False,
            TRUE => Marker::True,
            BIN8 => Marker::Bin8,
            BIN16 => Marker::Bin16,
            BIN32 => Marker::Bin32,
            EXT8 => Marker::Ext8,
            EXT16 => Marker::Ext16,
            EXT32 => Marker::Ext32,
            F32 => Marker::F32,
            F64 => Marker::F64,
            U8 => Marker::U8,
            U16 => Marker::U16,
            U32 => Marker::U32,
            U64 => Marker::U64,
            I8 => Marker::I8,
            I16 => Marker::I16,
            I32 => Marker::I32,
            I64 => Marker::I64,
            FIXEXT1 => Marker::FixExt1,
            FIXEXT2 => Marker::FixExt2,
            FIXEXT4 => Marker::FixExt4,
            FIXEXT8 => Marker::FixExt8,
            FIXEXT16 => Marker::FixExt16,
            STR8 => Marker::Str8,
            STR16 => Marker::Str16,
            STR32 => Marker::Str32,
            ARRAY16 => Marker::Array16,
            ARRAY32 => Marker::Array32,
            MAP16 => Marker::Map16,
            MAP32 => Marker::Map32,
            0xe0..=0xff => Marker::NegFixInt(byte as i8),
        }
    }

    /// Encode back to the tag byte.
    pub fn to_u8(self) -> u8 {
        match self {
            Marker::PosFixInt(v) => v & 0x7f,
            Marker::FixMap(n) => FIXMAP_BASE | (n & 0x0f),
            Marker::FixArray(n) => FIXARRAY_BASE | (n & 0x0f),
            Marker::FixStr(n) => FIXSTR_BASE | (n & 0x1f),
            Marker::Nil => NIL,
            Marker::Reserved => 0xc1,
            Marker::False => FALSE,
            Marker::True => TRUE,
            Marker::Bin8 => BIN8,
            Marker::Bin16 => BIN16,
            Marker::Bin32 => BIN32,
            Marker::Ext8 => EXT8,
            Marker::Ext16 => EXT16,
            Marker::Ext32 => EXT32,
            Marker::F32 => F32,
            Marker::F64 => F64,
            Marker::U8 => U8,
            Marker::U16 => U16,
            Marker::U32 => U32,
            Marker::U64 => U64,
            Marker::I8 => I8,
            Marker::I16 => I16,
            Marker::I32 => I32,
            Marker::I64 => I64,
            Marker::FixExt1 => FIXEXT1,
            Marker::FixExt2 => FIXEXT2,
            Marker::FixExt4 => FIXEXT4,
            Marker::FixExt8 => FIXEXT8,
            Marker::FixExt16 => FIXEXT16,
            Marker::Str8 => STR8,
            Marker::Str16 => STR16,
            Marker::Str32 => STR32,
            Marker::Array16 => ARRAY16,
            Marker::Array32 => ARRAY32,
            Marker::Map16 => MAP16,
            Marker::Map32 => MAP32,
            Marker::NegFixInt(v) => v as u8,
        }
    }

    /// Human-readable value family, for logs and error messages.
    pub fn family(self) -> &'static str {
        match self {
            Marker::PosFixInt(_)
            | Marker::NegFixInt(_)
            | Marker::U8
            | Marker::U16
            | Marker::U32
            | Marker::U64
            | Marker::I8
            | Marker::I16
            | Marker::I32
            | Marker::I64 => "integer",
            Marker::F32 | Marker::F64 => "float",
            Marker::Nil => "nil",
            Marker::True | Marker::False => "boolean",
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => "string",
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => "binary",
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => "array",
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => "map",
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16
            | Marker::Ext8
            | Marker::Ext16
            | Marker::Ext32 => "extension",
            Marker::Reserved => "reserved",
        }
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        self.family() == "integer"
    }

    #[inline]
    pub fn is_nil(self) -> bool {
        self == Marker::Nil
    }

    #[inline]
    pub fn is_str(self) -> bool {
        self.family() == "string"
    }

    #[inline]
    pub fn is_map(self) -> bool {
        self.family() == "map"
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.family() == "array"
    }
}
