//! Self-describing binary value codec and record framing.
//!
//! This module owns two closely related things:
//!
//! - [`Value`] — a small, hand-rolled implementation of the MessagePack wire
//!   shapes the format needs (fixint/uint/int, bool, bin, str, array, map).
//!   It follows the house style of a zero-dependency `Encode`/`Decode` pair
//!   with one `*Error` enum and a `require()` length guard, rather than
//!   pulling in a general-purpose serializer: the framing layer below needs
//!   to hand-parse three integers directly off a byte stream so it can skip
//!   a record's payload without buffering it, which rules out handing the
//!   whole record to an off-the-shelf deserializer.
//! - [`Framing`] — the outer per-record header (`type`, `timestamp`,
//!   `length`), encoded as three of these self-describing unsigned integers
//!   and hand-parsed one byte at a time so a reader can skip disabled or
//!   oversized records by advancing the stream.
//!
//! All multi-byte integers are big-endian on the wire, matching the
//! MessagePack tag layout; this is unrelated to the little-endian,
//! fixed-width encoding the rest of the workspace's ambient storage modules
//! use for their own on-disk formats — this module does not share wire
//! conventions with them, only the `Encode`/`Decode` trait shape.


use std::io::{self, Read, Write};

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced while encoding or decoding a [`Value`] or a record
/// header.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The buffer ran out of bytes before decoding completed.
    #[error("unexpected end of buffer (need {needed} bytes, have {available})")]
    UnexpectedEof { needed: usize, available: usize },

    /// A leading tag byte did not match any known MessagePack format.
    #[error("unknown format byte 0x{0:02x}")]
    UnknownFormat(u8),

    /// A length or count exceeds what fits in a `usize` on this platform.
    #[error("length overflow: {0}")]
    LengthOverflow(String),

    /// Underlying I/O failure while streaming a header or payload.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[inline]
fn require(buf: &[u8], needed: usize) -> Result<(), CodecError> {
    if buf.len() < needed {
        Err(CodecError::UnexpectedEof {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Format tag constants (MessagePack)
// ------------------------------------------------------------------------------------------------

mod fmt {
    pub const POSFIXINT_MAX: u8 = 0x7f;
    pub const FIXMAP_MIN: u8 = 0x80;
    pub const FIXMAP_MAX: u8 = 0x8f;
    pub const FIXARRAY_MIN: u8 = 0x90;
    pub const FIXARRAY_MAX: u8 = 0x9f;
    pub const FIXSTR_MIN: u8 = 0xa0;
    pub const FIXSTR_MAX: u8 = 0xbf;
    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const NEGFIXINT_MIN: u8 = 0xe0;
}

// ------------------------------------------------------------------------------------------------
// Value
// ------------------------------------------------------------------------------------------------

/// A self-describing value: every payload and every preserved "extra"
/// key/value in the format is represented as one of these before it is
/// interpreted as (or re-encoded from) a typed record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Unsigned integer. Used for the outer record header fields and for
    /// map/array counts; also the natural representation for most payload
    /// integer fields (line, column, motion type, ...).
    UInt(u64),
    /// Signed integer. Only the search pattern's `so` (line offset) field
    /// needs this; everything else in the format is unsigned.
    Int(i64),
    /// Raw byte string, MessagePack `bin` format. Used for all
    /// "string-shaped" payload fields (filenames, register lines, history
    /// text, variable values) since none of them are guaranteed valid
    /// UTF-8 and the format never needs to inspect their contents.
    Bin(Vec<u8>),
    /// MessagePack `str` format. Used for map keys (`"sp"`, `"sm"`, ...)
    /// since those are always short ASCII tags.
    Str(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(s.as_bytes().to_vec())
    }

    /// Borrow this value as a `str` tag, if it is one. Used to match map
    /// keys without allocating.
    pub fn as_str_tag(&self) -> Option<&[u8]> {
        match self {
            Value::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) | Value::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_bin(self) -> Option<Vec<u8>> {
        match self {
            Value::Bin(b) | Value::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Append this value's canonical encoding to `buf`.
    ///
    /// Encoding always picks the smallest format that fits a given value,
    /// so the same logical value always produces the same bytes — this is
    /// what lets preserved "extras" (re-encoded from a decoded `Value`)
    /// round-trip byte-exact.
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Nil => buf.push(fmt::NIL),
            Value::Bool(false) => buf.push(fmt::FALSE),
            Value::Bool(true) => buf.push(fmt::TRUE),
            Value::UInt(v) => encode_uint(*v, buf),
            Value::Int(v) => encode_int(*v, buf),
            Value::Bin(bytes) => encode_bin(bytes, buf),
            Value::Str(bytes) => encode_str(bytes, buf),
            Value::Array(items) => {
                encode_array_header(items.len(), buf);
                for item in items {
                    item.encode_to(buf);
                }
            }
            Value::Map(pairs) => {
                encode_map_header(pairs.len(), buf);
                for (k, v) in pairs {
                    k.encode_to(buf);
                    v.encode_to(buf);
                }
            }
        }
    }

    /// Decode one value starting at `buf[0]`, returning `(value,
    /// bytes_consumed)`.
    pub fn decode_from(buf: &[u8]) -> Result<(Value, usize), CodecError> {
        require(buf, 1)?;
        let tag = buf[0];
        match tag {
            0x00..=fmt::POSFIXINT_MAX => Ok((Value::UInt(tag as u64), 1)),
            fmt::FIXMAP_MIN..=fmt::FIXMAP_MAX => {
                decode_map(buf, 1, (tag & 0x0f) as usize)
            }
            fmt::FIXARRAY_MIN..=fmt::FIXARRAY_MAX => {
                decode_array(buf, 1, (tag & 0x0f) as usize)
            }
            fmt::FIXSTR_MIN..=fmt::FIXSTR_MAX => {
                decode_str(buf, 1, (tag & 0x1f) as usize)
            }
            fmt::NIL => Ok((Value::Nil, 1)),
            fmt::FALSE => Ok((Value::Bool(false), 1)),
            fmt::TRUE => Ok((Value::Bool(true), 1)),
            fmt::BIN8 => {
                require(buf, 2)?;
                decode_bin(buf, 2, buf[1] as usize)
            }
            fmt::BIN16 => {
                require(buf, 3)?;
                let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
                decode_bin(buf, 3, len)
            }
            fmt::BIN32 => {
                require(buf, 5)?;
                let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
                decode_bin(buf, 5, len)
            }
            fmt::STR8 => {
                require(buf, 2)?;
                decode_str(buf, 2, buf[1] as usize)
            }
            fmt::STR16 => {
                require(buf, 3)?;
                let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
                decode_str(buf, 3, len)
            }
            fmt::STR32 => {
                require(buf, 5)?;
                let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
                decode_str(buf, 5, len)
            }
            fmt::UINT8 => {
                require(buf, 2)?;
                Ok((Value::UInt(buf[1] as u64), 2))
            }
            fmt::UINT16 => {
                require(buf, 3)?;
                Ok((Value::UInt(u16::from_be_bytes([buf[1], buf[2]]) as u64), 3))
            }
            fmt::UINT32 => {
                require(buf, 5)?;
                Ok((
                    Value::UInt(u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as u64),
                    5,
                ))
            }
            fmt::UINT64 => {
                require(buf, 9)?;
                let mut b = [0u8; 8];
                b.copy_from_slice(&buf[1..9]);
                Ok((Value::UInt(u64::from_be_bytes(b)), 9))
            }
            fmt::INT8 => {
                require(buf, 2)?;
                Ok((Value::Int(buf[1] as i8 as i64), 2))
            }
            fmt::INT16 => {
                require(buf, 3)?;
                Ok((Value::Int(i16::from_be_bytes([buf[1], buf[2]]) as i64), 3))
            }
            fmt::INT32 => {
                require(buf, 5)?;
                Ok((
                    Value::Int(i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as i64),
                    5,
                ))
            }
            fmt::INT64 => {
                require(buf, 9)?;
                let mut b = [0u8; 8];
                b.copy_from_slice(&buf[1..9]);
                Ok((Value::Int(i64::from_be_bytes(b)), 9))
            }
            fmt::ARRAY16 => {
                require(buf, 3)?;
                decode_array(buf, 3, u16::from_be_bytes([buf[1], buf[2]]) as usize)
            }
            fmt::ARRAY32 => {
                require(buf, 5)?;
                decode_array(
                    buf,
                    5,
                    u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize,
                )
            }
            fmt::MAP16 => {
                require(buf, 3)?;
                decode_map(buf, 3, u16::from_be_bytes([buf[1], buf[2]]) as usize)
            }
            fmt::MAP32 => {
                require(buf, 5)?;
                decode_map(
                    buf,
                    5,
                    u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize,
                )
            }
            fmt::NEGFIXINT_MIN..=0xff => Ok((Value::Int(tag as i8 as i64), 1)),
            other => Err(CodecError::UnknownFormat(other)),
        }
    }
}

fn decode_bin(buf: &[u8], offset: usize, len: usize) -> Result<(Value, usize), CodecError> {
    require(&buf[offset..], len)?;
    Ok((Value::Bin(buf[offset..offset + len].to_vec()), offset + len))
}

fn decode_str(buf: &[u8], offset: usize, len: usize) -> Result<(Value, usize), CodecError> {
    require(&buf[offset..], len)?;
    Ok((Value::Str(buf[offset..offset + len].to_vec()), offset + len))
}

fn decode_array(buf: &[u8], offset: usize, count: usize) -> Result<(Value, usize), CodecError> {
    let mut items = Vec::with_capacity(count.min(4096));
    let mut cur = offset;
    for _ in 0..count {
        let (v, n) = Value::decode_from(&buf[cur..])?;
        cur += n;
        items.push(v);
    }
    Ok((Value::Array(items), cur))
}

fn decode_map(buf: &[u8], offset: usize, count: usize) -> Result<(Value, usize), CodecError> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    let mut cur = offset;
    for _ in 0..count {
        let (k, n) = Value::decode_from(&buf[cur..])?;
        cur += n;
        let (v, n) = Value::decode_from(&buf[cur..])?;
        cur += n;
        pairs.push((k, v));
    }
    Ok((Value::Map(pairs), cur))
}

fn encode_uint(v: u64, buf: &mut Vec<u8>) {
    if v <= fmt::POSFIXINT_MAX as u64 {
        buf.push(v as u8);
    } else if v <= u8::MAX as u64 {
        buf.push(fmt::UINT8);
        buf.push(v as u8);
    } else if v <= u16::MAX as u64 {
        buf.push(fmt::UINT16);
        buf.extend_from_slice(&(v as u16).to_be_bytes());
    } else if v <= u32::MAX as u64 {
        buf.push(fmt::UINT32);
        buf.extend_from_slice(&(v as u32).to_be_bytes());
    } else {
        buf.push(fmt::UINT64);
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

fn encode_int(v: i64, buf: &mut Vec<u8>) {
    if v >= 0 {
        encode_uint(v as u64, buf);
    } else if v >= -32 {
        buf.push((fmt::NEGFIXINT_MIN as i64 + (v - -32)) as u8);
    } else if v >= i8::MIN as i64 {
        buf.push(fmt::INT8);
        buf.push(v as i8 as u8);
    } else if v >= i16::MIN as i64 {
        buf.push(fmt::INT16);
        buf.extend_from_slice(&(v as i16).to_be_bytes());
    } else if v >= i32::MIN as i64 {
        buf.push(fmt::INT32);
        buf.extend_from_slice(&(v as i32).to_be_bytes());
    } else {
        buf.push(fmt::INT64);
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

fn encode_bin(bytes: &[u8], buf: &mut Vec<u8>) {
    let len = bytes.len();
    if len <= u8::MAX as usize {
        buf.push(fmt::BIN8);
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(fmt::BIN16);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(fmt::BIN32);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
    buf.extend_from_slice(bytes);
}

fn encode_str(bytes: &[u8], buf: &mut Vec<u8>) {
    let len = bytes.len();
    if len <= 31 {
        buf.push(fmt::FIXSTR_MIN | len as u8);
    } else if len <= u8::MAX as usize {
        buf.push(fmt::STR8);
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(fmt::STR16);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(fmt::STR32);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
    buf.extend_from_slice(bytes);
}

fn encode_array_header(len: usize, buf: &mut Vec<u8>) {
    if len <= 15 {
        buf.push(fmt::FIXARRAY_MIN | len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(fmt::ARRAY16);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(fmt::ARRAY32);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

fn encode_map_header(len: usize, buf: &mut Vec<u8>) {
    if len <= 15 {
        buf.push(fmt::FIXMAP_MIN | len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(fmt::MAP16);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(fmt::MAP32);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

// ------------------------------------------------------------------------------------------------
// Framing — the per-record [type][timestamp][length] header
// ------------------------------------------------------------------------------------------------

/// The three-integer header that precedes every record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub rtype: u64,
    pub timestamp: u64,
    pub length: u64,
}

/// Hand-parses one self-describing unsigned integer directly off a byte
/// stream, one byte at a time.
///
/// Returns `Ok(None)` only when EOF is hit reading the very first (tag)
/// byte — per the format's framing rules that is a normal end of stream,
/// not an error. Any EOF encountered after the tag byte (i.e. while reading
/// a multi-byte width) is reported as [`CodecError::UnexpectedEof`], since
/// at that point the stream is known to be mid-record.
pub fn read_uint<R: Read>(r: &mut R) -> Result<Option<u64>, CodecError> {
    let mut tag = [0u8; 1];
    match r.read(&mut tag)? {
        0 => return Ok(None),
        _ => {}
    }
    let tag = tag[0];
    if tag <= fmt::POSFIXINT_MAX {
        return Ok(Some(tag as u64));
    }
    let width = match tag {
        fmt::UINT8 => 1,
        fmt::UINT16 => 2,
        fmt::UINT32 => 4,
        fmt::UINT64 => 8,
        other => return Err(CodecError::UnknownFormat(other)),
    };
    let mut bytes = [0u8; 8];
    r.read_exact(&mut bytes[..width])?;
    let value = match width {
        1 => bytes[0] as u64,
        2 => u16::from_be_bytes([bytes[0], bytes[1]]) as u64,
        4 => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
        8 => u64::from_be_bytes(bytes),
        _ => unreachable!("width is always one of 1/2/4/8"),
    };
    Ok(Some(value))
}

/// Writes `v` using the canonical smallest self-describing unsigned-integer
/// form (`encode_uint`), streamed directly to `w`.
pub fn write_uint<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    let mut buf = Vec::with_capacity(9);
    encode_uint(v, &mut buf);
    w.write_all(&buf)
}

/// Reads one record header, or `None` at a clean record boundary (normal
/// end of stream).
///
/// An EOF while reading the `timestamp` or `length` field — i.e. after the
/// `type` tag was already consumed — is a hard framing error: the stream
/// claimed a record was starting but didn't have one.
pub fn read_header<R: Read>(r: &mut R) -> Result<Option<RecordHeader>, CodecError> {
    let rtype = match read_uint(r)? {
        Some(v) => v,
        None => return Ok(None),
    };
    let timestamp = read_uint(r)?.ok_or(CodecError::UnexpectedEof {
        needed: 1,
        available: 0,
    })?;
    let length = read_uint(r)?.ok_or(CodecError::UnexpectedEof {
        needed: 1,
        available: 0,
    })?;
    Ok(Some(RecordHeader {
        rtype,
        timestamp,
        length,
    }))
}

/// Writes a record header as three canonical self-describing unsigned
/// integers.
pub fn write_header<W: Write>(w: &mut W, header: &RecordHeader) -> io::Result<()> {
    write_uint(w, header.rtype)?;
    write_uint(w, header.timestamp)?;
    write_uint(w, header.length)
}

/// Validates that a declared record length fits in a `usize` on this
/// platform before the caller allocates a buffer for it. A length this
/// large can only come from a corrupted or hostile header — the format
/// itself never produces payloads anywhere close to this size.
pub fn checked_length(length: u64) -> Result<usize, CodecError> {
    if length > isize::MAX as u64 {
        return Err(CodecError::LengthOverflow(format!(
            "record length {length} exceeds the platform's signed size maximum"
        )));
    }
    Ok(length as usize)
}

/// Skips `length` bytes of a record payload by discarding them, without
/// allocating a buffer large enough to hold the whole payload.
pub fn skip_payload<R: Read>(r: &mut R, length: u64) -> io::Result<()> {
    let mut remaining = length;
    let mut scratch = [0u8; 4096];
    while remaining > 0 {
        let take = remaining.min(scratch.len() as u64) as usize;
        r.read_exact(&mut scratch[..take])?;
        remaining -= take as u64;
    }
    Ok(())
}
