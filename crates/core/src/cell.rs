//! Typed cells and their wire encoding
//!
//! A cell pairs an interned key id with a value and knows how to encode
//! itself: key id, one tag byte, then a type-specific payload. Scalars are
//! fixed-width little-endian; Str and Blob are length-prefixed. Decoding
//! needs no external type hints beyond the tag byte the cell carries.
//!
//! Nil cells are never written to the wire: a serialized table contains
//! live cells only, and absence on read is reconstructed as Nil.

use crate::error::DecodeError;
use crate::key::KeyId;
use crate::value::Value;
use byteorder::{LittleEndian, ReadBytesExt};

/// Tag bytes identifying cell variants on the wire
pub mod tags {
    /// Absent sentinel (never serialized, reserved)
    pub const NIL: u8 = 0x00;
    /// Boolean
    pub const BOOL: u8 = 0x01;
    /// 32-bit signed integer
    pub const INT: u8 = 0x02;
    /// 64-bit signed integer
    pub const LONG: u8 = 0x03;
    /// 32-bit float
    pub const FLOAT: u8 = 0x04;
    /// 64-bit float
    pub const DOUBLE: u8 = 0x05;
    /// Length-prefixed UTF-8 string
    pub const STR: u8 = 0x06;
    /// Length-prefixed opaque payload
    pub const BLOB: u8 = 0x07;

    /// Get the tag name for display
    pub fn tag_name(tag: u8) -> &'static str {
        match tag {
            NIL => "Nil",
            BOOL => "Bool",
            INT => "Int",
            LONG => "Long",
            FLOAT => "Float",
            DOUBLE => "Double",
            STR => "Str",
            BLOB => "Blob",
            _ => "Unknown",
        }
    }
}

/// A typed value holder keyed by an interned id
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    key: KeyId,
    value: Value,
}

impl Cell {
    /// Create a cell
    pub fn new(key: KeyId, value: Value) -> Self {
        Self { key, value }
    }

    /// The interned key id
    pub fn key(&self) -> KeyId {
        self.key
    }

    /// The stored value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Take the stored value out of the cell
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The wire tag for this cell's variant
    pub fn tag(&self) -> u8 {
        match &self.value {
            Value::Nil => tags::NIL,
            Value::Bool(_) => tags::BOOL,
            Value::Int(_) => tags::INT,
            Value::Long(_) => tags::LONG,
            Value::Float(_) => tags::FLOAT,
            Value::Double(_) => tags::DOUBLE,
            Value::Str(_) => tags::STR,
            Value::Blob(_) => tags::BLOB,
        }
    }

    /// Append this cell's wire encoding to a buffer
    ///
    /// Layout: key id (u32 LE), tag (u8), payload. Nil encodes as the bare
    /// tag with no payload; callers serializing a table skip Nil cells
    /// entirely.
    ///
    /// Str and Blob payloads are bounded to `u32::MAX` bytes by the length
    /// prefix; a larger payload panics rather than emitting a truncated
    /// prefix the decoder would misread.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.key.as_u32().to_le_bytes());
        buf.push(self.tag());
        match &self.value {
            Value::Nil => {}
            Value::Bool(b) => buf.push(u8::from(*b)),
            Value::Int(i) => buf.extend_from_slice(&i.to_le_bytes()),
            Value::Long(i) => buf.extend_from_slice(&i.to_le_bytes()),
            Value::Float(f) => buf.extend_from_slice(&f.to_le_bytes()),
            Value::Double(f) => buf.extend_from_slice(&f.to_le_bytes()),
            Value::Str(s) => {
                let len = u32::try_from(s.len()).expect("string exceeds wire length limit");
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Blob(b) => {
                let len = u32::try_from(b.len()).expect("blob exceeds wire length limit");
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(b);
            }
        }
    }

    /// Decode one cell from the front of a buffer, advancing it
    pub fn decode(buf: &mut &[u8]) -> Result<Cell, DecodeError> {
        let key = KeyId::new(buf.read_u32::<LittleEndian>()?);
        let tag = buf.read_u8()?;
        let value = match tag {
            tags::NIL => Value::Nil,
            tags::BOOL => Value::Bool(buf.read_u8()? != 0),
            tags::INT => Value::Int(buf.read_i32::<LittleEndian>()?),
            tags::LONG => Value::Long(buf.read_i64::<LittleEndian>()?),
            tags::FLOAT => Value::Float(buf.read_f32::<LittleEndian>()?),
            tags::DOUBLE => Value::Double(buf.read_f64::<LittleEndian>()?),
            tags::STR => {
                let bytes = read_prefixed(buf)?;
                let s = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
                Value::Str(s)
            }
            tags::BLOB => Value::Blob(read_prefixed(buf)?),
            other => return Err(DecodeError::UnknownTag(other)),
        };
        Ok(Cell::new(key, value))
    }
}

/// Read a u32-length-prefixed byte run, advancing the buffer
///
/// The length is validated against the remaining input before allocating,
/// so a corrupt prefix cannot trigger a huge allocation.
pub fn read_prefixed(buf: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let len = buf.read_u32::<LittleEndian>()? as usize;
    if buf.len() < len {
        return Err(DecodeError::Truncated);
    }
    let (head, rest) = buf.split_at(len);
    let bytes = head.to_vec();
    *buf = rest;
    Ok(bytes)
}
