//! Binary wire format for whole-table encode/decode
//!
//! Payload layout:
//!
//! ```text
//! +-------------------+
//! | magic "DTBL"      | 4 bytes
//! | format version    | u16 LE
//! | key table count   | u32 LE
//! | cell count        | u32 LE
//! +-------------------+
//! | key table         | per entry: wire id (u32 LE), name len (u32 LE), UTF-8 name
//! +-------------------+
//! | cells             | per cell: wire id (u32 LE), tag (u8), payload
//! +-------------------+
//! | CRC32 footer      | u32 LE over everything above
//! +-------------------+
//! ```
//!
//! The key table covers every live cell, so the payload is self-contained:
//! interned ids never cross a process boundary. `decompress` re-interns each
//! wire name into the local registry and remaps ids, which makes the same
//! bytes loadable after a restart or on a peer with a differently-populated
//! registry.
//!
//! Decoding parses the whole payload into scratch storage before touching
//! the live table: malformed input leaves the table exactly as it was.

use crate::table::DatatableMap;
use byteorder::{LittleEndian, ReadBytesExt};
use datatable_core::{Cell, DecodeError};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Magic bytes: "DTBL"
pub const MAGIC: [u8; 4] = *b"DTBL";

/// Wire format version for forward compatibility
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 14;

fn decode_header(buf: &mut &[u8]) -> Result<(u32, u32), DecodeError> {
    let mut magic = [0u8; 4];
    if buf.len() < magic.len() {
        return Err(DecodeError::Truncated);
    }
    magic.copy_from_slice(&buf[..4]);
    *buf = &buf[4..];
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic {
            expected: MAGIC,
            actual: magic,
        });
    }
    let version = buf.read_u16::<LittleEndian>()?;
    if version > FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version,
            max_supported: FORMAT_VERSION,
        });
    }
    let key_count = buf.read_u32::<LittleEndian>()?;
    let cell_count = buf.read_u32::<LittleEndian>()?;
    Ok((key_count, cell_count))
}

impl DatatableMap {
    /// Encode every live cell into a self-contained byte payload
    pub fn compress(&self) -> Vec<u8> {
        let cells = self.snapshot();

        let mut buf = Vec::with_capacity(HEADER_SIZE + cells.len() * 16);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(cells.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(cells.len() as u32).to_le_bytes());

        // key table: one entry per live cell, wire id = local interned id
        for cell in &cells {
            // ids in a snapshot always came from the registry
            let name = self.key_name(cell.key()).unwrap_or_default();
            buf.extend_from_slice(&cell.key().as_u32().to_le_bytes());
            let len = u32::try_from(name.len()).expect("key name exceeds wire length limit");
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
        }

        for cell in &cells {
            cell.encode(&mut buf);
        }

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        debug!(cells = cells.len(), bytes = buf.len(), "compressed datatable");
        buf
    }

    /// Decode a payload produced by [`compress`](Self::compress)
    ///
    /// With `wipe` the table's contents are fully replaced; otherwise
    /// decoded entries merge in with put semantics. On any decode error the
    /// table is left untouched.
    pub fn decompress(&self, bytes: &[u8], wipe: bool) -> Result<(), DecodeError> {
        if bytes.len() < HEADER_SIZE + 4 {
            return Err(DecodeError::Truncated);
        }
        let (body, footer) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes(footer.try_into().map_err(|_| DecodeError::Truncated)?);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(DecodeError::ChecksumMismatch { expected, actual });
        }

        let mut buf = body;
        let (key_count, cell_count) = decode_header(&mut buf)?;

        let mut names: FxHashMap<u32, String> = FxHashMap::default();
        names.reserve(key_count as usize);
        for _ in 0..key_count {
            let wire_id = buf.read_u32::<LittleEndian>()?;
            let len = buf.read_u32::<LittleEndian>()? as usize;
            if buf.len() < len {
                return Err(DecodeError::Truncated);
            }
            let (head, rest) = buf.split_at(len);
            let name =
                std::str::from_utf8(head).map_err(|_| DecodeError::InvalidUtf8)?;
            names.insert(wire_id, name.to_owned());
            buf = rest;
            trace!(wire_id, name, "decoded key table entry");
        }

        let mut entries = Vec::with_capacity(cell_count as usize);
        for _ in 0..cell_count {
            let cell = Cell::decode(&mut buf)?;
            let name = names
                .get(&cell.key().as_u32())
                .ok_or(DecodeError::DanglingKeyId(cell.key().as_u32()))?
                .clone();
            entries.push((name, cell.into_value()));
        }

        debug!(cells = entries.len(), wipe, "decompressing datatable");
        self.apply_entries(entries, wipe);
        Ok(())
    }
}

// helper so the tests below can build payloads with valid footers
#[cfg(test)]
fn with_crc(mut body: Vec<u8>) -> Vec<u8> {
    let crc = crc32fast::hash(&body);
    body.extend_from_slice(&crc.to_le_bytes());
    body
}
