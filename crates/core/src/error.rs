//! Error types for the datatable
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Single-key operations never surface errors: not-found reads return the
//! Nil sentinel and type mismatches degrade to caller defaults. Only two
//! paths raise: bulk decoding of a serialized table (recoverable, the table
//! is left untouched) and snapshot iteration that detects a concurrent
//! structural change (fail-fast).

use thiserror::Error;

/// Result type alias for datatable operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while decoding a serialized table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Invalid magic bytes
    #[error("invalid magic bytes: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes
        expected: [u8; 4],
        /// Actual magic bytes found
        actual: [u8; 4],
    },

    /// Unsupported format version
    #[error("unsupported format version {version}, max supported is {max_supported}")]
    UnsupportedVersion {
        /// Version found in the payload
        version: u16,
        /// Maximum supported version
        max_supported: u16,
    },

    /// Input ended before the structure it promised
    #[error("unexpected end of input")]
    Truncated,

    /// Cell carries a tag byte outside the known variant set
    #[error("unknown cell tag {0:#04x}")]
    UnknownTag(u8),

    /// String payload is not valid UTF-8
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// CRC32 footer does not match the payload
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum recorded in the footer
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// Cell references a key id missing from the embedded key table
    #[error("cell references key id {0} missing from the key table")]
    DanglingKeyId(u32),
}

// Reads come from in-memory slices, so the only io::Error the byteorder
// helpers can produce is EOF.
impl From<std::io::Error> for DecodeError {
    fn from(_: std::io::Error) -> Self {
        DecodeError::Truncated
    }
}

/// Errors raised by the datatable store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Snapshot iterator detected a structural change in the live table
    #[error("map was structurally modified during iteration")]
    ConcurrentModification,

    /// Iterator removal called with no current element
    #[error("no current element to remove")]
    NoCurrentElement,

    /// Serialized payload could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
