//! Key types for the datatable
//!
//! - KeyId: dense interned id standing in for a string key
//! - DefaultedKey: a canonical string key bundled with a default value

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned integer id for a string key
///
/// Ids are allocated densely by the key registry, starting at zero, and are
/// stable for the lifetime of the owning table. An id is never reassigned to
/// a different string while the original mapping is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(u32);

impl KeyId {
    /// Wrap a raw id
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A string key that knows its own default value
///
/// Reading a `DefaultedKey` through the facade never observes an unset key:
/// the default is inserted on first read (set-if-absent on read), so two
/// consecutive reads with no intervening write return the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultedKey<T> {
    name: String,
    default: T,
}

impl<T: Clone> DefaultedKey<T> {
    /// Create a defaulted key
    pub fn new(name: impl Into<String>, default: T) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }

    /// The canonical string key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A fresh copy of the default value
    pub fn default_value(&self) -> T {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_roundtrip() {
        let id = KeyId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id, KeyId::new(7));
        assert_ne!(id, KeyId::new(8));
    }

    #[test]
    fn test_key_id_display() {
        assert_eq!(KeyId::new(3).to_string(), "#3");
    }

    #[test]
    fn test_defaulted_key() {
        let key = DefaultedKey::new("health", 20i32);
        assert_eq!(key.name(), "health");
        assert_eq!(key.default_value(), 20);
        // default_value clones, the key itself is unchanged
        assert_eq!(key.default_value(), 20);
    }
}
