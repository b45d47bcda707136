//! Datatable - embedded string-keyed attribute store for game objects
//!
//! A datatable holds the named attributes of one owner object (an entity, a
//! block, a widget): a bounded in-memory set of typed values that behaves
//! like an ordinary map, compactly serializes itself for persistence and
//! network sync, and detects concurrent structural change during iteration.
//!
//! # Quick Start
//!
//! ```
//! use datatable::{DefaultedKey, ManagedMap, Value};
//!
//! let data = ManagedMap::new();
//!
//! // Store attributes of any supported type
//! data.put("health", 20);
//! data.put("name", "Zombie");
//!
//! // Typed reads degrade to the caller's default, never error
//! assert_eq!(data.get_or("health", 0), 20);
//!
//! // Defaulted keys materialize their default on first read
//! let max_health = DefaultedKey::new("max-health", 20i32);
//! assert_eq!(data.get_default(&max_health), 20);
//! assert!(data.contains_key("max-health"));
//!
//! // Round-trip through the compact binary form
//! let bytes = data.serialize();
//! let restored = ManagedMap::new();
//! restored.deserialize(&bytes, true).unwrap();
//! assert_eq!(restored.get("name"), Value::Str("Zombie".into()));
//! ```
//!
//! # Architecture
//!
//! All access goes through [`ManagedMap`], a cheap-to-clone shared handle.
//! Internal layers (key interning, the id→cell table, the wire codec) live
//! in `datatable-store` and are re-exported for advanced use, but ordinary
//! callers never need them.

pub use datatable_core::{
    tags, Cell, DecodeError, DefaultedKey, FromValue, KeyId, Result, StoreError, Value,
};
pub use datatable_store::{DatatableMap, Entries, KeyRegistry, ManagedMap, ValuesIter};
