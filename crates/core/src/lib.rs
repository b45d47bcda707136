//! Core types for the datatable
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: closed enum over every storable attribute category
//! - Cell: a typed value holder keyed by an interned id, with wire codec
//! - KeyId: dense interned id for a string key
//! - DefaultedKey: a string key bundled with a default value
//! - Error: error type hierarchy
//!
//! Lookups never fail for missing keys: the Nil sentinel is a real value,
//! and typed reads degrade to caller defaults on variant mismatch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod error;
pub mod key;
pub mod value;

pub use cell::{tags, Cell};
pub use error::{DecodeError, Result, StoreError};
pub use key::{DefaultedKey, KeyId};
pub use value::{FromValue, Value};
