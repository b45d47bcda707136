//! Datatable store: interning registry, table core, wire codec, and the
//! public `ManagedMap` facade
//!
//! Layering, bottom up:
//! - [`KeyRegistry`]: append-only string↔id interning arena
//! - [`DatatableMap`]: id→cell table with linearizable single-id operations,
//!   a structural-change generation counter, and `compress`/`decompress`
//! - [`ManagedMap`]: the map-like contract consumed by everything else —
//!   string keys, plain values, defaulted reads, snapshot iteration
//!
//! Other subsystems should depend on [`ManagedMap`] only.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod map;
pub mod registry;
pub mod table;

pub use map::{Entries, ManagedMap, ValuesIter};
pub use registry::KeyRegistry;
pub use table::DatatableMap;
