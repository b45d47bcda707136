//! Key-interning registry
//!
//! Bidirectional mapping between string keys and dense integer ids, used so
//! cells can carry a 4-byte id instead of the full key string and so id
//! lookups stay O(1) average.
//!
//! # Design
//!
//! Arena style: a `Vec<String>` indexed by id plus an `FxHashMap` from name
//! to id, behind one `parking_lot::RwLock`. The registry is append-only;
//! ids are never removed or reassigned, even after the corresponding cell
//! is deleted, so re-insertion under a known name is cheap and an id stays
//! bound to one string for the registry's lifetime.

use datatable_core::KeyId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Inner {
    names: Vec<String>,
    ids: FxHashMap<String, KeyId>,
}

/// Append-only bidirectional string↔id table
#[derive(Debug, Default)]
pub struct KeyRegistry {
    inner: RwLock<Inner>,
}

impl KeyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for a name, allocating one on first reference
    ///
    /// Allocation is a single write-lock critical section with a re-check,
    /// so two threads racing on the same new name agree on one id, and
    /// racing allocations for different names both survive.
    pub fn id_of(&self, name: &str) -> KeyId {
        if let Some(id) = self.inner.read().ids.get(name) {
            return *id;
        }
        let mut inner = self.inner.write();
        if let Some(id) = inner.ids.get(name) {
            return *id;
        }
        let id = KeyId::new(inner.names.len() as u32);
        inner.names.push(name.to_owned());
        inner.ids.insert(name.to_owned(), id);
        id
    }

    /// Get the id for a name without allocating
    pub fn lookup(&self, name: &str) -> Option<KeyId> {
        self.inner.read().ids.get(name).copied()
    }

    /// Get the name for an id
    ///
    /// Total for every id this registry ever allocated.
    pub fn name_of(&self, id: KeyId) -> Option<String> {
        self.inner.read().names.get(id.as_u32() as usize).cloned()
    }

    /// Number of interned names
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    /// Whether no names have been interned yet
    pub fn is_empty(&self) -> bool {
        self.inner.read().names.is_empty()
    }
}
