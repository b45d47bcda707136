//! Table core: the id→cell mapping
//!
//! # Design
//!
//! One coarse `parking_lot::RwLock` over an `FxHashMap<KeyId, Value>` plus
//! an `AtomicU64` generation counter. Single-id operations take the write
//! lock, so `get_and_set` / `set_if_absent` / `remove` on one id are
//! linearizable with respect to each other: when two writers race to claim
//! an absent slot, exactly one wins. Bulk operations (snapshot, compress)
//! take the read lock for a consistent point-in-time view.
//!
//! The table holds a bounded set of named attributes (tens to low hundreds
//! of entries), so a coarse lock beats a sharded map here.
//!
//! # Generation counter
//!
//! Bumped on every structural change: an id gaining its first live cell, an
//! id losing its cell, clear, and decompress. Overwriting the value under a
//! live id is not structural. Snapshot iterators capture the generation at
//! construction and fail fast when it moves, which, unlike comparing sizes,
//! also catches a remove paired with an insert.
//!
//! # Nil writes
//!
//! Exactly one live cell per id, and `len()` counts live cells only, so
//! writing Nil (the classification of an unsupported payload) stores
//! nothing: it clears the slot instead. Reading the key back still yields
//! Nil, the same observable result.

use crate::registry::KeyRegistry;
use datatable_core::{Cell, KeyId, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// String-keyed, integer-interned mapping from ids to typed cells
#[derive(Debug, Default)]
pub struct DatatableMap {
    registry: KeyRegistry,
    cells: RwLock<FxHashMap<KeyId, Value>>,
    generation: AtomicU64,
}

impl DatatableMap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string key, allocating an id on first reference
    pub fn key_id(&self, name: &str) -> KeyId {
        self.registry.id_of(name)
    }

    /// Resolve an id back to its string key
    pub fn key_name(&self, id: KeyId) -> Option<String> {
        self.registry.name_of(id)
    }

    /// The interning registry
    pub(crate) fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Current structural-change generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    // Callers hold the cells write lock when bumping, so iterator checks
    // see the new generation only after the structural change is visible.
    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Get the value under an id, Nil if no cell is set
    pub fn get(&self, id: KeyId) -> Value {
        self.cells.read().get(&id).cloned().unwrap_or(Value::Nil)
    }

    /// Atomically replace the value under an id, returning the prior value
    ///
    /// Writing Nil clears the slot. Returns Nil when no cell was set.
    pub fn get_and_set(&self, id: KeyId, value: Value) -> Value {
        let mut cells = self.cells.write();
        if value.is_nil() {
            match cells.remove(&id) {
                Some(prev) => {
                    self.bump();
                    prev
                }
                None => Value::Nil,
            }
        } else {
            match cells.insert(id, value) {
                Some(prev) => prev,
                None => {
                    self.bump();
                    Value::Nil
                }
            }
        }
    }

    /// Insert only if no live cell exists under the id
    ///
    /// Returns `None` when the insert won, or `Some(existing)` when a cell
    /// was already present and the caller's value was discarded. Exactly one
    /// of two concurrent claims on an absent slot succeeds.
    ///
    /// A Nil value stores nothing, so a Nil claim on an absent slot returns
    /// `None` while leaving the slot open: a later non-Nil claim can still
    /// win it.
    pub fn set_if_absent(&self, id: KeyId, value: Value) -> Option<Value> {
        let mut cells = self.cells.write();
        if let Some(existing) = cells.get(&id) {
            return Some(existing.clone());
        }
        if !value.is_nil() {
            cells.insert(id, value);
            self.bump();
        }
        None
    }

    /// Remove and return the value under an id, Nil if none was present
    pub fn remove(&self, id: KeyId) -> Value {
        self.remove_with_generation(id).0
    }

    /// Remove like [`remove`](Self::remove), also returning the generation
    /// observed while the write lock is still held
    ///
    /// Iterator-driven removal records this generation; reading it after the
    /// lock is released could absorb an interleaved foreign change.
    pub(crate) fn remove_with_generation(&self, id: KeyId) -> (Value, u64) {
        let mut cells = self.cells.write();
        let prior = match cells.remove(&id) {
            Some(prev) => {
                self.bump();
                prev
            }
            None => Value::Nil,
        };
        (prior, self.generation())
    }

    /// Whether a live cell exists under a string key
    ///
    /// Pure lookup: does not intern the key.
    pub fn contains(&self, name: &str) -> bool {
        match self.registry.lookup(name) {
            Some(id) => self.cells.read().contains_key(&id),
            None => false,
        }
    }

    /// Whether a live cell exists under an id
    pub fn contains_id(&self, id: KeyId) -> bool {
        self.cells.read().contains_key(&id)
    }

    /// Count of live cells
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Whether the table has no live cells
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Remove every live cell
    pub fn clear(&self) {
        let mut cells = self.cells.write();
        if !cells.is_empty() {
            cells.clear();
            self.bump();
        }
    }

    /// Consistent point-in-time list of every live cell
    ///
    /// The basis for snapshot iteration: one read-lock acquisition, no
    /// ordering contract across keys.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.cells
            .read()
            .iter()
            .map(|(id, value)| Cell::new(*id, value.clone()))
            .collect()
    }

    /// Apply decoded entries, used by decompress after a full parse
    ///
    /// With `wipe` the current contents are replaced; otherwise entries
    /// merge with put semantics. Counts as one structural change.
    pub(crate) fn apply_entries(&self, entries: Vec<(String, Value)>, wipe: bool) {
        // Ids are interned before taking the cells lock; nothing in this
        // crate holds the registry lock while waiting on the cells lock.
        let resolved: Vec<(KeyId, Value)> = entries
            .into_iter()
            .map(|(name, value)| (self.registry.id_of(&name), value))
            .collect();
        let mut cells = self.cells.write();
        if wipe {
            cells.clear();
        }
        for (id, value) in resolved {
            if !value.is_nil() {
                cells.insert(id, value);
            }
        }
        self.bump();
    }
}
