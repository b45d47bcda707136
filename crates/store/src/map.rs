//! ManagedMap: the public map-like contract
//!
//! ## Design
//!
//! ManagedMap is a thin facade over [`DatatableMap`]. It holds no state
//! beyond an `Arc` reference, so clones are cheap shared handles: a
//! simulation thread can mutate through one handle while a network thread
//! reads through another. [`deep_copy`](ManagedMap::deep_copy) produces an
//! independent map instead.
//!
//! Callers speak string keys and plain Rust values; the facade routes every
//! operation through the interning registry and value classification, and
//! translates absence into the Nil sentinel or caller-supplied defaults.
//! Single-key operations never fail.
//!
//! ## Iteration
//!
//! The key, value, and entry views materialize a full snapshot at
//! construction and capture the table's structural generation. Every step
//! re-checks the live generation: a foreign structural change turns the
//! iterator into a terminal `ConcurrentModification` error instead of
//! silently yielding stale data. Removal through the iterator re-captures
//! the generation, so an iterator never trips on a change it made itself.

use crate::table::DatatableMap;
use datatable_core::{Cell, DecodeError, DefaultedKey, FromValue, KeyId, StoreError, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// String-keyed, serializable attribute map
///
/// # Example
///
/// ```
/// use datatable_store::ManagedMap;
/// use datatable_core::Value;
///
/// let map = ManagedMap::new();
/// map.put("health", 20);
/// map.put("name", "Zombie");
///
/// assert_eq!(map.get_or("health", 0), 20);
/// let bytes = map.serialize();
///
/// let restored = ManagedMap::new();
/// restored.deserialize(&bytes, true).unwrap();
/// assert_eq!(restored.get("name"), Value::Str("Zombie".into()));
/// ```
#[derive(Clone, Default)]
pub struct ManagedMap {
    table: Arc<DatatableMap>,
}

impl ManagedMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of stored entries
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Whether a value is stored under a string key
    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains(key)
    }

    /// Whether any entry stores exactly this value
    pub fn contains_value(&self, value: &Value) -> bool {
        self.table
            .snapshot()
            .iter()
            .any(|cell| cell.value() == value)
    }

    /// Get the value under a key, Nil when unset
    pub fn get(&self, key: &str) -> Value {
        match self.table.registry().lookup(key) {
            Some(id) => self.table.get(id),
            None => Value::Nil,
        }
    }

    /// Get the value under a key as a concrete type
    ///
    /// Returns None when the key is unset or the stored variant does not
    /// match `T`. Never errors: mismatches stay local to the caller.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Option<T> {
        T::from_value(&self.get(key))
    }

    /// Get the value under a key, degrading to a default
    ///
    /// The default is returned for unset keys and for type mismatches; it
    /// is not written back.
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Get through a defaulted key, materializing the default on first read
    ///
    /// An unset key is claimed with the key's default via set-if-absent, so
    /// two concurrent first reads agree on one stored value and a repeated
    /// read returns the same value. A stored value of a mismatched variant
    /// degrades to the default without touching storage.
    pub fn get_default<T>(&self, key: &DefaultedKey<T>) -> T
    where
        T: Clone + FromValue + Into<Value>,
    {
        let id = self.table.key_id(key.name());
        let current = self.table.get(id);
        if !current.is_nil() {
            return T::from_value(&current).unwrap_or_else(|| key.default_value());
        }
        match self.table.set_if_absent(id, key.default_value().into()) {
            // lost the race: another writer claimed the slot first
            Some(existing) => T::from_value(&existing).unwrap_or_else(|| key.default_value()),
            None => key.default_value(),
        }
    }

    /// Store a value, returning the prior value (Nil if none)
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Value {
        let id = self.table.key_id(key);
        self.table.get_and_set(id, value.into())
    }

    /// Store a value only if the key is unset
    ///
    /// Returns `None` when this call's value was stored, or `Some(existing)`
    /// when the key already held a value and this call's value was
    /// discarded. Exactly one of two concurrent claims succeeds.
    ///
    /// A value that classifies as Nil stores nothing: the call returns
    /// `None` but the key stays unset, and a later non-Nil claim can still
    /// win it.
    pub fn put_if_absent(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        let id = self.table.key_id(key);
        self.table.set_if_absent(id, value.into())
    }

    /// Store an arbitrary serializable payload as an opaque blob
    ///
    /// A payload that fails to serialize classifies as Nil and stores
    /// nothing, per the total-classification rule.
    pub fn put_object<T: Serialize>(&self, key: &str, payload: &T) -> Value {
        self.put(key, Value::from_serialize(payload))
    }

    /// Read back a payload stored with [`put_object`](Self::put_object)
    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).to_deserialize()
    }

    /// Remove the value under a key, returning it (Nil if none)
    pub fn remove(&self, key: &str) -> Value {
        match self.table.registry().lookup(key) {
            Some(id) => self.table.remove(id),
            None => Value::Nil,
        }
    }

    /// Store every entry from an iterator of pairs
    pub fn put_all<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.put(key.as_ref(), value);
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.table.clear();
    }

    /// Snapshot of the stored key strings
    ///
    /// No ordering contract: consistent only within this one snapshot.
    pub fn keys(&self) -> Vec<String> {
        self.table
            .snapshot()
            .iter()
            .filter_map(|cell| self.table.key_name(cell.key()))
            .collect()
    }

    /// Snapshot iterator over (key, value) entries
    pub fn entries(&self) -> Entries {
        Entries::new(Arc::clone(&self.table))
    }

    /// Snapshot iterator over values
    pub fn values(&self) -> ValuesIter {
        ValuesIter(self.entries())
    }

    /// Encode the whole map into a self-contained byte payload
    pub fn serialize(&self) -> Vec<u8> {
        self.table.compress()
    }

    /// Decode a payload produced by [`serialize`](Self::serialize)
    ///
    /// With `wipe` the current contents are fully replaced; otherwise
    /// decoded entries merge in with put semantics. On error the map is
    /// left untouched.
    pub fn deserialize(&self, bytes: &[u8], wipe: bool) -> Result<(), DecodeError> {
        self.table.decompress(bytes, wipe)
    }

    /// Fully independent copy via a serialize/deserialize round-trip
    ///
    /// The copy shares no mutable state with the original.
    pub fn deep_copy(&self) -> ManagedMap {
        let copy = ManagedMap::new();
        // bytes we just produced are valid input by construction; a failure
        // here is a codec bug, not a recoverable condition
        copy.deserialize(&self.serialize(), true)
            .expect("a map's own serialized form must decode");
        copy
    }
}

impl fmt::Debug for ManagedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedMap")
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for ManagedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataMap {{")?;
        let cells = self.table.snapshot();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let name = self.table.key_name(cell.key()).unwrap_or_default();
            write!(f, "({}, {})", name, cell.value())?;
        }
        write!(f, "}}")
    }
}

impl PartialEq for ManagedMap {
    fn eq(&self, other: &Self) -> bool {
        let cells = self.table.snapshot();
        if cells.len() != other.len() {
            return false;
        }
        cells.iter().all(|cell| {
            match self.table.key_name(cell.key()) {
                Some(name) => &other.get(&name) == cell.value(),
                None => false,
            }
        })
    }
}

/// Snapshot iterator over (key, value) entries
///
/// Yields `Err(ConcurrentModification)` once and then fuses when the live
/// table changes structurally mid-iteration.
pub struct Entries {
    table: Arc<DatatableMap>,
    snapshot: Vec<Cell>,
    generation: u64,
    index: usize,
    current: Option<KeyId>,
    failed: bool,
}

impl Entries {
    fn new(table: Arc<DatatableMap>) -> Self {
        // capture the generation before snapshotting: a change landing
        // between the two reads then fails the first next() instead of
        // being missed
        let generation = table.generation();
        let snapshot = table.snapshot();
        Self {
            table,
            snapshot,
            generation,
            index: 0,
            current: None,
            failed: false,
        }
    }

    fn check_liveness(&mut self) -> Result<(), StoreError> {
        if self.table.generation() != self.generation {
            self.failed = true;
            self.current = None;
            return Err(StoreError::ConcurrentModification);
        }
        Ok(())
    }

    /// Remove the most recently yielded entry from the live table
    ///
    /// The iterator's own removal re-captures the generation, so subsequent
    /// `next()` calls do not fail on it; an interleaved foreign change
    /// still does.
    pub fn remove_current(&mut self) -> Result<Value, StoreError> {
        let id = self.current.ok_or(StoreError::NoCurrentElement)?;
        self.check_liveness()?;
        // post-removal generation is read under the table's write lock, so a
        // foreign change racing this removal cannot be absorbed into it
        let (prior, generation) = self.table.remove_with_generation(id);
        self.generation = generation;
        self.current = None;
        Ok(prior)
    }
}

impl Iterator for Entries {
    type Item = Result<(String, Value), StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.snapshot.len() {
            return None;
        }
        if let Err(err) = self.check_liveness() {
            return Some(Err(err));
        }
        let cell = &self.snapshot[self.index];
        self.index += 1;
        self.current = Some(cell.key());
        // ids in a snapshot always came from the registry
        let name = self.table.key_name(cell.key()).unwrap_or_default();
        Some(Ok((name, cell.value().clone())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.snapshot.len() - self.index;
        (0, Some(remaining))
    }
}

/// Snapshot iterator over values
pub struct ValuesIter(Entries);

impl ValuesIter {
    /// Remove the most recently yielded value from the live table
    pub fn remove_current(&mut self) -> Result<Value, StoreError> {
        self.0.remove_current()
    }
}

impl Iterator for ValuesIter {
    type Item = Result<Value, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|item| item.map(|(_, value)| value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let map = ManagedMap::new();
        assert_eq!(map.put("health", 20), Value::Nil);
        assert_eq!(map.put("health", 15), Value::Int(20));
        assert_eq!(map.get("health"), Value::Int(15));
        assert_eq!(map.remove("health"), Value::Int(15));
        assert_eq!(map.get("health"), Value::Nil);
        assert_eq!(map.remove("health"), Value::Nil);
    }

    #[test]
    fn test_get_unknown_key_does_not_intern() {
        let map = ManagedMap::new();
        assert_eq!(map.get("ghost"), Value::Nil);
        assert!(!map.contains_key("ghost"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_typed_get_degrades_to_default() {
        let map = ManagedMap::new();
        map.put("count", 7i32);
        assert_eq!(map.get_or("count", 0i32), 7);
        // stored variant is Int, asking for Long mismatches
        assert_eq!(map.get_or("count", -1i64), -1);
        assert_eq!(map.get_or("missing", 99i32), 99);
        // degrading did not insert anything
        assert!(!map.contains_key("missing"));
    }

    #[test]
    fn test_get_as() {
        let map = ManagedMap::new();
        map.put("name", "Zombie");
        assert_eq!(map.get_as::<String>("name"), Some("Zombie".to_string()));
        assert_eq!(map.get_as::<i32>("name"), None);
    }

    #[test]
    fn test_defaulted_key_materializes_on_first_read() {
        let map = ManagedMap::new();
        let key = DefaultedKey::new("max-health", 20i32);

        assert!(!map.contains_key("max-health"));
        assert_eq!(map.get_default(&key), 20);
        assert!(map.contains_key("max-health"), "default was stored");
        // idempotent: second read returns the same value
        assert_eq!(map.get_default(&key), 20);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_defaulted_key_sees_existing_value() {
        let map = ManagedMap::new();
        map.put("max-health", 40i32);
        let key = DefaultedKey::new("max-health", 20i32);
        assert_eq!(map.get_default(&key), 40);
    }

    #[test]
    fn test_defaulted_key_type_mismatch_degrades_without_writing() {
        let map = ManagedMap::new();
        map.put("max-health", "forty");
        let key = DefaultedKey::new("max-health", 20i32);
        assert_eq!(map.get_default(&key), 20);
        // the stored string was not overwritten
        assert_eq!(map.get("max-health"), Value::Str("forty".into()));
    }

    #[test]
    fn test_put_if_absent() {
        let map = ManagedMap::new();
        assert_eq!(map.put_if_absent("k", 1), None);
        assert_eq!(map.put_if_absent("k", 2), Some(Value::Int(1)));
        assert_eq!(map.get("k"), Value::Int(1));
    }

    #[test]
    fn test_put_if_absent_nil_claim_leaves_key_unset() {
        let map = ManagedMap::new();
        assert_eq!(map.put_if_absent("k", ()), None);
        assert!(!map.contains_key("k"));
        // the slot stayed open for a real claim
        assert_eq!(map.put_if_absent("k", 1), None);
        assert_eq!(map.get("k"), Value::Int(1));
    }

    #[test]
    fn test_put_object_roundtrip() {
        use serde::{Deserialize, Serialize};

        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Waypoint {
            name: String,
            x: i32,
            z: i32,
        }

        let map = ManagedMap::new();
        let wp = Waypoint {
            name: "spawn".into(),
            x: 16,
            z: -3,
        };
        map.put_object("waypoint", &wp);
        assert!(matches!(map.get("waypoint"), Value::Blob(_)));
        assert_eq!(map.get_object::<Waypoint>("waypoint"), Some(wp));
    }

    #[test]
    fn test_contains_value() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", "two");
        assert!(map.contains_value(&Value::Int(1)));
        assert!(map.contains_value(&Value::Str("two".into())));
        assert!(!map.contains_value(&Value::Long(1)));
    }

    #[test]
    fn test_put_all() {
        let map = ManagedMap::new();
        map.put_all([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get_or("b", 0), 2);
    }

    #[test]
    fn test_keys_snapshot() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);
        let mut keys = map.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_entries_iterates_full_snapshot() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);

        let mut seen: Vec<(String, Value)> = map.entries().map(|e| e.unwrap()).collect();
        seen.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), Value::Int(1)),
                ("b".to_string(), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn test_iterator_fails_fast_on_foreign_removal() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);
        map.put("c", 3);
        map.put("d", 4);

        let mut iter = map.entries();
        assert!(iter.next().unwrap().is_ok());

        // remove an unrelated key while the iterator lives
        map.remove("d");

        assert_eq!(
            iter.next(),
            Some(Err(StoreError::ConcurrentModification)),
            "structural change must surface as a hard failure"
        );
        assert_eq!(iter.next(), None, "failed iterator fuses");
    }

    #[test]
    fn test_iterator_fails_fast_on_remove_plus_insert() {
        // same size, different structure: the size heuristic would miss this
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);

        let mut iter = map.entries();
        map.remove("a");
        map.put("c", 3);
        assert_eq!(map.len(), 2);

        assert_eq!(iter.next(), Some(Err(StoreError::ConcurrentModification)));
    }

    #[test]
    fn test_iterator_tolerates_value_overwrite() {
        // overwriting a live key is not structural
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);

        let mut iter = map.entries();
        map.put("a", 100);

        let collected: Vec<_> = iter.by_ref().collect();
        assert!(collected.iter().all(|e| e.is_ok()));
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn test_remove_current_does_not_trip_own_check() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);
        map.put("c", 3);

        let mut iter = map.entries();
        let (first, _) = iter.next().unwrap().unwrap();
        let removed = iter.remove_current().unwrap();
        assert!(!removed.is_nil());
        assert!(!map.contains_key(&first));

        // remaining entries still iterate cleanly
        let rest: Vec<_> = iter.collect();
        assert_eq!(rest.len(), 2);
        assert!(rest.iter().all(|e| e.is_ok()));
    }

    #[test]
    fn test_foreign_change_after_remove_current_still_detected() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);
        map.put("c", 3);

        let mut iter = map.entries();
        iter.next().unwrap().unwrap();
        iter.remove_current().unwrap();

        // only the iterator's own removal is forgiven
        map.put("d", 4);
        assert_eq!(iter.next(), Some(Err(StoreError::ConcurrentModification)));
    }

    #[test]
    fn test_remove_current_without_next() {
        let map = ManagedMap::new();
        map.put("a", 1);
        let mut iter = map.entries();
        assert_eq!(iter.remove_current(), Err(StoreError::NoCurrentElement));
    }

    #[test]
    fn test_remove_current_twice() {
        let map = ManagedMap::new();
        map.put("a", 1);
        let mut iter = map.entries();
        iter.next().unwrap().unwrap();
        iter.remove_current().unwrap();
        assert_eq!(iter.remove_current(), Err(StoreError::NoCurrentElement));
    }

    #[test]
    fn test_values_iterator() {
        let map = ManagedMap::new();
        map.put("a", 1);
        map.put("b", 2);
        let mut values: Vec<i32> = map
            .values()
            .map(|v| v.unwrap().as_int().unwrap())
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_empty_iterator() {
        let map = ManagedMap::new();
        assert_eq!(map.entries().count(), 0);
        assert_eq!(map.values().count(), 0);
    }

    #[test]
    fn test_deep_copy_is_isolated() {
        let map = ManagedMap::new();
        map.put("name", "Zombie");
        map.put("health", 20);

        let copy = map.deep_copy();
        map.put("name", "Skeleton");
        map.remove("health");

        assert_eq!(copy.get("name"), Value::Str("Zombie".into()));
        assert_eq!(copy.get_or("health", 0), 20);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn test_map_equality() {
        let a = ManagedMap::new();
        let b = ManagedMap::new();
        assert_eq!(a, b);

        a.put("x", 1);
        assert_ne!(a, b);

        // same entries, different insertion order
        b.put("x", 1);
        assert_eq!(a, b);

        a.put("y", "hi");
        b.put("y", "bye");
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let map = ManagedMap::new();
        assert_eq!(map.to_string(), "DataMap {}");
        map.put("health", 20);
        assert_eq!(map.to_string(), "DataMap {(health, 20)}");
    }

    #[test]
    fn test_clone_is_shared_handle() {
        let a = ManagedMap::new();
        let b = a.clone();
        a.put("k", 1);
        assert_eq!(b.get_or("k", 0), 1);
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ManagedMap>();
    }
}
