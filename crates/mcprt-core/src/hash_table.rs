//! Generic open-addressed hash table (spec §4, "Hash table" component).
//!
//! This is the pluggable-hash/compare container the gateway's method cache
//! and the template cache are built on (spec §4.3, §4.9) — a small,
//! from-scratch linear-probing table rather than reaching for `HashMap`,
//! since the spec calls this out as its own budgeted component.

use std::hash::{BuildHasher, Hash, Hasher};

/// Default hasher, matching `std`'s `RandomState` algorithm family (SipHash)
/// so the table has the same DoS resistance as `std::collections::HashMap`.
#[derive(Default, Clone)]
pub struct DefaultHashBuilder(std::collections::hash_map::RandomState);

impl BuildHasher for DefaultHashBuilder {
    type Hasher = std::collections::hash_map::DefaultHasher;
    fn build_hasher(&self) -> Self::Hasher {
        self.0.build_hasher()
    }
}

#[derive(Clone)]
enum Slot<K, V> {
    Empty,
    Occupied(K, V),
    Tombstone,
}

/// An open-addressed table using linear probing, generic over a pluggable
/// [`BuildHasher`]. Resizes (2×) when the load factor would exceed 0.75.
pub struct HashTable<K, V, S = DefaultHashBuilder> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    hasher: S,
}

const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

impl<K: Eq + Hash, V> HashTable<K, V, DefaultHashBuilder> {
    /// Creates an empty table with the default hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Creates an empty table with room for at least `capacity` entries
    /// before the first resize.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K: Eq + Hash, V> Default for HashTable<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> HashTable<K, V, S> {
    /// Creates an empty table using a custom hasher builder.
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        let cap = capacity.max(4).next_power_of_two();
        Self {
            slots: (0..cap).map(|_| Slot::Empty).collect(),
            len: 0,
            tombstones: 0,
            hasher,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn index_for(&self, key: &K) -> usize {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & (self.slots.len() - 1)
    }

    /// Inserts or replaces the value for `key`, returning the previous value
    /// if one was present. Triggers a 2× resize if the load factor
    /// (including tombstones) would exceed 0.75.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if (self.len + self.tombstones + 1) * LOAD_FACTOR_DEN > self.slots.len() * LOAD_FACTOR_NUM {
            self.resize(self.slots.len() * 2);
        }
        let mask = self.slots.len() - 1;
        let mut idx = self.index_for(&key);
        let mut first_tombstone: Option<usize> = None;
        loop {
            match &self.slots[idx] {
                Slot::Empty => {
                    let target = first_tombstone.unwrap_or(idx);
                    if first_tombstone.is_some() {
                        self.tombstones -= 1;
                    }
                    self.slots[target] = Slot::Occupied(key, value);
                    self.len += 1;
                    return None;
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
                Slot::Occupied(k, _) if *k == key => {
                    let Slot::Occupied(_, old) =
                        std::mem::replace(&mut self.slots[idx], Slot::Occupied(key, value))
                    else {
                        unreachable!()
                    };
                    return Some(old);
                }
                Slot::Occupied(..) => {}
            }
            idx = (idx + 1) & mask;
        }
    }

    /// Looks up `key`, returning a reference to its value if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mask = self.slots.len() - 1;
        let mut idx = self.index_for(key);
        let start = idx;
        loop {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(k, v) if k == key => return Some(v),
                _ => {}
            }
            idx = (idx + 1) & mask;
            if idx == start {
                return None;
            }
        }
    }

    /// Removes `key`, returning its value if it was present. Leaves a
    /// tombstone so later probes for colliding keys still terminate
    /// correctly.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mask = self.slots.len() - 1;
        let mut idx = self.index_for(key);
        let start = idx;
        loop {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(k, _) if k == key => {
                    let Slot::Occupied(_, v) = std::mem::replace(&mut self.slots[idx], Slot::Tombstone)
                    else {
                        unreachable!()
                    };
                    self.len -= 1;
                    self.tombstones += 1;
                    return Some(v);
                }
                _ => {}
            }
            idx = (idx + 1) & mask;
            if idx == start {
                return None;
            }
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(4).next_power_of_two();
        let old = std::mem::replace(
            &mut self.slots,
            (0..new_capacity).map(|_| Slot::Empty).collect(),
        );
        self.len = 0;
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                self.insert(k, v);
            }
        }
    }
}
