//! Bounded LRU cache of parsed templates (spec §4.3 "Cache").
//!
//! Backed by a slab of entries linked into an intrusive doubly-linked list,
//! so promotion-to-most-recently-used and eviction are both O(1) instead of
//! the shift-on-full approach a `Vec`-backed LRU would need.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::ParsedTemplate;

/// Default bound on the number of distinct template strings kept parsed
/// (spec §4.3).
pub const DEFAULT_CAPACITY: usize = 128;

struct Entry {
    key: String,
    value: Arc<ParsedTemplate>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Lru {
    slab: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl Lru {
    fn new(capacity: usize) -> Self {
        Self {
            slab: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let e = self.slab[idx].as_ref().unwrap();
            (e.prev, e.next)
        };
        match prev {
            Some(p) => self.slab[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slab[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let e = self.slab[idx].as_mut().unwrap();
            e.prev = None;
            e.next = old_head;
        }
        if let Some(h) = old_head {
            self.slab[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn get(&mut self, key: &str) -> Option<Arc<ParsedTemplate>> {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        Some(self.slab[idx].as_ref().unwrap().value.clone())
    }

    /// Inserts `key`, evicting the least-recently-used entry if at capacity.
    /// Returns `true` if an eviction occurred.
    fn insert(&mut self, key: String, value: Arc<ParsedTemplate>) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            self.slab[idx].as_mut().unwrap().value = value;
            self.touch(idx);
            return false;
        }

        let mut evicted = false;
        if self.index.len() >= self.capacity {
            if let Some(tail) = self.tail {
                let tail_key = self.slab[tail].as_ref().unwrap().key.clone();
                self.detach(tail);
                self.slab[tail] = None;
                self.free.push(tail);
                self.index.remove(&tail_key);
                evicted = true;
            }
        }

        let idx = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slab.push(None);
                self.slab.len() - 1
            }
        };
        self.slab[idx] = Some(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);
        self.push_front(idx);
        evicted
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Hit/miss/eviction/lookup counters for a [`TemplateCache`] (spec §4.3
/// "Stats").
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub total_lookups: AtomicU64,
}

impl CacheStats {
    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_lookups: self.total_lookups.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_lookups: u64,
}

/// A thread-safe, bounded LRU cache mapping template strings to their parsed
/// form, shared across worker tasks behind an `Arc`.
pub struct TemplateCache {
    inner: Mutex<Lru>,
    stats: CacheStats,
}

impl TemplateCache {
    /// Creates a cache bounded at `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
            stats: CacheStats::default(),
        }
    }

    /// Looks up `template_uri`, parsing and inserting it on a miss. Parse
    /// failures are never cached (spec §4.3 "Failure semantics").
    pub fn get_or_parse(&self, template_uri: &str) -> Option<Arc<ParsedTemplate>> {
        self.stats.total_lookups.fetch_add(1, Ordering::Relaxed);
        {
            let mut lru = self.inner.lock();
            if let Some(hit) = lru.get(template_uri) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(hit);
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let parsed = Arc::new(crate::engine::parse_template(template_uri)?);
        let mut lru = self.inner.lock();
        if lru.insert(template_uri.to_string(), parsed.clone()) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Some(parsed)
    }

    /// Current number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all cached entries without affecting cumulative stats.
    pub fn clear(&self) {
        let mut lru = self.inner.lock();
        *lru = Lru::new(lru.capacity);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_and_misses_are_counted() {
        let cache = TemplateCache::new(4);
        assert!(cache.get_or_parse("a/{x}").is_some());
        assert!(cache.get_or_parse("a/{x}").is_some());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_lookups, 2);
    }

    #[test]
    fn invalid_template_is_not_cached() {
        let cache = TemplateCache::new(4);
        assert!(cache.get_or_parse("a/{").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn evicts_least_recently_used_when_over_capacity() {
        let cache = TemplateCache::new(2);
        cache.get_or_parse("a/{x}").unwrap();
        cache.get_or_parse("b/{x}").unwrap();
        cache.get_or_parse("a/{x}").unwrap(); // touch a, b becomes LRU
        cache.get_or_parse("c/{x}").unwrap(); // evicts b
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);

        // b was evicted: looking it up again is a fresh miss, not a hit.
        let misses_before = cache.stats().misses;
        cache.get_or_parse("b/{x}").unwrap();
        assert_eq!(cache.stats().misses, misses_before + 1);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let cache = TemplateCache::new(3);
        for i in 0..10 {
            cache.get_or_parse(&format!("t{i}/{{x}}")).unwrap();
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn clear_resets_entries_but_not_cumulative_stats() {
        let cache = TemplateCache::new(4);
        cache.get_or_parse("a/{x}").unwrap();
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }
}
