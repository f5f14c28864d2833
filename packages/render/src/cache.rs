//! # Render Cache
//!
//! Render results keyed by `(id, source hash)`.
//!
//! ## Design
//!
//! - The source text is stored with each entry. A hash match with different
//!   text counts as a miss, so a hash collision can never show the wrong
//!   diagram.
//! - The cache is bounded. When full, the least recently used entry that
//!   no current widget shows is evicted. Entries for current widgets are
//!   never evicted, so the cache may briefly exceed its capacity.

use crate::error::RenderError;
use crate::renderer::RenderedOutput;
use sketchbook_schema::{DiagramId, SourceHash};
use std::collections::{HashMap, HashSet};

pub type CacheKey = (DiagramId, SourceHash);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: DiagramId,
    pub source_hash: SourceHash,
    pub source_text: String,
    pub result: Result<RenderedOutput, RenderError>,
    /// Generation of the render that produced this entry
    pub generation: u64,
    last_used: u64,
}

impl CacheEntry {
    pub fn new(
        id: DiagramId,
        source_hash: SourceHash,
        source_text: String,
        result: Result<RenderedOutput, RenderError>,
        generation: u64,
    ) -> Self {
        Self {
            id,
            source_hash,
            source_text,
            result,
            generation,
            last_used: 0,
        }
    }

    pub fn key(&self) -> CacheKey {
        (self.id.clone(), self.source_hash)
    }
}

#[derive(Debug)]
pub struct RenderCache {
    entries: HashMap<CacheKey, CacheEntry>,
    capacity: usize,
    clock: u64,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    /// Look up an entry, marking it as recently used
    pub fn get(&mut self, id: &DiagramId, source_hash: SourceHash, source_text: &str) -> Option<&CacheEntry> {
        self.clock += 1;
        let clock = self.clock;

        let entry = self.entries.get_mut(&(id.clone(), source_hash))?;
        if entry.source_text != source_text {
            return None;
        }
        entry.last_used = clock;
        Some(&*entry)
    }

    /// Look up an entry without touching recency
    pub fn peek(&self, id: &DiagramId, source_hash: SourceHash) -> Option<&CacheEntry> {
        self.entries.get(&(id.clone(), source_hash))
    }

    /// Store an entry, then evict down to capacity sparing `current` keys
    pub fn insert(&mut self, mut entry: CacheEntry, current: &HashSet<CacheKey>) {
        self.clock += 1;
        entry.last_used = self.clock;
        self.entries.insert(entry.key(), entry);
        self.evict(current);
    }

    fn evict(&mut self, current: &HashSet<CacheKey>) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .values()
                .filter(|entry| !current.contains(&entry.key()))
                .min_by_key(|entry| entry.last_used)
                .map(CacheEntry::key);

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchbook_schema::source_hash;

    fn entry(id: &str, source: &str) -> CacheEntry {
        CacheEntry::new(
            DiagramId::from(id),
            source_hash(source),
            source.to_string(),
            Ok(RenderedOutput::new(format!("<{}>", source))),
            1,
        )
    }

    #[test]
    fn test_get_requires_matching_text() {
        let mut cache = RenderCache::new(4);
        let stored = entry("d1", "A->B");
        let hash = stored.source_hash;
        cache.insert(stored, &HashSet::new());

        assert!(cache.get(&DiagramId::from("d1"), hash, "A->B").is_some());
        assert!(cache.get(&DiagramId::from("d1"), hash, "A->C").is_none());
        assert!(cache.get(&DiagramId::from("d2"), hash, "A->B").is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = RenderCache::new(2);
        let none = HashSet::new();
        cache.insert(entry("d1", "a->b"), &none);
        cache.insert(entry("d2", "a->b"), &none);

        // Touch d1 so d2 is the oldest
        cache.get(&DiagramId::from("d1"), source_hash("a->b"), "a->b");
        cache.insert(entry("d3", "a->b"), &none);

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&DiagramId::from("d2"), source_hash("a->b")).is_none());
        assert!(cache.peek(&DiagramId::from("d1"), source_hash("a->b")).is_some());
    }

    #[test]
    fn test_current_entries_survive_eviction() {
        let mut cache = RenderCache::new(1);
        let first = entry("d1", "a->b");
        let current: HashSet<CacheKey> = [first.key()].into_iter().collect();

        cache.insert(first, &current);
        cache.insert(entry("d2", "a->b"), &current);

        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&DiagramId::from("d1"), source_hash("a->b")).is_some());
    }

    #[test]
    fn test_clear() {
        let mut cache = RenderCache::new(2);
        cache.insert(entry("d1", "a->b"), &HashSet::new());
        cache.clear();
        assert!(cache.is_empty());
    }
}
