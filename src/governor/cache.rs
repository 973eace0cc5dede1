// Score cache keyed by normalized text.
//
// Bounded and FIFO: when full, the oldest insertion is evicted. Every entry
// lives for a fixed TTL from the moment it was inserted; reads do not
// extend it. Re-inserting a key replaces the entry and moves it to the back.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::decision::AttributeScores;
use crate::text::NormalizedText;

#[derive(Debug, Clone)]
struct CacheEntry {
    scores: AttributeScores,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Debug)]
pub struct ScoreCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<NormalizedText, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<NormalizedText>,
}

impl ScoreCache {
    /// A capacity of zero disables caching entirely.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up fresh scores. An expired entry is dropped and reported as a miss.
    pub fn get(&mut self, key: &NormalizedText, now: Instant) -> Option<AttributeScores> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.scores.clone())
    }

    pub fn insert(&mut self, key: NormalizedText, scores: AttributeScores, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.remove(&key);
        }
        self.purge_expired(now);

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                scores,
                inserted_at: now,
                ttl: self.ttl,
            },
        );
    }

    /// Drop expired entries from the front. All entries share one TTL and
    /// `order` is sorted by insertion time, so expired keys are a prefix.
    pub fn purge_expired(&mut self, now: Instant) {
        while let Some(oldest) = self.order.front() {
            let expired = self
                .entries
                .get(oldest)
                .map_or(true, |entry| entry.is_expired(now));
            if !expired {
                break;
            }
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, key: &NormalizedText) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    const TTL: Duration = Duration::from_secs(1800);

    fn scores(value: f64) -> AttributeScores {
        [("TOXICITY", value)].into_iter().collect()
    }

    #[test]
    fn test_hit_within_ttl() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(10, TTL);
        cache.insert(normalize("hello"), scores(0.1), t0);

        let hit = cache.get(&normalize("hello"), t0 + Duration::from_secs(1799));
        assert_eq!(hit, Some(scores(0.1)));
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(10, TTL);
        cache.insert(normalize("hello"), scores(0.1), t0);

        assert_eq!(cache.get(&normalize("hello"), t0 + TTL), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reads_do_not_extend_ttl() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(10, TTL);
        cache.insert(normalize("hello"), scores(0.1), t0);

        assert!(cache.get(&normalize("hello"), t0 + Duration::from_secs(1000)).is_some());
        assert!(cache.get(&normalize("hello"), t0 + Duration::from_secs(1801)).is_none());
    }

    #[test]
    fn test_fifo_eviction_when_full() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(2, TTL);
        cache.insert(normalize("one"), scores(0.1), t0);
        cache.insert(normalize("two"), scores(0.2), t0);
        // reading "one" does not protect it
        assert!(cache.get(&normalize("one"), t0).is_some());
        cache.insert(normalize("three"), scores(0.3), t0);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&normalize("one"), t0).is_none());
        assert!(cache.get(&normalize("two"), t0).is_some());
        assert!(cache.get(&normalize("three"), t0).is_some());
    }

    #[test]
    fn test_reinsert_moves_key_to_back() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(2, TTL);
        cache.insert(normalize("one"), scores(0.1), t0);
        cache.insert(normalize("two"), scores(0.2), t0);
        cache.insert(normalize("one"), scores(0.5), t0);
        cache.insert(normalize("three"), scores(0.3), t0);

        assert_eq!(cache.get(&normalize("one"), t0), Some(scores(0.5)));
        assert!(cache.get(&normalize("two"), t0).is_none());
    }

    #[test]
    fn test_expired_entries_make_room_before_eviction() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(2, Duration::from_secs(10));
        cache.insert(normalize("old"), scores(0.1), t0);
        cache.insert(normalize("fresh"), scores(0.2), t0 + Duration::from_secs(9));
        cache.insert(normalize("new"), scores(0.3), t0 + Duration::from_secs(11));

        let now = t0 + Duration::from_secs(11);
        assert!(cache.get(&normalize("fresh"), now).is_some());
        assert!(cache.get(&normalize("new"), now).is_some());
    }

    #[test]
    fn test_zero_capacity_never_stores() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(0, TTL);
        cache.insert(normalize("hello"), scores(0.1), t0);
        assert!(cache.is_empty());
        assert!(cache.get(&normalize("hello"), t0).is_none());
    }

    #[test]
    fn test_keys_are_normalized_text() {
        let t0 = Instant::now();
        let mut cache = ScoreCache::new(10, TTL);
        cache.insert(normalize("Y0U   suck"), scores(0.7), t0);
        assert!(cache.get(&normalize("you suck"), t0).is_some());
    }
}
