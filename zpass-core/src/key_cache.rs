//! Proving/verifying key cache.
//!
//! Key synthesis is the most expensive step of every proof workflow, so key
//! pairs are cached under `program_id:function`. An entry is only valid for the
//! exact program source it was synthesized from; the source is compared by
//! SHA-256 digest. Which entries survive an insert is decided by an
//! [`EvictionPolicy`]. The default, [`SingleSlot`], keeps only the most recently
//! synthesized entry, so alternating between two programs synthesizes on every
//! switch.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    num::NonZeroUsize,
};

use sha2::{Digest, Sha256};

use crate::{config::CachePolicy, engine::KeyPair};

/// Identifies one key pair: `program_id:function`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `function` of `program_id`.
    #[must_use]
    pub fn new(program_id: &str, function: &str) -> Self {
        Self(format!("{program_id}:{function}"))
    }

    /// The key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides which cached entries to drop.
///
/// The cache notifies the policy of every hit and insert; after an insert it
/// removes whatever keys the policy returns (which may include the key just inserted).
pub trait EvictionPolicy: Send + fmt::Debug {
    /// Called when `key` is served from the cache.
    fn record_hit(&mut self, key: &CacheKey);

    /// Called after `key` is inserted or replaced. Returns the keys to evict.
    fn record_insert(&mut self, key: &CacheKey) -> Vec<CacheKey>;

    /// Called when the cache is cleared.
    fn reset(&mut self);
}

/// Keeps only the most recently inserted entry.
#[derive(Debug, Default)]
pub struct SingleSlot {
    current: Option<CacheKey>,
}

impl EvictionPolicy for SingleSlot {
    fn record_hit(&mut self, _key: &CacheKey) {}

    fn record_insert(&mut self, key: &CacheKey) -> Vec<CacheKey> {
        match self.current.replace(key.clone()) {
            Some(previous) if &previous != key => vec![previous],
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// Keeps up to `capacity` entries, evicting the least recently used.
#[derive(Debug)]
pub struct Lru {
    capacity: NonZeroUsize,
    order: VecDeque<CacheKey>,
}

impl Lru {
    /// An LRU policy retaining at most `capacity` entries.
    #[must_use]
    pub const fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
        self.order.push_back(key.clone());
    }
}

impl EvictionPolicy for Lru {
    fn record_hit(&mut self, key: &CacheKey) {
        self.touch(key);
    }

    fn record_insert(&mut self, key: &CacheKey) -> Vec<CacheKey> {
        self.touch(key);
        let mut evicted = Vec::new();
        while self.order.len() > self.capacity.get() {
            if let Some(oldest) = self.order.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    fn reset(&mut self) {
        self.order.clear();
    }
}

/// Never evicts.
#[derive(Debug, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn record_hit(&mut self, _key: &CacheKey) {}

    fn record_insert(&mut self, _key: &CacheKey) -> Vec<CacheKey> {
        Vec::new()
    }

    fn reset(&mut self) {}
}

/// Retains nothing: every lookup misses.
#[derive(Debug, Default)]
pub struct Disabled;

impl EvictionPolicy for Disabled {
    fn record_hit(&mut self, _key: &CacheKey) {}

    fn record_insert(&mut self, key: &CacheKey) -> Vec<CacheKey> {
        vec![key.clone()]
    }

    fn reset(&mut self) {}
}

impl From<CachePolicy> for Box<dyn EvictionPolicy> {
    fn from(policy: CachePolicy) -> Self {
        match policy {
            CachePolicy::SingleSlot => Box::new(SingleSlot::default()),
            CachePolicy::Lru { capacity } => Box::new(Lru::new(capacity)),
            CachePolicy::Unbounded => Box::new(Unbounded),
            CachePolicy::Disabled => Box::new(Disabled),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that required synthesis.
    pub misses: u64,
    /// Entries dropped by the eviction policy.
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    program_digest: [u8; 32],
    keys: KeyPair,
}

fn program_digest(source: &str) -> [u8; 32] {
    Sha256::digest(source.as_bytes()).into()
}

/// Key pairs by [`CacheKey`], with the most recently synthesized one marked active.
#[derive(Debug)]
pub struct KeyCache {
    entries: HashMap<CacheKey, CacheEntry>,
    active: Option<CacheKey>,
    policy: Box<dyn EvictionPolicy>,
    stats: CacheStats,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::with_policy(Box::new(SingleSlot::default()))
    }
}

impl KeyCache {
    /// An empty cache using `policy` for eviction.
    #[must_use]
    pub fn with_policy(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: HashMap::new(),
            active: None,
            policy,
            stats: CacheStats::default(),
        }
    }

    /// Returns the keys cached under `key` if they were synthesized from `program_source`.
    ///
    /// An entry for the same key but a different source counts as a miss.
    pub fn get(&mut self, key: &CacheKey, program_source: &str) -> Option<KeyPair> {
        let digest = program_digest(program_source);
        match self.entries.get(key) {
            Some(entry) if entry.program_digest == digest => {
                self.stats.hits += 1;
                self.policy.record_hit(key);
                Some(entry.keys.clone())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores freshly synthesized keys, marks them active and applies the eviction policy.
    pub fn insert(&mut self, key: CacheKey, program_source: &str, keys: KeyPair) {
        let entry = CacheEntry {
            program_digest: program_digest(program_source),
            keys,
        };
        let evicted = self.policy.record_insert(&key);
        self.entries.insert(key.clone(), entry);
        for stale in evicted {
            if self.entries.remove(&stale).is_some() {
                self.stats.evictions += 1;
            }
            if self.active.as_ref() == Some(&stale) {
                self.active = None;
            }
        }
        if self.entries.contains_key(&key) {
            self.active = Some(key);
        }
    }

    /// The key of the most recently synthesized entry still cached.
    #[must_use]
    pub const fn active_key(&self) -> Option<&CacheKey> {
        self.active.as_ref()
    }

    /// Whether keys are cached under `key`, regardless of source.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached key pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit, miss and eviction counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = None;
        self.policy.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProvingKey, VerifyingKey};

    fn keys(tag: &str) -> KeyPair {
        KeyPair {
            proving_key: ProvingKey::new(format!("prover1{tag}")),
            verifying_key: VerifyingKey::new(format!("verifier1{tag}")),
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(
            CacheKey::new("verify_poseidon2_zpass.aleo", "issue").as_str(),
            "verify_poseidon2_zpass.aleo:issue"
        );
    }

    #[test]
    fn test_single_slot_keeps_latest_only() {
        let mut cache = KeyCache::default();
        let a = CacheKey::new("a.aleo", "f");
        let b = CacheKey::new("b.aleo", "f");

        cache.insert(a.clone(), "program a.aleo;", keys("a"));
        assert_eq!(cache.get(&a, "program a.aleo;"), Some(keys("a")));

        cache.insert(b.clone(), "program b.aleo;", keys("b"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.active_key(), Some(&b));
        assert_eq!(cache.get(&a, "program a.aleo;"), None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_changed_source_is_a_miss() {
        let mut cache = KeyCache::default();
        let a = CacheKey::new("a.aleo", "f");
        cache.insert(a.clone(), "program a.aleo; // v1", keys("v1"));

        assert_eq!(cache.get(&a, "program a.aleo; // v2"), None);
        assert!(cache.contains(&a));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache =
            KeyCache::with_policy(Box::new(Lru::new(NonZeroUsize::new(2).unwrap())));
        let a = CacheKey::new("a.aleo", "f");
        let b = CacheKey::new("b.aleo", "f");
        let c = CacheKey::new("c.aleo", "f");

        cache.insert(a.clone(), "a", keys("a"));
        cache.insert(b.clone(), "b", keys("b"));
        assert!(cache.get(&a, "a").is_some());
        cache.insert(c.clone(), "c", keys("c"));

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.active_key(), Some(&c));
    }

    #[test]
    fn test_disabled_retains_nothing() {
        let mut cache = KeyCache::with_policy(CachePolicy::Disabled.into());
        let a = CacheKey::new("a.aleo", "f");
        cache.insert(a.clone(), "a", keys("a"));

        assert!(cache.is_empty());
        assert_eq!(cache.active_key(), None);
        assert_eq!(cache.get(&a, "a"), None);
    }

    #[test]
    fn test_unbounded_and_clear() {
        let mut cache = KeyCache::with_policy(CachePolicy::Unbounded.into());
        for name in ["a", "b", "c"] {
            cache.insert(CacheKey::new(name, "f"), name, keys(name));
        }
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.active_key(), None);
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = KeyCache::default();
        let a = CacheKey::new("a.aleo", "f");
        assert!(cache.get(&a, "a").is_none());
        cache.insert(a.clone(), "a", keys("a"));
        assert!(cache.get(&a, "a").is_some());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
