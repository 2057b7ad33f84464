//! Bounded, TTL-based in-memory cache for authenticated API keys.
//!
//! Authenticating a key normally costs one database read. Hot keys hit the
//! same lookup on every search request, so resolved keys are cached for a
//! short window: raw-token hash -> key id. The key id is enough to record
//! usage without re-querying the store.
//!
//! # Staleness
//!
//! A cached entry can outlive a revocation by at most the TTL. The revoke
//! path additionally calls [`KeyCache::invalidate_id`], so in practice the
//! window only exists for a revocation racing a concurrent insert.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

struct CacheSlot {
    key_id: Uuid,
    inserted_at: Instant,
}

struct CacheInner {
    map: HashMap<String, CacheSlot>,
    /// Distinct keys in insertion order, oldest at the front.
    order: VecDeque<String>,
}

/// Bounded FIFO cache with per-entry TTL.
///
/// Eviction is first-in-first-out over distinct keys: when the cache is at
/// capacity, `put` removes exactly the oldest-inserted entry. Re-inserting
/// an existing key resets its position to most recent. Expired entries are
/// purged lazily when `get` touches them; there is no background sweep.
///
/// All operations take the single internal mutex; none of them block on I/O
/// or return errors.
pub struct KeyCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

impl KeyCache {
    /// Create a cache holding at most `capacity` entries, each valid for `ttl`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
            ttl,
        }
    }

    /// Look up a cached key id. Returns `None` for unknown or expired
    /// entries; expired entries are removed as a side effect.
    pub fn get(&self, token_hash: &str) -> Option<Uuid> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        match inner.map.get(token_hash) {
            Some(slot) if slot.inserted_at.elapsed() < self.ttl => Some(slot.key_id),
            Some(_) => {
                // Expired: purge both the slot and its order entry.
                inner.map.remove(token_hash);
                remove_from_order(&mut inner.order, token_hash);
                None
            }
            None => None,
        }
    }

    /// Insert or refresh an entry. At capacity, evicts exactly one entry,
    /// the oldest by insertion order, before inserting.
    pub fn put(&self, token_hash: &str, key_id: Uuid) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.map.contains_key(token_hash) {
            // Overwrite resets the insertion order to most recent.
            remove_from_order(&mut inner.order, token_hash);
        } else if inner.map.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }

        inner.map.insert(
            token_hash.to_string(),
            CacheSlot {
                key_id,
                inserted_at: Instant::now(),
            },
        );
        inner.order.push_back(token_hash.to_string());
    }

    /// Drop the entry for a raw-token hash, if present.
    pub fn invalidate(&self, token_hash: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.map.remove(token_hash).is_some() {
            remove_from_order(&mut inner.order, token_hash);
        }
    }

    /// Drop any entry resolving to the given key id.
    ///
    /// The revoke path only knows the key id, not the raw token, so this
    /// scans the map. Bounded by the cache capacity.
    pub fn invalidate_id(&self, key_id: Uuid) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let hashes: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, slot)| slot.key_id == key_id)
            .map(|(hash, _)| hash.clone())
            .collect();
        for hash in hashes {
            inner.map.remove(&hash);
            remove_from_order(&mut inner.order, &hash);
        }
    }

    /// Number of entries currently held (including not-yet-purged expired ones).
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_from_order(order: &mut VecDeque<String>, token_hash: &str) {
    if let Some(pos) = order.iter().position(|k| k == token_hash) {
        order.remove(pos);
    }
}
