//! Small bounded cache primitives shared by the placement cache
//! (`spec.md` §4.3), the subprocess command-cache (`spec.md` §4.6c), and
//! the measurement-sample ring (`spec.md` §3).

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::Mutex,
    time::{Duration, Instant},
};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// A capacity-bounded, TTL-expiring, LRU-evicted cache guarded by a
/// single mutex — the same "single writer discipline through an
/// explicit critical section" the spec requires for shared caches
/// (`spec.md` §5).
pub struct TtlLru<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    order: Mutex<VecDeque<K>>,
}

impl<K, V> TtlLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() > self.ttl);
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());

        if !entries.contains_key(&key) {
            order.push_back(key.clone());
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );

        while entries.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bounded, drop-oldest ring buffer — the 24h measurement-sample
/// retention horizon and the analyzer's overload-shedding channel both
/// reduce to "bounded, drop oldest on overflow" (`spec.md` §3, §4.8).
pub struct Ring<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T: Clone> Ring<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Returns the dropped item, if the ring was already full.
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        dropped
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Pops the oldest item, if any. Used by a drop-oldest ingestion
    /// queue's worker side (`spec.md` §4.8).
    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    /// Removes items for which `keep` returns `false`, used for the
    /// periodic retention trim.
    pub fn retain<F: FnMut(&T) -> bool>(&self, mut keep: F) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|item| keep(item));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_oldest_over_capacity() {
        let cache: TtlLru<u32, u32> = TtlLru::new(2, Duration::from_secs(30));
        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn ttl_expires_entries() {
        let cache: TtlLru<u32, u32> = TtlLru::new(10, Duration::from_millis(1));
        cache.put(1, 10);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn ring_pop_front_drains_oldest_first() {
        let ring: Ring<u32> = Ring::new(4);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.pop_front(), Some(1));
        assert_eq!(ring.pop_front(), Some(2));
        assert_eq!(ring.pop_front(), None);
    }

    #[test]
    fn ring_drops_oldest_when_full() {
        let ring: Ring<u32> = Ring::new(2);
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), Some(1));
        assert_eq!(ring.snapshot(), vec![2, 3]);
    }
}
