use crate::bitbase::DEFAULT_CLUSTER_SIZE;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock, Mutex};

/// The smallest useful capacity: one cluster being probed plus one being
/// evicted.
const MIN_CAPACITY: u64 = 2;

/// A process-wide cache of decompressed bitbase clusters.
///
/// Keyed by the owning bitbase's signature and the cluster number; bounded in
/// entries; least-recently-used eviction. Safe for concurrent probes: the map
/// lock is dropped around cluster loads, so two threads missing on the same
/// key may duplicate the work, but never corrupt the cache.
#[derive(Debug, Default)]
pub struct ClusterCache {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: FxHashMap<(u32, u32), Entry>,
    capacity: usize,
    stamp: u64,
}

#[derive(Debug)]
struct Entry {
    bytes: Arc<[u8]>,
    last_used: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            entries: FxHashMap::default(),
            capacity: 8192,
            stamp: 0,
        }
    }
}

impl ClusterCache {
    /// The single long-lived cache shared by every file-backed bitbase.
    pub fn shared() -> Arc<ClusterCache> {
        static CACHE: LazyLock<Arc<ClusterCache>> =
            LazyLock::new(|| Arc::new(ClusterCache::default()));
        Arc::clone(&CACHE)
    }

    /// A cache bounded to `capacity` entries.
    pub fn with_capacity(capacity: u64) -> Self {
        let cache = ClusterCache::default();
        cache.set_capacity(capacity);
        cache
    }

    /// Bounds the cache to `capacity` entries, clamped to at least two.
    pub fn set_capacity(&self, capacity: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.capacity = capacity.clamp(MIN_CAPACITY, u32::MAX as u64) as usize;
        while inner.entries.len() > inner.capacity {
            evict(&mut inner);
        }
    }

    /// Bounds the cache to however many default-sized clusters fit in
    /// `megabytes`.
    pub fn set_capacity_mb(&self, megabytes: u64) {
        self.set_capacity((megabytes << 20) / DEFAULT_CLUSTER_SIZE as u64);
    }

    /// The number of cached clusters.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The decompressed cluster `(id, cluster)`, loading it through `load` on
    /// a miss.
    pub fn get<E>(
        &self,
        id: u32,
        cluster: u32,
        load: impl FnOnce() -> Result<Vec<u8>, E>,
    ) -> Result<Arc<[u8]>, E> {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.stamp += 1;
            let stamp = inner.stamp;
            if let Some(entry) = inner.entries.get_mut(&(id, cluster)) {
                entry.last_used = stamp;
                return Ok(Arc::clone(&entry.bytes));
            }
        }

        let bytes: Arc<[u8]> = load()?.into();

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.stamp += 1;
        let stamp = inner.stamp;
        while inner.entries.len() >= inner.capacity {
            evict(&mut inner);
        }

        inner.entries.insert(
            (id, cluster),
            Entry {
                bytes: Arc::clone(&bytes),
                last_used: stamp,
            },
        );

        Ok(bytes)
    }
}

fn evict(inner: &mut Inner) {
    let victim = inner
        .entries
        .iter()
        .min_by_key(|(_, e)| e.last_used)
        .map(|(&k, _)| k);

    if let Some(victim) = victim {
        inner.entries.remove(&victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loader(byte: u8) -> impl FnOnce() -> Result<Vec<u8>, Infallible> {
        move || Ok(vec![byte; 8])
    }

    #[test]
    fn hit_returns_cached_bytes_without_loading() {
        let cache = ClusterCache::with_capacity(4);
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let bytes = cache
                .get(1, 7, || -> Result<Vec<u8>, Infallible> {
                    loads.fetch_add(1, Ordering::Relaxed);
                    Ok(vec![0xAB; 8])
                })
                .unwrap();

            assert_eq!(&bytes[..], &[0xAB; 8]);
        }

        assert_eq!(loads.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn capacity_is_clamped_to_two() {
        let cache = ClusterCache::with_capacity(0);
        cache.get(0, 0, loader(0)).unwrap();
        cache.get(0, 1, loader(1)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = ClusterCache::with_capacity(2);
        cache.get(0, 0, loader(0)).unwrap();
        cache.get(0, 1, loader(1)).unwrap();

        // Refresh cluster 0, insert cluster 2; cluster 1 must go.
        cache.get(0, 0, loader(0)).unwrap();
        cache.get(0, 2, loader(2)).unwrap();

        let loads = AtomicUsize::new(0);
        cache
            .get(0, 0, || -> Result<Vec<u8>, Infallible> {
                loads.fetch_add(1, Ordering::Relaxed);
                Ok(vec![0; 8])
            })
            .unwrap();
        assert_eq!(loads.load(Ordering::Relaxed), 0);

        cache
            .get(0, 1, || -> Result<Vec<u8>, Infallible> {
                loads.fetch_add(1, Ordering::Relaxed);
                Ok(vec![1; 8])
            })
            .unwrap();
        assert_eq!(loads.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn load_errors_propagate_and_cache_nothing() {
        let cache = ClusterCache::with_capacity(4);
        assert_eq!(cache.get(9, 9, || Err("boom")), Err("boom"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn shrinking_capacity_evicts_down() {
        let cache = ClusterCache::with_capacity(8);
        for i in 0..8 {
            cache.get(0, i, loader(i as u8)).unwrap();
        }

        cache.set_capacity(2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_gets_are_safe() {
        let cache = ClusterCache::with_capacity(16);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..256u32 {
                        let byte = ((t + i) % 251) as u8;
                        let bytes = cache.get(t, i % 32, loader(byte)).unwrap();
                        assert_eq!(bytes.len(), 8);
                    }
                });
            }
        });
    }
}
