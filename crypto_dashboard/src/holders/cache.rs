use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    last_used: u64,
}

struct Inner<V> {
    entries: HashMap<(String, u64), Entry<V>>,
    tick: u64,
}

/// Кэш с ключом (строка, временное окно) и вытеснением по LRU.
///
/// Записи не истекают сами: устаревание происходит за счёт смены окна в ключе,
/// а объём ограничен `capacity`.
#[derive(Clone)]
pub struct BucketedCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
    capacity: usize,
}

impl<V: Clone> BucketedCache<V> {
    pub fn new(capacity: usize) -> Self {
        BucketedCache {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, key: &str, bucket: u64) -> Option<V> {
        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;
        inner
            .entries
            .get_mut(&(key.to_string(), bucket))
            .map(|entry| {
                entry.last_used = tick;
                entry.value.clone()
            })
    }

    pub async fn insert(&self, key: &str, bucket: u64, value: V) {
        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;
        let cache_key = (key.to_string(), bucket);

        if !inner.entries.contains_key(&cache_key) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Вытеснение из кэша: {}@{}", oldest.0, oldest.1);
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            cache_key,
            Entry {
                value,
                last_used: tick,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_only_within_same_bucket() {
        let cache = BucketedCache::new(8);
        cache.insert("BTC", 10, 1.5).await;

        assert_eq!(cache.get("BTC", 10).await, Some(1.5));
        assert_eq!(cache.get("BTC", 11).await, None);
        assert_eq!(cache.get("ETH", 10).await, None);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = BucketedCache::new(2);
        cache.insert("a", 1, "A".to_string()).await;
        cache.insert("b", 1, "B".to_string()).await;

        // "a" становится самым свежим
        assert!(cache.get("a", 1).await.is_some());
        cache.insert("c", 1, "C".to_string()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("b", 1).await.is_none());
        assert_eq!(cache.get("a", 1).await.as_deref(), Some("A"));
        assert_eq!(cache.get("c", 1).await.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn overwrite_does_not_evict() {
        let cache = BucketedCache::new(2);
        cache.insert("a", 1, 1).await;
        cache.insert("b", 1, 2).await;
        cache.insert("a", 1, 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a", 1).await, Some(3));
        assert_eq!(cache.get("b", 1).await, Some(2));
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let cache: BucketedCache<u8> = BucketedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("x", 0, 1).await;
        cache.insert("y", 0, 2).await;
        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
