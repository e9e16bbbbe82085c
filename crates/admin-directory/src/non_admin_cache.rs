//! Negative cache of senders already proven not to be admins.

use core::time::Duration;

use moka::future::Cache;
use serde::Deserialize;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NonAdminCacheConfig {
    /// Upper bound on remembered senders; the least useful entries go first.
    pub max_capacity: u64,
    /// Forget a sender after this many seconds. `None` keeps entries for the
    /// life of the process.
    pub ttl_secs: Option<u64>,
}

impl Default for NonAdminCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl_secs: None,
        }
    }
}

/// Sender JIDs whose fingerprint matched no admin.
///
/// Entries are never invalidated by a fingerprint refresh: a sender cached
/// here stays a non-admin until evicted or expired.
#[derive(Debug, Clone)]
pub struct NonAdminCache {
    cache: Cache<String, ()>,
}

impl NonAdminCache {
    #[must_use]
    pub fn new(config: NonAdminCacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        Self {
            cache: builder.build(),
        }
    }

    pub async fn contains(&self, jid: &str) -> bool {
        self.cache.get(jid).await.is_some()
    }

    pub async fn insert(&self, jid: &str) {
        self.cache.insert(jid.to_owned(), ()).await;
    }

    /// Approximate number of entries; pending maintenance is not flushed.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for NonAdminCache {
    fn default() -> Self {
        Self::new(NonAdminCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remembers_inserted_senders() {
        let cache = NonAdminCache::default();
        assert!(!cache.contains("a@talk.kik.com").await);
        cache.insert("a@talk.kik.com").await;
        assert!(cache.contains("a@talk.kik.com").await);
        assert!(!cache.contains("b@talk.kik.com").await);
    }

    #[tokio::test]
    async fn entry_count_tracks_inserts() {
        let cache = NonAdminCache::default();
        cache.insert("a@talk.kik.com").await;
        cache.insert("b@talk.kik.com").await;
        cache.insert("a@talk.kik.com").await;

        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let cache = NonAdminCache::new(NonAdminCacheConfig {
            max_capacity: 10,
            ttl_secs: Some(1),
        });
        cache.insert("a@talk.kik.com").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!cache.contains("a@talk.kik.com").await);
    }

    #[test]
    fn config_defaults_apply_to_missing_fields() {
        let cfg: NonAdminCacheConfig = serde_yaml::from_str("ttl_secs: 60").unwrap();
        assert_eq!(cfg.max_capacity, DEFAULT_MAX_CAPACITY);
        assert_eq!(cfg.ttl_secs, Some(60));
    }
}
