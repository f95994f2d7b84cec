//! Generation cache
//!
//! Result sets are keyed by (lowercased topic, count, audience). Entries older
//! than the TTL are ignored on read but never deleted; the next successful
//! generation for the key overwrites them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{to_document, DocumentStore, StoreResult};
use crate::types::{ProviderTag, TriviaItem};

pub const CACHE_COLLECTION: &str = "ai_cache";

/// Default entry lifetime in hours
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// A usable cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub items: Vec<TriviaItem>,
    pub provider: ProviderTag,
    pub created_at: DateTime<Utc>,
}

/// Stored shape. `timestamp` is milliseconds since the epoch.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    trivia: Vec<TriviaItem>,
    #[serde(default)]
    provider: Option<ProviderTag>,
    #[serde(default)]
    timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
}

/// Document id for a cache key
pub fn cache_key(topic: &str, count: u32, is_youth: bool) -> String {
    format!("ai_cache_{}_{}_{}", topic.to_lowercase(), count, is_youth)
}

#[derive(Clone)]
pub struct GenerationCache {
    store: Arc<dyn DocumentStore>,
    ttl: chrono::Duration,
}

impl GenerationCache {
    pub fn new(store: Arc<dyn DocumentStore>, ttl: chrono::Duration) -> Self {
        Self { store, ttl }
    }

    /// Look up a usable entry. Stale, empty or unreadable entries are misses.
    pub async fn get(
        &self,
        topic: &str,
        count: u32,
        is_youth: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<CacheEntry>> {
        let key = cache_key(topic, count, is_youth);
        let Some(doc) = self.store.get(CACHE_COLLECTION, &key).await? else {
            return Ok(None);
        };

        let doc: CacheDocument = match serde_json::from_value(serde_json::Value::Object(doc)) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable cache entry");
                return Ok(None);
            }
        };

        let Some(created_at) = DateTime::from_timestamp_millis(doc.timestamp) else {
            return Ok(None);
        };

        if now - created_at >= self.ttl || doc.trivia.is_empty() {
            tracing::debug!(key, "Cache entry stale or empty");
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            items: doc.trivia,
            provider: doc.provider.unwrap_or(ProviderTag::Cached),
            created_at,
        }))
    }

    /// Store a fresh result set, overwriting whatever the key held
    pub async fn put(
        &self,
        topic: &str,
        count: u32,
        is_youth: bool,
        items: &[TriviaItem],
        provider: ProviderTag,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let key = cache_key(topic, count, is_youth);
        let doc = CacheDocument {
            trivia: items.to_vec(),
            provider: Some(provider),
            timestamp: now.timestamp_millis(),
            topic: Some(topic.to_string()),
        };

        self.store
            .set_merge(CACHE_COLLECTION, &key, to_document(&doc)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn item(category: &str) -> TriviaItem {
        TriviaItem {
            category: category.to_string(),
            words: vec!["Nile".into(), "Paris".into()],
            correct_answers: vec!["Nile".into()],
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn cache() -> (Arc<MemoryStore>, GenerationCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = GenerationCache::new(store.clone(), chrono::Duration::hours(DEFAULT_CACHE_TTL_HOURS));
        (store, cache)
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(cache_key("Rivers", 5, false), "ai_cache_rivers_5_false");
        assert_eq!(cache_key("RIVERS", 5, true), "ai_cache_rivers_5_true");
    }

    #[tokio::test]
    async fn test_put_then_get_case_insensitive() {
        let (_, cache) = cache();
        cache
            .put("Rivers", 5, false, &[item("rivers")], ProviderTag::Gemini, start())
            .await
            .unwrap();

        let hit = cache
            .get("rivers", 5, false, start() + chrono::Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.items, vec![item("rivers")]);
        assert_eq!(hit.provider, ProviderTag::Gemini);
        assert_eq!(hit.created_at, start());

        // Count and audience are part of the key
        assert!(cache.get("rivers", 6, false, start()).await.unwrap().is_none());
        assert!(cache.get("rivers", 5, true, start()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_miss_but_kept() {
        let (store, cache) = cache();
        cache
            .put("rivers", 5, false, &[item("rivers")], ProviderTag::Anthropic, start())
            .await
            .unwrap();

        let just_before = start() + chrono::Duration::hours(24) - chrono::Duration::milliseconds(1);
        assert!(cache.get("rivers", 5, false, just_before).await.unwrap().is_some());

        let at_ttl = start() + chrono::Duration::hours(24);
        assert!(cache.get("rivers", 5, false, at_ttl).await.unwrap().is_none());
        assert_eq!(store.count(CACHE_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_empty_entry_is_miss() {
        let (_, cache) = cache();
        cache
            .put("rivers", 5, false, &[], ProviderTag::Gemini, start())
            .await
            .unwrap();
        assert!(cache.get("rivers", 5, false, start()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_on_fresh_generation() {
        let (_, cache) = cache();
        cache
            .put("rivers", 1, false, &[item("old")], ProviderTag::Gemini, start())
            .await
            .unwrap();
        let later = start() + chrono::Duration::hours(30);
        cache
            .put("rivers", 1, false, &[item("new")], ProviderTag::Anthropic, later)
            .await
            .unwrap();

        let hit = cache.get("rivers", 1, false, later).await.unwrap().unwrap();
        assert_eq!(hit.items, vec![item("new")]);
        assert_eq!(hit.provider, ProviderTag::Anthropic);
    }

    #[tokio::test]
    async fn test_missing_provider_reports_cached() {
        let (store, cache) = cache();
        let doc = json!({
            "trivia": [item("rivers")],
            "timestamp": start().timestamp_millis(),
        });
        let serde_json::Value::Object(doc) = doc else {
            unreachable!()
        };
        store
            .set(CACHE_COLLECTION, &cache_key("rivers", 1, false), doc)
            .await
            .unwrap();

        let hit = cache.get("rivers", 1, false, start()).await.unwrap().unwrap();
        assert_eq!(hit.provider, ProviderTag::Cached);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_miss() {
        let (store, cache) = cache();
        let serde_json::Value::Object(doc) = json!({"trivia": "not a list"}) else {
            unreachable!()
        };
        store
            .set(CACHE_COLLECTION, &cache_key("rivers", 1, false), doc)
            .await
            .unwrap();
        assert!(cache.get("rivers", 1, false, start()).await.unwrap().is_none());
    }
}
