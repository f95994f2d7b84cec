//! Per-user daily generation quota
//!
//! Counts live in the document store under one key per user and UTC day, so
//! the quota resets when the date rolls over and old records are never
//! touched again. Checking and recording are separate steps: a request only
//! consumes quota once it has produced a result.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::store::{to_document, DocumentStore, StoreResult};

pub const RATE_LIMIT_COLLECTION: &str = "rate_limits";

/// Generations allowed per user per day
pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Document id for a user's counter on a given day
pub fn rate_limit_key(user_id: &str, date: NaiveDate) -> String {
    format!("ai_generation_{}_{}", user_id, date.format("%Y-%m-%d"))
}

/// Outcome of a quota check, later handed back to [`DailyRateLimiter::commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    key: String,
    user_id: String,
    /// Count read at check time
    pub current_count: u32,
    pub allowed: bool,
}

#[derive(Clone)]
pub struct DailyRateLimiter {
    store: Arc<dyn DocumentStore>,
    daily_limit: u32,
}

impl DailyRateLimiter {
    pub fn new(store: Arc<dyn DocumentStore>, daily_limit: u32) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Read today's count for the user. Writes nothing.
    pub async fn check_and_reserve(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Reservation> {
        let key = rate_limit_key(user_id, now.date_naive());
        let current_count = self.stored_count(&key).await?;

        Ok(Reservation {
            key,
            user_id: user_id.to_string(),
            current_count,
            allowed: current_count < self.daily_limit,
        })
    }

    async fn stored_count(&self, key: &str) -> StoreResult<u32> {
        Ok(self
            .store
            .get(RATE_LIMIT_COLLECTION, key)
            .await?
            .and_then(|doc| doc.get("count").and_then(|c| c.as_u64()))
            .map_or(0, |c| u32::try_from(c).unwrap_or(u32::MAX)))
    }

    /// Record one generation against the reservation's day.
    ///
    /// Re-reads the counter and writes one past the larger of the stored and
    /// reserved counts, so the count never goes down within a day. The read
    /// and write are still separate steps: requests that passed the check
    /// concurrently can all complete, overshooting the cap by at most the
    /// number in flight.
    pub async fn commit(&self, reservation: &Reservation, now: DateTime<Utc>) -> StoreResult<u32> {
        let stored = self.stored_count(&reservation.key).await?;
        let count = stored.max(reservation.current_count).saturating_add(1);
        let fields = to_document(&json!({
            "count": count,
            "lastRequest": now.timestamp_millis(),
            "userId": reservation.user_id,
        }))?;

        self.store
            .set_merge(RATE_LIMIT_COLLECTION, &reservation.key, fields)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn limiter() -> (Arc<MemoryStore>, DailyRateLimiter) {
        let store = Arc::new(MemoryStore::new());
        let limiter = DailyRateLimiter::new(store.clone(), DEFAULT_DAILY_LIMIT);
        (store, limiter)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    async fn stored_count(store: &MemoryStore, key: &str) -> Option<u64> {
        store
            .get(RATE_LIMIT_COLLECTION, key)
            .await
            .unwrap()
            .and_then(|doc| doc.get("count").and_then(|c| c.as_u64()))
    }

    #[test]
    fn test_key_format() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(rate_limit_key("u1", date), "ai_generation_u1_2026-01-02");
    }

    #[tokio::test]
    async fn test_check_does_not_write() {
        let (store, limiter) = limiter();
        let reservation = limiter.check_and_reserve("u1", noon()).await.unwrap();

        assert!(reservation.allowed);
        assert_eq!(reservation.current_count, 0);
        assert_eq!(store.count(RATE_LIMIT_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_commit_increments() {
        let (store, limiter) = limiter();

        for expected in 1..=3 {
            let reservation = limiter.check_and_reserve("u1", noon()).await.unwrap();
            assert_eq!(limiter.commit(&reservation, noon()).await.unwrap(), expected);
        }

        let key = rate_limit_key("u1", noon().date_naive());
        assert_eq!(stored_count(&store, &key).await, Some(3));
    }

    #[tokio::test]
    async fn test_limit_boundary() {
        let (_, limiter) = limiter();

        // Drive the counter to 19
        for _ in 0..19 {
            let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
            limiter.commit(&r, noon()).await.unwrap();
        }

        let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
        assert_eq!(r.current_count, 19);
        assert!(r.allowed);
        assert_eq!(limiter.commit(&r, noon()).await.unwrap(), 20);

        let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
        assert_eq!(r.current_count, 20);
        assert!(!r.allowed);
    }

    #[tokio::test]
    async fn test_new_day_resets() {
        let (store, limiter) = limiter();
        let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
        limiter.commit(&r, noon()).await.unwrap();

        let tomorrow = noon() + chrono::Duration::days(1);
        let r = limiter.check_and_reserve("u1", tomorrow).await.unwrap();
        assert_eq!(r.current_count, 0);

        // Yesterday's record is left alone
        assert_eq!(store.count(RATE_LIMIT_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let (_, limiter) = limiter();
        let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
        limiter.commit(&r, noon()).await.unwrap();

        let other = limiter.check_and_reserve("u2", noon()).await.unwrap();
        assert_eq!(other.current_count, 0);
    }

    #[tokio::test]
    async fn test_interleaved_commits_never_lower_the_count() {
        let (store, limiter) = limiter();
        let key = rate_limit_key("u1", noon().date_naive());

        // a and b pass the check together, c checks after b has committed
        let a = limiter.check_and_reserve("u1", noon()).await.unwrap();
        let b = limiter.check_and_reserve("u1", noon()).await.unwrap();
        assert_eq!(limiter.commit(&b, noon()).await.unwrap(), 1);

        let c = limiter.check_and_reserve("u1", noon()).await.unwrap();
        assert_eq!(c.current_count, 1);
        assert_eq!(limiter.commit(&c, noon()).await.unwrap(), 2);

        // a read 0 but lands last
        assert_eq!(limiter.commit(&a, noon()).await.unwrap(), 3);
        assert_eq!(stored_count(&store, &key).await, Some(3));
    }

    #[tokio::test]
    async fn test_commit_keeps_reserved_count_when_record_vanished() {
        let (store, limiter) = limiter();
        let key = rate_limit_key("u1", noon().date_naive());
        store
            .set(
                RATE_LIMIT_COLLECTION,
                &key,
                json!({ "count": 5 }).as_object().unwrap().clone(),
            )
            .await
            .unwrap();

        let r = limiter.check_and_reserve("u1", noon()).await.unwrap();
        store
            .set(RATE_LIMIT_COLLECTION, &key, Default::default())
            .await
            .unwrap();

        assert_eq!(limiter.commit(&r, noon()).await.unwrap(), 6);
    }
}
