//! Short-TTL memoization of analysis results.
//!
//! Keyed by (identifier, scenario). No capacity bound and no background
//! sweep: a stale entry is evicted only when its own key is read again.
//! The whole check/evict/compute/store sequence holds one async mutex, so
//! concurrent callers for the same key compute at most once and the TTL
//! check can never race a store.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use db_impact_shared::ImpactResult;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identifier: String,
    pub scenario: String,
}

struct CacheEntry {
    result: ImpactResult,
    inserted_at: Instant,
}

pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live entry for `key`, or run `compute`, store its result
    /// and return it. Errors from `compute` are never stored.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<ImpactResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ImpactResult>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                debug!(
                    "Cache hit for {}/{}",
                    key.identifier, key.scenario
                );
                return Ok(entry.result.clone());
            }
            entries.remove(&key);
        }

        let result = compute().await?;
        entries.insert(
            key,
            CacheEntry {
                result: result.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use db_impact_shared::Severity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_result() -> ImpactResult {
        ImpactResult {
            sla_violation: true,
            rto_violation: false,
            rpo_violation: false,
            expected_outage_time_minutes: 30,
            business_severity: Severity::Medium,
            why: vec!["backup window exposure".to_string()],
            recommendations: vec!["enable PITR".to_string()],
            confidence: 0.9,
        }
    }

    fn key() -> CacheKey {
        CacheKey {
            identifier: "prod-orders-db-01".to_string(),
            scenario: "primary_db_failure".to_string(),
        }
    }

    #[tokio::test]
    async fn second_read_within_ttl_skips_compute() {
        let cache = ResultCache::new(Duration::from_secs(600));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_compute(key(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_result())
                })
                .await
                .unwrap();
            assert_eq!(result.business_severity, Severity::Medium);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_after_expiry_recomputes() {
        let cache = ResultCache::new(Duration::from_millis(40));
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_result())
        };

        cache.get_or_compute(key(), compute).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.get_or_compute(key(), compute).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_keys_compute_independently() {
        let cache = ResultCache::new(Duration::from_secs(600));
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_result())
        };

        cache.get_or_compute(key(), compute).await.unwrap();
        let other = CacheKey {
            identifier: "prod-orders-db-01".to_string(),
            scenario: "replica_lag".to_string(),
        };
        cache.get_or_compute(other, compute).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResultCache::new(Duration::from_secs(600));
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_compute(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::ServiceUnavailable("reasoner down".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));

        cache
            .get_or_compute(key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_result())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_readers_compute_at_most_once() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(600)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(sample_result())
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
