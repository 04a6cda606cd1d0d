//! Per-key cache over contract reads with coordinated invalidation.
//!
//! Keys are `(logical name, args..., chain id)` so the same logical read on
//! different accounts or chains never collides. Concurrent queries for one
//! key coalesce onto a single producer invocation: the slot holds an async
//! mutex, so the second caller waits for the first's in-flight result and
//! then sees the freshly cached value.

use crate::error::ClientError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Full cache key for one read result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: &'static str,
    pub args: Vec<String>,
    pub chain_id: u64,
}

impl CacheKey {
    pub fn new(
        name: &'static str,
        args: impl IntoIterator<Item = String>,
        chain_id: u64,
    ) -> Self {
        CacheKey {
            name,
            args: args.into_iter().collect(),
            chain_id,
        }
    }
}

/// A key prefix used for invalidation. Matches every cached entry whose
/// logical name equals `name` and whose leading args equal `args`,
/// regardless of chain id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPrefix {
    pub name: &'static str,
    pub args: Vec<String>,
}

impl KeyPrefix {
    /// Prefix matching every entry under a logical name.
    pub fn name(name: &'static str) -> Self {
        KeyPrefix {
            name,
            args: Vec::new(),
        }
    }

    /// Prefix matching entries under a logical name with one leading arg.
    pub fn with_arg(name: &'static str, arg: impl Into<String>) -> Self {
        KeyPrefix {
            name,
            args: vec![arg.into()],
        }
    }

    fn matches(&self, key: &CacheKey) -> bool {
        key.name == self.name && key.args.starts_with(&self.args)
    }
}

enum SlotState {
    Empty,
    Fresh { value: Value, stored_at: Instant },
    // Invalidated; the next query must re-fetch.
    Stale,
}

struct Slot {
    state: Mutex<SlotState>,
}

/// Cache coordinator. Process-wide for the lifetime of the client; all
/// mutation goes through `query` / `invalidate`. An invalidated entry is
/// never served again; the next query on its key re-fetches.
pub struct QueryCache {
    slots: Mutex<HashMap<CacheKey, Arc<Slot>>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        QueryCache {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Serve the cached value if fresh, otherwise run `producer` and cache
    /// its result. A producer failure propagates without clobbering the
    /// previously cached value, so the caller's prior view stays intact.
    pub async fn query<F, Fut>(&self, key: CacheKey, producer: F) -> Result<Value, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(Slot {
                        state: Mutex::new(SlotState::Empty),
                    })
                })
                .clone()
        };

        // Holding the slot lock across the producer is what coalesces
        // concurrent callers: they block here, then hit the fresh value.
        let mut state = slot.state.lock().await;
        if let SlotState::Fresh { value, stored_at } = &*state {
            if stored_at.elapsed() < self.ttl {
                log::trace!("[cache] hit {}:{:?}", key.name, key.args);
                return Ok(value.clone());
            }
        }

        log::debug!("[cache] fetch {}:{:?}", key.name, key.args);
        let value = producer().await?;
        *state = SlotState::Fresh {
            value: value.clone(),
            stored_at: Instant::now(),
        };
        Ok(value)
    }

    /// Mark every entry matching the prefix stale, forcing the next `query`
    /// on those keys to re-fetch.
    pub async fn invalidate(&self, prefix: &KeyPrefix) {
        let matching: Vec<Arc<Slot>> = {
            let slots = self.slots.lock().await;
            slots
                .iter()
                .filter(|(k, _)| prefix.matches(k))
                .map(|(_, s)| s.clone())
                .collect()
        };
        if !matching.is_empty() {
            log::debug!(
                "[cache] invalidate {}:{:?} ({} entries)",
                prefix.name,
                prefix.args,
                matching.len()
            );
        }
        for slot in matching {
            let mut state = slot.state.lock().await;
            if matches!(&*state, SlotState::Fresh { .. }) {
                *state = SlotState::Stale;
            }
        }
    }

    /// Drop expired and stale entries. Called opportunistically after write
    /// invalidation; entries under a held producer lock are skipped and
    /// collected on a later sweep.
    pub async fn sweep(&self) {
        let mut slots = self.slots.lock().await;
        let ttl = self.ttl;
        let mut dead = Vec::new();
        for (key, slot) in slots.iter() {
            if let Ok(state) = slot.state.try_lock() {
                let expired = match &*state {
                    SlotState::Empty => true,
                    SlotState::Stale => true,
                    SlotState::Fresh { stored_at, .. } => stored_at.elapsed() >= ttl,
                };
                if expired {
                    dead.push(key.clone());
                }
            }
        }
        for key in dead {
            slots.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &'static str, arg: &str) -> CacheKey {
        CacheKey::new(name, [arg.to_string()], 31337)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .query(key("profile", "0xabc"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(["alice"]))
                })
                .await
                .unwrap();
            assert_eq!(v, json!(["alice"]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_queries_coalesce_to_one_producer() {
        let cache = Arc::new(QueryCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .query(key("profile", "0xabc"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(json!(1))
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), json!(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch_of_matching_prefix() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let fetch = |k: CacheKey| {
            let calls = &calls;
            cache.query(k, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(true))
            })
        };

        fetch(key("is_following", "0xaaa")).await.unwrap();
        fetch(key("profile", "0xaaa")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate(&KeyPrefix::name("is_following")).await;

        // is_following re-fetches, profile is still fresh
        fetch(key("is_following", "0xaaa")).await.unwrap();
        fetch(key("profile", "0xaaa")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn prefix_with_arg_spares_other_args() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for who in ["0xaaa", "0xbbb"] {
            cache
                .query(key("profile", who), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!([who]))
                })
                .await
                .unwrap();
        }
        cache.invalidate(&KeyPrefix::with_arg("profile", "0xaaa")).await;

        for who in ["0xaaa", "0xbbb"] {
            cache
                .query(key("profile", who), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!([who]))
                })
                .await
                .unwrap();
        }
        // only 0xaaa re-fetched
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn producer_failure_keeps_prior_value() {
        let cache = QueryCache::new(Duration::ZERO); // everything expires at once
        let k = key("post", "1");

        cache
            .query(k.clone(), || async { Ok(json!("v1")) })
            .await
            .unwrap();

        let err = cache
            .query(k.clone(), || async {
                Err(ClientError::ChainCallFailed("boom".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ChainCallFailed(_)));

        // Next producer runs again (TTL zero) and succeeds
        let v = cache.query(k, || async { Ok(json!("v2")) }).await.unwrap();
        assert_eq!(v, json!("v2"));
    }

    #[tokio::test]
    async fn sweep_evicts_stale_entries() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache
            .query(key("profile", "0xaaa"), || async { Ok(json!(1)) })
            .await
            .unwrap();
        cache
            .query(key("profile", "0xbbb"), || async { Ok(json!(2)) })
            .await
            .unwrap();
        cache.invalidate(&KeyPrefix::with_arg("profile", "0xaaa")).await;
        cache.sweep().await;
        assert_eq!(cache.len().await, 1);
    }
}
