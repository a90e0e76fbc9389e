//! In-process store.
//!
//! Counters and cached responses live in this process only, so limits are
//! per worker. Used by tests and when no shared store is wanted.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};

use crate::store::{CachedResponse, CounterStore, ResponseStore, StoreError, WindowHit};

struct Window {
    count: u64,
    resets_at: Instant,
}

#[derive(Default)]
pub struct MemoryStore {
    windows: DashMap<String, Window>,
    responses: DashMap<String, (CachedResponse, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit_now(&self, key: &str, window: Duration, now: Instant) -> WindowHit {
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            resets_at: now + window,
        });
        if entry.resets_at <= now {
            entry.count = 0;
            entry.resets_at = now + window;
        }
        entry.count += 1;
        WindowHit {
            count: entry.count,
            reset_in: entry.resets_at.saturating_duration_since(now),
        }
    }
}

impl CounterStore for MemoryStore {
    fn hit<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<WindowHit, StoreError>> {
        Box::pin(future::ready(Ok(self.hit_now(key, window, Instant::now()))))
    }
}

impl ResponseStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedResponse>, StoreError>> {
        let now = Instant::now();
        let found = match self.responses.get(key) {
            Some(entry) if entry.1 > now => Some(entry.0.clone()),
            Some(_) => None,
            None => None,
        };
        if found.is_none() {
            self.responses.remove_if(key, |_, (_, expires)| *expires <= now);
        }
        Box::pin(future::ready(Ok(found)))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        response: CachedResponse,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.responses
            .insert(key.to_string(), (response, Instant::now() + ttl));
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_counts_and_resets() {
        let store = MemoryStore::new();
        let start = Instant::now();
        let window = Duration::from_secs(60);

        assert_eq!(store.hit_now("a", window, start).count, 1);
        assert_eq!(store.hit_now("a", window, start).count, 2);
        assert_eq!(store.hit_now("b", window, start).count, 1);

        let later = start + Duration::from_secs(61);
        let hit = store.hit_now("a", window, later);
        assert_eq!(hit.count, 1);
        assert_eq!(hit.reset_in, window);
    }

    #[tokio::test]
    async fn test_response_expiry() {
        let store = MemoryStore::new();
        let response = CachedResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: b"hello".to_vec(),
        };

        store.put("/a", response.clone(), Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get("/a").await.unwrap(), Some(response.clone()));

        store.put("/b", response, Duration::ZERO).await.unwrap();
        assert_eq!(store.get("/b").await.unwrap(), None);
    }
}
