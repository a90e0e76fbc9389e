//! Shared key-value backends.
//!
//! # Data Flow
//! ```text
//! rate limiter ──→ CounterStore::hit (fixed window counter)
//! response cache → ResponseStore::get / put (TTL entries)
//!                      │
//!          ┌───────────┴───────────┐
//!      redis.rs (fred pool)    memory.rs (DashMap)
//!      shared by all workers   single process / tests
//! ```
//!
//! # Design Decisions
//! - Traits return boxed futures so handlers hold `Arc<dyn ...>`
//! - Session storage is not here; it goes through tower-sessions' Redis store

pub mod memory;
pub mod redis;

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis::RedisStores;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] fred::error::Error),
    #[error("cached entry could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("unexpected reply from store: {0}")]
    Reply(String),
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
}

/// State of a fixed window after counting one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the current window, including this one.
    pub count: u64,
    /// Time until the window resets.
    pub reset_in: Duration,
}

/// Fixed-window hit counter.
pub trait CounterStore: Send + Sync {
    /// Count one hit for `key`, opening a new window of length `window` if
    /// none is active.
    fn hit<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<WindowHit, StoreError>>;
}

/// A response captured for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// TTL store for captured responses.
pub trait ResponseStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedResponse>, StoreError>>;

    fn put<'a>(
        &'a self,
        key: &'a str,
        response: CachedResponse,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}
