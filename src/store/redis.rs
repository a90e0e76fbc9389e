//! Redis-backed store shared by every worker.

use std::future::Future;
use std::time::Duration;

use fred::prelude::*;
use fred::types::config::PerformanceConfig;
use fred::types::Expiration;
use futures_util::future::BoxFuture;

use crate::config::RedisConfig;
use crate::store::{CachedResponse, CounterStore, ResponseStore, StoreError, WindowHit};

const POOL_SIZE: usize = 4;
const CONNECT_WAIT: Duration = Duration::from_secs(5);
/// Upper bound for any single store call, so an outage fails fast.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

const RATE_LIMIT_PREFIX: &str = "flight:ratelimit:";
const CACHE_PREFIX: &str = "flight:cache:";

// Count a hit and open the window on first use.
//
// KEYS[1]: counter key
// ARGV[1]: window length in milliseconds
//
// Returns: { count, milliseconds until reset }
static HIT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return { count, ttl }
"#;

/// Connect a pool to the configured Redis.
///
/// Waits a bounded time for the first connection. If Redis is not reachable
/// yet the pool keeps reconnecting in the background and startup continues.
pub async fn connect(config: &RedisConfig) -> Result<Pool, StoreError> {
    connect_within(config, CONNECT_WAIT).await
}

async fn connect_within(config: &RedisConfig, wait: Duration) -> Result<Pool, StoreError> {
    let mut redis_config = Config::from_url(&config.url())?;
    // Reconnect policy covers the first connection too.
    redis_config.fail_fast = false;
    let performance = PerformanceConfig {
        default_command_timeout: COMMAND_TIMEOUT,
        ..PerformanceConfig::default()
    };
    let policy = ReconnectPolicy::new_exponential(0, 100, 30_000, 2);
    let pool = Pool::new(redis_config, Some(performance), None, Some(policy), POOL_SIZE)?;

    pool.connect();
    match tokio::time::timeout(wait, pool.wait_for_connect()).await {
        Ok(Ok(())) => tracing::info!(host = %config.host, port = config.port, "Connected to Redis"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Redis connection failed, retrying in background"),
        Err(_) => tracing::warn!(
            host = %config.host,
            port = config.port,
            "Redis not reachable yet, retrying in background"
        ),
    }

    Ok(pool)
}

async fn bounded<T, F>(call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(COMMAND_TIMEOUT, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(COMMAND_TIMEOUT)))
}

/// Decode the `{ count, ttl }` reply of the hit script.
fn decode_hit(reply: &[i64]) -> Result<WindowHit, StoreError> {
    match reply {
        [count, ttl] => Ok(WindowHit {
            count: (*count).max(0) as u64,
            reset_in: Duration::from_millis((*ttl).max(0) as u64),
        }),
        other => Err(StoreError::Reply(format!("{other:?}"))),
    }
}

/// Counter and response store over a fred pool.
#[derive(Clone)]
pub struct RedisStores {
    pool: Pool,
}

impl RedisStores {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl CounterStore for RedisStores {
    fn hit<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<WindowHit, StoreError>> {
        Box::pin(bounded(async move {
            let window_ms = window.as_millis().max(1);
            let reply: Vec<i64> = self
                .pool
                .eval(
                    HIT_SCRIPT,
                    vec![format!("{RATE_LIMIT_PREFIX}{key}")],
                    vec![window_ms.to_string()],
                )
                .await?;
            decode_hit(&reply)
        }))
    }
}

impl ResponseStore for RedisStores {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedResponse>, StoreError>> {
        Box::pin(bounded(async move {
            let raw: Option<String> = self.pool.get(format!("{CACHE_PREFIX}{key}")).await?;
            raw.map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(StoreError::from)
        }))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        response: CachedResponse,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(bounded(async move {
            let secs = ttl.as_secs();
            if secs == 0 {
                return Ok(());
            }
            let json = serde_json::to_string(&response)?;
            let _: () = self
                .pool
                .set(
                    format!("{CACHE_PREFIX}{key}"),
                    json,
                    Some(Expiration::EX(secs as i64)),
                    None,
                    false,
                )
                .await?;
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_decode_hit_reply() {
        let hit = decode_hit(&[3, 1500]).unwrap();
        assert_eq!(hit.count, 3);
        assert_eq!(hit.reset_in, Duration::from_millis(1500));

        let clamped = decode_hit(&[1, -1]).unwrap();
        assert_eq!(clamped.reset_in, Duration::ZERO);

        assert!(matches!(decode_hit(&[1]), Err(StoreError::Reply(_))));
        assert!(matches!(decode_hit(&[1, 2, 3]), Err(StoreError::Reply(_))));
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_fast() {
        let config = RedisConfig {
            host: "127.0.0.1".into(),
            port: closed_port(),
        };
        let pool = connect_within(&config, Duration::from_millis(200)).await.unwrap();
        let stores = RedisStores::new(pool);

        let started = Instant::now();
        let window = Duration::from_secs(60);
        let hit = tokio::time::timeout(Duration::from_secs(3), stores.hit("10.0.0.1", window))
            .await
            .expect("hit must not hang while redis is down");
        assert!(hit.is_err());

        let cached = tokio::time::timeout(Duration::from_secs(3), stores.get("/index.html"))
            .await
            .expect("get must not hang while redis is down");
        assert!(cached.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_bounded_maps_elapsed_to_timeout() {
        let result: Result<(), StoreError> = bounded(std::future::pending()).await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == COMMAND_TIMEOUT));
    }
}

#[cfg(all(test, feature = "redis-test"))]
mod live_tests {
    use super::*;

    async fn stores() -> RedisStores {
        let pool = connect(&RedisConfig::default()).await.unwrap();
        RedisStores::new(pool)
    }

    #[tokio::test]
    async fn test_hit_opens_window() {
        let stores = stores().await;
        let key = format!("test-{}", std::process::id());

        let first = stores.hit(&key, Duration::from_secs(5)).await.unwrap();
        let second = stores.hit(&key, Duration::from_secs(5)).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
        assert!(second.reset_in <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_response_roundtrip() {
        let stores = stores().await;
        let response = CachedResponse {
            status: 200,
            headers: vec![],
            body: b"cached".to_vec(),
        };
        stores.put("/index.html", response.clone(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(stores.get("/index.html").await.unwrap(), Some(response));
    }
}
