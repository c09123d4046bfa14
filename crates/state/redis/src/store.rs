use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use tickwork_state::{StateError, StateStore};

use crate::config::RedisConfig;

/// Redis-backed implementation of [`StateStore`].
///
/// Uses a `deadpool-redis` connection pool. All values are plain Redis
/// strings; the auxiliary task queue lives in Redis sorted sets.
pub struct RedisStateStore {
    pool: Pool,
    prefix: String,
}

impl RedisStateStore {
    /// Create a new `RedisStateStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StateError::Connection(e.to_string()))?
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    /// Build the full Redis key for a logical key.
    fn render(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    /// Strip the instance prefix from a raw Redis key.
    fn strip<'a>(&self, raw: &'a str) -> &'a str {
        raw.strip_prefix(&format!("{}:", self.prefix)).unwrap_or(raw)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let mut conn = self.conn().await?;
        let val: Option<String> = conn
            .get(self.render(key))
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(val)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut conn = self.conn().await?;
        let () = conn
            .set(self.render(key), value)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StateError> {
        let pattern = format!("{}*", self.render(prefix));
        let mut conn = self.conn().await?;
        let mut results = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;

            results.extend(keys.iter().map(|k| self.strip(k).to_owned()));

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(results)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StateError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let rendered: Vec<String> = keys.iter().map(|k| self.render(k)).collect();
        let mut conn = self.conn().await?;
        let removed: u64 = conn
            .del(rendered)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(removed)
    }

    async fn zadd(&self, set: &str, member: &str, score: f64) -> Result<(), StateError> {
        let mut conn = self.conn().await?;
        let _: i64 = conn
            .zadd(self.render(set), member, score)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn zrange(
        &self,
        set: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StateError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .zrange(self.render(set), start, stop)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(members)
    }

    async fn zrem_by_score(&self, set: &str, min: f64, max: f64) -> Result<u64, StateError> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn
            .zrembyscore(self.render(set), min, max)
            .await
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(removed)
    }
}
