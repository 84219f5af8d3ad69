//! Redis-backed store.

use super::{CacheStore, Command, Reply, Transaction};
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use glade_config::RedisConfig;
use glade_core::{CacheError, CacheResult};
use redis::{FromRedisValue, Pipeline, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Create a Redis connection pool and check that the server answers.
pub async fn create_pool(config: &RedisConfig) -> CacheResult<Pool> {
    info!(pool_size = config.pool_size, "Creating Redis connection pool...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| CacheError::invalid_configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .wait_timeout(Some(config.connect_timeout()))
        .create_timeout(Some(config.connect_timeout()))
        .build()
        .map_err(|e| CacheError::invalid_configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let mut conn = pool.get().await.map_err(CacheError::store_unavailable)?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(CacheError::store_unavailable)?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Store backed by a Redis connection pool.
///
/// Multi-command transactions are sent as a `MULTI`/`EXEC` pipeline.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a pool from configuration and wraps it.
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        Ok(Self::new(create_pool(config).await?))
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::store_unavailable(format!("Failed to get Redis connection: {}", e)))?;

        let status = self.pool.status();
        CacheMetrics::update_pool_status(status.max_size, status.available);

        Ok(conn)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn exec(&self, tx: Transaction) -> CacheResult<Vec<Reply>> {
        if tx.is_empty() {
            return Ok(Vec::new());
        }

        let commands = tx.into_commands();
        let operation = operation_label(&commands);
        let pipe = build_pipeline(&commands);

        let started = Instant::now();
        let mut conn = self.conn().await?;
        let values: Vec<Value> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(CacheError::store_unavailable)?;
        CacheMetrics::store_operation(self.backend(), operation, started.elapsed());

        if values.len() != commands.len() {
            return Err(CacheError::unexpected_reply(format!(
                "{} replies for {} commands",
                values.len(),
                commands.len()
            )));
        }

        debug!(operation, commands = commands.len(), "Executed Redis transaction");

        commands
            .iter()
            .zip(values)
            .map(|(command, value)| parse_reply(command, &value))
            .collect()
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let started = Instant::now();
        let mut conn = self.conn().await?;

        // KEYS blocks the server; only used by the process-wide helpers
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::store_unavailable(format!("Failed to scan keys: {}", e)))?;

        CacheMetrics::store_operation(self.backend(), "KEYS", started.elapsed());
        Ok(keys)
    }

    async fn flush(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut *conn)
            .await
            .map_err(CacheError::store_unavailable)?;

        info!("Flushed Redis database");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

fn operation_label(commands: &[Command]) -> &'static str {
    match commands {
        [single] => single.name(),
        _ => "MULTI",
    }
}

fn build_pipeline(commands: &[Command]) -> Pipeline {
    let mut pipe = redis::pipe();
    if commands.len() > 1 {
        pipe.atomic();
    }

    for command in commands {
        match command {
            Command::Get { key } => {
                pipe.cmd("GET").arg(key);
            }
            Command::MGet { keys } => {
                pipe.cmd("MGET").arg(keys);
            }
            Command::Set { key, value, ttl } => {
                pipe.cmd("SET").arg(key).arg(value);
                if let Some(ttl) = ttl {
                    pipe.arg("PX").arg(ttl_millis(*ttl));
                }
            }
            Command::Del { keys } => {
                pipe.cmd("DEL").arg(keys);
            }
            Command::ZAdd {
                key,
                member,
                score,
                existing_only,
                incr,
            } => {
                pipe.cmd("ZADD").arg(key);
                if *existing_only {
                    pipe.arg("XX");
                }
                pipe.arg(if *incr { "INCR" } else { "CH" });
                pipe.arg(*score).arg(member);
            }
            Command::ZIncrBy { key, member, delta } => {
                pipe.cmd("ZINCRBY").arg(key).arg(*delta).arg(member);
            }
            Command::ZRem { key, members } => {
                pipe.cmd("ZREM").arg(key).arg(members);
            }
            Command::ZRange { key, start, stop } => {
                pipe.cmd("ZRANGE").arg(key).arg(*start).arg(*stop);
            }
            Command::ZCard { key } => {
                pipe.cmd("ZCARD").arg(key);
            }
        }
    }

    pipe
}

/// `PX` takes whole milliseconds and rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn parse_reply(command: &Command, value: &Value) -> CacheResult<Reply> {
    if let Value::ServerError(err) = value {
        return Err(CacheError::unexpected_reply(format!(
            "{} failed: {:?}",
            command.name(),
            err
        )));
    }

    let reply = match command {
        Command::Get { .. } => Reply::Value(convert(command, value)?),
        Command::MGet { .. } => Reply::Values(convert(command, value)?),
        Command::Set { .. } => Reply::Ok,
        Command::ZAdd { incr: true, .. } | Command::ZIncrBy { .. } => Reply::Score(convert(command, value)?),
        Command::Del { .. } | Command::ZRem { .. } | Command::ZCard { .. } | Command::ZAdd { .. } => {
            Reply::Count(convert(command, value)?)
        }
        Command::ZRange { .. } => Reply::Members(convert(command, value)?),
    };

    Ok(reply)
}

fn convert<T: FromRedisValue>(command: &Command, value: &Value) -> CacheResult<T> {
    redis::from_redis_value(value)
        .map_err(|e| CacheError::unexpected_reply(format!("{}: {}", command.name(), e)))
}
