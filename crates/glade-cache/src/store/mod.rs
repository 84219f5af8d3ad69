//! Backing store abstraction.
//!
//! Caches talk to the shared store exclusively through [`CacheStore`]: a
//! small set of key-value and sorted-set commands that are queued into a
//! [`Transaction`] and executed as one indivisible unit. Two implementations
//! ship with the crate: [`RedisStore`] for deployments and [`MemoryStore`]
//! for development and tests.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::{create_pool, RedisStore};

use async_trait::async_trait;
use glade_core::{CacheError, CacheResult, Interface};
use std::time::Duration;

/// A single store command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `GET key`
    Get { key: String },
    /// `MGET key [key ...]`
    MGet { keys: Vec<String> },
    /// `SET key value [PX ttl]`
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// `DEL key [key ...]`
    Del { keys: Vec<String> },
    /// `ZADD key [XX] [CH|INCR] score member`
    ///
    /// Without `incr` the reply is the number of members added or changed;
    /// with `incr` it is the new score, or nothing if `existing_only`
    /// prevented the update.
    ZAdd {
        key: String,
        member: String,
        score: f64,
        existing_only: bool,
        incr: bool,
    },
    /// `ZINCRBY key delta member`
    ZIncrBy {
        key: String,
        member: String,
        delta: f64,
    },
    /// `ZREM key member [member ...]`
    ZRem { key: String, members: Vec<String> },
    /// `ZRANGE key start stop`, with Redis index semantics (negative
    /// indexes count from the end).
    ZRange { key: String, start: isize, stop: isize },
    /// `ZCARD key`
    ZCard { key: String },
}

impl Command {
    /// Returns the command name, used for logging and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::MGet { .. } => "MGET",
            Self::Set { .. } => "SET",
            Self::Del { .. } => "DEL",
            Self::ZAdd { .. } => "ZADD",
            Self::ZIncrBy { .. } => "ZINCRBY",
            Self::ZRem { .. } => "ZREM",
            Self::ZRange { .. } => "ZRANGE",
            Self::ZCard { .. } => "ZCARD",
        }
    }
}

/// Reply to a single [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Acknowledgement without a payload (`SET`).
    Ok,
    /// A single optional value (`GET`).
    Value(Option<String>),
    /// One optional value per requested key (`MGET`).
    Values(Vec<Option<String>>),
    /// An integer reply (`DEL`, `ZREM`, `ZCARD`, plain `ZADD`).
    Count(u64),
    /// A score (`ZINCRBY`, `ZADD INCR`).
    Score(Option<f64>),
    /// Sorted set members in rank order (`ZRANGE`).
    Members(Vec<String>),
}

impl Reply {
    /// Unwraps a `GET` reply.
    pub fn into_value(self) -> CacheResult<Option<String>> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(mismatch("value", &other)),
        }
    }

    /// Unwraps an `MGET` reply.
    pub fn into_values(self) -> CacheResult<Vec<Option<String>>> {
        match self {
            Self::Values(values) => Ok(values),
            other => Err(mismatch("values", &other)),
        }
    }

    /// Unwraps an integer reply.
    pub fn into_count(self) -> CacheResult<u64> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(mismatch("count", &other)),
        }
    }

    /// Unwraps a score reply.
    pub fn into_score(self) -> CacheResult<Option<f64>> {
        match self {
            Self::Score(score) => Ok(score),
            other => Err(mismatch("score", &other)),
        }
    }

    /// Unwraps a `ZRANGE` reply.
    pub fn into_members(self) -> CacheResult<Vec<String>> {
        match self {
            Self::Members(members) => Ok(members),
            other => Err(mismatch("members", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Reply) -> CacheError {
    CacheError::unexpected_reply(format!("expected {expected}, got {got:?}"))
}

/// An ordered batch of commands executed atomically.
///
/// Builder methods take `&mut self` so commands can be queued conditionally:
///
/// ```
/// use glade_cache::store::Transaction;
///
/// let mut tx = Transaction::new();
/// tx.get("ns:k1").zadd_xx("ns-i", "ns:k1", -1.0);
/// assert_eq!(tx.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    commands: Vec<Command>,
}

impl Transaction {
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an arbitrary command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Queues `GET key`.
    pub fn get(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Get { key: key.into() })
    }

    /// Queues `MGET keys...`.
    pub fn mget(&mut self, keys: Vec<String>) -> &mut Self {
        self.push(Command::MGet { keys })
    }

    /// Queues `SET key value`, with `PX ttl` when a TTL is given.
    /// A zero TTL means no expiry.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> &mut Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
        })
    }

    /// Queues `DEL keys...`.
    pub fn del(&mut self, keys: Vec<String>) -> &mut Self {
        self.push(Command::Del { keys })
    }

    /// Queues `ZADD key CH score member`.
    pub fn zadd(&mut self, key: impl Into<String>, member: impl Into<String>, score: f64) -> &mut Self {
        self.push(Command::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
            existing_only: false,
            incr: false,
        })
    }

    /// Queues `ZADD key XX CH score member`: updates the score of an
    /// existing member only.
    pub fn zadd_xx(&mut self, key: impl Into<String>, member: impl Into<String>, score: f64) -> &mut Self {
        self.push(Command::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
            existing_only: true,
            incr: false,
        })
    }

    /// Queues `ZADD key XX INCR delta member`: increments the score of an
    /// existing member only.
    pub fn zadd_xx_incr(&mut self, key: impl Into<String>, member: impl Into<String>, delta: f64) -> &mut Self {
        self.push(Command::ZAdd {
            key: key.into(),
            member: member.into(),
            score: delta,
            existing_only: true,
            incr: true,
        })
    }

    /// Queues `ZINCRBY key delta member`.
    pub fn zincrby(&mut self, key: impl Into<String>, member: impl Into<String>, delta: f64) -> &mut Self {
        self.push(Command::ZIncrBy {
            key: key.into(),
            member: member.into(),
            delta,
        })
    }

    /// Queues `ZREM key members...`.
    pub fn zrem(&mut self, key: impl Into<String>, members: Vec<String>) -> &mut Self {
        self.push(Command::ZRem {
            key: key.into(),
            members,
        })
    }

    /// Queues `ZRANGE key start stop`.
    pub fn zrange(&mut self, key: impl Into<String>, start: isize, stop: isize) -> &mut Self {
        self.push(Command::ZRange {
            key: key.into(),
            start,
            stop,
        })
    }

    /// Queues `ZCARD key`.
    pub fn zcard(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::ZCard { key: key.into() })
    }

    /// Returns the queued commands.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Consumes the transaction, returning its commands.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl From<Command> for Transaction {
    fn from(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// Shared key-value and sorted-set store.
///
/// Implementations must execute a transaction's commands as one unit: no
/// other client may observe a state where only part of it has been applied.
/// Commands with an empty key list (`MGET`, `DEL`, `ZREM`) must not be
/// queued.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Interface + Send + Sync {
    /// Executes the transaction and returns one reply per command, in order.
    async fn exec(&self, tx: Transaction) -> CacheResult<Vec<Reply>>;

    /// Returns every key matching a glob-style pattern (`KEYS`).
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Removes every key of the store's logical database.
    async fn flush(&self) -> CacheResult<()>;

    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}

/// Single-command helpers over any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Executes one command and returns its reply.
    async fn exec_one(&self, command: Command) -> CacheResult<Reply> {
        let name = command.name();
        self.exec(Transaction::from(command))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CacheError::unexpected_reply(format!("no reply to {name}")))
    }

    /// `GET key`
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.exec_one(Command::Get { key: key.to_string() })
            .await?
            .into_value()
    }

    /// `SET key value [PX ttl]`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.exec_one(Command::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })
        .await?;
        Ok(())
    }

    /// `DEL keys...`; returns how many keys existed.
    async fn del(&self, keys: Vec<String>) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.exec_one(Command::Del { keys }).await?.into_count()
    }

    /// `MGET keys...`
    async fn mget(&self, keys: Vec<String>) -> CacheResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.exec_one(Command::MGet { keys }).await?.into_values()
    }

    /// `ZREM key members...`; returns how many members were removed.
    async fn zrem(&self, key: &str, members: Vec<String>) -> CacheResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        self.exec_one(Command::ZRem {
            key: key.to_string(),
            members,
        })
        .await?
        .into_count()
    }

    /// `ZRANGE key start stop`
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        self.exec_one(Command::ZRange {
            key: key.to_string(),
            start,
            stop,
        })
        .await?
        .into_members()
    }

    /// `ZCARD key`
    async fn zcard(&self, key: &str) -> CacheResult<u64> {
        self.exec_one(Command::ZCard { key: key.to_string() })
            .await?
            .into_count()
    }
}

impl<T: CacheStore + ?Sized> CacheStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_builder_order() {
        let mut tx = Transaction::new();
        tx.set("k", "1", Some(Duration::from_millis(10)))
            .zincrby("i", "k", -1.0)
            .zrange("i", 2, -1);

        let names: Vec<_> = tx.commands().iter().map(Command::name).collect();
        assert_eq!(names, vec!["SET", "ZINCRBY", "ZRANGE"]);
        assert!(!tx.is_empty());
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        let mut tx = Transaction::new();
        tx.set("k", "1", Some(Duration::ZERO))
            .set("k", "1", Some(Duration::from_millis(5)));

        assert!(matches!(tx.commands()[0], Command::Set { ttl: None, .. }));
        assert!(matches!(tx.commands()[1], Command::Set { ttl: Some(_), .. }));
    }

    #[test]
    fn test_zadd_variants() {
        let mut tx = Transaction::new();
        tx.zadd("i", "m", -5.0).zadd_xx("i", "m", -6.0).zadd_xx_incr("i", "m", -1.0);

        let commands = tx.into_commands();
        assert!(matches!(
            commands[0],
            Command::ZAdd { existing_only: false, incr: false, .. }
        ));
        assert!(matches!(
            commands[1],
            Command::ZAdd { existing_only: true, incr: false, .. }
        ));
        assert!(matches!(
            commands[2],
            Command::ZAdd { existing_only: true, incr: true, .. }
        ));
    }

    #[test]
    fn test_reply_accessors() {
        assert_eq!(Reply::Count(3).into_count().unwrap(), 3);
        assert_eq!(
            Reply::Value(Some("x".to_string())).into_value().unwrap(),
            Some("x".to_string())
        );

        let err = Reply::Ok.into_members().unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_REPLY");
    }

    #[tokio::test]
    async fn test_ext_skips_empty_key_lists() {
        let store = MockCacheStore::new();
        // No expectations: any call to exec would panic.
        assert_eq!(store.del(Vec::new()).await.unwrap(), 0);
        assert!(store.mget(Vec::new()).await.unwrap().is_empty());
        assert_eq!(store.zrem("i", Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exec_one_rejects_empty_reply() {
        let mut store = MockCacheStore::new();
        store.expect_exec().returning(|_| Ok(Vec::new()));

        let err = store.zcard("i").await.unwrap_err();
        assert!(err.to_string().contains("ZCARD"));
    }
}
