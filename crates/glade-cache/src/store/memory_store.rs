//! In-process store with the same command semantics as Redis.
//!
//! Expiry is lazy, sorted sets order members by score and then by member,
//! and `keys` understands Redis glob patterns. Every transaction runs under
//! a single lock, which makes it atomic with respect to other callers.

use super::{CacheStore, Command, Reply, Transaction};
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use glade_core::CacheResult;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug)]
struct StoredValue {
    data: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, StoredValue>,
    indexes: HashMap<String, HashMap<String, f64>>,
}

impl State {
    fn get(&mut self, key: &str, now: Instant) -> Option<String> {
        if self.values.get(key).is_some_and(|v| v.is_expired(now)) {
            self.values.remove(key);
        }
        self.values.get(key).map(|v| v.data.clone())
    }

    fn prune_expired(&mut self, now: Instant) {
        self.values.retain(|_, v| !v.is_expired(now));
    }

    /// Sorted set members in rank order.
    fn ranked(&self, key: &str) -> Vec<(&String, f64)> {
        let mut members: Vec<_> = self
            .indexes
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m, *s)).collect())
            .unwrap_or_default();

        members.sort_by(|(m1, s1), (m2, s2)| {
            s1.partial_cmp(s2).unwrap_or(Ordering::Equal).then_with(|| m1.cmp(m2))
        });
        members
    }

    fn zrem(&mut self, key: &str, members: &[String]) -> u64 {
        let Some(set) = self.indexes.get_mut(key) else {
            return 0;
        };

        let removed = members.iter().filter(|m| set.remove(*m).is_some()).count();
        if set.is_empty() {
            self.indexes.remove(key);
        }
        removed as u64
    }

    fn apply(&mut self, command: Command, now: Instant) -> Reply {
        match command {
            Command::Get { key } => Reply::Value(self.get(&key, now)),
            Command::MGet { keys } => Reply::Values(keys.iter().map(|k| self.get(k, now)).collect()),
            Command::Set { key, value, ttl } => {
                self.prune_expired(now);
                self.values.insert(
                    key,
                    StoredValue {
                        data: value,
                        expires_at: ttl.map(|ttl| now + ttl),
                    },
                );
                Reply::Ok
            }
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|k| {
                        self.values
                            .remove(k.as_str())
                            .is_some_and(|v| !v.is_expired(now))
                            || self.indexes.remove(k.as_str()).is_some()
                    })
                    .count();
                Reply::Count(removed as u64)
            }
            Command::ZAdd {
                key,
                member,
                score,
                existing_only,
                incr,
            } => {
                let exists = self.indexes.get(&key).is_some_and(|set| set.contains_key(&member));
                if existing_only && !exists {
                    return if incr { Reply::Score(None) } else { Reply::Count(0) };
                }

                let set = self.indexes.entry(key).or_default();
                let previous = set.get(&member).copied();
                let updated = if incr {
                    previous.unwrap_or(0.0) + score
                } else {
                    score
                };
                set.insert(member, updated);

                if incr {
                    Reply::Score(Some(updated))
                } else {
                    let changed = previous.map_or(true, |p| (p - updated).abs() > f64::EPSILON);
                    Reply::Count(u64::from(changed))
                }
            }
            Command::ZIncrBy { key, member, delta } => {
                let score = self.indexes.entry(key).or_default().entry(member).or_insert(0.0);
                *score += delta;
                Reply::Score(Some(*score))
            }
            Command::ZRem { key, members } => Reply::Count(self.zrem(&key, &members)),
            Command::ZRange { key, start, stop } => {
                let ranked = self.ranked(&key);
                let members: Vec<String> = range_bounds(ranked.len(), start, stop)
                    .map(|(from, to)| ranked[from..=to].iter().map(|(m, _)| (*m).clone()).collect())
                    .unwrap_or_default();
                Reply::Members(members)
            }
            Command::ZCard { key } => {
                Reply::Count(self.indexes.get(&key).map_or(0, |set| set.len() as u64))
            }
        }
    }
}

/// Resolves Redis `start`/`stop` indexes into an inclusive slice range.
fn range_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let normalize = |i: isize| if i < 0 { len + i } else { i };

    let start = normalize(start).max(0);
    let stop = normalize(stop).min(len - 1);

    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a-z]` and `\` escapes.
fn glob_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    let Some((&first, rest)) = pattern.split_first() else {
        return text.is_empty();
    };

    match first {
        '*' => (0..=text.len()).any(|skip| glob_match_from(rest, &text[skip..])),
        '?' => !text.is_empty() && glob_match_from(rest, &text[1..]),
        '[' => {
            let Some((&c, remaining)) = text.split_first() else {
                return false;
            };
            match match_class(rest, c) {
                Some((true, after)) => glob_match_from(after, remaining),
                Some((false, _)) => false,
                // Unterminated class: treat '[' literally
                None => c == '[' && glob_match_from(rest, remaining),
            }
        }
        '\\' if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match_from(&rest[1..], &text[1..])
        }
        literal => text.first() == Some(&literal) && glob_match_from(rest, &text[1..]),
    }
}

/// Matches `c` against a character class whose opening `[` was consumed.
/// Returns whether it matched and the pattern after the closing `]`.
fn match_class(pattern: &[char], c: char) -> Option<(bool, &[char])> {
    let (negated, mut i) = match pattern.first() {
        Some('^') => (true, 1),
        _ => (false, 0),
    };

    let mut matched = false;
    while i < pattern.len() {
        match pattern[i] {
            ']' => return Some((matched != negated, &pattern[i + 1..])),
            '\\' if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' => {
                let hi = pattern[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}

/// In-memory [`CacheStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live values, ignoring indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .values
            .values()
            .filter(|v| !v.is_expired(now))
            .count()
    }

    /// Returns true if no live value is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exec(&self, tx: Transaction) -> CacheResult<Vec<Reply>> {
        let started = Instant::now();
        let commands = tx.into_commands();
        let operation = match commands.as_slice() {
            [single] => single.name(),
            _ => "MULTI",
        };

        let replies = {
            let mut state = self.state.lock();
            let now = Instant::now();
            commands.into_iter().map(|c| state.apply(c, now)).collect()
        };

        CacheMetrics::store_operation(self.backend(), operation, started.elapsed());
        Ok(replies)
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut state = self.state.lock();
        state.prune_expired(Instant::now());

        let mut keys: Vec<String> = state
            .values
            .keys()
            .chain(state.indexes.keys())
            .filter(|k| glob_matches(pattern, k))
            .cloned()
            .collect();

        keys.sort();
        Ok(keys)
    }

    async fn flush(&self) -> CacheResult<()> {
        let mut state = self.state.lock();
        state.values.clear();
        state.indexes.clear();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
