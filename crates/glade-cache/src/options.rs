//! LruCache configuration.

use crate::namespace::Namespace;
use chrono::Utc;
use glade_core::Strategy;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static LAST_RECENCY_MICROS: AtomicI64 = AtomicI64::new(0);

/// Epoch milliseconds with microsecond fraction, strictly increasing
/// within the process.
fn recency_millis() -> f64 {
    let now = Utc::now().timestamp_micros();
    let previous = match LAST_RECENCY_MICROS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(last) | Err(last) => last,
    };

    #[allow(clippy::cast_precision_loss)]
    let micros = now.max(previous + 1) as f64;
    micros / 1000.0
}

/// Function producing the raw score of a fully-qualified key.
pub type ScoreFn = Arc<dyn Fn(&str) -> f64 + Send + Sync>;

/// How index scores are produced.
///
/// The index stores the *negated* score so that ascending rank order puts
/// the entries to keep first. With `increment` the negated score is added
/// to the current one on every access instead of replacing it.
#[derive(Clone)]
pub struct Scoring {
    score: ScoreFn,
    increment: bool,
}

impl Scoring {
    /// Score by wall-clock milliseconds; newest access ranks first.
    ///
    /// Scores carry a microsecond fraction and never repeat within the
    /// process, so accesses in the same millisecond still rank in order.
    #[must_use]
    pub fn recency() -> Self {
        Self {
            score: Arc::new(|_| recency_millis()),
            increment: false,
        }
    }

    /// Count accesses; most accessed ranks first.
    #[must_use]
    pub fn frequency() -> Self {
        Self {
            score: Arc::new(|_| 1.0),
            increment: true,
        }
    }

    /// Caller-supplied scoring.
    pub fn custom<F>(score: F, increment: bool) -> Self
    where
        F: Fn(&str) -> f64 + Send + Sync + 'static,
    {
        Self {
            score: Arc::new(score),
            increment,
        }
    }

    /// Scoring for a named strategy.
    #[must_use]
    pub fn from_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Recency => Self::recency(),
            Strategy::Frequency => Self::frequency(),
        }
    }

    /// Raw score for a fully-qualified key.
    #[must_use]
    pub fn score(&self, key: &str) -> f64 {
        (self.score)(key)
    }

    /// Value written to the index for a key: the negated raw score.
    #[must_use]
    pub fn index_score(&self, key: &str) -> f64 {
        -self.score(key)
    }

    /// True for accumulating (frequency-like) scoring.
    #[must_use]
    pub const fn is_increment(&self) -> bool {
        self.increment
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Self::recency()
    }
}

impl fmt::Debug for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoring")
            .field("increment", &self.increment)
            .finish_non_exhaustive()
    }
}

/// Configuration of one LruCache.
#[derive(Debug, Clone)]
pub struct LruOptions {
    /// Maximum number of entries kept in the namespace.
    pub max: usize,
    /// TTL applied to writes that do not pass their own.
    pub max_age: Option<Duration>,
    /// Index scoring.
    pub scoring: Scoring,
    /// Key prefix.
    pub namespace: Namespace,
}

impl LruOptions {
    /// Options with the given capacity, recency scoring and the default
    /// namespace.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            max_age: None,
            scoring: Scoring::default(),
            namespace: Namespace::default(),
        }
    }

    /// Sets the namespace-wide TTL.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the scoring.
    #[must_use]
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<Namespace>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_scores_negated_timestamp() {
        let scoring = Scoring::recency();
        let before = Utc::now().timestamp_millis() as f64;
        let score = scoring.index_score("k");

        assert!(!scoring.is_increment());
        assert!(score <= -before);
    }

    #[test]
    fn test_recency_scores_strictly_increase() {
        let scoring = Scoring::recency();
        let scores: Vec<f64> = (0..1000).map(|_| scoring.score("k")).collect();

        assert!(scores.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn test_frequency_scores_constant() {
        let scoring = Scoring::frequency();
        assert!(scoring.is_increment());
        assert_eq!(scoring.index_score("a"), -1.0);
        assert_eq!(scoring.index_score("b"), -1.0);
    }

    #[test]
    fn test_custom_scoring() {
        let scoring = Scoring::custom(|key| key.len() as f64, true);
        assert_eq!(scoring.score("abc"), 3.0);
        assert!(scoring.is_increment());
    }

    #[test]
    fn test_from_strategy() {
        assert!(Scoring::from_strategy(Strategy::Frequency).is_increment());
        assert!(!Scoring::from_strategy(Strategy::Recency).is_increment());
    }

    #[test]
    fn test_options_builder() {
        let options = LruOptions::new(10)
            .with_max_age(Duration::from_millis(50))
            .with_namespace("ns:");

        assert_eq!(options.max, 10);
        assert_eq!(options.max_age, Some(Duration::from_millis(50)));
        assert_eq!(options.namespace.as_str(), "ns:");
        assert!(format!("{:?}", options.scoring).contains("increment"));
    }
}
