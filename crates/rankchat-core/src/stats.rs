//! Usage statistics.
//!
//! Each completed exchange records its own delta; cumulative totals are
//! derived by summing, so partial writes can never corrupt a running total.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, STATS_KEY};

/// Counters for API usage across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    /// Completed prompt/response exchanges.
    pub exchanges: u64,
    /// Exchanges that used search grounding.
    pub grounded: u64,
    /// Exchanges that carried a reasoning block.
    pub with_reasoning: u64,
    /// Prompt tokens reported by the API.
    pub prompt_tokens: u64,
    /// Response tokens reported by the API.
    pub response_tokens: u64,
}

impl UsageStats {
    /// Delta for a single exchange.
    pub fn exchange(
        grounded: bool,
        with_reasoning: bool,
        prompt_tokens: u64,
        response_tokens: u64,
    ) -> Self {
        Self {
            exchanges: 1,
            grounded: u64::from(grounded),
            with_reasoning: u64::from(with_reasoning),
            prompt_tokens,
            response_tokens,
        }
    }

    /// Returns true if all counters are zero.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Total tokens across both directions.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.response_tokens
    }

    /// Adds another stats delta to this one.
    pub fn add(&mut self, other: &UsageStats) {
        self.exchanges += other.exchanges;
        self.grounded += other.grounded;
        self.with_reasoning += other.with_reasoning;
        self.prompt_tokens += other.prompt_tokens;
        self.response_tokens += other.response_tokens;
    }
}

impl std::ops::Add for UsageStats {
    type Output = UsageStats;

    fn add(mut self, other: UsageStats) -> UsageStats {
        UsageStats::add(&mut self, &other);
        self
    }
}

impl std::ops::AddAssign for UsageStats {
    fn add_assign(&mut self, other: UsageStats) {
        self.add(&other);
    }
}

/// Loads accumulated stats from the store.
pub fn load_stats<S: KeyValueStore>(store: &S) -> UsageStats {
    store.get_json(STATS_KEY).unwrap_or_default()
}

/// Adds a delta to the accumulated stats and persists the new total.
pub fn record_exchange<S: KeyValueStore>(store: &mut S, delta: UsageStats) -> Result<UsageStats> {
    let mut total = load_stats(store);
    total += delta;
    store.set_json(STATS_KEY, &total)?;
    Ok(total)
}

/// Resets accumulated stats to zero.
pub fn reset_stats<S: KeyValueStore>(store: &mut S) -> Result<()> {
    store.set_json(STATS_KEY, &UsageStats::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_stats_accumulate() {
        let mut store = MemoryStore::new();

        record_exchange(&mut store, UsageStats::exchange(true, false, 120, 340)).unwrap();
        let total = record_exchange(&mut store, UsageStats::exchange(false, true, 80, 200))
            .unwrap();

        assert_eq!(total.exchanges, 2);
        assert_eq!(total.grounded, 1);
        assert_eq!(total.with_reasoning, 1);
        assert_eq!(total.prompt_tokens, 200);
        assert_eq!(total.response_tokens, 540);
        assert_eq!(total.total_tokens(), 740);
    }

    #[test]
    fn test_stats_operators() {
        let a = UsageStats::exchange(true, true, 10, 20);
        let b = UsageStats::exchange(false, false, 5, 5);

        let sum = a + b;
        assert_eq!(sum.exchanges, 2);
        assert_eq!(sum.grounded, 1);
        assert_eq!(sum.prompt_tokens, 15);

        let mut c = a;
        c += b;
        assert_eq!(c, sum);
    }

    #[test]
    fn test_reset_stats() {
        let mut store = MemoryStore::new();
        record_exchange(&mut store, UsageStats::exchange(true, true, 1, 1)).unwrap();

        reset_stats(&mut store).unwrap();
        assert!(load_stats(&store).is_empty());
    }

    #[test]
    fn test_load_stats_empty_store() {
        let store = MemoryStore::new();
        assert!(load_stats(&store).is_empty());
    }
}
