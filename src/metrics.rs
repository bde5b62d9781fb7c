//! Reduction of raw counts into throughput and mean latency.
//!
//! Mean latency divides the shared wall-clock window by `ops * workers`.
//! Results from earlier runs are only comparable if this convention is kept.

use std::fmt;
use std::time::Duration;

use crate::scenarios::Scenario;

/// Printed in place of a derived number that cannot be computed.
pub const SENTINEL: i64 = -1;

/// Outcome of one measured operation stream within a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Report name, e.g. `"set"` or `"getmixed"`.
    pub operation: &'static str,
    /// Engine configuration label, e.g. `"sled/memory/nofsync"`.
    pub label: String,
    pub ops: u64,
    /// Number of actors that shared the measured window.
    pub workers: usize,
    pub elapsed: Duration,
}

impl ScenarioResult {
    /// Operations per second, `None` when nothing completed.
    pub fn throughput(&self) -> Option<u64> {
        throughput(self.ops, self.elapsed)
    }

    /// Mean nanoseconds per operation, `None` when nothing completed.
    pub fn mean_latency_ns(&self) -> Option<u64> {
        mean_latency_ns(self.ops, self.workers, self.elapsed)
    }

    /// Whole seconds elapsed.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} rate: {} op/s, mean: {} ns, ops: {}, took: {} s",
            self.label,
            self.operation,
            or_sentinel(self.throughput()),
            or_sentinel(self.mean_latency_ns()),
            self.ops,
            self.elapsed_secs(),
        )
    }
}

/// `ops * 10^6 / elapsed_us`.
pub fn throughput(ops: u64, elapsed: Duration) -> Option<u64> {
    let micros = elapsed.as_micros();
    if ops == 0 || micros == 0 {
        return None;
    }
    u64::try_from(ops as u128 * 1_000_000 / micros).ok()
}

/// `elapsed_ns / (ops * workers)`.
pub fn mean_latency_ns(ops: u64, workers: usize, elapsed: Duration) -> Option<u64> {
    let denominator = ops as u128 * workers as u128;
    if denominator == 0 {
        return None;
    }
    u64::try_from(elapsed.as_nanos() / denominator).ok()
}

pub fn or_sentinel(value: Option<u64>) -> i64 {
    value.map_or(SENTINEL, |v| i64::try_from(v).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ops: u64, workers: usize, elapsed: Duration) -> ScenarioResult {
        ScenarioResult {
            scenario: Scenario::Set,
            operation: "set",
            label: "map/nofsync".to_string(),
            ops,
            workers,
            elapsed,
        }
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(1_000, Duration::from_secs(2)), Some(500));
        assert_eq!(throughput(3, Duration::from_millis(1)), Some(3_000));
    }

    #[test]
    fn test_mean_latency_multiplies_workers() {
        // 1s window, 1000 ops, 4 workers -> 10^9 / 4000
        assert_eq!(
            mean_latency_ns(1_000, 4, Duration::from_secs(1)),
            Some(250_000)
        );
        assert_eq!(
            mean_latency_ns(1_000, 1, Duration::from_secs(1)),
            Some(1_000_000)
        );
    }

    #[test]
    fn test_zero_ops_is_sentinel() {
        let r = result(0, 4, Duration::from_secs(1));
        assert_eq!(r.throughput(), None);
        assert_eq!(r.mean_latency_ns(), None);
        assert_eq!(
            r.to_string(),
            "map/nofsync set rate: -1 op/s, mean: -1 ns, ops: 0, took: 1 s"
        );
    }

    #[test]
    fn test_zero_elapsed_throughput_is_sentinel() {
        assert_eq!(throughput(10, Duration::ZERO), None);
        assert_eq!(mean_latency_ns(10, 1, Duration::ZERO), Some(0));
    }

    #[test]
    fn test_display() {
        let r = result(2_000, 2, Duration::from_secs(2));
        assert_eq!(
            r.to_string(),
            "map/nofsync set rate: 1000 op/s, mean: 500000 ns, ops: 2000, took: 2 s"
        );
    }
}
