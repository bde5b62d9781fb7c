//! Benchmark configuration, built once and passed by reference.

use std::time::Duration;

use crate::error::{BenchError, BenchResult};
use crate::store::Durability;

#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Wall-clock budget for each scenario.
    pub duration: Duration,
    /// Number of concurrent workers per scenario.
    pub concurrency: usize,
    /// Size of every written value in bytes.
    pub value_size: usize,
    pub durability: Durability,
    /// Records per submission in the batch-write scenario.
    pub batch_size: usize,
    /// Upper bound of the sequential key range for the set scenario;
    /// `None` keeps writing fresh keys until the deadline.
    pub key_space: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            duration: Duration::from_secs(60),
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            value_size: 256,
            durability: Durability::Buffered,
            batch_size: 1000,
            key_space: None,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> BenchResult<()> {
        if self.concurrency == 0 {
            return Err(BenchError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(BenchError::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(BenchError::Configuration(
                "duration must be greater than zero".to_string(),
            ));
        }
        if self.key_space == Some(0) {
            return Err(BenchError::Configuration(
                "key space must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a duration such as `"500ms"`, `"10s"`, `"1m"` or `"2h"`.
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {}", s))?;

    let secs = match unit.trim() {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit: {}", other)),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {}: {}", s, e))
}
