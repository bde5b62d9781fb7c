//! Benchmark scenarios
//!
//! Five access patterns run strictly one after another against the same
//! engine handle: batch-write, set, get, mixed get/set and delete. Each is
//! time-boxed independently by the [`Driver`]. The get scenario reads what
//! set left behind, so the order matters.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::BenchConfig;
use crate::driver::{Driver, StopFlag};
use crate::error::{BenchResult, Result};
use crate::keys::{filler_value, seq_key, KeyCursor, RandomBatch};
use crate::metrics::ScenarioResult;
use crate::store::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    BatchWrite,
    Set,
    Get,
    MixedGetSet,
    Delete,
}

impl Scenario {
    /// Execution order.
    pub const ALL: [Scenario; 5] = [
        Scenario::BatchWrite,
        Scenario::Set,
        Scenario::Get,
        Scenario::MixedGetSet,
        Scenario::Delete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::BatchWrite => "batch-write",
            Scenario::Set => "set",
            Scenario::Get => "get",
            Scenario::MixedGetSet => "mixed-get-set",
            Scenario::Delete => "delete",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs scenarios against one open engine handle.
pub struct ScenarioRunner<'a> {
    store: &'a dyn KvStore,
    config: &'a BenchConfig,
    label: String,
    driver: Driver,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(store: &'a dyn KvStore, config: &'a BenchConfig, label: impl Into<String>) -> Self {
        Self {
            store,
            config,
            label: label.into(),
            driver: Driver::from_config(config),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run every scenario in order, handing each result to `report` as
    /// soon as its scenario completes. Stops at the first failure.
    pub fn run_all<R>(&self, mut report: R) -> BenchResult<Vec<ScenarioResult>>
    where
        R: FnMut(&ScenarioResult),
    {
        let mut all = Vec::new();
        for scenario in Scenario::ALL {
            let results = self.run(scenario)?;
            for result in &results {
                report(result);
            }
            all.extend(results);
        }
        Ok(all)
    }

    /// Run a single scenario. The mixed scenario yields two results, the
    /// writer's first.
    pub fn run(&self, scenario: Scenario) -> BenchResult<Vec<ScenarioResult>> {
        tracing::info!(label = %self.label, %scenario, "running scenario");
        match scenario {
            Scenario::BatchWrite => self.batch_write().map(|r| vec![r]),
            Scenario::Set => self.set().map(|r| vec![r]),
            Scenario::Get => self.get().map(|r| vec![r]),
            Scenario::MixedGetSet => self.mixed_get_set(),
            Scenario::Delete => self.delete().map(|r| vec![r]),
        }
    }

    fn batch_write(&self) -> BenchResult<ScenarioResult> {
        let batch_size = self.config.batch_size;
        let value_size = self.config.value_size;

        let report = self.driver.run(Scenario::BatchWrite, |_, stop| {
            let mut rng = rand::thread_rng();
            let mut batch = RandomBatch::new(batch_size, value_size);
            let mut inserted = 0u64;
            while !stop.is_set() {
                let records = batch.refill(&mut rng);
                self.store.set_bulk(records)?;
                inserted += records.len() as u64;
            }
            Ok(inserted)
        })?;

        Ok(self.result(
            Scenario::BatchWrite,
            "batch-write",
            report.total(),
            report.workers(),
            report.elapsed,
        ))
    }

    fn set(&self) -> BenchResult<ScenarioResult> {
        let value = filler_value(self.config.value_size);
        let workers = self.driver.concurrency();

        let report = self.driver.run(Scenario::Set, |slot, stop| {
            let mut cursor = KeyCursor::new(slot, workers, self.config.key_space);
            if !cursor.has_keys() {
                return Ok(0);
            }
            let mut n = 0u64;
            while !stop.is_set() {
                self.store.set(&cursor.next_key(), &value)?;
                n += 1;
            }
            Ok(n)
        })?;

        Ok(self.result(Scenario::Set, "set", report.total(), workers, report.elapsed))
    }

    fn get(&self) -> BenchResult<ScenarioResult> {
        let workers = self.driver.concurrency();
        let report = self
            .driver
            .run(Scenario::Get, |slot, stop| self.read_loop(slot, workers, stop))?;

        Ok(self.result(Scenario::Get, "get", report.total(), workers, report.elapsed))
    }

    fn mixed_get_set(&self) -> BenchResult<Vec<ScenarioResult>> {
        let value = filler_value(self.config.value_size);
        let workers = self.driver.concurrency();

        let (report, writes) = self.driver.run_with_background(
            Scenario::MixedGetSet,
            |slot, stop| self.read_loop(slot, workers, stop),
            |stop| {
                let mut i = 0u64;
                while !stop.is_set() {
                    self.store.set(&seq_key(i), &value)?;
                    i += 1;
                }
                Ok(i)
            },
        )?;

        Ok(vec![
            self.result(Scenario::MixedGetSet, "setmixed", writes, 1, report.elapsed),
            self.result(
                Scenario::MixedGetSet,
                "getmixed",
                report.total(),
                workers,
                report.elapsed,
            ),
        ])
    }

    fn delete(&self) -> BenchResult<ScenarioResult> {
        let workers = self.driver.concurrency();

        let report = self.driver.run(Scenario::Delete, |slot, stop| {
            let mut cursor = KeyCursor::new(slot, workers, None);
            let mut n = 0u64;
            while !stop.is_set() {
                self.store.del(&cursor.next_key())?;
                n += 1;
            }
            Ok(n)
        })?;

        Ok(self.result(Scenario::Delete, "del", report.total(), workers, report.elapsed))
    }

    /// Read sequential keys at this worker's stride. An empty value means
    /// the cursor ran past the written range, so it starts over.
    fn read_loop(&self, slot: usize, workers: usize, stop: &StopFlag) -> Result<u64> {
        let mut cursor = KeyCursor::new(slot, workers, None);
        let mut n = 0u64;
        while !stop.is_set() {
            let value = self.store.get(&seq_key(cursor.current()))?;
            if value.is_empty() {
                cursor.reset();
            } else {
                cursor.advance();
            }
            n += 1;
        }
        Ok(n)
    }

    fn result(
        &self,
        scenario: Scenario,
        operation: &'static str,
        ops: u64,
        workers: usize,
        elapsed: Duration,
    ) -> ScenarioResult {
        ScenarioResult {
            scenario,
            operation,
            label: self.label.clone(),
            ops,
            workers,
            elapsed,
        }
    }
}
