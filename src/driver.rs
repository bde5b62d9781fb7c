//! Concurrent scenario driver
//!
//! Fans a worker function out over `concurrency` OS threads, lets them run
//! until a shared deadline, then joins them all and hands back per-worker
//! counts. Workers poll a [`StopFlag`] once per iteration; the deadline
//! timer is the only thing that ever sets it. A failing worker wakes the
//! timer early so the scenario unwinds without waiting out the full window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult, Result, Worker};
use crate::scenarios::Scenario;

/// Cooperative stop signal polled by workers between iterations.
#[derive(Debug, Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Shared scenario deadline.
struct Deadline {
    stop: StopFlag,
    aborted: Mutex<bool>,
    cvar: Condvar,
}

impl Deadline {
    fn new() -> Self {
        Self {
            stop: StopFlag::new(),
            aborted: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// Cut the timer short after a failure.
    fn abort(&self) {
        *self.aborted.lock() = true;
        self.cvar.notify_all();
    }

    /// Block until `duration` has passed or a worker failed, then raise the
    /// stop flag. A duration past the clock's range only ends on failure.
    fn wait(&self, duration: Duration) {
        let until = Instant::now().checked_add(duration);
        let mut aborted = self.aborted.lock();
        while !*aborted {
            match until {
                Some(until) => {
                    if self.cvar.wait_until(&mut aborted, until).timed_out() {
                        break;
                    }
                }
                None => self.cvar.wait(&mut aborted),
            }
        }
        drop(aborted);
        self.stop.set();
    }
}

/// Wakes the deadline if the owning worker unwinds.
struct AbortOnPanic<'a>(&'a Deadline);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Raw outcome of one driven scenario.
#[derive(Debug, Clone)]
pub struct DriverReport {
    /// Operations completed by each worker slot, indexed by slot.
    pub per_worker: Vec<u64>,
    /// Wall clock from before the first worker started until the last one
    /// was joined.
    pub elapsed: Duration,
}

impl DriverReport {
    pub fn total(&self) -> u64 {
        self.per_worker.iter().sum()
    }

    pub fn workers(&self) -> usize {
        self.per_worker.len()
    }
}

/// Runs worker functions concurrently against a shared deadline.
#[derive(Debug, Clone)]
pub struct Driver {
    concurrency: usize,
    duration: Duration,
}

impl Driver {
    pub fn new(concurrency: usize, duration: Duration) -> Self {
        Driver {
            concurrency: concurrency.max(1),
            duration,
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(config.concurrency, config.duration)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `work(slot, stop)` on every worker slot until the deadline. Each
    /// call loops until `stop` is set and returns its completed count.
    pub fn run<F>(&self, scenario: Scenario, work: F) -> BenchResult<DriverReport>
    where
        F: Fn(usize, &StopFlag) -> Result<u64> + Sync,
    {
        let (report, _) =
            self.execute(scenario, &work, None::<fn(&StopFlag) -> Result<u64>>)?;
        Ok(report)
    }

    /// Like [`Driver::run`], with an extra uncoordinated `background` actor
    /// started before the workers and stopped only after every worker has
    /// been joined. Returns the background actor's completed count too.
    pub fn run_with_background<F, B>(
        &self,
        scenario: Scenario,
        work: F,
        background: B,
    ) -> BenchResult<(DriverReport, u64)>
    where
        F: Fn(usize, &StopFlag) -> Result<u64> + Sync,
        B: FnOnce(&StopFlag) -> Result<u64> + Send,
    {
        let (report, background_ops) = self.execute(scenario, &work, Some(background))?;
        Ok((report, background_ops.unwrap_or(0)))
    }

    fn execute<F, B>(
        &self,
        scenario: Scenario,
        work: &F,
        background: Option<B>,
    ) -> BenchResult<(DriverReport, Option<u64>)>
    where
        F: Fn(usize, &StopFlag) -> Result<u64> + Sync,
        B: FnOnce(&StopFlag) -> Result<u64> + Send,
    {
        let deadline = Deadline::new();
        let background_stop = StopFlag::new();

        thread::scope(|s| {
            let deadline = &deadline;
            let background_stop = &background_stop;

            let writer = background.map(|bg| {
                s.spawn(move || {
                    let _guard = AbortOnPanic(deadline);
                    let result = bg(background_stop);
                    if result.is_err() {
                        deadline.abort();
                    }
                    result
                })
            });

            let start = Instant::now();

            let handles: Vec<_> = (0..self.concurrency)
                .map(|slot| {
                    s.spawn(move || {
                        let _guard = AbortOnPanic(deadline);
                        let result = work(slot, &deadline.stop);
                        if result.is_err() {
                            deadline.abort();
                        }
                        result
                    })
                })
                .collect();

            deadline.wait(self.duration);

            let mut failure = None;
            let mut per_worker = Vec::with_capacity(self.concurrency);
            for (slot, handle) in handles.into_iter().enumerate() {
                let worker = Worker::Slot(slot);
                match handle.join() {
                    Ok(Ok(count)) => per_worker.push(count),
                    Ok(Err(source)) => {
                        tracing::error!(%scenario, %worker, error = %source, "worker failed");
                        failure.get_or_insert(BenchError::Worker {
                            scenario,
                            worker,
                            source,
                        });
                    }
                    Err(_) => {
                        failure.get_or_insert(BenchError::WorkerPanicked { scenario, worker });
                    }
                }
            }

            let elapsed = start.elapsed();
            background_stop.set();

            let background_ops = match writer.map(|h| h.join()) {
                None => None,
                Some(Ok(Ok(count))) => Some(count),
                Some(Ok(Err(source))) => {
                    tracing::error!(%scenario, error = %source, "background writer failed");
                    failure.get_or_insert(BenchError::Worker {
                        scenario,
                        worker: Worker::Background,
                        source,
                    });
                    None
                }
                Some(Err(_)) => {
                    failure.get_or_insert(BenchError::WorkerPanicked {
                        scenario,
                        worker: Worker::Background,
                    });
                    None
                }
            };

            if let Some(err) = failure {
                return Err(err);
            }

            tracing::debug!(%scenario, ?per_worker, ?background_ops, ?elapsed, "workers joined");

            Ok((
                DriverReport {
                    per_worker,
                    elapsed,
                },
                background_ops,
            ))
        })
    }
}
