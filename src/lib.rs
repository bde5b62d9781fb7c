//! kvbench - throughput and latency of embedded key-value engines
//!
//! Every engine is wrapped behind [`KvStore`]; the [`ScenarioRunner`] drives
//! one open handle through five time-boxed concurrent scenarios and reports
//! a [`ScenarioResult`] per measured operation stream.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use kvbench::{BenchConfig, MapStore, ScenarioRunner, Scenario};
//!
//! let store = MapStore::new();
//! let config = BenchConfig {
//!     duration: Duration::from_millis(20),
//!     concurrency: 2,
//!     ..Default::default()
//! };
//!
//! let runner = ScenarioRunner::new(&store, &config, "map/nofsync");
//! let results = runner.run(Scenario::Set).unwrap();
//! assert!(results[0].ops > 0);
//! ```

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod output;
pub mod scenarios;
pub mod store;

pub use backend::{Backend, EngineSelection};
pub use config::BenchConfig;
pub use driver::{Driver, DriverReport, StopFlag};
pub use error::{BenchError, BenchResult, EngineError, Result, Worker};
pub use metrics::ScenarioResult;
pub use output::{OutputFormat, Reporter};
pub use scenarios::{Scenario, ScenarioRunner};
pub use store::{
    Durability, Kv, KvStore, MapStore, RedbStore, SledStore, SqliteStore, StoreLocation,
};
