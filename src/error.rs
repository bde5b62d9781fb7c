use std::fmt;

use thiserror::Error;

use crate::scenarios::Scenario;

/// Errors shared by every storage engine adapter.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("key cannot be empty")]
    EmptyKey,

    #[error("unsupported operation: {op}")]
    Unsupported { op: &'static str },

    #[error("{engine}: in-memory mode not available ({reason})")]
    BackendUnavailable { engine: &'static str, reason: String },

    #[error("{engine}: failed to init: {reason}")]
    InitFailed { engine: &'static str, reason: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn init_failed(engine: &'static str, err: impl fmt::Display) -> Self {
        EngineError::InitFailed {
            engine,
            reason: err.to_string(),
        }
    }
}

// redb splits its errors per phase; all of them collapse into `redb::Error`.
macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EngineError {
                fn from(e: $ty) -> Self {
                    EngineError::Redb(e.into())
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Identifies the concurrent actor that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worker {
    Slot(usize),
    Background,
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Worker::Slot(i) => write!(f, "worker {}", i),
            Worker::Background => write!(f, "background writer"),
        }
    }
}

/// Driver-level errors. Every variant is fatal to the run.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{scenario} scenario failed in {worker}: {source}")]
    Worker {
        scenario: Scenario,
        worker: Worker,
        #[source]
        source: EngineError,
    },

    #[error("{scenario} scenario: {worker} panicked")]
    WorkerPanicked { scenario: Scenario, worker: Worker },
}

pub type Result<T> = std::result::Result<T, EngineError>;
pub type BenchResult<T> = std::result::Result<T, BenchError>;
