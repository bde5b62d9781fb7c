//! Engine selection for CLI and configuration

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{BenchError, EngineError, Result};
use crate::store::{Durability, KvStore, MapStore, RedbStore, SledStore, SqliteStore, StoreLocation};

/// Suffix that requests an engine's in-memory mode.
pub const MEMORY_SUFFIX: &str = "/memory";

/// Storage engines that can be benchmarked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `HashMap` behind a lock, always in memory
    Map,
    /// SQLite via rusqlite
    Sqlite,
    /// sled log-structured tree
    Sled,
    /// redb copy-on-write B-tree
    Redb,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Map, Backend::Sqlite, Backend::Sled, Backend::Redb];

    /// Parse from string (for CLI/env var)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "map" => Some(Backend::Map),
            "sqlite" | "rusqlite" => Some(Backend::Sqlite),
            "sled" => Some(Backend::Sled),
            "redb" => Some(Backend::Redb),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Map => "map",
            Backend::Sqlite => "sqlite",
            Backend::Sled => "sled",
            Backend::Redb => "redb",
        }
    }

    /// Whether the engine can run without a filesystem path
    pub fn supports_memory(&self) -> bool {
        !matches!(self, Backend::Redb)
    }

    /// Whether the engine implements prefix scans
    pub fn supports_scan(&self) -> bool {
        !matches!(self, Backend::Map)
    }

    /// Default on-disk name inside the data directory
    pub fn file_name(&self) -> String {
        format!("{}.db", self.name())
    }

    pub fn open(&self, location: &StoreLocation, durability: Durability) -> Result<Box<dyn KvStore>> {
        let store: Box<dyn KvStore> = match self {
            Backend::Map => Box::new(MapStore::open(location, durability)?),
            Backend::Sqlite => Box::new(SqliteStore::open(location, durability)?),
            Backend::Sled => Box::new(SledStore::open(location, durability)?),
            Backend::Redb => Box::new(RedbStore::open(location, durability)?),
        };
        Ok(store)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed engine token: `<engine>[/memory]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSelection {
    pub backend: Backend,
    pub memory: bool,
}

impl EngineSelection {
    pub fn new(backend: Backend, memory: bool) -> Self {
        Self { backend, memory }
    }

    /// Report label, e.g. `sled/memory/fsync`.
    pub fn label(&self, durability: Durability) -> String {
        let memory = if self.memory { MEMORY_SUFFIX } else { "" };
        format!("{}{}/{}", self.backend, memory, durability.as_str())
    }

    /// Where the engine keeps its data when `dir` is the data directory.
    pub fn location(&self, dir: &Path) -> StoreLocation {
        if self.memory {
            StoreLocation::Memory
        } else {
            StoreLocation::Path(dir.join(self.backend.file_name()))
        }
    }

    /// Open the selected engine. Asking for memory mode on an engine that
    /// lacks it fails here, before any scenario runs.
    pub fn open(&self, dir: &Path, durability: Durability) -> Result<Box<dyn KvStore>> {
        if self.memory && !self.backend.supports_memory() {
            return Err(EngineError::BackendUnavailable {
                engine: self.backend.name(),
                reason: "engine has no in-memory mode".to_string(),
            });
        }

        let location = self.location(dir);
        tracing::info!(engine = %self.backend, ?location, durability = durability.as_str(), "opening engine");
        self.backend.open(&location, durability)
    }
}

impl FromStr for EngineSelection {
    type Err = BenchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let token = s.trim();
        let (name, memory) = match token.strip_suffix(MEMORY_SUFFIX) {
            Some(name) => (name, true),
            None => (token, false),
        };

        let backend = Backend::from_name(name)
            .ok_or_else(|| BenchError::Configuration(format!("unknown store type: {}", s)))?;

        Ok(Self { backend, memory })
    }
}
