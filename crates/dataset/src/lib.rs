//! Append-only datasets of structured batch results.
//!
//! A [`Dataset`] receives one JSON record per processed item, in the order
//! items finish. Records are never updated or removed. [`SqliteDataset`]
//! persists them in a SQLite database (one row per record, many named
//! datasets per file); [`MemoryDataset`] keeps them in memory for tests and
//! throwaway runs.

mod db;
pub mod error;
mod memory;
mod sqlite;

pub use crate::db::Database;
pub use crate::memory::MemoryDataset;
pub use crate::sqlite::SqliteDataset;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Name of the dataset used when none is given.
pub const DEFAULT_DATASET: &str = "default";

/// Sink for structured per-item records.
///
/// Implementations are shared by every worker of a batch and must accept
/// concurrent appends.
#[async_trait]
pub trait Dataset: Send + Sync {
    /// Append one record.
    async fn append(&self, record: &Value) -> Result<()>;

    /// Number of records appended so far.
    async fn len(&self) -> Result<u64>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// All records, in the order they were appended.
    async fn records(&self) -> Result<Vec<Value>>;
}

pub type DatasetHandle = Arc<dyn Dataset + Send + Sync>;
