//! Datasets stored in SQLite.

use crate::error::{ErrorKind, Result};
use crate::{DEFAULT_DATASET, Database, Dataset};
use async_trait::async_trait;
use exn::ResultExt;
use serde_json::Value;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A named dataset inside a [`Database`].
///
/// Several datasets can share one database file; each only sees its own
/// records.
#[derive(Debug, Clone)]
pub struct SqliteDataset {
    pool: SqlitePool,
    name: String,
    dry_run: bool,
}
impl From<&Database> for SqliteDataset {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone(), DEFAULT_DATASET, false)
    }
}
impl SqliteDataset {
    /// With `dry_run`, appends are accepted and logged but not written.
    pub fn new(pool: SqlitePool, name: impl Into<String>, dry_run: bool) -> Self {
        Self { pool, name: name.into(), dry_run }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Dataset for SqliteDataset {
    async fn append(&self, record: &Value) -> Result<()> {
        if self.dry_run {
            tracing::info!(dataset = %self.name, "Skipping dataset append during read-only mode");
            return Ok(());
        }
        let data = serde_json::to_string(record).or_raise(|| ErrorKind::InvalidData)?;
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339).or_raise(|| ErrorKind::InvalidData)?;
        sqlx::query(include_str!("../queries/append.sql"))
            .bind(&self.name)
            .bind(data)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn len(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count.sql"))
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData)
    }

    async fn records(&self) -> Result<Vec<Value>> {
        let rows: Vec<(String,)> = sqlx::query_as(include_str!("../queries/select.sql"))
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).or_raise(|| ErrorKind::InvalidData))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_and_count() {
        let db = Database::connect_in_memory().await.unwrap();
        let dataset = SqliteDataset::from(&db);
        assert!(dataset.is_empty().await.unwrap());
        dataset.append(&json!({"index": 0, "key": "image_0_1", "sizeBytes": 123})).await.unwrap();
        dataset.append(&json!({"index": 1, "error": "resolve: key not found"})).await.unwrap();
        assert_eq!(dataset.len().await.unwrap(), 2);
        let records = dataset.records().await.unwrap();
        assert_eq!(records[0]["key"], "image_0_1");
        assert_eq!(records[1]["index"], 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_datasets_are_isolated() {
        let db = Database::connect_in_memory().await.unwrap();
        let first = SqliteDataset::new(db.pool().clone(), "first", false);
        let second = SqliteDataset::new(db.pool().clone(), "second", false);
        first.append(&json!({"n": 1})).await.unwrap();
        first.append(&json!({"n": 2})).await.unwrap();
        second.append(&json!({"n": 3})).await.unwrap();
        assert_eq!(first.len().await.unwrap(), 2);
        assert_eq!(second.records().await.unwrap(), vec![json!({"n": 3})]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let db = Database::connect_in_memory().await.unwrap();
        let dataset = SqliteDataset::new(db.pool().clone(), DEFAULT_DATASET, true);
        dataset.append(&json!({"index": 0})).await.unwrap();
        assert_eq!(dataset.len().await.unwrap(), 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_records_survive_reconnect() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("default.sqlite");
        let db = Database::connect(&path).await.unwrap();
        SqliteDataset::from(&db).append(&json!({"index": 7})).await.unwrap();
        db.close().await;

        let db = Database::connect(&path).await.unwrap();
        assert_eq!(SqliteDataset::from(&db).records().await.unwrap(), vec![json!({"index": 7})]);
        db.close().await;
    }
}
