use crate::Dataset;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

/// In-memory dataset.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    records: Mutex<Vec<Value>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Dataset for MemoryDataset {
    async fn append(&self, record: &Value) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.records.lock().await.len() as u64)
    }

    async fn records(&self) -> Result<Vec<Value>> {
        Ok(self.records.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dataset = MemoryDataset::new();
        assert!(dataset.is_empty().await.unwrap());
        dataset.append(&json!({"index": 1})).await.unwrap();
        dataset.append(&json!({"index": 0, "error": "boom"})).await.unwrap();
        assert_eq!(dataset.len().await.unwrap(), 2);
        assert_eq!(dataset.records().await.unwrap(), vec![json!({"index": 1}), json!({"index": 0, "error": "boom"})]);
    }
}
