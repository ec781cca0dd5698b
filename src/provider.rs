//! Domain data providers
//!
//! A provider returns the enriched record for an order: a JSON object whose
//! keys and nesting follow the data dictionary.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

#[async_trait]
pub trait RecordProvider: Send + Sync {
    /// Enriched record for one order
    async fn enriched_record(&self, order_id: i64) -> Result<Value>;
}

/// Reads `<dir>/<order_id>.json`
#[derive(Clone, Debug)]
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, order_id: i64) -> PathBuf {
        self.dir.join(format!("{order_id}.json"))
    }
}

#[async_trait]
impl RecordProvider for JsonFileProvider {
    async fn enriched_record(&self, order_id: i64) -> Result<Value> {
        let path = self.record_path(order_id);
        debug!(order_id, path = %path.display(), "reading enriched record");

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !record.is_object() {
            return Err(anyhow!("{} does not hold a JSON object", path.display()));
        }
        Ok(record)
    }
}

/// Fixed set of records, for tests and previews
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
    records: HashMap<i64, Value>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, order_id: i64, record: Value) -> Self {
        self.records.insert(order_id, record);
        self
    }
}

#[async_trait]
impl RecordProvider for InMemoryProvider {
    async fn enriched_record(&self, order_id: i64) -> Result<Value> {
        self.records
            .get(&order_id)
            .cloned()
            .ok_or_else(|| anyhow!("No record for order {order_id}"))
    }
}
