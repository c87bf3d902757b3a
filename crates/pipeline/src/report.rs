//! Per-item outcomes and the batch report they add up to.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use imgbatch_storage::{BackendHandle, content_type};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Storage key the batch report is saved under.
pub const OUTPUT_KEY: &str = "OUTPUT";

/// The worker step an item failed in.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[display("resolve")]
    Resolve,
    #[display("transform")]
    Transform,
    #[display("store")]
    Store,
    #[display("dataset")]
    Dataset,
    #[display("cancelled")]
    Cancelled,
}

/// Terminal result for one input index.
///
/// Serialized without a tag: successes carry `key`, `url` and the output
/// dimensions, failures carry `phase` and `error`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ItemOutcome {
    Success {
        index: usize,
        source: String,
        key: String,
        url: String,
        width: u32,
        height: u32,
        format: String,
        size_bytes: usize,
    },
    Failure {
        index: usize,
        source: String,
        phase: Phase,
        /// `"{phase}: {cause}"`.
        error: String,
    },
}
impl ItemOutcome {
    pub fn failure(index: usize, source: impl Into<String>, phase: Phase, cause: impl std::fmt::Display) -> Self {
        Self::Failure { index, source: source.into(), phase, error: format!("{phase}: {cause}") }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Success { index, .. } | Self::Failure { index, .. } => *index,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Success { source, .. } | Self::Failure { source, .. } => source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// In completion order.
    pub results: Vec<ItemOutcome>,
    pub summary: Summary,
}
impl BatchReport {
    /// A copy with `results` in input order.
    pub fn sorted(&self) -> Self {
        let mut results = self.results.clone();
        results.sort_by_key(ItemOutcome::index);
        Self { results, summary: self.summary }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Serialize)
    }

    /// Write the report to `store` under [`OUTPUT_KEY`].
    pub async fn save(&self, store: &BackendHandle) -> Result<()> {
        let json = self.to_json()?;
        store.put(OUTPUT_KEY, &json, content_type::JSON).await.or_raise(|| ErrorKind::Store)?;
        tracing::info!(store = store.name(), key = OUTPUT_KEY, "Results saved to key-value store");
        Ok(())
    }
}

/// Collects outcomes from concurrent workers.
///
/// [`finalize`](Self::finalize) consumes the aggregator, so a report can only
/// be produced once.
pub struct Aggregator {
    total: usize,
    results: Mutex<Vec<ItemOutcome>>,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}
impl Aggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: Mutex::new(Vec::with_capacity(total)),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, outcome: ItemOutcome) {
        let counter = if outcome.is_success() { &self.succeeded } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
        self.results.lock().unwrap_or_else(PoisonError::into_inner).push(outcome);
    }

    pub fn finalize(self) -> BatchReport {
        let summary = Summary {
            total: self.total,
            succeeded: self.succeeded.into_inner(),
            failed: self.failed.into_inner(),
        };
        let results = self.results.into_inner().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total,
            "Processing complete: {} succeeded, {} failed out of {} total",
            summary.succeeded,
            summary.failed,
            summary.total
        );
        BatchReport { results, summary }
    }
}
