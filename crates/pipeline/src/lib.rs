//! The batch pipeline: resolve, transform, store and report.
//!
//! Every input descriptor goes through the same [`worker::process`] steps and
//! ends up as exactly one [`ItemOutcome`]. Items run concurrently under the
//! [`schedule`] ceiling, and one item failing never stops the others.
//!
//! ```text
//! descriptors ─▶ schedule ─▶ process ─┬─ resolve   (Resolver: fetch or store read)
//!                                     ├─ transform (blocking pool)
//!                                     ├─ store     (output backend, public URL)
//!                                     └─ dataset   (optional record sink)
//!                      ▼
//!                 Aggregator ─▶ BatchReport
//! ```

pub mod error;
mod key;
mod report;
pub mod resolve;
mod schedule;
mod source;
pub mod worker;

pub use crate::key::KeyGenerator;
pub use crate::report::{Aggregator, BatchReport, ItemOutcome, OUTPUT_KEY, Phase, Summary};
pub use crate::resolve::Resolver;
pub use crate::schedule::{BatchEvent, MAX_CONCURRENCY, clamp_concurrency, run, schedule};
pub use crate::source::{ImageSource, SourceDescriptor};
use imgbatch_dataset::DatasetHandle;
use imgbatch_storage::BackendHandle;
use imgbatch_transform::TransformSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Key template used when none is configured.
pub const DEFAULT_KEY_TEMPLATE: &str = "image_{{ index }}_{{ timestamp }}";

/// Everything a worker needs, shared read-only by all items of a batch.
pub struct Context {
    pub spec: Arc<TransformSpec>,
    pub resolver: Resolver,
    /// Where processed images are written.
    pub output: BackendHandle,
    pub dataset: Option<DatasetHandle>,
    pub keys: KeyGenerator,
    /// Checked before each phase; a phase already running is never interrupted.
    pub cancel: CancellationToken,
    /// Limit for the transform and store phases. Fetches have their own timeout.
    pub phase_timeout: Option<Duration>,
}
impl Context {
    pub fn new(spec: TransformSpec, resolver: Resolver, output: BackendHandle, keys: KeyGenerator) -> Self {
        Self {
            spec: Arc::new(spec),
            resolver,
            output,
            dataset: None,
            keys,
            cancel: CancellationToken::new(),
            phase_timeout: None,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<Option<DatasetHandle>>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_phase_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.phase_timeout = timeout.into();
        self
    }
}
