//! Processing of a single item.

use crate::report::{ItemOutcome, Phase};
use crate::source::SourceDescriptor;
use crate::Context;
use std::fmt::Display;
use std::future::Future;
use tracing::instrument;

/// Where and why an item stopped.
struct Failed {
    phase: Phase,
    cause: String,
}
impl Failed {
    fn new(phase: Phase, cause: impl Display) -> Self {
        Self { phase, cause: cause.to_string() }
    }
}

impl Context {
    fn checkpoint(&self, next: Phase) -> Result<(), Failed> {
        match self.cancel.is_cancelled() {
            true => Err(Failed::new(Phase::Cancelled, format_args!("batch cancelled before {next}"))),
            false => Ok(()),
        }
    }

    async fn bounded<F: Future>(&self, phase: Phase, future: F) -> Result<F::Output, Failed> {
        match self.phase_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Failed::new(phase, format_args!("timed out after {}ms", limit.as_millis()))),
            None => Ok(future.await),
        }
    }
}

/// Run one item through resolve, transform, store and (optionally) dataset.
///
/// Never fails: every error, including cancellation, is captured as an
/// [`ItemOutcome::Failure`] tagged with the phase it happened in. Failure
/// records are appended to the dataset too, unless the batch was cancelled.
#[instrument(skip_all, fields(index = index, source = %descriptor.raw))]
pub async fn process(index: usize, total: usize, descriptor: &SourceDescriptor, ctx: &Context) -> ItemOutcome {
    tracing::info!("Processing image {}/{}: {}", index + 1, total, descriptor.raw);
    let failed = match attempt(index, descriptor, ctx).await {
        Ok(outcome) => return outcome,
        Err(failed) => failed,
    };
    let outcome = ItemOutcome::failure(index, descriptor.raw.clone(), failed.phase, &failed.cause);
    if failed.phase == Phase::Cancelled {
        tracing::warn!(phase = %failed.phase, "Skipped image {}: {}", index + 1, descriptor.raw);
        return outcome;
    }
    tracing::error!(phase = %failed.phase, error = %failed.cause, "Failed to process image {}: {}", index + 1, descriptor.raw);
    if let Some(dataset) = &ctx.dataset {
        let appended = match serde_json::to_value(&outcome) {
            Ok(record) => dataset.append(&record).await.map_err(|e| (*e).to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(error) = appended {
            tracing::warn!(%error, "Could not append failure record to dataset");
        }
    }
    outcome
}

async fn attempt(index: usize, descriptor: &SourceDescriptor, ctx: &Context) -> Result<ItemOutcome, Failed> {
    ctx.checkpoint(Phase::Resolve)?;
    let source = descriptor.parsed.as_ref().map_err(|kind| Failed::new(Phase::Resolve, kind))?;
    let data = ctx.resolver.resolve(source).await.map_err(|e| Failed::new(Phase::Resolve, &*e))?;

    ctx.checkpoint(Phase::Transform)?;
    let spec = ctx.spec.clone();
    let transformed = ctx
        .bounded(Phase::Transform, tokio::task::spawn_blocking(move || imgbatch_transform::transform(&data, &spec)))
        .await?
        .map_err(|e| Failed::new(Phase::Transform, format_args!("worker stopped: {e}")))?
        .map_err(|e| Failed::new(Phase::Transform, &*e))?;
    let metadata = transformed.metadata;

    ctx.checkpoint(Phase::Store)?;
    let key = ctx.keys.generate(index).map_err(|e| Failed::new(Phase::Store, &*e))?;
    let content_type = imgbatch_transform::content_type(&metadata.format);
    ctx.bounded(Phase::Store, ctx.output.put(&key, &transformed.data, content_type))
        .await?
        .map_err(|e| Failed::new(Phase::Store, &*e))?;
    let url = ctx.output.public_url(&key).map_err(|e| Failed::new(Phase::Store, &*e))?;
    tracing::debug!(%key, content_type, bytes = metadata.size_bytes, "Stored image");

    let outcome = ItemOutcome::Success {
        index,
        source: descriptor.raw.clone(),
        key,
        url: url.clone(),
        width: metadata.width,
        height: metadata.height,
        format: metadata.format,
        size_bytes: metadata.size_bytes,
    };

    if let Some(dataset) = &ctx.dataset {
        ctx.checkpoint(Phase::Dataset)?;
        let record = serde_json::to_value(&outcome).map_err(|e| Failed::new(Phase::Dataset, e))?;
        dataset.append(&record).await.map_err(|e| Failed::new(Phase::Dataset, &*e))?;
    }

    tracing::info!("Successfully processed image {}: {}", index + 1, url);
    Ok(outcome)
}
