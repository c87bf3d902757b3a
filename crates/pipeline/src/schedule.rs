use crate::report::{Aggregator, BatchReport, ItemOutcome};
use crate::source::SourceDescriptor;
use crate::worker::process;
use crate::Context;
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::pin::pin;

/// Hard ceiling on items in flight, whatever the caller asks for.
pub const MAX_CONCURRENCY: usize = 20;

/// Clamp a requested concurrency to `1..=MAX_CONCURRENCY`.
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

/// Progress events emitted by [`schedule`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, with the number of items.
/// 2. [`Admitted`](Self::Admitted) once per index, in input order, and
///    [`Completed`](Self::Completed) once per index, in completion order. An
///    index is always admitted before it completes.
/// 3. [`Finished`](Self::Finished) exactly once.
#[derive(Debug)]
pub enum BatchEvent {
    Started(usize),
    Admitted(usize),
    Completed(ItemOutcome),
    Finished,
}

/// Streams [`BatchEvent`]s while every descriptor is processed.
///
/// At most `concurrency` (clamped, see [`clamp_concurrency`]) items are in
/// flight. Each time one settles, the next pending descriptor is admitted.
/// Items never fail the stream; see [`process`].
pub fn schedule<'a>(
    sources: &'a [SourceDescriptor],
    concurrency: usize,
    ctx: &'a Context,
) -> impl Stream<Item = BatchEvent> + 'a {
    let total = sources.len();
    let concurrency = clamp_concurrency(concurrency);
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        tracing::info!(total, concurrency, "Starting image processing for {} images", total);
        yield BatchEvent::Started(total);

        let mut pending = sources.iter().enumerate();
        let mut processing = FuturesUnordered::new();
        for (index, descriptor) in pending.by_ref().take(concurrency) {
            yield BatchEvent::Admitted(index);
            processing.push(process(index, total, descriptor, ctx));
        }
        while let Some(outcome) = processing.next().await {
            yield BatchEvent::Completed(outcome);
            // Refill in input order.
            if let Some((index, descriptor)) = pending.next() {
                yield BatchEvent::Admitted(index);
                processing.push(process(index, total, descriptor, ctx));
            }
        }

        yield BatchEvent::Finished;
    })
}

/// Drive [`schedule`] to completion and aggregate the outcomes.
pub async fn run(sources: &[SourceDescriptor], concurrency: usize, ctx: &Context) -> BatchReport {
    let aggregator = Aggregator::new(sources.len());
    let mut events = pin!(schedule(sources, concurrency, ctx));
    while let Some(event) = events.next().await {
        if let BatchEvent::Completed(outcome) = event {
            aggregator.record(outcome);
        }
    }
    aggregator.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(5, 5)]
    #[case(20, 20)]
    #[case(21, 20)]
    #[case(usize::MAX, 20)]
    fn test_clamp_concurrency(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(clamp_concurrency(requested), expected);
    }
}
