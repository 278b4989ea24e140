//! Concurrent fan-out over a batch of tasks.

use crate::error::Result;
use crate::model::{BatchResult, FileTask, ItemResult, OperationKind};
use futures::{StreamExt, stream};
use std::future::Future;
use std::path::PathBuf;
use tracing::Instrument;

/// Apply `apply` to every task, at most `concurrency` at a time, and collect
/// one [`ItemResult`] per task in submission order.
///
/// An error from one task fails that item only; it never cancels the others.
/// An empty batch succeeds without calling `apply`.
pub(crate) async fn run<F, Fut>(kind: OperationKind, tasks: Vec<FileTask>, concurrency: usize, apply: F) -> BatchResult
where
    F: Fn(FileTask) -> Fut,
    Fut: Future<Output = Result<PathBuf>>,
{
    if tasks.is_empty() {
        return BatchResult::default();
    }
    let total = tasks.len();
    let span = tracing::info_span!("batch", operation = %kind, items = total);
    async move {
        let results: Vec<ItemResult> = stream::iter(tasks)
            .map(|task| {
                let input = task.input_path.clone();
                let pending = apply(task);
                async move {
                    match pending.await {
                        Ok(output) => {
                            tracing::debug!(input = %input.display(), output = %output.display(), "Item complete");
                            ItemResult::succeeded(input, output)
                        },
                        Err(err) => {
                            let message = (*err).to_string();
                            tracing::warn!(input = %input.display(), error = %message, "Item failed");
                            ItemResult::failed(input, message)
                        },
                    }
                }
            })
            // `buffered` (not `buffer_unordered`) keeps results in submission order.
            .buffered(concurrency.max(1))
            .collect()
            .await;
        let batch = BatchResult::from_results(results);
        tracing::info!(succeeded = batch.succeeded(), total, "Batch complete");
        batch
    }
    .instrument(span)
    .await
}
