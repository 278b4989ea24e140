use crate::Engine;
use crate::model::{BatchResult, ItemResult};
use shears_fs::DeleteOutcome;
use std::path::{Path, PathBuf};
use tracing::instrument;

impl Engine {
    /// Delete every path, files and directory trees alike, retrying once
    /// after loosening permissions when access is refused.
    ///
    /// Every path is attempted. Returns `true` only if all were removed; an
    /// empty list trivially succeeds.
    #[instrument(skip(self, paths), fields(items = paths.len()))]
    pub async fn delete_many<P: AsRef<Path>>(&self, paths: &[P]) -> bool {
        shears_fs::delete_many(paths).await
    }

    /// Like [`delete_many`](Self::delete_many), with one result per path
    /// explaining any failure. Removed entries have an empty output path.
    #[instrument(skip(self, paths), fields(items = paths.len()))]
    pub async fn delete_report<P: AsRef<Path>>(&self, paths: &[P]) -> BatchResult {
        if paths.is_empty() {
            return BatchResult::default();
        }
        let results = shears_fs::delete_each(paths)
            .await
            .into_iter()
            .map(|outcome| match outcome {
                DeleteOutcome::Removed(path) => ItemResult::succeeded(path, PathBuf::new()),
                DeleteOutcome::Failed { path, message, .. } => ItemResult::failed(path, message),
            })
            .collect();
        BatchResult::from_results(results)
    }
}
