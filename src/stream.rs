//! Streaming batch conversion: emit results as each document completes.
//!
//! ## Why stream?
//!
//! A workspace can hold hundreds of documents. Yielding each
//! [`ConversionResult`] as soon as it is ready lets callers drive a progress
//! bar or print NDJSON incrementally instead of waiting for the whole batch.
//!
//! Documents are converted one after another, in file-name order, so a batch
//! never overlaps itself on the output directory.

use crate::config::WatchConfig;
use crate::convert::{Convert, Pipeline};
use crate::error::Md2PdfError;
use crate::output::{ConversionRequest, ConversionResult, TriggerKind};
use crate::workspace::WorkspaceLayout;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of conversion results.
pub type ResultStream = Pin<Box<dyn Stream<Item = ConversionResult> + Send>>;

/// A batch of pending conversions: its size plus the stream that runs them.
pub struct Batch {
    pub total: usize,
    pub results: ResultStream,
}

/// Convert every Markdown file already in the input directory.
///
/// Creates the workspace directories first. Nothing is converted until the
/// returned stream is polled.
///
/// # Errors
/// Only fatal workspace errors; per-file failures arrive as failed results.
pub async fn convert_stream(
    layout: &WorkspaceLayout,
    config: &WatchConfig,
) -> Result<Batch, Md2PdfError> {
    layout.ensure_dirs().await?;
    let sources = layout.existing_sources().await?;
    info!(
        "Converting {} existing document(s) in {}",
        sources.len(),
        layout.input_dir().display()
    );
    let pipeline = Pipeline::new(layout.clone(), config);
    Ok(Batch {
        total: sources.len(),
        results: convert_paths(pipeline, sources),
    })
}

/// Convert `sources` sequentially with `pipeline`.
pub fn convert_paths(pipeline: Pipeline, sources: Vec<PathBuf>) -> ResultStream {
    let s = stream::iter(sources).then(move |source| {
        let pipeline = pipeline.clone();
        async move {
            pipeline
                .convert(ConversionRequest::new(source, TriggerKind::Existing))
                .await
        }
    });
    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ConversionStatus, SkipReason};

    #[tokio::test]
    async fn streams_one_result_per_document() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = WorkspaceLayout::from_root(tmp.path()).unwrap();
        layout.ensure_dirs().await.unwrap();
        std::fs::write(layout.input_dir().join("a.md"), "# A").unwrap();
        std::fs::write(layout.input_dir().join("b.md"), "").unwrap();
        std::fs::write(layout.input_dir().join("c.txt"), "ignored").unwrap();

        let batch = convert_stream(&layout, &WatchConfig::default()).await.unwrap();
        assert_eq!(batch.total, 2);
        let results: Vec<ConversionResult> = batch.results.collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ConversionStatus::Success);
        assert_eq!(results[1].skip_reason, Some(SkipReason::Empty));
        assert!(layout.output_dir().join("a.pdf").is_file());
        assert!(!layout.output_dir().join("b.pdf").exists());
    }

    #[tokio::test]
    async fn creates_missing_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = WorkspaceLayout::from_root(tmp.path().join("fresh")).unwrap();
        let batch = convert_stream(&layout, &WatchConfig::default()).await.unwrap();
        assert_eq!(batch.total, 0);
        assert!(layout.input_dir().is_dir());
        assert!(layout.output_dir().is_dir());
    }
}
