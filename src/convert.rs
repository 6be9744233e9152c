//! The conversion pipeline: one [`ConversionRequest`] in, one
//! [`ConversionResult`] out.
//!
//! ## Why results instead of errors?
//!
//! The watch loop must survive any single bad file indefinitely. Every
//! failure below this boundary ([`ReadError`](crate::error::ReadError),
//! [`PathError`](crate::error::PathError),
//! [`RenderError`](crate::error::RenderError)) is folded into a failed
//! result carrying a human-readable message, so callers never need to
//! handle an `Err` per file.
//!
//! ## Why render before touching the output?
//!
//! The PDF is fully rendered in memory before the output file is opened, and
//! then written via temp file plus rename. A render failure or timeout
//! therefore leaves any previous PDF intact, and two rapid events for the
//! same file can only ever leave one complete PDF behind.

use crate::config::WatchConfig;
use crate::error::{ConvertError, Md2PdfError};
use crate::output::{ConversionRequest, ConversionResult, SkipReason, TriggerKind};
use crate::pipeline::input::{self, Source};
use crate::pipeline::markdown::Normalizer;
use crate::pipeline::render::{self, RenderBackend};
use crate::pipeline::write;
use crate::style::STYLE_SHEET;
use crate::workspace::WorkspaceLayout;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything that can carry out a conversion request.
///
/// [`Pipeline`] is the real implementation; the watch controller is generic
/// over this trait so it can be driven without touching the filesystem.
pub trait Convert: Send + Sync {
    fn convert(&self, request: ConversionRequest) -> impl Future<Output = ConversionResult> + Send;
}

/// Reads, normalizes, renders and writes one document at a time.
#[derive(Clone)]
pub struct Pipeline {
    layout: WorkspaceLayout,
    normalizer: Normalizer,
    backend: Arc<dyn RenderBackend>,
    render_timeout: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("layout", &self.layout)
            .field("normalizer", &self.normalizer)
            .field("backend", &self.backend.name())
            .field("render_timeout", &self.render_timeout)
            .finish()
    }
}

/// How a conversion that did not fail ended.
enum Outcome {
    Skipped(SkipReason),
    Written { output: PathBuf, bytes: u64 },
}

impl Pipeline {
    pub fn new(layout: WorkspaceLayout, config: &WatchConfig) -> Self {
        Self {
            layout,
            normalizer: Normalizer::new(config.extensions.clone()),
            backend: Arc::clone(&config.backend),
            render_timeout: config.render_timeout(),
        }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Run every step, stopping at the first skip or error.
    ///
    /// On error the resolved output path, if any, is returned alongside so
    /// the failed result can still name it.
    async fn run(
        &self,
        request: &ConversionRequest,
    ) -> Result<Outcome, (Option<PathBuf>, ConvertError)> {
        let source = &request.source_path;

        // ── Step 1-3: Read, classifying vanished and empty files ─────────
        let text = match input::read_source(source).await {
            Ok(Source::Text(text)) => text,
            Ok(Source::Skip(reason)) => return Ok(Outcome::Skipped(reason)),
            Err(e) => return Err((None, e.into())),
        };

        // ── Step 4: Resolve output path ──────────────────────────────────
        let output = match self.layout.resolve_output_path(source).await {
            Ok(path) => path,
            Err(e) => return Err((None, e.into())),
        };

        // ── Step 5: Normalize ────────────────────────────────────────────
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let doc = self
            .normalizer
            .normalize(&text, &STYLE_SHEET)
            .with_fallback_title(stem);
        debug!("{}: {} block(s)", request.display_name(), doc.blocks.len());

        // ── Step 6: Render ───────────────────────────────────────────────
        let bytes = match render::render(Arc::clone(&self.backend), doc, self.render_timeout).await {
            Ok(bytes) => bytes,
            Err(e) => return Err((Some(output), e.into())),
        };

        // ── Step 7: Write atomically ─────────────────────────────────────
        let written = match write::write_atomic(&output, bytes).await {
            Ok(n) => n,
            Err(e) => return Err((Some(output), e.into())),
        };

        Ok(Outcome::Written {
            output,
            bytes: written,
        })
    }
}

impl Convert for Pipeline {
    async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        let start = Instant::now();
        let name = request.display_name();
        info!("Converting {} ({:?})", name, request.trigger);

        match self.run(&request).await {
            Ok(Outcome::Written { output, bytes }) => {
                let elapsed = start.elapsed();
                info!(
                    "Converted {} -> {} ({} bytes, {}ms)",
                    name,
                    output.display(),
                    bytes,
                    elapsed.as_millis()
                );
                ConversionResult::success(&request, output, bytes, elapsed)
            }
            Ok(Outcome::Skipped(reason)) => {
                info!("Skipped {}: {}", name, reason);
                ConversionResult::skipped(&request, reason, start.elapsed())
            }
            Err((output, e)) => {
                warn!("Failed to convert {}: {}", name, e);
                ConversionResult::failed(&request, output, e.to_string(), start.elapsed())
            }
        }
    }
}

/// Convert a single file in `layout` with `config`.
pub async fn convert_file(
    source: impl AsRef<Path>,
    layout: &WorkspaceLayout,
    config: &WatchConfig,
) -> ConversionResult {
    let request = ConversionRequest::new(source.as_ref(), TriggerKind::Existing);
    Pipeline::new(layout.clone(), config).convert(request).await
}

/// Synchronous wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_file_sync(
    source: impl AsRef<Path>,
    layout: &WorkspaceLayout,
    config: &WatchConfig,
) -> Result<ConversionResult, Md2PdfError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(convert_file(source, layout, config)))
}
