//! # md2pdf-watch
//!
//! Watch a directory for Markdown files and render each one to a styled PDF.
//!
//! ## Why this crate?
//!
//! Writing notes in Markdown and sharing them as PDFs usually means a manual
//! export step per file. This crate removes it: drop or save `*.md` files in
//! `<workspace>/input/` and a matching `<stem>.pdf` appears in
//! `<workspace>/output/`, rendered with one fixed A4 style sheet. The watcher
//! survives any single bad file and runs until it is told to stop.
//!
//! ## Pipeline Overview
//!
//! ```text
//! filesystem event
//!  │
//!  ├─ 1. Watch      notify subscription → RawEvent → ConversionRequest
//!  ├─ 2. Settle     short pause so editors finish flushing
//!  ├─ 3. Read       missing / empty files are skipped, not failed
//!  ├─ 4. Normalize  pulldown-cmark → ComposedDocument (+ style sheet)
//!  ├─ 5. Render     layout + printpdf (CPU-bound, spawn_blocking, timeout)
//!  └─ 6. Write      temp file + rename into <workspace>/output
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf_watch::{WatchConfig, WatchController, WorkspaceLayout};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layout = WorkspaceLayout::from_root(std::path::absolute("pdf_workspace")?)?;
//!     let config = WatchConfig::default();
//!     let summary = WatchController::new(layout, &config)
//!         .scan_existing(true)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     eprintln!("{} converted, {} failed", summary.converted, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! md2pdf-watch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod style;
pub mod watch;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MarkdownExtension, WatchConfig, WatchConfigBuilder, WatchMode};
pub use convert::{convert_file, convert_file_sync, Convert, Pipeline};
pub use document::ComposedDocument;
pub use error::{ConvertError, Md2PdfError, PathError, ReadError, RenderError};
pub use output::{
    ConversionRequest, ConversionResult, ConversionStatus, SkipReason, TriggerKind, WatchSummary,
};
pub use pipeline::markdown::Normalizer;
pub use pipeline::render::{PdfBackend, RenderBackend};
pub use progress::{NoopObserver, WatchObserver};
pub use stream::{convert_stream, Batch};
pub use style::STYLE_SHEET;
pub use watch::{RawEvent, RawEventKind, WatchController};
pub use workspace::{output_path, WorkspaceLayout};
