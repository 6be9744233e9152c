//! End-to-end tests for md2pdf-watch.
//!
//! Every test builds a throwaway workspace under a temp dir and drives the
//! public API: the pipeline directly, the controller through
//! [`WatchController::run_events`], and one test through a real polling
//! subscription.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use md2pdf_watch::pipeline::layout::{self as page_layout, DrawOp, Face, PageLayout};
use md2pdf_watch::{
    ComposedDocument, ConversionRequest, ConversionResult, ConversionStatus, Convert,
    Normalizer, Pipeline, RawEvent, RawEventKind, RenderBackend, RenderError, SkipReason,
    TriggerKind, WatchConfig, WatchController, WatchMode, WorkspaceLayout, STYLE_SHEET,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness. Set `RUST_LOG=md2pdf_watch=debug`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn workspace() -> (tempfile::TempDir, WorkspaceLayout) {
    let tmp = tempfile::tempdir().unwrap();
    let layout = WorkspaceLayout::from_root(tmp.path()).unwrap();
    std::fs::create_dir_all(layout.input_dir()).unwrap();
    std::fs::create_dir_all(layout.output_dir()).unwrap();
    (tmp, layout)
}

fn write_source(layout: &WorkspaceLayout, name: &str, text: &str) -> PathBuf {
    let path = layout.input_dir().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

async fn convert(layout: &WorkspaceLayout, config: &WatchConfig, path: &Path) -> ConversionResult {
    Pipeline::new(layout.clone(), config)
        .convert(ConversionRequest::new(path, TriggerKind::Created))
        .await
}

fn normalize(text: &str) -> ComposedDocument {
    Normalizer::default().normalize(text, &STYLE_SHEET)
}

fn pages(text: &str) -> Vec<PageLayout> {
    page_layout::layout(&normalize(text))
}

fn output_names(layout: &WorkspaceLayout) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(layout.output_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Fails the test if the controller ever asks for a conversion.
struct NeverConverts;

impl Convert for NeverConverts {
    async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        panic!("unexpected conversion of {}", request.source_path.display());
    }
}

struct Rejects;

impl RenderBackend for Rejects {
    fn name(&self) -> &str {
        "rejects"
    }
    fn render(&self, _doc: &ComposedDocument) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::new("style directive not supported"))
    }
}

// ── Pipeline scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn heading_and_bold_become_pdf() {
    let (_tmp, layout) = workspace();
    let text = "# Title\n\nHello **world**";
    let src = write_source(&layout, "a.md", text);

    let result = convert(&layout, &WatchConfig::default(), &src).await;
    assert_eq!(result.status, ConversionStatus::Success, "{:?}", result.error);
    let out = layout.output_dir().join("a.pdf");
    assert_eq!(result.output_path.as_deref(), Some(out.as_path()));
    assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));

    let drawn = pages(text);
    let texts: Vec<(&str, Face)> = drawn.iter().flat_map(|p| p.texts()).collect();
    assert!(texts.iter().any(|(t, f)| *t == "world" && f.is_bold()), "{texts:?}");
    assert!(texts.iter().any(|(t, f)| *t == "Title" && f.is_bold()), "{texts:?}");
    assert!(!texts.iter().any(|(t, _)| t.contains("**")));
}

#[tokio::test]
async fn table_renders_as_grid() {
    let (_tmp, layout) = workspace();
    let text = "| a | b |\n|---|---|\n| 1 | 2 |\n";
    let src = write_source(&layout, "t.md", text);

    let result = convert(&layout, &WatchConfig::default(), &src).await;
    assert!(result.is_success(), "{:?}", result.error);
    assert!(layout.output_dir().join("t.pdf").is_file());

    let drawn = pages(text);
    let strokes = drawn[0]
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::StrokeLine { .. }))
        .count();
    assert!(strokes > 0, "table should draw grid lines");
    let texts: Vec<&str> = drawn[0].texts().map(|(t, _)| t).collect();
    assert!(!texts.iter().any(|t| t.contains('|')), "{texts:?}");
    for cell in ["a", "b", "1", "2"] {
        assert!(texts.contains(&cell), "missing cell {cell}: {texts:?}");
    }
}

#[tokio::test]
async fn deleted_before_read_is_skipped() {
    let (_tmp, layout) = workspace();
    let src = write_source(&layout, "gone.md", "# soon gone");
    std::fs::remove_file(&src).unwrap();

    let result = convert(&layout, &WatchConfig::default(), &src).await;
    assert_eq!(result.status, ConversionStatus::Skipped);
    assert_eq!(result.skip_reason, Some(SkipReason::Missing));
    assert!(output_names(&layout).is_empty());
}

#[tokio::test]
async fn uppercase_extension_maps_to_pdf() {
    let (_tmp, layout) = workspace();
    let src = write_source(&layout, "notes.MD", "text");
    let result = convert(&layout, &WatchConfig::default(), &src).await;
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(output_names(&layout), ["notes.pdf"]);
}

#[test]
fn empty_file_is_skipped_without_output() {
    let (_tmp, layout) = workspace();
    let src = write_source(&layout, "empty.md", "");
    let result = tokio_test::block_on(convert(&layout, &WatchConfig::default(), &src));
    assert_eq!(result.skip_reason, Some(SkipReason::Empty));
    assert!(output_names(&layout).is_empty());
}

#[tokio::test]
async fn source_outside_input_fails_with_path_error() {
    let (tmp, layout) = workspace();
    let stray = tmp.path().join("stray.md");
    std::fs::write(&stray, "# stray").unwrap();

    let result = convert(&layout, &WatchConfig::default(), &stray).await;
    assert_eq!(result.status, ConversionStatus::Failed);
    let message = result.error.unwrap();
    assert!(message.contains("not inside the input directory"), "{message}");
    assert!(output_names(&layout).is_empty());
}

#[tokio::test]
async fn renderer_failure_leaves_no_output() {
    let (_tmp, layout) = workspace();
    let src = write_source(&layout, "r.md", "# R");
    let config = WatchConfig::builder()
        .backend(Arc::new(Rejects))
        .build()
        .unwrap();

    let result = convert(&layout, &config, &src).await;
    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.error.unwrap().contains("style directive not supported"));
    assert!(output_names(&layout).is_empty());
}

#[tokio::test]
async fn converting_twice_is_idempotent() {
    let (_tmp, layout) = workspace();
    let text = "# Same\n\n- one\n- two\n\n```\nlet x = 1;\n```\n";
    let src = write_source(&layout, "same.md", text);
    let config = WatchConfig::default();

    let first = convert(&layout, &config, &src).await;
    let second = convert(&layout, &config, &src).await;
    assert!(first.is_success() && second.is_success());
    assert_eq!(first.output_path, second.output_path);
    assert_eq!(normalize(text), normalize(text));
    assert_eq!(pages(text), pages(text));
    assert_eq!(output_names(&layout), ["same.pdf"]);
}

// ── Controller scenarios ─────────────────────────────────────────────────────

#[tokio::test]
async fn non_markdown_events_never_convert() {
    let (_tmp, layout) = workspace();
    let config = WatchConfig::default();
    let controller = WatchController::with_converter(layout.clone(), NeverConverts, &config);

    let (tx, rx) = mpsc::channel(8);
    tx.send(RawEvent::new(RawEventKind::Created, layout.input_dir().join("image.png")))
        .await
        .unwrap();
    tx.send(RawEvent::new(RawEventKind::Modified, layout.input_dir().join("README")))
        .await
        .unwrap();
    tx.send(RawEvent::dir(RawEventKind::Created, layout.input_dir().join("folder.md")))
        .await
        .unwrap();
    drop(tx);

    let summary = controller.run_events(rx, std::future::pending()).await;
    assert_eq!(summary.events_seen, 3);
    assert_eq!(summary.requests, 0);
}

#[tokio::test]
async fn rapid_repeated_events_leave_one_valid_pdf() {
    init_tracing();
    let (_tmp, layout) = workspace();
    let src = write_source(&layout, "busy.md", "# Busy\n\nsaved again and again");
    let controller = WatchController::new(layout.clone(), &WatchConfig::default());

    let (tx, rx) = mpsc::channel(8);
    for kind in [RawEventKind::Created, RawEventKind::Modified, RawEventKind::Modified] {
        tx.send(RawEvent::new(kind, &src)).await.unwrap();
    }
    drop(tx);

    let summary = controller.run_events(rx, std::future::pending()).await;
    assert_eq!(summary.converted, 3);
    assert_eq!(summary.failed, 0);
    // No leftover temp files next to the output.
    assert_eq!(output_names(&layout), ["busy.pdf"]);
    let bytes = std::fs::read(layout.output_dir().join("busy.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn deleted_during_settle_is_skipped_and_watch_continues() {
    init_tracing();
    let (_tmp, layout) = workspace();
    let doomed = write_source(&layout, "a.md", "# Deleted soon");
    let kept = write_source(&layout, "b.md", "# Still here");
    let controller = WatchController::new(layout.clone(), &WatchConfig::default());

    let (tx, rx) = mpsc::channel(8);
    let feeder = tokio::spawn(async move {
        tx.send(RawEvent::new(RawEventKind::Created, &doomed)).await.unwrap();
        // Well inside the 500ms settle delay of the first event.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::fs::remove_file(&doomed).await.unwrap();
        tx.send(RawEvent::new(RawEventKind::Created, &kept)).await.unwrap();
    });

    let summary = controller.run_events(rx, std::future::pending()).await;
    feeder.await.unwrap();
    assert_eq!(summary.skipped, 1, "{summary:?}");
    assert_eq!(summary.converted, 1, "{summary:?}");
    assert_eq!(summary.failed, 0);
    assert_eq!(output_names(&layout), ["b.pdf"]);
}

#[tokio::test]
async fn polling_watch_converts_new_file() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let layout = WorkspaceLayout::from_root(tmp.path()).unwrap();
    let config = WatchConfig::builder()
        .watch_mode(WatchMode::Polling)
        .poll_interval_ms(100)
        .build()
        .unwrap();
    let controller = WatchController::new(layout.clone(), &config);

    let input = layout.input_dir().to_path_buf();
    let expected = layout.output_dir().join("late.pdf");
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        tokio::fs::create_dir_all(&input).await.unwrap();
        tokio::fs::write(input.join("late.md"), "# Late arrival").await.unwrap();
    });

    let done = expected.clone();
    let shutdown = async move {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
        while !done.is_file() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    };

    let summary = controller.run(shutdown).await.unwrap();
    writer.await.unwrap();
    assert!(expected.is_file(), "no PDF after polling: {summary:?}");
    assert!(summary.converted >= 1);
}
