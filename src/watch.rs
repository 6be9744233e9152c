//! The watch controller: filesystem events in, conversions out.
//!
//! ```text
//! notify thread ──RawEvent──▶ mpsc ──▶ request_for ──▶ settle ──▶ Convert
//!  (inotify / poll)           (bounded)   (filter)      (sleep)    (pipeline)
//! ```
//!
//! ## Why a channel?
//!
//! `notify` invokes its handler on its own thread. The handler does nothing
//! but translate the event and `blocking_send` it, so all decisions happen
//! on the async side where they can be tested by feeding [`RawEvent`]s into
//! [`WatchController::run_events`] directly, without any watcher.
//!
//! ## Why strictly sequential?
//!
//! One request is settled and converted before the next is received. Two
//! conversions of the same file therefore never overlap, and the output
//! directory has a single writer. Rapid repeated events are not coalesced:
//! each one re-converts the file and the atomic write makes that harmless.

use crate::config::{WatchConfig, WatchMode};
use crate::convert::{Convert, Pipeline};
use crate::error::Md2PdfError;
use crate::output::{ConversionRequest, TriggerKind, WatchSummary};
use crate::progress::{NoopObserver, WatchObserver};
use crate::workspace::{is_markdown, WorkspaceLayout};
use notify::event::{CreateKind, MetadataKind, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the event channel between the notify thread and the loop.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The change kinds the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    Modified,
    /// Renamed or moved; the path is the destination.
    Moved,
}

impl From<RawEventKind> for TriggerKind {
    fn from(kind: RawEventKind) -> Self {
        match kind {
            RawEventKind::Created => TriggerKind::Created,
            RawEventKind::Modified => TriggerKind::Modified,
            RawEventKind::Moved => TriggerKind::Moved,
        }
    }
}

/// A filesystem change, independent of the notification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl RawEvent {
    pub fn new(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            is_dir: true,
            ..Self::new(kind, path)
        }
    }
}

/// Translate a `notify` event into zero or more [`RawEvent`]s.
///
/// Removals, access events and the source side of a rename are dropped.
pub fn raw_events(event: &Event) -> Vec<RawEvent> {
    let probe = |kind: RawEventKind, path: &Path| RawEvent {
        kind,
        path: path.to_path_buf(),
        is_dir: path.is_dir(),
    };
    match event.kind {
        EventKind::Create(CreateKind::Folder) => event
            .paths
            .iter()
            .map(|p| RawEvent::dir(RawEventKind::Created, p))
            .collect(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| probe(RawEventKind::Created, p))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .get(1)
            .map(|p| vec![probe(RawEventKind::Moved, p)])
            .unwrap_or_default(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| probe(RawEventKind::Moved, p))
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any | MetadataKind::WriteTime,
        ))
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => event
            .paths
            .iter()
            .map(|p| probe(RawEventKind::Modified, p))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decide whether `raw` should be converted.
///
/// Pure: directories, non-Markdown files and anything not directly inside
/// the input directory are rejected.
pub fn request_for(raw: &RawEvent, layout: &WorkspaceLayout) -> Option<ConversionRequest> {
    if raw.is_dir || !is_markdown(&raw.path) {
        return None;
    }
    if raw.path.parent() != Some(layout.input_dir()) || !layout.accepts(&raw.path) {
        return None;
    }
    Some(ConversionRequest::new(&raw.path, raw.kind.into()))
}

/// Rewrite an event path reported under the resolved input directory onto
/// `layout.input_dir()`, so filtering and output naming see one spelling.
pub async fn rebase(
    raw: RawEvent,
    layout: &WorkspaceLayout,
    resolved_input: Option<&Path>,
) -> RawEvent {
    let (Some(parent), Some(name)) = (raw.path.parent(), raw.path.file_name()) else {
        return raw;
    };
    if parent == layout.input_dir() {
        return raw;
    }
    let Some(resolved) = resolved_input else {
        return raw;
    };
    let same_dir = parent == resolved
        || tokio::fs::canonicalize(parent)
            .await
            .is_ok_and(|p| p == resolved);
    if !same_dir {
        return raw;
    }
    debug!("Rebased {} onto {}", raw.path.display(), layout.input_dir().display());
    let path = layout.input_dir().join(name);
    RawEvent { path, ..raw }
}

/// A live notification subscription. Dropping it unsubscribes.
pub enum Subscription {
    Native(RecommendedWatcher),
    Polling(PollWatcher),
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Subscription::Native(_) => "Subscription::Native",
            Subscription::Polling(_) => "Subscription::Polling",
        })
    }
}

/// Subscribe to `input_dir` (non-recursive), forwarding events into `tx`.
pub fn subscribe(
    input_dir: &Path,
    mode: WatchMode,
    poll_interval: Duration,
    tx: mpsc::Sender<RawEvent>,
) -> Result<Subscription, Md2PdfError> {
    let handler = move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
            for raw in raw_events(&event) {
                // The receiver is gone only during shutdown.
                if tx.blocking_send(raw).is_err() {
                    return;
                }
            }
        }
        Err(e) => warn!("Watch error: {}", e),
    };
    let failed = |e: notify::Error| Md2PdfError::WatchFailed {
        path: input_dir.to_path_buf(),
        detail: e.to_string(),
    };

    let subscription = match mode {
        WatchMode::Native => {
            let mut watcher = RecommendedWatcher::new(handler, Config::default()).map_err(failed)?;
            watcher
                .watch(input_dir, RecursiveMode::NonRecursive)
                .map_err(failed)?;
            Subscription::Native(watcher)
        }
        WatchMode::Polling => {
            let config = Config::default().with_poll_interval(poll_interval);
            let mut watcher = PollWatcher::new(handler, config).map_err(failed)?;
            watcher
                .watch(input_dir, RecursiveMode::NonRecursive)
                .map_err(failed)?;
            Subscription::Polling(watcher)
        }
    };
    info!("Watching {} ({:?})", input_dir.display(), mode);
    Ok(subscription)
}

// ── Controller ───────────────────────────────────────────────────────────

/// Owns the watch lifecycle for one workspace.
pub struct WatchController<C: Convert = Pipeline> {
    layout: WorkspaceLayout,
    converter: C,
    settle_delay: Duration,
    watch_mode: WatchMode,
    poll_interval: Duration,
    observer: Arc<dyn WatchObserver>,
    scan_existing: bool,
}

impl WatchController<Pipeline> {
    /// Controller driving the real conversion pipeline.
    pub fn new(layout: WorkspaceLayout, config: &WatchConfig) -> Self {
        let pipeline = Pipeline::new(layout.clone(), config);
        Self::with_converter(layout, pipeline, config)
    }
}

impl<C: Convert> WatchController<C> {
    pub fn with_converter(layout: WorkspaceLayout, converter: C, config: &WatchConfig) -> Self {
        Self {
            layout,
            converter,
            settle_delay: config.settle_delay(),
            watch_mode: config.watch_mode,
            poll_interval: config.poll_interval(),
            observer: config
                .observer
                .clone()
                .unwrap_or_else(|| Arc::new(NoopObserver)),
            scan_existing: false,
        }
    }

    /// Also convert Markdown files already present when the watch starts.
    pub fn scan_existing(mut self, yes: bool) -> Self {
        self.scan_existing = yes;
        self
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Watch until `shutdown` resolves.
    ///
    /// Errors only for startup failures: the workspace cannot be created or
    /// the subscription is refused. Per-file failures are logged and the loop
    /// carries on.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<WatchSummary, Md2PdfError> {
        self.layout.ensure_dirs().await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let subscription = subscribe(
            self.layout.input_dir(),
            self.watch_mode,
            self.poll_interval,
            tx,
        )?;
        self.observer.on_watch_start(self.layout.input_dir());

        let mut summary = WatchSummary::default();
        if self.scan_existing {
            self.convert_sources(&mut summary).await?;
        }

        summary = self.event_loop(rx, shutdown, summary).await;
        drop(subscription);
        info!("Stopped watching {}", self.layout.input_dir().display());
        self.observer.on_watch_stop(&summary);
        Ok(summary)
    }

    /// Process events from `rx` until it closes or `shutdown` resolves.
    pub async fn run_events(
        &self,
        rx: mpsc::Receiver<RawEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> WatchSummary {
        let summary = self.event_loop(rx, shutdown, WatchSummary::default()).await;
        self.observer.on_watch_stop(&summary);
        summary
    }

    async fn convert_sources(&self, summary: &mut WatchSummary) -> Result<(), Md2PdfError> {
        let sources = self.layout.existing_sources().await?;
        info!("Found {} existing document(s)", sources.len());
        for source in sources {
            let request = ConversionRequest::new(source, TriggerKind::Existing);
            self.observer.on_conversion_start(&request);
            let result = self.converter.convert(request).await;
            summary.record(&result);
            self.observer.on_conversion_complete(&result);
        }
        Ok(())
    }

    async fn event_loop(
        &self,
        mut rx: mpsc::Receiver<RawEvent>,
        shutdown: impl Future<Output = ()>,
        mut summary: WatchSummary,
    ) -> WatchSummary {
        // Some backends report symlink-resolved paths (FSEvents under /tmp).
        let resolved_input = tokio::fs::canonicalize(self.layout.input_dir()).await.ok();
        tokio::pin!(shutdown);
        loop {
            let raw = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                raw = rx.recv() => match raw {
                    Some(raw) => raw,
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                },
            };
            summary.events_seen += 1;
            let raw = rebase(raw, &self.layout, resolved_input.as_deref()).await;
            self.handle(raw, &mut summary).await;
        }
        summary
    }

    async fn handle(&self, raw: RawEvent, summary: &mut WatchSummary) {
        let Some(request) = request_for(&raw, &self.layout) else {
            debug!("Ignoring {:?} {}", raw.kind, raw.path.display());
            return;
        };
        info!("Detected {:?}: {}", raw.kind, request.display_name());
        self.observer.on_event_detected(&request);

        // Editors may signal before the content is flushed.
        tokio::time::sleep(self.settle_delay).await;

        self.observer.on_conversion_start(&request);
        let result = self.converter.convert(request).await;
        summary.record(&result);
        self.observer.on_conversion_complete(&result);
    }
}
