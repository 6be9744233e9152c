//! Observer trait for watch-loop events.
//!
//! Inject an [`Arc<dyn WatchObserver>`] via
//! [`crate::config::WatchConfigBuilder::observer`] to receive events as the
//! watcher detects files and converts them.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a terminal, a log sink, or a test recorder without the
//! library knowing how the host application communicates. Events arrive from
//! the single watch task, one conversion at a time.
//!
//! # Example
//!
//! ```rust
//! use md2pdf_watch::{ConversionResult, WatchConfig, WatchObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl WatchObserver for Counter {
//!     fn on_conversion_complete(&self, result: &ConversionResult) {
//!         if result.is_success() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = WatchConfig::builder()
//!     .observer(Arc::new(Counter(AtomicUsize::new(0))) as Arc<dyn WatchObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ConversionRequest, ConversionResult, WatchSummary};
use std::path::Path;
use std::sync::Arc;

/// Called by the watch controller as it processes events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait WatchObserver: Send + Sync {
    /// Called once the subscription is active.
    ///
    /// # Arguments
    /// * `input_dir`: the directory being watched
    fn on_watch_start(&self, input_dir: &Path) {
        let _ = input_dir;
    }

    /// Called for every relevant event, before the settle delay.
    fn on_event_detected(&self, request: &ConversionRequest) {
        let _ = request;
    }

    /// Called just before the pipeline reads the source.
    fn on_conversion_start(&self, request: &ConversionRequest) {
        let _ = request;
    }

    /// Called with the outcome of every conversion attempt.
    fn on_conversion_complete(&self, result: &ConversionResult) {
        let _ = result;
    }

    /// Called once when the loop exits.
    fn on_watch_stop(&self, summary: &WatchSummary) {
        let _ = summary;
    }
}

/// A no-op observer. This is the default when none is configured.
pub struct NoopObserver;

impl WatchObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::WatchConfig`].
pub type SharedObserver = Arc<dyn WatchObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{SkipReason, TriggerKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Tracking {
        detected: AtomicUsize,
        started: AtomicUsize,
        completed: AtomicUsize,
        stopped_with: AtomicUsize,
    }

    impl WatchObserver for Tracking {
        fn on_event_detected(&self, _request: &ConversionRequest) {
            self.detected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_start(&self, _request: &ConversionRequest) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _result: &ConversionResult) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_watch_stop(&self, summary: &WatchSummary) {
            self.stopped_with.store(summary.requests, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let req = ConversionRequest::new("/ws/input/a.md", TriggerKind::Created);
        let obs = NoopObserver;
        obs.on_watch_start(Path::new("/ws/input"));
        obs.on_event_detected(&req);
        obs.on_conversion_start(&req);
        obs.on_conversion_complete(&ConversionResult::skipped(
            &req,
            SkipReason::Empty,
            Duration::ZERO,
        ));
        obs.on_watch_stop(&WatchSummary::default());
    }

    #[test]
    fn tracking_observer_receives_events() {
        let tracker = Arc::new(Tracking::default());
        let obs: SharedObserver = tracker.clone();
        let req = ConversionRequest::new("/ws/input/a.md", TriggerKind::Modified);

        obs.on_event_detected(&req);
        obs.on_conversion_start(&req);
        obs.on_conversion_complete(&ConversionResult::failed(
            &req,
            None,
            "boom".into(),
            Duration::ZERO,
        ));
        let summary = WatchSummary {
            requests: 1,
            failed: 1,
            ..WatchSummary::default()
        };
        obs.on_watch_stop(&summary);

        assert_eq!(tracker.detected.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.started.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.stopped_with.load(Ordering::SeqCst), 1);
    }
}
