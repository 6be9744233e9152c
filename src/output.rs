//! Request and result types flowing through the pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// What kind of filesystem change produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Created,
    Modified,
    /// A file was renamed or moved into the input directory.
    Moved,
    /// Found by the startup scan rather than by a live event.
    Existing,
}

/// One unit of work for [`crate::convert::Pipeline`]. Consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source_path: PathBuf,
    pub detected_at: SystemTime,
    pub trigger: TriggerKind,
}

impl ConversionRequest {
    pub fn new(source_path: impl Into<PathBuf>, trigger: TriggerKind) -> Self {
        Self {
            source_path: source_path.into(),
            detected_at: SystemTime::now(),
            trigger,
        }
    }

    /// File name for log lines.
    pub fn display_name(&self) -> String {
        display_name(&self.source_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Success,
    Skipped,
    Failed,
}

/// Why a request was skipped rather than converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Deleted or renamed away before it could be read.
    Missing,
    /// Zero bytes; most likely a write still in progress.
    Empty,
    /// The path names a directory or other non-regular file.
    NotAFile,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::Missing => "file no longer exists",
            SkipReason::Empty => "file is empty",
            SkipReason::NotAFile => "not a regular file",
        })
    }
}

/// Outcome of one [`ConversionRequest`]. Used for logging only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub source_path: PathBuf,
    /// Set once the output location has been resolved.
    pub output_path: Option<PathBuf>,
    pub status: ConversionStatus,
    pub skip_reason: Option<SkipReason>,
    /// Human-readable failure description.
    pub error: Option<String>,
    pub trigger: TriggerKind,
    pub duration_ms: u64,
    /// Size of the written PDF.
    pub bytes_written: u64,
}

impl ConversionResult {
    pub fn success(
        request: &ConversionRequest,
        output_path: PathBuf,
        bytes_written: u64,
        duration: Duration,
    ) -> Self {
        Self {
            output_path: Some(output_path),
            status: ConversionStatus::Success,
            bytes_written,
            ..Self::base(request, duration)
        }
    }

    pub fn skipped(request: &ConversionRequest, reason: SkipReason, duration: Duration) -> Self {
        Self {
            status: ConversionStatus::Skipped,
            skip_reason: Some(reason),
            ..Self::base(request, duration)
        }
    }

    pub fn failed(
        request: &ConversionRequest,
        output_path: Option<PathBuf>,
        error: String,
        duration: Duration,
    ) -> Self {
        Self {
            output_path,
            status: ConversionStatus::Failed,
            error: Some(error),
            ..Self::base(request, duration)
        }
    }

    fn base(request: &ConversionRequest, duration: Duration) -> Self {
        Self {
            source_path: request.source_path.clone(),
            output_path: None,
            status: ConversionStatus::Failed,
            skip_reason: None,
            error: None,
            trigger: request.trigger,
            duration_ms: duration.as_millis() as u64,
            bytes_written: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

/// Totals reported when a watch session or batch run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSummary {
    /// Raw events received from the notification source.
    pub events_seen: usize,
    /// Events that produced a conversion attempt.
    pub requests: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl WatchSummary {
    pub fn record(&mut self, result: &ConversionResult) {
        self.requests += 1;
        match result.status {
            ConversionStatus::Success => self.converted += 1,
            ConversionStatus::Skipped => self.skipped += 1,
            ConversionStatus::Failed => self.failed += 1,
        }
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
