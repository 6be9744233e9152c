//! Configuration for the watch-and-convert loop.
//!
//! Every knob that differed between ad-hoc converter scripts (settle delay,
//! enabled Markdown extensions, native vs. polling notification) lives in
//! [`WatchConfig`], built via [`WatchConfigBuilder`]. The workspace paths are
//! not part of it: they are resolved once into a
//! [`crate::workspace::WorkspaceLayout`] and passed alongside.

use crate::error::Md2PdfError;
use crate::pipeline::render::{PdfBackend, RenderBackend};
use crate::progress::WatchObserver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Smallest settle delay accepted by [`WatchConfigBuilder::build`].
pub const MIN_SETTLE_DELAY_MS: u64 = 500;

/// Configuration for watching a workspace and converting its documents.
///
/// # Example
/// ```rust
/// use md2pdf_watch::{MarkdownExtension, WatchConfig, WatchMode};
///
/// let config = WatchConfig::builder()
///     .settle_delay_ms(750)
///     .watch_mode(WatchMode::Polling)
///     .without_extension(MarkdownExtension::Nl2Br)
///     .build()
///     .unwrap();
/// assert!(!config.extensions.contains(&MarkdownExtension::Nl2Br));
/// ```
#[derive(Clone)]
pub struct WatchConfig {
    /// Pause between detecting an event and reading the file. Default: 500.
    ///
    /// Editors and file managers often signal creation before the content is
    /// flushed. The pipeline still copes with vanished or empty files.
    pub settle_delay_ms: u64,

    /// Markdown syntax extensions enabled in the normalizer.
    pub extensions: BTreeSet<MarkdownExtension>,

    /// Notification strategy. Default: [`WatchMode::Native`].
    pub watch_mode: WatchMode,

    /// Scan interval for [`WatchMode::Polling`]. Default: 1000.
    pub poll_interval_ms: u64,

    /// Upper bound on a single render. Default: 30.
    pub render_timeout_secs: u64,

    /// Rendering backend. Default: [`PdfBackend`].
    pub backend: Arc<dyn RenderBackend>,

    /// Receives detection and conversion events, e.g. for terminal output.
    pub observer: Option<Arc<dyn WatchObserver>>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: MIN_SETTLE_DELAY_MS,
            extensions: MarkdownExtension::all(),
            watch_mode: WatchMode::default(),
            poll_interval_ms: 1000,
            render_timeout_secs: 30,
            backend: Arc::new(PdfBackend),
            observer: None,
        }
    }
}

impl fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfig")
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("extensions", &self.extensions)
            .field("watch_mode", &self.watch_mode)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("backend", &self.backend.name())
            .field("observer", &self.observer.as_ref().map(|_| "<dyn WatchObserver>"))
            .finish()
    }
}

impl WatchConfig {
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn has_extension(&self, ext: MarkdownExtension) -> bool {
        self.extensions.contains(&ext)
    }
}

/// Builder for [`WatchConfig`].
pub struct WatchConfigBuilder {
    config: WatchConfig,
}

impl fmt::Debug for WatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl WatchConfigBuilder {
    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn extensions(mut self, exts: impl IntoIterator<Item = MarkdownExtension>) -> Self {
        self.config.extensions = exts.into_iter().collect();
        self
    }

    pub fn with_extension(mut self, ext: MarkdownExtension) -> Self {
        self.config.extensions.insert(ext);
        self
    }

    pub fn without_extension(mut self, ext: MarkdownExtension) -> Self {
        self.config.extensions.remove(&ext);
        self
    }

    pub fn watch_mode(mut self, mode: WatchMode) -> Self {
        self.config.watch_mode = mode;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn RenderBackend>) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WatchObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WatchConfig, Md2PdfError> {
        let c = &self.config;
        if c.settle_delay_ms < MIN_SETTLE_DELAY_MS {
            return Err(Md2PdfError::InvalidConfig(format!(
                "settle delay must be at least {MIN_SETTLE_DELAY_MS}ms, got {}ms",
                c.settle_delay_ms
            )));
        }
        if c.watch_mode == WatchMode::Polling && c.poll_interval_ms < 100 {
            return Err(Md2PdfError::InvalidConfig(format!(
                "poll interval must be at least 100ms, got {}ms",
                c.poll_interval_ms
            )));
        }
        if c.render_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "render timeout must be at least 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Optional Markdown syntax recognised by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownExtension {
    /// GitHub-style pipe tables.
    Tables,
    /// ```` ``` ```` fenced code blocks. When off, fences render as inline code.
    FencedCode,
    /// Ordered lists keep their starting number instead of restarting at 1.
    SaneLists,
    /// A single newline inside a paragraph becomes a line break.
    Nl2Br,
}

impl MarkdownExtension {
    pub const ALL: [MarkdownExtension; 4] = [
        MarkdownExtension::Tables,
        MarkdownExtension::FencedCode,
        MarkdownExtension::SaneLists,
        MarkdownExtension::Nl2Br,
    ];

    pub fn all() -> BTreeSet<MarkdownExtension> {
        Self::ALL.into_iter().collect()
    }
}

/// How filesystem changes are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// OS notification (inotify, FSEvents, ReadDirectoryChangesW). (default)
    #[default]
    Native,
    /// Periodic directory scan; use on network filesystems.
    Polling,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_extension() {
        let config = WatchConfig::default();
        for ext in MarkdownExtension::ALL {
            assert!(config.has_extension(ext), "{ext:?} should be on by default");
        }
        assert_eq!(config.watch_mode, WatchMode::Native);
        assert_eq!(config.render_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn settle_delay_below_minimum_is_rejected() {
        let err = WatchConfig::builder().settle_delay_ms(100).build().unwrap_err();
        assert!(err.to_string().contains("500ms"), "got: {err}");
    }

    #[test]
    fn polling_interval_is_validated_only_for_polling() {
        assert!(WatchConfig::builder().poll_interval_ms(10).build().is_ok());
        assert!(WatchConfig::builder()
            .watch_mode(WatchMode::Polling)
            .poll_interval_ms(10)
            .build()
            .is_err());
    }

    #[test]
    fn zero_render_timeout_is_rejected() {
        assert!(WatchConfig::builder().render_timeout_secs(0).build().is_err());
    }

    #[test]
    fn extension_set_can_be_replaced() {
        let config = WatchConfig::builder()
            .extensions([MarkdownExtension::Tables])
            .build()
            .unwrap();
        assert_eq!(config.extensions.len(), 1);
        assert!(config.has_extension(MarkdownExtension::Tables));
    }
}
