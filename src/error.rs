//! Error types for the md2pdf-watch library.
//!
//! Two distinct groups reflect two distinct failure modes:
//!
//! * [`Md2PdfError`]: **Fatal**: the watcher cannot start at all (workspace
//!   directories cannot be created, invalid configuration, the notification
//!   backend refused the subscription). Returned before the watch loop runs.
//!
//! * [`ConvertError`] and its parts [`ReadError`], [`PathError`],
//!   [`RenderError`]: **Per file**: one source document could not be
//!   converted. These never escape [`crate::convert::Pipeline::convert`]; they
//!   are folded into a failed [`crate::output::ConversionResult`] so the watch
//!   loop keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop the process before the watch loop starts.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    /// The input or output directory could not be created or accessed.
    #[error("Workspace directory '{path}' is unavailable: {source}")]
    WorkspaceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workspace layout itself is inconsistent.
    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(#[from] PathError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The filesystem notification backend rejected the subscription.
    #[error("Failed to watch '{path}': {detail}")]
    WatchFailed { path: PathBuf, detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The source document could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("'{path}' is not valid UTF-8 text")]
    InvalidEncoding { path: PathBuf },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The output location could not be derived or created.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("'{path}' is not inside the input directory '{input_dir}'")]
    OutsideInputDir { path: PathBuf, input_dir: PathBuf },

    #[error("'{path}' lies inside the output directory")]
    InsideOutputDir { path: PathBuf },

    #[error("'{path}' has no file name to derive an output name from")]
    NoFileStem { path: PathBuf },

    #[error("'{path}' is not an absolute path")]
    NotAbsolute { path: PathBuf },

    #[error("'{path}' contains a parent-directory component")]
    ParentTraversal { path: PathBuf },

    #[error("Input directory '{input_dir}' has no parent to hold a sibling output directory")]
    NoWorkspaceRoot { input_dir: PathBuf },

    #[error("Failed to create output directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The rendering backend rejected the composed document or produced nothing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Rendering failed: {message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn timeout(secs: u64) -> Self {
        Self::new(format!("renderer did not finish within {secs}s"))
    }

    pub fn empty_output() -> Self {
        Self::new("renderer produced no output")
    }
}

/// Any per-file failure inside the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_input_dir_display() {
        let e = PathError::OutsideInputDir {
            path: "/tmp/elsewhere/a.md".into(),
            input_dir: "/ws/input".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/elsewhere/a.md"), "got: {msg}");
        assert!(msg.contains("/ws/input"), "got: {msg}");
    }

    #[test]
    fn render_timeout_display() {
        let e = RenderError::timeout(30);
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn convert_error_is_transparent() {
        let e: ConvertError = RenderError::new("bad markup").into();
        assert_eq!(e.to_string(), "Rendering failed: bad markup");

        let e: ConvertError = ReadError::InvalidEncoding {
            path: "/ws/input/x.md".into(),
        }
        .into();
        assert!(e.to_string().contains("UTF-8"));
    }

    #[test]
    fn fatal_wraps_path_error() {
        let e: Md2PdfError = PathError::NoWorkspaceRoot {
            input_dir: "/".into(),
        }
        .into();
        assert!(e.to_string().starts_with("Invalid workspace"));
    }
}
