//! Reading a source document.
//!
//! ## Why classify instead of failing?
//!
//! A watch event is only a hint: by the time the settle delay has elapsed
//! the file may have been deleted, renamed away, or still be zero bytes
//! because the editor has not flushed yet. Those cases are routine, so they
//! come back as [`Source::Skip`] and get logged quietly. Only genuine read
//! problems (permissions, bad encoding, I/O) are errors.

use crate::error::ReadError;
use crate::output::SkipReason;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// What was found at the source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Text(String),
    Skip(SkipReason),
}

/// Read `path` as UTF-8 Markdown.
pub async fn read_source(path: &Path) -> Result<Source, ReadError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) => return classify_io(path, e),
    };
    if !meta.is_file() {
        return Ok(Source::Skip(SkipReason::NotAFile));
    }
    if meta.len() == 0 {
        return Ok(Source::Skip(SkipReason::Empty));
    }

    // The file can still vanish between the metadata call and the read.
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => return classify_io(path, e),
    };
    if bytes.is_empty() {
        return Ok(Source::Skip(SkipReason::Empty));
    }

    let text = String::from_utf8(bytes).map_err(|_| ReadError::InvalidEncoding {
        path: path.to_path_buf(),
    })?;
    // A UTF-8 BOM would otherwise show up as a stray glyph.
    let text = match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    };
    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(Source::Text(text))
}

fn classify_io(path: &Path, e: std::io::Error) -> Result<Source, ReadError> {
    match e.kind() {
        ErrorKind::NotFound => Ok(Source::Skip(SkipReason::Missing)),
        ErrorKind::PermissionDenied => Err(ReadError::PermissionDenied {
            path: path.to_path_buf(),
        }),
        _ => Err(ReadError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
