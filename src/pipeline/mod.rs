//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets the rendering
//! backend be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ markdown ──▶ layout ──▶ render ──▶ write
//! (read)    (normalize)  (geometry)  (printpdf)  (atomic)
//! ```
//!
//! 1. [`input`]:    read the source; vanished, empty, and non-regular files
//!    are classified as skips rather than errors
//! 2. [`markdown`]: parse with pulldown-cmark into a
//!    [`crate::document::ComposedDocument`]
//! 3. [`layout`]:   pure page geometry: wrapping, pagination, table grids
//! 4. [`render`]:   replay the layout onto printpdf; runs in
//!    `spawn_blocking` under a timeout
//! 5. [`write`]:    temp file plus rename into the output directory

pub mod input;
pub mod layout;
pub mod markdown;
pub mod render;
pub mod write;
