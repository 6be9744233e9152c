//! Workspace layout and output-path resolution.
//!
//! A workspace is a root directory holding two siblings:
//!
//! ```text
//! <root>/
//!  ├─ input/    watched, non-recursive
//!  └─ output/   written by the pipeline only
//! ```
//!
//! The layout is resolved once to absolute paths and passed explicitly to
//! every component; nothing here looks at the current working directory.
//! Because `output/` is a sibling and never a child of `input/`, writing a
//! PDF can never re-trigger the watch.

use crate::error::{Md2PdfError, PathError};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const INPUT_DIR_NAME: &str = "input";
pub const OUTPUT_DIR_NAME: &str = "output";
pub const MARKDOWN_EXTENSION: &str = "md";
pub const PDF_EXTENSION: &str = "pdf";

/// The paired input/output directories. Invariant for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Layout for `<root>/input` and `<root>/output`. `root` must be absolute.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root = root.as_ref();
        Self::from_input_dir(root.join(INPUT_DIR_NAME))
    }

    /// Layout whose output directory is the `output` sibling of `input_dir`.
    pub fn from_input_dir(input_dir: impl Into<PathBuf>) -> Result<Self, PathError> {
        let input_dir = input_dir.into();
        if !input_dir.is_absolute() {
            return Err(PathError::NotAbsolute { path: input_dir });
        }
        if has_parent_component(&input_dir) {
            return Err(PathError::ParentTraversal { path: input_dir });
        }
        let root = input_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| PathError::NoWorkspaceRoot {
                input_dir: input_dir.clone(),
            })?;
        let output_dir = root.join(OUTPUT_DIR_NAME);
        if output_dir == input_dir {
            return Err(PathError::NoWorkspaceRoot { input_dir });
        }
        Ok(Self {
            input_dir,
            output_dir,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if absent. Failure here is fatal.
    pub async fn ensure_dirs(&self) -> Result<(), Md2PdfError> {
        for dir in [&self.input_dir, &self.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| Md2PdfError::WorkspaceUnavailable {
                    path: dir.clone(),
                    source,
                })?;
        }
        debug!(
            "Workspace ready: input={} output={}",
            self.input_dir.display(),
            self.output_dir.display()
        );
        Ok(())
    }

    /// Output PDF path for `source`, without touching the filesystem.
    pub fn output_path_for(&self, source: &Path) -> Result<PathBuf, PathError> {
        if has_parent_component(source) {
            return Err(PathError::ParentTraversal {
                path: source.to_path_buf(),
            });
        }
        if source.starts_with(&self.output_dir) {
            return Err(PathError::InsideOutputDir {
                path: source.to_path_buf(),
            });
        }
        let relative = source.strip_prefix(&self.input_dir).map_err(|_| {
            PathError::OutsideInputDir {
                path: source.to_path_buf(),
                input_dir: self.input_dir.clone(),
            }
        })?;
        if relative.as_os_str().is_empty() {
            return Err(PathError::OutsideInputDir {
                path: source.to_path_buf(),
                input_dir: self.input_dir.clone(),
            });
        }
        let stem = source
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PathError::NoFileStem {
                path: source.to_path_buf(),
            })?;

        let mut name = OsString::from(stem);
        name.push(".");
        name.push(PDF_EXTENSION);
        Ok(self.output_dir.join(name))
    }

    /// Resolve the output path and make sure its directory exists.
    ///
    /// Creating an already existing directory is not an error, so two rapid
    /// events racing here both succeed.
    pub async fn resolve_output_path(&self, source: &Path) -> Result<PathBuf, PathError> {
        let output = self.output_path_for(source)?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| PathError::CreateDirFailed {
                path: self.output_dir.clone(),
                source,
            })?;
        Ok(output)
    }

    /// Markdown files already present directly in `input_dir`, sorted by name.
    pub async fn existing_sources(&self) -> Result<Vec<PathBuf>, Md2PdfError> {
        let unavailable = |source| Md2PdfError::WorkspaceUnavailable {
            path: self.input_dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.input_dir)
            .await
            .map_err(unavailable)?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && is_markdown(&path) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// True when `path` is a Markdown file directly or transitively under
    /// `input_dir` and not under `output_dir`.
    pub fn accepts(&self, path: &Path) -> bool {
        is_markdown(path)
            && path.starts_with(&self.input_dir)
            && !path.starts_with(&self.output_dir)
    }
}

/// Output path for `source` given only the input directory.
pub fn output_path(source: &Path, input_dir: &Path) -> Result<PathBuf, PathError> {
    WorkspaceLayout::from_input_dir(input_dir)?.output_path_for(source)
}

/// Case-insensitive `.md` check.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> WorkspaceLayout {
        WorkspaceLayout::from_root("/ws").unwrap()
    }

    #[test]
    fn output_is_sibling_of_input() {
        let l = layout();
        assert_eq!(l.input_dir(), Path::new("/ws/input"));
        assert_eq!(l.output_dir(), Path::new("/ws/output"));
    }

    #[test]
    fn output_name_is_stem_plus_pdf() {
        let out = layout()
            .output_path_for(Path::new("/ws/input/report.final.md"))
            .unwrap();
        assert_eq!(out, Path::new("/ws/output/report.final.pdf"));
    }

    #[test]
    fn uppercase_extension_is_recognised() {
        let l = layout();
        let src = Path::new("/ws/input/notes.MD");
        assert!(is_markdown(src));
        assert!(l.accepts(src));
        assert_eq!(l.output_path_for(src).unwrap(), Path::new("/ws/output/notes.pdf"));
    }

    #[test]
    fn non_markdown_is_not_accepted() {
        let l = layout();
        assert!(!l.accepts(Path::new("/ws/input/image.png")));
        assert!(!l.accepts(Path::new("/ws/input/README")));
        assert!(!l.accepts(Path::new("/ws/input/archive.md.bak")));
    }

    #[test]
    fn source_outside_input_is_rejected() {
        let err = layout()
            .output_path_for(Path::new("/elsewhere/a.md"))
            .unwrap_err();
        assert!(matches!(err, PathError::OutsideInputDir { .. }), "got: {err:?}");

        // A prefix match on the string is not enough.
        let err = layout()
            .output_path_for(Path::new("/ws/input-old/a.md"))
            .unwrap_err();
        assert!(matches!(err, PathError::OutsideInputDir { .. }), "got: {err:?}");
    }

    #[test]
    fn source_inside_output_is_rejected() {
        let err = layout()
            .output_path_for(Path::new("/ws/output/a.md"))
            .unwrap_err();
        assert!(matches!(err, PathError::InsideOutputDir { .. }), "got: {err:?}");
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let err = layout()
            .output_path_for(Path::new("/ws/input/../secret/a.md"))
            .unwrap_err();
        assert!(matches!(err, PathError::ParentTraversal { .. }), "got: {err:?}");
    }

    #[test]
    fn input_dir_itself_is_rejected() {
        assert!(layout().output_path_for(Path::new("/ws/input")).is_err());
    }

    #[test]
    fn relative_or_rootless_input_dir_is_rejected() {
        assert!(matches!(
            WorkspaceLayout::from_input_dir("input"),
            Err(PathError::NotAbsolute { .. })
        ));
        assert!(matches!(
            WorkspaceLayout::from_input_dir("/"),
            Err(PathError::NoWorkspaceRoot { .. })
        ));
        // An input dir named "output" would collide with its own sibling.
        assert!(matches!(
            WorkspaceLayout::from_input_dir("/ws/output"),
            Err(PathError::NoWorkspaceRoot { .. })
        ));
    }

    #[test]
    fn free_function_matches_layout() {
        let out = output_path(Path::new("/ws/input/a.md"), Path::new("/ws/input")).unwrap();
        assert_eq!(out, Path::new("/ws/output/a.pdf"));
    }

    #[tokio::test]
    async fn resolve_creates_output_dir_idempotently() {
        let tmp = tempfile::tempdir().unwrap();
        let l = WorkspaceLayout::from_root(tmp.path()).unwrap();
        let src = l.input_dir().join("a.md");

        let (a, b) = tokio::join!(l.resolve_output_path(&src), l.resolve_output_path(&src));
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(l.output_dir().is_dir());
    }

    #[tokio::test]
    async fn existing_sources_lists_markdown_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let l = WorkspaceLayout::from_root(tmp.path()).unwrap();
        l.ensure_dirs().await.unwrap();
        for name in ["b.md", "a.MD", "c.txt"] {
            std::fs::write(l.input_dir().join(name), "x").unwrap();
        }
        std::fs::create_dir(l.input_dir().join("dir.md")).unwrap();

        let found = l.existing_sources().await.unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, ["a.MD", "b.md"]);
    }
}
