//! Codebase context collection and the diagram-rendering seam.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;
use walkdir::WalkDir;

/// Collects this service's own source text for code questions.
pub struct CodeContext {
    base_dir: PathBuf,
    extensions: Vec<String>,
}

impl CodeContext {
    /// Create a collector rooted at `base_dir`, gathering Rust sources.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extensions: vec!["rs".to_string()],
        }
    }

    /// Override the file extensions to collect.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Concatenate the content of every matching file under the base dir.
    ///
    /// Files are visited in path order so the output is stable; unreadable
    /// files are skipped with a warning. Returns an empty string when
    /// nothing matched.
    pub fn collect(&self) -> String {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.base_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file() && self.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();

        let mut content = String::new();
        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    content.push_str(&text);
                    content.push_str("\n\n");
                }
                Err(e) => warn!("Error reading {}: {}", path.display(), e),
            }
        }

        content
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }
}

/// Renders a visual diagram of the codebase structure.
///
/// Rasterization is an external concern; the pipeline only needs a URL it
/// can embed in a markdown image reference, or `None` on failure.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render the structure diagram and return its retrieval URL.
    async fn render_structure(&self) -> Option<String>;
}

/// Renderer used when no diagram backend is wired up; always declines.
#[derive(Debug, Clone, Default)]
pub struct NoDiagramRenderer;

#[async_trait]
impl DiagramRenderer for NoDiagramRenderer {
    async fn render_structure(&self) -> Option<String> {
        None
    }
}
