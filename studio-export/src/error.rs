//! Export error and warning types.

use serde::Serialize;
use studio_core::ElementId;
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that can occur during export and recording.
///
/// Only [`ExportError::NoSurface`] and [`ExportError::Capability`] abort a
/// whole export; per-element failures surface as [`ExportWarning`]s.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No rasterization surface could be allocated.
    #[error("No rasterization surface available: {0}")]
    NoSurface(String),

    /// No encoder supports any acceptable container/codec.
    #[error("No supported encoder: {0}")]
    Capability(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Drawing a single element failed.
    #[error("Draw failed: {0}")]
    Draw(String),

    /// Encoding the final artifact failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Recording lifecycle error (already running, task failure).
    #[error("Recording error: {0}")]
    Recording(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What kind of non-fatal problem an export hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// An image could not be loaded.
    Resource,
    /// An element could not be drawn.
    Draw,
}

/// A non-fatal problem: the affected element was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportWarning {
    /// Category.
    pub kind: WarningKind,
    /// Skipped element.
    pub element: Option<ElementId>,
    /// Human-readable cause.
    pub message: String,
}

impl ExportWarning {
    /// A resource (image load) warning.
    #[must_use]
    pub fn resource(element: ElementId, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Resource,
            element: Some(element),
            message: message.into(),
        }
    }

    /// A draw warning.
    #[must_use]
    pub fn draw(element: ElementId, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Draw,
            element: Some(element),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.element {
            Some(id) => write!(f, "{:?} warning for {id}: {}", self.kind, self.message),
            None => write!(f, "{:?} warning: {}", self.kind, self.message),
        }
    }
}
