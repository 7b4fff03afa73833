//! Artifact emission.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{ExportError, ExportResult};

/// Receives finished artifacts.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store `bytes` under `filename`. Returns where the artifact went.
    async fn save(&self, bytes: &[u8], filename: &str) -> ExportResult<String>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, bytes: &[u8], filename: &str) -> ExportResult<String> {
        // Only the final component is honored; artifacts never leave `dir`.
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ExportError::Export(format!("invalid artifact name: {filename:?}")))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_into_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(tmp.path().join("out"));

        let location = sink.save(b"hello", "a.txt").await.expect("save");
        assert!(location.ends_with("a.txt"));
        let written = tokio::fs::read(tmp.path().join("out/a.txt")).await.expect("read");
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_strips_directories_from_name() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(tmp.path());

        sink.save(b"x", "../escape.bin").await.expect("save");
        assert!(tmp.path().join("escape.bin").exists());
        assert!(sink.save(b"x", "..").await.is_err());
    }
}
