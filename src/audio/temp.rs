//! Scoped temporary audio files
//!
//! The base synthesizer hands its output over as a [`TempArtifact`]; the file
//! is removed when the artifact is dropped, whichever way the clone request
//! ends.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file deleted on drop
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of an existing (or about to be written) file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Unique path in `dir` with the given prefix and extension
    pub fn unique_in(dir: &Path, prefix: &str, extension: &str) -> Self {
        let name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        Self::new(dir.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary file {:?}", self.path),
            Err(e) => warn!("Failed to remove temporary file {:?}: {}", self.path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let artifact = TempArtifact::unique_in(&std::env::temp_dir(), "temp_test", "bin");
        std::fs::write(artifact.path(), b"data").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_names_differ() {
        let dir = std::env::temp_dir();
        let a = TempArtifact::unique_in(&dir, "base", "wav");
        let b = TempArtifact::unique_in(&dir, "base", "wav");
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(&dir));
        assert_eq!(a.path().extension().unwrap(), "wav");
    }

    #[test]
    fn test_missing_file_drop_is_quiet() {
        let artifact = TempArtifact::unique_in(&std::env::temp_dir(), "never_written", "wav");
        drop(artifact);
    }
}
