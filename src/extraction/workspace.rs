use crate::error::OcrError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Per-request scratch directory for intermediate row images.
///
/// The directory name carries the request id so concurrent requests never
/// share files. It is removed when the workspace is dropped; a failed
/// removal is logged and otherwise ignored.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a workspace under `root`, or the system temp dir if `None`
    pub fn create(root: Option<&Path>) -> Result<Self, OcrError> {
        let id = Uuid::new_v4();
        let prefix = format!("logsheet-{}-", id);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| {
                    OcrError::Internal(format!(
                        "Failed to create work directory {}: {}",
                        root.display(),
                        e
                    ))
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| OcrError::Internal(format!("Failed to create workspace: {}", e)))?;

        tracing::debug!("Created workspace {}", dir.path().display());
        Ok(Self { id, dir: Some(dir) })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        // `dir` is only taken in `drop`
        self.dir
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Where the image of row `index` is stored
    pub fn strip_path(&self, index: usize) -> PathBuf {
        self.file(&format!("line_{}.png", index))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!("Removed workspace {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove workspace {}: {}", path.display(), e),
            }
        }
    }
}
