//! The worker program as deployed on disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("{bundle} bundle directory not found: {}", path.display())]
    Missing { bundle: String, path: PathBuf },
}

/// Materializes the worker program and tells where its entry point is.
pub trait WorkerBundle: Send + Sync {
    /// Human-readable name used in logs, e.g. `css-bundle`.
    fn name(&self) -> &str;

    /// Make the worker available on local disk. Called before every launch.
    fn deploy(&self) -> Result<(), BundleError>;

    /// Path of the script the runtime executes.
    fn entry_point(&self) -> PathBuf;
}

/// A bundle already unpacked in a directory, e.g. by a package manager.
#[derive(Debug, Clone)]
pub struct InstalledBundle {
    name: String,
    root: PathBuf,
    entry: PathBuf,
}

impl InstalledBundle {
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, entry: impl AsRef<Path>) -> Self {
        let root = root.into();
        let entry = entry.as_ref();
        let entry = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            root.join(entry)
        };
        Self {
            name: name.into(),
            root,
            entry,
        }
    }
}

impl WorkerBundle for InstalledBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn deploy(&self) -> Result<(), BundleError> {
        if self.root.is_dir() {
            tracing::debug!(bundle = %self.name, root = %self.root.display(), "Bundle in place");
            Ok(())
        } else {
            Err(BundleError::Missing {
                bundle: self.name.clone(),
                path: self.root.clone(),
            })
        }
    }

    fn entry_point(&self) -> PathBuf {
        self.entry.clone()
    }
}
