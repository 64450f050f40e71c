//! Kernel control-node access
//!
//! A control node is a sysfs file holding one integer as text. Reads return
//! whatever is present, writes replace the whole content.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Control node not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NodeError {
    /// Path of the node the failure refers to
    pub fn path(&self) -> &Path {
        match self {
            NodeError::NotFound(path) => path,
            NodeError::Read { path, .. } | NodeError::Write { path, .. } => path,
        }
    }
}

/// Primitive read/write/existence access to control nodes.
///
/// Paths are the absolute node paths as the kernel exposes them
/// (`/sys/devices/...`). Implementations decide where they actually live.
pub trait NodeIo: Send + Sync {
    /// Check whether the node is present
    fn exists(&self, path: &Path) -> bool;

    /// Read the raw text of a node
    fn read_text(&self, path: &Path) -> Result<String, NodeError>;

    /// Replace the content of a node
    fn write_text(&self, path: &Path, value: &str) -> Result<(), NodeError>;
}

/// Control nodes backed by the filesystem
#[derive(Debug, Clone)]
pub struct SysfsNodes {
    root: PathBuf,
}

impl Default for SysfsNodes {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsNodes {
    /// Nodes resolved against the real root filesystem
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Nodes resolved under `root`, e.g. a chroot or a test directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a kernel node path onto the filesystem under `root`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.root.join(relative)
    }
}

impl NodeIo for SysfsNodes {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn read_text(&self, path: &Path) -> Result<String, NodeError> {
        let resolved = self.resolve(path);
        fs::read_to_string(&resolved).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                NodeError::NotFound(path.to_path_buf())
            } else {
                NodeError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    fn write_text(&self, path: &Path, value: &str) -> Result<(), NodeError> {
        let resolved = self.resolve(path);
        fs::write(&resolved, value).map_err(|source| NodeError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::trace!("Wrote {:?} to {}", value, resolved.display());
        Ok(())
    }
}
