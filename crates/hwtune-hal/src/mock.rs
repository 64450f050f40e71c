//! Mock control nodes for testing without real hardware
//!
//! Nodes live in memory behind a shared lock so a test can inspect and
//! manipulate them while the engine holds its own handle.
//!
//! # Usage
//!
//! ```no_run
//! use hwtune_hal::mock::MockNodes;
//! use hwtune_hal::NodeIo;
//! use std::path::Path;
//!
//! let nodes = MockNodes::new().with_node("/sys/class/misc/dockaudio/cardock_enable", "0");
//! nodes.write_text(Path::new("/sys/class/misc/dockaudio/cardock_enable"), "1").unwrap();
//! assert_eq!(nodes.value("/sys/class/misc/dockaudio/cardock_enable").as_deref(), Some("1"));
//! ```

use crate::{NodeError, NodeIo};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Shared mock state
#[derive(Debug, Default)]
struct MockNodeState {
    /// Node contents by path
    nodes: HashMap<PathBuf, String>,
    /// Nodes whose writes fail with a permission error
    failing_writes: HashSet<PathBuf>,
    /// Every successful write, in order
    writes: Vec<(PathBuf, String)>,
}

/// In-memory control nodes
#[derive(Debug, Clone, Default)]
pub struct MockNodes {
    state: Arc<RwLock<MockNodeState>>,
}

impl MockNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MockNodes::insert`]
    pub fn with_node(self, path: impl Into<PathBuf>, value: &str) -> Self {
        self.insert(path, value);
        self
    }

    /// Create or replace a node without recording a write
    pub fn insert(&self, path: impl Into<PathBuf>, value: &str) {
        if let Ok(mut state) = self.state.write() {
            state.nodes.insert(path.into(), value.to_string());
        }
    }

    /// Remove a node, as if the driver were not loaded
    pub fn remove(&self, path: impl AsRef<Path>) {
        if let Ok(mut state) = self.state.write() {
            state.nodes.remove(path.as_ref());
        }
    }

    /// Current content of a node
    pub fn value(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.nodes.get(path.as_ref()).cloned())
    }

    /// Make every following write to `path` fail
    pub fn fail_writes(&self, path: impl Into<PathBuf>) {
        if let Ok(mut state) = self.state.write() {
            state.failing_writes.insert(path.into());
        }
    }

    /// Number of successful writes to `path`
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        self.state
            .read()
            .map(|s| s.writes.iter().filter(|(p, _)| p == path.as_ref()).count())
            .unwrap_or(0)
    }

    /// Number of successful writes to any node
    pub fn total_writes(&self) -> usize {
        self.state.read().map(|s| s.writes.len()).unwrap_or(0)
    }

    /// Snapshot of every node, for comparing whole trees
    pub fn snapshot(&self) -> HashMap<PathBuf, String> {
        self.state
            .read()
            .map(|s| s.nodes.clone())
            .unwrap_or_default()
    }
}

impl NodeIo for MockNodes {
    fn exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|s| s.nodes.contains_key(path))
            .unwrap_or(false)
    }

    fn read_text(&self, path: &Path) -> Result<String, NodeError> {
        self.value(path)
            .ok_or_else(|| NodeError::NotFound(path.to_path_buf()))
    }

    fn write_text(&self, path: &Path, value: &str) -> Result<(), NodeError> {
        let mut state = self.state.write().map_err(|_| NodeError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::other("mock state poisoned"),
        })?;

        if state.failing_writes.contains(path) {
            return Err(NodeError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        state.nodes.insert(path.to_path_buf(), value.to_string());
        state.writes.push((path.to_path_buf(), value.to_string()));
        tracing::debug!("[MOCK] {} <- {}", path.display(), value);
        Ok(())
    }
}
