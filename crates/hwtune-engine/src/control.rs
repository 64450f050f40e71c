//! Tunable controls
//!
//! One control binds a node to the value captured when its session opened
//! (`original`) and the value the user is currently previewing (`current`).

use hwtune_config::{ConfigError, PreferenceStore};
use hwtune_hal::{NodeError, NodeIo};

use crate::ControlSpec;

/// Live state of one control within a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunableControl {
    spec: ControlSpec,
    original: i64,
    current: i64,
}

impl TunableControl {
    /// Capture the last committed value (or the default). Writes nothing.
    pub fn open(spec: ControlSpec, store: &dyn PreferenceStore) -> Self {
        let original = store.get(&spec.key(), spec.default);
        Self {
            spec,
            original,
            current: original,
        }
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Value captured when the session opened
    pub fn original(&self) -> i64 {
        self.original
    }

    /// Value currently previewed
    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn is_modified(&self) -> bool {
        self.current != self.original
    }

    /// Text for the UI label next to the control
    pub fn display(&self) -> String {
        self.spec.codec.display(self.current, self.spec.max)
    }

    /// Preview a value on the node immediately.
    ///
    /// The UI widget enforces the range; `current` tracks the value even if
    /// the node write fails.
    pub fn set_live(&mut self, value: i64, nodes: &dyn NodeIo) -> Result<(), NodeError> {
        if !self.spec.contains(value) {
            tracing::debug!(
                "{}: {} outside [{}, {}], writing as given",
                self.spec.name,
                value,
                self.spec.min,
                self.spec.max
            );
        }
        self.current = value;
        self.write(nodes, value)
    }

    /// Persist the previewed value as the new baseline
    pub fn commit(&self, store: &dyn PreferenceStore) -> Result<(), ConfigError> {
        store.put(&self.spec.key(), self.current).inspect_err(|e| {
            tracing::warn!("Failed to persist {}: {}", self.spec.name, e);
        })
    }

    /// Restore the node to the value captured at open
    pub fn revert(&mut self, nodes: &dyn NodeIo) -> Result<(), NodeError> {
        self.current = self.original;
        self.write(nodes, self.original)
    }

    /// Preview the documented default. Nothing is persisted until commit.
    pub fn reset_to_default(&mut self, nodes: &dyn NodeIo) -> Result<(), NodeError> {
        self.set_live(self.spec.default, nodes)
    }

    fn write(&self, nodes: &dyn NodeIo, value: i64) -> Result<(), NodeError> {
        let raw = self.spec.codec.encode(value);
        match nodes.write_text(&self.spec.path, &raw) {
            Ok(()) => {
                tracing::debug!("{} <- {} ({})", self.spec.path.display(), raw, self.spec.name);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Live write to {} failed: {}", self.spec.name, e);
                Err(e)
            }
        }
    }
}
