//! Hardware-parameter tuning engine
//!
//! Binds bounded numeric controls to three places a value can live:
//!
//! - the live kernel control node (written on every edit, for live preview)
//! - the durable preference store (written only on commit)
//! - the transient state of an editing session (reverted on cancel)
//!
//! # Example
//!
//! ```no_run
//! use hwtune_config::TomlStore;
//! use hwtune_engine::{FamilyCatalog, Tuner, TuningContext};
//! use hwtune_hal::SysfsNodes;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), hwtune_engine::TuneError> {
//!     let ctx = TuningContext::new(
//!         Arc::new(SysfsNodes::new()),
//!         Arc::new(TomlStore::new("/data/hwtune/preferences.toml")),
//!     );
//!     let tuner = Tuner::new(ctx, FamilyCatalog::builtin());
//!
//!     let mut session = tuner.open_session("volume_boost")?;
//!     session.set_live("boost_spk", 3)?;
//!     session.commit();
//!     Ok(())
//! }
//! ```

pub mod boot;
pub mod codec;
pub mod control;
pub mod direct;
pub mod family;
pub mod probe;
pub mod session;
pub mod tuner;

pub use boot::{BootReport, BootSync, FamilyOutcome, FamilyStatus};
pub use codec::{CodecError, ScaleCodec};
pub use control::TunableControl;
pub use family::{ControlFamily, ControlSpec, FamilyCatalog, FamilyMode};
pub use probe::SupportProbe;
pub use session::{CloseAction, CloseReport, SessionCoordinator, SessionTicket, TuningSession};
pub use tuner::Tuner;

use hwtune_config::{ConfigError, PreferenceStore};
use hwtune_hal::{NodeError, NodeIo};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuneError {
    #[error("Unknown control family: {0}")]
    UnknownFamily(String),

    #[error("Unknown control {control} in family {family}")]
    UnknownControl { family: String, control: String },

    #[error("Control family not supported by this kernel: {0}")]
    Unsupported(String),

    #[error("Family {family} is edited in {mode:?} mode")]
    WrongMode { family: String, mode: FamilyMode },

    #[error("Invalid control family {family}: {reason}")]
    InvalidFamily { family: String, reason: String },

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Preference store error: {0}")]
    Store(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine Result type
pub type Result<T> = std::result::Result<T, TuneError>;

/// Handles to the node backend and the preference store
#[derive(Clone)]
pub struct TuningContext {
    nodes: Arc<dyn NodeIo>,
    store: Arc<dyn PreferenceStore>,
}

impl TuningContext {
    pub fn new(nodes: Arc<dyn NodeIo>, store: Arc<dyn PreferenceStore>) -> Self {
        Self { nodes, store }
    }

    pub fn nodes(&self) -> &dyn NodeIo {
        self.nodes.as_ref()
    }

    pub fn store(&self) -> &dyn PreferenceStore {
        self.store.as_ref()
    }

    /// Support probe over this context's nodes
    pub fn probe(&self) -> SupportProbe<'_> {
        SupportProbe::new(self.nodes())
    }
}
