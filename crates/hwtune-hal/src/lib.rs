//! Hardware Abstraction Layer (HAL)
//!
//! Plain-text access to kernel control nodes: the sysfs files through which
//! display colour multipliers, gamma offsets, in-call audio gains and similar
//! parameters are tuned.
//!
//! # Example
//!
//! ```no_run
//! use hwtune_hal::{NodeIo, SysfsNodes};
//! use std::path::Path;
//!
//! fn main() -> Result<(), hwtune_hal::NodeError> {
//!     let nodes = SysfsNodes::new();
//!     let path = Path::new("/sys/devices/virtual/misc/voodoo_sound/incall_boost_spk");
//!     if nodes.exists(path) {
//!         println!("Boost: {}", nodes.read_text(path)?.trim());
//!         nodes.write_text(path, "2")?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod mock;
pub mod node;

pub use node::{NodeError, NodeIo, SysfsNodes};

/// HAL Result type
pub type Result<T> = std::result::Result<T, NodeError>;
