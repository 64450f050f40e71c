//! Boot-time synchronization
//!
//! Kernel nodes come up with driver defaults on every boot. Once the device
//! has finished booting, every committed preference is pushed back to its
//! node. Replaying the sync is harmless: it only writes stored values.

use serde::Serialize;
use std::path::PathBuf;

use crate::{ControlFamily, TuningContext};

/// Result of syncing one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FamilyStatus {
    /// Nodes written; `failed` lists controls whose write failed
    Applied { written: usize, failed: Vec<String> },
    /// At least one node is missing, nothing was written
    Skipped { missing: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyOutcome {
    pub family: String,
    #[serde(flatten)]
    pub status: FamilyStatus,
}

/// Outcome of a full boot sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootReport {
    pub families: Vec<FamilyOutcome>,
}

impl BootReport {
    /// Families whose nodes were written
    pub fn applied(&self) -> usize {
        self.families
            .iter()
            .filter(|f| matches!(f.status, FamilyStatus::Applied { .. }))
            .count()
    }

    /// Families skipped as unsupported
    pub fn skipped(&self) -> usize {
        self.families.len() - self.applied()
    }

    /// Total failed node writes
    pub fn failures(&self) -> usize {
        self.families
            .iter()
            .map(|f| match &f.status {
                FamilyStatus::Applied { failed, .. } => failed.len(),
                FamilyStatus::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn outcome(&self, family: &str) -> Option<&FamilyStatus> {
        self.families
            .iter()
            .find(|f| f.family == family)
            .map(|f| &f.status)
    }
}

/// Replays committed preferences onto their nodes
pub struct BootSync<'a> {
    ctx: &'a TuningContext,
}

impl<'a> BootSync<'a> {
    pub fn new(ctx: &'a TuningContext) -> Self {
        Self { ctx }
    }

    /// Sync every family in order
    pub fn run(&self, families: &[ControlFamily]) -> BootReport {
        let families = families.iter().map(|f| self.sync_family(f)).collect();
        BootReport { families }
    }

    /// Sync one family, skipping it entirely if any node is absent
    pub fn sync_family(&self, family: &ControlFamily) -> FamilyOutcome {
        let probe = self.ctx.probe();
        if !probe.is_supported(family) {
            let missing: Vec<PathBuf> = probe
                .missing(family)
                .into_iter()
                .map(|p| p.to_path_buf())
                .collect();
            tracing::info!("Skipping {}: not supported by this kernel", family.id);
            return FamilyOutcome {
                family: family.id.clone(),
                status: FamilyStatus::Skipped { missing },
            };
        }

        let mut written = 0;
        let mut failed = Vec::new();
        for control in &family.controls {
            let value = self.ctx.store().get(&control.key(), control.default);
            let raw = control.codec.encode(value);

            match self.ctx.nodes().write_text(&control.path, &raw) {
                Ok(()) => {
                    tracing::debug!("Restored {} = {}", control.path.display(), raw);
                    written += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to restore {}: {}", control.name, e);
                    failed.push(control.name.clone());
                }
            }
        }

        tracing::info!(
            "Restored {} ({} written, {} failed)",
            family.id,
            written,
            failed.len()
        );
        FamilyOutcome {
            family: family.id.clone(),
            status: FamilyStatus::Applied { written, failed },
        }
    }
}
