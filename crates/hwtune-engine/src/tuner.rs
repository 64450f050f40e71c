//! Engine facade
//!
//! The entry point a settings UI talks to: which families to show, opening
//! editing sessions, applying direct settings and replaying preferences at
//! boot.

use std::sync::Arc;

use crate::boot::{BootReport, BootSync};
use crate::{
    ControlFamily, FamilyCatalog, FamilyMode, Result, SessionCoordinator, TuneError,
    TuningContext, TuningSession, direct,
};

/// Tuning engine over one node backend, store and catalog
pub struct Tuner {
    ctx: TuningContext,
    catalog: FamilyCatalog,
}

impl Tuner {
    pub fn new(ctx: TuningContext, catalog: FamilyCatalog) -> Self {
        Self { ctx, catalog }
    }

    pub fn context(&self) -> &TuningContext {
        &self.ctx
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    /// Look up a family by id
    pub fn family(&self, id: &str) -> Result<&ControlFamily> {
        self.catalog
            .get(id)
            .ok_or_else(|| TuneError::UnknownFamily(id.to_string()))
    }

    /// Probe a family now
    pub fn is_supported(&self, id: &str) -> bool {
        self.catalog
            .get(id)
            .is_some_and(|family| self.ctx.probe().is_supported(family))
    }

    /// Families whose nodes all exist right now
    pub fn supported_families(&self) -> Vec<&ControlFamily> {
        let probe = self.ctx.probe();
        self.catalog
            .families()
            .iter()
            .filter(|family| probe.is_supported(family))
            .collect()
    }

    /// Open an editing session using the family's process-wide coordinator
    pub fn open_session(&self, id: &str) -> Result<TuningSession> {
        self.open_session_with(id, SessionCoordinator::global(id))
    }

    /// Open an editing session counted by a specific coordinator
    pub fn open_session_with(
        &self,
        id: &str,
        coordinator: Arc<SessionCoordinator>,
    ) -> Result<TuningSession> {
        let family = self.family(id)?;
        if family.mode != FamilyMode::Session {
            return Err(TuneError::WrongMode {
                family: id.to_string(),
                mode: family.mode,
            });
        }
        if !self.ctx.probe().is_supported(family) {
            return Err(TuneError::Unsupported(id.to_string()));
        }
        Ok(TuningSession::open(family, self.ctx.clone(), coordinator))
    }

    /// Write and save a direct setting; see [`direct::apply_direct`]
    pub fn apply_direct(&self, id: &str, control: &str, value: i64) -> Result<bool> {
        direct::apply_direct(&self.ctx, self.family(id)?, control, value)
    }

    /// Committed value of a control, or its default
    pub fn saved_value(&self, id: &str, control: &str) -> Result<i64> {
        let family = self.family(id)?;
        let spec = family
            .control(control)
            .ok_or_else(|| TuneError::UnknownControl {
                family: id.to_string(),
                control: control.to_string(),
            })?;
        Ok(self.ctx.store().get(&spec.key(), spec.default))
    }

    /// Decoded live values of a family
    pub fn current_values(&self, id: &str) -> Result<Vec<i64>> {
        direct::current_values(&self.ctx, self.family(id)?)
    }

    /// Live values of a family as a space-separated list
    pub fn current_values_text(&self, id: &str) -> Result<String> {
        direct::current_values_text(&self.ctx, self.family(id)?)
    }

    /// Write a space-separated value list to a family's nodes
    pub fn set_values(&self, id: &str, values: &str) -> Result<bool> {
        Ok(direct::set_values(&self.ctx, self.family(id)?, values))
    }

    /// Replay committed preferences for every family
    pub fn boot_sync(&self) -> BootReport {
        BootSync::new(&self.ctx).run(self.catalog.families())
    }
}
