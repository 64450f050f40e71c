//! Tuning sessions
//!
//! A session is one editing interaction over a family: it opens, receives
//! live edits, and closes exactly once by commit or cancel. A UI re-creation
//! (screen rotation) opens the replacement session before the old one is
//! torn down, so a cancelled session may only restore the nodes when no
//! other session of the same editor is still open. The
//! [`SessionCoordinator`] owns that count.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::{ControlFamily, TunableControl, TuneError, TuningContext};

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<SessionCoordinator>>>> = OnceLock::new();
static NEXT_COORDINATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Proof that a session was opened; consumed when it closes
#[derive(Debug)]
#[must_use = "an open session must be closed through SessionCoordinator::close"]
pub struct SessionTicket {
    issuer: u64,
}

/// Count of open sessions for one kind of editor
#[derive(Debug)]
pub struct SessionCoordinator {
    id: u64,
    open: AtomicUsize,
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self {
            id: NEXT_COORDINATOR_ID.fetch_add(1, Ordering::Relaxed),
            open: AtomicUsize::new(0),
        }
    }

    /// Process-wide coordinator for a family's editor
    pub fn global(family_id: &str) -> Arc<SessionCoordinator> {
        let registry = REGISTRY.get_or_init(Default::default);
        let mut coordinators = registry.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(coordinators.entry(family_id.to_string()).or_default())
    }

    /// Register a newly opened session
    pub fn open(&self) -> SessionTicket {
        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Session opened ({} open)", now_open);
        SessionTicket { issuer: self.id }
    }

    /// Register a closing session. Returns true when it was the last one
    /// open, i.e. reverting live node state is safe.
    ///
    /// A ticket issued by another coordinator leaves the count untouched
    /// and never permits a revert.
    pub fn close(&self, ticket: SessionTicket) -> bool {
        if ticket.issuer != self.id {
            tracing::warn!(
                "Session ticket from coordinator {} closed on coordinator {}",
                ticket.issuer,
                self.id
            );
            return false;
        }

        match self
            .open
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(previous) => {
                tracing::debug!("Session closed ({} open)", previous - 1);
                previous == 1
            }
            Err(_) => {
                tracing::warn!("Session closed on a coordinator with no open sessions");
                false
            }
        }
    }

    /// Number of sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// What closing a session did to the nodes and the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Current values persisted
    Committed,
    /// Nodes restored to the values captured at open
    Reverted,
    /// Cancelled while a sibling session is still open; nodes left alone
    RevertSkipped,
}

/// Outcome of closing a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub action: CloseAction,
    /// Controls whose store or node write failed
    pub failed: Vec<String>,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A batch of controls edited together
pub struct TuningSession {
    family_id: String,
    ctx: TuningContext,
    coordinator: Arc<SessionCoordinator>,
    ticket: Option<SessionTicket>,
    controls: Vec<TunableControl>,
}

impl TuningSession {
    /// Open a session over every control of `family`.
    ///
    /// Each control captures its last committed value; nothing is written.
    pub fn open(
        family: &ControlFamily,
        ctx: TuningContext,
        coordinator: Arc<SessionCoordinator>,
    ) -> Self {
        let ticket = coordinator.open();
        let controls = family
            .controls
            .iter()
            .cloned()
            .map(|spec| TunableControl::open(spec, ctx.store()))
            .collect();

        tracing::info!(
            "Opened {} session ({} open)",
            family.id,
            coordinator.open_sessions()
        );

        Self {
            family_id: family.id.clone(),
            ctx,
            coordinator,
            ticket: Some(ticket),
            controls,
        }
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    pub fn controls(&self) -> &[TunableControl] {
        &self.controls
    }

    pub fn control(&self, name: &str) -> Option<&TunableControl> {
        self.controls.iter().find(|c| c.name() == name)
    }

    /// Preview a value for one control on its node
    pub fn set_live(&mut self, name: &str, value: i64) -> Result<(), TuneError> {
        let nodes = self.ctx.nodes();
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| TuneError::UnknownControl {
                family: self.family_id.clone(),
                control: name.to_string(),
            })?;

        control.set_live(value, nodes)?;
        Ok(())
    }

    /// Preview every control's default. Returns the controls whose node
    /// write failed.
    pub fn reset_to_defaults(&mut self) -> Vec<String> {
        let nodes = self.ctx.nodes();
        self.controls
            .iter_mut()
            .filter_map(|control| {
                control
                    .reset_to_default(nodes)
                    .err()
                    .map(|_| control.name().to_string())
            })
            .collect()
    }

    /// Accept the previewed values as the new baseline
    pub fn commit(mut self) -> CloseReport {
        self.close(true)
    }

    /// Reject the previewed values
    pub fn cancel(mut self) -> CloseReport {
        self.close(false)
    }

    fn close(&mut self, accepted: bool) -> CloseReport {
        let Some(ticket) = self.ticket.take() else {
            return CloseReport {
                action: CloseAction::RevertSkipped,
                failed: Vec::new(),
            };
        };

        // The count drops before deciding, so the last session out reverts
        let last_open = self.coordinator.close(ticket);
        let mut failed = Vec::new();

        let action = if accepted {
            // Nodes already hold the previewed values
            let store = self.ctx.store();
            for control in &self.controls {
                if control.commit(store).is_err() {
                    failed.push(control.name().to_string());
                }
            }
            CloseAction::Committed
        } else if last_open {
            let nodes = self.ctx.nodes();
            for control in &mut self.controls {
                if control.revert(nodes).is_err() {
                    failed.push(control.name().to_string());
                }
            }
            CloseAction::Reverted
        } else {
            CloseAction::RevertSkipped
        };

        if failed.is_empty() {
            tracing::info!("Closed {} session: {:?}", self.family_id, action);
        } else {
            tracing::warn!(
                "Closed {} session: {:?}, {} control(s) failed: {:?}",
                self.family_id,
                action,
                failed.len(),
                failed
            );
        }

        CloseReport { action, failed }
    }
}

impl Drop for TuningSession {
    fn drop(&mut self) {
        if self.ticket.is_some() {
            tracing::debug!("{} session dropped while open, cancelling", self.family_id);
            self.close(false);
        }
    }
}
