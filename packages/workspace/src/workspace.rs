//! # Live Workspace
//!
//! The workspace owns the one mutable thing in the system: the pointer to the
//! current solution snapshot. It can only be moved with `apply_if_base`, a
//! compare-and-swap over snapshot lineage identity.
//!
//! ```text
//!   current = S0
//!   apply_if_base(S0, S1)  -> true   current = S1
//!   apply_if_base(S0, S2)  -> false  current = S1 (stale base)
//! ```

use crate::{HostServices, Solution, SnapshotId};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// Published after every successful swap
#[derive(Debug, Clone)]
pub struct WorkspaceEvent {
    pub old: Solution,
    pub new: Solution,
    pub at: DateTime<Utc>,
}

pub struct Workspace {
    current: RwLock<Solution>,
    services: HostServices,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl Workspace {
    pub fn new(solution: Solution) -> Self {
        Self::with_services(solution, HostServices::default())
    }

    pub fn with_services(solution: Solution, services: HostServices) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: RwLock::new(solution),
            services,
            events,
        }
    }

    pub fn current_snapshot(&self) -> Solution {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_snapshot_id(&self) -> SnapshotId {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .id()
    }

    /// Adopt `target` only if the current snapshot is still `base`.
    pub fn apply_if_base(&self, base: &Solution, target: Solution) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !current.is_same_snapshot(base) {
            debug!(
                current = %current.id(),
                base = %base.id(),
                target = %target.id(),
                "Rejecting swap from stale base"
            );
            return false;
        }

        let old = std::mem::replace(&mut *current, target.clone());
        drop(current);

        info!(old = %old.id(), new = %target.id(), "Workspace advanced");

        // No subscribers is fine
        let _ = self.events.send(WorkspaceEvent {
            old,
            new: target,
            at: Utc::now(),
        });
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("current", &self.current_snapshot_id())
            .finish_non_exhaustive()
    }
}
